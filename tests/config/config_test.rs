//! Coverage for config loading, overrides, validation, and path resolution.

use std::collections::HashMap;
use std::fs;

use rolebot::catalog::Catalog;
use rolebot::config::{config_dir, config_path_with, load_config_with, ChatConfig};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir should be created: {err}"),
    };
    let path = dir.path().join("config.toml");
    if let Err(err) = fs::write(&path, contents) {
        panic!("config should be written: {err}");
    }
    (dir, path)
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = load_config_with(&dir.path().join("absent.toml"), env(&[])).expect("defaults");
    assert_eq!(config.model, "dashscope/qwen-turbo");
    assert_eq!(config.assistant_name, "AI Assistant");
    assert_eq!(config.max_input_chars, 2000);
    assert_eq!(config.request_timeout_secs, 60);
    assert!(config.enable_conversation_logging);
    assert!(config.api_key.is_none());
}

#[test]
fn file_values_are_loaded() {
    let (_dir, path) = write_config(
        r#"
api_key = "sk-fromfile0001"
model = "ollama/qwen3:8b"
api_base = "http://localhost:11434"
temperature = 0.3
max_history_length = 6
assistant_name = "小智"
default_role = "travel"
preamble_template = "我是{assistant_name}。"
"#,
    );
    let config = load_config_with(&path, env(&[])).expect("load");
    assert_eq!(config.api_key.as_deref(), Some("sk-fromfile0001"));
    assert_eq!(config.model, "ollama/qwen3:8b");
    assert_eq!(config.max_history_length, 6);
    assert_eq!(config.assistant_name, "小智");
    assert_eq!(config.default_role, "travel");
    assert_eq!(config.preamble_template.as_deref(), Some("我是{assistant_name}。"));
}

#[test]
fn env_overrides_take_precedence_over_file() {
    let (_dir, path) = write_config("assistant_name = \"File Name\"\nmax_tokens = 100\n");
    let config = load_config_with(
        &path,
        env(&[("ASSISTANT_NAME", "Env Name"), ("MAX_TOKENS", "300")]),
    )
    .expect("load");
    assert_eq!(config.assistant_name, "Env Name");
    assert_eq!(config.max_tokens, 300);
}

#[test]
fn invalid_numeric_override_keeps_file_value() {
    let (_dir, path) = write_config("temperature = 1.5\n");
    let config = load_config_with(&path, env(&[("TEMPERATURE", "warm")])).expect("load");
    assert!((config.temperature - 1.5).abs() < f32::EPSILON);
}

#[test]
fn validation_rejects_out_of_range_settings() {
    let cases: Vec<(ChatConfig, &str)> = vec![
        (
            ChatConfig {
                api_key: Some("pk-wrong".to_owned()),
                ..ChatConfig::default()
            },
            "should start with 'sk-' or 'tk-'",
        ),
        (
            ChatConfig {
                temperature: 2.5,
                ..ChatConfig::default()
            },
            "temperature",
        ),
        (
            ChatConfig {
                max_tokens: 0,
                ..ChatConfig::default()
            },
            "max tokens",
        ),
        (
            ChatConfig {
                max_tokens: 32_001,
                ..ChatConfig::default()
            },
            "max tokens",
        ),
        (
            ChatConfig {
                assistant_name: "  ".to_owned(),
                ..ChatConfig::default()
            },
            "assistant name",
        ),
        (
            ChatConfig {
                log_level: "VERBOSE".to_owned(),
                ..ChatConfig::default()
            },
            "log level",
        ),
        (
            ChatConfig {
                api_base: Some("not a url".to_owned()),
                ..ChatConfig::default()
            },
            "api_base",
        ),
    ];
    for (config, expected) in cases {
        let err = config.validate().expect_err(expected);
        assert!(
            format!("{err:#}").contains(expected),
            "expected {expected:?} in {err:#}"
        );
    }
}

#[test]
fn invalid_file_fails_to_load() {
    let (_dir, path) = write_config("temperature = \"hot\"\n");
    let err = load_config_with(&path, env(&[])).expect_err("parse error");
    assert!(err.to_string().contains("failed to parse config"));
}

#[test]
fn custom_catalog_entries_extend_builtins() {
    let (_dir, path) = write_config(
        r#"
[[personalities]]
id = "stoic"
name = "沉稳型"
system_prompt = "你沉着冷静。"
behavior_guide = "行为准则：少说多听"
response_style = "表达风格：简洁"

[[roles]]
id = "coach"
name = "跑步教练"
description = "耐心的跑步训练教练"
responsibilities = ["制定训练计划", "纠正跑姿"]
personality_id = "stoic"
"#,
    );
    let config = load_config_with(&path, env(&[])).expect("load");
    let catalog = Catalog::from_config(&config).expect("catalog");
    assert_eq!(catalog.roles.list_ids().len(), 7);
    assert_eq!(catalog.personalities.len(), 6);
    assert_eq!(catalog.roles.personality_id("coach").as_deref(), Some("stoic"));
}

#[test]
fn custom_role_with_dangling_personality_is_rejected() {
    let (_dir, path) = write_config(
        r#"
[[roles]]
id = "coach"
name = "跑步教练"
description = "耐心的跑步训练教练"
responsibilities = []
personality_id = "ghost"
"#,
    );
    let config = load_config_with(&path, env(&[])).expect("load");
    let err = Catalog::from_config(&config).expect_err("dangling personality");
    assert!(err.to_string().contains("unknown personality 'ghost'"));
}

#[test]
fn config_path_prefers_explicit_env() {
    let path = config_path_with(env(&[("ROLEBOT_CONFIG", "/tmp/custom.toml")])).expect("path");
    assert_eq!(path, std::path::PathBuf::from("/tmp/custom.toml"));
}

#[test]
fn config_dir_resolves() {
    let path = match config_dir() {
        Ok(path) => path,
        Err(err) => panic!("config dir should resolve: {err}"),
    };
    assert!(path.ends_with(".rolebot"));
}
