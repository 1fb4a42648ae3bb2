//! CLI contract tests against the built binary.

use assert_cmd::Command;

fn rolebot() -> Command {
    let mut cmd = match Command::cargo_bin("rolebot") {
        Ok(cmd) => cmd,
        Err(err) => panic!("binary should be built: {err}"),
    };
    let missing = std::env::temp_dir().join("rolebot-cli-test-missing-config.toml");
    cmd.env("ROLEBOT_CONFIG", missing);
    for var in [
        "DASHSCOPE_API_KEY",
        "DASHSCOPE_API_BASE",
        "MODEL_NAME",
        "ASSISTANT_NAME",
        "LOG_LEVEL",
        "TEMPERATURE",
        "MAX_TOKENS",
        "MAX_HISTORY_LENGTH",
        "DEBUG",
        "ENABLE_CONVERSATION_LOGGING",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = match cmd.output() {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    };
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn roles_lists_the_builtin_roles() {
    let stdout = stdout_of(rolebot().arg("roles"));
    assert!(stdout.contains("1. default - 贴心生活助手"));
    assert!(stdout.contains("6. feynman - 知识巩固教练"));
}

#[test]
fn personalities_lists_ids_and_names() {
    let stdout = stdout_of(rolebot().arg("personalities"));
    assert!(stdout.contains("warm_caring - 温柔助理型"));
    assert!(stdout.contains("socratic_teacher"));
}

#[test]
fn prompt_prints_composed_instruction_text() {
    let stdout = stdout_of(rolebot().args(["prompt", "default", "--name", "小助手"]));
    assert!(stdout.starts_with("你是小助手，一个温暖贴心的日常生活伙伴。"));
    assert!(stdout.contains("辛苦了呢"));
}

#[test]
fn prompt_for_unknown_role_fails() {
    let output = match rolebot().args(["prompt", "pirate"]).output() {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    };
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown role 'pirate'"));
}

#[test]
fn config_masks_the_api_key() {
    let stdout = stdout_of(rolebot().arg("config").env("DASHSCOPE_API_KEY", "sk-secretvalue1234"));
    assert!(stdout.contains("API Key: ***1234"));
    assert!(!stdout.contains("secretvalue"));
}
