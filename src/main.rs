//! Rolebot CLI entry point.
//!
//! Provides `chat` for an interactive streaming conversation plus `roles`,
//! `personalities`, `prompt`, and `config` for inspecting the catalog and
//! the effective configuration.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;

use rolebot::adapters::cli::run_chat_loop;
use rolebot::agent::{ChatSession, PreambleTemplate, PromptComposer, SessionSettings};
use rolebot::catalog::Catalog;
use rolebot::config::{self, ChatConfig};
use rolebot::{logging, providers};

/// Rolebot: role and personality driven chat assistant.
#[derive(Parser)]
#[command(name = "rolebot", version, about)]
struct Cli {
    /// Also write JSON logs to this directory (daily rotation).
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat.
    Chat {
        /// Role to start in (defaults to `default_role` from config).
        #[arg(long)]
        role: Option<String>,
        /// Rebind the starting role to this personality first.
        #[arg(long)]
        personality: Option<String>,
    },
    /// List roles.
    Roles,
    /// List personalities.
    Personalities,
    /// Print the composed instruction text for a role.
    Prompt {
        /// Role id.
        role: String,
        /// Personality to use instead of the role's binding.
        #[arg(long)]
        personality: Option<String>,
        /// Assistant name (defaults to `assistant_name` from config).
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the effective configuration with secrets masked.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_default_config().context("failed to load configuration")?;
    let _logging_guard = match &cli.log_dir {
        Some(dir) => Some(logging::init_with_file(dir, config.tracing_filter())?),
        None => {
            logging::init_cli(config.tracing_filter());
            None
        }
    };

    match cli.command {
        Command::Chat { role, personality } => handle_chat(&config, role, personality).await,
        Command::Roles => {
            let catalog = Catalog::from_config(&config)?;
            println!("{}", catalog.roles.render_listing());
            Ok(())
        }
        Command::Personalities => {
            let catalog = Catalog::from_config(&config)?;
            for (id, name) in catalog.personalities.list() {
                println!("{id} - {name}");
            }
            Ok(())
        }
        Command::Prompt {
            role,
            personality,
            name,
        } => {
            let composer = build_composer(&config)?;
            let name = name.unwrap_or_else(|| config.assistant_name.clone());
            println!("{}", composer.compose(&role, personality.as_deref(), &name)?);
            Ok(())
        }
        Command::Config => {
            let path = config::config_path_with(|key| std::env::var(key).ok())?;
            println!("Config file: {}", path.display());
            println!("{}", config.redacted_summary());
            Ok(())
        }
    }
}

/// Catalog plus the configured preamble template.
fn build_composer(config: &ChatConfig) -> anyhow::Result<PromptComposer> {
    let catalog = Catalog::from_config(config)?;
    let template = config
        .preamble_template
        .as_deref()
        .map(PreambleTemplate::parse)
        .transpose()
        .context("invalid preamble_template")?
        .unwrap_or_default();
    Ok(PromptComposer::with_template(catalog.roles, template))
}

/// Run the interactive chat loop on stdin/stdout.
async fn handle_chat(
    config: &ChatConfig,
    role: Option<String>,
    personality: Option<String>,
) -> anyhow::Result<()> {
    let composer = build_composer(config)?;
    let provider = providers::from_config(config).context("failed to configure provider")?;
    let role = role.unwrap_or_else(|| config.default_role.clone());

    let session = ChatSession::new(
        composer,
        provider,
        SessionSettings::from_config(config),
        &role,
    )
    .context("failed to start session")?;
    if let Some(personality) = personality {
        session.apply_custom_pairing(&role, &personality)?;
    }
    info!(session_id = %session.id(), summary = %config.redacted_summary(), "chat started");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    run_chat_loop(&session, stdin, &mut stdout).await
}
