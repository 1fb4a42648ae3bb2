//! Terminal chat adapter: slash-command parsing and the interactive loop.
//!
//! Lines starting with `/` are commands; anything else is sent as a chat
//! message and the reply is streamed to the output as it arrives. Ctrl-C
//! during a reply cancels that turn only; at the prompt it ends the chat.

use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::agent::{ChatSession, HistoryEntry, TurnEvent, TurnStream};
use crate::providers::Role as MessageRole;
use crate::roles::RoleSummary;

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// `/help`
    Help,
    /// `/roles`
    Roles,
    /// `/personalities`
    Personalities,
    /// `/role <id>`
    Role(String),
    /// `/pair <role> <personality>`
    Pair {
        /// Role to rebind.
        role: String,
        /// New personality.
        personality: String,
    },
    /// `/reset`
    Reset,
    /// `/history`
    History,
    /// `/info`
    Info,
    /// `/quit` or `/exit`
    Quit,
    /// Known command with missing or extra arguments.
    Usage(&'static str),
    /// Unrecognised command name.
    Unknown(String),
}

/// Parse a line as a slash command; `None` if it is a chat message.
pub fn parse_command(line: &str) -> Option<ChatCommand> {
    let without_slash = line.trim().strip_prefix('/')?;
    let mut parts = without_slash.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let command = match (name, args.as_slice()) {
        ("help" | "h" | "?", _) => ChatCommand::Help,
        ("roles", _) => ChatCommand::Roles,
        ("personalities", _) => ChatCommand::Personalities,
        ("role", [id]) => ChatCommand::Role((*id).to_owned()),
        ("role", _) => ChatCommand::Usage("/role <id>"),
        ("pair", [role, personality]) => ChatCommand::Pair {
            role: (*role).to_owned(),
            personality: (*personality).to_owned(),
        },
        ("pair", _) => ChatCommand::Usage("/pair <role> <personality>"),
        ("reset" | "clear", _) => ChatCommand::Reset,
        ("history", _) => ChatCommand::History,
        ("info", _) => ChatCommand::Info,
        ("quit" | "exit", _) => ChatCommand::Quit,
        (other, _) => ChatCommand::Unknown(other.to_owned()),
    };
    Some(command)
}

/// Command reference shown by `/help`.
pub fn help_text() -> String {
    [
        "Available commands:",
        "",
        "/help                        show this message",
        "/roles                       list roles",
        "/personalities               list personalities",
        "/role <id>                   switch role (clears history)",
        "/pair <role> <personality>   rebind a role's personality and switch to it",
        "/reset                       clear conversation history",
        "/history                     show conversation history",
        "/info                        show the active role and personality",
        "/quit                        leave the chat",
    ]
    .join("\n")
}

/// Role list with the active role marked by `*`.
pub fn format_role_summaries(summaries: &[RoleSummary]) -> String {
    let mut lines = vec!["Roles:".to_owned()];
    for summary in summaries {
        let marker = if summary.is_current { '*' } else { ' ' };
        let personality = summary
            .personality_name
            .as_deref()
            .unwrap_or(summary.personality_id.as_str());
        lines.push(format!(
            "{marker} {} - {} [{personality}]",
            summary.id, summary.name
        ));
    }
    lines.join("\n")
}

/// Stored history, one message per line.
pub fn format_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No messages yet.".to_owned();
    }
    entries
        .iter()
        .map(|entry| {
            let who = match entry.role {
                MessageRole::System => "system",
                MessageRole::User => "you",
                MessageRole::Assistant => "assistant",
            };
            format!("[{}] {who}: {}", entry.at.format("%H:%M:%S"), entry.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of handling one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Print this and keep going.
    Reply(String),
    /// Leave the loop.
    Quit,
}

/// Apply a command to the session.
pub fn handle_command(session: &ChatSession, command: ChatCommand) -> CommandOutcome {
    let reply = match command {
        ChatCommand::Help => help_text(),
        ChatCommand::Roles => format_role_summaries(&session.list_roles()),
        ChatCommand::Personalities => {
            let mut lines = vec!["Personalities:".to_owned()];
            for (id, name) in session.composer().roles().personalities().list() {
                lines.push(format!("  {id} - {name}"));
            }
            lines.join("\n")
        }
        ChatCommand::Role(role_id) => match session.switch_role(&role_id) {
            Ok(()) => {
                let snapshot = session.snapshot();
                format!(
                    "Switched to {} ({}), personality {}.",
                    snapshot.role_name, snapshot.role_id, snapshot.personality_name
                )
            }
            Err(e) => format!("Error: {e}"),
        },
        ChatCommand::Pair { role, personality } => {
            match session.apply_custom_pairing(&role, &personality) {
                Ok(()) => {
                    let snapshot = session.snapshot();
                    format!(
                        "Role {} now speaks as {}.",
                        snapshot.role_name, snapshot.personality_name
                    )
                }
                Err(e) => format!("Error: {e}"),
            }
        }
        ChatCommand::Reset => match session.reset() {
            Ok(()) => "Conversation history cleared.".to_owned(),
            Err(e) => format!("Error: {e}"),
        },
        ChatCommand::History => format_history(&session.history()),
        ChatCommand::Info => {
            let snapshot = session.snapshot();
            format!(
                "Role: {} ({})\nDescription: {}\nPersonality: {} ({})\nModel: {}\nMessages stored: {}",
                snapshot.role_name,
                snapshot.role_id,
                snapshot.role_description,
                snapshot.personality_name,
                snapshot.personality_id,
                session.model_id(),
                snapshot.history_len
            )
        }
        ChatCommand::Quit => return CommandOutcome::Quit,
        ChatCommand::Usage(usage) => format!("Usage: {usage}"),
        ChatCommand::Unknown(name) => {
            format!("Unknown command: /{name} (type /help for the list)")
        }
    };
    CommandOutcome::Reply(reply)
}

/// How a streamed reply ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// All fragments delivered.
    Completed,
    /// The provider failed.
    Failed(String),
    /// `cancel` resolved first; the turn was dropped.
    Cancelled,
}

/// Copy a turn's fragments to `output` until it ends or `cancel` resolves.
///
/// # Errors
///
/// Returns an error if writing to `output` fails.
pub async fn stream_reply<W, C>(
    mut turn: TurnStream,
    output: &mut W,
    cancel: C,
) -> anyhow::Result<ReplyOutcome>
where
    W: AsyncWrite + Unpin,
    C: Future<Output = ()>,
{
    tokio::pin!(cancel);
    loop {
        let polled = tokio::select! {
            event = turn.next() => Some(event),
            () = &mut cancel => None,
        };
        let Some(event) = polled else {
            drop(turn);
            output.write_all(b"\n[cancelled]\n").await?;
            output.flush().await?;
            return Ok(ReplyOutcome::Cancelled);
        };
        match event {
            Some(TurnEvent::Chunk(text)) => {
                output.write_all(text.as_bytes()).await?;
                output.flush().await?;
            }
            Some(TurnEvent::Failed { message }) => {
                output
                    .write_all(format!("\nError occurred: {message}\n").as_bytes())
                    .await?;
                output.flush().await?;
                return Ok(ReplyOutcome::Failed(message));
            }
            None => {
                output.write_all(b"\n").await?;
                output.flush().await?;
                return Ok(ReplyOutcome::Completed);
            }
        }
    }
}

/// Run the interactive loop until `/quit`, end of input, or Ctrl-C at the
/// prompt. Ctrl-C while a reply is streaming cancels that reply only.
///
/// # Errors
///
/// Returns an error if reading input or writing output fails.
pub async fn run_chat_loop<R, W>(session: &ChatSession, input: R, output: &mut W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    run_chat_loop_with(session, input, output, ctrl_c).await
}

/// [`run_chat_loop`] with a caller-supplied interrupt source. Each call to
/// `interrupt` returns a future that resolves when the user interrupts.
///
/// # Errors
///
/// Returns an error if reading input or writing output fails.
pub async fn run_chat_loop_with<R, W, I, F>(
    session: &ChatSession,
    input: R,
    output: &mut W,
    mut interrupt: I,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    I: FnMut() -> F,
    F: Future<Output = ()>,
{
    let snapshot = session.snapshot();
    output
        .write_all(
            format!(
                "Chatting with {} as {}. Type /help for commands.\n",
                session.settings().assistant_name,
                snapshot.role_name
            )
            .as_bytes(),
        )
        .await?;

    let mut lines = input.lines();
    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let polled = tokio::select! {
            line = lines.next_line() => Some(line),
            () = interrupt() => None,
        };
        let Some(line) = polled else {
            debug!(session_id = %session.id(), "interrupted at prompt");
            output.write_all(b"\n").await?;
            break;
        };
        let Some(line) = line? else {
            debug!(session_id = %session.id(), "input closed");
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = parse_command(line) {
            match handle_command(session, command) {
                CommandOutcome::Reply(reply) => {
                    output.write_all(reply.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                }
                CommandOutcome::Quit => break,
            }
            continue;
        }

        match session.submit_turn(line) {
            Ok(turn) => {
                stream_reply(turn, output, interrupt()).await?;
            }
            Err(e) => {
                output.write_all(format!("Error: {e}\n").as_bytes()).await?;
            }
        }
    }

    output.write_all(b"Bye.\n").await?;
    output.flush().await?;
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
