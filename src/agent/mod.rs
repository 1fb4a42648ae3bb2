//! Conversation core: prompt composition, sessions, and streaming turns.
//!
//! A [`ChatSession`] owns one conversation. It composes its instruction text
//! through a shared [`PromptComposer`], keeps the stored history, and hands
//! out a [`TurnStream`] per user message.

pub mod context;
pub mod prompt;
pub mod session;
pub mod turn;

pub use prompt::{ComposeError, Composition, PreambleTemplate, PromptComposer};
pub use session::{ChatSession, HistoryEntry, SessionError, SessionSettings, SessionSnapshot};
pub use turn::{TurnEvent, TurnStream};
