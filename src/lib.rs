//! Rolebot: a role and personality driven chat assistant core.
//!
//! A role says what the assistant is for, a personality says how it talks.
//! The [`agent::PromptComposer`] merges both with fixed speech-output
//! constraints into one instruction text, a [`agent::ChatSession`] keeps the
//! conversation, and each user message streams a reply from an
//! OpenAI-compatible or Ollama endpoint.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapters;
pub mod agent;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod personality;
pub mod providers;
pub mod roles;
