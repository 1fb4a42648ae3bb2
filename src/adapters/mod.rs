//! Presentation adapters. Each one drives a [`ChatSession`] through its
//! public operations only.
//!
//! [`ChatSession`]: crate::agent::ChatSession

pub mod cli;
