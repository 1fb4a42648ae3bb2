//! Scripted provider and session fixtures shared by the session tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rolebot::agent::{ChatSession, PromptComposer, SessionSettings};
use rolebot::catalog::{Catalog, DEFAULT_ROLE_ID};
use rolebot::providers::{ChatRequest, LlmProvider, ProviderError, TextStream};
use tokio_stream::StreamExt;

/// What the provider does for one call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Stream these fragments, then end.
    Chunks(Vec<&'static str>),
    /// Reject the request before streaming.
    ConnectError(&'static str),
    /// Stream these fragments, then fail.
    BreakAfter(Vec<&'static str>, &'static str),
    /// Stream these fragments, then never finish.
    Hang(Vec<&'static str>),
}

/// Provider that replays a queue of replies and records every request.
///
/// An empty queue answers with a single `"ok"` fragment.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, reply: Reply) {
        match self.replies.lock() {
            Ok(mut replies) => replies.push_back(reply),
            Err(err) => panic!("reply queue poisoned: {err}"),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(err) => panic!("request log poisoned: {err}"),
        }
    }
}

fn ok_items(chunks: Vec<&'static str>) -> Vec<Result<String, ProviderError>> {
    chunks.into_iter().map(|c| Ok(c.to_owned())).collect()
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or(Reply::Chunks(vec!["ok"]));

        match reply {
            Reply::Chunks(chunks) => Ok(Box::pin(tokio_stream::iter(ok_items(chunks)))),
            Reply::ConnectError(message) => Err(ProviderError::Unavailable(message.to_owned())),
            Reply::BreakAfter(chunks, message) => {
                let mut items = ok_items(chunks);
                items.push(Err(ProviderError::Upstream(message.to_owned())));
                Ok(Box::pin(tokio_stream::iter(items)))
            }
            Reply::Hang(chunks) => Ok(Box::pin(
                tokio_stream::iter(ok_items(chunks)).chain(tokio_stream::pending()),
            )),
        }
    }

    fn model_id(&self) -> &str {
        "scripted/test"
    }
}

pub fn settings() -> SessionSettings {
    SessionSettings {
        assistant_name: "小助手".to_owned(),
        max_history_length: 20,
        max_input_chars: 2000,
        temperature: Some(0.7),
        max_tokens: Some(512),
        log_conversation: false,
    }
}

/// A fresh built-in catalog and a session on the default role.
pub fn session_with(
    provider: &Arc<ScriptedProvider>,
    settings: SessionSettings,
) -> (Catalog, ChatSession) {
    let catalog = Catalog::builtin();
    let composer = PromptComposer::new(Arc::clone(&catalog.roles));
    let dyn_provider: Arc<dyn LlmProvider> = provider.clone();
    match ChatSession::new(composer, dyn_provider, settings, DEFAULT_ROLE_ID) {
        Ok(session) => (catalog, session),
        Err(err) => panic!("default role should compose: {err}"),
    }
}
