//! Streaming turn execution.
//!
//! A [`TurnStream`] connects to the provider lazily on first poll, yields
//! [`TurnEvent::Chunk`]s as text arrives, and records the exchange in the
//! session when the provider finishes:
//!
//! - completion: user message plus the full assistant text
//! - provider failure: user message plus an `Error occurred: ...` reply,
//!   surfaced as a final [`TurnEvent::Failed`]; partial text is discarded
//! - dropped before the end: nothing is recorded
//!
//! The stream is finite and cannot be restarted. It holds the session's busy
//! flag until one of the three outcomes above.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio_stream::Stream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::session::BusyGuard;
use crate::providers::{ChatRequest, ProviderError, TextStream};

type ConnectFuture = Pin<Box<dyn Future<Output = Result<TextStream, ProviderError>> + Send>>;

/// Item yielded by a [`TurnStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Incremental assistant text.
    Chunk(String),
    /// The provider failed; always the last item.
    Failed {
        /// Human-readable reason.
        message: String,
    },
}

enum Phase {
    Connecting(ConnectFuture),
    Streaming(TextStream),
    Done,
}

enum Step {
    Connected(TextStream),
    Text(String),
    Failed(ProviderError),
    Finished,
}

/// Fragments of one assistant reply. See the module docs for outcomes.
pub struct TurnStream {
    session_id: Uuid,
    phase: Phase,
    guard: Option<BusyGuard>,
    user_text: String,
    collected: String,
}

impl std::fmt::Debug for TurnStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self.phase {
            Phase::Connecting(_) => "connecting",
            Phase::Streaming(_) => "streaming",
            Phase::Done => "done",
        };
        f.debug_struct("TurnStream")
            .field("session_id", &self.session_id)
            .field("phase", &phase)
            .field("collected_chars", &self.collected.chars().count())
            .finish_non_exhaustive()
    }
}

impl TurnStream {
    pub(crate) fn start(guard: BusyGuard, request: ChatRequest, user_text: String) -> Self {
        let session_id = guard.session().id();
        let provider = guard.session().provider();
        let connect: ConnectFuture = Box::pin(async move { provider.stream_chat(request).await });
        Self {
            session_id,
            phase: Phase::Connecting(connect),
            guard: Some(guard),
            user_text,
            collected: String::new(),
        }
    }

    /// Whether the turn has finished (successfully or not).
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    fn finish(&mut self, assistant_text: Option<String>) {
        self.phase = Phase::Done;
        if let Some(guard) = self.guard.take() {
            guard
                .session()
                .record_exchange(std::mem::take(&mut self.user_text), assistant_text);
        }
    }

    fn complete(&mut self) {
        let text = std::mem::take(&mut self.collected);
        info!(
            session_id = %self.session_id,
            reply_chars = text.chars().count(),
            "turn completed"
        );
        self.finish(Some(text));
    }

    fn fail(&mut self, error: ProviderError) -> TurnEvent {
        let message = error.to_string();
        warn!(session_id = %self.session_id, error = %message, "turn failed");
        self.collected.clear();
        self.finish(Some(format!("Error occurred: {message}")));
        TurnEvent::Failed { message }
    }
}

impl Stream for TurnStream {
    type Item = TurnEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let step = match &mut this.phase {
                Phase::Connecting(connect) => match connect.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(stream)) => Step::Connected(stream),
                    Poll::Ready(Err(e)) => Step::Failed(e),
                },
                Phase::Streaming(stream) => match stream.as_mut().poll_next(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Some(Ok(text))) => Step::Text(text),
                    Poll::Ready(Some(Err(e))) => Step::Failed(e),
                    Poll::Ready(None) => Step::Finished,
                },
                Phase::Done => return Poll::Ready(None),
            };

            match step {
                Step::Connected(stream) => {
                    debug!(session_id = %this.session_id, "provider stream opened");
                    this.phase = Phase::Streaming(stream);
                }
                Step::Text(text) if text.is_empty() => {}
                Step::Text(text) => {
                    this.collected.push_str(&text);
                    return Poll::Ready(Some(TurnEvent::Chunk(text)));
                }
                Step::Failed(e) => return Poll::Ready(Some(this.fail(e))),
                Step::Finished => {
                    this.complete();
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl Drop for TurnStream {
    fn drop(&mut self) {
        if !self.is_finished() {
            info!(session_id = %self.session_id, "turn cancelled, nothing recorded");
        }
    }
}
