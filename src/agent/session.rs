//! Per-conversation state: active role and personality, composed instruction
//! text, and stored history.
//!
//! A [`ChatSession`] is cheap to clone and safe to share across tasks. At most
//! one operation runs at a time: `switch_role`, `apply_custom_pairing`,
//! `reset` and `submit_turn` all take the session's busy flag, and a turn
//! stream holds it until it finishes or is dropped. A second caller gets
//! [`SessionError::Busy`] instead of waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::context::{build_outgoing_messages, estimate_messages_tokens, history_window};
use super::prompt::{ComposeError, Composition, PromptComposer};
use super::turn::TurnStream;
use crate::config::ChatConfig;
use crate::logging::CONVERSATION_TARGET;
use crate::personality::Personality;
use crate::providers::{ChatRequest, LlmProvider, Message, Role as MessageRole};
use crate::roles::{CatalogError, Role, RoleRegistry, RoleSummary};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by session operations. None of them change session state.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Instruction text could not be composed.
    #[error(transparent)]
    Compose(#[from] ComposeError),
    /// A catalog mutation was rejected.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Another operation is in flight on this session.
    #[error("session is busy with another operation")]
    Busy,
    /// The message is empty after trimming whitespace.
    #[error("message is empty")]
    EmptyInput,
    /// The message exceeds the configured character limit.
    #[error("message is too long ({len} characters, limit {max})")]
    InputTooLong {
        /// Character count of the message.
        len: usize,
        /// Configured limit.
        max: usize,
    },
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Per-session knobs, usually derived from [`ChatConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Name substituted into the preamble.
    pub assistant_name: String,
    /// Stored messages sent with each turn.
    pub max_history_length: usize,
    /// Longest accepted user message, in characters. Zero disables the check.
    pub max_input_chars: usize,
    /// Sampling temperature forwarded to the provider.
    pub temperature: Option<f32>,
    /// Response token cap forwarded to the provider.
    pub max_tokens: Option<u32>,
    /// Log message text under the conversation target.
    pub log_conversation: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

impl SessionSettings {
    /// Extract session settings from the loaded config.
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            assistant_name: config.assistant_name.clone(),
            max_history_length: config.max_history_length,
            max_input_chars: config.max_input_chars,
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
            log_conversation: config.enable_conversation_logging,
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// One stored conversation message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// Author role.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// When the message was stored.
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    fn new(role: MessageRole, content: String) -> Self {
        Self {
            role,
            content,
            at: Utc::now(),
        }
    }

    /// The entry as a provider message (timestamp dropped).
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Read-only view of a session's current configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Session id.
    pub session_id: Uuid,
    /// Active role id.
    pub role_id: String,
    /// Active role display name.
    pub role_name: String,
    /// Active role description.
    pub role_description: String,
    /// Active personality id.
    pub personality_id: String,
    /// Active personality display name.
    pub personality_name: String,
    /// Composed instruction text.
    pub instruction: String,
    /// Number of stored messages.
    pub history_len: usize,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

struct SessionState {
    role: Role,
    personality: Arc<Personality>,
    instruction: String,
    history: Vec<HistoryEntry>,
}

impl SessionState {
    fn from_composition(composition: Composition) -> Self {
        Self {
            role: composition.role,
            personality: composition.personality,
            instruction: composition.text,
            history: Vec::new(),
        }
    }
}

pub(crate) struct SessionInner {
    id: Uuid,
    composer: PromptComposer,
    provider: Arc<dyn LlmProvider>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    busy: AtomicBool,
}

impl SessionInner {
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn provider(&self) -> Arc<dyn LlmProvider> {
        Arc::clone(&self.provider)
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the outcome of a finished turn.
    ///
    /// The assistant text is skipped when blank, so an empty reply leaves
    /// only the user message behind.
    pub(crate) fn record_exchange(&self, user_text: String, assistant_text: Option<String>) {
        if self.settings.log_conversation {
            debug!(
                target: CONVERSATION_TARGET,
                session_id = %self.id,
                user = %user_text,
                assistant = assistant_text.as_deref().unwrap_or(""),
                "exchange"
            );
        }

        let mut state = self.state();
        if !user_text.trim().is_empty() {
            state
                .history
                .push(HistoryEntry::new(MessageRole::User, user_text));
        }
        if let Some(text) = assistant_text.filter(|t| !t.trim().is_empty()) {
            state
                .history
                .push(HistoryEntry::new(MessageRole::Assistant, text));
        }
    }
}

/// Exclusive hold on a session's busy flag, released on drop.
pub(crate) struct BusyGuard {
    session: Arc<SessionInner>,
}

impl BusyGuard {
    fn acquire(session: &Arc<SessionInner>) -> Result<Self, SessionError> {
        session
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::Busy)?;
        Ok(Self {
            session: Arc::clone(session),
        })
    }

    pub(crate) fn session(&self) -> &Arc<SessionInner> {
        &self.session
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.session.busy.store(false, Ordering::Release);
    }
}

/// A conversation bound to one provider and a shared role registry.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.inner.id)
            .field("model", &self.inner.provider.model_id())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Create a session in `initial_role` with its bound personality.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Compose`] if the initial role cannot be
    /// composed; no session exists in that case.
    pub fn new(
        composer: PromptComposer,
        provider: Arc<dyn LlmProvider>,
        settings: SessionSettings,
        initial_role: &str,
    ) -> Result<Self, SessionError> {
        let composition = composer.compose_detailed(initial_role, None, &settings.assistant_name)?;
        let id = Uuid::new_v4();
        info!(
            session_id = %id,
            role = %composition.role.id,
            personality = %composition.personality.id,
            model = provider.model_id(),
            "session created"
        );
        Ok(Self {
            inner: Arc::new(SessionInner {
                id,
                composer,
                provider,
                settings,
                state: Mutex::new(SessionState::from_composition(composition)),
                busy: AtomicBool::new(false),
            }),
        })
    }

    /// Session id (used as a tracing field).
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Whether an operation is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Composer (and through it the shared registries) this session uses.
    pub fn composer(&self) -> &PromptComposer {
        &self.inner.composer
    }

    /// Model spec of the provider, e.g. `dashscope/qwen-turbo`.
    pub fn model_id(&self) -> &str {
        self.inner.provider.model_id()
    }

    /// Settings this session was created with.
    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    /// Switch to `role_id` with the role's bound personality.
    ///
    /// Clears history on success.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`] or [`SessionError::Compose`]; state is untouched.
    pub fn switch_role(&self, role_id: &str) -> Result<(), SessionError> {
        let _guard = BusyGuard::acquire(&self.inner)?;
        let composition = self.inner.composer.compose_detailed(
            role_id,
            None,
            &self.inner.settings.assistant_name,
        )?;
        info!(
            session_id = %self.inner.id,
            role = %composition.role.id,
            personality = %composition.personality.id,
            "role switched"
        );
        *self.inner.state() = SessionState::from_composition(composition);
        Ok(())
    }

    /// Rebind `role_id` to `personality_id` and switch to it.
    ///
    /// The rebind is process-wide: every session composing `role_id`
    /// afterwards sees the new personality. If composition fails after the
    /// rebind, the previous binding is restored unless someone else has
    /// rebound the role meanwhile. Clears history on success.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`], [`SessionError::Catalog`] (nothing changed),
    /// or [`SessionError::Compose`] (binding rolled back).
    pub fn apply_custom_pairing(
        &self,
        role_id: &str,
        personality_id: &str,
    ) -> Result<(), SessionError> {
        let _guard = BusyGuard::acquire(&self.inner)?;
        let composer = &self.inner.composer;
        let (composition, previous) =
            rebind_with_rollback(composer.roles(), role_id, personality_id, || {
                composer.compose_detailed(
                    role_id,
                    Some(personality_id),
                    &self.inner.settings.assistant_name,
                )
            })?;

        info!(
            session_id = %self.inner.id,
            role = %role_id,
            personality = %personality_id,
            previous = %previous,
            "custom pairing applied"
        );
        *self.inner.state() = SessionState::from_composition(composition);
        Ok(())
    }

    /// Clear stored history; role and personality are kept.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`] while another operation is in flight.
    pub fn reset(&self) -> Result<(), SessionError> {
        let _guard = BusyGuard::acquire(&self.inner)?;
        let cleared = std::mem::take(&mut self.inner.state().history).len();
        info!(session_id = %self.inner.id, cleared, "history reset");
        Ok(())
    }

    /// Start a turn. Fragments arrive through the returned stream.
    ///
    /// The session stays busy until the stream ends or is dropped.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`], [`SessionError::EmptyInput`], or
    /// [`SessionError::InputTooLong`]; nothing is sent or stored.
    pub fn submit_turn(&self, user_text: &str) -> Result<TurnStream, SessionError> {
        let guard = BusyGuard::acquire(&self.inner)?;
        self.validate_input(user_text)?;

        let messages = self.outgoing_messages(user_text);
        debug!(
            session_id = %self.inner.id,
            messages = messages.len(),
            estimated_tokens = estimate_messages_tokens(&messages),
            "turn submitted"
        );
        let request = ChatRequest {
            messages,
            temperature: self.inner.settings.temperature,
            max_tokens: self.inner.settings.max_tokens,
        };
        Ok(TurnStream::start(guard, request, user_text.to_owned()))
    }

    /// The exact message list a turn with `user_text` would send now.
    pub fn outgoing_messages(&self, user_text: &str) -> Vec<Message> {
        let state = self.inner.state();
        let recent: Vec<Message> =
            history_window(&state.history, self.inner.settings.max_history_length)
                .iter()
                .map(HistoryEntry::to_message)
                .collect();
        build_outgoing_messages(&state.instruction, &recent, user_text)
    }

    /// Current role, personality, and instruction text.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state();
        SessionSnapshot {
            session_id: self.inner.id,
            role_id: state.role.id.clone(),
            role_name: state.role.name.clone(),
            role_description: state.role.description.clone(),
            personality_id: state.personality.id.clone(),
            personality_name: state.personality.name.clone(),
            instruction: state.instruction.clone(),
            history_len: state.history.len(),
        }
    }

    /// Every stored message, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.state().history.clone()
    }

    /// Role summaries with the active role flagged.
    pub fn list_roles(&self) -> Vec<RoleSummary> {
        let current = self.inner.state().role.id.clone();
        self.inner.composer.roles().summaries(Some(&current))
    }

    fn validate_input(&self, user_text: &str) -> Result<(), SessionError> {
        if user_text.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let len = user_text.chars().count();
        let max = self.inner.settings.max_input_chars;
        if max > 0 && len > max {
            return Err(SessionError::InputTooLong { len, max });
        }
        Ok(())
    }
}

/// Rebind `role_id`, then run `compose`. A failed composition restores the
/// previous binding unless another caller has rebound the role since.
fn rebind_with_rollback<T>(
    roles: &RoleRegistry,
    role_id: &str,
    personality_id: &str,
    compose: impl FnOnce() -> Result<T, ComposeError>,
) -> Result<(T, String), SessionError> {
    let previous = roles.rebind_personality(role_id, personality_id)?;
    match compose() {
        Ok(value) => Ok((value, previous)),
        Err(e) => {
            if !roles.restore_personality(role_id, personality_id, &previous) {
                warn!(role = %role_id, "binding changed concurrently, rollback skipped");
            }
            Err(e.into())
        }
    }
}
