//! Chat session and transcript cache.
//!
//! The backend owns sessions and history; this module keeps a local copy of
//! both so the transcript survives restarts and the session id can be echoed
//! back on every turn.
//!
//! Sending is split into [`ChatSession::begin_send`], the network call
//! ([`ChatTurn::dispatch`]) and [`ChatSession::complete_send`] so a front end
//! can keep the session responsive while a turn is outstanding. Only one turn
//! may be outstanding at a time.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::api::{session_headers, ApiClient, Method};
use crate::context::ClientContext;
use crate::error::{Result, StorageError};
use crate::mode::ResponseMode;
use crate::state::ChatMessage;
use crate::storage::{Storage, StorageExt, MESSAGES_KEY, SESSION_ID_KEY};

/// Prior turns the backend should take into account.
pub const HISTORY_LIMIT: u32 = 10;

/// Replies containing this phrase ("inappropriate advice") raise a warning.
pub const SAFETY_MARKER: &str = "不当建议";
pub const SAFETY_WARNING: &str = "Inappropriate advice detected, please rephrase your question.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub response_mode: ResponseMode,
    pub history_limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Option<Vec<ChatMessage>>,
    #[serde(default)]
    session_id: Option<String>,
}

/// A turn that has been recorded locally and is waiting on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub request: ChatRequest,
    pub session_id: Option<String>,
}

impl ChatTurn {
    pub async fn dispatch(&self, api: &ApiClient) -> Result<ChatReply> {
        api.request_as(
            "/chat_with_context",
            Method::Post,
            Some(&self.request),
            &session_headers(self.session_id.as_deref()),
        )
        .await
    }
}

/// What a completed turn changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    pub reply: String,
    pub session_adopted: bool,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    session_id: Option<String>,
    messages: Vec<ChatMessage>,
    in_flight: bool,
    mode: ResponseMode,
    warning: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the cached session id and transcript. No network.
    pub fn restore(store: &dyn Storage) -> std::result::Result<Self, StorageError> {
        let session_id = store.get_string(SESSION_ID_KEY)?;
        let messages = store
            .get_as::<Vec<ChatMessage>>(MESSAGES_KEY)?
            .unwrap_or_default();

        Ok(Self {
            session_id,
            messages,
            ..Self::default()
        })
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ResponseMode) {
        self.mode = mode;
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Record the user's message and hand back the turn to dispatch.
    ///
    /// Returns `None` without touching any state when the text is blank or
    /// another turn is still outstanding.
    pub fn begin_send(&mut self, text: &str) -> Option<ChatTurn> {
        let text = text.trim();
        if text.is_empty() || self.in_flight {
            return None;
        }

        self.in_flight = true;
        self.warning = None;
        self.messages.push(ChatMessage::user(text));

        Some(ChatTurn {
            request: ChatRequest {
                message: text.to_string(),
                response_mode: self.mode,
                history_limit: HISTORY_LIMIT,
            },
            session_id: self.session_id.clone(),
        })
    }

    /// Fold the backend's answer into local state.
    ///
    /// A failed turn keeps the optimistic user message and changes nothing
    /// else; the error is handed back for the caller to report.
    pub fn complete_send(
        &mut self,
        store: &dyn Storage,
        result: Result<ChatReply>,
    ) -> Result<ChatOutcome> {
        self.in_flight = false;
        let reply = result?;

        let session_adopted = match reply.session_id.as_deref().filter(|id| !id.is_empty()) {
            Some(returned) => self.adopt_session(store, returned)?,
            None => false,
        };

        let content = reply.reply.unwrap_or_default();
        self.messages.push(ChatMessage::assistant(content.clone()));
        store.set_as(MESSAGES_KEY, &self.messages)?;

        if content.contains(SAFETY_MARKER) {
            self.warning = Some(SAFETY_WARNING.to_string());
        }

        Ok(ChatOutcome {
            reply: content,
            session_adopted,
            warning: self.warning.clone(),
        })
    }

    /// `begin_send`, dispatch and `complete_send` in one go.
    ///
    /// `Ok(None)` means the send was suppressed (blank text or a turn already
    /// outstanding) and no request was made.
    pub async fn send_message(
        &mut self,
        ctx: &ClientContext,
        text: &str,
    ) -> Result<Option<ChatOutcome>> {
        let Some(turn) = self.begin_send(text) else {
            return Ok(None);
        };
        let result = turn.dispatch(&ctx.api).await;
        self.complete_send(ctx.store.as_ref(), result).map(Some)
    }

    /// Replace the local transcript with the backend's copy.
    pub async fn load_history(&mut self, ctx: &ClientContext) -> Result<()> {
        let history: Option<HistoryResponse> = ctx
            .api
            .request_as::<(), _>(
                "/history",
                Method::Get,
                None,
                &session_headers(self.session_id.as_deref()),
            )
            .await?;

        // An empty or `null` body carries nothing to replace the cache with.
        let Some(history) = history else {
            return Ok(());
        };
        let Some(messages) = history.messages else {
            return Ok(());
        };

        self.messages = messages;
        ctx.store.set_as(MESSAGES_KEY, &self.messages)?;

        if self.session_id.is_none() {
            if let Some(returned) = history.session_id.filter(|id| !id.is_empty()) {
                self.adopt_session(ctx.store.as_ref(), &returned)?;
            }
        }

        Ok(())
    }

    /// Ask the backend to empty the current session, then drop the local copy.
    pub async fn clear_history(&mut self, ctx: &ClientContext) -> Result<()> {
        ctx.api
            .request(
                "/history/session",
                Method::Delete,
                None,
                &session_headers(self.session_id.as_deref()),
            )
            .await?;

        self.messages.clear();
        ctx.store.remove(MESSAGES_KEY)?;
        Ok(())
    }

    /// Forget the local session and transcript; the next turn opens a new
    /// backend session.
    pub fn reset_local(&mut self, store: &dyn Storage) -> std::result::Result<(), StorageError> {
        store.remove(SESSION_ID_KEY)?;
        store.remove(MESSAGES_KEY)?;
        self.session_id = None;
        self.messages.clear();
        self.warning = None;
        Ok(())
    }

    /// Adopt `returned` if no session is set yet. An established session is
    /// never replaced by a different id.
    fn adopt_session(
        &mut self,
        store: &dyn Storage,
        returned: &str,
    ) -> std::result::Result<bool, StorageError> {
        match self.session_id.as_deref() {
            None => {
                store.set_as(SESSION_ID_KEY, returned)?;
                self.session_id = Some(returned.to_string());
                info!("adopted session {}", returned);
                Ok(true)
            }
            Some(current) if current != returned => {
                warn!(
                    "backend returned session {} while {} is active; keeping the active one",
                    returned, current
                );
                Ok(false)
            }
            Some(_) => Ok(false),
        }
    }
}
