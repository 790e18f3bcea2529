//! Conversation orchestration: one user turn in, one assistant reply out.

use crate::provider::{ChatCompleter, CompletionError, Role};
use crate::session::{SessionStore, MAX_HISTORY};
use std::sync::Arc;

/// Runs conversation turns against a session store and an upstream completer.
pub struct Conversation {
    sessions: Arc<SessionStore>,
    completer: Arc<dyn ChatCompleter>,
    max_history: usize,
}

impl Conversation {
    pub fn new(sessions: Arc<SessionStore>, completer: Arc<dyn ChatCompleter>) -> Self {
        Self {
            sessions,
            completer,
            max_history: MAX_HISTORY,
        }
    }

    /// Override how many messages each session retains after a turn.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Process one user message for `session_key` and return the reply.
    ///
    /// The session stays locked for the whole turn, so turns on the same key
    /// run one after another. If the upstream call fails, the user message
    /// remains in the history without a reply and the error is returned
    /// unchanged.
    pub async fn handle(
        &self,
        session_key: &str,
        user_text: &str,
    ) -> Result<String, CompletionError> {
        let handle = self.sessions.get_or_create(session_key).await;
        let mut session = handle.lock().await;

        session.push(Role::User, user_text);

        let reply = match self.completer.complete(session.messages()).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    session_id = %session_key,
                    provider = self.completer.name(),
                    kind = e.kind(),
                    error = %e,
                    "Query failed"
                );
                return Err(e);
            }
        };

        session.push(Role::Assistant, reply.clone());
        session.trim(self.max_history);

        tracing::info!(
            session_id = %session_key,
            history_len = session.len(),
            "Processed query"
        );

        Ok(reply)
    }
}
