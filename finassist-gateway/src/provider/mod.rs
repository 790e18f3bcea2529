//! Upstream chat-completion client.
//!
//! The orchestrator only sees the [`ChatCompleter`] trait, so tests can drive
//! it with a stub while production uses [`GroqProvider`].

mod groq;

pub use groq::GroqProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Completion Trait
// ============================================================================

/// Something that turns a conversation history into the next assistant reply.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Produce a reply for `history` (oldest message first).
    ///
    /// Exactly one upstream attempt is made; failures are returned as-is.
    async fn complete(&self, history: &[Message]) -> Result<String, CompletionError>;
}

/// Failure of a single completion attempt.
///
/// The `Display` text of each variant is what HTTP callers see.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// Credential is missing; no request was sent.
    #[error("{0} not found in environment")]
    Configuration(String),

    /// The endpoint could not be reached or did not answer in time.
    #[error("Failed to connect to Groq API")]
    Connectivity(String),

    /// The endpoint answered with a non-success status.
    #[error("Groq API error: {body}")]
    Upstream { status: u16, body: String },

    /// Anything else, such as an undecodable response.
    #[error("Internal server error")]
    Internal(String),
}

impl CompletionError {
    /// Short machine-readable kind, used as a log field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Connectivity(_) => "connectivity",
            Self::Upstream { .. } => "upstream",
            Self::Internal(_) => "internal",
        }
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        };
        f.write_str(s)
    }
}

/// A role-tagged utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }

    #[test]
    fn test_error_details() {
        assert_eq!(
            CompletionError::Configuration("GROQ_API_KEY".into()).to_string(),
            "GROQ_API_KEY not found in environment"
        );
        assert_eq!(
            CompletionError::Connectivity("connection refused".into()).to_string(),
            "Failed to connect to Groq API"
        );
        assert_eq!(
            CompletionError::Upstream {
                status: 401,
                body: "invalid key".into()
            }
            .to_string(),
            "Groq API error: invalid key"
        );
        assert_eq!(
            CompletionError::Internal("bad json".into()).to_string(),
            "Internal server error"
        );
    }
}
