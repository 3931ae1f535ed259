//! Assistant provider API client and exchange driver.
//!
//! The provider exposes a thread-based conversation API: a thread groups the
//! exchanged messages, and a *run* is one invocation of the assistant against
//! the thread's history, polled until it completes.
//!
//! # Overview
//!
//! The [`AssistantApi`] trait defines the five remote operations every
//! backend must support. [`HttpAssistantClient`] implements it over HTTP;
//! the [`Exchanger`] builds the one-message exchange protocol on top.

pub mod client;
pub mod exchange;

pub use client::HttpAssistantClient;
pub use exchange::{ExchangeError, ExchangeSettings, Exchanger};

use serde::{Deserialize, Serialize};

/// Connection settings for the assistant provider.
#[derive(Clone)]
pub struct AssistantSettings {
    /// Base URL for the provider API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// API credential. Never leaves the server process.
    pub api_key: String,
    /// Assistant identifier runs are started against.
    pub assistant_id: String,
}

impl std::fmt::Debug for AssistantSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("assistant_id", &self.assistant_id)
            .finish()
    }
}

/// Remote conversation-thread identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one assistant run against a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a run as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Expired,
    Incomplete,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether the poll loop should keep waiting on this status.
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }
}

/// Role of a thread message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message retrieved from a thread.
///
/// Content mirrors the provider's part list; only text parts carry a value.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    /// Author of the message.
    pub role: MessageRole,
    /// Ordered content parts.
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

impl ThreadMessage {
    /// Text of the first content part, if it is a text part.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content
            .first()
            .and_then(|part| part.text.as_ref())
            .map(|t| t.value.as_str())
    }
}

/// A content part of a thread message.
///
/// Non-text parts (images, files) deserialize with `text: None` and are
/// ignored by the relay.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentPart {
    /// Text payload, present for `type: "text"` parts.
    #[serde(default)]
    pub text: Option<TextValue>,
}

/// Text payload of a content part.
#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    /// The literal message text.
    pub value: String,
}

/// The five remote operations of the assistant provider API.
///
/// Implementations must be cheap to clone behind an `Arc`; the exchange
/// driver issues every operation as a separate call.
#[async_trait::async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create a new conversation thread.
    async fn create_thread(&self) -> anyhow::Result<ThreadId>;

    /// Append a message to a thread.
    async fn post_message(
        &self,
        thread: &ThreadId,
        role: MessageRole,
        content: &str,
    ) -> anyhow::Result<()>;

    /// Start a run of the assistant against a thread.
    async fn create_run(&self, thread: &ThreadId, assistant_id: &str) -> anyhow::Result<RunId>;

    /// Fetch the current status of a run.
    async fn run_status(&self, thread: &ThreadId, run: &RunId) -> anyhow::Result<RunStatus>;

    /// List a thread's messages, newest first.
    async fn list_messages(&self, thread: &ThreadId) -> anyhow::Result<Vec<ThreadMessage>>;
}
