//! HTTP driver for the assistant provider API.
//!
//! This module implements the [`AssistantApi`] trait against the provider's
//! REST surface (`/v1/threads`, `/v1/threads/{id}/messages`,
//! `/v1/threads/{id}/runs`). Every call carries the bearer credential and the
//! `OpenAI-Beta: assistants=v2` header.

use std::time::Duration;

use serde::Deserialize;

use super::{AssistantApi, AssistantSettings, MessageRole, RunId, RunStatus, ThreadId, ThreadMessage};

/// Header opting into the provider's assistants API surface.
const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

/// Driver for the assistant provider HTTP API.
#[derive(Clone)]
pub struct HttpAssistantClient {
    http: reqwest::Client,
    settings: AssistantSettings,
}

impl std::fmt::Debug for HttpAssistantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAssistantClient")
            .field("settings", &self.settings)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    status: RunStatus,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

impl HttpAssistantClient {
    /// Create a new client with the given settings and per-request timeout.
    pub fn new(settings: AssistantSettings, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.base_url.trim_end_matches('/'))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(path))
            .bearer_auth(&self.settings.api_key)
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(self.url(path))
            .bearer_auth(&self.settings.api_key)
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }
}

#[async_trait::async_trait]
impl AssistantApi for HttpAssistantClient {
    async fn create_thread(&self) -> anyhow::Result<ThreadId> {
        let created: CreatedObject = self
            .post("/v1/threads")
            .json(&serde_json::json!({}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(ThreadId(created.id))
    }

    async fn post_message(
        &self,
        thread: &ThreadId,
        role: MessageRole,
        content: &str,
    ) -> anyhow::Result<()> {
        self.post(&format!("/v1/threads/{thread}/messages"))
            .json(&serde_json::json!({
                "role": role.to_string(),
                "content": content,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn create_run(&self, thread: &ThreadId, assistant_id: &str) -> anyhow::Result<RunId> {
        let created: CreatedObject = self
            .post(&format!("/v1/threads/{thread}/runs"))
            .json(&serde_json::json!({ "assistant_id": assistant_id }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(RunId(created.id))
    }

    async fn run_status(&self, thread: &ThreadId, run: &RunId) -> anyhow::Result<RunStatus> {
        let obj: RunObject = self
            .get(&format!("/v1/threads/{thread}/runs/{run}"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(obj.status)
    }

    async fn list_messages(&self, thread: &ThreadId) -> anyhow::Result<Vec<ThreadMessage>> {
        let list: MessageList = self
            .get(&format!("/v1/threads/{thread}/messages"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(list.data)
    }
}
