//! One-message exchange protocol.
//!
//! The exchanger drives the full lifecycle of relaying a single user message:
//! 1. Ensure a thread exists (create one if the caller holds none)
//! 2. Post the user message to the thread
//! 3. Start a run of the assistant against the thread
//! 4. Poll run status on a fixed interval, up to a capped attempt count
//! 5. On completion, fetch the thread's messages and extract the reply
//!
//! Every failure path resolves to an [`ExchangeError`] value; nothing in the
//! exchange may take the host process down.

use std::sync::Arc;
use std::time::Duration;

use super::{AssistantApi, MessageRole, RunId, RunStatus, ThreadId, ThreadMessage};

/// Timing knobs for the run poll loop.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeSettings {
    /// Fixed wait between run-status polls.
    pub poll_interval: Duration,
    /// Maximum number of status polls before the run is declared stuck.
    pub poll_max_attempts: u32,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            poll_max_attempts: 60,
        }
    }
}

/// Errors produced by a message exchange.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// A remote call failed (transport error or non-OK status).
    #[error("assistant API call failed: {0}")]
    Api(#[from] anyhow::Error),
    /// The run reached a terminal state other than completed.
    #[error("run ended with status {status:?}")]
    RunFailed {
        /// The terminal status reported by the provider.
        status: RunStatus,
    },
    /// The run stayed pending past the poll cap.
    #[error("run did not complete after {attempts} poll attempts")]
    RunTimedOut {
        /// How many polls were made before giving up.
        attempts: u32,
    },
    /// The thread held no assistant reply in the expected shape.
    #[error("assistant reply had an unexpected shape")]
    UnexpectedShape,
}

/// Drives the exchange protocol against an [`AssistantApi`] backend.
#[derive(Clone)]
pub struct Exchanger {
    api: Arc<dyn AssistantApi>,
    assistant_id: String,
    settings: ExchangeSettings,
}

impl std::fmt::Debug for Exchanger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchanger")
            .field("assistant_id", &self.assistant_id)
            .field("settings", &self.settings)
            .finish()
    }
}

impl Exchanger {
    /// Create a new exchanger over the given backend.
    pub fn new(
        api: Arc<dyn AssistantApi>,
        assistant_id: impl Into<String>,
        settings: ExchangeSettings,
    ) -> Self {
        Self {
            api,
            assistant_id: assistant_id.into(),
            settings,
        }
    }

    /// Relay one user message and return the thread id and assistant reply.
    ///
    /// When `thread_id` is `None` a thread is created first; exactly one
    /// create-thread call precedes the first post-message call. The returned
    /// thread id must be passed back on the next exchange to keep the
    /// conversation on a single thread.
    pub async fn exchange(
        &self,
        thread_id: Option<ThreadId>,
        message: &str,
    ) -> Result<(ThreadId, String), ExchangeError> {
        let thread = match thread_id {
            Some(t) => t,
            None => {
                let t = self.api.create_thread().await?;
                tracing::info!(thread_id = %t, "Created conversation thread");
                t
            }
        };

        self.api
            .post_message(&thread, MessageRole::User, message)
            .await?;

        let run = self.api.create_run(&thread, &self.assistant_id).await?;
        tracing::debug!(thread_id = %thread, run_id = %run, "Run started");

        self.wait_for_run(&thread, &run).await?;

        let messages = self.api.list_messages(&thread).await?;
        let reply = extract_reply(&messages).ok_or(ExchangeError::UnexpectedShape)?;

        tracing::info!(
            thread_id = %thread,
            run_id = %run,
            reply_length = reply.len(),
            "Exchange complete"
        );

        Ok((thread, reply.to_string()))
    }

    /// Poll run status until it completes, fails, or the attempt cap is hit.
    async fn wait_for_run(&self, thread: &ThreadId, run: &RunId) -> Result<(), ExchangeError> {
        let max = self.settings.poll_max_attempts.max(1);

        for attempt in 1..=max {
            let status = self.api.run_status(thread, run).await?;
            tracing::debug!(
                thread_id = %thread,
                run_id = %run,
                attempt,
                status = ?status,
                "Run status polled"
            );

            if status == RunStatus::Completed {
                return Ok(());
            }
            if !status.is_pending() {
                return Err(ExchangeError::RunFailed { status });
            }
            if attempt < max {
                tokio::time::sleep(self.settings.poll_interval).await;
            }
        }

        Err(ExchangeError::RunTimedOut { attempts: max })
    }
}

/// First assistant entry's first text part, per the provider's newest-first
/// message ordering.
fn extract_reply(messages: &[ThreadMessage]) -> Option<&str> {
    messages
        .iter()
        .find(|m| m.role == MessageRole::Assistant)
        .and_then(ThreadMessage::text)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::assistant::{ContentPart, TextValue};

    /// Scripted backend recording the calls the exchanger makes.
    #[derive(Default)]
    struct ScriptedApi {
        statuses: Mutex<VecDeque<RunStatus>>,
        replies: Mutex<Vec<ThreadMessage>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        fn with_statuses(statuses: &[RunStatus]) -> Self {
            Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                replies: Mutex::new(vec![assistant_message("scripted reply")]),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn assistant_message(text: &str) -> ThreadMessage {
        ThreadMessage {
            role: MessageRole::Assistant,
            content: vec![ContentPart {
                text: Some(TextValue {
                    value: text.to_string(),
                }),
            }],
        }
    }

    fn user_message(text: &str) -> ThreadMessage {
        ThreadMessage {
            role: MessageRole::User,
            content: vec![ContentPart {
                text: Some(TextValue {
                    value: text.to_string(),
                }),
            }],
        }
    }

    #[async_trait::async_trait]
    impl AssistantApi for ScriptedApi {
        async fn create_thread(&self) -> anyhow::Result<ThreadId> {
            self.record("create_thread");
            Ok(ThreadId("thread-1".to_string()))
        }

        async fn post_message(
            &self,
            thread: &ThreadId,
            role: MessageRole,
            _content: &str,
        ) -> anyhow::Result<()> {
            self.record(format!("post_message:{thread}:{role}"));
            Ok(())
        }

        async fn create_run(
            &self,
            _thread: &ThreadId,
            assistant_id: &str,
        ) -> anyhow::Result<RunId> {
            self.record(format!("create_run:{assistant_id}"));
            Ok(RunId("run-1".to_string()))
        }

        async fn run_status(&self, _thread: &ThreadId, _run: &RunId) -> anyhow::Result<RunStatus> {
            self.record("run_status");
            let mut guard = self.statuses.lock().unwrap();
            Ok(guard.pop_front().unwrap_or(RunStatus::InProgress))
        }

        async fn list_messages(&self, _thread: &ThreadId) -> anyhow::Result<Vec<ThreadMessage>> {
            self.record("list_messages");
            Ok(self.replies.lock().unwrap().clone())
        }
    }

    fn fast_settings(max_attempts: u32) -> ExchangeSettings {
        ExchangeSettings {
            poll_interval: Duration::from_millis(1),
            poll_max_attempts: max_attempts,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn creates_thread_exactly_once_before_first_post() {
        let api = Arc::new(ScriptedApi::with_statuses(&[RunStatus::Completed]));
        let exchanger = Exchanger::new(Arc::clone(&api) as Arc<dyn AssistantApi>, "asst-1", fast_settings(5));

        let (thread, reply) = exchanger.exchange(None, "Hello").await.unwrap();
        assert_eq!(thread.as_str(), "thread-1");
        assert_eq!(reply, "scripted reply");

        let calls = api.calls();
        assert_eq!(calls[0], "create_thread");
        assert_eq!(calls[1], "post_message:thread-1:user");
        assert_eq!(calls.iter().filter(|c| *c == "create_thread").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reuses_supplied_thread_without_creating() {
        let api = Arc::new(ScriptedApi::with_statuses(&[RunStatus::Completed]));
        let exchanger = Exchanger::new(Arc::clone(&api) as Arc<dyn AssistantApi>, "asst-1", fast_settings(5));

        let held = ThreadId("thread-held".to_string());
        let (thread, _) = exchanger.exchange(Some(held.clone()), "again").await.unwrap();
        assert_eq!(thread, held);

        let calls = api.calls();
        assert!(!calls.contains(&"create_thread".to_string()));
        assert_eq!(calls[0], "post_message:thread-held:user");
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_completed_then_lists_once() {
        let api = Arc::new(ScriptedApi::with_statuses(&[
            RunStatus::Queued,
            RunStatus::InProgress,
            RunStatus::InProgress,
            RunStatus::Completed,
        ]));
        let exchanger = Exchanger::new(Arc::clone(&api) as Arc<dyn AssistantApi>, "asst-1", fast_settings(10));

        exchanger.exchange(None, "poll me").await.unwrap();

        let calls = api.calls();
        assert_eq!(calls.iter().filter(|c| *c == "run_status").count(), 4);
        assert_eq!(calls.iter().filter(|c| *c == "list_messages").count(), 1);
        // list_messages comes strictly after the last poll
        assert_eq!(calls.last().unwrap(), "list_messages");
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_run_times_out_at_the_cap() {
        let api = Arc::new(ScriptedApi::with_statuses(&[]));
        let exchanger = Exchanger::new(Arc::clone(&api) as Arc<dyn AssistantApi>, "asst-1", fast_settings(3));

        let err = exchanger.exchange(None, "never done").await.unwrap_err();
        match err {
            ExchangeError::RunTimedOut { attempts } => assert_eq!(attempts, 3),
            other => panic!("expected RunTimedOut, got {other:?}"),
        }

        let calls = api.calls();
        assert_eq!(calls.iter().filter(|c| *c == "run_status").count(), 3);
        assert!(!calls.contains(&"list_messages".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_surfaces_terminal_status() {
        let api = Arc::new(ScriptedApi::with_statuses(&[
            RunStatus::InProgress,
            RunStatus::Failed,
        ]));
        let exchanger = Exchanger::new(Arc::clone(&api) as Arc<dyn AssistantApi>, "asst-1", fast_settings(10));

        let err = exchanger.exchange(None, "boom").await.unwrap_err();
        match err {
            ExchangeError::RunFailed { status } => assert_eq!(status, RunStatus::Failed),
            other => panic!("expected RunFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reply_is_first_assistant_entry() {
        let api = Arc::new(ScriptedApi::with_statuses(&[RunStatus::Completed]));
        // Newest-first listing: assistant reply, then the user's own message,
        // then an older assistant reply.
        *api.replies.lock().unwrap() = vec![
            assistant_message("newest reply"),
            user_message("question"),
            assistant_message("older reply"),
        ];
        let exchanger = Exchanger::new(Arc::clone(&api) as Arc<dyn AssistantApi>, "asst-1", fast_settings(5));

        let (_, reply) = exchanger.exchange(None, "question").await.unwrap();
        assert_eq!(reply, "newest reply");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_assistant_reply_is_unexpected_shape() {
        let api = Arc::new(ScriptedApi::with_statuses(&[RunStatus::Completed]));
        *api.replies.lock().unwrap() = vec![user_message("only me here")];
        let exchanger = Exchanger::new(Arc::clone(&api) as Arc<dyn AssistantApi>, "asst-1", fast_settings(5));

        let err = exchanger.exchange(None, "hello").await.unwrap_err();
        assert!(matches!(err, ExchangeError::UnexpectedShape));
    }
}
