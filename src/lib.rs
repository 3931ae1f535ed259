//! Embeddable assistant chat widget with a backend relay.
//!
//! Serves a floating chat widget as a self-contained script and relays the
//! widget's messages to a hosted conversational-assistant API. The browser
//! only ever talks to this service; the assistant credential stays on the
//! server.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP relay (`/config`, `/chat`, widget assets)
//! - **Assistant client**: reqwest driver for the provider's thread/run API
//! - **Exchange**: one-message protocol (thread, post, run, capped poll, reply)
//! - **UI**: widget page and bootstrap script emitted as static strings
//!
//! # Modules
//!
//! - [`assistant`]: provider API client and exchange driver
//! - [`config`]: CLI, file and environment configuration
//! - [`server`]: router and request handlers
//! - [`session`]: in-memory conversation transcripts
//! - [`ui`]: widget markup and script

pub mod assistant;
pub mod config;
pub mod server;
pub mod session;
pub mod ui;

use std::sync::Arc;

use assistant::Exchanger;
use session::SessionStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Exchange driver for relaying messages to the assistant provider.
    pub exchanger: Arc<Exchanger>,
    /// Transcript store keyed by remote thread id.
    pub sessions: SessionStore,
    /// Assistant identifier exposed to the widget via `/config`.
    pub assistant_id: String,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("assistant_id", &self.assistant_id)
            .finish()
    }
}
