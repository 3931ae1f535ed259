//! Conversation transcript storage.
//!
//! Transcripts are ephemeral by design: they live in process memory for the
//! lifetime of the server and are keyed by the provider's thread id. The
//! authoritative conversation history lives on the provider side; this store
//! only mirrors what the relay has seen.

mod transcript;

pub use transcript::{Session, SessionStore, TranscriptEntry};
