//! Response composition for the banmai chatbot.
//!
//! Wires the knowledge base, per-user conversation store, and the Gemini
//! completion service into an engine whose `respond` call always produces
//! a best-effort reply.

pub mod client;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod prompt;
pub mod store;

pub use client::{CompletionService, GeminiClient};
pub use dispatch::{dispatch, MessageSink, MessengerSink};
pub use engine::{Engine, EngineSlot, EngineStats};
pub use error::{CompletionError, SinkError};
pub use store::ConversationStore;
