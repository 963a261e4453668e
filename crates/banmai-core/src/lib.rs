//! Shared foundation for the banmai chatbot.
//!
//! Configuration, the top-level error type, and the conversation/reply
//! types shared by the knowledge-base and chat crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::BanmaiConfig;
pub use error::{BanmaiError, Result};
pub use types::{ConversationTurn, Reply, Role};

/// Initialize tracing with the given level, honoring `RUST_LOG` when set.
///
/// Intended for the embedding binary; safe to call once at startup.
pub fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
