//! Knowledge base for the banmai chatbot.
//!
//! Loads merchant Q/A spreadsheets into an in-memory snapshot, expands
//! Vietnamese shorthand, and fuzzy-matches inbound messages against the
//! loaded questions.

pub mod abbrev;
pub mod base;
pub mod entry;
pub mod error;
pub mod loader;

pub use abbrev::AbbreviationTable;
pub use base::{similarity, KnowledgeBase};
pub use entry::KnowledgeEntry;
pub use error::KbError;
