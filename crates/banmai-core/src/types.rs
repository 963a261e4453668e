use serde::{Deserialize, Serialize};

// =============================================================================
// Conversation types
// =============================================================================

/// Who produced a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The customer sending messages.
    User,
    /// The bot's reply.
    Assistant,
}

/// One turn in a per-user conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// The engine's answer to one inbound message.
///
/// Always carries text; the image URL is present only when a knowledge-base
/// match supplied one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub image_url: Option<String>,
}

impl Reply {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
        }
    }
}
