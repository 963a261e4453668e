//! Per-user conversation history.
//!
//! Histories are sharded by user id: each user gets their own async mutex
//! so concurrent messages from different users never contend, while
//! messages from the same user serialize in arrival order. Nothing here
//! is persisted; history lives for the process lifetime, capped per user.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Local;
use tokio::sync::Mutex as AsyncMutex;

use banmai_core::types::ConversationTurn;

/// One user's history shard.
#[derive(Debug, Default)]
pub struct UserHistory {
    pub turns: Vec<ConversationTurn>,
    /// Epoch seconds of the most recent append.
    pub last_message_at: i64,
}

/// Volatile, capped conversation store keyed by opaque user id.
pub struct ConversationStore {
    shards: Mutex<HashMap<String, Arc<AsyncMutex<UserHistory>>>>,
    cap: usize,
}

impl ConversationStore {
    /// Create a store keeping at most `cap` turns per user.
    pub fn new(cap: usize) -> Self {
        Self {
            shards: Mutex::new(HashMap::new()),
            cap,
        }
    }

    /// Maximum turns kept per user.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Number of users with a history shard.
    pub fn user_count(&self) -> usize {
        match self.shards.lock() {
            Ok(g) => g.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// The shard for `user_id`, created lazily on first use.
    ///
    /// Holding the returned mutex across a whole respond call is what
    /// serializes same-user messages.
    pub fn handle(&self, user_id: &str) -> Arc<AsyncMutex<UserHistory>> {
        let mut shards = match self.shards.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(
            shards
                .entry(user_id.to_string())
                .or_insert_with(Default::default),
        )
    }

    /// Append one turn, enforcing the cap (oldest dropped first).
    pub async fn append(&self, user_id: &str, turn: ConversationTurn) {
        let handle = self.handle(user_id);
        let mut history = handle.lock().await;
        history.turns.push(turn);
        history.last_message_at = Local::now().timestamp();
        Self::trim(&mut history.turns, self.cap);
    }

    /// The last `n` turns for `user_id`, oldest first.
    ///
    /// Does not create a shard for unknown users.
    pub async fn recent(&self, user_id: &str, n: usize) -> Vec<ConversationTurn> {
        let handle = {
            let shards = match self.shards.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            match shards.get(user_id) {
                Some(h) => Arc::clone(h),
                None => return Vec::new(),
            }
        };
        let history = handle.lock().await;
        let start = history.turns.len().saturating_sub(n);
        history.turns[start..].to_vec()
    }

    /// Drop the oldest turns until `turns` fits the cap.
    pub fn trim(turns: &mut Vec<ConversationTurn>, cap: usize) {
        if turns.len() > cap {
            let excess = turns.len() - cap;
            turns.drain(..excess);
        }
    }
}
