//! The response engine.
//!
//! One `respond` call per inbound message: expand, match, prompt, call the
//! completion service, reconcile with the fallback policy, record the
//! turn pair. `respond` never fails; every failure below it is absorbed
//! into a best-effort reply.

use std::sync::{Arc, RwLock};

use chrono::Local;
use tracing::{info, warn};

use banmai_core::config::BanmaiConfig;
use banmai_core::types::{ConversationTurn, Reply};
use banmai_kb::{AbbreviationTable, KnowledgeBase};

use crate::client::CompletionService;
use crate::error::CompletionError;
use crate::prompt;
use crate::store::ConversationStore;

/// Counters reported to the admin surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineStats {
    /// Loaded knowledge entries.
    pub entries: usize,
    /// Users with conversation history.
    pub conversations: usize,
    /// Known abbreviations.
    pub abbreviations: usize,
}

// =============================================================================
// Engine
// =============================================================================

/// Owns the knowledge base, conversation store, and completion client.
///
/// Constructed from configuration by the request-handling layer and passed
/// explicitly; reconfiguration builds a new engine and swaps it into an
/// [`EngineSlot`].
pub struct Engine {
    abbreviations: AbbreviationTable,
    knowledge: Arc<KnowledgeBase>,
    store: ConversationStore,
    client: Arc<dyn CompletionService>,
    context_turns: usize,
    category_cap: usize,
}

impl Engine {
    /// Build an engine from configuration and load the knowledge base.
    pub fn new(config: &BanmaiConfig, client: Arc<dyn CompletionService>) -> Self {
        let knowledge = Arc::new(KnowledgeBase::from_config(&config.knowledge));
        let count = knowledge.load();
        info!("Engine ready with {} knowledge entries", count);

        Self {
            abbreviations: AbbreviationTable::from_config(&config.knowledge),
            knowledge,
            store: ConversationStore::new(config.chat.history_cap),
            client,
            context_turns: config.chat.context_turns,
            category_cap: config.chat.category_cap,
        }
    }

    /// Answer one inbound message. Always produces a reply.
    pub async fn respond(&self, user_id: &str, message: &str) -> Reply {
        let expanded = self.abbreviations.expand(message);
        let direct_match = self.knowledge.find_best_match(message, &self.abbreviations);

        // Hold the user's shard for the whole call so messages from the
        // same user serialize in arrival order.
        let handle = self.store.handle(user_id);
        let mut history = handle.lock().await;

        let context_start = history.turns.len().saturating_sub(self.context_turns);
        let context = history.turns[context_start..].to_vec();

        let snapshot = self.knowledge.snapshot();
        let system_instruction =
            prompt::build_system_instruction(&snapshot, direct_match.as_ref(), self.category_cap);
        let user_content = prompt::build_user_content(message, &expanded);

        let completion = match self
            .client
            .complete(&system_instruction, &context, &user_content)
            .await
        {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) => Err(CompletionError::Malformed("empty completion".to_string())),
            Err(e) => Err(e),
        };

        match completion {
            Ok(answer) => {
                history.turns.push(ConversationTurn::user(message));
                history.turns.push(ConversationTurn::assistant(&answer));
                ConversationStore::trim(&mut history.turns, self.store.cap());
                history.last_message_at = Local::now().timestamp();

                Reply {
                    text: answer,
                    image_url: direct_match.and_then(|e| e.image_url),
                }
            }
            Err(CompletionError::NotConfigured) => {
                warn!("Completion service not configured; sending setup notice");
                Reply::text_only(prompt::NOT_CONFIGURED_REPLY)
            }
            Err(e) => {
                warn!("Completion failed for user {}: {}", user_id, e);
                match direct_match {
                    Some(entry) => Reply {
                        text: entry.answer,
                        image_url: entry.image_url,
                    },
                    None => Reply::text_only(prompt::APOLOGY),
                }
            }
        }
    }

    /// Rebuild the knowledge base from its directory; returns the entry
    /// count. Triggered by administrative file upload/delete.
    pub fn reload(&self) -> usize {
        self.knowledge.reload()
    }

    /// Register one extra shorthand expansion.
    pub fn add_abbreviation(&self, abbr: &str, full: &str) {
        self.abbreviations.add(abbr, full);
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            entries: self.knowledge.len(),
            conversations: self.store.user_count(),
            abbreviations: self.abbreviations.len(),
        }
    }

    /// The conversation store, exposed for inspection.
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }
}

// =============================================================================
// EngineSlot
// =============================================================================

/// Holder for the active engine.
///
/// Reconfiguration builds a fresh [`Engine`] and swaps it in atomically;
/// in-flight calls keep the engine they started with.
pub struct EngineSlot {
    inner: RwLock<Arc<Engine>>,
}

impl EngineSlot {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: RwLock::new(Arc::new(engine)),
        }
    }

    /// The currently active engine.
    pub fn current(&self) -> Arc<Engine> {
        match self.inner.read() {
            Ok(g) => Arc::clone(&g),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the active engine.
    pub fn swap(&self, engine: Engine) {
        let mut inner = match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *inner = Arc::new(engine);
        info!("Engine reconfigured");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum StubMode {
        Succeed(&'static str),
        Fail,
        NotConfigured,
    }

    struct StubCompletion {
        mode: StubMode,
        calls: AtomicUsize,
    }

    impl StubCompletion {
        fn new(mode: StubMode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionService for StubCompletion {
        async fn complete(
            &self,
            _system_instruction: &str,
            _history: &[ConversationTurn],
            _user_message: &str,
        ) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                StubMode::Succeed(text) => Ok(format!("  {text}  ")),
                StubMode::Fail => Err(CompletionError::Http("connection refused".to_string())),
                StubMode::NotConfigured => Err(CompletionError::NotConfigured),
            }
        }
    }

    fn config_with_data(dir: &std::path::Path) -> BanmaiConfig {
        let mut config = BanmaiConfig::default();
        config.knowledge.data_dir = dir.to_string_lossy().into_owned();
        config
    }

    fn engine_with_faq(dir: &std::path::Path, client: Arc<dyn CompletionService>) -> Engine {
        std::fs::write(
            dir.join("faq.csv"),
            "question,answer,image,keywords,category\n\
             Giá bao nhiêu?,150k ạ,https://img.example/gia.png,\"giá, tiền\",Giá cả\n",
        )
        .unwrap();
        Engine::new(&config_with_data(dir), client)
    }

    #[tokio::test]
    async fn test_respond_success_appends_history_and_image() {
        let dir = tempfile::tempdir().unwrap();
        let client = StubCompletion::new(StubMode::Succeed("Dạ 150k ạ! 😊"));
        let engine = engine_with_faq(dir.path(), client.clone());

        let reply = engine.respond("u1", "giá sản phẩm này bao nhiêu").await;
        assert_eq!(reply.text, "Dạ 150k ạ! 😊");
        assert_eq!(reply.image_url.as_deref(), Some("https://img.example/gia.png"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);

        let turns = engine.store().recent("u1", 10).await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "giá sản phẩm này bao nhiêu");
        assert_eq!(turns[1].text, "Dạ 150k ạ! 😊");
    }

    #[tokio::test]
    async fn test_respond_failure_with_match_degrades_to_entry() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_faq(dir.path(), StubCompletion::new(StubMode::Fail));

        let reply = engine.respond("u1", "giá sản phẩm này bao nhiêu").await;
        assert_eq!(reply.text, "150k ạ");
        assert_eq!(reply.image_url.as_deref(), Some("https://img.example/gia.png"));
    }

    #[tokio::test]
    async fn test_respond_failure_without_match_apologizes() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_faq(dir.path(), StubCompletion::new(StubMode::Fail));

        let reply = engine.respond("u1", "xin chào bạn khỏe không").await;
        assert_eq!(reply.text, prompt::APOLOGY);
        assert!(reply.image_url.is_none());
    }

    #[tokio::test]
    async fn test_respond_not_configured_notice() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_faq(dir.path(), StubCompletion::new(StubMode::NotConfigured));

        let reply = engine.respond("u1", "giá bao nhiêu").await;
        assert_eq!(reply.text, prompt::NOT_CONFIGURED_REPLY);
        assert!(reply.image_url.is_none());
    }

    #[tokio::test]
    async fn test_respond_always_non_empty() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_faq(dir.path(), StubCompletion::new(StubMode::Fail));

        for message in ["", "?!", "xin chào", "cod"] {
            let reply = engine.respond("u1", message).await;
            assert!(!reply.text.is_empty(), "empty reply for {message:?}");
        }
    }

    #[tokio::test]
    async fn test_history_never_exceeds_cap() {
        let dir = tempfile::tempdir().unwrap();
        let client = StubCompletion::new(StubMode::Succeed("Dạ vâng ạ"));
        let engine = engine_with_faq(dir.path(), client);

        for i in 0..30 {
            engine.respond("u1", &format!("tin nhắn {i}")).await;
        }
        let turns = engine.store().recent("u1", 100).await;
        assert_eq!(turns.len(), 20);
        // Most recent pair survives.
        assert_eq!(turns[18].text, "tin nhắn 29");
    }

    #[tokio::test]
    async fn test_failed_completion_leaves_history_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_faq(dir.path(), StubCompletion::new(StubMode::Fail));

        engine.respond("u1", "giá bao nhiêu").await;
        assert!(engine.store().recent("u1", 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let client = StubCompletion::new(StubMode::Succeed("Dạ"));
        let engine = engine_with_faq(dir.path(), client);
        assert_eq!(engine.stats().entries, 1);

        std::fs::write(
            dir.path().join("more.csv"),
            "question,answer\nShip mất mấy ngày?,2-3 ngày ạ\n",
        )
        .unwrap();
        assert_eq!(engine.reload(), 2);
        assert_eq!(engine.stats().entries, 2);
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let dir = tempfile::tempdir().unwrap();
        let client = StubCompletion::new(StubMode::Succeed("Dạ"));
        let engine = engine_with_faq(dir.path(), client);

        engine.respond("u1", "giá bao nhiêu").await;
        engine.respond("u2", "cod được không").await;

        let stats = engine.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.conversations, 2);
        assert!(stats.abbreviations > 50);

        engine.add_abbreviation("xk", "xuất khẩu");
        assert_eq!(engine.stats().abbreviations, stats.abbreviations + 1);
    }

    #[tokio::test]
    async fn test_engine_slot_swap() {
        let dir = tempfile::tempdir().unwrap();
        let slot = EngineSlot::new(engine_with_faq(
            dir.path(),
            StubCompletion::new(StubMode::Fail),
        ));
        let before = slot.current();
        assert_eq!(before.stats().entries, 1);

        let dir2 = tempfile::tempdir().unwrap();
        slot.swap(Engine::new(
            &config_with_data(dir2.path()),
            StubCompletion::new(StubMode::Fail),
        ));

        // The old handle stays usable; the slot serves the new engine.
        assert_eq!(before.stats().entries, 1);
        assert_eq!(slot.current().stats().entries, 0);
    }
}
