//! In-memory knowledge base with snapshot-swap reload and fuzzy matching.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use similar::TextDiff;
use tracing::debug;

use banmai_core::config::KnowledgeConfig;

use crate::abbrev::AbbreviationTable;
use crate::entry::KnowledgeEntry;
use crate::loader;

/// Normalized similarity of two strings in `[0.0, 1.0]`.
///
/// Character-level sequence ratio: 1.0 for identical strings, 0.0 for
/// disjoint ones.
pub fn similarity(a: &str, b: &str) -> f64 {
    f64::from(TextDiff::from_chars(a, b).ratio())
}

// =============================================================================
// KnowledgeBase
// =============================================================================

/// The loaded Q/A entry set plus match scoring.
///
/// Reload builds a complete new snapshot and swaps it in atomically, so
/// concurrent [`KnowledgeBase::find_best_match`] calls see either the full
/// old set or the full new set, never a partial one.
pub struct KnowledgeBase {
    data_dir: PathBuf,
    match_threshold: f64,
    keyword_bonus: f64,
    entries: RwLock<Arc<Vec<KnowledgeEntry>>>,
}

impl KnowledgeBase {
    /// Create an empty base over `data_dir` with default scoring.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let defaults = KnowledgeConfig::default();
        Self {
            data_dir: data_dir.into(),
            match_threshold: defaults.match_threshold,
            keyword_bonus: defaults.keyword_bonus,
            entries: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Create an empty base from configuration.
    pub fn from_config(config: &KnowledgeConfig) -> Self {
        Self {
            data_dir: PathBuf::from(&config.data_dir),
            match_threshold: config.match_threshold,
            keyword_bonus: config.keyword_bonus,
            entries: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Scan the data directory and replace the entry set wholesale.
    ///
    /// Returns the new entry count.
    pub fn load(&self) -> usize {
        let built = Arc::new(loader::load_dir(&self.data_dir));
        let count = built.len();
        let mut entries = match self.entries.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *entries = built;
        count
    }

    /// Rebuild from the same directory. Alias of [`KnowledgeBase::load`]
    /// kept for the administrative reload path.
    pub fn reload(&self) -> usize {
        self.load()
    }

    /// The current entry snapshot.
    pub fn snapshot(&self) -> Arc<Vec<KnowledgeEntry>> {
        match self.entries.read() {
            Ok(g) => Arc::clone(&g),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Find the entry whose question best matches `message`.
    ///
    /// Scores every entry with the maximum of the raw-lowercased and the
    /// abbreviation-expanded similarity ratios, adds the keyword bonus when
    /// any entry keyword occurs in the expanded message, and keeps the
    /// first entry on ties. Returns `None` below the match threshold or on
    /// an empty base. Linear in the entry count.
    pub fn find_best_match(
        &self,
        message: &str,
        abbreviations: &AbbreviationTable,
    ) -> Option<KnowledgeEntry> {
        let entries = self.snapshot();
        if entries.is_empty() {
            return None;
        }

        let raw_message = message.to_lowercase();
        let expanded_message = abbreviations.expand(message);

        let mut best: Option<&KnowledgeEntry> = None;
        let mut best_score = 0.0_f64;

        for entry in entries.iter() {
            let question = entry.question.to_lowercase();
            let expanded_question = abbreviations.expand(&entry.question);

            let raw_score = similarity(&raw_message, &question);
            let expanded_score = similarity(&expanded_message, &expanded_question);
            let mut score = raw_score.max(expanded_score);

            if entry
                .keywords
                .iter()
                .any(|kw| expanded_message.contains(kw.as_str()))
            {
                score += self.keyword_bonus;
            }

            if score > best_score {
                best_score = score;
                best = Some(entry);
            }
        }

        if best_score >= self.match_threshold {
            debug!(
                "Best match ({:.2}): {:?}",
                best_score,
                best.map(|e| e.question.as_str())
            );
            best.cloned()
        } else {
            None
        }
    }
}
