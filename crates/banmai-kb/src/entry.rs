use serde::{Deserialize, Serialize};

/// Category assigned to entries whose spreadsheet row left it blank.
pub const DEFAULT_CATEGORY: &str = "Chung";

/// One question/answer pair from a merchant spreadsheet.
///
/// Immutable once loaded; the whole entry set is replaced on reload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// File name the row came from.
    pub source_file: String,
    /// Sample customer question. Never empty after loading.
    pub question: String,
    /// Canned answer for that question.
    pub answer: String,
    /// Public product-image URL, when the row provides one.
    pub image_url: Option<String>,
    /// Lowercased, trimmed keywords for the matcher's substring bonus.
    pub keywords: Vec<String>,
    /// Grouping used when dumping the base into the prompt.
    pub category: String,
}

impl KnowledgeEntry {
    /// Split a raw comma-separated keyword cell into matcher keywords.
    pub fn parse_keywords(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|kw| kw.trim().to_lowercase())
            .filter(|kw| !kw.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        assert_eq!(
            KnowledgeEntry::parse_keywords("Giá, tiền , SALE"),
            vec!["giá", "tiền", "sale"]
        );
    }

    #[test]
    fn test_parse_keywords_drops_empties() {
        assert_eq!(KnowledgeEntry::parse_keywords(" , ,giá,"), vec!["giá"]);
        assert!(KnowledgeEntry::parse_keywords("").is_empty());
    }
}
