//! Vietnamese shorthand expansion.
//!
//! Customers write "sp bn tiền" where they mean "sản phẩm bao nhiêu tiền";
//! both matching and prompting work on the expanded form.

use std::collections::HashMap;
use std::sync::RwLock;

use banmai_core::config::KnowledgeConfig;

/// Built-in shorthand table for Vietnamese shop chat.
///
/// Later entries override earlier ones (last write wins), so a key listed
/// twice resolves to its final expansion.
const BUILTIN: &[(&str, &str)] = &[
    ("sp", "sản phẩm"),
    ("đh", "đơn hàng"),
    ("vc", "vận chuyển"),
    ("ship", "vận chuyển"),
    ("tk", "tài khoản"),
    ("stk", "số tài khoản"),
    ("ck", "chuyển khoản"),
    ("cod", "thanh toán khi nhận hàng"),
    ("sl", "số lượng"),
    ("sz", "size"),
    ("ms", "mã số"),
    ("dt", "điện thoại"),
    ("sdt", "số điện thoại"),
    ("đc", "địa chỉ"),
    ("dc", "địa chỉ"),
    ("a", "anh"),
    ("e", "em"),
    ("c", "chị"),
    ("mn", "mọi người"),
    ("ns", "nói"),
    ("bt", "bình thường"),
    ("tl", "trả lời"),
    ("rep", "trả lời"),
    ("fb", "facebook"),
    ("zl", "zalo"),
    ("k", "không"),
    ("ko", "không"),
    ("hok", "không"),
    ("dc", "được"),
    ("đc", "được"),
    ("đ", "đồng"),
    ("vnd", "đồng"),
    ("tr", "triệu"),
    ("ntn", "như thế nào"),
    ("lm", "làm"),
    ("lsao", "làm sao"),
    ("sn", "sinh nhật"),
    ("hsd", "hạn sử dụng"),
    ("nsx", "ngày sản xuất"),
    ("bh", "bảo hành"),
    ("fship", "freeship"),
    ("mfree", "miễn phí"),
    ("tks", "cảm ơn"),
    ("thanks", "cảm ơn"),
    ("ok", "đồng ý"),
    ("oki", "đồng ý"),
    ("okie", "đồng ý"),
    ("ak", "à"),
    ("ng", "người"),
    ("nyc", "người yêu cũ"),
    ("ny", "người yêu"),
    ("bn", "bao nhiêu"),
    ("nhiu", "nhiêu"),
    ("bnh", "bao nhiêu"),
    ("bnhiu", "bao nhiêu"),
    ("z", "vậy"),
    ("v", "vậy"),
    ("r", "rồi"),
    ("lun", "luôn"),
    ("luon", "luôn"),
    ("iu", "yêu"),
    ("ck", "chồng"),
    ("vk", "vợ"),
    ("gđ", "gia đình"),
    ("hg", "hàng"),
    ("mik", "mình"),
    ("mk", "mình"),
    ("bn", "bạn"),
    ("b", "bạn"),
    ("cj", "chị"),
    ("aj", "anh"),
    ("hi", "chào"),
    ("hello", "chào"),
    ("alo", "chào"),
];

// =============================================================================
// AbbreviationTable
// =============================================================================

/// Token-level shorthand expander.
///
/// Seeded from [`BUILTIN`] and optionally extended from configuration; the
/// only mutation after startup is [`AbbreviationTable::add`].
pub struct AbbreviationTable {
    entries: RwLock<HashMap<String, String>>,
}

impl Default for AbbreviationTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AbbreviationTable {
    /// The built-in table alone.
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        for (abbr, full) in BUILTIN {
            entries.insert((*abbr).to_string(), (*full).to_string());
        }
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Built-in table extended with the configured expansions.
    pub fn from_config(config: &KnowledgeConfig) -> Self {
        let table = Self::builtin();
        for (abbr, full) in &config.abbreviations {
            table.add(abbr, full);
        }
        table
    }

    /// Add or overwrite one expansion. Keys and values are lowercased.
    pub fn add(&self, abbr: &str, full: &str) {
        let mut entries = match self.entries.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(abbr.to_lowercase(), full.to_lowercase());
    }

    /// Number of known abbreviations.
    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(g) => g.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand shorthand tokens in `text`.
    ///
    /// Lowercases the input, splits on whitespace, and replaces every token
    /// whose punctuation-stripped form is a known key. A replaced token loses
    /// its punctuation; unknown tokens pass through unchanged (lowercased).
    pub fn expand(&self, text: &str) -> String {
        let entries = match self.entries.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };

        let lowered = text.to_lowercase();
        let mut expanded: Vec<&str> = Vec::new();
        for word in lowered.split_whitespace() {
            let clean: String = word
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            match entries.get(&clean) {
                Some(full) => expanded.push(full),
                None => expanded.push(word),
            }
        }
        expanded.join(" ")
    }
}
