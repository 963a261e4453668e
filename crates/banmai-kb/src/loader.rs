//! CSV directory loader.
//!
//! Scans one directory (non-recursively) for `*.csv` files and maps rows
//! to [`KnowledgeEntry`] values. Headers are matched case-insensitively
//! after trimming, accepting Vietnamese or English names per field. A
//! malformed file is logged and skipped; it never aborts the other files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::entry::{KnowledgeEntry, DEFAULT_CATEGORY};
use crate::error::KbError;

/// Accepted header names per logical field, localized first.
const QUESTION_HEADERS: [&str; 2] = ["câu hỏi", "question"];
const ANSWER_HEADERS: [&str; 2] = ["câu trả lời", "answer"];
const IMAGE_HEADERS: [&str; 2] = ["hình ảnh", "image"];
const KEYWORD_HEADERS: [&str; 2] = ["từ khóa", "keywords"];
const CATEGORY_HEADERS: [&str; 2] = ["danh mục", "category"];

/// Spreadsheet cell text that stands for a missing value.
fn is_missing(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan")
}

/// Load every CSV file directly inside `dir`.
///
/// A missing directory is created and yields an empty set. Per-file
/// failures are logged and skipped.
pub fn load_dir(dir: &Path) -> Vec<KnowledgeEntry> {
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("Failed to create data dir {}: {}", dir.display(), e);
        } else {
            info!("Created data dir {}", dir.display());
        }
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(read) => read
            .filter_map(|res| res.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .map(|ext| ext.eq_ignore_ascii_case("csv"))
                        .unwrap_or(false)
            })
            .collect(),
        Err(e) => {
            warn!("Failed to read data dir {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    // Deterministic load order so ties in the matcher are stable.
    files.sort();

    let mut entries = Vec::new();
    for file in &files {
        match load_file(file) {
            Ok(mut rows) => {
                info!("Loaded {} entries from {}", rows.len(), file.display());
                entries.append(&mut rows);
            }
            Err(e) => {
                warn!("Skipping {}: {}", file.display(), e);
            }
        }
    }

    info!("Knowledge base loaded: {} entries total", entries.len());
    entries
}

/// Load one CSV file into entries, dropping rows without a usable question.
pub fn load_file(path: &Path) -> Result<Vec<KnowledgeEntry>, KbError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = reader.headers()?.clone();
    let columns = ColumnMap::resolve(&headers);
    let Some(question_col) = columns.question else {
        return Err(KbError::MissingQuestionColumn(file_name(path)));
    };

    let source_file = file_name(path);
    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;

        let question = field(&record, Some(question_col));
        if is_missing(&question) {
            continue;
        }

        let image = field(&record, columns.image);
        let image_url = if is_missing(&image) { None } else { Some(image) };

        entries.push(KnowledgeEntry {
            source_file: source_file.clone(),
            question,
            answer: field(&record, columns.answer),
            image_url,
            keywords: KnowledgeEntry::parse_keywords(&field(&record, columns.keywords)),
            category: {
                let category = field(&record, columns.category);
                if is_missing(&category) {
                    DEFAULT_CATEGORY.to_string()
                } else {
                    category
                }
            },
        });
    }

    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn field(record: &csv::StringRecord, index: Option<usize>) -> String {
    index
        .and_then(|i| record.get(i))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Column indices resolved from a header row.
struct ColumnMap {
    question: Option<usize>,
    answer: Option<usize>,
    image: Option<usize>,
    keywords: Option<usize>,
    category: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Self {
        let find = |names: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim().to_lowercase();
                names.iter().any(|n| *n == h)
            })
        };
        Self {
            question: find(&QUESTION_HEADERS),
            answer: find(&ANSWER_HEADERS),
            image: find(&IMAGE_HEADERS),
            keywords: find(&KEYWORD_HEADERS),
            category: find(&CATEGORY_HEADERS),
        }
    }
}
