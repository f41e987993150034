//! Display items and the on-disk notebook record.
//!
//! A converted notebook is persisted as `<records_dir>/<slug>.json`: a JSON
//! array of [`DisplayItem`]s in notebook order. Every item carries its payload
//! in a `content` field:
//!
//! ```json
//! [
//!   { "type": "markdown", "content": "# Model\n\nIntro" },
//!   { "type": "text", "content": "fit done\n" },
//!   { "type": "html", "content": "<table>...</table>" },
//!   { "type": "image", "content": "/static/notebooks/05_Model/img_1.png" }
//! ]
//! ```
//!
//! Older records stored image URLs under `path`; that name is still accepted
//! when reading.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The web-facing unit derived from a cell or an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DisplayItem {
    Markdown {
        content: String,
    },
    Text {
        content: String,
    },
    Html {
        content: String,
    },
    Image {
        #[serde(rename = "content", alias = "path")]
        url: String,
    },
}

impl DisplayItem {
    pub fn kind(&self) -> &'static str {
        match self {
            DisplayItem::Markdown { .. } => "markdown",
            DisplayItem::Text { .. } => "text",
            DisplayItem::Html { .. } => "html",
            DisplayItem::Image { .. } => "image",
        }
    }

    pub fn is_markdown(&self) -> bool {
        matches!(self, DisplayItem::Markdown { .. })
    }
}

/// Location of the record for `slug`.
pub fn record_path(records_dir: &Path, slug: &str) -> PathBuf {
    records_dir.join(format!("{slug}.json"))
}

/// Write a record, replacing any previous one for the same slug.
///
/// The JSON is written to a hidden sibling file first and renamed into place,
/// so readers see either the old record or the new one. Concurrent writers of
/// the same slug race; the last rename wins.
pub fn write_record(
    records_dir: &Path,
    slug: &str,
    items: &[DisplayItem],
) -> Result<PathBuf, RecordError> {
    fs::create_dir_all(records_dir)?;
    let path = record_path(records_dir, slug);
    let tmp = records_dir.join(format!(".{slug}.json.tmp"));
    let json = serde_json::to_string_pretty(items)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, &path)?;
    Ok(path)
}

pub fn read_record(path: &Path) -> Result<Vec<DisplayItem>, RecordError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
