//! Notebook loading.
//!
//! Reads a Jupyter `.ipynb` document and normalizes it into the small model
//! the rest of the pipeline works with: an ordered list of [`Cell`]s, each
//! either markdown prose or a code cell with its captured [`Output`]s.
//!
//! ## Wire Format
//!
//! Notebooks are nbformat v4 JSON. The loader deserializes only the fields it
//! needs, so notebooks of any v4 minor version load, including pre-4.5 files
//! that carry no cell ids:
//!
//! ```json
//! {
//!   "nbformat": 4,
//!   "cells": [
//!     { "cell_type": "markdown", "source": ["# Title\n", "Intro"] },
//!     { "cell_type": "code", "outputs": [
//!         { "output_type": "stream", "name": "stdout", "text": "hello\n" },
//!         { "output_type": "display_data", "data": { "image/png": "iVBOR..." } }
//!     ] }
//!   ]
//! }
//! ```
//!
//! ## Normalization
//!
//! Multi-line fields may be a string or a list of string fragments. Fragments
//! are concatenated with no separator: nbformat fragments already end in their
//! own newlines.
//!
//! Each rich output is reduced to one [`Output`] by mime priority:
//!
//! | Priority | Mime type | Output |
//! |----------|-----------|--------|
//! | 1 | `image/png` | [`Output::Image`] |
//! | 2 | `image/jpeg` | [`Output::Image`] |
//! | 3 | `text/html` | [`Output::Html`] |
//! | 4 | `text/plain` | [`Output::PlainText`] |
//!
//! `stream` outputs become [`Output::Stream`]. Error tracebacks, raw cells and
//! outputs with none of the mime types above are dropped here.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extension of notebook documents.
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

#[derive(Error, Debug)]
pub enum NotebookError {
    #[error("Notebook not found: {0}")]
    NotFound(PathBuf),
    #[error("Permission denied reading {0}")]
    PermissionDenied(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Malformed notebook: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unsupported notebook format version {0} (need 4)")]
    UnsupportedVersion(u32),
}

/// A loaded notebook: cells in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notebook {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Markdown { text: String },
    Code { outputs: Vec<Output> },
}

/// One captured result of a code cell, already reduced to a single payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Stream { text: String },
    Image(ImagePayload),
    Html { markup: String },
    PlainText { text: String },
}

/// A base64-encoded image exactly as it appears in the notebook.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub mime: ImageMime,
    pub encoded: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
}

impl ImageMime {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
        }
    }

    /// File extension used for materialized assets.
    pub fn extension(self) -> &'static str {
        match self {
            ImageMime::Png => "png",
            ImageMime::Jpeg => "jpg",
        }
    }
}

// ============================================================================
// Wire model
// ============================================================================

#[derive(Deserialize)]
struct RawNotebook {
    nbformat: u32,
    #[serde(default)]
    cells: Vec<RawCell>,
}

#[derive(Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
enum RawCell {
    Markdown {
        #[serde(default, deserialize_with = "multiline")]
        source: String,
    },
    Code {
        #[serde(default)]
        outputs: Vec<RawOutput>,
    },
    Raw {},
}

#[derive(Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
enum RawOutput {
    Stream {
        #[serde(default, deserialize_with = "multiline")]
        text: String,
    },
    DisplayData {
        #[serde(default)]
        data: BTreeMap<String, serde_json::Value>,
    },
    ExecuteResult {
        #[serde(default)]
        data: BTreeMap<String, serde_json::Value>,
    },
    Error {},
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Fragments {
    One(String),
    Many(Vec<String>),
}

impl Fragments {
    fn concat(self) -> String {
        match self {
            Fragments::One(s) => s,
            Fragments::Many(parts) => parts.concat(),
        }
    }
}

fn multiline<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Fragments::deserialize(deserializer).map(Fragments::concat)
}

/// Text of a mime bundle entry: a string or a list of string fragments.
/// JSON-valued mime types (e.g. `application/json`) yield `None`.
fn bundle_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(parts) => parts
            .iter()
            .map(|p| p.as_str())
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.concat()),
        _ => None,
    }
}

fn normalize_bundle(data: &BTreeMap<String, serde_json::Value>) -> Option<Output> {
    let text = |mime: &str| data.get(mime).and_then(bundle_text);

    if let Some(encoded) = text(ImageMime::Png.mime_type()) {
        return Some(Output::Image(ImagePayload {
            mime: ImageMime::Png,
            encoded,
        }));
    }
    if let Some(encoded) = text(ImageMime::Jpeg.mime_type()) {
        return Some(Output::Image(ImagePayload {
            mime: ImageMime::Jpeg,
            encoded,
        }));
    }
    if let Some(markup) = text("text/html") {
        return Some(Output::Html { markup });
    }
    text("text/plain").map(|text| Output::PlainText { text })
}

fn normalize_output(raw: RawOutput) -> Option<Output> {
    match raw {
        RawOutput::Stream { text } => Some(Output::Stream { text }),
        RawOutput::DisplayData { data } | RawOutput::ExecuteResult { data } => {
            normalize_bundle(&data)
        }
        RawOutput::Error {} | RawOutput::Unknown => None,
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Parse notebook JSON into the normalized model.
pub fn parse_notebook(content: &str) -> Result<Notebook, NotebookError> {
    let raw: RawNotebook = serde_json::from_str(content)?;
    if raw.nbformat != 4 {
        return Err(NotebookError::UnsupportedVersion(raw.nbformat));
    }

    let cells = raw
        .cells
        .into_iter()
        .filter_map(|cell| match cell {
            RawCell::Markdown { source } => Some(Cell::Markdown { text: source }),
            RawCell::Code { outputs } => Some(Cell::Code {
                outputs: outputs.into_iter().filter_map(normalize_output).collect(),
            }),
            RawCell::Raw {} => None,
        })
        .collect();

    Ok(Notebook { cells })
}

/// Read and parse a notebook file.
pub fn load_notebook(path: &Path) -> Result<Notebook, NotebookError> {
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => NotebookError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => NotebookError::PermissionDenied(path.to_path_buf()),
        _ => NotebookError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    parse_notebook(&content)
}

/// True when the path has the notebook extension (case-insensitive).
pub fn is_notebook_path(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(NOTEBOOK_EXTENSION))
        .unwrap_or(false)
}

/// Notebook base name without extension, used as its identifier everywhere.
pub fn notebook_slug(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
