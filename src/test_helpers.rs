//! Shared test utilities for the notebook-site test suite.
//!
//! Builds nbformat v4 JSON fixtures in code so each test states exactly the
//! cells and outputs it cares about.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let path = write_notebook(tmp.path(), "05_Model.ipynb", &[
//!     markdown_cell("# Model\n\nIntro"),
//!     code_cell(&[stream_output("fit done\n"), png_output()]),
//! ]);
//! ```

use serde_json::{Value, json};
use std::path::{Path, PathBuf};

use crate::config::SiteConfig;

/// A 1x1 transparent PNG.
pub const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// The first ten bytes of a JFIF file.
pub const JPEG_HEADER: &str = "/9j/4AAQSkZJRg==";

// =========================================================================
// Cell and output builders
// =========================================================================

pub fn markdown_cell(source: &str) -> Value {
    json!({ "cell_type": "markdown", "metadata": {}, "source": source })
}

pub fn code_cell(outputs: &[Value]) -> Value {
    json!({
        "cell_type": "code",
        "execution_count": 1,
        "metadata": {},
        "source": "",
        "outputs": outputs,
    })
}

pub fn stream_output(text: &str) -> Value {
    json!({ "output_type": "stream", "name": "stdout", "text": text })
}

/// An `execute_result` whose mime bundle holds the given entries.
pub fn execute_result(entries: &[(&str, &str)]) -> Value {
    let data: serde_json::Map<String, Value> = entries
        .iter()
        .map(|(mime, payload)| (mime.to_string(), json!(payload)))
        .collect();
    json!({
        "output_type": "execute_result",
        "execution_count": 1,
        "data": data,
        "metadata": {},
    })
}

pub fn png_output() -> Value {
    json!({
        "output_type": "display_data",
        "data": { "image/png": PNG_1X1, "text/plain": "<Figure size 640x480>" },
        "metadata": {},
    })
}

pub fn jpeg_output() -> Value {
    json!({
        "output_type": "display_data",
        "data": { "image/jpeg": JPEG_HEADER },
        "metadata": {},
    })
}

pub fn notebook_json(cells: &[Value]) -> String {
    json!({
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {},
        "cells": cells,
    })
    .to_string()
}

// =========================================================================
// Filesystem fixtures
// =========================================================================

/// Write a notebook built from `cells` into `dir/name` and return its path.
pub fn write_notebook(dir: &Path, name: &str, cells: &[Value]) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, notebook_json(cells)).unwrap();
    path
}

/// Config whose notebook, record and static directories all live under `root`.
pub fn config_in(root: &Path) -> SiteConfig {
    let mut config = SiteConfig::default();
    config.paths.notebooks_dir = root.join("datasets").to_string_lossy().to_string();
    config.paths.records_dir = root.join("records").to_string_lossy().to_string();
    config.paths.static_dir = root.join("static").to_string_lossy().to_string();
    config
}
