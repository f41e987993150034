//! The set of converted notebooks, as the web pages see it.
//!
//! Every `<slug>.json` in the records directory is one notebook. The index
//! page lists them with a display title and, when the notebook produced any
//! images, the first image as thumbnail. The notebook page loads one record
//! and splits off its intro block with [`extract_summary`].

use crate::config::SitePaths;
use crate::materialize::{STATIC_URL, notebook_asset_dir};
use crate::summary::{MarkdownRenderer, PageSummary, extract_summary};
use crate::types::{self, DisplayItem, RecordError};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

const THUMBNAIL_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg"];

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Notebook not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One notebook on the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub slug: String,
    pub title: String,
    pub thumbnail: Option<String>,
}

/// A notebook ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookPage {
    pub slug: String,
    pub title: String,
    /// Items left after the intro block was taken out.
    pub items: Vec<DisplayItem>,
    pub summary: PageSummary,
}

/// `05_Regresion_Logistica` → `05 Regresion Logistica`
pub fn display_title(slug: &str) -> String {
    slug.replace('_', " ")
}

/// Slugs of all stored records, sorted. A missing directory has no records.
pub fn record_slugs(records_dir: &Path) -> Result<Vec<String>, CatalogError> {
    if !records_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut slugs: Vec<String> = fs::read_dir(records_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
        })
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
        .filter(|slug| !slug.starts_with('.'))
        .collect();
    slugs.sort();
    Ok(slugs)
}

/// First image (by file name) written for a notebook, as a URL.
pub fn find_thumbnail(static_dir: &Path, slug: &str) -> Option<String> {
    let dir = notebook_asset_dir(static_dir, slug);
    let mut names: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| {
            Path::new(name)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .is_some_and(|e| THUMBNAIL_EXTENSIONS.contains(&e.as_str()))
        })
        .collect();
    names.sort();
    names
        .into_iter()
        .next()
        .map(|name| format!("{STATIC_URL}/notebooks/{slug}/{name}"))
}

/// Index entries, filtered to `prefixes` unless that list is empty.
pub fn list_entries(
    paths: &SitePaths,
    prefixes: &[String],
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let entries = record_slugs(&paths.records_dir)?
        .into_iter()
        .filter(|slug| prefixes.is_empty() || prefixes.iter().any(|p| slug.starts_with(p)))
        .map(|slug| CatalogEntry {
            title: display_title(&slug),
            thumbnail: find_thumbnail(&paths.static_dir, &slug),
            slug,
        })
        .collect();
    Ok(entries)
}

/// Load the record named by `name` and split off its summary.
///
/// Only the last path component of `name` is used, so a request cannot reach
/// records outside the records directory.
pub fn load_page(
    paths: &SitePaths,
    name: &str,
    renderer: Option<MarkdownRenderer>,
) -> Result<NotebookPage, CatalogError> {
    let slug = Path::new(name.trim_end_matches('/'))
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;

    let record = types::record_path(&paths.records_dir, &slug);
    if !record.is_file() {
        return Err(CatalogError::NotFound(slug));
    }

    let mut items = types::read_record(&record)?;
    let summary = extract_summary(&mut items, renderer);
    Ok(NotebookPage {
        title: display_title(&slug),
        slug,
        items,
        summary,
    })
}
