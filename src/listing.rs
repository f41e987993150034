//! Notebook discovery in a user-supplied folder.
//!
//! Used by the folder browser endpoint: given a folder path, list the
//! notebooks directly inside it. The listing does not recurse and only looks
//! at the folder it was given; there is no sandboxing beyond requiring the
//! path to be an existing directory.

use crate::notebook::{is_notebook_path, notebook_slug};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("No folder given")]
    MissingFolder,
    #[error("Folder not found")]
    FolderNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotebookFile {
    pub name: String,
    /// Absolute path of the file.
    pub path: String,
    pub size: u64,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderListing {
    /// The folder as resolved on disk.
    pub folder: String,
    pub files: Vec<NotebookFile>,
}

/// List the notebooks in `folder`, sorted by file name.
pub fn list_notebooks(folder: &Path) -> Result<FolderListing, ListingError> {
    if folder.as_os_str().is_empty() {
        return Err(ListingError::MissingFolder);
    }
    if !folder.is_dir() {
        return Err(ListingError::FolderNotFound(folder.to_path_buf()));
    }
    let folder = folder.canonicalize()?;

    let entries = fs::read_dir(&folder).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ListingError::PermissionDenied(folder.clone()),
        _ => ListingError::Io(e),
    })?;

    let mut files = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !is_notebook_path(&path) {
            continue;
        }
        // Follows symlinks, so a linked notebook is listed like a regular one.
        let Ok(metadata) = fs::metadata(&path) else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        files.push(NotebookFile {
            name: entry.file_name().to_string_lossy().to_string(),
            path: path.to_string_lossy().to_string(),
            size: metadata.len(),
            slug: notebook_slug(&path),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(FolderListing {
        folder: folder.to_string_lossy().to_string(),
        files,
    })
}
