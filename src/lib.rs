//! # Notebook Site
//!
//! Turns Jupyter notebooks into web pages. Each notebook is converted once
//! into a flat JSON list of display items (markdown, text, html, image) and
//! its embedded images are written out as files; the web server then renders
//! pages from those records without touching the notebooks again.
//!
//! # Pipeline
//!
//! ```text
//! 1. Load       datasets/X.ipynb   →  Notebook            (nbformat v4 JSON)
//! 2. Transform  Notebook           →  Vec<DisplayItem>    (images → static/notebooks/X/)
//! 3. Store      Vec<DisplayItem>   →  records/X.json      (atomic overwrite)
//! 4. Serve      records/X.json     →  /notebook/X/        (summary + sections + items)
//! ```
//!
//! Steps 1-3 run from the `convert` command or, for one file, from the
//! `POST /api/open-notebook/` endpoint. Step 4 runs per request.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`notebook`] | Reads `.ipynb` files into typed cells and outputs |
//! | [`transform`] | Cells to display items, in document order |
//! | [`materialize`] | Decodes base64 images and writes them under the static root |
//! | [`types`] | `DisplayItem` and the JSON record store |
//! | [`convert`] | Single-file and batch conversion runs, markdown stripping |
//! | [`summary`] | Intro summary and section outline of a notebook page |
//! | [`catalog`] | Converted notebooks as index entries and loadable pages |
//! | [`listing`] | Notebooks in a user-supplied folder |
//! | [`render`] | Maud HTML pages |
//! | [`server`] | Axum routes, host checking, JSON API |
//! | [`config`] | `config.toml` loading, environment overrides, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Storage
//!
//! The filesystem is the only store. Records and image directories are
//! overwritten in place with no locking: two conversions of the same notebook
//! at once race, and the last writer wins.

pub mod catalog;
pub mod config;
pub mod convert;
pub mod listing;
pub mod materialize;
pub mod notebook;
pub mod output;
pub mod render;
pub mod server;
pub mod summary;
pub mod transform;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
