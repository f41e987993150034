//! Image materialization.
//!
//! Notebook images arrive as base64 strings inside the notebook JSON. The web
//! pages reference them by URL instead, so every image output is decoded and
//! written to a per-notebook directory under the static root:
//!
//! ```text
//! static/notebooks/
//! └── 05_Model/
//!     ├── img_1.png
//!     ├── img_2.jpg
//!     └── img_3.png
//! ```
//!
//! Files are numbered by a counter that starts at 1 for every conversion run
//! and increments once per image, PNG and JPEG alike. Files are never deleted:
//! if a notebook loses images between runs, the higher-numbered files from the
//! previous run stay on disk unreferenced.

use crate::notebook::ImagePayload;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// URL prefix under which the static root is served.
pub const STATIC_URL: &str = "/static";

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image {index} is not valid base64: {source}")]
    Decode {
        index: u32,
        source: base64::DecodeError,
    },
}

/// Destination for image outputs met during a transform.
///
/// Returns the URL the display item should reference.
pub trait AssetSink {
    fn store(&mut self, image: &ImagePayload) -> Result<String, MaterializeError>;
}

/// Writes images to `<static_dir>/notebooks/<slug>/img_<n>.<ext>`.
#[derive(Debug)]
pub struct ImageMaterializer {
    dir: PathBuf,
    url_base: String,
    counter: u32,
}

impl ImageMaterializer {
    pub fn new(static_dir: &Path, slug: &str) -> Self {
        Self {
            dir: notebook_asset_dir(static_dir, slug),
            url_base: format!("{STATIC_URL}/notebooks/{slug}"),
            counter: 0,
        }
    }

    /// Number of images written so far in this run.
    pub fn written(&self) -> u32 {
        self.counter
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl AssetSink for ImageMaterializer {
    fn store(&mut self, image: &ImagePayload) -> Result<String, MaterializeError> {
        let index = self.counter + 1;
        let bytes = decode_image(&image.encoded).map_err(|source| MaterializeError::Decode {
            index,
            source,
        })?;

        fs::create_dir_all(&self.dir)?;
        let filename = format!("img_{index}.{}", image.mime.extension());
        fs::write(self.dir.join(&filename), bytes)?;
        self.counter = index;

        tracing::debug!(file = %filename, dir = %self.dir.display(), "wrote image");
        Ok(format!("{}/{filename}", self.url_base))
    }
}

/// Directory holding the materialized images of one notebook.
pub fn notebook_asset_dir(static_dir: &Path, slug: &str) -> PathBuf {
    static_dir.join("notebooks").join(slug)
}

/// Decode a notebook image payload. Line breaks inside the base64 text are
/// common in saved notebooks and are ignored.
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact)
}
