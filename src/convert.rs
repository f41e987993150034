//! Notebook conversion runs.
//!
//! A conversion reads one notebook, transforms it into display items, writes
//! its images under the static root and replaces its JSON record:
//!
//! ```text
//! datasets/05_Model.ipynb
//!   → templates/notebooks/05_Model.json
//!   → static/notebooks/05_Model/img_1.png, img_2.png, ...
//! ```
//!
//! [`convert_file`] converts a single notebook and fails as a whole.
//! [`convert_folder`] converts every notebook in the configured folder; each
//! notebook is converted on its own, so one broken notebook is logged and
//! reported while the rest of the batch carries on.
//!
//! Runs are idempotent: converting an unchanged notebook again produces the
//! same record and rewrites the same image files. A failure part-way leaves
//! whatever images were already written, and the previous record (if any)
//! untouched.

use crate::catalog::{self, CatalogError};
use crate::config::SitePaths;
use crate::listing::{self, ListingError};
use crate::materialize::ImageMaterializer;
use crate::notebook::{self, NotebookError};
use crate::transform::{self, TransformError};
use crate::types::{self, DisplayItem, RecordError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("No notebook path given")]
    MissingInput,
    #[error("Notebook folder does not exist: {0}")]
    FolderNotFound(PathBuf),
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Only .ipynb files can be converted: {0}")]
    UnsupportedFormat(PathBuf),
    #[error(transparent)]
    Notebook(#[from] NotebookError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("Failed to write record: {0}")]
    Record(#[from] RecordError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Coarse classification of conversion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigurationMissing,
    NotFound,
    UnsupportedFormat,
    ParseFailure,
    PermissionDenied,
    Io,
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::MissingInput | ConvertError::Listing(ListingError::MissingFolder) => {
                ErrorKind::ConfigurationMissing
            }
            ConvertError::FolderNotFound(_)
            | ConvertError::FileNotFound(_)
            | ConvertError::Notebook(NotebookError::NotFound(_))
            | ConvertError::Listing(ListingError::FolderNotFound(_))
            | ConvertError::Catalog(CatalogError::NotFound(_)) => ErrorKind::NotFound,
            ConvertError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ConvertError::Notebook(NotebookError::Parse(_))
            | ConvertError::Notebook(NotebookError::UnsupportedVersion(_)) => {
                ErrorKind::ParseFailure
            }
            ConvertError::Notebook(NotebookError::PermissionDenied(_))
            | ConvertError::Listing(ListingError::PermissionDenied(_)) => {
                ErrorKind::PermissionDenied
            }
            ConvertError::Record(RecordError::Io(e)) | ConvertError::Catalog(CatalogError::Io(e))
                if e.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                ErrorKind::PermissionDenied
            }
            _ => ErrorKind::Io,
        }
    }
}

/// Outcome of converting one notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub slug: String,
    pub source: PathBuf,
    pub record_path: PathBuf,
    pub items: usize,
    pub images: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub converted: Vec<ConversionReport>,
    pub failed: Vec<BatchFailure>,
    /// Configured targets that were not present in the folder.
    pub skipped: Vec<String>,
}

/// Convert a single notebook file.
///
/// The file must exist and carry the `.ipynb` extension; both are checked
/// before the notebook is opened.
pub fn convert_file(path: &Path, paths: &SitePaths) -> Result<ConversionReport, ConvertError> {
    if path.as_os_str().is_empty() {
        return Err(ConvertError::MissingInput);
    }
    if !path.is_file() {
        return Err(ConvertError::FileNotFound(path.to_path_buf()));
    }
    if !notebook::is_notebook_path(path) {
        return Err(ConvertError::UnsupportedFormat(path.to_path_buf()));
    }

    let slug = notebook::notebook_slug(path);
    let notebook = notebook::load_notebook(path)?;

    let mut assets = ImageMaterializer::new(&paths.static_dir, &slug);
    let items = transform::transform(&notebook, &mut assets)?;
    let record_path = types::write_record(&paths.records_dir, &slug, &items)?;

    info!(
        notebook = %slug,
        items = items.len(),
        images = assets.written(),
        "converted notebook"
    );

    Ok(ConversionReport {
        slug,
        source: path.to_path_buf(),
        record_path,
        items: items.len(),
        images: assets.written(),
    })
}

/// Convert the notebooks in `paths.notebooks_dir`.
///
/// With an empty `targets` list every `.ipynb` file in the folder is
/// converted, in file-name order. Otherwise only the named files are, in the
/// order given; names missing from the folder are reported as skipped.
pub fn convert_folder(paths: &SitePaths, targets: &[String]) -> Result<BatchReport, ConvertError> {
    if !paths.notebooks_dir.is_dir() {
        return Err(ConvertError::FolderNotFound(paths.notebooks_dir.clone()));
    }

    let mut report = BatchReport::default();
    let sources: Vec<PathBuf> = if targets.is_empty() {
        listing::list_notebooks(&paths.notebooks_dir)?
            .files
            .into_iter()
            .map(|f| PathBuf::from(f.path))
            .collect()
    } else {
        let mut found = Vec::new();
        for target in targets {
            let path = paths.notebooks_dir.join(target);
            if path.is_file() {
                found.push(path);
            } else {
                warn!(target = %target, "configured notebook not found, skipping");
                report.skipped.push(target.clone());
            }
        }
        found
    };

    for source in sources {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match convert_file(&source, paths) {
            Ok(converted) => report.converted.push(converted),
            Err(e) => {
                warn!(notebook = %name, error = %e, "conversion failed, continuing");
                report.failed.push(BatchFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// Number of markdown items removed from one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripResult {
    pub slug: String,
    pub removed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StripReport {
    pub updated: Vec<StripResult>,
    pub failed: Vec<BatchFailure>,
}

/// Remove every markdown item from every stored record, leaving only outputs.
pub fn strip_markdown(records_dir: &Path) -> Result<StripReport, ConvertError> {
    let mut report = StripReport::default();
    for slug in catalog::record_slugs(records_dir)? {
        match strip_record(records_dir, &slug) {
            Ok(removed) => report.updated.push(StripResult { slug, removed }),
            Err(e) => {
                warn!(record = %slug, error = %e, "could not strip record");
                report.failed.push(BatchFailure {
                    name: slug,
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(report)
}

fn strip_record(records_dir: &Path, slug: &str) -> Result<usize, RecordError> {
    let items = types::read_record(&types::record_path(records_dir, slug))?;
    let before = items.len();
    let kept: Vec<DisplayItem> = items.into_iter().filter(|i| !i.is_markdown()).collect();
    let removed = before - kept.len();
    types::write_record(records_dir, slug, &kept)?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs;
    use tempfile::TempDir;

    fn site(tmp: &TempDir) -> SitePaths {
        config_in(tmp.path()).paths.resolve(tmp.path())
    }

    fn sample_cells() -> Vec<serde_json::Value> {
        vec![
            markdown_cell("# Modelo\n\nIntro"),
            code_cell(&[stream_output("training\n"), png_output()]),
            markdown_cell("  "),
            code_cell(&[
                execute_result(&[("text/html", "<table></table>"), ("text/plain", "df")]),
                jpeg_output(),
            ]),
        ]
    }

    #[test]
    fn convert_file_writes_record_and_images() {
        let tmp = TempDir::new().unwrap();
        let paths = site(&tmp);
        let source = write_notebook(&paths.notebooks_dir, "05_Model.ipynb", &sample_cells());

        let report = convert_file(&source, &paths).unwrap();
        assert_eq!(report.slug, "05_Model");
        assert_eq!(report.items, 5);
        assert_eq!(report.images, 2);

        let items = types::read_record(&report.record_path).unwrap();
        assert_eq!(
            items,
            vec![
                DisplayItem::Markdown {
                    content: "# Modelo\n\nIntro".to_string()
                },
                DisplayItem::Text {
                    content: "training\n".to_string()
                },
                DisplayItem::Image {
                    url: "/static/notebooks/05_Model/img_1.png".to_string()
                },
                DisplayItem::Html {
                    content: "<table></table>".to_string()
                },
                DisplayItem::Image {
                    url: "/static/notebooks/05_Model/img_2.jpg".to_string()
                },
            ]
        );
        let image_dir = paths.static_dir.join("notebooks/05_Model");
        assert!(image_dir.join("img_1.png").is_file());
        assert!(image_dir.join("img_2.jpg").is_file());
    }

    #[test]
    fn reconversion_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let paths = site(&tmp);
        let source = write_notebook(&paths.notebooks_dir, "nb.ipynb", &sample_cells());

        let first = convert_file(&source, &paths).unwrap();
        let before = fs::read(&first.record_path).unwrap();
        let second = convert_file(&source, &paths).unwrap();
        let after = fs::read(&second.record_path).unwrap();

        assert_eq!(before, after);
        assert_eq!(first, second);
    }

    #[test]
    fn wrong_extension_rejected_after_existence_check() {
        let tmp = TempDir::new().unwrap();
        let paths = site(&tmp);
        let txt = tmp.path().join("notes.txt");
        fs::write(&txt, "hello").unwrap();

        let err = convert_file(&txt, &paths).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert!(!paths.records_dir.exists());

        let err = convert_file(&tmp.path().join("missing.txt"), &paths).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn empty_path_is_configuration_missing() {
        let tmp = TempDir::new().unwrap();
        let err = convert_file(Path::new(""), &site(&tmp)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationMissing);
    }

    #[test]
    fn malformed_notebook_is_parse_failure() {
        let tmp = TempDir::new().unwrap();
        let paths = site(&tmp);
        fs::create_dir_all(&paths.notebooks_dir).unwrap();
        let bad = paths.notebooks_dir.join("bad.ipynb");
        fs::write(&bad, "{ nope").unwrap();

        let err = convert_file(&bad, &paths).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(!types::record_path(&paths.records_dir, "bad").exists());
    }

    #[test]
    fn batch_isolates_failures() {
        let tmp = TempDir::new().unwrap();
        let paths = site(&tmp);
        write_notebook(&paths.notebooks_dir, "01_ok.ipynb", &sample_cells());
        fs::write(paths.notebooks_dir.join("02_bad.ipynb"), "not json").unwrap();
        write_notebook(&paths.notebooks_dir, "03_ok.ipynb", &[markdown_cell("x")]);
        fs::write(paths.notebooks_dir.join("readme.md"), "# hi").unwrap();

        let report = convert_folder(&paths, &[]).unwrap();
        let converted: Vec<&str> = report.converted.iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(converted, vec!["01_ok", "03_ok"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "02_bad.ipynb");
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn batch_with_targets_skips_missing() {
        let tmp = TempDir::new().unwrap();
        let paths = site(&tmp);
        write_notebook(&paths.notebooks_dir, "05_a.ipynb", &[markdown_cell("a")]);
        write_notebook(&paths.notebooks_dir, "06_b.ipynb", &[markdown_cell("b")]);

        let targets = vec!["06_b.ipynb".to_string(), "07_missing.ipynb".to_string()];
        let report = convert_folder(&paths, &targets).unwrap();

        assert_eq!(report.converted.len(), 1);
        assert_eq!(report.converted[0].slug, "06_b");
        assert_eq!(report.skipped, vec!["07_missing.ipynb"]);
        assert!(!types::record_path(&paths.records_dir, "05_a").exists());
    }

    #[test]
    fn batch_without_folder_fails_whole_run() {
        let tmp = TempDir::new().unwrap();
        let err = convert_folder(&site(&tmp), &[]).unwrap_err();
        assert!(matches!(err, ConvertError::FolderNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn strip_markdown_keeps_outputs() {
        let tmp = TempDir::new().unwrap();
        let paths = site(&tmp);
        let source = write_notebook(&paths.notebooks_dir, "nb.ipynb", &sample_cells());
        let converted = convert_file(&source, &paths).unwrap();

        let report = strip_markdown(&paths.records_dir).unwrap();
        assert_eq!(
            report.updated,
            vec![StripResult {
                slug: "nb".to_string(),
                removed: 1
            }]
        );
        let items = types::read_record(&converted.record_path).unwrap();
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|i| !i.is_markdown()));
    }
}
