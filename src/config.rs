//! Site configuration.
//!
//! Loaded from an optional `config.toml` in the project directory, merged over
//! stock defaults, then overridden by environment variables for the settings
//! that differ between a laptop and a deployment.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! notebooks_dir = "datasets"            # Where batch conversion looks for .ipynb files
//! records_dir = "templates/notebooks"   # Converted JSON records
//! static_dir = "static"                 # Served at /static; images go to static/notebooks/<slug>/
//!
//! [site]
//! title = "Notebooks"
//! index_prefixes = []                   # e.g. ["05_", "06_"]; empty lists every record
//!
//! [convert]
//! targets = []                          # Restrict batch conversion to these file names
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! secret_key = "insecure-development-key"
//! debug = false
//! allowed_hosts = ["localhost", "127.0.0.1"]
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `NBSITE_SECRET_KEY` | replaces `server.secret_key` |
//! | `NBSITE_DEBUG` | `1`/`true`/`yes` turns debug on, anything else off |
//! | `NBSITE_ALLOWED_HOSTS` | comma list appended to `server.allowed_hosts` |
//! | `NBSITE_ALLOW_ALL_HOSTS` | when truthy, replaces the host list with `*` |
//! | `NBSITE_BIND` | replaces `server.bind` |
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Secret key used when none is configured. Fine for local work only.
pub const DEV_SECRET_KEY: &str = "insecure-development-key";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub paths: PathsConfig,
    pub site: SiteSection,
    pub convert: ConvertConfig,
    pub server: ServerConfig,
}

impl SiteConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("paths.notebooks_dir", &self.paths.notebooks_dir),
            ("paths.records_dir", &self.paths.records_dir),
            ("paths.static_dir", &self.paths.static_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "server.bind is not a socket address: {}",
                self.server.bind
            )));
        }
        if self.server.allowed_hosts.is_empty() {
            return Err(ConfigError::Validation(
                "server.allowed_hosts must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Apply `NBSITE_*` overrides, reading variables through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("NBSITE_SECRET_KEY") {
            self.server.secret_key = key;
        }
        if let Some(debug) = lookup("NBSITE_DEBUG") {
            self.server.debug = is_truthy(&debug);
        }
        if let Some(hosts) = lookup("NBSITE_ALLOWED_HOSTS") {
            self.server.allowed_hosts.extend(
                hosts
                    .split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(String::from),
            );
        }
        if lookup("NBSITE_ALLOW_ALL_HOSTS").is_some_and(|v| is_truthy(&v)) {
            self.server.allowed_hosts = vec!["*".to_string()];
        }
        if let Some(bind) = lookup("NBSITE_BIND") {
            self.server.bind = bind;
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Filesystem locations. Relative paths are resolved against the project
/// directory by [`PathsConfig::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub notebooks_dir: String,
    pub records_dir: String,
    pub static_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            notebooks_dir: "datasets".to_string(),
            records_dir: "templates/notebooks".to_string(),
            static_dir: "static".to_string(),
        }
    }
}

/// [`PathsConfig`] with every entry made concrete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub notebooks_dir: PathBuf,
    pub records_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl PathsConfig {
    pub fn resolve(&self, base: &Path) -> SitePaths {
        let join = |p: &str| {
            let p = Path::new(p);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        SitePaths {
            notebooks_dir: join(&self.notebooks_dir),
            records_dir: join(&self.records_dir),
            static_dir: join(&self.static_dir),
        }
    }
}

/// Presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Heading of the index page.
    pub title: String,
    /// Only records whose name starts with one of these prefixes are listed on
    /// the index page. Empty means no filtering.
    pub index_prefixes: Vec<String>,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: "Notebooks".to_string(),
            index_prefixes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// File names (e.g. `05_Model.ipynb`) the batch conversion is limited to.
    /// Empty converts every notebook in `paths.notebooks_dir`.
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub secret_key: String,
    pub debug: bool,
    /// Accepted `Host` header values: exact names, `*.example.com` or
    /// `.example.com` for a domain and its subdomains, or `*` for any host.
    pub allowed_hosts: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            secret_key: DEV_SECRET_KEY.to_string(),
            debug: false,
            allowed_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
        }
    }
}

impl ServerConfig {
    /// Whether a request `Host` header value (port optional) is allowed.
    pub fn host_allowed(&self, host_header: &str) -> bool {
        let host = strip_port(host_header.trim()).to_lowercase();
        self.allowed_hosts.iter().any(|pattern| {
            let pattern = pattern.to_lowercase();
            if pattern == "*" {
                return true;
            }
            let domain = pattern
                .strip_prefix("*.")
                .or_else(|| pattern.strip_prefix('.'));
            match domain {
                Some(domain) => {
                    host == domain
                        || host
                            .strip_suffix(domain)
                            .is_some_and(|sub| sub.ends_with('.'))
                }
                None => host == pattern,
            }
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY
    }
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // IPv6 literal: [::1]:8000
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value, `None` if absent.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge user values over stock defaults and deserialize, without validating.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    Ok(merged.try_into()?)
}

/// Load config from `config.toml` in `dir`, apply environment overrides from
/// the process environment, and validate the result.
pub fn load_config(dir: &Path) -> Result<SiteConfig, ConfigError> {
    load_config_with_env(dir, |key| std::env::var(key).ok())
}

pub fn load_config_with_env<F>(dir: &Path, lookup: F) -> Result<SiteConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = resolve_config(stock_defaults_value(), load_raw_config(dir)?)?;
    config.apply_env(lookup);
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`. Used by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Notebook Site Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
#
# Relative paths are resolved against the directory holding this file.

# ---------------------------------------------------------------------------
# Paths
# ---------------------------------------------------------------------------
[paths]
# Folder scanned by `convert` for .ipynb files.
notebooks_dir = "datasets"

# Where converted notebooks are stored, one <name>.json per notebook.
records_dir = "templates/notebooks"

# Served under /static. Notebook images are written to
# <static_dir>/notebooks/<name>/img_<n>.<ext>.
static_dir = "static"

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
# Heading of the index page.
title = "Notebooks"

# Only list notebooks whose name starts with one of these prefixes.
# Empty lists every converted notebook.
index_prefixes = []

# ---------------------------------------------------------------------------
# Batch conversion
# ---------------------------------------------------------------------------
[convert]
# Convert only these files from notebooks_dir, e.g. ["05_Model.ipynb"].
# Empty converts every notebook in the folder.
targets = []

# ---------------------------------------------------------------------------
# Server (each value can also be set through NBSITE_* environment variables)
# ---------------------------------------------------------------------------
[server]
bind = "127.0.0.1:8000"

# Override with NBSITE_SECRET_KEY outside local development.
secret_key = "insecure-development-key"

# NBSITE_DEBUG=1 turns this on.
debug = false

# Accepted Host headers. "*.example.com" matches the domain and its
# subdomains; "*" accepts any host.
allowed_hosts = ["localhost", "127.0.0.1"]
"##
}
