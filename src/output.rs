//! CLI output formatting.
//!
//! Output leads with what was produced (the notebook and its item counts),
//! with file paths as indented context lines below it:
//!
//! ## Convert
//!
//! ```text
//! Converted
//! 001 05 Regresion Logistica (14 items, 3 images)
//!     Source: datasets/05_Regresion_Logistica.ipynb
//!     Record: templates/notebooks/05_Regresion_Logistica.json
//!
//! Failed
//!     06_broken.ipynb: Invalid notebook JSON: expected value at line 1 column 1
//!
//! Skipped
//!     07_missing.ipynb
//!
//! Converted 1 notebook, 1 failed, 1 skipped
//! ```
//!
//! ## List
//!
//! ```text
//! /home/me/notebooks
//! 001 05_Regresion_Logistica.ipynb (48.2 KB)
//! 002 06_Visualizacion.ipynb (1.3 MB)
//! ```
//!
//! Each view has a `format_*` function returning lines, for tests, and a
//! `print_*` wrapper that writes them to stdout.

use crate::catalog::display_title;
use crate::convert::{BatchReport, ConversionReport, StripReport};
use crate::listing::FolderListing;
use std::path::Path;

/// 1-based positional index, zero-padded to three digits.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Human-readable byte size: `512 B`, `48.2 KB`, `1.3 MB`.
fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / MB)
    }
}

/// `path` relative to `base` when it lives under it.
fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn conversion_lines(index: usize, report: &ConversionReport, base: &Path) -> Vec<String> {
    vec![
        format!(
            "{} {} ({}, {})",
            format_index(index),
            display_title(&report.slug),
            plural(report.items, "item"),
            plural(report.images as usize, "image")
        ),
        format!("{}Source: {}", indent(1), display_path(&report.source, base)),
        format!(
            "{}Record: {}",
            indent(1),
            display_path(&report.record_path, base)
        ),
    ]
}

/// A single converted notebook.
pub fn format_conversion(report: &ConversionReport, base: &Path) -> Vec<String> {
    conversion_lines(1, report, base)
}

/// A batch run: converted notebooks, failures, skipped targets, totals.
pub fn format_batch_report(report: &BatchReport, base: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.converted.is_empty() {
        lines.push("Converted".to_string());
        for (i, converted) in report.converted.iter().enumerate() {
            lines.extend(conversion_lines(i + 1, converted, base));
        }
        lines.push(String::new());
    }

    if !report.failed.is_empty() {
        lines.push("Failed".to_string());
        for failure in &report.failed {
            lines.push(format!("{}{}: {}", indent(1), failure.name, failure.error));
        }
        lines.push(String::new());
    }

    if !report.skipped.is_empty() {
        lines.push("Skipped".to_string());
        for name in &report.skipped {
            lines.push(format!("{}{}", indent(1), name));
        }
        lines.push(String::new());
    }

    lines.push(format!(
        "Converted {}, {} failed, {} skipped",
        plural(report.converted.len(), "notebook"),
        report.failed.len(),
        report.skipped.len()
    ));
    lines
}

/// Notebooks found in a folder.
pub fn format_listing(listing: &FolderListing) -> Vec<String> {
    let mut lines = vec![listing.folder.clone()];
    if listing.files.is_empty() {
        lines.push(format!("{}(no notebooks)", indent(1)));
    }
    for (i, file) in listing.files.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            file.name,
            format_size(file.size)
        ));
    }
    lines
}

/// Markdown removal across stored records.
pub fn format_strip_report(report: &StripReport) -> Vec<String> {
    let mut lines = Vec::new();
    for result in &report.updated {
        lines.push(format!(
            "{}: removed {}",
            result.slug,
            plural(result.removed, "markdown item")
        ));
    }
    for failure in &report.failed {
        lines.push(format!("{}: FAILED {}", failure.name, failure.error));
    }
    lines.push(format!(
        "Updated {}, {} failed",
        plural(report.updated.len(), "record"),
        report.failed.len()
    ));
    lines
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

pub fn print_conversion(report: &ConversionReport, base: &Path) {
    print_lines(format_conversion(report, base));
}

pub fn print_batch_report(report: &BatchReport, base: &Path) {
    print_lines(format_batch_report(report, base));
}

pub fn print_listing(listing: &FolderListing) {
    print_lines(format_listing(listing));
}

pub fn print_strip_report(report: &StripReport) {
    print_lines(format_strip_report(report));
}
