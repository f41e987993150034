//! Page summary and section extraction.
//!
//! The first markdown block of a notebook usually introduces it: a title, a
//! paragraph or two, and an outline of the sub-topics. The notebook page shows
//! that block separately from the rest, so [`extract_summary`] pulls it out of
//! the item list and derives:
//!
//! - **summary**: the block's HTML with every heading line removed (the page
//!   already shows a title).
//! - **sections**: the block's `##`/`###` heading texts, in order, without
//!   duplicates and without generic headings like "Dataset" or "Datos".
//!
//! ```text
//! # Regresión Logística          → dropped (title)
//! Modelo para clasificar...      → summary
//! ## Dataset                     → dropped (stoplist)
//! ## Entrenamiento               → sections[0]
//! ### Métricas                   → sections[1]
//! ```

use crate::types::DisplayItem;
use maud::html;
use pulldown_cmark::{Options, Parser, html as md_html};

/// Converts markdown text to HTML.
pub type MarkdownRenderer = fn(&str) -> String;

/// Headings too generic to be useful as section links. A heading is dropped if,
/// lowercased and without colons, it equals an entry or starts with an entry
/// followed by a space.
pub const SECTION_STOPLIST: &[&str] = &[
    "dataset",
    "data set",
    "datafiles",
    "data files",
    "data",
    "descripcion",
    "descripción",
    "datos",
    "datafile",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    /// HTML of the intro block, `None` when there is no intro text.
    pub summary: Option<String>,
    pub sections: Vec<String>,
}

/// Remove the first markdown item from `items` and summarize it.
///
/// `renderer` turns markdown into HTML; when absent the text is escaped and
/// split into paragraphs by [`fallback_html`]. Items are left untouched when
/// there is no markdown item.
pub fn extract_summary(
    items: &mut Vec<DisplayItem>,
    renderer: Option<MarkdownRenderer>,
) -> PageSummary {
    let raw = items
        .iter()
        .position(|item| matches!(item, DisplayItem::Markdown { content } if !content.is_empty()))
        .map(|position| items.remove(position))
        .and_then(|item| match item {
            DisplayItem::Markdown { content } => Some(content),
            _ => None,
        });
    let Some(raw) = raw else {
        return PageSummary::default();
    };

    let sections = section_headings(&raw);

    let body = strip_heading_lines(&raw);
    let summary = (!body.is_empty()).then(|| match renderer {
        Some(render) => render(&body),
        None => fallback_html(&body),
    });

    PageSummary { summary, sections }
}

/// Second- and third-level heading texts, deduplicated, stoplist applied.
pub fn section_headings(markdown: &str) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    for line in markdown.lines() {
        let line = line.trim();
        let level = line.chars().take_while(|&c| c == '#').count();
        if !(2..=3).contains(&level) {
            continue;
        }
        let heading = line.trim_start_matches('#').trim();
        if heading.is_empty() || is_generic_heading(heading) {
            continue;
        }
        if !sections.iter().any(|s| s == heading) {
            sections.push(heading.to_string());
        }
    }
    sections
}

fn is_generic_heading(heading: &str) -> bool {
    let normalized = heading.to_lowercase().replace(':', "");
    let normalized = normalized.trim();
    SECTION_STOPLIST.iter().any(|stop| {
        normalized == *stop
            || normalized
                .strip_prefix(stop)
                .is_some_and(|rest| rest.starts_with(' '))
    })
}

/// Drop every line that starts with `#` and trim the result.
fn strip_heading_lines(markdown: &str) -> String {
    markdown
        .lines()
        .filter(|line| !line.trim().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Markdown to HTML with tables, footnotes and strikethrough enabled.
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

/// Escaped text with blank-line paragraphs and `<br>` line breaks.
pub fn fallback_html(text: &str) -> String {
    let escaped = html! { (text) }.into_string();
    format!(
        "<p>{}</p>",
        escaped.replace("\n\n", "</p><p>").replace('\n', "<br>")
    )
}
