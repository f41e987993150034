//! HTML pages for the site.
//!
//! All markup is built with Maud, so interpolated strings are escaped. Two
//! payloads are inserted raw with `PreEscaped`: markdown rendered by
//! pulldown-cmark and `html` items, which are notebook output the notebook's
//! author produced (pandas tables, plot widgets).
//!
//! ```text
//! /                   render_index     grid of converted notebooks + folder browser
//! /notebook/{slug}/   render_notebook  summary, sections aside, display items
//! (any)               render_not_found / render_error
//! ```

use crate::catalog::{CatalogEntry, NotebookPage};
use crate::summary::render_markdown;
use crate::types::DisplayItem;
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS: &str = include_str!("../assets/site.css");
const BROWSER_JS: &str = include_str!("../assets/browser.js");

fn base_document(title: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

fn site_header(site_title: &str) -> Markup {
    html! {
        header.site-header {
            a.site-title href="/" { (site_title) }
        }
    }
}

/// The landing page: one card per converted notebook.
pub fn render_index(site_title: &str, entries: &[CatalogEntry]) -> Markup {
    let content = html! {
        (site_header(site_title))
        main.index-page {
            @if entries.is_empty() {
                p.empty { "No notebooks have been converted yet." }
            } @else {
                div.notebook-grid {
                    @for entry in entries {
                        a.notebook-card href={ "/notebook/" (entry.slug) "/" } {
                            @if let Some(thumb) = &entry.thumbnail {
                                img src=(thumb) alt=(entry.title) loading="lazy";
                            } @else {
                                div.placeholder {}
                            }
                            span.notebook-title { (entry.title) }
                        }
                    }
                }
            }
            (folder_browser())
        }
    };

    base_document(site_title, Some("index"), content)
}

fn folder_browser() -> Markup {
    html! {
        section.folder-browser {
            h2 { "Open a notebook" }
            form {
                input type="text" name="folder_path" placeholder="/path/to/notebooks";
                button type="submit" { "List" }
            }
            p.status {}
            ul {}
        }
        script { (PreEscaped(BROWSER_JS)) }
    }
}

/// One notebook: intro summary, section outline, then every display item.
pub fn render_notebook(site_title: &str, page: &NotebookPage) -> Markup {
    let content = html! {
        (site_header(site_title))
        main.notebook-page {
            h1 { (page.title) }
            div.notebook-layout {
                article {
                    @if let Some(summary) = &page.summary.summary {
                        section.notebook-summary { (PreEscaped(summary)) }
                    }
                    @for item in &page.items {
                        (render_item(item))
                    }
                }
                @if !page.summary.sections.is_empty() {
                    aside.notebook-sections {
                        h2 { "Sections" }
                        ul {
                            @for section in &page.summary.sections {
                                li { (section) }
                            }
                        }
                    }
                }
            }
        }
    };

    base_document(&page.title, Some("notebook"), content)
}

fn render_item(item: &DisplayItem) -> Markup {
    let body = match item {
        DisplayItem::Markdown { content } => PreEscaped(render_markdown(content)),
        DisplayItem::Text { content } => html! { pre { (content) } },
        DisplayItem::Html { content } => PreEscaped(content.clone()),
        DisplayItem::Image { url } => html! { img src=(url) alt="" loading="lazy"; },
    };
    html! {
        div class={ "item item-" (item.kind()) } { (body) }
    }
}

pub fn render_not_found(site_title: &str, what: &str) -> Markup {
    let content = html! {
        (site_header(site_title))
        main.error-page {
            h1 { "Not found" }
            p { (what) " does not exist." }
            p { a href="/" { "Back to the index" } }
        }
    };
    base_document("Not found", Some("error"), content)
}

/// Generic failure page. `detail` is only passed in debug mode.
pub fn render_error(site_title: &str, detail: Option<&str>) -> Markup {
    let content = html! {
        (site_header(site_title))
        main.error-page {
            h1 { "Something went wrong" }
            @if let Some(detail) = detail {
                p.error-detail { (detail) }
            }
        }
    };
    base_document("Error", Some("error"), content)
}
