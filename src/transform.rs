//! Cell-to-display-item transform.
//!
//! Walks a [`Notebook`] in order and produces the [`DisplayItem`] sequence
//! that gets persisted. Code is never shown; only what it produced.
//!
//! | Source | Display item |
//! |--------|--------------|
//! | markdown cell (non-blank) | `markdown` |
//! | image output | `image` (URL from the [`AssetSink`]) |
//! | HTML output | `html` |
//! | plain-text repr or stream output | `text` |
//!
//! Items follow cell order, and within a code cell, output order.

use crate::materialize::{AssetSink, MaterializeError};
use crate::notebook::{Cell, Notebook, Output};
use crate::types::DisplayItem;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Image output in cell {cell}: {source}")]
    Image {
        cell: usize,
        source: MaterializeError,
    },
}

pub fn transform(
    notebook: &Notebook,
    assets: &mut dyn AssetSink,
) -> Result<Vec<DisplayItem>, TransformError> {
    let mut items = Vec::new();

    for (cell_index, cell) in notebook.cells.iter().enumerate() {
        match cell {
            Cell::Markdown { text } => {
                if !text.trim().is_empty() {
                    items.push(DisplayItem::Markdown {
                        content: text.clone(),
                    });
                }
            }
            Cell::Code { outputs } => {
                for output in outputs {
                    let item = match output {
                        Output::Image(image) => {
                            let url = assets.store(image).map_err(|source| {
                                TransformError::Image {
                                    cell: cell_index,
                                    source,
                                }
                            })?;
                            DisplayItem::Image { url }
                        }
                        Output::Html { markup } => DisplayItem::Html {
                            content: markup.clone(),
                        },
                        Output::PlainText { text } | Output::Stream { text } => {
                            DisplayItem::Text {
                                content: text.clone(),
                            }
                        }
                    };
                    items.push(item);
                }
            }
        }
    }

    Ok(items)
}
