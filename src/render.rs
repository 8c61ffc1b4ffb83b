use std::path::{Path, PathBuf};

use askama::Template;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::model::Entry;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to render HTML template: {0}")]
    Template(#[from] askama::Error),
    #[error("Could not write output file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate<'a> {
    pub entries: &'a [Entry],
}

pub fn render_html(entries: &[Entry]) -> Result<String, RenderError> {
    Ok(PageTemplate { entries }.render()?)
}

/// One `<channel>: <title>` line per entry.
pub fn render_text(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}: {}\n", entry.image.title, entry.plain_title()))
        .collect()
}

/// Renders both documents and writes them to the configured paths.
pub fn write_outputs(entries: &[Entry], config: &Config) -> Result<(), RenderError> {
    let html = render_html(entries)?;
    write_file(&config.html_output, &html)?;

    write_file(&config.text_output, &render_text(entries))?;

    info!(
        "Wrote {} entries to {} and {}",
        entries.len(),
        config.html_output.display(),
        config.text_output.display()
    );
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<(), RenderError> {
    std::fs::write(path, content).map_err(|source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    })
}
