//! Result reports for testify.
//!
//! Renders [`Results`](testify_core::scoring::Results) as the plain-text
//! report or the structured JSON export, and persists either through a
//! [`Persister`].

pub mod json;
pub mod persist;
pub mod text;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Local};

use testify_core::model::Mode;
use testify_core::scoring::Results;
use testify_core::session::ReportFormat;

pub use json::ResultsReport;
pub use persist::{DirectoryPersister, Persister};

/// Render `results` in `format` and hand the bytes to `persister`.
///
/// A failed write is returned to the caller; `results` is never touched.
pub fn persist_results(
    persister: &dyn Persister,
    format: ReportFormat,
    suggested_name: &str,
    results: &Results,
    mode: Mode,
    generated_at: DateTime<Local>,
) -> Result<PathBuf> {
    let bytes = match format {
        ReportFormat::Text => text::render_text(results, &generated_at.naive_local()).into_bytes(),
        ReportFormat::Json => ResultsReport::new(results.clone(), mode, generated_at)
            .to_json()?
            .into_bytes(),
    };
    let path = persister.persist(suggested_name, &bytes)?;
    tracing::info!("report written to {}", path.display());
    Ok(path)
}
