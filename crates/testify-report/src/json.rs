//! Structured results export with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use testify_core::model::Mode;
use testify_core::scoring::Results;

/// Results plus the context they were produced in.
///
/// The results' `by_section` and `overall` keys sit at the top level next
/// to `created_at` and `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsReport {
    /// When the exam was scored.
    pub created_at: DateTime<Local>,
    /// Mode the exam was taken in.
    pub mode: Mode,
    #[serde(flatten)]
    pub results: Results,
}

impl ResultsReport {
    pub fn new(results: Results, mode: Mode, created_at: DateTime<Local>) -> Self {
        Self {
            created_at,
            mode,
            results,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize results")
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write results to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read results from {}", path.display()))?;
        let report: ResultsReport =
            serde_json::from_str(&content).context("failed to parse results JSON")?;
        Ok(report)
    }
}
