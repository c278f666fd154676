//! The `testify score` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde_json::Value;

use testify_core::model::{Answers, ExamDocument, Letter};
use testify_core::parser;
use testify_core::scoring;
use testify_core::session::{ReportFormat, RESULTS_EXPORT_NAME, TEXT_REPORT_NAME};
use testify_report::{persist_results, DirectoryPersister};

use crate::config::load_config_from;

pub fn execute(
    exam: PathBuf,
    answers_path: PathBuf,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let formats: Vec<ReportFormat> = match format.as_str() {
        "all" => vec![ReportFormat::Text, ReportFormat::Json],
        other => other
            .split(',')
            .map(|f| match f.trim() {
                "text" | "txt" => Ok(ReportFormat::Text),
                "json" => Ok(ReportFormat::Json),
                unknown => Err(anyhow::anyhow!("unknown format: '{unknown}'")),
            })
            .collect::<Result<Vec<_>>>()?,
    };

    let config = load_config_from(config_path.as_deref())?;
    let document = parser::load_document(&exam)?;
    let answers = load_answers(&answers_path, &document)?;

    let results = scoring::score(&document, &answers);
    println!("{}", super::summary_table(&results, &config));

    let persister = DirectoryPersister::new(output.unwrap_or_else(|| config.output_dir()))
        .with_fallback(config.fallback_dir());
    for format in formats {
        let name = match format {
            ReportFormat::Text => TEXT_REPORT_NAME,
            ReportFormat::Json => RESULTS_EXPORT_NAME,
        };
        let path = persist_results(&persister, format, name, &results, config.mode, Local::now())?;
        eprintln!("Report: {}", path.display());
    }

    Ok(())
}

/// Read recorded answers: `{"<section>": ["A", null, "c", ""]}`.
///
/// Blank and null slots are unanswered; anything that is not a letter is
/// treated as unanswered with a warning.
fn load_answers(path: &Path, document: &ExamDocument) -> Result<Answers> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answers: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answers: {}", path.display()))?;
    parse_answers(&value, document)
}

fn parse_answers(value: &Value, document: &ExamDocument) -> Result<Answers> {
    let map = value
        .as_object()
        .context("answers must be a JSON object keyed by section name")?;

    let mut answers = Answers::new();
    for (section, slots) in map {
        if document.section(section).is_none() {
            tracing::warn!("answers for unknown section '{section}' ignored");
            continue;
        }
        let slots = slots
            .as_array()
            .with_context(|| format!("answers for '{section}' must be an array"))?;
        let letters = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| match slot {
                Value::Null => None,
                Value::String(s) if s.trim().is_empty() => None,
                Value::String(s) => s.parse::<Letter>().ok().or_else(|| {
                    tracing::warn!("{section} item {}: '{s}' is not a choice letter", i + 1);
                    None
                }),
                other => {
                    tracing::warn!("{section} item {}: ignoring {other}", i + 1);
                    None
                }
            })
            .collect();
        answers.insert(section.clone(), letters);
    }
    Ok(answers)
}
