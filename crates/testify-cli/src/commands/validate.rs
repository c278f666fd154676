//! The `testify validate` command.

use std::path::PathBuf;

use anyhow::Result;

use testify_core::parser;

pub fn execute(exam: PathBuf) -> Result<()> {
    let document = parser::load_document(&exam)?;
    let items: usize = document.sections.iter().map(|s| s.items.len()).sum();
    println!(
        "Exam: {} sections, {items} items ({} scored)",
        document.sections.len(),
        document.scored_item_count()
    );

    let warnings = parser::validate_document(&document);
    for w in &warnings {
        let prefix = match (&w.section, w.item) {
            (Some(section), Some(item)) => format!("  [{section} #{item}]"),
            (Some(section), None) => format!("  [{section}]"),
            _ => "  ".to_string(),
        };
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Exam is valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
