//! Plain-text results report.

use chrono::NaiveDateTime;

use testify_core::scoring::Results;

/// Wrong answers listed per section before the rest are omitted.
pub const MAX_WRONG_LINES: usize = 50;

const RULE_WIDTH: usize = 64;

/// Render the human-readable report.
///
/// ```text
/// Testify Results (2024-05-01 09:30)
/// ================================================================
/// Verbal: 1/2 (50.0%)
///   Wrong:
///     Q2: you=B | correct=C | question text
/// ----------------------------------------------------------------
/// OVERALL: 1/2 (50.0%)
/// ```
pub fn render_text(results: &Results, generated_at: &NaiveDateTime) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Testify Results ({})\n",
        generated_at.format("%Y-%m-%d %H:%M")
    ));
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');

    for section in &results.by_section {
        out.push_str(&format!(
            "{}: {}/{} ({:.1}%)\n",
            section.name,
            section.correct,
            section.total,
            section.percent()
        ));
        if section.wrong.is_empty() {
            continue;
        }
        out.push_str("  Wrong:\n");
        for wrong in section.wrong.iter().take(MAX_WRONG_LINES) {
            out.push_str(&format!(
                "    Q{}: you={} | correct={} | {}\n",
                wrong.number, wrong.submitted, wrong.correct, wrong.question
            ));
        }
    }

    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');
    out.push_str(&format!(
        "OVERALL: {}/{} ({:.1}%)",
        results.overall.correct,
        results.overall.total,
        results.overall.percent()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use testify_core::scoring::{SectionScore, Tally, WrongAnswer, UNANSWERED};

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn wrong(number: usize, submitted: &str) -> WrongAnswer {
        WrongAnswer {
            number,
            question: format!("question {number}"),
            correct: "A".into(),
            submitted: submitted.into(),
        }
    }

    #[test]
    fn renders_exact_layout() {
        let results = Results {
            by_section: vec![
                SectionScore {
                    name: "Verbal".into(),
                    correct: 1,
                    total: 3,
                    wrong: vec![wrong(2, "B"), wrong(3, UNANSWERED)],
                },
                SectionScore {
                    name: "Quant".into(),
                    correct: 2,
                    total: 2,
                    wrong: vec![],
                },
            ],
            overall: Tally { correct: 3, total: 5 },
        };

        let expected = [
            "Testify Results (2024-05-01 09:30)",
            &"=".repeat(64),
            "Verbal: 1/3 (33.3%)",
            "  Wrong:",
            "    Q2: you=B | correct=A | question 2",
            "    Q3: you=— | correct=A | question 3",
            "Quant: 2/2 (100.0%)",
            &"-".repeat(64),
            "OVERALL: 3/5 (60.0%)",
        ]
        .join("\n");
        assert_eq!(render_text(&results, &at()), expected);
    }

    #[test]
    fn wrong_list_is_capped() {
        let results = Results {
            by_section: vec![SectionScore {
                name: "Long".into(),
                correct: 0,
                total: 80,
                wrong: (1..=80).map(|n| wrong(n, "B")).collect(),
            }],
            overall: Tally { correct: 0, total: 80 },
        };
        let text = render_text(&results, &at());
        assert_eq!(text.matches("    Q").count(), MAX_WRONG_LINES);
        assert!(text.contains("Q50:"));
        assert!(!text.contains("Q51:"));
    }

    #[test]
    fn empty_sections_report_zero_percent() {
        let results = Results {
            by_section: vec![SectionScore {
                name: "Info".into(),
                correct: 0,
                total: 0,
                wrong: vec![],
            }],
            overall: Tally::default(),
        };
        let text = render_text(&results, &at());
        assert!(text.contains("Info: 0/0 (0.0%)"));
        assert!(text.ends_with("OVERALL: 0/0 (0.0%)"));
    }
}
