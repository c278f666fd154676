//! Scoring engine.
//!
//! A pure function from a document and a set of recorded answers to a
//! [`Results`] snapshot. Sections are independent and unweighted; items
//! without choices are skipped entirely.

use serde::{Deserialize, Serialize};

use crate::model::{Answers, ExamDocument, Letter};

/// Placeholder shown for a scored item with no submission.
pub const UNANSWERED: &str = "—";

/// Final scores for every section plus overall totals.
///
/// Serializes as `{"by_section": {<name>: {correct, total, wrong}}, "overall": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results {
    /// Per-section scores, in document order.
    #[serde(with = "section_map")]
    pub by_section: Vec<SectionScore>,
    /// Sum over all sections.
    pub overall: Tally,
}

impl Results {
    /// Look up a section's score by name (first match wins).
    pub fn section(&self, name: &str) -> Option<&SectionScore> {
        self.by_section.iter().find(|s| s.name == name)
    }
}

/// A correct/total pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub correct: u32,
    pub total: u32,
}

impl Tally {
    pub fn percent(&self) -> f64 {
        percent(self.correct, self.total)
    }
}

/// Score for a single section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionScore {
    pub name: String,
    pub correct: u32,
    pub total: u32,
    /// Scored items that were missed or left blank.
    pub wrong: Vec<WrongAnswer>,
}

impl SectionScore {
    pub fn tally(&self) -> Tally {
        Tally {
            correct: self.correct,
            total: self.total,
        }
    }

    pub fn percent(&self) -> f64 {
        percent(self.correct, self.total)
    }
}

/// A missed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongAnswer {
    /// 1-based item number within the section.
    pub number: usize,
    pub question: String,
    /// The normalized answer key (may be empty if the key was unset).
    pub correct: String,
    /// The submitted letter, or [`UNANSWERED`].
    pub submitted: String,
}

// Section scores as a map keyed by name; entry order follows the document.
mod section_map {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{SectionScore, WrongAnswer};

    #[derive(Serialize)]
    struct EntryRef<'a> {
        correct: u32,
        total: u32,
        wrong: &'a [WrongAnswer],
    }

    #[derive(Deserialize)]
    struct Entry {
        correct: u32,
        total: u32,
        #[serde(default)]
        wrong: Vec<WrongAnswer>,
    }

    pub fn serialize<S>(sections: &[SectionScore], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(sections.len()))?;
        for section in sections {
            map.serialize_entry(
                &section.name,
                &EntryRef {
                    correct: section.correct,
                    total: section.total,
                    wrong: &section.wrong,
                },
            )?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<SectionScore>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SectionMapVisitor;

        impl<'de> Visitor<'de> for SectionMapVisitor {
            type Value = Vec<SectionScore>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map from section name to score")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut sections = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, entry)) = access.next_entry::<String, Entry>()? {
                    sections.push(SectionScore {
                        name,
                        correct: entry.correct,
                        total: entry.total,
                        wrong: entry.wrong,
                    });
                }
                Ok(sections)
            }
        }

        deserializer.deserialize_map(SectionMapVisitor)
    }
}

/// `100 × correct / total`, or `0.0` when there is nothing to score.
pub fn percent(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * f64::from(correct) / f64::from(total)
}

/// Score all sections of `document` against `answers`.
///
/// Missing sections or short answer vectors count as unanswered.
pub fn score(document: &ExamDocument, answers: &Answers) -> Results {
    let mut overall = Tally::default();

    let by_section = document
        .sections
        .iter()
        .map(|section| {
            let recorded = answers.get(&section.name).map(Vec::as_slice).unwrap_or(&[]);
            let mut correct = 0u32;
            let mut total = 0u32;
            let mut wrong = Vec::new();

            for (i, item) in section.items.iter().enumerate() {
                if !item.is_scored() {
                    continue;
                }
                total += 1;

                let key = item.answer_key();
                let submitted: Option<Letter> = recorded.get(i).copied().flatten();
                match submitted {
                    Some(letter) if !key.is_empty() && letter.as_str() == key => correct += 1,
                    _ => wrong.push(WrongAnswer {
                        number: i + 1,
                        question: item.q.clone(),
                        correct: key,
                        submitted: submitted
                            .map(|l| l.to_string())
                            .unwrap_or_else(|| UNANSWERED.to_string()),
                    }),
                }
            }

            overall.correct += correct;
            overall.total += total;

            SectionScore {
                name: section.name.clone(),
                correct,
                total,
                wrong,
            }
        })
        .collect();

    Results {
        by_section,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, Section};

    fn item(q: &str, choices: usize, ans: &str) -> Item {
        Item {
            q: q.into(),
            passage: String::new(),
            choices: (0..choices).map(|c| format!("choice {c}")).collect(),
            ans: ans.into(),
        }
    }

    fn doc(sections: Vec<(&str, Vec<Item>)>) -> ExamDocument {
        ExamDocument {
            sections: sections
                .into_iter()
                .map(|(name, items)| Section {
                    name: name.into(),
                    time_minutes: None,
                    items,
                })
                .collect(),
        }
    }

    fn answers(pairs: &[(&str, Vec<Option<Letter>>)]) -> Answers {
        pairs
            .iter()
            .map(|(n, a)| (n.to_string(), a.clone()))
            .collect()
    }

    #[test]
    fn one_right_one_wrong() {
        let d = doc(vec![(
            "Reading",
            vec![item("first", 4, "A"), item("second", 4, "C")],
        )]);
        let a = answers(&[("Reading", vec![Some(Letter::A), Some(Letter::B)])]);

        let results = score(&d, &a);
        let section = results.section("Reading").unwrap();
        assert_eq!(section.tally(), Tally { correct: 1, total: 2 });
        assert_eq!(
            section.wrong,
            vec![WrongAnswer {
                number: 2,
                question: "second".into(),
                correct: "C".into(),
                submitted: "B".into(),
            }]
        );
        assert_eq!(results.overall, Tally { correct: 1, total: 2 });
    }

    #[test]
    fn key_is_trimmed_and_uppercased() {
        let d = doc(vec![("s", vec![item("q", 2, " b ")])]);
        let a = answers(&[("s", vec![Some(Letter::B)])]);
        assert_eq!(score(&d, &a).overall.correct, 1);
    }

    #[test]
    fn unscored_items_never_count() {
        let d = doc(vec![("s", vec![item("info", 0, "A"), item("real", 2, "A")])]);
        let a = answers(&[("s", vec![Some(Letter::A), None])]);
        let results = score(&d, &a);
        assert_eq!(results.overall, Tally { correct: 0, total: 1 });
        assert_eq!(results.by_section[0].wrong[0].number, 2);
    }

    #[test]
    fn blank_submission_is_wrong_with_placeholder() {
        let d = doc(vec![("s", vec![item("q", 3, "A")])]);
        let results = score(&d, &Answers::new());
        assert_eq!(results.overall, Tally { correct: 0, total: 1 });
        assert_eq!(results.by_section[0].wrong[0].submitted, UNANSWERED);
    }

    #[test]
    fn empty_key_never_matches() {
        let d = doc(vec![("s", vec![item("no key", 2, "")])]);
        let a = answers(&[("s", vec![Some(Letter::A)])]);
        let results = score(&d, &a);
        assert_eq!(results.overall.correct, 0);
        assert_eq!(results.overall.total, 1);
        assert_eq!(results.by_section[0].wrong[0].correct, "");
    }

    #[test]
    fn short_or_oversized_answer_vectors_are_tolerated() {
        let d = doc(vec![("s", vec![item("a", 2, "A"), item("b", 2, "B")])]);
        let short = answers(&[("s", vec![Some(Letter::A)])]);
        assert_eq!(score(&d, &short).overall, Tally { correct: 1, total: 2 });

        let long = answers(&[("s", vec![Some(Letter::A), Some(Letter::B), Some(Letter::C)])]);
        assert_eq!(score(&d, &long).overall, Tally { correct: 2, total: 2 });
    }

    #[test]
    fn overall_sums_sections() {
        let d = doc(vec![
            ("one", vec![item("a", 2, "A")]),
            ("two", vec![item("b", 2, "B"), item("c", 2, "A")]),
        ]);
        let a = answers(&[
            ("one", vec![Some(Letter::A)]),
            ("two", vec![Some(Letter::B), Some(Letter::B)]),
        ]);
        let results = score(&d, &a);
        assert_eq!(results.by_section.len(), 2);
        assert_eq!(results.overall, Tally { correct: 2, total: 3 });
        for s in &results.by_section {
            assert!(s.correct <= s.total);
        }
    }

    #[test]
    fn serializes_sections_keyed_by_name() {
        let d = doc(vec![
            ("Verbal", vec![item("a", 2, "A")]),
            ("Math", vec![item("b", 2, "B")]),
        ]);
        let a = answers(&[("Verbal", vec![Some(Letter::B)])]);
        let results = score(&d, &a);

        let value = serde_json::to_value(&results).unwrap();
        assert!(value["by_section"].is_object());
        assert_eq!(value["by_section"]["Verbal"]["correct"], 0);
        assert_eq!(value["by_section"]["Verbal"]["total"], 1);
        assert_eq!(value["by_section"]["Verbal"]["wrong"][0]["submitted"], "B");
        assert_eq!(value["by_section"]["Math"]["wrong"][0]["submitted"], UNANSWERED);
        assert_eq!(value["overall"]["total"], 2);

        // Reading back keeps document order, not key order
        let json = serde_json::to_string(&results).unwrap();
        let back: Results = serde_json::from_str(&json).unwrap();
        assert_eq!(back, results);
        assert_eq!(back.by_section[0].name, "Verbal");
    }

    #[test]
    fn percent_handles_zero_total() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(Tally { correct: 3, total: 3 }.percent(), 100.0);
    }
}
