//! Core data model types for testify.
//!
//! An exam document is an ordered list of sections; each section is an
//! ordered list of multiple-choice items. Progress is tracked separately by
//! the session and keyed by section name.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name given to sections whose name is absent or blank.
pub const DEFAULT_SECTION_NAME: &str = "Untitled";

/// Maximum number of choices per item (letters A through D).
pub const MAX_CHOICES: usize = 4;

/// Recorded answers, keyed by section name, one slot per item.
pub type Answers = HashMap<String, Vec<Option<Letter>>>;

/// A validated exam: sections in navigation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamDocument {
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl ExamDocument {
    /// Returns `true` if the document has at least one section to start.
    pub fn is_startable(&self) -> bool {
        !self.sections.is_empty()
    }

    /// Look up a section by name (first match wins).
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Total number of scored items across all sections.
    pub fn scored_item_count(&self) -> usize {
        self.sections.iter().map(Section::scored_item_count).sum()
    }
}

/// A named, optionally timed group of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    /// Time limit in minutes; `None` means untimed.
    #[serde(default)]
    pub time_minutes: Option<u32>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Section {
    /// A blank, untimed section with the default name.
    pub fn untitled() -> Self {
        Self {
            name: DEFAULT_SECTION_NAME.to_string(),
            time_minutes: None,
            items: Vec::new(),
        }
    }

    /// Time limit in milliseconds, if the section is timed.
    pub fn time_limit_ms(&self) -> Option<u64> {
        self.time_minutes
            .filter(|&m| m > 0)
            .map(|m| u64::from(m) * 60_000)
    }

    pub fn is_timed(&self) -> bool {
        self.time_limit_ms().is_some()
    }

    pub fn scored_item_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_scored()).count()
    }
}

/// One multiple-choice question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Question text.
    #[serde(default)]
    pub q: String,
    /// Optional supporting passage; empty means none.
    #[serde(default)]
    pub passage: String,
    /// Up to four choices, mapped to letters A..D by position.
    #[serde(default)]
    pub choices: Vec<String>,
    /// Correct letter, or empty when unset.
    #[serde(default)]
    pub ans: String,
}

impl Item {
    /// Items without choices are informational and never scored.
    pub fn is_scored(&self) -> bool {
        !self.choices.is_empty()
    }

    /// The choice text behind a letter, if the item offers it.
    pub fn choice(&self, letter: Letter) -> Option<&str> {
        self.choices.get(letter.index()).map(String::as_str)
    }

    /// The answer key as compared during scoring: trimmed and uppercased.
    pub fn answer_key(&self) -> String {
        self.ans.trim().to_uppercase()
    }

    /// Letters the test-taker can pick for this item.
    pub fn letters(&self) -> impl Iterator<Item = Letter> + '_ {
        Letter::ALL.into_iter().take(self.choices.len())
    }
}

/// A choice letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
}

impl Letter {
    pub const ALL: [Letter; MAX_CHOICES] = [Letter::A, Letter::B, Letter::C, Letter::D];

    /// Zero-based choice position.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Letter::A => "A",
            Letter::B => "B",
            Letter::C => "C",
            Letter::D => "D",
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Letter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Letter::A),
            "B" => Ok(Letter::B),
            "C" => Ok(Letter::C),
            "D" => Ok(Letter::D),
            other => Err(format!("not a choice letter: {other}")),
        }
    }
}

/// Whether timers and section locks are enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Exam,
    Practice,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Exam => write!(f, "exam"),
            Mode::Practice => write!(f, "practice"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exam" => Ok(Mode::Exam),
            "practice" => Ok(Mode::Practice),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}
