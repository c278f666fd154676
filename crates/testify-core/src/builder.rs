//! Editable exam document with section/item selection.
//!
//! Field edits are held in [`EditorFields`] and only written back to the
//! document on [`DocumentBuilder::commit`], which runs before every
//! selection change and before export.

use thiserror::Error;

use crate::model::{ExamDocument, Item, Letter, Section, DEFAULT_SECTION_NAME, MAX_CHOICES};
use crate::parser;

/// Default file name for a builder export that has no chosen destination.
pub const EXAM_EXPORT_NAME: &str = "testify_exam.json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("no section selected")]
    NoSectionSelected,
    #[error("no item selected")]
    NoItemSelected,
    #[error("section {} does not exist", .0 + 1)]
    SectionOutOfRange(usize),
    #[error("item {} does not exist", .0 + 1)]
    ItemOutOfRange(usize),
}

/// Pending, uncommitted text for the selected section and item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorFields {
    pub section_name: String,
    /// Raw minutes text; anything that is not a positive integer means untimed.
    pub time_minutes: String,
    pub question: String,
    pub passage: String,
    pub choices: [String; MAX_CHOICES],
    pub answer: String,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    sections: Vec<Section>,
    selected_section: Option<usize>,
    selected_item: Option<usize>,
    fields: EditorFields,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start editing an existing document. Nothing is selected.
    pub fn from_document(document: ExamDocument) -> Self {
        Self {
            sections: document.sections,
            ..Default::default()
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn selected_section(&self) -> Option<usize> {
        self.selected_section
    }

    pub fn selected_item(&self) -> Option<usize> {
        self.selected_item
    }

    pub fn fields(&self) -> &EditorFields {
        &self.fields
    }

    pub fn set_section_name(&mut self, name: &str) -> Result<(), BuilderError> {
        self.require_section()?;
        self.fields.section_name = name.to_string();
        Ok(())
    }

    pub fn set_time_minutes(&mut self, text: &str) -> Result<(), BuilderError> {
        self.require_section()?;
        self.fields.time_minutes = text.to_string();
        Ok(())
    }

    pub fn set_question(&mut self, text: &str) -> Result<(), BuilderError> {
        self.require_item()?;
        self.fields.question = text.to_string();
        Ok(())
    }

    pub fn set_passage(&mut self, text: &str) -> Result<(), BuilderError> {
        self.require_item()?;
        self.fields.passage = text.to_string();
        Ok(())
    }

    pub fn set_choice(&mut self, letter: Letter, text: &str) -> Result<(), BuilderError> {
        self.require_item()?;
        self.fields.choices[letter.index()] = text.to_string();
        Ok(())
    }

    pub fn set_answer(&mut self, text: &str) -> Result<(), BuilderError> {
        self.require_item()?;
        self.fields.answer = text.to_string();
        Ok(())
    }

    /// Append an untitled section and select it.
    pub fn add_section(&mut self) -> usize {
        self.commit();
        self.sections.push(Section::untitled());
        let index = self.sections.len() - 1;
        self.selected_section = Some(index);
        self.selected_item = None;
        self.sync_fields();
        index
    }

    /// Remove the selected section. Both cursors are cleared.
    pub fn delete_section(&mut self) -> Result<Section, BuilderError> {
        let index = self.require_section()?;
        let removed = self.sections.remove(index);
        self.selected_section = None;
        self.selected_item = None;
        self.sync_fields();
        Ok(removed)
    }

    pub fn select_section(&mut self, index: usize) -> Result<(), BuilderError> {
        if index >= self.sections.len() {
            return Err(BuilderError::SectionOutOfRange(index));
        }
        self.commit();
        self.selected_section = Some(index);
        self.selected_item = None;
        self.sync_fields();
        Ok(())
    }

    /// Append a blank item to the selected section and select it.
    pub fn add_item(&mut self) -> Result<usize, BuilderError> {
        let section = self.require_section()?;
        self.commit();
        let items = &mut self.sections[section].items;
        items.push(Item::default());
        let index = items.len() - 1;
        self.selected_item = Some(index);
        self.sync_fields();
        Ok(index)
    }

    /// Remove the selected item. The section stays selected.
    pub fn delete_item(&mut self) -> Result<Item, BuilderError> {
        let section = self.require_section()?;
        let item = self.require_item()?;
        let removed = self.sections[section].items.remove(item);
        self.selected_item = None;
        self.sync_fields();
        Ok(removed)
    }

    pub fn select_item(&mut self, index: usize) -> Result<(), BuilderError> {
        let section = self.require_section()?;
        if index >= self.sections[section].items.len() {
            return Err(BuilderError::ItemOutOfRange(index));
        }
        self.commit();
        self.selected_item = Some(index);
        self.sync_fields();
        Ok(())
    }

    /// Write pending field edits into the selected section and item.
    pub fn commit(&mut self) {
        let Some(section) = self.selected_section.and_then(|i| self.sections.get_mut(i)) else {
            return;
        };
        let fields = &self.fields;

        let name = fields.section_name.trim();
        section.name = if name.is_empty() {
            DEFAULT_SECTION_NAME.to_string()
        } else {
            name.to_string()
        };
        section.time_minutes = parse_minutes(&fields.time_minutes);

        let Some(item) = self.selected_item.and_then(|i| section.items.get_mut(i)) else {
            return;
        };
        item.q = fields.question.trim().to_string();
        item.passage = fields.passage.clone();
        item.choices = fields
            .choices
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        item.ans = answer_letter(&fields.answer);
    }

    /// Commit pending edits and return the normalized document.
    pub fn export(&mut self) -> ExamDocument {
        self.commit();
        let mut sections = self.sections.clone();
        for item in sections.iter_mut().flat_map(|s| s.items.iter_mut()) {
            item.choices.retain(|c| !c.trim().is_empty());
            item.ans = answer_letter(&item.ans);
        }
        parser::normalize(ExamDocument { sections })
    }

    fn require_section(&self) -> Result<usize, BuilderError> {
        self.selected_section
            .filter(|&i| i < self.sections.len())
            .ok_or(BuilderError::NoSectionSelected)
    }

    fn require_item(&self) -> Result<usize, BuilderError> {
        let section = self.require_section()?;
        self.selected_item
            .filter(|&i| i < self.sections[section].items.len())
            .ok_or(BuilderError::NoItemSelected)
    }

    /// Reload the editor fields from the current selection.
    fn sync_fields(&mut self) {
        self.fields = EditorFields::default();
        let Some(section) = self.selected_section.and_then(|i| self.sections.get(i)) else {
            return;
        };
        self.fields.section_name = section.name.clone();
        self.fields.time_minutes = section
            .time_minutes
            .map(|m| m.to_string())
            .unwrap_or_default();

        let Some(item) = self.selected_item.and_then(|i| section.items.get(i)) else {
            return;
        };
        self.fields.question = item.q.clone();
        self.fields.passage = item.passage.clone();
        for (slot, choice) in self.fields.choices.iter_mut().zip(&item.choices) {
            slot.clone_from(choice);
        }
        self.fields.answer = item.ans.clone();
    }
}

/// Positive whole minutes, or `None` for blank and malformed input.
fn parse_minutes(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok().filter(|&m| m > 0)
}

/// First character of the trimmed answer, uppercased.
fn answer_letter(text: &str) -> String {
    text.trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}
