//! The `testify build` command.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use testify_core::builder::{DocumentBuilder, EXAM_EXPORT_NAME};
use testify_core::model::Letter;
use testify_core::parser;
use testify_report::{DirectoryPersister, Persister};

use crate::config::load_config_from;

const HELP: &str = "\
Commands:
  add-section | del-section | section N
  add-item | del-item | item N
  name TEXT        section name
  time TEXT        minutes; blank or non-numeric means untimed
  q TEXT           question
  passage TEXT     passage (\\n for line breaks)
  choice A..D TEXT
  ans LETTER
  show             print the document and pending edits
  save [FILE]      write the exam JSON
  quit";

pub fn execute(
    from: Option<PathBuf>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let builder = match &from {
        Some(path) => DocumentBuilder::from_document(parser::load_document(path)?),
        None => DocumentBuilder::new(),
    };

    let stdout = io::stdout();
    let mut host = BuildHost {
        builder,
        output: output.or(from),
        fallback: config.fallback_dir(),
        out: stdout.lock(),
    };
    host.run(io::stdin().lock())
}

#[derive(Debug, PartialEq)]
enum BuildInput {
    Nothing,
    AddSection,
    DeleteSection,
    Section(usize),
    AddItem,
    DeleteItem,
    Item(usize),
    Name(String),
    Time(String),
    Question(String),
    Passage(String),
    Choice(Letter, String),
    Answer(String),
    Show,
    Save(Option<PathBuf>),
    Help,
    Quit,
}

fn parse_line(line: &str) -> Result<BuildInput, String> {
    let trimmed = line.trim();
    let (word, rest) = trimmed
        .split_once(char::is_whitespace)
        .map(|(w, r)| (w, r.trim()))
        .unwrap_or((trimmed, ""));

    let index = |usage: &str| -> Result<usize, String> {
        rest.parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .map(|n| n - 1)
            .ok_or_else(|| format!("usage: {usage} <number>"))
    };

    Ok(match word.to_lowercase().as_str() {
        "" => BuildInput::Nothing,
        "add-section" => BuildInput::AddSection,
        "del-section" => BuildInput::DeleteSection,
        "section" => BuildInput::Section(index("section")?),
        "add-item" => BuildInput::AddItem,
        "del-item" => BuildInput::DeleteItem,
        "item" => BuildInput::Item(index("item")?),
        "name" => BuildInput::Name(rest.to_string()),
        "time" => BuildInput::Time(rest.to_string()),
        "q" => BuildInput::Question(rest.to_string()),
        "passage" => BuildInput::Passage(rest.replace("\\n", "\n")),
        "choice" => {
            let (letter, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            BuildInput::Choice(letter.parse::<Letter>()?, text.trim().to_string())
        }
        "ans" => BuildInput::Answer(rest.to_string()),
        "show" => BuildInput::Show,
        "save" if rest.is_empty() => BuildInput::Save(None),
        "save" => BuildInput::Save(Some(PathBuf::from(rest))),
        "help" | "?" => BuildInput::Help,
        "quit" | "exit" => BuildInput::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    })
}

struct BuildHost<W> {
    builder: DocumentBuilder,
    output: Option<PathBuf>,
    fallback: PathBuf,
    out: W,
}

impl<W: Write> BuildHost<W> {
    fn run(&mut self, input: impl BufRead) -> Result<()> {
        for line in input.lines() {
            let line = line.context("failed to read input")?;
            let outcome = match parse_line(&line) {
                Ok(BuildInput::Quit) => break,
                Ok(command) => self.apply(command),
                Err(message) => Err(message),
            };
            if let Err(message) = outcome {
                writeln!(self.out, "! {message}")?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn apply(&mut self, input: BuildInput) -> Result<(), String> {
        let b = &mut self.builder;
        let error = |e: testify_core::builder::BuilderError| e.to_string();
        match input {
            BuildInput::Nothing | BuildInput::Quit => {}
            BuildInput::AddSection => {
                let index = b.add_section();
                self.say(format!("Added section {}", index + 1));
            }
            BuildInput::DeleteSection => {
                let removed = b.delete_section().map_err(error)?;
                self.say(format!("Deleted section '{}'", removed.name));
            }
            BuildInput::Section(index) => b.select_section(index).map_err(error)?,
            BuildInput::AddItem => {
                let index = b.add_item().map_err(error)?;
                self.say(format!("Added item {}", index + 1));
            }
            BuildInput::DeleteItem => {
                b.delete_item().map_err(error)?;
                self.say("Deleted item".to_string());
            }
            BuildInput::Item(index) => b.select_item(index).map_err(error)?,
            BuildInput::Name(text) => b.set_section_name(&text).map_err(error)?,
            BuildInput::Time(text) => b.set_time_minutes(&text).map_err(error)?,
            BuildInput::Question(text) => b.set_question(&text).map_err(error)?,
            BuildInput::Passage(text) => b.set_passage(&text).map_err(error)?,
            BuildInput::Choice(letter, text) => b.set_choice(letter, &text).map_err(error)?,
            BuildInput::Answer(text) => b.set_answer(&text).map_err(error)?,
            BuildInput::Show => self.show(),
            BuildInput::Save(path) => self.save(path).map_err(|e| format!("{e:#}"))?,
            BuildInput::Help => self.say(HELP.to_string()),
        }
        Ok(())
    }

    fn say(&mut self, message: String) {
        if let Err(e) = writeln!(self.out, "{message}") {
            tracing::warn!("failed to write output: {e}");
        }
    }

    fn show(&mut self) {
        self.builder.commit();
        let mut text = String::new();
        let selected_section = self.builder.selected_section();
        let selected_item = self.builder.selected_item();
        for (i, section) in self.builder.sections().iter().enumerate() {
            let marker = if selected_section == Some(i) { ">" } else { " " };
            let time = section
                .time_minutes
                .map(|m| format!("{m} min"))
                .unwrap_or_else(|| "untimed".to_string());
            text.push_str(&format!("{marker} {}. {} ({time})\n", i + 1, section.name));
            for (j, item) in section.items.iter().enumerate() {
                let marker = if selected_section == Some(i) && selected_item == Some(j) {
                    ">"
                } else {
                    " "
                };
                let ans = if item.ans.is_empty() { "-" } else { item.ans.as_str() };
                text.push_str(&format!(
                    "    {marker} {}. {} [{} choices, ans {ans}]\n",
                    j + 1,
                    item.q,
                    item.choices.len()
                ));
            }
        }
        if text.is_empty() {
            text.push_str("(empty document)\n");
        }
        self.say(text.trim_end().to_string());
    }

    fn save(&mut self, path: Option<PathBuf>) -> Result<()> {
        let document = self.builder.export();
        for w in parser::validate_document(&document) {
            self.say(format!(
                "warning: {}: {}",
                w.section.as_deref().unwrap_or("exam"),
                w.message
            ));
        }
        let json = parser::to_json(&document)?;

        let target = path.or_else(|| self.output.clone());
        let (persister, name) = match &target {
            Some(path) => {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| EXAM_EXPORT_NAME.to_string());
                (DirectoryPersister::new(dir).with_fallback(&self.fallback), name)
            }
            None => (
                DirectoryPersister::new(&self.fallback),
                EXAM_EXPORT_NAME.to_string(),
            ),
        };

        let written = persister.persist(&name, json.as_bytes())?;
        tracing::info!("exam saved to {}", written.display());
        self.say(format!("Saved {}", written.display()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_host(input: &str, output: Option<PathBuf>, fallback: &Path) -> String {
        let mut out = Vec::new();
        {
            let mut host = BuildHost {
                builder: DocumentBuilder::new(),
                output,
                fallback: fallback.to_path_buf(),
                out: &mut out,
            };
            host.run(input.as_bytes()).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parse_builder_commands() {
        assert_eq!(parse_line("section 2"), Ok(BuildInput::Section(1)));
        assert!(parse_line("item 0").is_err());
        assert_eq!(
            parse_line("choice b  Paris "),
            Ok(BuildInput::Choice(Letter::B, "Paris".into()))
        );
        assert!(parse_line("choice E x").is_err());
        assert_eq!(
            parse_line("passage one\\ntwo"),
            Ok(BuildInput::Passage("one\ntwo".into()))
        );
        assert_eq!(parse_line("save"), Ok(BuildInput::Save(None)));
        assert_eq!(
            parse_line("name   Reading Comprehension"),
            Ok(BuildInput::Name("Reading Comprehension".into()))
        );
    }

    #[test]
    fn builds_and_saves_document() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exam.json");
        let script = "add-section\nname Geography\ntime 10\nadd-item\nq Capital of France?\n\
                      choice A Berlin\nchoice B Paris\nans b\nsave\nquit\n";
        let out = run_host(script, Some(target.clone()), &dir.path().join("fallback"));
        assert!(out.contains("Saved"));

        let document = parser::load_document(&target).unwrap();
        let section = &document.sections[0];
        assert_eq!(section.name, "Geography");
        assert_eq!(section.time_minutes, Some(10));
        assert_eq!(section.items[0].choices, vec!["Berlin", "Paris"]);
        assert_eq!(section.items[0].ans, "B");
    }

    #[test]
    fn save_without_destination_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("data");
        run_host("add-section\nsave\n", None, &fallback);
        let document = parser::load_document(&fallback.join(EXAM_EXPORT_NAME)).unwrap();
        assert_eq!(document.sections[0].name, "Untitled");
        assert_eq!(document.sections[0].time_minutes, None);
    }

    #[test]
    fn errors_are_reported_inline() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_host("add-item\nq orphan\nsection 3\nbogus\n", None, dir.path());
        assert!(out.contains("! no section selected"));
        assert!(out.contains("! unknown command: bogus"));
    }
}
