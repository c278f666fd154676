//! The `testify take` command.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;

use testify_core::clock::Clock;
use testify_core::model::{Letter, Mode};
use testify_core::parser;
use testify_core::session::{Command, Effect, Screen, Session};
use testify_report::{persist_results, DirectoryPersister};

use crate::config::{load_config_from, TestifyConfig};

const HELP: &str = "\
Commands:
  start N          start or resume section N (lobby)
  a | b | c | d    answer the current item
  next | prev      move between items
  skip             jump to the next section (practice)
  lobby            back to the section lobby (practice)
  submit           finish the exam and score it
  results          show results from the lobby
  save | export    write the text report / JSON results
  mode exam|practice
  load FILE        load another exam
  home             close the exam
  status           show the current screen
  quit";

pub fn execute(
    exam: PathBuf,
    mode: Option<Mode>,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let document = parser::load_document(&exam)?;
    for w in parser::validate_document(&document) {
        tracing::warn!("{}: {}", w.section.as_deref().unwrap_or("exam"), w.message);
    }

    let persister = DirectoryPersister::new(output.unwrap_or_else(|| config.output_dir()))
        .with_fallback(config.fallback_dir());
    let mode = mode.unwrap_or(config.mode);

    let stdout = io::stdout();
    let mut host = TakeHost::new(mode, Clock::system(), persister, config, stdout.lock());
    host.send(Command::Load(Box::new(document)))?;
    host.run(io::stdin().lock())
}

/// A parsed input line.
#[derive(Debug, PartialEq)]
enum Input {
    Nothing,
    Command(Command),
    Load(PathBuf),
    Status,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(w, r)| (w, r.trim()))
        .unwrap_or((line, ""));

    let command = match word.to_lowercase().as_str() {
        "" => return Ok(Input::Nothing),
        "a" | "b" | "c" | "d" => Command::Select(word.parse::<Letter>()?),
        "start" => {
            let n: usize = rest
                .parse()
                .ok()
                .filter(|&n| n > 0)
                .ok_or("usage: start <section number>")?;
            Command::StartSection(n - 1)
        }
        "next" => Command::NextItem,
        "prev" => Command::PrevItem,
        "skip" => Command::SkipSection,
        "lobby" => Command::OpenLobby,
        "submit" | "finish" => Command::Finish,
        "results" => Command::ViewResults,
        "save" => Command::SaveTextReport,
        "export" => Command::ExportResults,
        "home" => Command::GoHome,
        "mode" => Command::SetMode(rest.parse::<Mode>()?),
        "load" if rest.is_empty() => return Err("usage: load <file>".into()),
        "load" => return Ok(Input::Load(PathBuf::from(rest))),
        "status" => return Ok(Input::Status),
        "help" | "?" => return Ok(Input::Help),
        "quit" | "exit" => return Ok(Input::Quit),
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Input::Command(command))
}

/// Terminal host: feeds input lines to the session and carries out effects.
struct TakeHost<W> {
    session: Session,
    clock: Clock,
    persister: DirectoryPersister,
    config: TestifyConfig,
    out: W,
}

type ViewKey = (Screen, Option<usize>, Option<usize>, Option<Letter>, Mode);

impl<W: Write> TakeHost<W> {
    fn new(
        mode: Mode,
        clock: Clock,
        persister: DirectoryPersister,
        config: TestifyConfig,
        out: W,
    ) -> Self {
        Self {
            session: Session::new(mode),
            clock,
            persister,
            config,
            out,
        }
    }

    fn run(&mut self, input: impl BufRead) -> Result<()> {
        self.render()?;
        for line in input.lines() {
            let line = line.context("failed to read input")?;
            let before = self.view_key();
            self.send(Command::Tick)?;

            let mut force = false;
            match parse_input(&line) {
                Ok(Input::Nothing) => {}
                Ok(Input::Command(command)) => {
                    self.send(command)?;
                }
                Ok(Input::Load(path)) => match parser::load_document(&path) {
                    Ok(document) => {
                        self.send(Command::Load(Box::new(document)))?;
                        force = true;
                    }
                    Err(e) => writeln!(self.out, "! {e:#}")?,
                },
                Ok(Input::Status) => force = true,
                Ok(Input::Help) => writeln!(self.out, "{HELP}")?,
                Ok(Input::Quit) => break,
                Err(message) => writeln!(self.out, "! {message}")?,
            }

            if force || self.view_key() != before {
                self.render()?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn view_key(&self) -> ViewKey {
        (
            self.session.screen(),
            self.session.section_index(),
            self.session.item_index(),
            self.session.selected(),
            self.session.mode(),
        )
    }

    /// Dispatch one command stamped with the current tick.
    fn send(&mut self, command: Command) -> Result<()> {
        let session = std::mem::take(&mut self.session);
        let (session, effects) = session.handle(command, self.clock.now_ms()).into_parts();
        self.session = session;
        for effect in effects {
            self.apply(effect)?;
        }
        Ok(())
    }

    fn apply(&mut self, effect: Effect) -> Result<()> {
        match effect {
            Effect::Notice(message) => writeln!(self.out, "{message}")?,
            Effect::Rejected(rejection) => writeln!(self.out, "! {rejection}")?,
            Effect::Locked { section } => writeln!(self.out, "Section '{section}' is now locked.")?,
            Effect::Finished => tracing::debug!("session finished"),
            Effect::Persist {
                format,
                suggested_name,
            } => {
                let Some(results) = self.session.results() else {
                    return Ok(());
                };
                let outcome = persist_results(
                    &self.persister,
                    format,
                    suggested_name,
                    results,
                    self.session.mode(),
                    Local::now(),
                );
                match outcome {
                    Ok(path) => writeln!(self.out, "Saved {}", path.display())?,
                    Err(e) => writeln!(self.out, "! could not save report: {e:#}")?,
                }
            }
        }
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        match self.session.screen() {
            Screen::Home => writeln!(self.out, "No exam loaded. Use `load <file>`.")?,
            Screen::Lobby => self.render_lobby()?,
            Screen::Section => self.render_item()?,
            Screen::Results => {
                if let Some(results) = self.session.results() {
                    let table = super::summary_table(results, &self.config);
                    writeln!(self.out, "Results\n{table}")?;
                }
            }
        }
        Ok(())
    }

    fn render_lobby(&mut self) -> Result<()> {
        writeln!(self.out, "Section lobby ({} mode)", self.session.mode())?;
        for entry in self.session.lobby() {
            let time = entry
                .time_minutes
                .map(|m| format!("{m} min"))
                .unwrap_or_else(|| "untimed".to_string());
            writeln!(
                self.out,
                "  {}. {} [{}/{} answered, {}]{}",
                entry.index + 1,
                entry.name,
                entry.answered,
                entry.item_count,
                time,
                if entry.locked { " LOCKED" } else { "" }
            )?;
        }
        if self.session.results().is_some() {
            writeln!(self.out, "Type `results` to see your last score.")?;
        }
        Ok(())
    }

    fn render_item(&mut self) -> Result<()> {
        let Some(section) = self.session.current_section() else {
            return Ok(());
        };
        let position = self.session.item_index().unwrap_or(0);
        let clock = self
            .session
            .time_left_ms()
            .map(|ms| format!("  time left {}", format_clock(ms)))
            .unwrap_or_default();

        let Some(item) = self.session.current_item() else {
            writeln!(self.out, "== {} (no items) =={clock}", section.name)?;
            return Ok(());
        };
        writeln!(
            self.out,
            "== {} ({}/{}) =={clock}",
            section.name,
            position + 1,
            section.items.len()
        )?;
        if !item.passage.trim().is_empty() {
            writeln!(self.out, "Passage: {}", item.passage.trim())?;
        }
        writeln!(self.out, "Q: {}", item.q)?;
        let selected = self.session.selected();
        for (letter, choice) in item.letters().zip(&item.choices) {
            let marker = if selected == Some(letter) { "  *" } else { "" };
            writeln!(self.out, "  {letter}) {choice}{marker}")?;
        }
        Ok(())
    }
}

/// `mm:ss`, rounding partial seconds up.
fn format_clock(ms: u64) -> String {
    let secs = ms.div_ceil(1000);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use testify_core::model::{ExamDocument, Item, Section};

    fn document() -> ExamDocument {
        ExamDocument {
            sections: vec![Section {
                name: "Quant".into(),
                time_minutes: Some(2),
                items: vec![
                    Item {
                        q: "2+2?".into(),
                        passage: String::new(),
                        choices: vec!["4".into(), "5".into()],
                        ans: "A".into(),
                    },
                    Item {
                        q: "3+3?".into(),
                        passage: "Arithmetic".into(),
                        choices: vec!["5".into(), "6".into()],
                        ans: "B".into(),
                    },
                ],
            }],
        }
    }

    fn run_host(input: &str, dir: &std::path::Path) -> String {
        let mut out = Vec::new();
        {
            let mut host = TakeHost::new(
                Mode::Exam,
                Clock::manual(0),
                DirectoryPersister::new(dir),
                TestifyConfig::default(),
                &mut out,
            );
            host.send(Command::Load(Box::new(document()))).unwrap();
            host.run(input.as_bytes()).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parse_commands() {
        assert_eq!(parse_input("  "), Ok(Input::Nothing));
        assert_eq!(
            parse_input("B"),
            Ok(Input::Command(Command::Select(Letter::B)))
        );
        assert_eq!(
            parse_input("start 2"),
            Ok(Input::Command(Command::StartSection(1)))
        );
        assert!(parse_input("start 0").is_err());
        assert!(parse_input("start x").is_err());
        assert_eq!(
            parse_input("mode practice"),
            Ok(Input::Command(Command::SetMode(Mode::Practice)))
        );
        assert!(parse_input("mode turbo").is_err());
        assert_eq!(
            parse_input("load exams/other.json"),
            Ok(Input::Load(PathBuf::from("exams/other.json")))
        );
        assert!(parse_input("load").is_err());
        assert!(parse_input("frobnicate").is_err());
        assert_eq!(parse_input("quit"), Ok(Input::Quit));
    }

    #[test]
    fn format_clock_rounds_up() {
        assert_eq!(format_clock(120_000), "02:00");
        assert_eq!(format_clock(59_001), "01:00");
        assert_eq!(format_clock(1), "00:01");
        assert_eq!(format_clock(0), "00:00");
    }

    #[test]
    fn full_session_over_text() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_host("start 1\na\nnext\na\nsubmit\nsave\nquit\n", dir.path());

        assert!(out.contains("Section lobby (exam mode)"));
        assert!(out.contains("== Quant (1/2) ==  time left 02:00"));
        assert!(out.contains("Passage: Arithmetic"));
        assert!(out.contains("  A) 4  *"));
        assert!(out.contains("OVERALL"));
        assert!(out.contains("Saved"));

        let report = std::fs::read_to_string(dir.path().join("testify_results.txt")).unwrap();
        assert!(report.contains("Quant: 1/2 (50.0%)"));
    }

    #[test]
    fn rejections_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_host("skip\nstart 9\nstart 1\nprev\nlobby\n", dir.path());
        assert!(out.contains("! `skip` is not available on the lobby screen"));
        assert!(out.contains("! there is no section 9"));
        assert!(out.contains("! already at the first item"));
        assert!(out.contains("! `lobby` is not allowed in exam mode"));
    }

    #[test]
    fn bad_load_keeps_current_exam() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_host("load /nonexistent/exam.json\nstatus\n", dir.path());
        assert!(out.contains("! failed to read exam file"));
        assert!(out.contains("1. Quant"));
    }
}
