//! Exam session state machine.
//!
//! The session is a plain value: [`Session::handle`] consumes it together
//! with a [`Command`] and the current tick, and returns the next session
//! plus the [`Effect`]s the host should carry out (notices, report
//! persistence). Refused commands leave the state untouched and surface as
//! [`Effect::Rejected`].
//!
//! Progress (`answers`, `locked`) is keyed by section name. Reloading a
//! document keeps progress for names that still exist and drops the rest.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::model::{Answers, ExamDocument, Item, Letter, Mode, Section};
use crate::scoring::{self, Results};

/// Suggested file name for the text report.
pub const TEXT_REPORT_NAME: &str = "testify_results.txt";

/// Suggested file name for the structured results export.
pub const RESULTS_EXPORT_NAME: &str = "testify_results.json";

/// Which screen the session is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Nothing opened yet (or the previous session was exited).
    #[default]
    Home,
    /// Section picker.
    Lobby,
    /// Answering items in one section.
    Section,
    /// Final scores.
    Results,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Home => write!(f, "home"),
            Screen::Lobby => write!(f, "lobby"),
            Screen::Section => write!(f, "section"),
            Screen::Results => write!(f, "results"),
        }
    }
}

/// An input event for the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the document and go to the lobby.
    Load(Box<ExamDocument>),
    /// Home or Results to Lobby. From a section this behaves like
    /// [`Command::ReturnToLobby`].
    OpenLobby,
    /// Change mode. Refused while a section is active.
    SetMode(Mode),
    /// Start (or resume) the section at this index.
    StartSection(usize),
    NextItem,
    PrevItem,
    /// Record a choice for the current item, replacing any earlier one.
    Select(Letter),
    /// Practice mode only: jump to the following section.
    SkipSection,
    /// Practice mode only: leave the section for the lobby.
    ReturnToLobby,
    /// Score every section and show results.
    Finish,
    /// Lobby to Results, when results exist.
    ViewResults,
    /// Ask the host to persist the text report.
    SaveTextReport,
    /// Ask the host to persist the structured results.
    ExportResults,
    /// Advance the section timer to the stamped time.
    Tick,
    /// Exit the session and unload the document.
    GoHome,
}

impl Command {
    fn label(&self) -> &'static str {
        match self {
            Command::Load(_) => "load",
            Command::OpenLobby => "lobby",
            Command::SetMode(_) => "mode",
            Command::StartSection(_) => "start",
            Command::NextItem => "next",
            Command::PrevItem => "prev",
            Command::Select(_) => "select",
            Command::SkipSection => "skip",
            Command::ReturnToLobby => "lobby",
            Command::Finish => "submit",
            Command::ViewResults => "results",
            Command::SaveTextReport => "save",
            Command::ExportResults => "export",
            Command::Tick => "tick",
            Command::GoHome => "home",
        }
    }
}

/// Output format the host should persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Something the host should do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A short message for the test-taker.
    Notice(String),
    /// The command was refused; nothing changed.
    Rejected(Rejection),
    /// A section timed out in exam mode and can no longer be entered.
    Locked { section: String },
    /// Results were computed and the session is on the results screen.
    Finished,
    /// Persist the current results in `format` under a suggested name.
    Persist {
        format: ReportFormat,
        suggested_name: &'static str,
    },
}

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("`{command}` is not available on the {screen} screen")]
    WrongScreen {
        command: &'static str,
        screen: Screen,
    },
    #[error("no exam with sections is loaded")]
    NothingToStart,
    #[error("there is no section {}", .0 + 1)]
    NoSuchSection(usize),
    #[error("section '{0}' is locked")]
    SectionLocked(String),
    #[error("`{0}` is not allowed in exam mode")]
    ExamMode(&'static str),
    #[error("already at the first item")]
    FirstItem,
    #[error("already at the last item")]
    LastItem,
    #[error("this section has no items")]
    NoItems,
    #[error("choice {0} is not offered for this item")]
    NoSuchChoice(Letter),
    #[error("there is no next section")]
    NoNextSection,
    #[error("time has run out for this section")]
    TimeExpired,
    #[error("no results yet")]
    NoResults,
}

/// Countdown for the active section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timer {
    left_ms: u64,
    last_tick_ms: u64,
}

/// One row of the section lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyEntry {
    pub index: usize,
    pub name: String,
    pub time_minutes: Option<u32>,
    pub item_count: usize,
    pub answered: usize,
    /// Only reported in exam mode, where locks are enforced.
    pub locked: bool,
}

/// The result of handling one command.
#[derive(Debug, Clone)]
pub struct Step {
    pub session: Session,
    pub effects: Vec<Effect>,
}

impl Step {
    pub fn into_parts(self) -> (Session, Vec<Effect>) {
        (self.session, self.effects)
    }

    /// The rejection reason, if the command was refused.
    pub fn rejection(&self) -> Option<&Rejection> {
        self.effects.iter().find_map(|e| match e {
            Effect::Rejected(r) => Some(r),
            _ => None,
        })
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection().is_some()
    }
}

/// Exam progress: document, mode, navigation cursor, timer, and answers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    document: Option<ExamDocument>,
    mode: Mode,
    screen: Screen,
    answers: Answers,
    locked: HashMap<String, bool>,
    section: usize,
    item: usize,
    timer: Option<Timer>,
    results: Option<Results>,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Handle one command stamped with the current tick.
    #[must_use]
    pub fn handle(mut self, command: Command, now_ms: u64) -> Step {
        let mut effects = Vec::new();
        let label = command.label();
        if let Err(rejection) = self.apply(command, now_ms, &mut effects) {
            tracing::debug!("rejected `{label}` on {} screen: {rejection}", self.screen);
            effects.push(Effect::Rejected(rejection));
        }
        Step {
            session: self,
            effects,
        }
    }

    fn apply(
        &mut self,
        command: Command,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) -> Result<(), Rejection> {
        match command {
            Command::Load(document) => {
                self.load(*document, effects);
                Ok(())
            }
            Command::OpenLobby => self.open_lobby(),
            Command::SetMode(mode) => self.set_mode(mode, effects),
            Command::StartSection(index) => self.start_section(index, now_ms),
            Command::NextItem => self.next_item(),
            Command::PrevItem => self.prev_item(),
            Command::Select(letter) => self.select(letter),
            Command::SkipSection => self.skip_section(now_ms),
            Command::ReturnToLobby => self.return_to_lobby(),
            Command::Finish => {
                self.require(Screen::Section, "submit")?;
                self.finish(effects);
                Ok(())
            }
            Command::ViewResults => {
                self.require(Screen::Lobby, "results")?;
                if self.results.is_none() {
                    return Err(Rejection::NoResults);
                }
                self.screen = Screen::Results;
                Ok(())
            }
            Command::SaveTextReport => self.persist(ReportFormat::Text, effects),
            Command::ExportResults => self.persist(ReportFormat::Json, effects),
            Command::Tick => {
                self.tick(now_ms, effects);
                Ok(())
            }
            Command::GoHome => self.go_home(),
        }
    }

    fn require(&self, screen: Screen, command: &'static str) -> Result<(), Rejection> {
        if self.screen == screen {
            Ok(())
        } else {
            Err(Rejection::WrongScreen {
                command,
                screen: self.screen,
            })
        }
    }

    fn load(&mut self, document: ExamDocument, effects: &mut Vec<Effect>) {
        let keep = |name: &String| document.sections.iter().any(|s| &s.name == name);
        self.answers.retain(|name, _| keep(name));
        self.locked.retain(|name, _| keep(name));

        tracing::info!("loaded exam with {} sections", document.sections.len());
        effects.push(Effect::Notice(format!(
            "Loaded exam: {} section(s)",
            document.sections.len()
        )));

        self.document = Some(document);
        self.screen = Screen::Lobby;
        self.results = None;
        self.timer = None;
        self.section = 0;
        self.item = 0;
    }

    fn open_lobby(&mut self) -> Result<(), Rejection> {
        match self.screen {
            Screen::Home => {
                if !self.document.as_ref().is_some_and(ExamDocument::is_startable) {
                    return Err(Rejection::NothingToStart);
                }
            }
            Screen::Section => return self.return_to_lobby(),
            Screen::Lobby | Screen::Results => {}
        }
        self.screen = Screen::Lobby;
        Ok(())
    }

    fn set_mode(&mut self, mode: Mode, effects: &mut Vec<Effect>) -> Result<(), Rejection> {
        if self.screen == Screen::Section {
            return Err(Rejection::WrongScreen {
                command: "mode",
                screen: self.screen,
            });
        }
        if self.mode != mode {
            tracing::info!("mode changed: {} -> {mode}", self.mode);
            self.mode = mode;
            effects.push(Effect::Notice(format!("Mode: {mode}")));
        }
        Ok(())
    }

    fn start_section(&mut self, index: usize, now_ms: u64) -> Result<(), Rejection> {
        self.require(Screen::Lobby, "start")?;
        let document = self.document.as_ref().ok_or(Rejection::NothingToStart)?;
        let section = document
            .sections
            .get(index)
            .ok_or(Rejection::NoSuchSection(index))?;

        match self.mode {
            Mode::Exam => {
                if self.is_locked(&section.name) {
                    return Err(Rejection::SectionLocked(section.name.clone()));
                }
            }
            Mode::Practice => {}
        }

        self.enter_section(index, now_ms);
        Ok(())
    }

    /// Section entry: allocate answer slots and lock flag on first visit,
    /// reset the cursor, and restart the timer.
    fn enter_section(&mut self, index: usize, now_ms: u64) {
        let Some(section) = self.document.as_ref().and_then(|d| d.sections.get(index)) else {
            return;
        };
        let name = section.name.clone();
        let item_count = section.items.len();
        let limit_ms = section.time_limit_ms();

        let slots = self
            .answers
            .entry(name.clone())
            .or_insert_with(|| vec![None; item_count]);
        // Same-named sections share slots; never drop answers here
        if slots.len() < item_count {
            slots.resize(item_count, None);
        }
        self.locked.entry(name.clone()).or_insert(false);

        self.section = index;
        self.item = 0;
        self.timer = limit_ms.map(|left_ms| Timer {
            left_ms,
            last_tick_ms: now_ms,
        });
        self.screen = Screen::Section;
        tracing::debug!("entered section {} '{name}' ({limit_ms:?} ms)", index + 1);
    }

    fn next_item(&mut self) -> Result<(), Rejection> {
        self.require(Screen::Section, "next")?;
        let count = self.current_section().map_or(0, |s| s.items.len());
        if self.item + 1 >= count {
            return Err(Rejection::LastItem);
        }
        self.item += 1;
        Ok(())
    }

    fn prev_item(&mut self) -> Result<(), Rejection> {
        self.require(Screen::Section, "prev")?;
        if self.item == 0 {
            return Err(Rejection::FirstItem);
        }
        self.item -= 1;
        Ok(())
    }

    fn select(&mut self, letter: Letter) -> Result<(), Rejection> {
        self.require(Screen::Section, "select")?;
        let item = self.current_item().ok_or(Rejection::NoItems)?;
        if item.choice(letter).is_none() {
            return Err(Rejection::NoSuchChoice(letter));
        }
        let Some(name) = self.current_section().map(|s| s.name.clone()) else {
            return Err(Rejection::NoItems);
        };

        let slots = self.answers.entry(name).or_default();
        if slots.len() <= self.item {
            slots.resize(self.item + 1, None);
        }
        slots[self.item] = Some(letter);
        Ok(())
    }

    fn skip_section(&mut self, now_ms: u64) -> Result<(), Rejection> {
        self.require(Screen::Section, "skip")?;
        match self.mode {
            Mode::Exam => return Err(Rejection::ExamMode("skip")),
            Mode::Practice => {}
        }
        if !self.has_next_section() {
            return Err(Rejection::NoNextSection);
        }
        if self.timer.is_some_and(|t| t.left_ms == 0) {
            return Err(Rejection::TimeExpired);
        }
        self.enter_section(self.section + 1, now_ms);
        Ok(())
    }

    fn return_to_lobby(&mut self) -> Result<(), Rejection> {
        self.require(Screen::Section, "lobby")?;
        match self.mode {
            Mode::Exam => Err(Rejection::ExamMode("lobby")),
            Mode::Practice => {
                self.timer = None;
                self.screen = Screen::Lobby;
                Ok(())
            }
        }
    }

    /// Score the whole document, not just the active section.
    fn finish(&mut self, effects: &mut Vec<Effect>) {
        let Some(document) = self.document.as_ref() else {
            return;
        };
        let results = scoring::score(document, &self.answers);
        tracing::info!(
            "exam finished: {}/{} correct",
            results.overall.correct,
            results.overall.total
        );
        self.results = Some(results);
        self.timer = None;
        self.screen = Screen::Results;
        effects.push(Effect::Finished);
    }

    fn persist(&self, format: ReportFormat, effects: &mut Vec<Effect>) -> Result<(), Rejection> {
        let command = match format {
            ReportFormat::Text => "save",
            ReportFormat::Json => "export",
        };
        self.require(Screen::Results, command)?;
        if self.results.is_none() {
            return Err(Rejection::NoResults);
        }
        let suggested_name = match format {
            ReportFormat::Text => TEXT_REPORT_NAME,
            ReportFormat::Json => RESULTS_EXPORT_NAME,
        };
        effects.push(Effect::Persist {
            format,
            suggested_name,
        });
        Ok(())
    }

    fn go_home(&mut self) -> Result<(), Rejection> {
        match self.screen {
            Screen::Section => Err(Rejection::WrongScreen {
                command: "home",
                screen: self.screen,
            }),
            Screen::Home => Ok(()),
            Screen::Lobby | Screen::Results => {
                tracing::info!("session closed");
                *self = Session::new(self.mode);
                Ok(())
            }
        }
    }

    /// Measure wall-clock delta since the last tick and count down.
    fn tick(&mut self, now_ms: u64, effects: &mut Vec<Effect>) {
        if self.screen != Screen::Section {
            return;
        }
        let Some(timer) = self.timer.as_mut() else {
            return;
        };

        let delta = now_ms.saturating_sub(timer.last_tick_ms);
        timer.last_tick_ms = now_ms;
        if delta > timer.left_ms {
            tracing::trace!("timer underflow by {} ms, clamped", delta - timer.left_ms);
        }
        timer.left_ms = timer.left_ms.saturating_sub(delta);
        if timer.left_ms > 0 {
            return;
        }

        match self.mode {
            Mode::Exam => self.expire(now_ms, effects),
            Mode::Practice => {}
        }
    }

    /// Exam-mode timeout: lock the section, then advance to the next one or finish.
    fn expire(&mut self, now_ms: u64, effects: &mut Vec<Effect>) {
        let Some(name) = self.current_section().map(|s| s.name.clone()) else {
            return;
        };
        // An auto-advance can land in a section that is already locked
        if !self.is_locked(&name) {
            self.locked.insert(name.clone(), true);
            tracing::info!("time expired, section '{name}' locked");
            effects.push(Effect::Locked { section: name });
        }

        if self.has_next_section() {
            effects.push(Effect::Notice("Time's up — advancing…".into()));
            self.enter_section(self.section + 1, now_ms);
        } else {
            effects.push(Effect::Notice("Time's up — exam finished".into()));
            self.finish(effects);
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn document(&self) -> Option<&ExamDocument> {
        self.document.as_ref()
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    /// Recorded answers for one section, if it has been entered.
    pub fn section_answers(&self, name: &str) -> Option<&[Option<Letter>]> {
        self.answers.get(name).map(Vec::as_slice)
    }

    /// Whether the named section has timed out under exam mode.
    pub fn is_locked(&self, name: &str) -> bool {
        self.locked.get(name).copied().unwrap_or(false)
    }

    pub fn results(&self) -> Option<&Results> {
        self.results.as_ref()
    }

    /// Index of the active section, while one is active.
    pub fn section_index(&self) -> Option<usize> {
        (self.screen == Screen::Section).then_some(self.section)
    }

    /// Index of the current item, while a section is active.
    pub fn item_index(&self) -> Option<usize> {
        (self.screen == Screen::Section).then_some(self.item)
    }

    pub fn current_section(&self) -> Option<&Section> {
        let index = self.section_index()?;
        self.document.as_ref()?.sections.get(index)
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.current_section()?.items.get(self.item)
    }

    /// The letter recorded for the current item.
    pub fn selected(&self) -> Option<Letter> {
        let name = &self.current_section()?.name;
        self.answers.get(name)?.get(self.item).copied().flatten()
    }

    /// Remaining time for the active section; `None` if untimed.
    pub fn time_left_ms(&self) -> Option<u64> {
        if self.screen != Screen::Section {
            return None;
        }
        self.timer.map(|t| t.left_ms)
    }

    pub fn has_next_section(&self) -> bool {
        self.section_index().is_some_and(|i| {
            self.document
                .as_ref()
                .is_some_and(|d| i + 1 < d.sections.len())
        })
    }

    /// Whether [`Command::SkipSection`] would currently be accepted.
    pub fn can_skip(&self) -> bool {
        match self.mode {
            Mode::Exam => false,
            Mode::Practice => {
                self.has_next_section() && self.timer.map_or(true, |t| t.left_ms > 0)
            }
        }
    }

    /// Sections as shown in the lobby.
    pub fn lobby(&self) -> Vec<LobbyEntry> {
        let Some(document) = self.document.as_ref() else {
            return Vec::new();
        };
        document
            .sections
            .iter()
            .enumerate()
            .map(|(index, s)| LobbyEntry {
                index,
                name: s.name.clone(),
                time_minutes: s.time_minutes,
                item_count: s.items.len(),
                answered: self
                    .answers
                    .get(&s.name)
                    .map_or(0, |a| a.iter().take(s.items.len()).flatten().count()),
                locked: match self.mode {
                    Mode::Exam => self.is_locked(&s.name),
                    Mode::Practice => false,
                },
            })
            .collect()
    }
}
