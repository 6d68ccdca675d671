mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use kwiz::{
    config::{Config, ConfigStore, FileConfigStore},
    loader::{LoadOutcome, LoadTicket, Loader, SubjectSlot},
    logging,
    markdown::render_markdown,
    question::Question,
    runtime::{CrosstermEventSource, FixedTicker, QuizEvent, Runner},
    session::{RevealMode, ScoringStrategy, MAX_POINTS_PER_QUESTION},
    sound::{Silent, SoundPort, TerminalBell},
    source::{DefaultSource, SourceLocation},
    subject::{concept_lookup_url, map_lookup_url, SubjectCatalog, SubjectConfig},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin, Write},
    path::PathBuf,
    rc::Rc,
    sync::Arc,
    time::Duration,
};
use unicode_width::UnicodeWidthStr;
use webbrowser::Browser;

const TICK_RATE_MS: u64 = 100;
const SCROLL_STEP: u16 = 5;
/// Key of the subject built from `--source`
const CUSTOM_SUBJECT: &str = "custom";

/// sleek multiple-choice quiz tui
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A sleek multiple-choice quiz TUI. Pick a subject, answer questions, check the explanation and keep score."
)]
pub struct Cli {
    /// subject to open (see --list-subjects)
    #[clap(short = 's', long)]
    subject: Option<String>,

    /// ad-hoc question bank: an http(s) URL, a file path or bundled:<name>
    #[clap(long, value_name = "LOCATION")]
    source: Option<String>,

    /// how points are awarded
    #[clap(long, value_enum)]
    scoring: Option<ScoringStrategy>,

    /// when explanations are revealed
    #[clap(long, value_enum)]
    reveal: Option<RevealMode>,

    /// do not allow changing an answer after its explanation is shown
    #[clap(long)]
    lock_after_reveal: bool,

    /// points awarded per correct question
    #[clap(long, value_parser = clap::value_parser!(u32).range(1..=MAX_POINTS_PER_QUESTION as i64))]
    points: Option<u32>,

    /// do not append a timestamp to question bank URLs
    #[clap(long)]
    no_cache_bust: bool,

    /// disable feedback sounds
    #[clap(long)]
    mute: bool,

    /// print the available subjects and exit
    #[clap(long)]
    list_subjects: bool,

    /// load a question bank, report what was found and exit
    #[clap(long, value_name = "LOCATION")]
    validate: Option<String>,

    /// use this config file instead of the default location
    #[clap(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// log debug output to the log file
    #[clap(short, long)]
    verbose: bool,
}

impl Cli {
    /// Layer command line flags over the stored config
    fn apply_to(&self, config: &mut Config) {
        if let Some(scoring) = self.scoring {
            config.scoring = scoring;
        }
        if let Some(reveal) = self.reveal {
            config.reveal = reveal;
        }
        if let Some(points) = self.points {
            config.points_per_question = points;
        }
        if self.lock_after_reveal {
            config.lock_after_reveal = true;
        }
        if self.no_cache_bust {
            config.cache_bust = false;
        }
        if self.mute {
            config.sound = false;
        }
    }

    fn catalog(&self, config: &Config) -> SubjectCatalog {
        let mut catalog = config.catalog();
        if let Some(source) = &self.source {
            catalog.upsert(SubjectConfig::new(CUSTOM_SUBJECT, "Custom Quiz", source));
        }
        catalog
    }

    fn start_subject(&self, config: &Config, catalog: &SubjectCatalog) -> Option<String> {
        if self.source.is_some() {
            return Some(CUSTOM_SUBJECT.to_string());
        }
        self.subject
            .as_deref()
            .and_then(|key| catalog.get(key))
            .map(|s| s.key.clone())
            .or_else(|| config.start_subject(catalog))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Quiz,
    SubjectPicker,
    Help,
}

/// A load the event loop should start on a background thread
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub location: SourceLocation,
}

/// Side effects requested by key handling
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    None,
    Quit,
    Load(LoadRequest),
    Open(String),
}

/// What a typed number picks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryTarget {
    Option,
    Link,
}

/// Digits typed so far toward a number in `1..=max`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberEntry {
    pub target: EntryTarget,
    pub value: usize,
    pub max: usize,
}

pub struct App {
    pub catalog: SubjectCatalog,
    pub slot: SubjectSlot,
    pub state: AppState,
    /// Focused question
    pub cursor: usize,
    /// Vertical scroll inside the focused question card
    pub scroll: u16,
    pub picker_index: usize,
    /// Question suggested after the last selection
    pub next_hint: Option<usize>,
    pub status: Option<String>,
    /// Unfinished multi-digit number
    pub entry: Option<NumberEntry>,
    pub ticks: usize,
}

impl App {
    pub fn new(config: &Config, catalog: SubjectCatalog, sound: Rc<dyn SoundPort>) -> Self {
        Self {
            catalog,
            slot: SubjectSlot::new(config.session_options(), sound),
            state: AppState::Quiz,
            cursor: 0,
            scroll: 0,
            picker_index: 0,
            next_hint: None,
            status: None,
            entry: None,
            ticks: 0,
        }
    }

    pub fn subject(&self) -> Option<&SubjectConfig> {
        self.slot.subject().and_then(|key| self.catalog.get(key))
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.slot
            .state()
            .session()
            .and_then(|s| s.question(self.cursor))
    }

    pub fn open_subject(&mut self, key: &str) -> Action {
        let Some(subject) = self.catalog.get(key).cloned() else {
            self.status = Some(format!("unknown subject `{key}`"));
            return Action::None;
        };

        let ticket = self.slot.begin(&subject.key);
        self.entry = None;
        self.cursor = 0;
        self.scroll = 0;
        self.next_hint = None;
        self.state = AppState::Quiz;
        Action::Load(LoadRequest {
            ticket,
            location: subject.location(),
        })
    }

    pub fn reload(&mut self) -> Action {
        match self.slot.subject().map(str::to_string) {
            Some(key) => self.open_subject(&key),
            None => Action::None,
        }
    }

    pub fn on_loaded(&mut self, outcome: LoadOutcome) {
        if self.slot.complete(outcome) {
            self.cursor = 0;
            self.scroll = 0;
            self.next_hint = None;
        }
    }

    pub fn on_tick(&mut self) -> bool {
        if self.slot.state().is_loading() {
            self.ticks = self.ticks.wrapping_add(1);
            return true;
        }
        false
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }
        self.status = None;

        match self.state {
            AppState::Quiz => self.on_quiz_key(key),
            AppState::SubjectPicker => self.on_picker_key(key),
            AppState::Help => {
                self.state = AppState::Quiz;
                Action::None
            }
        }
    }

    fn on_quiz_key(&mut self, key: KeyEvent) -> Action {
        if let Some(entry) = self.entry.take() {
            match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    return self.enter_digit(entry, c as usize - '0' as usize)
                }
                KeyCode::Enter if entry.value > 0 => return self.finish_entry(entry.target, entry.value),
                KeyCode::Esc | KeyCode::Backspace => return Action::None,
                // anything else abandons the number and is handled as usual
                _ => {}
            }
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('?') => {
                self.state = AppState::Help;
                Action::None
            }
            KeyCode::Char('s') => {
                self.picker_index = self
                    .slot
                    .subject()
                    .and_then(|key| self.catalog.position(key))
                    .unwrap_or(0);
                self.state = AppState::SubjectPicker;
                Action::None
            }
            KeyCode::Char('r') => self.reload(),
            KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => {
                self.focus(self.cursor.saturating_sub(1));
                Action::None
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                self.focus(self.cursor + 1);
                Action::None
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(SCROLL_STEP);
                Action::None
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(SCROLL_STEP);
                Action::None
            }
            KeyCode::Char(c) if c.is_ascii_digit() => match self.current_question() {
                Some(question) => {
                    let entry = NumberEntry {
                        target: EntryTarget::Option,
                        value: 0,
                        max: question.option_count(),
                    };
                    self.enter_digit(entry, c as usize - '0' as usize)
                }
                None => Action::None,
            },
            KeyCode::Enter | KeyCode::Char('c') => {
                self.check();
                Action::None
            }
            KeyCode::Char('p') => {
                self.toggle_points();
                Action::None
            }
            KeyCode::Char('o') => self.open_link(),
            KeyCode::Char('m') => self.map_lookup(),
            KeyCode::Char('g') => self.concept_lookup(),
            _ => Action::None,
        }
    }

    fn on_picker_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc | KeyCode::Char('s') | KeyCode::Char('q') => {
                self.state = AppState::Quiz;
                Action::None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.picker_index = self.picker_index.saturating_sub(1);
                Action::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.picker_index + 1 < self.catalog.len() {
                    self.picker_index += 1;
                }
                Action::None
            }
            KeyCode::Enter => match self.catalog.by_index(self.picker_index) {
                Some(subject) => {
                    let key = subject.key.clone();
                    self.open_subject(&key)
                }
                None => Action::None,
            },
            _ => Action::None,
        }
    }

    /// Extend `entry` by one digit. The number is used as soon as no further
    /// digit could keep it in range; otherwise it waits for more or Enter.
    fn enter_digit(&mut self, entry: NumberEntry, digit: usize) -> Action {
        let value = entry.value * 10 + digit;
        if value == 0 || value > entry.max {
            self.status = Some(match entry.target {
                EntryTarget::Option => format!("no option {value}"),
                EntryTarget::Link => format!("no link [{value}]"),
            });
            return Action::None;
        }
        if value * 10 > entry.max {
            return self.finish_entry(entry.target, value);
        }

        self.entry = Some(NumberEntry { value, ..entry });
        self.status = Some(format!("{value}_  more digits or (enter)"));
        Action::None
    }

    fn finish_entry(&mut self, target: EntryTarget, value: usize) -> Action {
        match target {
            EntryTarget::Option => {
                self.select(value - 1);
                Action::None
            }
            EntryTarget::Link => match self.revealed_links().into_iter().nth(value - 1) {
                Some(url) => Action::Open(url),
                None => {
                    self.status = Some(format!("no link [{value}]"));
                    Action::None
                }
            },
        }
    }

    fn focus(&mut self, question: usize) {
        let len = self.slot.state().session().map_or(0, |s| s.len());
        let target = question.min(len.saturating_sub(1));
        if target != self.cursor {
            self.cursor = target;
            self.scroll = 0;
        }
        if self.next_hint == Some(self.cursor) {
            self.next_hint = None;
        }
    }

    fn select(&mut self, option: usize) {
        let cursor = self.cursor;
        let Some(session) = self.slot.state_mut().session_mut() else {
            return;
        };
        match session.select_option(cursor, option) {
            Ok(selection) => self.next_hint = selection.advance_to,
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn check(&mut self) {
        let cursor = self.cursor;
        let Some(session) = self.slot.state_mut().session_mut() else {
            return;
        };
        if session.selected_option(cursor).is_none() {
            self.status = Some("pick an answer first".to_string());
            return;
        }
        if let Err(err) = session.reveal_explanation(cursor) {
            self.status = Some(err.to_string());
        }
    }

    fn toggle_points(&mut self) {
        let cursor = self.cursor;
        let Some(session) = self.slot.state_mut().session_mut() else {
            return;
        };
        if !session.is_explanation_visible(cursor) {
            self.status = Some("check your answer before claiming points".to_string());
            return;
        }
        if let Err(err) = session.toggle_score(cursor) {
            self.status = Some(err.to_string());
        }
    }

    fn revealed_question(&self) -> Option<&Question> {
        let session = self.slot.state().session()?;
        if !session.is_explanation_visible(self.cursor) {
            return None;
        }
        self.current_question()
    }

    fn revealed_links(&self) -> Vec<String> {
        self.revealed_question()
            .filter(|_| self.subject().is_some_and(|s| s.hints.markdown))
            .map(|q| render_markdown(q.explanation()).links)
            .unwrap_or_default()
    }

    fn open_link(&mut self) -> Action {
        let mut links = self.revealed_links();
        match links.len() {
            0 => {
                self.status = Some("no link to open".to_string());
                Action::None
            }
            1 => Action::Open(links.remove(0)),
            count => {
                self.entry = Some(NumberEntry {
                    target: EntryTarget::Link,
                    value: 0,
                    max: count,
                });
                self.status = Some(format!("open which link? (1-{count})"));
                Action::None
            }
        }
    }

    fn map_lookup(&mut self) -> Action {
        let enabled = self.subject().is_some_and(|s| s.hints.map_lookup);
        let url = self
            .revealed_question()
            .filter(|_| enabled)
            .and_then(|q| q.extra("location"))
            .and_then(map_lookup_url);
        match url {
            Some(url) => Action::Open(url),
            None => {
                self.status = Some("no location to show".to_string());
                Action::None
            }
        }
    }

    fn concept_lookup(&mut self) -> Action {
        let enabled = self.subject().is_some_and(|s| s.hints.concept_lookup);
        let url = self
            .revealed_question()
            .filter(|_| enabled)
            .and_then(|q| q.concept())
            .and_then(concept_lookup_url);
        match url {
            Some(url) => Action::Open(url),
            None => {
                self.status = Some("no concept to look up".to_string());
                Action::None
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let store = cli
        .config
        .as_ref()
        .map(FileConfigStore::with_path)
        .unwrap_or_default();
    let mut config = store.load();
    cli.apply_to(&mut config);

    if let Err(err) = logging::init(cli.verbose) {
        eprintln!("logging disabled: {err}");
    }

    let catalog = cli.catalog(&config);

    if cli.list_subjects {
        print_subjects(&catalog, &mut io::stdout())?;
        return Ok(());
    }

    if let Some(location) = &cli.validate {
        let ok = validate_source(location, &config, &mut io::stdout())?;
        if !ok {
            std::process::exit(1);
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let Some(start) = cli.start_subject(&config, &catalog) else {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::InvalidValue, "no subjects configured").exit();
    };

    let loader = Loader::new(
        Arc::new(DefaultSource::new(config.cache_bust)?),
        config.retry_policy(),
    );
    let sound: Rc<dyn SoundPort> = if config.sound {
        Rc::new(TerminalBell)
    } else {
        Rc::new(Silent)
    };
    let mut app = App::new(&config, catalog, sound);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &loader, &start);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Some(key) = app.slot.subject().filter(|k| *k != CUSTOM_SUBJECT) {
        config.last_subject = Some(key.to_string());
        if let Err(err) = store.save(&config) {
            tracing::warn!(%err, "could not remember last subject");
        }
    }

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    loader: &Loader,
    start: &str,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    if let Action::Load(request) = app.open_subject(start) {
        loader.spawn(request.ticket, request.location, runner.sender());
    }
    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            QuizEvent::Tick => {
                if app.on_tick() {
                    terminal.draw(|f| ui(app, f))?;
                }
            }
            QuizEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            QuizEvent::Loaded(outcome) => {
                app.on_loaded(outcome);
                terminal.draw(|f| ui(app, f))?;
            }
            QuizEvent::Key(key) => {
                match app.handle_key(key) {
                    Action::Quit => break,
                    Action::Load(request) => {
                        loader.spawn(request.ticket, request.location, runner.sender());
                    }
                    Action::Open(url) => open_in_browser(app, &url),
                    Action::None => {}
                }
                terminal.draw(|f| ui(app, f))?;
            }
        }
    }

    Ok(())
}

fn open_in_browser(app: &mut App, url: &str) {
    if !Browser::is_available() {
        app.status = Some(format!("no browser available, visit {url}"));
        return;
    }
    if let Err(err) = webbrowser::open(url) {
        tracing::warn!(url, %err, "could not open browser");
        app.status = Some(format!("could not open {url}"));
    }
}

fn print_subjects<W: Write>(catalog: &SubjectCatalog, out: &mut W) -> io::Result<()> {
    let key_width = catalog.iter().map(|s| s.key.width()).max().unwrap_or(0);
    let title_width = catalog.iter().map(|s| s.title.width()).max().unwrap_or(0);
    for subject in catalog.iter() {
        let pad = |text: &str, width: usize| format!("{text}{}", " ".repeat(width - text.width()));
        writeln!(
            out,
            "{}  {}  {}",
            pad(&subject.key, key_width),
            pad(&subject.title, title_width),
            subject.source
        )?;
    }
    Ok(())
}

/// Load a bank synchronously and describe it. Returns false on failure.
fn validate_source<W: Write>(raw: &str, config: &Config, out: &mut W) -> io::Result<bool> {
    let location = SourceLocation::parse(raw);
    let loader = match DefaultSource::new(config.cache_bust) {
        Ok(source) => Loader::new(Arc::new(source), config.retry_policy()),
        Err(err) => {
            writeln!(out, "error: {err}")?;
            return Ok(false);
        }
    };

    match loader.load_blocking(&location) {
        Ok(questions) => {
            writeln!(out, "{location}: {} questions", questions.len())?;
            for (i, q) in questions.iter().enumerate() {
                writeln!(
                    out,
                    "  {:>3}. {} [{} options, answer {}]",
                    i + 1,
                    q.prompt(),
                    q.option_count(),
                    q.correct_option_index() + 1
                )?;
            }
            Ok(true)
        }
        Err(err) => {
            writeln!(out, "{location}: {} ({err})", err.kind())?;
            Ok(false)
        }
    }
}

fn ui(app: &App, f: &mut Frame) {
    ui::screen::current_screen(&app.state).render(app, f);
}
