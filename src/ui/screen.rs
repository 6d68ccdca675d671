use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{ui::picker::render_subject_picker, App, AppState};

const KEYS: [(&str, &str); 12] = [
    ("1 2 ... 12", "choose an answer, (enter) confirms a number that could go on"),
    ("enter / c", "check the answer and show the explanation"),
    ("p", "add or undo the points for this question"),
    ("↑↓ / k j", "previous or next question"),
    ("pgup / pgdn", "scroll a long explanation"),
    ("o", "open a link from the explanation, then its number"),
    ("m", "show the question's location on a map"),
    ("g", "look up the question's concept"),
    ("s", "switch subject"),
    ("r", "reload the subject"),
    ("?", "this help"),
    ("esc / q", "quit"),
];

/// A UI Screen boundary
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Quiz screen, drawn by the App widget
pub struct QuizScreen;

impl Screen for QuizScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

pub struct SubjectPickerScreen;

impl Screen for SubjectPickerScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_subject_picker(app, f);
    }
}

pub struct HelpScreen;

impl Screen for HelpScreen {
    fn render(&self, _app: &App, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(2)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        let width = KEYS.iter().map(|(k, _)| k.width()).max().unwrap_or(0);
        let lines = KEYS
            .iter()
            .map(|(key, what)| {
                Line::from(vec![
                    Span::styled(
                        format!("{}{key}  ", " ".repeat(width - key.width())),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(*what),
                ])
            })
            .collect::<Vec<_>>();

        let help = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Keys"));
        f.render_widget(help, chunks[0]);

        let legend = Paragraph::new(Span::styled(
            "press any key to return",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        f.render_widget(legend, chunks[1]);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Quiz => Box::new(QuizScreen),
        AppState::SubjectPicker => Box::new(SubjectPickerScreen),
        AppState::Help => Box::new(HelpScreen),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwiz::{config::Config, sound::Silent, subject::SubjectCatalog};
    use ratatui::{backend::TestBackend, Terminal};
    use std::rc::Rc;

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 24)).unwrap();
        terminal
            .draw(|f| current_screen(&app.state).render(app, f))
            .unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_help_screen_lists_keys() {
        let mut app = App::new(&Config::default(), SubjectCatalog::builtin(), Rc::new(Silent));
        app.state = AppState::Help;
        let screen = draw(&app);
        assert!(screen.contains("Keys"));
        assert!(screen.contains("switch subject"));
        assert!(screen.contains("press any key to return"));
    }

    #[test]
    fn test_picker_screen_is_selected_by_state() {
        let mut app = App::new(&Config::default(), SubjectCatalog::builtin(), Rc::new(Silent));
        app.state = AppState::SubjectPicker;
        assert!(draw(&app).contains("Geography Challenge"));

        app.state = AppState::Quiz;
        assert!(draw(&app).contains("choose a subject"));
    }
}
