pub mod picker;
pub mod screen;

use kwiz::{
    loader::LoadState,
    markdown::{render_markdown, render_plain},
    question::Question,
    session::{QuizSession, ScoringStrategy},
    subject::SubjectConfig,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 4;
const VERTICAL_MARGIN: u16 = 1;
const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Length(1), // padding
                Constraint::Min(1),    // body
                Constraint::Length(1), // padding
                Constraint::Length(1), // status or legend
            ])
            .split(area);

        self.render_header(chunks[0], buf);

        let title = self.subject().map_or("", |s| s.title.as_str());
        match self.slot.state() {
            LoadState::Idle => {
                centered(vec![Line::styled("Press (s) to choose a subject", italic())])
                    .render(chunks[2], buf);
            }
            LoadState::Loading { .. } => {
                let spinner = SPINNER[self.ticks % SPINNER.len()];
                centered(vec![Line::styled(
                    format!("Loading {title} {spinner}"),
                    bold().fg(Color::Yellow),
                )])
                .render(chunks[2], buf);
            }
            LoadState::Failed { error, kind } => {
                centered(vec![
                    Line::styled(kind.to_string(), bold().fg(Color::Red)),
                    Line::default(),
                    Line::styled(error.to_string(), dim()),
                    Line::default(),
                    Line::styled("(r)etry / (s)ubjects / (esc)ape", italic()),
                ])
                .render(chunks[2], buf);
            }
            LoadState::Ready(session) if session.is_empty() => {
                centered(vec![
                    Line::styled(format!("No questions available for {title}."), bold()),
                    Line::default(),
                    Line::styled("(r)eload / (s)ubjects / (esc)ape", italic()),
                ])
                .render(chunks[2], buf);
            }
            LoadState::Ready(session) => {
                let lines = match (session.question(self.cursor), self.subject()) {
                    (Some(question), Some(subject)) => {
                        self.question_card(session, question, subject)
                    }
                    _ => Vec::new(),
                };
                Paragraph::new(lines)
                    .wrap(Wrap { trim: false })
                    .scroll((self.scroll, 0))
                    .render(chunks[2], buf);
            }
        }

        let footer = match &self.status {
            Some(status) => Span::styled(status.clone(), Style::default().fg(Color::Yellow)),
            None => Span::styled(self.legend(), italic()),
        };
        Paragraph::new(footer).render(chunks[4], buf);
    }
}

impl App {
    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let title = self
            .subject()
            .map_or_else(|| "kwiz".to_string(), |s| s.title.clone());
        Paragraph::new(Span::styled(title, bold().fg(Color::Cyan))).render(area, buf);

        if let Some(session) = self.slot.state().session() {
            let score = format!(
                "{} / {} pts   {}/{} answered",
                session.total_points(),
                session.max_points(),
                session.answered_count(),
                session.len()
            );
            Paragraph::new(Span::styled(score, bold()))
                .alignment(Alignment::Right)
                .render(area, buf);
        }
    }

    fn legend(&self) -> String {
        match self.slot.state().session() {
            Some(session) if !session.is_empty() => {
                let points = match session.options().scoring {
                    ScoringStrategy::SelfReported => " / (p)oints",
                    ScoringStrategy::AutoGraded => "",
                };
                format!("(#) answer / (enter) check{points} / (↑↓) move / (s)ubjects / (?) help / (esc)ape")
            }
            _ => "(s)ubjects / (?) help / (esc)ape".to_string(),
        }
    }

    fn question_card(
        &self,
        session: &QuizSession,
        question: &Question,
        subject: &SubjectConfig,
    ) -> Vec<Line<'static>> {
        let index = self.cursor;
        let selected = session.selected_option(index);
        let revealed = session.is_explanation_visible(index);

        let mut lines = vec![Line::styled(
            format!("Question {} of {}", index + 1, session.len()),
            dim().add_modifier(Modifier::BOLD),
        )];

        if let Some(concept) = question.concept() {
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", subject.concept_label), dim()),
                Span::styled(concept.to_string(), bold().fg(Color::Magenta)),
            ]));
            if let Some(summary) = question.concept_summary() {
                lines.push(Line::styled(summary.to_string(), italic()));
            }
        }

        lines.push(Line::default());
        lines.push(Line::styled(question.prompt().to_string(), bold()));
        lines.push(Line::default());

        for (i, option) in question.options().iter().enumerate() {
            let marker = if selected == Some(i) { "(•)" } else { "( )" };
            let style = match (revealed, selected == Some(i)) {
                (true, _) if question.is_correct_option(i) => bold().fg(Color::Green),
                (true, true) => bold().fg(Color::Red),
                (false, true) => bold().fg(Color::Cyan),
                _ => Style::default(),
            };
            lines.push(Line::styled(format!("{marker} {}. {option}", i + 1), style));
        }
        lines.push(Line::default());

        if !revealed {
            let hint = if selected.is_some() {
                "(enter) check your answer".to_string()
            } else {
                format!("pick an answer with 1-{}", question.option_count())
            };
            lines.push(Line::styled(hint, italic()));
        } else {
            lines.push(verdict_line(session, index));
            lines.push(Line::default());
            lines.push(Line::styled(
                "Explanation",
                bold().add_modifier(Modifier::UNDERLINED),
            ));

            let explanation = if subject.hints.markdown {
                render_markdown(question.explanation())
            } else {
                render_plain(question.explanation())
            };
            lines.extend(explanation.lines);
            match explanation.links.len() {
                0 => {}
                1 => lines.push(Line::styled("(o) open link", italic())),
                n => lines.push(Line::styled(format!("(o) then 1-{n} open a link"), italic())),
            }

            lines.extend(extra_lines(question, subject));
        }

        if let Some(next) = self.next_hint.filter(|n| *n != index) {
            lines.push(Line::default());
            lines.push(Line::styled(
                format!("Next up: question {} (↓)", next + 1),
                dim(),
            ));
        }

        lines
    }
}

fn verdict_line(session: &QuizSession, index: usize) -> Line<'static> {
    let points = session.options().points_per_question;
    match session.options().scoring {
        ScoringStrategy::AutoGraded => match session.is_correct(index) {
            Some(true) => Line::styled(format!("Correct! +{points}"), bold().fg(Color::Green)),
            Some(false) => Line::styled("Not quite right. Try again!", bold().fg(Color::Red)),
            None => Line::styled("Pick an answer to be graded", italic()),
        },
        ScoringStrategy::SelfReported if session.is_score_awarded(index) => Line::from(vec![
            Span::styled(format!("+{points} points added. "), bold().fg(Color::Green)),
            Span::styled("(p) undo", italic()),
        ]),
        ScoringStrategy::SelfReported => Line::from(vec![
            Span::styled("Did you get it right? ", bold()),
            Span::styled(format!("(p) add {points} points"), italic()),
        ]),
    }
}

fn extra_lines(question: &Question, subject: &SubjectConfig) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if subject.hints.experiment_callout {
        let callouts = [
            ("Think about it: ", question.extra("ponderingThought")),
            ("Try it: ", question.extra("experiment")),
        ];
        for (label, text) in callouts {
            if let Some(text) = text {
                lines.push(Line::default());
                lines.push(Line::from(vec![
                    Span::styled(label, bold().fg(Color::Yellow)),
                    Span::raw(text.to_string()),
                ]));
            }
        }
    }

    if subject.hints.map_lookup {
        if let Some(location) = question.extra("location") {
            lines.push(Line::default());
            lines.push(Line::from(vec![
                Span::styled("Location: ", bold()),
                Span::raw(location.to_string()),
                Span::styled("  (m) show on map", italic()),
            ]));
        }
    }

    if subject.hints.concept_lookup {
        if let Some(concept) = question.concept() {
            lines.push(Line::default());
            lines.push(Line::styled(format!("(g) look up \"{concept}\""), italic()));
        }
    }

    lines
}

fn centered(lines: Vec<Line<'static>>) -> Paragraph<'static> {
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
}
