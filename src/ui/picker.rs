use kwiz::{source::SourceLocation, subject::SubjectConfig};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::App;

fn source_label(subject: &SubjectConfig) -> &'static str {
    match subject.location() {
        SourceLocation::Http(_) => "online",
        SourceLocation::File(_) => "file",
        SourceLocation::Bundled(_) => "offline",
    }
}

/// Pure presenter for one subject row
pub fn present_row(subject: &SubjectConfig, highlighted: bool, open: bool) -> Row<'static> {
    let marker = if open { "•" } else { " " };
    let row = Row::new(vec![
        Cell::from(marker),
        Cell::from(subject.title.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(subject.key.clone()),
        Cell::from(source_label(subject)).style(Style::default().fg(Color::DarkGray)),
    ]);

    if highlighted {
        row.style(Style::default().fg(Color::Black).bg(Color::Cyan))
    } else {
        row
    }
}

pub fn render_subject_picker(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    let open = app.slot.subject();
    let rows = app
        .catalog
        .iter()
        .enumerate()
        .map(|(i, subject)| {
            let is_open = open.is_some_and(|key| key.eq_ignore_ascii_case(&subject.key));
            present_row(subject, i == app.picker_index, is_open)
        })
        .collect::<Vec<_>>();

    // keep the highlighted row visible
    let visible = chunks[0].height.saturating_sub(3) as usize;
    let skip = app.picker_index.saturating_sub(visible.saturating_sub(1));

    let table = Table::new(
        rows.into_iter().skip(skip),
        [
            Constraint::Length(2),
            Constraint::Min(20),
            Constraint::Length(14),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["", "Subject", "Key", "Source"])
            .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)),
    )
    .block(Block::default().borders(Borders::ALL).title("Subjects"));
    f.render_widget(table, chunks[0]);

    let legend = Paragraph::new("(↑↓) move / (enter) open / (esc) back")
        .style(Style::default().add_modifier(Modifier::ITALIC))
        .alignment(Alignment::Center);
    f.render_widget(legend, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_label_by_location() {
        assert_eq!(source_label(&SubjectConfig::new("a", "A", "https://x.test/a.json")), "online");
        assert_eq!(source_label(&SubjectConfig::new("b", "B", "bundled:math")), "offline");
        assert_eq!(source_label(&SubjectConfig::new("c", "C", "/tmp/c.json")), "file");
    }

    #[test]
    fn test_present_row_highlight() {
        let subject = SubjectConfig::new("math", "Maths", "bundled:math");
        let plain = present_row(&subject, false, false);
        let highlighted = present_row(&subject, true, true);
        assert_ne!(plain, highlighted);
    }
}
