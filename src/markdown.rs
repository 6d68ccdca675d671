//! Explanation text rendering for the terminal.
//!
//! Markdown is flattened into styled ratatui lines. Links are underlined,
//! numbered in reading order and collected so the UI can open them.

use itertools::Itertools;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedText {
    pub lines: Vec<Line<'static>>,
    pub links: Vec<String>,
}

impl RenderedText {
    /// Lines joined without styling, mostly useful for assertions
    pub fn plain(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .join("\n")
    }
}

/// Plain text, one terminal line per source line.
pub fn render_plain(input: &str) -> RenderedText {
    RenderedText {
        lines: input
            .lines()
            .map(|l| Line::from(l.to_string()))
            .collect(),
        links: Vec::new(),
    }
}

pub fn render_markdown(input: &str) -> RenderedText {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut writer = LineWriter::default();
    for event in Parser::new_ext(input, options) {
        writer.handle(event);
    }
    writer.finish()
}

#[derive(Default)]
struct LineWriter {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    links: Vec<String>,
    // `None` for bullet lists, `Some(next number)` for ordered ones
    lists: Vec<Option<u64>>,
    in_code_block: bool,
}

impl LineWriter {
    fn style(&self) -> Style {
        self.styles
            .iter()
            .fold(Style::default(), |acc, s| acc.patch(*s))
    }

    fn push_text(&mut self, text: &str) {
        let style = self.style();
        self.current.push(Span::styled(text.to_string(), style));
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
        }
    }

    fn blank(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.in_code_block {
                    let mut parts = text.split('\n').peekable();
                    while let Some(part) = parts.next() {
                        if !part.is_empty() {
                            self.push_text(part);
                        }
                        if parts.peek().is_some() {
                            self.flush();
                        }
                    }
                } else {
                    self.push_text(&text);
                }
            }
            Event::Code(code) => {
                self.styles.push(Style::default().fg(Color::Yellow));
                self.push_text(&code);
                self.styles.pop();
            }
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.blank();
                self.lines.push(Line::from("────────"));
            }
            Event::InlineHtml(html) | Event::Html(html) => self.push_text(&html),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { level, .. } => {
                self.blank();
                let style = match level {
                    HeadingLevel::H1 | HeadingLevel::H2 => Style::default()
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                    _ => Style::default().add_modifier(Modifier::BOLD),
                };
                self.styles.push(style);
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.styles
                    .push(Style::default().add_modifier(Modifier::ITALIC).fg(Color::Gray));
                self.push_text("│ ");
            }
            Tag::CodeBlock(_) => {
                self.blank();
                self.in_code_block = true;
                self.styles.push(Style::default().fg(Color::Yellow));
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.current.push(Span::raw(format!("{}{marker}", "  ".repeat(depth))));
            }
            Tag::Emphasis => self
                .styles
                .push(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.styles.push(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self
                .styles
                .push(Style::default().add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } => {
                self.links.push(dest_url.to_string());
                self.styles.push(
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.blank(),
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.blank();
            }
            TagEnd::BlockQuote(_) => {
                self.styles.pop();
                self.blank();
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.styles.pop();
                self.blank();
            }
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                } else {
                    self.flush();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                let marker = format!(" [{}]", self.links.len());
                self.current
                    .push(Span::styled(marker, Style::default().fg(Color::DarkGray)));
            }
            _ => {}
        }
    }

    fn finish(mut self) -> RenderedText {
        self.flush();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        RenderedText {
            lines: self.lines,
            links: self.links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let rendered = render_markdown("First line\ncontinues.\n\nSecond paragraph.");
        assert_eq!(rendered.plain(), "First line continues.\n\nSecond paragraph.");
    }

    #[test]
    fn strong_text_is_bold() {
        let rendered = render_markdown("It is **56**.");
        let bold = rendered.lines[0]
            .spans
            .iter()
            .find(|s| s.content == "56")
            .unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn links_are_collected_and_numbered() {
        let rendered = render_markdown(
            "See [perimeter](https://en.wikipedia.org/wiki/Perimeter) and [area](https://en.wikipedia.org/wiki/Area).",
        );
        assert_eq!(
            rendered.links,
            vec![
                "https://en.wikipedia.org/wiki/Perimeter".to_string(),
                "https://en.wikipedia.org/wiki/Area".to_string()
            ]
        );
        assert_eq!(rendered.plain(), "See perimeter [1] and area [2].");

        let link = rendered.lines[0]
            .spans
            .iter()
            .find(|s| s.content == "perimeter")
            .unwrap();
        assert_eq!(link.style.fg, Some(Color::Blue));
        assert!(link.style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn lists_get_markers() {
        let rendered = render_markdown("- apples\n- pears\n\n1. one\n2. two");
        assert_eq!(rendered.plain(), "• apples\n• pears\n\n1. one\n2. two");
    }

    #[test]
    fn code_blocks_keep_lines() {
        let rendered = render_markdown("```\nlet x = 1;\nlet y = 2;\n```");
        assert_eq!(rendered.plain(), "let x = 1;\nlet y = 2;");
    }

    #[test]
    fn plain_rendering_keeps_line_breaks() {
        let rendered = render_plain("a\nb\n\nc");
        assert_eq!(rendered.lines.len(), 4);
        assert!(rendered.links.is_empty());
        assert_eq!(rendered.plain(), "a\nb\n\nc");
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert!(render_markdown("").lines.is_empty());
    }
}
