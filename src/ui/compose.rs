use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap};

use crate::compose::Composer;

/// Bottom panel for writing a post, comment, story or message.
///
/// The draft shows a block cursor; tag suggestions appear under it.
pub struct ComposePanel<'a> {
    pub composer: &'a Composer,
    pub max_chars: usize,
}

impl<'a> ComposePanel<'a> {
    pub fn new(composer: &'a Composer, max_chars: usize) -> Self {
        Self {
            composer,
            max_chars,
        }
    }

    pub fn height(&self) -> u16 {
        let suggestions = self.composer.suggestions().len().min(5) as u16;
        6 + suggestions
    }
}

/// Split the draft at the cursor, with the character under it (if any).
fn split_at_cursor(text: &str, cursor: usize) -> (&str, Option<char>, &str) {
    let byte = text
        .char_indices()
        .nth(cursor)
        .map_or(text.len(), |(i, _)| i);
    let (before, rest) = text.split_at(byte);
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) => (before, Some(c), chars.as_str()),
        None => (before, None, ""),
    }
}

impl Widget for ComposePanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let len = self.composer.text().chars().count();
        let count_style = if len > self.max_chars {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" New {} ", self.composer.target().label()))
            .title_bottom(
                Line::from(Span::styled(format!(" {len}/{} ", self.max_chars), count_style))
                    .right_aligned(),
            )
            .title_bottom(" Enter send  Tab complete  Esc cancel ")
            .title_style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .border_style(Style::default().fg(Color::Green));
        let inner = block.inner(area);
        block.render(area, buf);

        let suggestions = self.composer.suggestions();
        let [draft_area, tags_area, suggestions_area] = Layout::vertical([
            Constraint::Min(2),
            Constraint::Length(1),
            Constraint::Length(suggestions.len().min(5) as u16),
        ])
        .areas(inner);

        let (before, under, after) = split_at_cursor(self.composer.text(), self.composer.cursor());
        let cursor_style = Style::default().fg(Color::Black).bg(Color::White);
        let mut spans = vec![Span::raw(before)];
        match under {
            Some(c) if c != '\n' => spans.push(Span::styled(c.to_string(), cursor_style)),
            _ => spans.push(Span::styled(" ", cursor_style)),
        }
        spans.push(Span::raw(after));
        Paragraph::new(Line::from(spans))
            .wrap(Wrap { trim: false })
            .render(draft_area, buf);

        let tags = self.composer.tags();
        if !tags.is_empty() {
            let joined = tags.into_iter().collect::<Vec<_>>().join(" ");
            buf.set_string(
                tags_area.x,
                tags_area.y,
                format!("tags: {joined}"),
                Style::default().fg(Color::Cyan),
            );
        }

        for (i, tag) in suggestions.iter().take(5).enumerate() {
            let y = suggestions_area.y + i as u16;
            let selected = i == self.composer.selected();
            let style = if selected {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::Cyan)
            };
            let line = Line::from(vec![
                Span::styled(format!(" #{} ", tag.name), style),
                Span::styled(
                    format!(" {} uses", tag.usage_count),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            buf.set_line(suggestions_area.x, y, &line, suggestions_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::split_at_cursor;

    #[test]
    fn splits_on_char_boundaries() {
        assert_eq!(split_at_cursor("مرحبا", 2), ("مر", Some('ح'), "با"));
        assert_eq!(split_at_cursor("hi", 2), ("hi", None, ""));
        assert_eq!(split_at_cursor("", 0), ("", None, ""));
    }
}
