use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthChar;

use crate::app::{App, AppMode};
use crate::event::ViewKind;
use crate::interaction::reactions::{Category, ReactionKind};

/// Bottom status bar: mode, current view, unread count, status messages.
pub struct StatusBar<'a> {
    pub app: &'a App,
}

impl<'a> StatusBar<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

pub fn view_name(app: &App) -> String {
    match app.current_view() {
        Some(ViewKind::Feed) => format!("Feed: {}", app.feed.tab.label()),
        Some(ViewKind::Explore) => "Explore".to_string(),
        Some(ViewKind::Post(_)) => "Post".to_string(),
        Some(ViewKind::Profile(name)) => format!("@{name}"),
        Some(ViewKind::Search) if app.search_query.is_empty() => "Search".to_string(),
        Some(ViewKind::Search) => format!("Search: {}", app.search_query),
        Some(ViewKind::Notifications) => "Notifications".to_string(),
        Some(ViewKind::Messages) => "Messages".to_string(),
        Some(ViewKind::Conversation(_)) => app
            .conversation
            .as_ref()
            .map_or_else(|| "Conversation".to_string(), |t| format!("DM @{}", t.partner.username)),
        Some(ViewKind::Stories) => "Stories".to_string(),
        Some(ViewKind::Help) => "Help".to_string(),
        None => "agoratui".to_string(),
    }
}

/// Hint shown while waiting for a reaction key.
fn reaction_hint() -> String {
    ReactionKind::ALL
        .iter()
        .enumerate()
        .map(|(i, k)| format!("{}:{}", i + 1, k.emoji()))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let bg_style = Style::default().bg(Color::DarkGray).fg(Color::White);
        for x in area.x..area.x + area.width {
            buf[(x, area.y)].set_style(bg_style);
        }

        let mut spans = Vec::new();

        let (mode_str, mode_color) = match self.app.mode {
            AppMode::Normal => (" NORMAL ", Color::Blue),
            AppMode::Command => (" COMMAND ", Color::Magenta),
            AppMode::Search => (" SEARCH ", Color::Yellow),
            AppMode::Compose => (" COMPOSE ", Color::Green),
            AppMode::React => (" REACT ", Color::Red),
        };
        spans.push(Span::styled(
            mode_str,
            Style::default()
                .bg(mode_color)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));

        if self.app.mode == AppMode::React {
            spans.push(Span::styled(reaction_hint(), bg_style));
        } else {
            spans.push(Span::styled(view_name(self.app), bg_style));
        }

        if self.app.unread_count > 0 {
            spans.push(Span::styled(
                format!(" \u{1F514}{}", self.app.unread_count),
                Style::default().bg(Color::DarkGray).fg(Color::Yellow),
            ));
        }
        if self.app.my_id.is_none() {
            spans.push(Span::styled(
                " [guest]",
                Style::default().bg(Color::DarkGray).fg(Color::Gray),
            ));
        }
        if self.app.loading {
            spans.push(Span::styled(
                " [loading...]",
                Style::default().bg(Color::DarkGray).fg(Color::Yellow),
            ));
        }

        // Status message (right-aligned), cut on a char boundary.
        if let Some(ref msg) = self.app.status_message {
            let left_width: usize = spans.iter().map(|s| s.width()).sum();
            let room = (area.width as usize).saturating_sub(left_width + 1);
            let mut shown = String::new();
            let mut shown_width = 0;
            for c in msg.chars() {
                let w = c.width().unwrap_or(0);
                if shown_width + w > room {
                    break;
                }
                shown_width += w;
                shown.push(c);
            }
            let padding = (area.width as usize).saturating_sub(left_width + shown_width);
            if padding > 0 {
                spans.push(Span::styled(" ".repeat(padding), bg_style));
            }
            spans.push(Span::styled(
                shown,
                Style::default().bg(Color::DarkGray).fg(Color::Red),
            ));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::reaction_hint;

    #[test]
    fn hint_numbers_every_reaction() {
        let hint = reaction_hint();
        assert!(hint.starts_with("1:\u{1F44D}"));
        assert_eq!(hint.split(' ').count(), 6);
    }
}
