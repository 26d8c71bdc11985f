use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget, Wrap};

use crate::app::App;
use crate::ui::post::format_time_ago;
use crate::ui::post_list::{RowList, view_block};

/// List of the user's conversations.
pub struct ConversationsView<'a> {
    pub app: &'a App,
}

impl<'a> ConversationsView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for ConversationsView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = self
            .app
            .conversations
            .iter()
            .map(|entry| {
                let mut spans = match entry.partner.as_ref() {
                    Some(p) => vec![
                        Span::styled(
                            p.display_name().to_owned(),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(format!(" @{}", p.username), Style::default().fg(Color::DarkGray)),
                    ],
                    None => vec![Span::styled("unknown", Style::default().fg(Color::DarkGray))],
                };
                if let Some(created_at) = entry.conversation.created_at {
                    spans.push(Span::styled(
                        format!(" \u{00B7} since {}", format_time_ago(created_at)),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                Line::from(spans)
            })
            .collect();
        RowList::new("Messages (:dm @user to start)", rows)
            .selected(Some(self.app.selected_index()))
            .empty(if self.app.loading { "Loading..." } else { "No conversations" })
            .render(area, buf);
    }
}

/// One conversation: the partner's messages on the left, the user's on the
/// right, newest at the bottom.
pub struct ConversationView<'a> {
    pub app: &'a App,
}

impl<'a> ConversationView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for ConversationView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(thread) = self.app.conversation.as_ref() else {
            let block = view_block("Conversation");
            let inner = block.inner(area);
            block.render(area, buf);
            buf.set_string(inner.x + 1, inner.y, "Loading...", Style::default().fg(Color::DarkGray));
            return;
        };

        let block = view_block(&format!(
            "{} @{} (c to reply)",
            thread.partner.display_name(),
            thread.partner.username
        ));
        let inner = block.inner(area);
        block.render(area, buf);

        if thread.messages.is_empty() {
            buf.set_string(inner.x + 1, inner.y, "Say hello", Style::default().fg(Color::DarkGray));
            return;
        }

        let me = self.app.my_id.as_deref();
        let lines: Vec<Line<'_>> = thread
            .messages
            .iter()
            .map(|m| {
                let mine = Some(m.sender_id.as_str()) == me;
                let style = if mine {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default()
                };
                let age = m.created_at.map(format_time_ago).unwrap_or_default();
                let line = Line::from(vec![
                    Span::styled(m.content.as_str(), style),
                    Span::styled(format!("  {age}"), Style::default().fg(Color::DarkGray)),
                ]);
                if mine {
                    line.alignment(Alignment::Right)
                } else {
                    line
                }
            })
            .collect();

        // Pin the newest message to the bottom.
        let overflow = (lines.len() as u16).saturating_sub(inner.height);
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((overflow, 0))
            .render(inner, buf);
    }
}
