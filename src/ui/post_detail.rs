use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;

use crate::api::types::PostDetail;
use crate::app::App;
use crate::ui::post::{PostCard, format_time_ago, post_card_height, styled_content, wrap_text};
use crate::ui::post_list::view_block;

/// A post at the top with its comments below, oldest first.
pub struct PostDetailView<'a> {
    pub detail: Option<&'a PostDetail>,
    pub selected_index: usize,
    pub app: &'a App,
}

impl<'a> PostDetailView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self {
            detail: app.post_detail.as_ref(),
            selected_index: app.selected_index(),
            app,
        }
    }
}

impl Widget for PostDetailView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = view_block("Post");
        let inner = block.inner(area);
        block.render(area, buf);

        let Some(detail) = self.detail else {
            buf.set_string(inner.x + 1, inner.y, "Loading...", Style::default().fg(Color::DarkGray));
            return;
        };

        let content_width = inner.width.saturating_sub(1);
        let bottom = inner.y + inner.height;
        let mut y = inner.y;

        let root_h = post_card_height(&detail.post, content_width).min(bottom.saturating_sub(y));
        if root_h > 0 {
            PostCard::new(&detail.post, self.app.engagement(&detail.post))
                .render(Rect::new(inner.x + 1, y, content_width, root_h), buf);
            y += root_h;
        }

        if y < bottom {
            let sep = "\u{2550}".repeat(content_width as usize);
            buf.set_string(inner.x + 1, y, &sep, Style::default().fg(Color::Cyan));
            y += 1;
        }

        if detail.comments.is_empty() {
            if y < bottom {
                buf.set_string(inner.x + 2, y, "No comments yet (c to comment)", Style::default().fg(Color::DarkGray));
            }
            return;
        }

        // Keep the selected comment on screen, assuming ~3 lines per comment.
        let visible = (bottom.saturating_sub(y) / 3).max(1) as usize;
        let skip = self.selected_index.saturating_sub(visible - 1);

        for (i, comment) in detail.comments.iter().enumerate().skip(skip) {
            if y >= bottom {
                break;
            }
            let selected = i == self.selected_index;
            let name_style = if selected {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            let mut header = vec![
                Span::styled("\u{2502} ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    comment
                        .profiles
                        .as_ref()
                        .map_or_else(|| "unknown".to_owned(), |a| format!("@{}", a.username)),
                    name_style,
                ),
            ];
            if let Some(created_at) = comment.created_at {
                header.push(Span::styled(
                    format!(" \u{00B7} {}", format_time_ago(created_at)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            buf.set_line(inner.x + 1, y, &Line::from(header), content_width);
            y += 1;

            for line in wrap_text(&comment.content, content_width.saturating_sub(2) as usize) {
                if y >= bottom {
                    break;
                }
                buf.set_string(inner.x + 1, y, "\u{2502}", Style::default().fg(Color::DarkGray));
                buf.set_line(inner.x + 3, y, &styled_content(&line), content_width.saturating_sub(2));
                y += 1;
            }
        }
    }
}
