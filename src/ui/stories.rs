use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap};

use crate::app::{App, StoryViewer};
use crate::interaction::story::PlaybackState;
use crate::ui::post::format_time_ago;
use crate::ui::post_list::RowList;

/// One row per story owner, in playback order.
pub struct StoriesView<'a> {
    pub app: &'a App,
}

impl<'a> StoriesView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for StoriesView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let stories = &self.app.stories;
        let starts = self.app.story_owner_starts();
        let rows = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(stories.len());
                let first = &stories[start];
                let name = first
                    .profiles
                    .as_ref()
                    .map_or_else(|| first.story.owner_user_id.clone(), |a| format!("@{}", a.username));
                let newest = stories[end - 1].story.created_at;
                Line::from(vec![
                    Span::styled("\u{25CE} ", Style::default().fg(Color::Magenta)),
                    Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(
                        format!("  {} \u{00B7} {}", plural(end - start), format_time_ago(newest)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ])
            })
            .collect();

        RowList::new("Stories (Enter to watch, S to share)", rows)
            .selected(Some(self.app.selected_index()))
            .empty(if self.app.loading { "Loading..." } else { "No active stories" })
            .render(area, buf);
    }
}

fn plural(n: usize) -> String {
    if n == 1 {
        "1 story".to_string()
    } else {
        format!("{n} stories")
    }
}

/// Full-screen story player: segmented progress strip, author, content.
pub struct StoryViewerOverlay<'a> {
    pub viewer: &'a StoryViewer,
}

impl<'a> StoryViewerOverlay<'a> {
    pub fn new(viewer: &'a StoryViewer) -> Self {
        Self { viewer }
    }
}

impl Widget for StoryViewerOverlay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = 64u16.min(area.width.saturating_sub(2));
        let height = 18u16.min(area.height.saturating_sub(2));
        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        let panel = Rect::new(x, y, width, height);

        Clear.render(panel, buf);

        let paused = self.viewer.playback.state() == PlaybackState::Paused;
        let block = Block::default()
            .borders(Borders::ALL)
            .title(if paused { " Story (paused) " } else { " Story " })
            .title_bottom(Line::from(" \u{2190}/\u{2192} move  Space pause  Esc close ").centered())
            .title_style(
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            )
            .border_style(Style::default().fg(Color::Magenta));
        let inner = block.inner(panel);
        block.render(panel, buf);

        if inner.height < 3 || inner.width < 4 {
            return;
        }

        progress_strip(&self.viewer.playback.progress_bars(), Rect::new(inner.x, inner.y, inner.width, 1), buf);

        let Some(row) = self.viewer.current() else {
            return;
        };

        let author = row
            .profiles
            .as_ref()
            .map_or_else(|| row.story.owner_user_id.clone(), |a| format!("{} @{}", a.display_name(), a.username));
        buf.set_line(
            inner.x,
            inner.y + 1,
            &Line::from(vec![
                Span::styled(author, Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!(" \u{00B7} {}", format_time_ago(row.story.created_at)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            inner.width,
        );

        let mut body = Vec::new();
        if let Some(media) = row.story.media() {
            body.push(Line::from(Span::styled(
                format!("[media] {media}"),
                Style::default().fg(Color::Blue),
            )));
            body.push(Line::from(""));
        }
        if let Some(text) = row.story.text() {
            body.push(Line::from(text.to_owned()));
        }
        let body_area = Rect::new(inner.x, inner.y + 3, inner.width, inner.height.saturating_sub(3));
        Paragraph::new(body)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(body_area, buf);
    }
}

/// Split `area` into one segment per story, separated by a column, and fill
/// each by its progress.
fn progress_strip(bars: &[f64], area: Rect, buf: &mut Buffer) {
    if bars.is_empty() || area.width == 0 {
        return;
    }
    let n = bars.len() as u16;
    let gaps = n.saturating_sub(1);
    let seg = (area.width.saturating_sub(gaps) / n).max(1);

    for (i, &fill) in bars.iter().enumerate() {
        let start = area.x + i as u16 * (seg + 1);
        if start >= area.x + area.width {
            break;
        }
        let width = seg.min(area.x + area.width - start);
        let filled = (f64::from(width) * fill.clamp(0.0, 1.0)).round() as u16;
        for dx in 0..width {
            let (symbol, color) = if dx < filled {
                ("\u{2501}", Color::White)
            } else {
                ("\u{2500}", Color::DarkGray)
            };
            buf[(start + dx, area.y)].set_symbol(symbol).set_fg(color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(bars: &[f64], width: u16) -> String {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        progress_strip(bars, area, &mut buf);
        (0..width).map(|x| buf[(x, 0)].symbol().to_string()).collect()
    }

    #[test]
    fn strip_shows_done_current_and_upcoming() {
        assert_eq!(strip(&[1.0, 0.5, 0.0], 14), "━━━━ ━━── ────");
    }

    #[test]
    fn strip_with_one_story_fills_width() {
        assert_eq!(strip(&[0.25], 8), "━━──────");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1), "1 story");
        assert_eq!(plural(3), "3 stories");
    }
}
