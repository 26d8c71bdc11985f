use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Widget};

use crate::api::types::Post;
use crate::app::App;
use crate::ui::post::{PostCard, post_card_height};

pub fn view_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} "))
        .title_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .border_style(Style::default().fg(Color::DarkGray))
}

/// A scrollable list of posts with selection highlight.
///
/// Used by the feed, explore, profile and search views.
pub struct PostList<'a> {
    pub title: &'a str,
    pub posts: &'a [Post],
    /// Selected post, or `None` when the selection is elsewhere in the view.
    pub selected: Option<usize>,
    pub app: &'a App,
    pub loading: bool,
    pub bordered: bool,
}

impl<'a> PostList<'a> {
    pub fn new(title: &'a str, posts: &'a [Post], app: &'a App) -> Self {
        Self {
            title,
            posts,
            selected: Some(app.selected_index()),
            app,
            loading: false,
            bordered: true,
        }
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    pub fn selected(mut self, selected: Option<usize>) -> Self {
        self.selected = selected;
        self
    }

    pub fn bordered(mut self, bordered: bool) -> Self {
        self.bordered = bordered;
        self
    }
}

impl Widget for PostList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if self.bordered {
            let block = view_block(self.title);
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if self.posts.is_empty() {
            let msg = if self.loading {
                "Loading..."
            } else {
                "No posts to display"
            };
            buf.set_string(
                inner.x + 1,
                inner.y,
                msg,
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        let content_width = inner.width.saturating_sub(1); // 1 char left margin

        // Card heights including the separator line.
        let heights: Vec<u16> = self
            .posts
            .iter()
            .map(|p| post_card_height(p, content_width) + 1)
            .collect();

        let scroll_start =
            compute_scroll_start(&heights, self.selected.unwrap_or(0), inner.height);

        let mut y = inner.y;
        let mut idx = scroll_start;
        while idx < self.posts.len() && y < inner.y + inner.height {
            let post = &self.posts[idx];
            let remaining = inner.y + inner.height - y;
            let render_h = heights[idx].min(remaining);

            let card_area = Rect::new(inner.x + 1, y, content_width, render_h.saturating_sub(1));
            PostCard::new(post, self.app.engagement(post))
                .selected(self.selected == Some(idx))
                .render(card_area, buf);

            y += render_h;

            if y < inner.y + inner.height && idx + 1 < self.posts.len() {
                let sep = "\u{2500}".repeat(content_width as usize);
                buf.set_string(
                    inner.x + 1,
                    y.saturating_sub(1),
                    &sep,
                    Style::default().fg(Color::DarkGray),
                );
            }

            idx += 1;
        }
    }
}

/// One-line-per-item list with selection highlight, for tags, users,
/// notifications and conversations.
pub struct RowList<'a> {
    pub title: &'a str,
    pub rows: Vec<Line<'a>>,
    pub selected: Option<usize>,
    pub empty: &'a str,
    pub bordered: bool,
}

impl<'a> RowList<'a> {
    pub fn new(title: &'a str, rows: Vec<Line<'a>>) -> Self {
        Self {
            title,
            rows,
            selected: None,
            empty: "Nothing to display",
            bordered: true,
        }
    }

    pub fn selected(mut self, selected: Option<usize>) -> Self {
        self.selected = selected;
        self
    }

    pub fn empty(mut self, empty: &'a str) -> Self {
        self.empty = empty;
        self
    }

    pub fn bordered(mut self, bordered: bool) -> Self {
        self.bordered = bordered;
        self
    }
}

impl Widget for RowList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if self.bordered {
            let block = view_block(self.title);
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };
        if inner.height == 0 {
            return;
        }

        if self.rows.is_empty() {
            buf.set_string(
                inner.x + 1,
                inner.y,
                self.empty,
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        let heights = vec![1u16; self.rows.len()];
        let start = compute_scroll_start(&heights, self.selected.unwrap_or(0), inner.height);
        for (offset, (i, row)) in self.rows.iter().enumerate().skip(start).enumerate() {
            if offset as u16 >= inner.height {
                break;
            }
            let y = inner.y + offset as u16;
            let marker = if self.selected == Some(i) { "\u{25B6} " } else { "  " };
            buf.set_string(inner.x, y, marker, Style::default().fg(Color::Cyan));
            buf.set_line(inner.x + 2, y, row, inner.width.saturating_sub(2));
            if self.selected == Some(i) {
                buf.set_style(
                    Rect::new(inner.x, y, inner.width, 1),
                    Style::default().add_modifier(Modifier::BOLD),
                );
            }
        }
    }
}

/// Find the smallest scroll start index so that the selected item fits
/// within the available height.
fn compute_scroll_start(heights: &[u16], selected: usize, available: u16) -> usize {
    if heights.is_empty() {
        return 0;
    }

    let selected = selected.min(heights.len() - 1);
    if available == 0 {
        return selected;
    }

    let mut start = selected;
    let mut used = heights[selected];

    while start > 0 {
        let next = used.saturating_add(heights[start - 1]);
        if next > available {
            break;
        }
        start -= 1;
        used = next;
    }

    start
}

#[cfg(test)]
mod tests {
    use super::compute_scroll_start;

    #[test]
    fn handles_empty_list() {
        assert_eq!(compute_scroll_start(&[], 0, 10), 0);
    }

    #[test]
    fn advances_when_selected_is_below_exactly_full_window() {
        let heights = [5, 5, 5];
        assert_eq!(compute_scroll_start(&heights, 2, 10), 1);
    }

    #[test]
    fn keeps_selected_item_visible_when_it_is_taller_than_viewport() {
        let heights = [3, 12, 4];
        assert_eq!(compute_scroll_start(&heights, 1, 8), 1);
    }

    #[test]
    fn single_line_rows_scroll_one_at_a_time() {
        let heights = [1u16; 20];
        assert_eq!(compute_scroll_start(&heights, 4, 5), 0);
        assert_eq!(compute_scroll_start(&heights, 5, 5), 1);
    }
}
