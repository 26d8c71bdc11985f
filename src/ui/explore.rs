use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;

use crate::app::App;
use crate::ui::post::format_count;
use crate::ui::post_list::{PostList, RowList};

/// Trending tags and suggested users side by side, recent posts below.
///
/// Selection runs over the tags first, then the users.
pub struct ExploreView<'a> {
    pub app: &'a App,
}

impl<'a> ExploreView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for ExploreView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let explore = &self.app.explore;
        let selected = self.app.selected_index();
        let trending_len = explore.trending.len();

        let [top, bottom] =
            Layout::vertical([Constraint::Percentage(45), Constraint::Min(4)]).areas(area);
        let [tags_area, users_area] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(top);

        let tag_rows = explore
            .trending
            .iter()
            .map(|tag| {
                Line::from(vec![
                    Span::styled(format!("#{}", tag.name), Style::default().fg(Color::Cyan)),
                    Span::styled(
                        format!("  {} posts", format_count(tag.usage_count)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ])
            })
            .collect();
        RowList::new("Trending", tag_rows)
            .selected((selected < trending_len).then_some(selected))
            .empty(if self.app.loading { "Loading..." } else { "No trending tags" })
            .render(tags_area, buf);

        let user_rows = explore
            .suggested
            .iter()
            .map(|user| {
                Line::from(vec![
                    Span::raw(user.display_name().to_owned()),
                    Span::styled(
                        format!(" @{}", user.username),
                        Style::default().fg(Color::DarkGray),
                    ),
                ])
            })
            .collect();
        RowList::new("Who to follow", user_rows)
            .selected(selected.checked_sub(trending_len))
            .empty("No suggestions")
            .render(users_area, buf);

        PostList::new("Recent", &explore.recent_posts, self.app)
            .selected(None)
            .render(bottom, buf);
    }
}
