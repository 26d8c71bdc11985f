use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;

use crate::app::App;
use crate::ui::post_list::{PostList, RowList};

/// Search view: recent searches until a query is run, then matching users
/// above matching posts.
pub struct SearchView<'a> {
    pub app: &'a App,
}

impl<'a> SearchView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for SearchView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let selected = self.app.selected_index();

        if self.app.showing_recent_searches() {
            let rows = self
                .app
                .recent_searches
                .entries()
                .iter()
                .map(|q| Line::from(q.as_str()))
                .collect();
            RowList::new("Recent searches (/ to search, d remove, D clear)", rows)
                .selected(Some(selected))
                .empty("No recent searches")
                .render(area, buf);
            return;
        }

        let results = &self.app.search_results;
        let title = format!("Search: {}", self.app.search_query);
        let users_len = results.users.len();

        if users_len == 0 {
            PostList::new(&title, &results.posts, self.app)
                .loading(self.app.loading)
                .render(area, buf);
            return;
        }

        let users_height = (users_len as u16 + 2).min(area.height / 3).max(3);
        let [users_area, posts_area] =
            Layout::vertical([Constraint::Length(users_height), Constraint::Min(1)]).areas(area);

        let rows = results
            .users
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
        RowList::new(&title, rows)
            .selected((selected < users_len).then_some(selected))
            .render(users_area, buf);

        PostList::new("Posts", &results.posts, self.app)
            .selected(selected.checked_sub(users_len))
            .render(posts_area, buf);
    }
}
