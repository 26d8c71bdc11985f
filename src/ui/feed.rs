use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;

use crate::api::posts::FeedTab;
use crate::app::App;
use crate::ui::post_list::{PostList, view_block};

/// Home feed with an All / Following tab header.
pub struct FeedView<'a> {
    pub app: &'a App,
}

impl<'a> FeedView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for FeedView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = view_block("Feed");
        let inner = block.inner(area);
        block.render(area, buf);

        let [tabs_area, list_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(inner);

        let mut spans = vec![Span::raw(" ")];
        for tab in [FeedTab::All, FeedTab::Following] {
            let style = if tab == self.app.feed.tab {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            spans.push(Span::styled(format!(" {} ", tab.label()), style));
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled("(Tab to switch)", Style::default().fg(Color::DarkGray)));
        buf.set_line(tabs_area.x, tabs_area.y, &Line::from(spans), tabs_area.width);

        PostList::new("Feed", &self.app.feed.posts, self.app)
            .loading(self.app.feed.loading)
            .bordered(false)
            .render(list_area, buf);
    }
}
