use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;

use crate::api::types::Notification;
use crate::app::App;
use crate::ui::post::format_time_ago;
use crate::ui::post_list::RowList;

pub struct NotificationsView<'a> {
    pub app: &'a App,
}

impl<'a> NotificationsView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

fn kind_icon(kind: &str) -> &'static str {
    match kind {
        "like" => "\u{2665}",
        "reaction" => "\u{263A}",
        "comment" => "\u{1F4AC}",
        "follow" => "+",
        "message" => "\u{2709}",
        _ => "\u{2022}",
    }
}

fn row(n: &Notification) -> Line<'_> {
    let title_style = if n.read {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let mut spans = vec![
        Span::styled(
            if n.read { "  " } else { "\u{25CF} " },
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(format!("{} ", kind_icon(&n.kind)), Style::default().fg(Color::Yellow)),
        Span::styled(n.title.as_str(), title_style),
        Span::styled(format!("  {}", n.message), Style::default().fg(Color::Gray)),
    ];
    if let Some(created_at) = n.created_at {
        spans.push(Span::styled(
            format!(" \u{00B7} {}", format_time_ago(created_at)),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

impl Widget for NotificationsView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = match self.app.unread_count {
            0 => "Notifications".to_string(),
            n => format!("Notifications ({n} unread, m read, M read all)"),
        };
        let rows = self.app.notifications.iter().map(row).collect();
        RowList::new(&title, rows)
            .selected(Some(self.app.selected_index()))
            .empty(if self.app.loading { "Loading..." } else { "No notifications" })
            .render(area, buf);
    }
}
