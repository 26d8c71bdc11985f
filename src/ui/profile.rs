use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget, Wrap};

use crate::app::App;
use crate::interaction::toggle::RelationKind;
use crate::ui::post::format_count;
use crate::ui::post_list::{PostList, view_block};

/// Profile header (name, counts, follow state, bio) above the user's posts.
pub struct ProfileView<'a> {
    pub app: &'a App,
}

impl<'a> ProfileView<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }
}

impl Widget for ProfileView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(data) = self.app.profile.as_ref() else {
            PostList::new("Profile", &[], self.app)
                .loading(true)
                .render(area, buf);
            return;
        };
        let profile = &data.profile;

        let block = view_block(&format!("@{}", profile.username));
        let inner = block.inner(area);
        block.render(area, buf);

        let [info_area, posts_area] =
            Layout::vertical([Constraint::Length(6), Constraint::Min(1)]).areas(inner);

        let (followed, followers) = self.app.relations.follow_view(data);
        let is_me = self.app.my_id.as_deref() == Some(profile.id.as_str());
        let pending = self.app.relations.is_pending(RelationKind::Follow, &profile.id);

        let number_style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        let label_style = Style::default().fg(Color::DarkGray);

        let mut name_line = vec![Span::styled(
            profile.display_name().to_owned(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )];
        if !is_me {
            let (label, style) = match followed {
                Some(_) => (" [Following]", Style::default().fg(Color::Green)),
                None => (" [Follow: f]", Style::default().fg(Color::DarkGray)),
            };
            name_line.push(Span::styled(label, style));
            if pending {
                name_line.push(Span::styled(" \u{2026}", label_style));
            }
        }

        let mut lines = vec![
            Line::from(name_line),
            Line::from(Span::styled(format!("@{}", profile.username), label_style)),
            Line::from(vec![
                Span::styled(format_count(followers), number_style),
                Span::styled(" Followers  ", label_style),
                Span::styled(format_count(data.following), number_style),
                Span::styled(" Following  ", label_style),
                Span::styled(data.posts.len().to_string(), number_style),
                Span::styled(" Posts", label_style),
            ]),
        ];
        if let Some(ref created_at) = profile.created_at {
            lines.push(Line::from(Span::styled(
                format!("\u{1F4C5} Joined {}", created_at.format("%B %Y")),
                label_style,
            )));
        }
        if let Some(bio) = profile.bio.as_deref().filter(|b| !b.trim().is_empty()) {
            lines.push(Line::from(bio.to_owned()));
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .render(info_area, buf);

        PostList::new("Posts", &data.posts, self.app)
            .bordered(false)
            .render(posts_area, buf);
    }
}
