use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};

/// Help overlay showing keybindings.
#[derive(Default)]
pub struct HelpView;

impl HelpView {
    pub fn new() -> Self {
        Self
    }
}

impl Widget for HelpView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let key_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let desc_style = Style::default().fg(Color::White);
        let section_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);

        let left: Vec<Line<'_>> = vec![
            Line::from(Span::styled("Navigation", section_style)),
            binding_line("j/k", "Move down / up", key_style, desc_style),
            binding_line("Enter", "Open selected item", key_style, desc_style),
            binding_line("Esc/q", "Go back / close", key_style, desc_style),
            binding_line("R", "Refresh view", key_style, desc_style),
            binding_line("e", "Last error details", key_style, desc_style),
            Line::from(""),
            Line::from(Span::styled("Views", section_style)),
            binding_line("1", "Feed (Tab: All/Following)", key_style, desc_style),
            binding_line("2", "Explore", key_style, desc_style),
            binding_line("3", "Stories", key_style, desc_style),
            binding_line("4", "Notifications", key_style, desc_style),
            binding_line("5", "Messages", key_style, desc_style),
            binding_line("6", "Search", key_style, desc_style),
            binding_line("?", "This help screen", key_style, desc_style),
        ];
        let right: Vec<Line<'_>> = vec![
            Line::from(Span::styled("Posts & people", section_style)),
            binding_line("l", "Like / unlike", key_style, desc_style),
            binding_line("r 1-6", "React (again to remove)", key_style, desc_style),
            binding_line("u", "Open author", key_style, desc_style),
            binding_line("f", "Follow / unfollow", key_style, desc_style),
            binding_line("p / c / S", "Post / comment / story", key_style, desc_style),
            binding_line("m / M", "Mark read / all read", key_style, desc_style),
            binding_line("n", "Next person's stories", key_style, desc_style),
            Line::from(""),
            Line::from(Span::styled("Input", section_style)),
            binding_line(":", "Command mode", key_style, desc_style),
            binding_line("/", "Search posts & users", key_style, desc_style),
            binding_line("@", "Look up user", key_style, desc_style),
            binding_line("Tab", "Complete #tag in editor", key_style, desc_style),
            binding_line("Ctrl-C", "Quit", key_style, desc_style),
        ];

        let width = 84u16.min(area.width.saturating_sub(4));
        let height = (left.len().max(right.len()) as u16 + 2).min(area.height.saturating_sub(2));
        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        let panel = Rect::new(x, y, width, height);

        Clear.render(panel, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Help - Keybindings ")
            .title_style(section_style)
            .border_style(Style::default().fg(Color::Cyan));

        let inner = block.inner(panel);
        block.render(panel, buf);

        let half = inner.width / 2;
        Paragraph::new(left).render(Rect::new(inner.x, inner.y, half, inner.height), buf);
        Paragraph::new(right).render(
            Rect::new(inner.x + half, inner.y, inner.width - half, inner.height),
            buf,
        );
    }
}

fn binding_line<'a>(key: &'a str, desc: &'a str, key_style: Style, desc_style: Style) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("  {key:<11}"), key_style),
        Span::styled(desc, desc_style),
    ])
}
