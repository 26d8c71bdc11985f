use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthStr;

use crate::api::types::Post;
use crate::interaction::hashtag;
use crate::interaction::reactions::{LikeCount, On, ReactionCounts, ReactionKind};

/// Engagement to show on a card, after local optimistic changes.
#[derive(Debug, Clone, Default)]
pub struct Engagement {
    pub liked: Option<On>,
    pub likes: LikeCount,
    pub reaction: Option<ReactionKind>,
    pub reactions: ReactionCounts,
    pub pending: bool,
}

/// Renders a single post as a compact card.
///
/// Layout:
///   Display Name @username · 2h
///   Post text (may wrap) with #tags and @mentions highlighted
///   ♥ 12  👍 3 ❤️ 2  💬 5
pub struct PostCard<'a> {
    pub post: &'a Post,
    pub engagement: Engagement,
    pub selected: bool,
}

impl<'a> PostCard<'a> {
    pub fn new(post: &'a Post, engagement: Engagement) -> Self {
        Self {
            post,
            engagement,
            selected: false,
        }
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

impl Widget for PostCard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let highlight_style = if self.selected {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };

        let mut y = area.y;

        // -- Line 1: author + age --
        let mut header_spans = Vec::new();
        match self.post.profiles.as_ref() {
            Some(author) => {
                header_spans.push(Span::styled(
                    author.display_name().to_owned(),
                    highlight_style.add_modifier(Modifier::BOLD),
                ));
                header_spans.push(Span::styled(
                    format!(" @{}", author.username),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            None => header_spans.push(Span::styled(
                "unknown",
                highlight_style.add_modifier(Modifier::BOLD),
            )),
        }
        if let Some(created_at) = self.post.created_at {
            header_spans.push(Span::styled(
                format!(" \u{00B7} {}", format_time_ago(created_at)),
                Style::default().fg(Color::DarkGray),
            ));
        }
        if self.post.has_media() {
            header_spans.push(Span::styled(" [media]", Style::default().fg(Color::Magenta)));
        }
        buf.set_line(area.x, y, &Line::from(header_spans), area.width);
        y += 1;

        if y >= area.y + area.height {
            return;
        }

        // -- Line 2+: content (wrapped) --
        let max_text_lines = (area.height - (y - area.y)).saturating_sub(1).max(1) as usize;
        for (i, line_text) in wrap_text(&self.post.content, area.width as usize)
            .into_iter()
            .enumerate()
        {
            if i >= max_text_lines || y >= area.y + area.height {
                break;
            }
            buf.set_line(area.x, y, &styled_content(&line_text), area.width);
            y += 1;
        }

        if y >= area.y + area.height {
            return;
        }

        // -- Last line: engagement --
        buf.set_line(area.x, y, &engagement_line(&self.engagement, self.post.comment_count()), area.width);
    }
}

fn engagement_line(e: &Engagement, comments: u64) -> Line<'static> {
    let heart = if e.liked.is_some() { "\u{2665}" } else { "\u{2661}" };
    let mut spans = vec![Span::styled(
        format!("{heart} {}", format_count(u64::from(e.likes.total()))),
        Style::default().fg(Color::Red),
    )];

    let top = e.reactions.top(3);
    if !top.is_empty() {
        spans.push(Span::raw("  "));
        for (kind, count) in top {
            let style = if e.reaction == Some(kind) {
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default()
            };
            spans.push(Span::styled(format!("{}{} ", kind.emoji(), count), style));
        }
    }

    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("\u{1F4AC} {}", format_count(comments)),
        Style::default().fg(Color::Blue),
    ));
    if e.pending {
        spans.push(Span::styled(" \u{2026}", Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

/// Content with `#tags` and `@mentions` styled. Text is emitted verbatim as
/// spans and never interpreted as markup.
pub fn styled_content(text: &str) -> Line<'static> {
    let tag_style = Style::default().fg(Color::Cyan);
    let mention_style = Style::default().fg(Color::Blue);

    let mut spans = Vec::new();
    let mut last = 0;
    for range in hashtag::tag_ranges(text) {
        push_with_mentions(&mut spans, &text[last..range.start], mention_style);
        spans.push(Span::styled(text[range.clone()].to_owned(), tag_style));
        last = range.end;
    }
    push_with_mentions(&mut spans, &text[last..], mention_style);
    Line::from(spans)
}

fn push_with_mentions(spans: &mut Vec<Span<'static>>, text: &str, mention_style: Style) {
    let mut plain = String::new();
    for (i, word) in text.split(' ').enumerate() {
        if i > 0 {
            plain.push(' ');
        }
        if word.len() > 1 && word.starts_with('@') {
            if !plain.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut plain)));
            }
            spans.push(Span::styled(word.to_owned(), mention_style));
        } else {
            plain.push_str(word);
        }
    }
    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }
}

/// Height in lines needed for a post card.
pub fn post_card_height(post: &Post, width: u16) -> u16 {
    let text_lines = wrap_text(&post.content, width as usize).len() as u16;
    // header + text + engagement
    1 + text_lines + 1
}

/// Word-wrap by display width, so wide scripts and emoji do not overflow.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![];
    }
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        if paragraph.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current = word.to_string();
            } else if current.width() + 1 + word.width() <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(current);
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

pub fn format_time_ago(dt: chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let diff = now.signed_duration_since(dt);

    if diff.num_seconds() < 60 {
        format!("{}s", diff.num_seconds().max(0))
    } else if diff.num_minutes() < 60 {
        format!("{}m", diff.num_minutes())
    } else if diff.num_hours() < 24 {
        format!("{}h", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d", diff.num_days())
    } else {
        dt.format("%b %d").to_string()
    }
}

pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(line: &Line<'_>) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn tags_and_mentions_become_separate_spans() {
        let line = styled_content("hi @omar see #rust and #القاهرة");
        assert_eq!(
            contents(&line),
            vec!["hi ", "@omar", " see ", "#rust", " and ", "#القاهرة"]
        );
    }

    #[test]
    fn markup_is_left_alone() {
        let line = styled_content("<b>bold</b> **x**");
        assert_eq!(contents(&line), vec!["<b>bold</b> **x**"]);
    }

    #[test]
    fn wrap_counts_display_width() {
        // Each CJK character is two columns wide.
        let lines = wrap_text("你好 世界 abc", 5);
        assert_eq!(lines, vec!["你好", "世界", "abc"]);
    }

    #[test]
    fn format_count_abbreviates() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_500), "1.5K");
        assert_eq!(format_count(2_000_000), "2.0M");
    }
}
