use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthChar;

/// Single-line prompt + text with a cursor block at the end.
pub struct TextInput<'a> {
    pub prompt: &'a str,
    pub text: &'a str,
    pub style: Style,
}

impl<'a> TextInput<'a> {
    pub fn new(prompt: &'a str, text: &'a str) -> Self {
        Self {
            prompt,
            text,
            style: Style::default().fg(Color::White),
        }
    }
}

/// The widest suffix of `s` that fits in `max_width` columns.
fn visible_tail(s: &str, max_width: usize) -> &str {
    let mut start = s.len();
    let mut width = 0;
    for (i, c) in s.char_indices().rev() {
        let w = c.width().unwrap_or(0);
        if width + w > max_width {
            break;
        }
        width += w;
        start = i;
    }
    &s[start..]
}

impl Widget for TextInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let display = format!("{}{}\u{2588}", self.prompt, self.text);
        // Show the rightmost portion when the input is wider than the area.
        let visible = visible_tail(&display, area.width as usize);
        buf.set_string(area.x, area.y, visible, self.style);
    }
}

#[cfg(test)]
mod tests {
    use super::visible_tail;

    #[test]
    fn tail_respects_char_boundaries() {
        assert_eq!(visible_tail("/القاهرة", 3), "هرة");
        assert_eq!(visible_tail(":dm", 10), ":dm");
        assert_eq!(visible_tail("你好", 3), "好");
    }
}
