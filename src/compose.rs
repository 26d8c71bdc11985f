//! Draft editing with hashtag autocomplete.

use indexmap::IndexSet;

use crate::api::types::Hashtag;
use crate::interaction::hashtag::{self, SuggestionGuard, SuggestionUpdate};
use crate::validate::{self, ValidationError};

/// What the draft will be published as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeTarget {
    Post,
    Comment { post_id: String },
    Story,
    Message { conversation_id: String },
}

impl ComposeTarget {
    pub fn label(&self) -> &'static str {
        match self {
            ComposeTarget::Post => "post",
            ComposeTarget::Comment { .. } => "comment",
            ComposeTarget::Story => "story",
            ComposeTarget::Message { .. } => "message",
        }
    }
}

#[derive(Debug)]
pub struct Composer {
    target: ComposeTarget,
    text: String,
    cursor: usize,
    guard: SuggestionGuard,
    suggestions: Vec<Hashtag>,
    selected: usize,
}

impl Composer {
    pub fn new(target: ComposeTarget) -> Self {
        Self {
            target,
            text: String::new(),
            cursor: 0,
            guard: SuggestionGuard::default(),
            suggestions: Vec::new(),
            selected: 0,
        }
    }

    pub fn target(&self) -> &ComposeTarget {
        &self.target
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn suggestions(&self) -> &[Hashtag] {
        &self.suggestions
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Distinct tags in the draft.
    pub fn tags(&self) -> IndexSet<String> {
        hashtag::extract_all_tags(&self.text)
    }

    fn byte_at(&self, cursor: usize) -> usize {
        self.text
            .char_indices()
            .nth(cursor)
            .map_or(self.text.len(), |(i, _)| i)
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn refresh(&mut self) -> SuggestionUpdate {
        let update = self.guard.update(&self.text, self.cursor);
        if !matches!(update, SuggestionUpdate::Unchanged) {
            self.suggestions.clear();
            self.selected = 0;
        }
        update
    }

    pub fn insert(&mut self, c: char) -> SuggestionUpdate {
        let at = self.byte_at(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
        self.refresh()
    }

    pub fn backspace(&mut self) -> SuggestionUpdate {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_at(self.cursor);
            self.text.remove(at);
        }
        self.refresh()
    }

    pub fn move_left(&mut self) -> SuggestionUpdate {
        self.cursor = self.cursor.saturating_sub(1);
        self.refresh()
    }

    pub fn move_right(&mut self) -> SuggestionUpdate {
        self.cursor = (self.cursor + 1).min(self.char_len());
        self.refresh()
    }

    pub fn select_next(&mut self) {
        if !self.suggestions.is_empty() {
            self.selected = (self.selected + 1) % self.suggestions.len();
        }
    }

    pub fn select_previous(&mut self) {
        if !self.suggestions.is_empty() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.suggestions.len() - 1);
        }
    }

    /// Splice the selected suggestion into the draft. `None` when nothing is
    /// offered.
    pub fn accept_suggestion(&mut self) -> Option<SuggestionUpdate> {
        let name = self.suggestions.get(self.selected)?.name.clone();
        let spliced = hashtag::splice_suggestion(&self.text, self.cursor, &name);
        self.text = spliced.text;
        self.cursor = spliced.cursor;
        Some(self.refresh())
    }

    /// Take suggestions for request `id`; responses for superseded input are
    /// dropped.
    pub fn receive_suggestions(&mut self, id: u64, suggestions: Vec<Hashtag>) -> bool {
        if !self.guard.accepts(id) {
            tracing::debug!(id, "stale hashtag suggestions dropped");
            return false;
        }
        self.suggestions = suggestions;
        self.selected = 0;
        true
    }

    pub fn dismiss_suggestions(&mut self) {
        self.guard.cancel();
        self.suggestions.clear();
        self.selected = 0;
    }

    pub fn validate(&self, max_chars: usize) -> Result<&str, ValidationError> {
        validate::validate_content(self.target.label(), &self.text, max_chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, usage_count: u64) -> Hashtag {
        Hashtag {
            id: None,
            name: name.to_owned(),
            usage_count,
        }
    }

    fn typed(text: &str) -> (Composer, Vec<SuggestionUpdate>) {
        let mut c = Composer::new(ComposeTarget::Post);
        let updates = text.chars().map(|ch| c.insert(ch)).collect();
        (c, updates)
    }

    #[test]
    fn typing_a_tag_issues_queries() {
        let (_, updates) = typed("hi #ru");
        assert_eq!(updates[0], SuggestionUpdate::Clear);
        assert_eq!(updates[3], SuggestionUpdate::Clear);
        match &updates[5] {
            SuggestionUpdate::Issue(req) => assert_eq!(req.query, "ru"),
            other => panic!("expected issue, got {other:?}"),
        }
    }

    #[test]
    fn stale_response_is_dropped() {
        let (mut c, updates) = typed("#r");
        let SuggestionUpdate::Issue(first) = updates[1].clone() else {
            panic!("expected issue");
        };
        let SuggestionUpdate::Issue(second) = c.insert('u') else {
            panic!("expected issue");
        };
        assert!(!c.receive_suggestions(first.id, vec![tag("react", 9)]));
        assert!(c.suggestions().is_empty());
        assert!(c.receive_suggestions(second.id, vec![tag("rust", 5)]));
        assert_eq!(c.suggestions()[0].name, "rust");
    }

    #[test]
    fn accepting_splices_and_clears() {
        let (mut c, mut updates) = typed("learning #ru");
        let Some(SuggestionUpdate::Issue(req)) = updates.pop() else {
            panic!("expected issue");
        };
        c.receive_suggestions(req.id, vec![tag("rust", 5), tag("ruby", 2)]);
        c.select_next();
        assert_eq!(c.accept_suggestion(), Some(SuggestionUpdate::Clear));
        assert_eq!(c.text(), "learning #ruby ");
        assert_eq!(c.cursor(), 15);
        assert!(c.suggestions().is_empty());
        assert_eq!(c.accept_suggestion(), None);
    }

    #[test]
    fn editing_in_the_middle_of_arabic_text() {
        let (mut c, _) = typed("أحب القاهرة");
        for _ in 0..7 {
            c.move_left();
        }
        c.insert('#');
        assert_eq!(c.text(), "أحب #القاهرة");
        assert_eq!(c.tags().into_iter().collect::<Vec<_>>(), vec!["#القاهرة"]);
        c.backspace();
        assert_eq!(c.text(), "أحب القاهرة");
    }

    #[test]
    fn validation_uses_target_label() {
        let c = Composer::new(ComposeTarget::Comment {
            post_id: "p".into(),
        });
        assert_eq!(c.validate(500), Err(ValidationError::Empty("comment")));
    }
}
