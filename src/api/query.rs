//! Filter/order/limit builder rendered as a PostgREST query string.

use std::fmt::Display;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Percent-encoding set for URL query values (encode everything except unreserved chars).
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'*')
    .remove(b',')
    .remove(b'(')
    .remove(b')');

pub(crate) fn encode_query(s: &str) -> String {
    utf8_percent_encode(s, QUERY_ENCODE_SET).to_string()
}

/// Strip characters that carry meaning inside filter expressions so user
/// text can only ever match literally. `_` is escaped rather than dropped
/// since it is common in tags and usernames.
pub fn sanitize_pattern(input: &str) -> String {
    let kept: String = input
        .chars()
        .filter(|c| !matches!(c, '*' | '%' | ',' | '(' | ')' | '"' | '\\'))
        .collect();
    kept.trim().replace('_', "\\_")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    collection: String,
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<u32>,
    on_conflict: Option<String>,
}

impl Query {
    pub fn from(collection: &str) -> Self {
        Self {
            collection: collection.to_owned(),
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            on_conflict: None,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn select(mut self, columns: &str) -> Self {
        let compact: String = columns.split_whitespace().collect();
        self.select = Some(compact);
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("eq.{value}"))
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("neq.{value}"))
    }

    pub fn gt(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("gt.{value}"))
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("gte.{value}"))
    }

    /// Case-insensitive "starts with".
    pub fn starts_with(self, column: &str, prefix: &str) -> Self {
        let prefix = sanitize_pattern(prefix);
        self.filter(column, format!("ilike.{prefix}*"))
    }

    /// Case-insensitive "contains".
    pub fn contains(self, column: &str, needle: &str) -> Self {
        let needle = sanitize_pattern(needle);
        self.filter(column, format!("ilike.*{needle}*"))
    }

    pub fn in_list<I, S>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Display,
    {
        let list: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
        self.filter(column, format!("in.({})", list.join(",")))
    }

    /// Any of the given `column.op.value` conditions.
    pub fn any_of(mut self, conditions: &[String]) -> Self {
        self.filters
            .push(("or".to_owned(), format!("({})", conditions.join(","))));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{column}.{dir}"));
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Unique key for an upsert.
    pub fn on_conflict(mut self, columns: &str) -> Self {
        self.on_conflict = Some(columns.to_owned());
        self
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    fn filter(mut self, column: &str, expr: String) -> Self {
        self.filters.push((column.to_owned(), expr));
        self
    }

    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref select) = self.select {
            parts.push(format!("select={}", encode_query(select)));
        }
        for (column, expr) in &self.filters {
            parts.push(format!("{column}={}", encode_query(expr)));
        }
        if !self.order.is_empty() {
            parts.push(format!("order={}", self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={limit}"));
        }
        if let Some(ref cols) = self.on_conflict {
            parts.push(format!("on_conflict={cols}"));
        }
        parts.join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_filters_order_limit() {
        let q = Query::from("hashtags")
            .select("*")
            .starts_with("name", "rus")
            .order("usage_count", false)
            .limit(5);
        assert_eq!(
            q.to_query_string(),
            "select=*&name=ilike.rus*&order=usage_count.desc&limit=5"
        );
    }

    #[test]
    fn encodes_non_ascii_values() {
        let q = Query::from("hashtags").starts_with("name", "قا");
        assert_eq!(q.to_query_string(), "name=ilike.%D9%82%D8%A7*");
    }

    #[test]
    fn compacts_embedded_select() {
        let q = Query::from("posts").select("*, profiles ( username, full_name )");
        assert_eq!(q.to_query_string(), "select=*,profiles(username,full_name)");
    }

    #[test]
    fn in_list_and_or() {
        let q = Query::from("posts")
            .in_list("user_id", ["a", "b"])
            .any_of(&["participant_1.eq.x".into(), "participant_2.eq.x".into()]);
        assert_eq!(
            q.to_query_string(),
            "user_id=in.(a,b)&or=(participant_1.eq.x,participant_2.eq.x)"
        );
    }

    #[test]
    fn user_text_cannot_inject_filters() {
        let q = Query::from("profiles").contains("username", "a*,b)&x=1");
        assert_eq!(q.to_query_string(), "username=ilike.*ab%26x%3D1*");
        assert_eq!(sanitize_pattern("  %rust*  "), "rust");
    }

    #[test]
    fn underscore_matches_literally() {
        assert_eq!(sanitize_pattern("tokio_"), "tokio\\_");
        let q = Query::from("hashtags").starts_with("name", "tokio_");
        assert_eq!(q.to_query_string(), "name=ilike.tokio%5C_*");
    }

    #[test]
    fn upsert_conflict_key() {
        let q = Query::from("reactions").on_conflict("post_id,user_id");
        assert!(!q.has_filters());
        assert_eq!(q.to_query_string(), "on_conflict=post_id,user_id");
    }
}
