//! Reaction categories and per-target counts.
//!
//! Counts are kept per category in declaration order, so the total is always
//! the sum of the parts and ties in the "top N" summary resolve by that order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A closed set of categories a relation may carry.
///
/// `ALL` fixes the declaration order used for storage and tie-breaking.
pub trait Category: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn index(self) -> usize;
}

/// The single category of a binary relation (like, follow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct On;

impl Category for On {
    const ALL: &'static [Self] = &[On];

    fn index(self) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Love,
    Laugh,
    Angry,
    Sad,
    Wow,
}

impl ReactionKind {
    pub fn emoji(self) -> &'static str {
        match self {
            ReactionKind::Like => "\u{1F44D}",
            ReactionKind::Love => "\u{2764}\u{FE0F}",
            ReactionKind::Laugh => "\u{1F602}",
            ReactionKind::Angry => "\u{1F621}",
            ReactionKind::Sad => "\u{1F622}",
            ReactionKind::Wow => "\u{1F62E}",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Love => "love",
            ReactionKind::Laugh => "laugh",
            ReactionKind::Angry => "angry",
            ReactionKind::Sad => "sad",
            ReactionKind::Wow => "wow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl Category for ReactionKind {
    const ALL: &'static [Self] = &[
        ReactionKind::Like,
        ReactionKind::Love,
        ReactionKind::Laugh,
        ReactionKind::Angry,
        ReactionKind::Sad,
        ReactionKind::Wow,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-negative counts per category for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counts<C: Category> {
    per_category: Vec<u32>,
    _category: std::marker::PhantomData<C>,
}

pub type ReactionCounts = Counts<ReactionKind>;
pub type LikeCount = Counts<On>;

impl<C: Category> Default for Counts<C> {
    fn default() -> Self {
        Self {
            per_category: vec![0; C::ALL.len()],
            _category: std::marker::PhantomData,
        }
    }
}

impl<C: Category> Counts<C> {
    /// Build counts from the raw relation list fetched for a target.
    pub fn from_relations(relations: impl IntoIterator<Item = C>) -> Self {
        let mut counts = Self::default();
        for category in relations {
            counts.per_category[category.index()] += 1;
        }
        counts
    }

    pub fn get(&self, category: C) -> u32 {
        self.per_category[category.index()]
    }

    pub fn total(&self) -> u32 {
        self.per_category.iter().sum()
    }

    /// Apply one local toggle: the previous category loses a count (never
    /// below zero) and the new one gains a count.
    pub fn apply_local_toggle(&self, previous: Option<C>, next: Option<C>) -> Self {
        let mut out = self.clone();
        if let Some(prev) = previous {
            let slot = &mut out.per_category[prev.index()];
            *slot = slot.saturating_sub(1);
        }
        if let Some(next) = next {
            out.per_category[next.index()] += 1;
        }
        out
    }

    /// Categories with a non-zero count, highest first, ties in declaration
    /// order, truncated to `n`.
    pub fn top(&self, n: usize) -> Vec<(C, u32)> {
        let mut ranked: Vec<(C, u32)> = C::ALL
            .iter()
            .map(|&c| (c, self.get(c)))
            .filter(|&(_, count)| count > 0)
            .collect();
        // `sort_by` is stable, so equal counts keep `ALL` order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kind() -> impl Strategy<Value = ReactionKind> {
        prop::sample::select(ReactionKind::ALL.to_vec())
    }

    #[test]
    fn counts_from_relations() {
        let counts = ReactionCounts::from_relations([
            ReactionKind::Love,
            ReactionKind::Love,
            ReactionKind::Wow,
        ]);
        assert_eq!(counts.get(ReactionKind::Love), 2);
        assert_eq!(counts.get(ReactionKind::Wow), 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn replace_moves_one_count() {
        let counts = ReactionCounts::from_relations([ReactionKind::Like]);
        let next = counts.apply_local_toggle(Some(ReactionKind::Like), Some(ReactionKind::Sad));
        assert_eq!(next.get(ReactionKind::Like), 0);
        assert_eq!(next.get(ReactionKind::Sad), 1);
        assert_eq!(next.total(), 1);
    }

    #[test]
    fn decrement_floors_at_zero() {
        let counts = ReactionCounts::default();
        let next = counts.apply_local_toggle(Some(ReactionKind::Angry), None);
        assert_eq!(next.get(ReactionKind::Angry), 0);
        assert_eq!(next.total(), 0);
    }

    #[test]
    fn top_breaks_ties_by_declaration_order() {
        let counts = ReactionCounts::from_relations([
            ReactionKind::Wow,
            ReactionKind::Sad,
            ReactionKind::Laugh,
            ReactionKind::Laugh,
        ]);
        assert_eq!(
            counts.top(3),
            vec![
                (ReactionKind::Laugh, 2),
                (ReactionKind::Sad, 1),
                (ReactionKind::Wow, 1),
            ]
        );
    }

    #[test]
    fn top_skips_empty_categories() {
        let counts = ReactionCounts::from_relations([ReactionKind::Love]);
        assert_eq!(counts.top(3), vec![(ReactionKind::Love, 1)]);
    }

    #[test]
    fn like_count_is_binary() {
        let likes = LikeCount::from_relations([On, On]);
        assert_eq!(likes.total(), 2);
        assert_eq!(likes.apply_local_toggle(None, Some(On)).total(), 3);
        assert_eq!(likes.apply_local_toggle(Some(On), None).total(), 1);
    }

    #[test]
    fn reaction_kind_parse_and_serde() {
        assert_eq!(ReactionKind::parse("LOVE"), Some(ReactionKind::Love));
        assert_eq!(ReactionKind::parse("meh"), None);
        let json = serde_json::to_string(&ReactionKind::Laugh).unwrap();
        assert_eq!(json, "\"laugh\"");
    }

    proptest! {
        #[test]
        fn toggles_keep_counts_consistent(
            seed in prop::collection::vec(kind(), 0..20),
            steps in prop::collection::vec((prop::option::of(kind()), prop::option::of(kind())), 0..50),
        ) {
            let mut counts = ReactionCounts::from_relations(seed);
            for (previous, next) in steps {
                counts = counts.apply_local_toggle(previous, next);
                let sum: u32 = ReactionKind::ALL.iter().map(|&k| counts.get(k)).sum();
                prop_assert_eq!(counts.total(), sum);
            }
        }
    }
}
