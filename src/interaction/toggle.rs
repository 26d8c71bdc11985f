//! Optimistic toggling of a user's relation to a target.
//!
//! A toggle is applied to local state at once and produces the mutation the
//! caller must send. The controller remembers the value held right before
//! that toggle, so a failed mutation restores exactly that value. Only one
//! mutation may be in flight per controller; toggles issued meanwhile are
//! ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::interaction::reactions::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Like,
    Reaction,
    Follow,
}

impl RelationKind {
    pub fn label(self) -> &'static str {
        match self {
            RelationKind::Like => "like",
            RelationKind::Reaction => "reaction",
            RelationKind::Follow => "follow",
        }
    }
}

/// Identifies the single relation of a given kind between a user and a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationKey {
    pub subject_user_id: String,
    pub target_id: String,
    pub kind: RelationKind,
}

impl RelationKey {
    pub fn new(subject_user_id: &str, target_id: &str, kind: RelationKind) -> Self {
        Self {
            subject_user_id: subject_user_id.to_owned(),
            target_id: target_id.to_owned(),
            kind,
        }
    }
}

/// The remote write implied by a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp<C> {
    Create(C),
    Delete,
    Upsert(C),
}

/// Pure toggle rule: same category clears, a different one replaces, none sets.
pub fn toggle_relation<C: Category>(current: Option<C>, desired: C) -> (Option<C>, MutationOp<C>) {
    match current {
        None => (Some(desired), MutationOp::Create(desired)),
        Some(held) if held == desired => (None, MutationOp::Delete),
        Some(_) => (Some(desired), MutationOp::Upsert(desired)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A mutation the caller must dispatch, tagged with the ticket to report back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation<C> {
    pub ticket: Ticket,
    pub key: RelationKey,
    pub op: MutationOp<C>,
    pub previous: Option<C>,
    pub next: Option<C>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<C> {
    Confirmed,
    /// The optimistic value was discarded and `restored` is current again.
    RolledBack {
        restored: Option<C>,
        discarded: Option<C>,
    },
    /// The ticket does not match the in-flight mutation.
    Stale,
}

#[derive(Debug, Clone)]
struct InFlight<C> {
    ticket: Ticket,
    previous: Option<C>,
}

#[derive(Debug, Clone)]
pub struct ToggleController<C: Category> {
    key: RelationKey,
    current: Option<C>,
    in_flight: Option<InFlight<C>>,
    next_ticket: u64,
    notice: Option<String>,
}

impl<C: Category> ToggleController<C> {
    pub fn new(key: RelationKey, current: Option<C>) -> Self {
        Self {
            key,
            current,
            in_flight: None,
            next_ticket: 0,
            notice: None,
        }
    }

    pub fn key(&self) -> &RelationKey {
        &self.key
    }

    pub fn current(&self) -> Option<C> {
        self.current
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Toggle towards `desired`. Returns `None` while a mutation is in flight.
    pub fn toggle(&mut self, desired: C) -> Option<PendingMutation<C>> {
        if self.in_flight.is_some() {
            tracing::debug!(target_id = %self.key.target_id, "toggle ignored: mutation in flight");
            return None;
        }

        let previous = self.current;
        let (next, op) = toggle_relation(previous, desired);
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;

        self.current = next;
        self.in_flight = Some(InFlight { ticket, previous });

        tracing::debug!(
            target_id = %self.key.target_id,
            kind = ?self.key.kind,
            %ticket,
            ?previous,
            ?next,
            "optimistic toggle"
        );

        Some(PendingMutation {
            ticket,
            key: self.key.clone(),
            op,
            previous,
            next,
        })
    }

    /// Report the outcome of the mutation identified by `ticket`.
    pub fn complete<E: fmt::Display>(&mut self, ticket: Ticket, result: Result<(), E>) -> Completion<C> {
        let Some(in_flight) = self.in_flight.take_if(|f| f.ticket == ticket) else {
            tracing::warn!(target_id = %self.key.target_id, %ticket, "stale mutation result ignored");
            return Completion::Stale;
        };

        match result {
            Ok(()) => Completion::Confirmed,
            Err(e) => {
                let discarded = self.current;
                self.current = in_flight.previous;
                self.notice = Some(format!("Could not update {}: {e}", self.key.kind.label()));
                tracing::warn!(
                    target_id = %self.key.target_id,
                    %ticket,
                    restored = ?in_flight.previous,
                    "mutation failed, rolled back"
                );
                Completion::RolledBack {
                    restored: in_flight.previous,
                    discarded,
                }
            }
        }
    }

    /// Adopt freshly fetched remote state. Ignored while a mutation is in flight.
    pub fn reconcile(&mut self, fetched: Option<C>) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        self.current = fetched;
        true
    }

    /// Take the transient error notice left by the last rollback.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;
    use crate::interaction::reactions::{On, ReactionCounts, ReactionKind};

    fn reaction_controller(user: &str) -> ToggleController<ReactionKind> {
        ToggleController::new(RelationKey::new(user, "post-1", RelationKind::Reaction), None)
    }

    fn kind() -> impl Strategy<Value = ReactionKind> {
        prop::sample::select(ReactionKind::ALL.to_vec())
    }

    #[test]
    fn toggle_rule() {
        assert_eq!(
            toggle_relation(None, ReactionKind::Love),
            (Some(ReactionKind::Love), MutationOp::Create(ReactionKind::Love))
        );
        assert_eq!(
            toggle_relation(Some(ReactionKind::Love), ReactionKind::Love),
            (None, MutationOp::Delete)
        );
        assert_eq!(
            toggle_relation(Some(ReactionKind::Love), ReactionKind::Sad),
            (Some(ReactionKind::Sad), MutationOp::Upsert(ReactionKind::Sad))
        );
    }

    #[test]
    fn binary_relation_never_upserts() {
        assert_eq!(toggle_relation(None, On), (Some(On), MutationOp::Create(On)));
        assert_eq!(toggle_relation(Some(On), On), (None, MutationOp::Delete));
    }

    #[test]
    fn toggle_is_ignored_while_in_flight() {
        let mut ctl = reaction_controller("u1");
        let first = ctl.toggle(ReactionKind::Like).unwrap();
        assert!(ctl.toggle(ReactionKind::Like).is_none());
        assert_eq!(ctl.current(), Some(ReactionKind::Like));
        assert_eq!(ctl.complete(first.ticket, Ok::<(), String>(())), Completion::Confirmed);
        assert!(!ctl.is_in_flight());
    }

    #[test]
    fn failure_restores_previous_value_not_null() {
        let mut ctl =
            ToggleController::new(RelationKey::new("u1", "p", RelationKind::Reaction), Some(ReactionKind::Wow));
        let pending = ctl.toggle(ReactionKind::Sad).unwrap();
        assert_eq!(pending.op, MutationOp::Upsert(ReactionKind::Sad));
        assert_eq!(ctl.current(), Some(ReactionKind::Sad));

        let outcome = ctl.complete(pending.ticket, Err("network down"));
        assert_eq!(
            outcome,
            Completion::RolledBack {
                restored: Some(ReactionKind::Wow),
                discarded: Some(ReactionKind::Sad),
            }
        );
        assert_eq!(ctl.current(), Some(ReactionKind::Wow));
        assert!(ctl.take_notice().unwrap().contains("network down"));
        assert!(ctl.take_notice().is_none());
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut ctl = reaction_controller("u1");
        let first = ctl.toggle(ReactionKind::Like).unwrap();
        ctl.complete(first.ticket, Ok::<(), String>(()));
        let second = ctl.toggle(ReactionKind::Love).unwrap();

        assert_eq!(ctl.complete(first.ticket, Err("late")), Completion::Stale);
        assert_eq!(ctl.current(), Some(ReactionKind::Love));
        assert!(ctl.is_in_flight());
        assert_eq!(ctl.complete(second.ticket, Ok::<(), String>(())), Completion::Confirmed);
    }

    #[test]
    fn reconcile_waits_for_in_flight() {
        let mut ctl = reaction_controller("u1");
        let pending = ctl.toggle(ReactionKind::Like).unwrap();
        assert!(!ctl.reconcile(None));
        assert_eq!(ctl.current(), Some(ReactionKind::Like));
        ctl.complete(pending.ticket, Ok::<(), String>(()));
        assert!(ctl.reconcile(Some(ReactionKind::Wow)));
        assert_eq!(ctl.current(), Some(ReactionKind::Wow));
    }

    #[test]
    fn love_then_unlove_leaves_counts_at_baseline() {
        let baseline = ReactionCounts::from_relations([ReactionKind::Love, ReactionKind::Like]);
        let mut counts = baseline.clone();
        let mut ctl = reaction_controller("me");

        for _ in 0..2 {
            let pending = ctl.toggle(ReactionKind::Love).unwrap();
            counts = counts.apply_local_toggle(pending.previous, pending.next);
            assert_eq!(ctl.complete(pending.ticket, Ok::<(), String>(())), Completion::Confirmed);
        }

        assert_eq!(ctl.current(), None);
        assert_eq!(counts, baseline);
    }

    proptest! {
        #[test]
        fn successful_toggles_fold_the_rule(
            steps in prop::collection::vec((0usize..4, kind()), 0..60),
        ) {
            let users = ["a", "b", "c", "d"];
            let mut controllers: HashMap<&str, ToggleController<ReactionKind>> =
                users.iter().map(|&u| (u, reaction_controller(u))).collect();
            let mut expected: HashMap<&str, Option<ReactionKind>> =
                users.iter().map(|&u| (u, None)).collect();
            let mut counts = ReactionCounts::default();

            for (who, desired) in steps {
                let user = users[who];
                let ctl = controllers.get_mut(user).unwrap();
                let pending = ctl.toggle(desired).unwrap();
                counts = counts.apply_local_toggle(pending.previous, pending.next);
                prop_assert_eq!(ctl.complete(pending.ticket, Ok::<(), String>(())), Completion::Confirmed);

                let slot = expected.get_mut(user).unwrap();
                *slot = toggle_relation(*slot, desired).0;
            }

            for user in users {
                prop_assert_eq!(controllers[user].current(), expected[user]);
            }
            let holding = expected.values().filter(|v| v.is_some()).count() as u32;
            prop_assert_eq!(counts.total(), holding);
        }

        #[test]
        fn failure_on_nth_restores_state_before_nth(
            desired in prop::collection::vec(kind(), 1..30),
            fail_at in 0usize..30,
        ) {
            let fail_at = fail_at % desired.len();
            let mut ctl = reaction_controller("me");
            let mut before_failure = None;

            for (i, &d) in desired.iter().enumerate() {
                let before = ctl.current();
                let pending = ctl.toggle(d).unwrap();
                if i == fail_at {
                    before_failure = Some(before);
                    ctl.complete(pending.ticket, Err("boom"));
                    break;
                }
                ctl.complete(pending.ticket, Ok::<(), String>(()));
            }

            prop_assert_eq!(Some(ctl.current()), before_failure);
            prop_assert!(!ctl.is_in_flight());
        }
    }
}
