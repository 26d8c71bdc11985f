use serde::Serialize;

use crate::api::query::Query;
use crate::api::{ApiClientError, BackendClient};
use crate::interaction::reactions::{On, ReactionKind};
use crate::interaction::toggle::{MutationOp, PendingMutation, RelationKey, RelationKind};

#[derive(Debug, Serialize)]
struct LikeRow<'a> {
    post_id: &'a str,
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct FollowRow<'a> {
    follower_id: &'a str,
    following_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ReactionRow<'a> {
    post_id: &'a str,
    user_id: &'a str,
    reaction_type: ReactionKind,
}

/// Collection and the (subject, target) column pair for a binary relation.
fn binary_table(kind: RelationKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        RelationKind::Follow => ("follows", "follower_id", "following_id"),
        RelationKind::Like | RelationKind::Reaction => ("likes", "user_id", "post_id"),
    }
}

fn relation_filter(key: &RelationKey) -> Query {
    let (table, subject_col, target_col) = match key.kind {
        RelationKind::Reaction => ("reactions", "user_id", "post_id"),
        kind => binary_table(kind),
    };
    Query::from(table)
        .eq(target_col, &key.target_id)
        .eq(subject_col, &key.subject_user_id)
}

impl BackendClient {
    /// Send a like or follow mutation produced by an optimistic toggle.
    pub async fn apply_binary_mutation(&self, m: &PendingMutation<On>) -> Result<(), ApiClientError> {
        let key = &m.key;
        match m.op {
            MutationOp::Create(On) | MutationOp::Upsert(On) => match key.kind {
                RelationKind::Follow => {
                    let row = FollowRow {
                        follower_id: &key.subject_user_id,
                        following_id: &key.target_id,
                    };
                    self.insert_quiet("follows", &row).await
                }
                RelationKind::Like | RelationKind::Reaction => {
                    let row = LikeRow {
                        post_id: &key.target_id,
                        user_id: &key.subject_user_id,
                    };
                    self.insert_quiet("likes", &row).await
                }
            },
            MutationOp::Delete => self.delete(&relation_filter(key)).await,
        }
    }

    /// Send a reaction mutation. Create and replace both upsert on
    /// `(post_id, user_id)` so a user holds at most one reaction per post.
    pub async fn apply_reaction_mutation(
        &self,
        m: &PendingMutation<ReactionKind>,
    ) -> Result<(), ApiClientError> {
        let key = &m.key;
        match m.op {
            MutationOp::Create(kind) | MutationOp::Upsert(kind) => {
                let row = ReactionRow {
                    post_id: &key.target_id,
                    user_id: &key.subject_user_id,
                    reaction_type: kind,
                };
                self.upsert(&Query::from("reactions").on_conflict("post_id,user_id"), &row)
                    .await
            }
            MutationOp::Delete => self.delete(&relation_filter(key)).await,
        }
    }

    /// Whether the signed-in user follows `user_id`.
    pub async fn is_following(&self, user_id: &str) -> Result<Option<On>, ApiClientError> {
        let key = RelationKey::new(self.my_id()?, user_id, RelationKind::Follow);
        let rows: Vec<serde_json::Value> = self
            .select(&relation_filter(&key).select("follower_id").limit(1))
            .await?;
        Ok((!rows.is_empty()).then_some(On))
    }

    pub async fn follower_count(&self, user_id: &str) -> Result<u64, ApiClientError> {
        self.count_follows("following_id", user_id).await
    }

    pub async fn following_count(&self, user_id: &str) -> Result<u64, ApiClientError> {
        self.count_follows("follower_id", user_id).await
    }

    async fn count_follows(&self, column: &str, user_id: &str) -> Result<u64, ApiClientError> {
        let rows: Vec<serde_json::Value> = self
            .select(&Query::from("follows").select("follower_id").eq(column, user_id))
            .await?;
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_filters_name_both_sides() {
        let like = RelationKey::new("u1", "p1", RelationKind::Like);
        assert_eq!(
            relation_filter(&like).to_query_string(),
            "post_id=eq.p1&user_id=eq.u1"
        );
        let follow = RelationKey::new("u1", "u2", RelationKind::Follow);
        assert_eq!(
            relation_filter(&follow).to_query_string(),
            "following_id=eq.u2&follower_id=eq.u1"
        );
        let reaction = RelationKey::new("u1", "p1", RelationKind::Reaction);
        assert_eq!(relation_filter(&reaction).collection(), "reactions");
    }
}
