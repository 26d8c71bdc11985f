use serde::Serialize;

use crate::api::query::Query;
use crate::api::types::{Conversation, Message};
use crate::api::{ApiClientError, BackendClient};

#[derive(Debug, Serialize)]
struct NewConversation<'a> {
    participant_1: &'a str,
    participant_2: &'a str,
}

#[derive(Debug, Serialize)]
struct NewMessage<'a> {
    conversation_id: &'a str,
    sender_id: &'a str,
    content: &'a str,
}

/// `or=(...)` conditions matching the conversation between `a` and `b` in
/// either participant order.
fn between(a: &str, b: &str) -> [String; 2] {
    [
        format!("and(participant_1.eq.{a},participant_2.eq.{b})"),
        format!("and(participant_1.eq.{b},participant_2.eq.{a})"),
    ]
}

impl BackendClient {
    /// Conversations the signed-in user takes part in.
    pub async fn get_conversations(&self) -> Result<Vec<Conversation>, ApiClientError> {
        let me = self.my_id()?;
        self.select(
            &Query::from("conversations")
                .select("*")
                .any_of(&[format!("participant_1.eq.{me}"), format!("participant_2.eq.{me}")])
                .order("created_at", false),
        )
        .await
    }

    /// The conversation with `other_user_id`, created on first contact.
    pub async fn find_or_create_conversation(
        &self,
        other_user_id: &str,
    ) -> Result<Conversation, ApiClientError> {
        let me = self.my_id()?;
        let existing: Vec<Conversation> = self
            .select(
                &Query::from("conversations")
                    .select("*")
                    .any_of(&between(me, other_user_id))
                    .limit(1),
            )
            .await?;
        if let Some(conversation) = existing.into_iter().next() {
            return Ok(conversation);
        }

        tracing::info!(other = other_user_id, "starting conversation");
        let body = NewConversation {
            participant_1: me,
            participant_2: other_user_id,
        };
        let created: Vec<Conversation> = self.insert("conversations", &body).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| ApiClientError::NotFound("created conversation".to_owned()))
    }

    /// Messages in a conversation, oldest first.
    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiClientError> {
        self.select(
            &Query::from("messages")
                .select("*")
                .eq("conversation_id", conversation_id)
                .order("created_at", true),
        )
        .await
    }

    pub async fn send_message(&self, conversation_id: &str, content: &str) -> Result<(), ApiClientError> {
        let body = NewMessage {
            conversation_id,
            sender_id: self.my_id()?,
            content,
        };
        self.insert_quiet("messages", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_lookup_matches_either_order() {
        let q = Query::from("conversations").any_of(&between("a", "b"));
        assert_eq!(
            q.to_query_string(),
            "or=(and(participant_1.eq.a,participant_2.eq.b),and(participant_1.eq.b,participant_2.eq.a))"
        );
    }
}
