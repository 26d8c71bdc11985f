use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interaction::reactions::{LikeCount, On, ReactionCounts, ReactionKind};
use crate::interaction::story::Story;

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Full name when set, otherwise the username.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Embedded author of a post, comment or story (`profiles(...)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRef {
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl AuthorRef {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

// ---------------------------------------------------------------------------
// Posts & comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRef {
    pub user_id: String,
    pub reaction_type: ReactionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountRef {
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub profiles: Option<AuthorRef>,
    #[serde(default)]
    pub likes: Vec<UserRef>,
    #[serde(default)]
    pub reactions: Vec<ReactionRef>,
    #[serde(default)]
    pub comments: Vec<CountRef>,
}

impl Post {
    pub fn like_count(&self) -> LikeCount {
        LikeCount::from_relations(self.likes.iter().map(|_| On))
    }

    pub fn liked_by(&self, user_id: &str) -> Option<On> {
        self.likes.iter().any(|l| l.user_id == user_id).then_some(On)
    }

    pub fn reaction_counts(&self) -> ReactionCounts {
        ReactionCounts::from_relations(self.reactions.iter().map(|r| r.reaction_type))
    }

    pub fn reaction_of(&self, user_id: &str) -> Option<ReactionKind> {
        self.reactions
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.reaction_type)
    }

    pub fn comment_count(&self) -> u64 {
        self.comments.first().map_or(0, |c| c.count)
    }

    pub fn has_media(&self) -> bool {
        [&self.image_url, &self.video_url]
            .iter()
            .any(|u| u.as_deref().is_some_and(|u| !u.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub profiles: Option<AuthorRef>,
}

// ---------------------------------------------------------------------------
// Stories, hashtags, notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRow {
    #[serde(flatten)]
    pub story: Story,
    #[serde(default)]
    pub profiles: Option<AuthorRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hashtag {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub usage_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant_1: String,
    pub participant_2: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// The participant that is not `me`.
    pub fn other(&self, me: &str) -> &str {
        if self.participant_1 == me {
            &self.participant_2
        } else {
            &self.participant_1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Composite view payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExploreData {
    pub trending: Vec<Hashtag>,
    pub suggested: Vec<Profile>,
    pub recent_posts: Vec<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileData {
    pub profile: Profile,
    pub posts: Vec<Post>,
    pub followers: u64,
    pub following: u64,
    /// Whether the signed-in user follows this profile, as fetched.
    pub followed: Option<On>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub users: Vec<Profile>,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationEntry {
    pub conversation: Conversation,
    pub partner: Option<Profile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationThread {
    pub conversation: Conversation,
    pub partner: Profile,
    pub messages: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_with_embedded_relations() {
        let json = r#"{
            "id": "p1",
            "user_id": "u1",
            "content": "hello #rust",
            "image_url": "",
            "created_at": "2024-05-01T10:00:00Z",
            "profiles": {"username": "amal", "full_name": "Amal"},
            "likes": [{"user_id": "u2"}, {"user_id": "u3"}],
            "reactions": [
                {"user_id": "u2", "reaction_type": "love"},
                {"user_id": "u4", "reaction_type": "wow"}
            ],
            "comments": [{"count": 7}]
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.like_count().total(), 2);
        assert_eq!(post.liked_by("u3"), Some(On));
        assert_eq!(post.liked_by("u9"), None);
        assert_eq!(post.reaction_of("u4"), Some(ReactionKind::Wow));
        assert_eq!(post.reaction_counts().total(), 2);
        assert_eq!(post.comment_count(), 7);
        assert!(!post.has_media());
    }

    #[test]
    fn story_row_flattens_story_columns() {
        let json = r#"{
            "id": "s1",
            "user_id": "u1",
            "content": "morning",
            "media_url": "",
            "created_at": "2024-05-01T10:00:00Z",
            "expires_at": "2024-05-02T10:00:00Z",
            "profiles": {"username": "amal"}
        }"#;
        let row: StoryRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.story.owner_user_id, "u1");
        assert_eq!(row.story.text(), Some("morning"));
        assert_eq!(row.story.media(), None);
        assert_eq!(row.profiles.unwrap().display_name(), "amal");
    }

    #[test]
    fn conversation_other_participant() {
        let c = Conversation {
            id: "c".into(),
            participant_1: "me".into(),
            participant_2: "you".into(),
            created_at: None,
        };
        assert_eq!(c.other("me"), "you");
        assert_eq!(c.other("you"), "me");
    }
}
