use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;

use crate::api::query::Query;
use crate::api::types::StoryRow;
use crate::api::{ApiClientError, BackendClient};

const STORY_SELECT: &str = "*, profiles(id, username, full_name, avatar_url)";

#[derive(Debug, Serialize)]
struct NewStory<'a> {
    user_id: &'a str,
    content: Option<&'a str>,
    media_url: Option<&'a str>,
    expires_at: DateTime<Utc>,
}

impl BackendClient {
    /// Stories that have not yet expired, newest first.
    pub async fn get_active_stories(&self, now: DateTime<Utc>) -> Result<Vec<StoryRow>, ApiClientError> {
        self.select(
            &Query::from("stories")
                .select(STORY_SELECT)
                .gt("expires_at", now.to_rfc3339_opts(SecondsFormat::Secs, true))
                .order("created_at", false),
        )
        .await
    }

    /// Publish a story that expires `lifetime` from now.
    pub async fn create_story(
        &self,
        text: Option<&str>,
        media_url: Option<&str>,
        lifetime: Duration,
    ) -> Result<StoryRow, ApiClientError> {
        let body = NewStory {
            user_id: self.my_id()?,
            content: text.filter(|t| !t.trim().is_empty()),
            media_url: media_url.filter(|m| !m.trim().is_empty()),
            expires_at: Utc::now() + lifetime,
        };
        let created: Vec<StoryRow> = self.insert("stories", &body).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| ApiClientError::NotFound("created story".to_owned()))
    }
}
