use crate::api::query::Query;
use crate::api::types::Hashtag;
use crate::api::{ApiClientError, BackendClient};

impl BackendClient {
    /// Known tags starting with `prefix` (case-insensitive), most used first.
    pub async fn suggest_hashtags(&self, prefix: &str, limit: u32) -> Result<Vec<Hashtag>, ApiClientError> {
        let prefix = prefix.trim_start_matches('#');
        self.select(
            &Query::from("hashtags")
                .select("*")
                .starts_with("name", prefix)
                .order("usage_count", false)
                .limit(limit),
        )
        .await
    }

    pub async fn trending_hashtags(&self, limit: u32) -> Result<Vec<Hashtag>, ApiClientError> {
        self.select(
            &Query::from("hashtags")
                .select("*")
                .order("usage_count", false)
                .limit(limit),
        )
        .await
    }
}
