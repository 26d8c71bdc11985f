use serde_json::json;

use crate::api::query::Query;
use crate::api::types::Notification;
use crate::api::{ApiClientError, BackendClient};

impl BackendClient {
    /// The signed-in user's notifications, newest first.
    pub async fn get_notifications(&self, limit: u32) -> Result<Vec<Notification>, ApiClientError> {
        self.select(
            &Query::from("notifications")
                .select("*")
                .eq("user_id", self.my_id()?)
                .order("created_at", false)
                .limit(limit),
        )
        .await
    }

    pub async fn unread_notification_count(&self) -> Result<u64, ApiClientError> {
        self.count(
            &Query::from("notifications")
                .eq("user_id", self.my_id()?)
                .eq("read", false),
        )
        .await
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<(), ApiClientError> {
        self.update(
            &Query::from("notifications")
                .eq("id", notification_id)
                .eq("user_id", self.my_id()?),
            &json!({ "read": true }),
        )
        .await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), ApiClientError> {
        self.update(
            &Query::from("notifications")
                .eq("user_id", self.my_id()?)
                .eq("read", false),
            &json!({ "read": true }),
        )
        .await
    }
}
