use crate::api::query::{Query, sanitize_pattern};
use crate::api::types::Profile;
use crate::api::{ApiClientError, BackendClient};

impl BackendClient {
    pub async fn get_profile(&self, user_id: &str) -> Result<Profile, ApiClientError> {
        self.select_one(&Query::from("profiles").select("*").eq("id", user_id), "profile")
            .await
    }

    pub async fn get_profile_by_username(&self, username: &str) -> Result<Profile, ApiClientError> {
        let username = username.trim_start_matches('@');
        self.select_one(
            &Query::from("profiles").select("*").eq("username", username),
            &format!("user @{username}"),
        )
        .await
    }

    /// Profiles for a set of ids, in no particular order.
    pub async fn get_profiles(&self, ids: &[String]) -> Result<Vec<Profile>, ApiClientError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(&Query::from("profiles").select("*").in_list("id", ids))
            .await
    }

    pub async fn get_my_profile(&self) -> Result<Profile, ApiClientError> {
        self.get_profile(self.my_id()?).await
    }

    /// Profiles whose username or full name contains `text`.
    pub async fn search_users(&self, text: &str, limit: u32) -> Result<Vec<Profile>, ApiClientError> {
        let needle = sanitize_pattern(text);
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            &Query::from("profiles")
                .select("*")
                .any_of(&[
                    format!("username.ilike.*{needle}*"),
                    format!("full_name.ilike.*{needle}*"),
                ])
                .limit(limit),
        )
        .await
    }

    /// Accounts the user does not follow yet, newest first.
    pub async fn suggested_users(&self, limit: u32) -> Result<Vec<Profile>, ApiClientError> {
        let mut query = Query::from("profiles").select("*");
        let mut excluded = Vec::new();
        if let Ok(me) = self.my_id() {
            query = query.neq("id", me);
            excluded = self.following_ids(me).await?;
        }
        let fetch = limit.saturating_add(u32::try_from(excluded.len()).unwrap_or(u32::MAX));
        let profiles: Vec<Profile> = self.select(&query.order("created_at", false).limit(fetch)).await?;
        Ok(profiles
            .into_iter()
            .filter(|p| !excluded.contains(&p.id))
            .take(limit as usize)
            .collect())
    }
}
