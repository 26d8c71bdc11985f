use serde::{Deserialize, Serialize};

use crate::api::query::Query;
use crate::api::types::{Comment, Post};
use crate::api::{ApiClientError, BackendClient};

/// Columns for a post card: author, like and reaction holders, comment count.
pub(crate) const POST_SELECT: &str = "*,
    profiles(id, username, full_name, avatar_url),
    likes(user_id),
    reactions(user_id, reaction_type),
    comments(count)";

const COMMENT_SELECT: &str = "*, profiles(id, username, full_name, avatar_url)";

/// Home feed tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeedTab {
    #[default]
    All,
    Following,
}

impl FeedTab {
    pub fn label(self) -> &'static str {
        match self {
            FeedTab::All => "All",
            FeedTab::Following => "Following",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            FeedTab::All => FeedTab::Following,
            FeedTab::Following => FeedTab::All,
        }
    }
}

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    user_id: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    post_id: &'a str,
    user_id: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct FollowingRow {
    following_id: String,
}

impl BackendClient {
    /// Newest posts, either from everyone or from the user and the accounts
    /// they follow.
    pub async fn get_feed(&self, tab: FeedTab, limit: u32) -> Result<Vec<Post>, ApiClientError> {
        let mut query = Query::from("posts").select(POST_SELECT);
        if tab == FeedTab::Following {
            let me = self.my_id()?;
            let mut ids = self.following_ids(me).await?;
            ids.push(me.to_owned());
            query = query.in_list("user_id", ids);
        }
        self.select(&query.order("created_at", false).limit(limit)).await
    }

    /// Ids of the accounts `user_id` follows.
    pub async fn following_ids(&self, user_id: &str) -> Result<Vec<String>, ApiClientError> {
        let rows: Vec<FollowingRow> = self
            .select(
                &Query::from("follows")
                    .select("following_id")
                    .eq("follower_id", user_id),
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.following_id).collect())
    }

    pub async fn get_post(&self, post_id: &str) -> Result<Post, ApiClientError> {
        self.select_one(
            &Query::from("posts").select(POST_SELECT).eq("id", post_id),
            "post",
        )
        .await
    }

    pub async fn get_user_posts(&self, user_id: &str, limit: u32) -> Result<Vec<Post>, ApiClientError> {
        self.select(
            &Query::from("posts")
                .select(POST_SELECT)
                .eq("user_id", user_id)
                .order("created_at", false)
                .limit(limit),
        )
        .await
    }

    /// Posts whose content contains `text`, newest first.
    pub async fn search_posts(&self, text: &str, limit: u32) -> Result<Vec<Post>, ApiClientError> {
        self.select(
            &Query::from("posts")
                .select(POST_SELECT)
                .contains("content", text)
                .order("created_at", false)
                .limit(limit),
        )
        .await
    }

    /// Posts created at or after `since`, used by the explore view.
    pub async fn get_recent_posts(
        &self,
        since: chrono::DateTime<chrono::Utc>,
        limit: u32,
    ) -> Result<Vec<Post>, ApiClientError> {
        self.select(
            &Query::from("posts")
                .select(POST_SELECT)
                .gte("created_at", since.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
                .order("created_at", false)
                .limit(limit),
        )
        .await
    }

    /// Publish a post. `content` must already be validated.
    pub async fn create_post(&self, content: &str) -> Result<Post, ApiClientError> {
        let body = NewPost {
            user_id: self.my_id()?,
            content,
        };
        let created: Vec<Post> = self.insert("posts", &body).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| ApiClientError::NotFound("created post".to_owned()))
    }

    /// Comments on a post, oldest first.
    pub async fn get_comments(&self, post_id: &str) -> Result<Vec<Comment>, ApiClientError> {
        self.select(
            &Query::from("comments")
                .select(COMMENT_SELECT)
                .eq("post_id", post_id)
                .order("created_at", true),
        )
        .await
    }

    pub async fn add_comment(&self, post_id: &str, content: &str) -> Result<(), ApiClientError> {
        let body = NewComment {
            post_id,
            user_id: self.my_id()?,
            content,
        };
        self.insert_quiet("comments", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_query_shape() {
        let q = Query::from("posts")
            .select(POST_SELECT)
            .in_list("user_id", ["a", "b"])
            .order("created_at", false)
            .limit(20);
        assert_eq!(
            q.to_query_string(),
            "select=*,profiles(id,username,full_name,avatar_url),likes(user_id),\
             reactions(user_id,reaction_type),comments(count)\
             &user_id=in.(a,b)&order=created_at.desc&limit=20"
        );
    }

    #[test]
    fn feed_tab_toggles() {
        assert_eq!(FeedTab::All.toggled(), FeedTab::Following);
        assert_eq!(FeedTab::Following.toggled().label(), "All");
    }
}
