pub mod engagement;
pub mod hashtags;
pub mod messages;
pub mod notifications;
pub mod posts;
pub mod profiles;
pub mod query;
pub mod stories;
pub mod types;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::auth::credentials::BackendCredentials;
use crate::auth::session::{self, Session};
use crate::auth::AuthError;
use query::Query;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error (status {status}): {detail}")]
    ApiError { status: u16, detail: String },
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    #[error("deserialization error: {0}")]
    Deserialize(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("sign in required")]
    SignInRequired,
    #[error("refusing to {0} without a filter")]
    Unfiltered(&'static str),
}

// ---------------------------------------------------------------------------
// API client
// ---------------------------------------------------------------------------

/// Client for the hosted backend's REST collections.
///
/// Reads and writes go through `/rest/v1/<collection>`; the session's access
/// token authorizes the user so row-level security applies.
pub struct BackendClient {
    http_client: reqwest::Client,
    credentials: BackendCredentials,
    session: Option<Session>,
}

impl BackendClient {
    pub fn new(credentials: BackendCredentials, session: Option<Session>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            credentials,
            session,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The signed-in user's id.
    pub fn my_id(&self) -> Result<&str, ApiClientError> {
        self.session
            .as_ref()
            .map(|s| s.user.id.as_str())
            .ok_or(ApiClientError::SignInRequired)
    }

    /// Refresh the session if it is within 60 seconds of expiry.
    pub async fn refresh_if_needed(&mut self) -> Result<(), ApiClientError> {
        let Some(ref current) = self.session else {
            return Ok(());
        };
        if !current.expires_soon(chrono::Duration::seconds(60)) {
            return Ok(());
        }
        let refreshed =
            session::refresh(&self.http_client, &self.credentials, &current.refresh_token).await?;
        session::save_session(&refreshed)?;
        tracing::info!(user = %refreshed.user.id, "session refreshed");
        self.session = Some(refreshed);
        Ok(())
    }

    fn headers(&self) -> Result<HeaderMap, ApiClientError> {
        let token = self
            .session
            .as_ref()
            .map_or(self.credentials.anon_key.as_str(), |s| s.access_token.as_str());
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.credentials.anon_key)
                .map_err(|e| AuthError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(
            reqwest::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| AuthError::InvalidHeader(e.to_string()))?,
        );
        Ok(headers)
    }

    fn request(&self, method: Method, query: &Query) -> Result<RequestBuilder, ApiClientError> {
        let qs = query.to_query_string();
        let mut url = self.credentials.rest_url(query.collection());
        if !qs.is_empty() {
            url.push('?');
            url.push_str(&qs);
        }
        tracing::debug!(%method, %url, "backend request");
        Ok(self
            .http_client
            .request(method, &url)
            .headers(self.headers()?))
    }

    /// Fetch rows matching `query`.
    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, ApiClientError> {
        let resp = self.request(Method::GET, query)?.send().await?;
        self.handle_response(resp).await
    }

    /// Fetch exactly one row, or `NotFound`.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        query: &Query,
        what: &str,
    ) -> Result<T, ApiClientError> {
        let rows: Vec<T> = self.select(&query.clone().limit(1)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiClientError::NotFound(what.to_owned()))
    }

    /// Insert and return the stored rows.
    pub async fn insert<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        collection: &str,
        body: &B,
    ) -> Result<Vec<T>, ApiClientError> {
        let resp = self
            .request(Method::POST, &Query::from(collection))?
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    /// Insert without reading the rows back.
    pub async fn insert_quiet<B: Serialize + ?Sized>(
        &self,
        collection: &str,
        body: &B,
    ) -> Result<(), ApiClientError> {
        let resp = self
            .request(Method::POST, &Query::from(collection))?
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        self.check_status(resp).await
    }

    /// Insert or replace on the unique key named by `query.on_conflict`.
    pub async fn upsert<B: Serialize + ?Sized>(&self, query: &Query, body: &B) -> Result<(), ApiClientError> {
        let resp = self
            .request(Method::POST, query)?
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(body)
            .send()
            .await?;
        self.check_status(resp).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, query: &Query, body: &B) -> Result<(), ApiClientError> {
        if !query.has_filters() {
            return Err(ApiClientError::Unfiltered("update"));
        }
        let resp = self
            .request(Method::PATCH, query)?
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        self.check_status(resp).await
    }

    pub async fn delete(&self, query: &Query) -> Result<(), ApiClientError> {
        if !query.has_filters() {
            return Err(ApiClientError::Unfiltered("delete"));
        }
        let resp = self.request(Method::DELETE, query)?.send().await?;
        self.check_status(resp).await
    }

    /// Count matching rows by fetching only their ids.
    pub async fn count(&self, query: &Query) -> Result<u64, ApiClientError> {
        let rows: Vec<serde_json::Value> = self.select(&query.clone().select("id")).await?;
        Ok(rows.len() as u64)
    }

    async fn check_status(&self, resp: Response) -> Result<(), ApiClientError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiClientError::ApiError {
                status: status.as_u16(),
                detail: body,
            });
        }
        Ok(())
    }

    /// Check status and deserialize the body.
    async fn handle_response<T: DeserializeOwned>(&self, resp: Response) -> Result<T, ApiClientError> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiClientError::ApiError {
                status: status.as_u16(),
                detail: body,
            });
        }

        let body = resp.text().await?;
        serde_json::from_str::<T>(&body)
            .map_err(|e| ApiClientError::Deserialize(format!("{e}: {body}")))
    }
}
