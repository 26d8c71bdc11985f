//! Password sign-in, token refresh and the persisted session.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;
use super::credentials::{BackendCredentials, PasswordCredentials};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Persisted session data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

impl Session {
    pub fn expires_soon(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: SessionUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            user: self.user,
        }
    }
}

fn session_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config/agoratui/session.json")
}

pub fn save_session(session: &Session) -> Result<(), AuthError> {
    let path = session_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(session)?;
    std::fs::write(&path, json)?;
    Ok(())
}

pub fn load_session() -> Result<Option<Session>, AuthError> {
    let path = session_path();
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(&path)?;
    let session: Session = serde_json::from_str(&json)?;
    Ok(Some(session))
}

pub fn clear_session() -> Result<(), AuthError> {
    let path = session_path();
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}

async fn token_request(
    http: &reqwest::Client,
    creds: &BackendCredentials,
    grant_type: &str,
    body: serde_json::Value,
) -> Result<Session, AuthError> {
    let resp = http
        .post(creds.auth_url(&format!("/token?grant_type={grant_type}")))
        .header("apikey", &creds.anon_key)
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            detail,
        });
    }

    let token: TokenResponse = resp.json().await?;
    Ok(token.into_session())
}

pub async fn sign_in_with_password(
    http: &reqwest::Client,
    creds: &BackendCredentials,
    password: &PasswordCredentials,
) -> Result<Session, AuthError> {
    let session = token_request(
        http,
        creds,
        "password",
        serde_json::json!({ "email": password.email, "password": password.password }),
    )
    .await?;
    tracing::info!(user = %session.user.id, "signed in");
    Ok(session)
}

pub async fn refresh(
    http: &reqwest::Client,
    creds: &BackendCredentials,
    refresh_token: &str,
) -> Result<Session, AuthError> {
    token_request(
        http,
        creds,
        "refresh_token",
        serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await
}

/// Revoke the session server-side. The local file is removed regardless.
pub async fn sign_out(
    http: &reqwest::Client,
    creds: &BackendCredentials,
    session: &Session,
) -> Result<(), AuthError> {
    let result = http
        .post(creds.auth_url("/logout"))
        .header("apikey", &creds.anon_key)
        .bearer_auth(&session.access_token)
        .send()
        .await;
    clear_session()?;
    let resp = result?;
    if !resp.status().is_success() {
        tracing::warn!(status = resp.status().as_u16(), "server-side sign out failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_becomes_session() {
        let json = r#"{
            "access_token": "at",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "rt",
            "user": {"id": "u1", "email": "amal@example.com", "role": "authenticated"}
        }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        let session = token.into_session();
        assert_eq!(session.user.id, "u1");
        assert!(!session.expires_soon(Duration::seconds(60)));
        assert!(session.expires_soon(Duration::hours(2)));
    }
}
