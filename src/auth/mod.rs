//! Authentication against the hosted backend.
//!
//! Credentials name the project; the session carries the signed-in user's
//! tokens and is persisted between runs.

pub mod credentials;
pub mod session;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential error: {0}")]
    Credential(#[from] credentials::CredentialError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("auth rejected (status {status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(String),
    #[error("not signed in; run `agoratui login`")]
    NotSignedIn,
}

