use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to load .env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
    #[error("no backend configured; set AGORA_URL and AGORA_ANON_KEY in env or .env")]
    NoCredentials,
    #[error("invalid backend URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Project URL and public (anon) key of the hosted backend.
#[derive(Debug, Clone)]
pub struct BackendCredentials {
    pub url: String,
    pub anon_key: String,
}

impl BackendCredentials {
    pub fn new(url: &str, anon_key: &str) -> Result<Self, CredentialError> {
        let parsed = url::Url::parse(url).map_err(|e| CredentialError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CredentialError::InvalidUrl {
                url: url.to_owned(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        Ok(Self {
            url: url.trim_end_matches('/').to_owned(),
            anon_key: anon_key.to_owned(),
        })
    }

    /// `<url>/rest/v1/<collection>`
    pub fn rest_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{collection}", self.url)
    }

    /// `<url>/auth/v1<path>`
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{path}", self.url)
    }
}

/// Email/password pair used for non-interactive sign-in.
#[derive(Debug, Clone)]
pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
}

/// Return candidate .env paths in priority order.
fn env_file_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config/agoratui/.env"));
    }
    paths.push(PathBuf::from(".env"));
    paths
}

/// Load .env files without overwriting variables already in the environment.
pub fn load_env_files() {
    for path in env_file_paths() {
        if path.exists()
            && let Err(e) = dotenvy::from_path(&path)
        {
            tracing::warn!(path = %path.display(), "ignoring unreadable .env file: {e}");
        }
    }
}

fn get(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Load backend credentials, trying .env files first.
///
/// Priority: environment > ~/.config/agoratui/.env > cwd .env
pub fn load_credentials() -> Result<BackendCredentials, CredentialError> {
    load_env_files();
    match (get("AGORA_URL"), get("AGORA_ANON_KEY")) {
        (Some(url), Some(key)) => BackendCredentials::new(&url, &key),
        _ => Err(CredentialError::NoCredentials),
    }
}

/// `AGORA_EMAIL` / `AGORA_PASSWORD`, if both are set.
pub fn load_password() -> Option<PasswordCredentials> {
    Some(PasswordCredentials {
        email: get("AGORA_EMAIL")?,
        password: get("AGORA_PASSWORD")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_endpoint_urls() {
        let creds = BackendCredentials::new("https://demo.example.co/", "anon").unwrap();
        assert_eq!(creds.rest_url("posts"), "https://demo.example.co/rest/v1/posts");
        assert_eq!(
            creds.auth_url("/token?grant_type=password"),
            "https://demo.example.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(BackendCredentials::new("not a url", "k").is_err());
        assert!(BackendCredentials::new("ftp://host", "k").is_err());
    }
}
