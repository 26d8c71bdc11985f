use std::io::{BufRead, Write};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, eyre};
use serde::Serialize;

use crate::api::BackendClient;
use crate::api::posts::FeedTab;
use crate::api::types::Post;
use crate::auth::credentials::{PasswordCredentials, load_credentials, load_password};
use crate::auth::session;
use crate::config::load_config;
use crate::interaction::reactions::{Category, ReactionKind};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "agoratui", about = "TUI and CLI for the Agora social network")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Launch the interactive TUI (default)
    Tui,
    /// Sign in with email and password and save the session
    Login {
        /// Account email (defaults to AGORA_EMAIL)
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out and remove the saved session
    Logout,
    /// Fetch the home feed (JSONL)
    Feed {
        #[arg(long, value_enum, default_value_t = FeedTab::All)]
        tab: FeedTab,
    },
    /// List active stories in playback order (JSONL)
    Stories,
    /// Search users and posts (JSONL)
    Search {
        /// Search text; a leading # searches tagged posts only
        query: String,
    },
    /// Suggest hashtags for a prefix (JSONL)
    Tags {
        /// Tag prefix, with or without #
        prefix: String,
    },
    /// Look up a user profile (JSONL)
    User {
        /// Username (with or without @)
        username: String,
    },
    /// Fetch your notifications (JSONL)
    Notifications,
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

/// A post with its engagement summarised, for JSONL output.
#[derive(Serialize)]
struct PostRecord<'a> {
    post: &'a Post,
    likes: u32,
    reactions: Vec<ReactionTally>,
    comments: u64,
}

#[derive(Serialize)]
struct ReactionTally {
    kind: ReactionKind,
    emoji: &'static str,
    count: u32,
}

fn post_record(post: &Post) -> PostRecord<'_> {
    let counts = post.reaction_counts();
    PostRecord {
        post,
        likes: post.like_count().total(),
        reactions: ReactionKind::ALL
            .iter()
            .map(|&kind| ReactionTally {
                kind,
                emoji: kind.emoji(),
                count: counts.get(kind),
            })
            .filter(|t| t.count > 0)
            .collect(),
        comments: post.comment_count(),
    }
}

fn print_line<T: Serialize>(value: &T) -> eyre::Result<()> {
    let line = serde_json::to_string(value)?;
    println!("{line}");
    Ok(())
}

fn print_posts(posts: &[Post]) -> eyre::Result<()> {
    for post in posts {
        print_line(&post_record(post))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Client construction (shared with main.rs TUI path)
// ---------------------------------------------------------------------------

/// Build a `BackendClient` from env credentials and the saved session, if any.
/// Returns an error if no backend credentials are found.
pub fn build_api_client() -> eyre::Result<BackendClient> {
    let creds = load_credentials()?;
    let session = session::load_session().unwrap_or_else(|e| {
        tracing::warn!("ignoring unreadable session: {e}");
        None
    });
    if session.is_none() {
        eprintln!("Hint: Run `agoratui login` to sign in. Browsing as a guest.");
    }
    Ok(BackendClient::new(creds, session))
}

// ---------------------------------------------------------------------------
// Session commands
// ---------------------------------------------------------------------------

fn prompt(label: &str) -> eyre::Result<String> {
    eprint!("{label}: ");
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().to_owned())
}

/// Password sign-in. Email and password come from the environment when set,
/// otherwise from stdin.
pub async fn run_login(email: Option<String>) -> eyre::Result<()> {
    let creds = load_credentials()?;
    let from_env = load_password();
    let email = match email.or_else(|| from_env.as_ref().map(|p| p.email.clone())) {
        Some(email) => email,
        None => prompt("Email")?,
    };
    let password = match from_env {
        Some(p) => p.password,
        None => prompt("Password")?,
    };
    if email.is_empty() || password.is_empty() {
        return Err(eyre!("email and password are required"));
    }

    let http = reqwest::Client::new();
    let signed_in =
        session::sign_in_with_password(&http, &creds, &PasswordCredentials { email, password })
            .await
            .map_err(|e| eyre!("Sign in failed: {e}"))?;
    session::save_session(&signed_in)?;

    let fallback = signed_in.user.email.clone().unwrap_or_else(|| signed_in.user.id.clone());
    let client = BackendClient::new(creds, Some(signed_in));
    let who = match client.get_my_profile().await {
        Ok(profile) => format!("@{}", profile.username),
        Err(e) => {
            tracing::warn!("profile lookup after sign in failed: {e}");
            fallback
        }
    };
    println!("Signed in as {who}. Session saved to ~/.config/agoratui/session.json");
    Ok(())
}

pub async fn run_logout() -> eyre::Result<()> {
    let Some(current) = session::load_session()? else {
        println!("Not signed in.");
        return Ok(());
    };
    let creds = load_credentials()?;
    session::sign_out(&reqwest::Client::new(), &creds, &current).await?;
    println!("Signed out.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Command execution
// ---------------------------------------------------------------------------

pub async fn run_command(cmd: CliCommand) -> eyre::Result<()> {
    let mut client = build_api_client()?;
    if let Err(e) = client.refresh_if_needed().await {
        tracing::warn!("session refresh failed: {e}");
    }
    let config = load_config();
    let limit = config.default_page_size;

    match cmd {
        CliCommand::Tui | CliCommand::Login { .. } | CliCommand::Logout => {
            unreachable!("tui, login and logout are handled in main")
        }

        CliCommand::Feed { tab } => {
            let posts = client.get_feed(tab, limit).await?;
            print_posts(&posts)?;
        }

        CliCommand::Stories => {
            let rows = client.get_active_stories(chrono::Utc::now()).await?;
            for row in crate::app::order_story_rows(rows, chrono::Utc::now()) {
                print_line(&row)?;
            }
        }

        CliCommand::Search { query } => {
            if !query.starts_with('#') {
                for user in client.search_users(&query, limit).await? {
                    print_line(&serde_json::json!({ "user": user }))?;
                }
            }
            print_posts(&client.search_posts(&query, limit).await?)?;
        }

        CliCommand::Tags { prefix } => {
            for tag in client.suggest_hashtags(&prefix, config.suggestion_limit).await? {
                print_line(&tag)?;
            }
        }

        CliCommand::User { username } => {
            let profile = client.get_profile_by_username(&username).await?;
            let followers = client.follower_count(&profile.id).await?;
            let following = client.following_count(&profile.id).await?;
            print_line(&serde_json::json!({
                "user": profile,
                "followers": followers,
                "following": following,
            }))?;
        }

        CliCommand::Notifications => {
            for notification in client.get_notifications(limit).await? {
                print_line(&notification)?;
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{CountRef, ReactionRef, UserRef};

    #[test]
    fn parses_feed_tab() {
        let cli = Cli::try_parse_from(["agoratui", "feed", "--tab", "following"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(CliCommand::Feed {
                tab: FeedTab::Following
            })
        ));
    }

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["agoratui"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn search_requires_query() {
        assert!(Cli::try_parse_from(["agoratui", "search"]).is_err());
    }

    #[test]
    fn post_record_summarises_engagement() {
        let post = Post {
            id: "p1".into(),
            user_id: "u1".into(),
            content: "hi #rust".into(),
            image_url: None,
            video_url: None,
            created_at: None,
            profiles: None,
            likes: vec![UserRef { user_id: "u2".into() }],
            reactions: vec![
                ReactionRef {
                    user_id: "u2".into(),
                    reaction_type: ReactionKind::Wow,
                },
                ReactionRef {
                    user_id: "u3".into(),
                    reaction_type: ReactionKind::Wow,
                },
            ],
            comments: vec![CountRef { count: 4 }],
        };
        let value = serde_json::to_value(post_record(&post)).unwrap();
        assert_eq!(value["likes"], 1);
        assert_eq!(value["comments"], 4);
        assert_eq!(value["reactions"][0]["kind"], "wow");
        assert_eq!(value["reactions"][0]["count"], 2);
        assert_eq!(value["reactions"].as_array().unwrap().len(), 1);
    }
}
