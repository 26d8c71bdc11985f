use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_tick_rate")]
    pub tick_rate_fps: f64,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default)]
    pub default_view: DefaultView,
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: u32,
    #[serde(default = "default_story_slide_secs")]
    pub story_slide_secs: f64,
    #[serde(default = "default_story_tick_ms")]
    pub story_tick_ms: u64,
    #[serde(default = "default_story_lifetime_hours")]
    pub story_lifetime_hours: i64,
    #[serde(default = "default_recent_search_limit")]
    pub recent_search_limit: usize,
    #[serde(default = "default_max_post_chars")]
    pub max_post_chars: usize,
    #[serde(default = "default_notification_refresh_secs")]
    pub notification_refresh_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultView {
    #[default]
    Feed,
    Explore,
    Notifications,
    Messages,
    Search,
}

fn default_tick_rate() -> f64 {
    30.0
}

fn default_page_size() -> u32 {
    20
}

fn default_suggestion_limit() -> u32 {
    5
}

fn default_story_slide_secs() -> f64 {
    5.0
}

fn default_story_tick_ms() -> u64 {
    50
}

fn default_story_lifetime_hours() -> i64 {
    24
}

fn default_recent_search_limit() -> usize {
    10
}

fn default_max_post_chars() -> usize {
    500
}

fn default_notification_refresh_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_rate_fps: default_tick_rate(),
            default_page_size: default_page_size(),
            default_view: DefaultView::default(),
            suggestion_limit: default_suggestion_limit(),
            story_slide_secs: default_story_slide_secs(),
            story_tick_ms: default_story_tick_ms(),
            story_lifetime_hours: default_story_lifetime_hours(),
            recent_search_limit: default_recent_search_limit(),
            max_post_chars: default_max_post_chars(),
            notification_refresh_secs: default_notification_refresh_secs(),
        }
    }
}

impl AppConfig {
    pub fn story_tick(&self) -> Duration {
        Duration::from_millis(self.story_tick_ms.max(1))
    }

    /// Fraction of a slide covered by one story tick.
    pub fn story_tick_delta(&self) -> f64 {
        let slide_ms = (self.story_slide_secs * 1000.0).max(1.0);
        self.story_tick().as_millis() as f64 / slide_ms
    }

    pub fn story_lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(self.story_lifetime_hours.max(1))
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/agoratui/config.toml"))
}

pub fn load_config() -> AppConfig {
    let Some(path) = config_path() else {
        return AppConfig::default();
    };

    let Ok(contents) = fs::read_to_string(&path) else {
        return AppConfig::default();
    };

    match toml::from_str(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), "invalid config, using defaults: {e}");
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str("default_view = \"explore\"\nstory_slide_secs = 2.0").unwrap();
        assert_eq!(config.default_view, DefaultView::Explore);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.suggestion_limit, 5);
        assert!((config.story_tick_delta() - 0.025).abs() < 1e-9);
    }

    #[test]
    fn default_story_tick_covers_one_percent() {
        let config = AppConfig::default();
        assert!((config.story_tick_delta() - 0.01).abs() < 1e-9);
        assert_eq!(config.story_lifetime(), chrono::Duration::hours(24));
    }
}
