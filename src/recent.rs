//! Recent search history over an injected key-value store.
//!
//! The list is loaded once when the search view is created and written back
//! after every change.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;

const RECENT_KEY: &str = "recent_searches";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Minimal persistence capability: string values under string keys.
pub trait KeyValueStore: Send {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// One JSON object on disk, e.g. `~/.config/agoratui/state.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config/agoratui/state.json")
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut all = self.read_all()?;
        all.insert(key.to_owned(), value.to_owned());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&all)?)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Most-recent-first list of distinct queries.
pub struct RecentSearches {
    store: Box<dyn KeyValueStore>,
    entries: Vec<String>,
    limit: usize,
}

impl RecentSearches {
    /// Load the persisted list; a corrupt or unreadable entry starts empty.
    pub fn load(store: Box<dyn KeyValueStore>, limit: usize) -> Self {
        let entries = match store.load(RECENT_KEY) {
            Ok(Some(json)) => serde_json::from_str::<Vec<String>>(&json).unwrap_or_else(|e| {
                tracing::warn!("discarding unreadable recent searches: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("could not load recent searches: {e}");
                Vec::new()
            }
        };
        let mut recent = Self {
            store,
            entries,
            limit,
        };
        recent.entries.truncate(limit);
        recent
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn record(&mut self, query: &str) -> Result<(), StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }
        self.entries.retain(|q| q != query);
        self.entries.insert(0, query.to_owned());
        self.entries.truncate(self.limit);
        self.persist()
    }

    pub fn remove(&mut self, query: &str) -> Result<(), StoreError> {
        self.entries.retain(|q| q != query);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        self.persist()
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.entries)?;
        self.store.save(RECENT_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_moves_duplicates_to_front_and_caps() {
        let mut recent = RecentSearches::load(Box::new(MemoryStore::default()), 3);
        for q in ["rust", "tokio", "serde", "rust", "axum"] {
            recent.record(q).unwrap();
        }
        assert_eq!(recent.entries(), ["axum", "rust", "serde"]);
    }

    #[test]
    fn blank_queries_are_ignored() {
        let mut recent = RecentSearches::load(Box::new(MemoryStore::default()), 5);
        recent.record("   ").unwrap();
        assert!(recent.entries().is_empty());
    }

    #[test]
    fn file_store_round_trips_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state.json");

        let mut recent = RecentSearches::load(Box::new(FileStore::new(path.clone())), 5);
        recent.record("القاهرة").unwrap();
        recent.record("rust").unwrap();

        let reloaded = RecentSearches::load(Box::new(FileStore::new(path.clone())), 5);
        assert_eq!(reloaded.entries(), ["rust", "القاهرة"]);

        let mut reloaded = reloaded;
        reloaded.remove("rust").unwrap();
        reloaded.clear().unwrap();
        let empty = RecentSearches::load(Box::new(FileStore::new(path)), 5);
        assert!(empty.entries().is_empty());
    }

    #[test]
    fn corrupt_value_starts_empty() {
        let mut store = MemoryStore::default();
        store.save(RECENT_KEY, "not json").unwrap();
        let recent = RecentSearches::load(Box::new(store), 5);
        assert!(recent.entries().is_empty());
    }
}
