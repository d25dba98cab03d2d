// Session persistence: a single JSON file in the user's home directory
// carries the bearer/refresh tokens and the pagination cursors across
// invocations, so every fresh process behaves as if it held a live
// session.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

const SESSION_FILE: &str = ".beagle_session";

/// The on-disk session state. Exactly these four fields are persisted;
/// empty token strings mean "never authenticated".
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecord {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub prev_cursor: Option<String>,
}

/// Owns the session file. Every mutator rewrites the whole file before
/// returning, so a subsequent process always reads the mutated state.
pub struct SessionStore {
    path: PathBuf,
    record: SessionRecord,
}

impl SessionStore {
    /// Open the session store at its per-user default location.
    pub fn open() -> Result<Self> {
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::load(dir.join(SESSION_FILE))
    }

    /// Load the record from `path`, creating the file with empty
    /// defaults on first use. An unreadable or corrupt file is a fatal
    /// startup error.
    pub fn load(path: PathBuf) -> Result<Self> {
        if path.exists() {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session file {}", path.display()))?;
            let record = serde_json::from_str(&data)
                .with_context(|| format!("Corrupt session file {}", path.display()))?;
            Ok(SessionStore { path, record })
        } else {
            let store = SessionStore {
                path,
                record: SessionRecord::default(),
            };
            store.save()?;
            Ok(store)
        }
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn set_access_token(&mut self, token: &str) -> Result<()> {
        self.record.access_token = token.to_string();
        self.save()
    }

    pub fn set_refresh_token(&mut self, token: &str) -> Result<()> {
        self.record.refresh_token = token.to_string();
        self.save()
    }

    /// Refresh both cursors from a list-response envelope. A missing or
    /// null `next`/`previous` field clears the corresponding cursor.
    pub fn update_cursors(&mut self, page: &Value) -> Result<()> {
        self.record.next_cursor = page
            .get("next")
            .and_then(Value::as_str)
            .map(str::to_string);
        self.record.prev_cursor = page
            .get("previous")
            .and_then(Value::as_str)
            .map(str::to_string);
        self.save()
    }

    fn save(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.record)?;
        fs::write(&self.path, data)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SessionStore {
        SessionStore::load(dir.path().join(SESSION_FILE)).unwrap()
    }

    #[test]
    fn first_use_creates_file_with_empty_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(dir.path().join(SESSION_FILE).exists());
        assert_eq!(*store.record(), SessionRecord::default());
    }

    #[test]
    fn mutations_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.set_access_token("abc").unwrap();
        store.set_refresh_token("def").unwrap();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.record().access_token, "abc");
        assert_eq!(reloaded.record().refresh_token, "def");
    }

    #[test]
    fn cursors_follow_envelope_fields() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let page = json!({"next": "http://host/page2", "results": []});
        store.update_cursors(&page).unwrap();
        assert_eq!(
            store.record().next_cursor.as_deref(),
            Some("http://host/page2")
        );
        assert_eq!(store.record().prev_cursor, None);

        // A null field clears just like an absent one.
        let page = json!({"next": null, "previous": "http://host/page1"});
        store.update_cursors(&page).unwrap();
        assert_eq!(store.record().next_cursor, None);
        assert_eq!(
            store.record().prev_cursor.as_deref(),
            Some("http://host/page1")
        );

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.record().prev_cursor.as_deref(), Some("http://host/page1"));
    }

    #[test]
    fn corrupt_file_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SESSION_FILE);
        std::fs::write(&path, "not json").unwrap();
        assert!(SessionStore::load(path).is_err());
    }
}
