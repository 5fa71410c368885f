//! User Profile Store
//!
//! Profiles collected by onboarding, persisted as a single JSON file
//! keyed by user id. Loading tolerates a missing or corrupt file (it
//! starts empty); saving is best-effort and logs rather than fails, so a
//! full disk never takes the bot down.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One user's attunement data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Birth year.
    pub year: i32,
    /// Birth month (1-12).
    pub month: u8,
    /// Birth day (1-31).
    pub day: u8,
    /// Free-form location.
    pub location: String,
}

/// File-backed profile map.
pub struct ProfileStore {
    path: PathBuf,
    profiles: Mutex<HashMap<String, UserProfile>>,
}

impl ProfileStore {
    /// Open (or start) the store at `path`. A missing or unreadable file
    /// yields an empty store.
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        let profiles = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "corrupt profile file, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            profiles: Mutex::new(profiles),
        }
    }

    /// Look up a user's profile.
    #[must_use]
    pub fn get(&self, user_id: i64) -> Option<UserProfile> {
        self.profiles.lock().get(&user_id.to_string()).cloned()
    }

    /// Whether a user has completed onboarding.
    #[must_use]
    pub fn is_complete(&self, user_id: i64) -> bool {
        self.profiles.lock().contains_key(&user_id.to_string())
    }

    /// Store a profile and persist the map, best-effort.
    pub fn set(&self, user_id: i64, profile: UserProfile) {
        let snapshot = {
            let mut profiles = self.profiles.lock();
            profiles.insert(user_id.to_string(), profile);
            profiles.clone()
        };
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "failed to create profile directory");
                return;
            }
        }
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    tracing::warn!(path = %self.path.display(), error = %e, "failed to save profiles");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize profiles"),
        }
    }

    /// Number of stored profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.lock().len()
    }

    /// Whether the store holds no profiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UserProfile {
        UserProfile {
            year: 1990,
            month: 4,
            day: 17,
            location: "Ulan Bator".to_string(),
        }
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::open(dir.path().join("prefs.json"));
        assert!(store.is_empty());
        assert!(!store.is_complete(1));
    }

    #[test]
    fn set_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let store = ProfileStore::open(path.clone());
        store.set(42, sample());
        assert!(store.is_complete(42));

        let reopened = ProfileStore::open(path);
        assert_eq!(reopened.get(42), Some(sample()));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "not json at all {").unwrap();

        let store = ProfileStore::open(path);
        assert!(store.is_empty());
    }

    #[test]
    fn profile_round_trips_through_json() {
        let profile = sample();
        let json = serde_json::to_string(&profile).unwrap();
        let parsed: UserProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, profile);
    }
}
