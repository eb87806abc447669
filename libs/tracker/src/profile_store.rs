use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfilesFile {
    #[serde(default)]
    profiles: Vec<String>,
}

/// File-backed list of monitored social profiles.
///
/// The file is `{"profiles": [...]}` and is always rewritten whole. A missing
/// or unreadable file reads as an empty list.
pub struct ProfileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn normalize(username: &str) -> String {
        username.trim().trim_start_matches('@').to_string()
    }

    /// Current list; never fails.
    pub async fn load(&self) -> Vec<String> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read profile list");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<ProfilesFile>(&raw) {
            Ok(file) => file.profiles,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "profile list is not valid JSON");
                Vec::new()
            }
        }
    }

    /// Replace the whole list.
    pub async fn save(&self, profiles: &[String]) -> Result<(), Error> {
        let file = ProfilesFile {
            profiles: profiles.to_vec(),
        };
        let body = serde_json::to_vec_pretty(&file)?;
        tokio::fs::write(&self.path, body)
            .await
            .with_context(|| format!("writing {}", self.path.display()))
    }

    /// Add a profile.
    /// Returns true if it was newly added
    pub async fn add(&self, username: &str) -> Result<bool, Error> {
        let username = Self::normalize(username);
        let _guard = self.write_lock.lock().await;

        let mut profiles = self.load().await;
        if profiles.contains(&username) {
            return Ok(false);
        }
        profiles.push(username);
        self.save(&profiles).await?;
        Ok(true)
    }

    /// Remove a profile.
    /// Returns true if it existed
    pub async fn remove(&self, username: &str) -> Result<bool, Error> {
        let username = Self::normalize(username);
        let _guard = self.write_lock.lock().await;

        let mut profiles = self.load().await;
        let before = profiles.len();
        profiles.retain(|p| *p != username);
        if profiles.len() == before {
            return Ok(false);
        }
        self.save(&profiles).await?;
        Ok(true)
    }
}
