use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What survives a restart: the listener's volume and mute switch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistentState {
    pub volume: f32,
    #[serde(default)]
    pub muted: bool,
}

impl PersistentState {
    pub fn with_volume(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
            muted: false,
        }
    }
}

/// JSON-backed session file.
pub struct SessionStore {
    state_file: PathBuf,
}

impl SessionStore {
    pub fn new(state_file: PathBuf) -> Self {
        Self { state_file }
    }

    pub fn path(&self) -> &Path {
        &self.state_file
    }

    /// Stored session, or `default_volume` unmuted if the file is missing or
    /// unreadable.
    pub fn load(&self, default_volume: f32) -> PersistentState {
        if let Ok(content) = std::fs::read_to_string(&self.state_file) {
            match serde_json::from_str::<PersistentState>(&content) {
                Ok(mut persistent) => {
                    persistent.volume = persistent.volume.clamp(0.0, 1.0);
                    return persistent;
                }
                Err(e) => {
                    tracing::warn!("ignoring unreadable session {}: {}", self.state_file.display(), e)
                }
            }
        }
        PersistentState::with_volume(default_volume)
    }

    pub async fn save(&self, persistent: &PersistentState) -> anyhow::Result<()> {
        if let Some(parent) = self.state_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(persistent)?;
        tokio::fs::write(&self.state_file, json).await?;
        Ok(())
    }
}
