use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::debug;

use crate::app_state::Snapshot;

/// スナップショットをJSONファイルとして保存・読み込みする。
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// スナップショットを読み込む。ファイルがなければ空の状態を返す。
    pub fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            debug!("No state file at {}", self.path.display());
            return Ok(Snapshot::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state at {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse state at {}", self.path.display()))?;
        Ok(snapshot)
    }

    /// スナップショットを保存する。親ディレクトリがなければ作成する。
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(snapshot).context("Failed to serialize state")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write state at {}", self.path.display()))?;
        debug!("Saved {} timers to {}", snapshot.timers.len(), self.path.display());
        Ok(())
    }
}
