use super::model::{now_rfc3339, Review};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A worktree's review session, persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub worktree_path: String,
    pub branch: String,
    #[serde(default)]
    pub review: Option<Review>,
    pub last_accessed: String,
}

impl Workspace {
    pub fn new(worktree_path: &str, branch: &str) -> Self {
        Workspace {
            id: workspace_id(worktree_path),
            worktree_path: worktree_path.to_string(),
            branch: branch.to_string(),
            review: None,
            last_accessed: now_rfc3339(),
        }
    }
}

/// Stable id for a worktree: the first 16 hex chars of SHA-256 over its path
pub fn workspace_id(worktree_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(worktree_path.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    hash[..16].to_string()
}

/// JSON file holding every known workspace
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    path: PathBuf,
}

impl WorkspaceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        WorkspaceStore { path: path.into() }
    }

    /// `<data_dir>/vibechecker/workspaces.json`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dir.join("vibechecker").join("workspaces.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored workspaces. A missing or unreadable file reads as empty.
    pub fn load_all(&self) -> Vec<Workspace> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("Failed to read {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(workspaces) => workspaces,
            Err(e) => {
                log::warn!("Ignoring corrupt workspace file {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    pub fn load(&self, worktree_path: &str) -> Option<Workspace> {
        self.load_all()
            .into_iter()
            .find(|w| w.worktree_path == worktree_path)
    }

    /// Stored workspace for `worktree_path`, or a fresh one (not yet saved)
    pub fn load_or_create(&self, worktree_path: &str, branch: &str) -> Workspace {
        match self.load(worktree_path) {
            Some(mut ws) => {
                ws.branch = branch.to_string();
                ws
            }
            None => Workspace::new(worktree_path, branch),
        }
    }

    /// Stamp `last_accessed` and insert or replace by id
    pub fn save(&self, workspace: &mut Workspace) -> Result<()> {
        workspace.last_accessed = now_rfc3339();
        let mut all = self.load_all();
        match all.iter_mut().find(|w| w.id == workspace.id) {
            Some(existing) => *existing = workspace.clone(),
            None => all.push(workspace.clone()),
        }
        self.write_all(&all)
    }

    /// Remove a workspace by id. Returns whether one was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut all = self.load_all();
        let before = all.len();
        all.retain(|w| w.id != id);
        if all.len() == before {
            return Ok(false);
        }
        self.write_all(&all)?;
        Ok(true)
    }

    /// Drop workspaces not accessed within `retention_days`. Returns how many were dropped.
    pub fn cleanup(&self, retention_days: u32) -> Result<usize> {
        let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(retention_days));
        let all = self.load_all();
        let before = all.len();
        let kept: Vec<Workspace> = all
            .into_iter()
            .filter(|w| match chrono::DateTime::parse_from_rfc3339(&w.last_accessed) {
                Ok(at) => at > cutoff,
                Err(_) => {
                    log::debug!("Dropping workspace {} with bad timestamp", w.id);
                    false
                }
            })
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.write_all(&kept)?;
        }
        Ok(removed)
    }

    fn write_all(&self, workspaces: &[Workspace]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(workspaces)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}
