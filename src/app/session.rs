use crate::config::{load_config, VcConfig};
use crate::git::{self, parse_diff, GitInfo, ParsedFile};
use crate::review::anchor::{anchor_selection, select_lines};
use crate::review::locate::Side;
use crate::review::{Comment, Review, Workspace, WorkspaceStore};
use anyhow::{Context, Result};
use std::path::Path;

/// One worktree's review state: config, persisted workspace and the review inside it
pub struct Session {
    pub repo_root: String,
    pub config: VcConfig,
    pub store: WorkspaceStore,
    pub workspace: Workspace,
}

impl Session {
    /// Open the session for the repository containing `dir`.
    /// Outside a git repository the directory itself is used, so pasted diffs still work.
    pub fn open(dir: &str) -> Result<Self> {
        let (repo_root, branch) = match git::get_repo_root_in(dir) {
            Ok(root) => {
                let branch = git::get_current_branch_in(&root).unwrap_or_else(|e| {
                    log::debug!("{:#}", e);
                    "HEAD".to_string()
                });
                (root, branch)
            }
            Err(e) => {
                log::debug!("{:#}", e);
                let abs = std::fs::canonicalize(dir)
                    .with_context(|| format!("No such directory: {}", dir))?;
                (abs.to_string_lossy().to_string(), "(no branch)".to_string())
            }
        };

        let config = load_config(&repo_root);
        let store_path = match config.storage.path {
            Some(ref p) => p.clone(),
            None => WorkspaceStore::default_path()?,
        };
        Ok(Self::open_with(
            repo_root,
            &branch,
            config,
            WorkspaceStore::new(store_path),
        ))
    }

    pub fn open_with(repo_root: String, branch: &str, config: VcConfig, store: WorkspaceStore) -> Self {
        let workspace = store.load_or_create(&repo_root, branch);
        Session {
            repo_root,
            config,
            store,
            workspace,
        }
    }

    pub fn review(&self) -> Option<&Review> {
        self.workspace.review.as_ref()
    }

    /// The workspace review, created empty on first use
    pub fn review_mut(&mut self) -> &mut Review {
        self.workspace.review.get_or_insert_with(Review::new)
    }

    /// Fetch the diff from git against `base` (or the configured/detected base)
    /// and store it in the review. Returns the number of files.
    pub fn load_git(&mut self, base: Option<&str>) -> Result<usize> {
        let base = base.or(self.config.diff.base_branch.as_deref());
        let info = git::git_info(&self.repo_root, base)?;
        let raw = git::git_diff_raw(&info.base_branch, &self.repo_root, self.config.diff.context_lines)?;
        self.load_text(raw, Some(&info))
    }

    /// Store pasted or generated diff text in the review. Existing comments are kept.
    pub fn load_text(&mut self, raw: String, info: Option<&GitInfo>) -> Result<usize> {
        let count = parse_diff(&raw).len();
        if count == 0 {
            anyhow::bail!("No files found in diff");
        }
        let review = self.review_mut();
        if let Some(info) = info {
            review.apply_git_info(info);
        }
        review.diff_text = Some(raw);
        Ok(count)
    }

    /// Files of the stored diff, parsed fresh
    pub fn files(&self) -> Vec<ParsedFile> {
        self.review()
            .and_then(|r| r.diff_text.as_deref())
            .map(parse_diff)
            .unwrap_or_default()
    }

    /// Anchor a new comment on lines `start..=end` of `path`
    pub fn add_comment(
        &mut self,
        path: &str,
        side: Side,
        start: usize,
        end: usize,
        body: &str,
        tags: Vec<String>,
    ) -> Result<Comment> {
        let files = self.files();
        if files.is_empty() {
            anyhow::bail!("No diff loaded; run `vck load` first");
        }
        let file = files
            .iter()
            .find(|f| f.matches_path(path))
            .ok_or_else(|| anyhow::anyhow!("File not in diff: {}", path))?;

        let selection = select_lines(file, side, start, end)?;
        let anchor = anchor_selection(file, &selection, Some(side))?;
        self.review_mut()
            .add_comment(anchor, body, tags)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Comment text is empty"))
    }

    /// Full id for an exact id or unique prefix, with or without the `comment_` prefix
    pub fn resolve_comment_id(&self, id: &str) -> Result<String> {
        let review = self.review().context("No review in this workspace")?;
        review
            .resolve_comment_id(id)
            .or_else(|| review.resolve_comment_id(&format!("comment_{}", id)))
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("No unique comment matches '{}'", id))
    }

    pub fn save(&mut self) -> Result<()> {
        self.store.save(&mut self.workspace)
    }

    pub fn store_path(&self) -> &Path {
        self.store.path()
    }
}
