use anyhow::{Context, Result};
use serde::Serialize;
use std::process::Command;

/// A git worktree entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Worktree {
    pub path: String,
    pub branch: String,
    pub commit: String,
    /// The first entry git lists is the main worktree
    pub is_main: bool,
}

/// Local and remote branch names
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Branches {
    pub local: Vec<String>,
    pub remote: Vec<String>,
    /// Union of both, sorted and deduplicated
    pub all: Vec<String>,
}

/// Provenance of the diff under review
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GitInfo {
    pub current_branch: String,
    pub base_branch: String,
    /// Remote URL of origin, or "local"
    pub repo: String,
    pub head_commit: String,
    /// Empty when the base cannot be resolved
    pub base_commit: String,
    pub has_uncommitted_changes: bool,
}

/// Run git in `repo_root`, returning trimmed stdout or failing with stderr
fn run_git(repo_root: &str, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()
        .context(format!("Failed to run git in '{}'", repo_root))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Like `run_git`, but a failure is only logged
fn probe_git(repo_root: &str, args: &[&str]) -> Option<String> {
    match run_git(repo_root, args) {
        Ok(out) => Some(out),
        Err(e) => {
            log::debug!("{:#}", e);
            None
        }
    }
}

// ── Repo Info ──

/// Get the repository root directory for a specific path
pub fn get_repo_root_in(dir: &str) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(dir)
        .output()
        .context(format!("Failed to run git in '{}'", dir))?;

    if !output.status.success() {
        anyhow::bail!("Not a git repository: {}", dir);
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Get current branch for a specific repo root. Detached HEAD reads as "HEAD".
pub fn get_current_branch_in(repo_root: &str) -> Result<String> {
    run_git(repo_root, &["rev-parse", "--abbrev-ref", "HEAD"])
        .context("Failed to determine current branch")
}

/// Auto-detect the base branch: origin's default branch, then well-known
/// remote branches, then local ones. Falls back to "master".
pub fn detect_base_branch_in(repo_root: &str) -> Result<String> {
    let run = |args: &[&str]| probe_git(repo_root, args).filter(|s| !s.is_empty());

    if let Some(head) = run(&["symbolic-ref", "refs/remotes/origin/HEAD"]) {
        if let Some(branch) = head.strip_prefix("refs/remotes/origin/") {
            return Ok(branch.to_string());
        }
    }

    for candidate in ["main", "master"] {
        if run(&["rev-parse", "--verify", "--quiet", &format!("refs/remotes/origin/{}", candidate)])
            .is_some()
        {
            return Ok(candidate.to_string());
        }
    }

    for candidate in ["main", "master", "develop"] {
        if run(&["rev-parse", "--verify", "--quiet", &format!("refs/heads/{}", candidate)])
            .is_some()
        {
            return Ok(candidate.to_string());
        }
    }

    Ok("master".to_string())
}

/// Resolve `base` to a commit, preferring the remote-tracking ref
fn resolve_base(repo_root: &str, base: &str) -> Option<String> {
    let remote = format!("origin/{}", base);
    [remote.as_str(), base].iter().find_map(|rev| {
        probe_git(
            repo_root,
            &["rev-parse", "--verify", "--quiet", &format!("{}^{{commit}}", rev)],
        )
        .filter(|s| !s.is_empty())
    })
}

/// Remote URL of origin, if any
pub fn remote_url(repo_root: &str) -> Option<String> {
    probe_git(repo_root, &["config", "--get", "remote.origin.url"]).filter(|s| !s.is_empty())
}

pub fn has_uncommitted_changes(repo_root: &str) -> Result<bool> {
    let status = run_git(repo_root, &["status", "--porcelain"])?;
    Ok(!status.is_empty())
}

/// Collect branch, commit and remote provenance. `base` overrides detection.
pub fn git_info(repo_root: &str, base: Option<&str>) -> Result<GitInfo> {
    let current_branch = get_current_branch_in(repo_root)?;
    let base_branch = match base {
        Some(b) => b.to_string(),
        None => detect_base_branch_in(repo_root)?,
    };
    Ok(GitInfo {
        repo: remote_url(repo_root).unwrap_or_else(|| "local".to_string()),
        head_commit: probe_git(repo_root, &["rev-parse", "HEAD"]).unwrap_or_default(),
        base_commit: resolve_base(repo_root, &base_branch).unwrap_or_default(),
        has_uncommitted_changes: has_uncommitted_changes(repo_root)?,
        current_branch,
        base_branch,
    })
}

// ── Diff ──

/// Raw diff of the working tree against the point where HEAD forked from `base`.
///
/// Diffing the merge-base against the working tree yields committed and
/// uncommitted changes as one diff with a single hunk per region. Without a
/// merge-base only uncommitted changes are returned.
pub fn git_diff_raw(base: &str, repo_root: &str, context_lines: usize) -> Result<String> {
    let unified = format!("--unified={}", context_lines);
    let fork = resolve_base(repo_root, base)
        .and_then(|commit| probe_git(repo_root, &["merge-base", &commit, "HEAD"]))
        .filter(|s| !s.is_empty());

    let from = match fork {
        Some(ref commit) => commit.as_str(),
        None => {
            log::warn!("No merge-base with '{}', showing uncommitted changes only", base);
            "HEAD"
        }
    };

    let output = Command::new("git")
        .args(["diff", from, &unified, "--no-color", "--no-ext-diff"])
        .current_dir(repo_root)
        .output()
        .context("Failed to run git diff")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git diff failed: {}", stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

// ── Branches ──

/// List local and remote branches
pub fn list_branches(repo_root: &str) -> Result<Branches> {
    let local = run_git(repo_root, &["branch", "--format=%(refname:short)"])?;
    let remote = probe_git(repo_root, &["branch", "-r", "--format=%(refname:short)"]).unwrap_or_default();
    Ok(parse_branches(&local, &remote))
}

fn parse_branches(local: &str, remote: &str) -> Branches {
    let names = |s: &str| -> Vec<String> {
        s.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.ends_with("/HEAD"))
            .map(str::to_string)
            .collect()
    };
    let local = names(local);
    let remote = names(remote);
    let mut all: Vec<String> = local.iter().chain(remote.iter()).cloned().collect();
    all.sort();
    all.dedup();
    Branches { local, remote, all }
}

// ── Worktrees ──

/// List all git worktrees for the repo
pub fn list_worktrees(repo_root: &str) -> Result<Vec<Worktree>> {
    let stdout = run_git(repo_root, &["worktree", "list", "--porcelain"])
        .context("Failed to list worktrees")?;
    Ok(parse_worktrees(&stdout))
}

fn parse_worktrees(porcelain: &str) -> Vec<Worktree> {
    let mut worktrees: Vec<Worktree> = Vec::new();

    for line in porcelain.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            worktrees.push(Worktree {
                path: path.to_string(),
                branch: String::new(),
                commit: String::new(),
                is_main: worktrees.is_empty(),
            });
            continue;
        }
        let Some(current) = worktrees.last_mut() else {
            continue;
        };
        if let Some(commit) = line.strip_prefix("HEAD ") {
            current.commit = commit.to_string();
        } else if let Some(branch) = line.strip_prefix("branch ") {
            current.branch = branch.strip_prefix("refs/heads/").unwrap_or(branch).to_string();
        }
    }

    for wt in &mut worktrees {
        if wt.branch.is_empty() {
            wt.branch = "(detached)".to_string();
        }
    }
    worktrees
}
