use super::context::extract;
use super::model::{Comment, Review};
use crate::git::ParsedFile;
use anyhow::{Context, Result};

/// Pretty-printed JSON of the whole review, comments included
pub fn export_json(review: &Review) -> Result<String> {
    serde_json::to_string_pretty(review).context("Failed to serialize review")
}

/// Suggested file name for a JSON export
pub fn export_file_name(review: &Review) -> String {
    format!("vibechecker-review-{}.json", review.review_id)
}

/// Render the review as a Markdown document.
///
/// Comments are grouped by file in order of first appearance; each one shows
/// its line label, a diff excerpt from `files`, the body, tags and status.
pub fn export_markdown(review: &Review, files: &[ParsedFile]) -> String {
    let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());

    let mut out = String::new();
    out.push_str("# Review Export - vibechecker\n\n");
    out.push_str(&format!("**Repository:** `{}`\n", na(&review.repo)));
    out.push_str(&format!("**Base:** `{}`\n", na(&review.base_ref)));
    out.push_str(&format!("**Head:** `{}`\n", na(&review.head_ref)));
    if let Some(ref commit) = review.head_commit {
        out.push_str(&format!("**Head Commit:** `{}`\n", short_sha(commit)));
    }
    if review.has_uncommitted_changes == Some(true) {
        out.push_str("**Includes uncommitted changes**\n");
    }
    out.push_str(&format!("**Review ID:** `{}`\n", review.review_id));
    out.push_str(&format!("**Created:** {}\n", review.created_at));
    out.push_str(&format!("**Total Comments:** {}\n\n---\n", review.comments.len()));

    let groups = group_by_file(&review.comments);
    for (path, comments) in &groups {
        out.push_str(&format!("\n## File: `{}`\n\n", path));
        for comment in comments {
            write_comment(&mut out, files, comment);
        }
    }

    out.push_str("## Summary\n\n");
    out.push_str(&format!("- **Files reviewed:** {}\n", groups.len()));
    out.push_str(&format!("- **Total comments:** {}\n", review.comments.len()));
    out.push_str(&format!(
        "- **Resolved:** {} / {}\n",
        review.resolved_count(),
        review.comments.len()
    ));
    out
}

fn write_comment(out: &mut String, files: &[ParsedFile], comment: &Comment) {
    if let Some(label) = comment.line_label() {
        out.push_str(&format!("**{}**\n\n", label));
    }
    out.push_str(&format!("```diff\n{}\n```\n\n", extract(files, comment)));
    out.push_str(&format!("{}\n\n", comment.comment));
    if !comment.tags.is_empty() {
        out.push_str(&format!("**Tags:** {}\n", comment.tags.join(", ")));
    }
    let status = if comment.resolved {
        "[x] resolved"
    } else {
        "[ ] unresolved"
    };
    out.push_str(&format!("**Status:** {}\n\n---\n\n", status));
}

/// Comments grouped by file path, files in order of first appearance
fn group_by_file(comments: &[Comment]) -> Vec<(&str, Vec<&Comment>)> {
    let mut groups: Vec<(&str, Vec<&Comment>)> = Vec::new();
    for comment in comments {
        match groups.iter_mut().find(|(path, _)| *path == comment.file_path) {
            Some((_, list)) => list.push(comment),
            None => groups.push((&comment.file_path, vec![comment])),
        }
    }
    groups
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
