use super::anchor::Anchor;
use super::locate::Side;
use crate::git::GitInfo;
use serde::{Deserialize, Serialize};

/// Current time as an RFC 3339 UTC timestamp
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ── Comment ──

/// A reviewer annotation anchored to one line or a contiguous range within one hunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: String,
    pub file_path: String,
    pub hunk_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line_new: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line_old: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line_new: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line_old: Option<usize>,
    /// Snapshot of the anchored text, used when the hunk can no longer be found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_content: Option<String>,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub resolved: bool,
    pub created_at: String,
}

impl Comment {
    /// Side the anchor lives on: new if a new-side start is set, else old
    pub fn side(&self) -> Option<Side> {
        if self.start_line_new.is_some() {
            Some(Side::New)
        } else if self.start_line_old.is_some() {
            Some(Side::Old)
        } else {
            None
        }
    }

    pub fn start_line(&self) -> Option<usize> {
        match self.side()? {
            Side::New => self.start_line_new,
            Side::Old => self.start_line_old,
        }
    }

    /// End of a range comment, on the same side as the start
    pub fn end_line(&self) -> Option<usize> {
        match self.side()? {
            Side::New => self.end_line_new,
            Side::Old => self.end_line_old,
        }
    }

    pub fn is_range(&self) -> bool {
        self.end_line().is_some()
    }

    /// "Line 4", "Lines 4-9", with an "(old)" suffix for old-side anchors
    pub fn line_label(&self) -> Option<String> {
        let start = self.start_line()?;
        let label = match self.end_line() {
            Some(end) if end != start => format!("Lines {}-{}", start, end),
            _ => format!("Line {}", start),
        };
        Some(match self.side() {
            Some(Side::Old) => format!("{} (old)", label),
            _ => label,
        })
    }
}

// ── Review ──

/// A review session: comments in insertion order plus diff provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub review_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_uncommitted_changes: Option<bool>,
    pub created_at: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Raw diff the session was built from, so it can be reloaded without git
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_text: Option<String>,
}

impl Default for Review {
    fn default() -> Self {
        Self::new()
    }
}

impl Review {
    pub fn new() -> Self {
        Review {
            review_id: format!("review_{}", uuid::Uuid::new_v4().simple()),
            repo: None,
            base_ref: None,
            head_ref: None,
            base_commit: None,
            head_commit: None,
            has_uncommitted_changes: None,
            created_at: now_rfc3339(),
            comments: Vec::new(),
            diff_text: None,
        }
    }

    /// Refresh provenance from git. Id, creation time and comments are kept.
    pub fn apply_git_info(&mut self, info: &GitInfo) {
        self.repo = Some(info.repo.clone());
        self.base_ref = Some(info.base_branch.clone());
        self.head_ref = Some(info.current_branch.clone());
        self.base_commit = non_empty(&info.base_commit);
        self.head_commit = non_empty(&info.head_commit);
        self.has_uncommitted_changes = Some(info.has_uncommitted_changes);
    }

    /// Create a comment at `anchor`. Empty bodies are rejected.
    pub fn add_comment(&mut self, anchor: Anchor, body: &str, tags: Vec<String>) -> Option<&Comment> {
        let body = body.trim();
        if body.is_empty() {
            return None;
        }

        let mut unique_tags: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !unique_tags.contains(&tag) {
                unique_tags.push(tag);
            }
        }

        self.comments.push(Comment {
            comment_id: format!("comment_{}", uuid::Uuid::new_v4().simple()),
            file_path: anchor.file_path,
            hunk_id: anchor.hunk_id,
            start_line_new: anchor.start_line_new,
            start_line_old: anchor.start_line_old,
            end_line_new: anchor.end_line_new,
            end_line_old: anchor.end_line_old,
            line_content: Some(anchor.line_content),
            comment: body.to_string(),
            tags: unique_tags,
            resolved: false,
            created_at: now_rfc3339(),
        });
        self.comments.last()
    }

    /// Flip the resolved flag. Returns the new value, or None for an unknown id.
    pub fn toggle_resolved(&mut self, comment_id: &str) -> Option<bool> {
        let comment = self
            .comments
            .iter_mut()
            .find(|c| c.comment_id == comment_id)?;
        comment.resolved = !comment.resolved;
        Some(comment.resolved)
    }

    pub fn delete_comment(&mut self, comment_id: &str) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| c.comment_id != comment_id);
        self.comments.len() != before
    }

    /// Full comment id for an exact id or an unambiguous prefix of one
    pub fn resolve_comment_id(&self, prefix: &str) -> Option<&str> {
        if let Some(c) = self.comments.iter().find(|c| c.comment_id == prefix) {
            return Some(&c.comment_id);
        }
        let mut matches = self
            .comments
            .iter()
            .filter(|c| !prefix.is_empty() && c.comment_id.starts_with(prefix));
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(&first.comment_id)
    }

    pub fn resolved_count(&self) -> usize {
        self.comments.iter().filter(|c| c.resolved).count()
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor_new(line: usize) -> Anchor {
        Anchor {
            file_path: "x.ts".to_string(),
            hunk_id: "h1".to_string(),
            start_line_new: Some(line),
            line_content: "new".to_string(),
            ..Anchor::default()
        }
    }

    #[test]
    fn add_comment_assigns_identity() {
        let mut review = Review::new();
        let c = review
            .add_comment(anchor_new(2), "  looks off  ", vec!["bug".into(), "bug".into()])
            .unwrap();
        assert!(c.comment_id.starts_with("comment_"));
        assert_eq!(c.comment, "looks off");
        assert_eq!(c.tags, vec!["bug".to_string()]);
        assert!(!c.resolved);
        assert_eq!(c.line_content.as_deref(), Some("new"));
        assert!(chrono::DateTime::parse_from_rfc3339(&c.created_at).is_ok());
    }

    #[test]
    fn empty_body_is_rejected() {
        let mut review = Review::new();
        assert!(review.add_comment(anchor_new(2), "   ", vec![]).is_none());
        assert!(review.comments.is_empty());
    }

    #[test]
    fn toggle_and_delete() {
        let mut review = Review::new();
        let id = review
            .add_comment(anchor_new(2), "a", vec![])
            .unwrap()
            .comment_id
            .clone();
        assert_eq!(review.toggle_resolved(&id), Some(true));
        assert_eq!(review.resolved_count(), 1);
        assert_eq!(review.toggle_resolved(&id), Some(false));
        assert_eq!(review.toggle_resolved("nope"), None);
        assert!(review.delete_comment(&id));
        assert!(!review.delete_comment(&id));
    }

    #[test]
    fn comments_keep_insertion_order() {
        let mut review = Review::new();
        review.add_comment(anchor_new(9), "first", vec![]);
        review.add_comment(anchor_new(1), "second", vec![]);
        let bodies: Vec<&str> = review.comments.iter().map(|c| c.comment.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    #[test]
    fn resolve_id_by_prefix() {
        let mut review = Review::new();
        let id = review
            .add_comment(anchor_new(2), "a", vec![])
            .unwrap()
            .comment_id
            .clone();
        assert_eq!(review.resolve_comment_id(&id), Some(id.as_str()));
        assert_eq!(review.resolve_comment_id(&id[..14]), Some(id.as_str()));
        assert_eq!(review.resolve_comment_id("zzz"), None);

        review.add_comment(anchor_new(3), "b", vec![]);
        // "comment_" is shared by both
        assert_eq!(review.resolve_comment_id("comment_"), None);
    }

    #[test]
    fn apply_git_info_keeps_comments() {
        let mut review = Review::new();
        review.add_comment(anchor_new(2), "keep me", vec![]);
        let id = review.review_id.clone();
        review.apply_git_info(&GitInfo {
            current_branch: "feature".into(),
            base_branch: "main".into(),
            repo: "git@example.com:org/repo.git".into(),
            head_commit: "abc".into(),
            base_commit: String::new(),
            has_uncommitted_changes: true,
        });
        assert_eq!(review.review_id, id);
        assert_eq!(review.comments.len(), 1);
        assert_eq!(review.head_ref.as_deref(), Some("feature"));
        assert_eq!(review.base_commit, None);
        assert_eq!(review.has_uncommitted_changes, Some(true));
    }

    #[test]
    fn line_labels() {
        let mut review = Review::new();
        let single = review.add_comment(anchor_new(4), "a", vec![]).unwrap().clone();
        assert_eq!(single.line_label().as_deref(), Some("Line 4"));

        let range = Anchor {
            start_line_old: Some(3),
            end_line_old: Some(6),
            ..Anchor::default()
        };
        let range = review.add_comment(range, "b", vec![]).unwrap().clone();
        assert!(range.is_range());
        assert_eq!(range.line_label().as_deref(), Some("Lines 3-6 (old)"));
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let mut review = Review::new();
        review.add_comment(anchor_new(2), "a", vec![]);
        let json = serde_json::to_value(&review).unwrap();
        let comment = &json["comments"][0];
        assert_eq!(comment["start_line_new"], 2);
        assert!(comment.get("end_line_new").is_none());
        assert!(comment.get("tags").is_none());
        assert!(json.get("repo").is_none());
    }
}
