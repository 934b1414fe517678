//! Binding comments to diff lines.
//!
//! A comment is attached to exactly one rendered line: its start line for a
//! single-line comment, its end line for a range. Range membership is a
//! separate question used for highlighting every line a range covers.

use super::hunk_id::hunk_id;
use super::locate::{find_change, line_on, Side};
use super::model::Comment;
use crate::git::{Change, Chunk, ParsedFile};
use thiserror::Error;

// ── Matching ──

/// Whether `comment` is rendered under `change` in the hunk identified by `hunk_id`
pub fn is_attached(comment: &Comment, hunk_id: &str, change: &Change) -> bool {
    if comment.hunk_id != hunk_id {
        return false;
    }
    let Some(line) = comment.side().and_then(|side| line_on(change, side)) else {
        return false;
    };
    match comment.end_line() {
        Some(end) => end == line,
        None => comment.start_line() == Some(line),
    }
}

/// Whether `change` falls inside a range comment (inclusive, same side)
pub fn in_range(comment: &Comment, hunk_id: &str, change: &Change) -> bool {
    if comment.hunk_id != hunk_id {
        return false;
    }
    let Some(line) = comment.side().and_then(|side| line_on(change, side)) else {
        return false;
    };
    match (comment.start_line(), comment.end_line()) {
        (Some(start), Some(end)) => start <= line && line <= end,
        _ => false,
    }
}

/// Comments to render under `change`, in review order
pub fn attached<'a>(comments: &'a [Comment], hunk_id: &str, change: &Change) -> Vec<&'a Comment> {
    comments
        .iter()
        .filter(|c| is_attached(c, hunk_id, change))
        .collect()
}

/// Whether any range comment covers `change`
pub fn covered_by_range(comments: &[Comment], hunk_id: &str, change: &Change) -> bool {
    comments.iter().any(|c| in_range(c, hunk_id, change))
}

// ── Creation ──

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    #[error("no hunk with id {0} in this file")]
    UnknownHunk(String),
    #[error("a selection must stay within one hunk")]
    CrossesHunks,
    #[error("line index {index} is outside the hunk ({len} lines)")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("line index {index} has no {side} line number")]
    MissingLine { index: usize, side: Side },
}

/// Anchor fields for a comment about to be created
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Anchor {
    pub file_path: String,
    pub hunk_id: String,
    pub start_line_new: Option<usize>,
    pub start_line_old: Option<usize>,
    pub end_line_new: Option<usize>,
    pub end_line_old: Option<usize>,
    /// Newline-joined content of every selected line
    pub line_content: String,
}

/// One end of a selection: a change index inside a hunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub hunk_id: String,
    pub index: usize,
}

/// A user selection. `start` is where it began, `end` where it was released;
/// either may come first in the hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub start: Point,
    pub end: Point,
}

impl Selection {
    pub fn line(hunk_id: &str, index: usize) -> Self {
        Self::range(hunk_id, index, index)
    }

    pub fn range(hunk_id: &str, start: usize, end: usize) -> Self {
        Selection {
            start: Point {
                hunk_id: hunk_id.to_string(),
                index: start,
            },
            end: Point {
                hunk_id: hunk_id.to_string(),
                index: end,
            },
        }
    }
}

/// Compute anchor fields for a selection within `file`.
///
/// The side comes from `side`, or else from the change the selection started
/// on (deletions anchor on the old side, everything else on the new side).
/// Indices are normalised so start precedes end; a one-line selection yields a
/// single-line anchor with no end fields.
pub fn anchor_selection(
    file: &ParsedFile,
    selection: &Selection,
    side: Option<Side>,
) -> Result<Anchor, AnchorError> {
    if selection.start.hunk_id != selection.end.hunk_id {
        return Err(AnchorError::CrossesHunks);
    }

    let file_path = file.path();
    let chunk = find_chunk(file, &selection.start.hunk_id)
        .ok_or_else(|| AnchorError::UnknownHunk(selection.start.hunk_id.clone()))?;

    let len = chunk.changes.len();
    for index in [selection.start.index, selection.end.index] {
        if index >= len {
            return Err(AnchorError::IndexOutOfBounds { index, len });
        }
    }

    let side = side.unwrap_or_else(|| Side::of(&chunk.changes[selection.start.index]));
    let lo = selection.start.index.min(selection.end.index);
    let hi = selection.start.index.max(selection.end.index);

    let line_at = |index: usize| {
        line_on(&chunk.changes[index], side).ok_or(AnchorError::MissingLine { index, side })
    };
    let start_line = line_at(lo)?;
    let end_line = if lo == hi { None } else { Some(line_at(hi)?) };

    let line_content = chunk.changes[lo..=hi]
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let mut anchor = Anchor {
        file_path: file_path.to_string(),
        hunk_id: selection.start.hunk_id.clone(),
        line_content,
        ..Anchor::default()
    };
    match side {
        Side::New => {
            anchor.start_line_new = Some(start_line);
            anchor.end_line_new = end_line;
        }
        Side::Old => {
            anchor.start_line_old = Some(start_line);
            anchor.end_line_old = end_line;
        }
    }
    Ok(anchor)
}

/// Build a selection from file line numbers on one side.
///
/// Both lines must land in the same hunk; otherwise the selection would cross
/// a hunk boundary and is rejected.
pub fn select_lines(
    file: &ParsedFile,
    side: Side,
    start: usize,
    end: usize,
) -> Result<Selection, AnchorError> {
    let path = file.path();
    let locate = |line: usize| {
        file.chunks.iter().find_map(|chunk| {
            find_change(chunk, side, line).map(|index| Point {
                hunk_id: hunk_id(path, chunk),
                index,
            })
        })
    };
    let missing = |line: usize| AnchorError::UnknownHunk(format!("{} line {} of {}", side, line, path));

    let start = locate(start).ok_or_else(|| missing(start))?;
    let end = locate(end).ok_or_else(|| missing(end))?;
    if start.hunk_id != end.hunk_id {
        return Err(AnchorError::CrossesHunks);
    }
    Ok(Selection { start, end })
}

/// First chunk of `file` whose recomputed id is `id`
pub fn find_chunk<'a>(file: &'a ParsedFile, id: &str) -> Option<&'a Chunk> {
    let path = file.path();
    file.chunks.iter().find(|c| hunk_id(path, c) == id)
}

// ── Re-identification ──

/// Where a stored comment lands in a reloaded diff
#[derive(Debug, Clone, PartialEq)]
pub enum Relocation {
    /// The comment's hunk still exists
    Unchanged,
    /// The anchored text was found in another hunk
    Relocated {
        hunk_id: String,
        start: usize,
        end: Option<usize>,
    },
    /// Neither the hunk nor the anchored text can be found
    Lost,
}

impl Relocation {
    /// Display copy of `comment` at its current position. The stored comment is not touched.
    pub fn view(&self, comment: &Comment) -> Option<Comment> {
        match self {
            Relocation::Unchanged => Some(comment.clone()),
            Relocation::Relocated {
                hunk_id,
                start,
                end,
            } => {
                let side = comment.side()?;
                let mut moved = comment.clone();
                moved.hunk_id = hunk_id.clone();
                match side {
                    Side::New => {
                        moved.start_line_new = Some(*start);
                        moved.end_line_new = *end;
                    }
                    Side::Old => {
                        moved.start_line_old = Some(*start);
                        moved.end_line_old = *end;
                    }
                }
                Some(moved)
            }
            Relocation::Lost => None,
        }
    }
}

/// Find `comment` in a reloaded version of its file.
///
/// The hunk id is tried first. Failing that, every hunk is searched for a run
/// of lines on the comment's side whose text equals the stored snapshot; the
/// run nearest the original start line wins.
pub fn relocate(comment: &Comment, file: &ParsedFile) -> Relocation {
    if find_chunk(file, &comment.hunk_id).is_some() {
        return Relocation::Unchanged;
    }
    let (Some(side), Some(snapshot)) = (comment.side(), comment.line_content.as_deref()) else {
        return Relocation::Lost;
    };

    let wanted: Vec<&str> = snapshot.split('\n').collect();
    let span = wanted.len();
    let original = comment.start_line();
    let path = file.path();

    // (distance from original start, hunk id, start, end)
    let mut best: Option<(usize, String, usize, Option<usize>)> = None;

    for chunk in &file.chunks {
        if chunk.changes.len() < span {
            continue;
        }
        for lo in 0..=chunk.changes.len() - span {
            let window = &chunk.changes[lo..lo + span];
            if !window.iter().zip(&wanted).all(|(c, w)| c.content == *w) {
                continue;
            }
            let Some(start) = line_on(&window[0], side) else {
                continue;
            };
            let end = if span > 1 {
                match line_on(&window[span - 1], side) {
                    Some(end) => Some(end),
                    None => continue,
                }
            } else {
                None
            };

            let distance = original.map_or(0, |o| o.abs_diff(start));
            if best.as_ref().map_or(true, |(d, ..)| distance < *d) {
                best = Some((distance, hunk_id(path, chunk), start, end));
            }
        }
    }

    match best {
        Some((_, hunk_id, start, end)) => Relocation::Relocated {
            hunk_id,
            start,
            end,
        },
        None => Relocation::Lost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::parse_diff;
    use crate::review::model::Review;

    const ONE_LINE: &str = "diff --git a/x.ts b/x.ts\nindex 1111111..2222222 100644\n--- a/x.ts\n+++ b/x.ts\n@@ -1,3 +1,3 @@\n first\n-old\n+new\n third\n";

    const TWO_HUNKS: &str = r#"diff --git a/lib.rs b/lib.rs
--- a/lib.rs
+++ b/lib.rs
@@ -1,6 +1,7 @@
 -use std::io;
+use std::io::{self, Write};
+use std::path::Path;

 fn a() {}
 fn b() {}
 fn c() {}
@@ -20,4 +21,3 @@ impl Foo
 fn d() {}
-fn e() {}
-fn f() {}
+fn ef() {}
 fn g() {}
"#;

    fn file(raw: &str) -> ParsedFile {
        parse_diff(raw).remove(0)
    }

    fn id_of(file: &ParsedFile, chunk: usize) -> String {
        hunk_id(file.path(), &file.chunks[chunk])
    }

    fn comment_at(anchor: Anchor) -> Comment {
        let mut review = Review::new();
        review.add_comment(anchor, "note", vec![]).unwrap().clone()
    }

    #[test]
    fn single_line_on_add_reattaches_after_reload() {
        let f = file(ONE_LINE);
        let id = id_of(&f, 0);
        // index 2 is "+new"
        let anchor = anchor_selection(&f, &Selection::line(&id, 2), None).unwrap();
        assert_eq!(anchor.start_line_new, Some(2));
        assert_eq!(anchor.start_line_old, None);
        assert_eq!(anchor.end_line_new, None);
        let comment = comment_at(anchor);

        let reloaded = file(ONE_LINE);
        let reloaded_id = id_of(&reloaded, 0);
        assert_eq!(reloaded_id, id);
        let hits: Vec<usize> = reloaded.chunks[0]
            .changes
            .iter()
            .enumerate()
            .filter(|(_, ch)| is_attached(&comment, &reloaded_id, ch))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(hits, vec![2]);
    }

    #[test]
    fn deletion_anchors_on_old_side() {
        let f = file(ONE_LINE);
        let id = id_of(&f, 0);
        let anchor = anchor_selection(&f, &Selection::line(&id, 1), None).unwrap();
        assert_eq!(anchor.start_line_old, Some(2));
        assert_eq!(anchor.start_line_new, None);
        assert_eq!(anchor.line_content, "old");

        let comment = comment_at(anchor);
        let changes = &f.chunks[0].changes;
        assert!(is_attached(&comment, &id, &changes[1]));
        // "+new" shares the number 2 but lives on the other side
        assert!(!is_attached(&comment, &id, &changes[2]));
    }

    #[test]
    fn context_line_anchors_on_new_side() {
        let f = file(ONE_LINE);
        let id = id_of(&f, 0);
        let anchor = anchor_selection(&f, &Selection::line(&id, 3), None).unwrap();
        assert_eq!(anchor.start_line_new, Some(3));
        assert_eq!(anchor.start_line_old, None);
    }

    #[test]
    fn range_is_normalised() {
        let f = file(TWO_HUNKS);
        let id = id_of(&f, 0);
        let forward = anchor_selection(&f, &Selection::range(&id, 2, 5), None).unwrap();
        let backward = anchor_selection(&f, &Selection::range(&id, 5, 2), None).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.start_line_new, Some(2));
        assert_eq!(forward.end_line_new, Some(5));
        assert_eq!(
            forward.line_content,
            "use std::io::{self, Write};\nuse std::path::Path;\n\nfn a() {}"
        );
    }

    #[test]
    fn one_line_range_collapses() {
        let f = file(TWO_HUNKS);
        let id = id_of(&f, 0);
        let anchor = anchor_selection(&f, &Selection::range(&id, 3, 3), None).unwrap();
        assert_eq!(anchor.start_line_new, Some(3));
        assert_eq!(anchor.end_line_new, None);
        assert_eq!(anchor.end_line_old, None);
    }

    #[test]
    fn old_side_range_from_deletions() {
        let f = file(TWO_HUNKS);
        let id = id_of(&f, 1);
        // "-fn e() {}" (old 21) .. "-fn f() {}" (old 22)
        let anchor = anchor_selection(&f, &Selection::range(&id, 2, 1), None).unwrap();
        assert_eq!(anchor.start_line_old, Some(21));
        assert_eq!(anchor.end_line_old, Some(22));
        assert_eq!(anchor.start_line_new, None);
    }

    #[test]
    fn old_side_range_ending_on_context_line() {
        let f = file(TWO_HUNKS);
        let id = id_of(&f, 1);
        // "-fn e() {}" (old 21) .. " fn g() {}" (old 23, new 23)
        let anchor = anchor_selection(&f, &Selection::range(&id, 1, 4), None).unwrap();
        assert_eq!(anchor.start_line_old, Some(21));
        assert_eq!(anchor.end_line_old, Some(23));
        assert_eq!(anchor.start_line_new, None);
        assert_eq!(anchor.end_line_new, None);

        let comment = comment_at(anchor);
        let changes = &f.chunks[1].changes;
        let attached_at: Vec<usize> = (0..changes.len())
            .filter(|&i| is_attached(&comment, &id, &changes[i]))
            .collect();
        assert_eq!(attached_at, vec![4]);
        let covered: Vec<usize> = (0..changes.len())
            .filter(|&i| in_range(&comment, &id, &changes[i]))
            .collect();
        // the addition has no old line number
        assert_eq!(covered, vec![1, 2, 4]);
    }

    #[test]
    fn changes_numbered_only_by_ln() {
        let mut f = file(ONE_LINE);
        for change in &mut f.chunks[0].changes {
            change.ln = match change.kind {
                crate::git::ChangeType::Del => change.old_line,
                _ => change.new_line,
            };
            change.old_line = None;
            change.new_line = None;
        }
        let id = id_of(&f, 0);
        assert_eq!(id, id_of(&file(ONE_LINE), 0));

        let anchor = anchor_selection(&f, &Selection::line(&id, 2), None).unwrap();
        assert_eq!(anchor.start_line_new, Some(2));
        let comment = comment_at(anchor);
        let changes = &f.chunks[0].changes;
        assert!(is_attached(&comment, &id, &changes[2]));
        // "-old" also carries ln 2, but only on the old side
        assert!(!is_attached(&comment, &id, &changes[1]));
        assert_eq!(
            crate::review::context::extract(std::slice::from_ref(&f), &comment),
            "first\nold\nnew\nthird"
        );
    }

    #[test]
    fn range_endpoint_without_side_line_is_rejected() {
        let f = file(TWO_HUNKS);
        let id = id_of(&f, 1);
        // starts on a deletion, ends on an addition that has no old line
        let err = anchor_selection(&f, &Selection::range(&id, 1, 3), None).unwrap_err();
        assert_eq!(
            err,
            AnchorError::MissingLine {
                index: 3,
                side: Side::Old
            }
        );
    }

    #[test]
    fn cross_hunk_selection_is_rejected() {
        let f = file(TWO_HUNKS);
        let selection = Selection {
            start: Point {
                hunk_id: id_of(&f, 0),
                index: 5,
            },
            end: Point {
                hunk_id: id_of(&f, 1),
                index: 0,
            },
        };
        assert_eq!(
            anchor_selection(&f, &selection, None),
            Err(AnchorError::CrossesHunks)
        );
        assert_eq!(
            select_lines(&f, Side::New, 6, 21).unwrap_err(),
            AnchorError::CrossesHunks
        );
    }

    #[test]
    fn unknown_hunk_and_bad_index() {
        let f = file(ONE_LINE);
        assert!(matches!(
            anchor_selection(&f, &Selection::line("deadbeef", 0), None),
            Err(AnchorError::UnknownHunk(_))
        ));
        let id = id_of(&f, 0);
        assert_eq!(
            anchor_selection(&f, &Selection::range(&id, 0, 9), None),
            Err(AnchorError::IndexOutOfBounds { index: 9, len: 4 })
        );
    }

    #[test]
    fn range_attaches_once_but_covers_all() {
        let f = file(TWO_HUNKS);
        let id = id_of(&f, 0);
        let comment = comment_at(anchor_selection(&f, &Selection::range(&id, 2, 5), None).unwrap());
        let changes = &f.chunks[0].changes;

        let attached_at: Vec<usize> = (0..changes.len())
            .filter(|&i| is_attached(&comment, &id, &changes[i]))
            .collect();
        assert_eq!(attached_at, vec![5]);

        let covered: Vec<usize> = (0..changes.len())
            .filter(|&i| in_range(&comment, &id, &changes[i]))
            .collect();
        // index 1 is the deletion: no new-side line
        assert_eq!(covered, vec![2, 3, 4, 5]);
    }

    #[test]
    fn single_line_comment_is_not_a_range() {
        let f = file(ONE_LINE);
        let id = id_of(&f, 0);
        let comment = comment_at(anchor_selection(&f, &Selection::line(&id, 2), None).unwrap());
        assert!(!f.chunks[0]
            .changes
            .iter()
            .any(|ch| in_range(&comment, &id, ch)));
    }

    #[test]
    fn other_hunk_never_matches() {
        let f = file(TWO_HUNKS);
        let id0 = id_of(&f, 0);
        let id1 = id_of(&f, 1);
        let comment = comment_at(anchor_selection(&f, &Selection::line(&id0, 0), None).unwrap());
        assert!(is_attached(&comment, &id0, &f.chunks[0].changes[0]));
        assert!(f.chunks[1]
            .changes
            .iter()
            .all(|ch| !is_attached(&comment, &id1, ch)));
    }

    #[test]
    fn attached_lists_in_review_order() {
        let f = file(ONE_LINE);
        let id = id_of(&f, 0);
        let mut review = Review::new();
        let anchor = anchor_selection(&f, &Selection::line(&id, 2), None).unwrap();
        review.add_comment(anchor.clone(), "one", vec![]);
        review.add_comment(anchor, "two", vec![]);
        let change = &f.chunks[0].changes[2];
        let bodies: Vec<&str> = attached(&review.comments, &id, change)
            .iter()
            .map(|c| c.comment.as_str())
            .collect();
        assert_eq!(bodies, vec!["one", "two"]);
        assert!(!covered_by_range(&review.comments, &id, change));
    }

    #[test]
    fn select_lines_by_number() {
        let f = file(TWO_HUNKS);
        let sel = select_lines(&f, Side::New, 4, 2).unwrap();
        assert_eq!(sel.start.index, 4);
        assert_eq!(sel.end.index, 2);
        let anchor = anchor_selection(&f, &sel, Some(Side::New)).unwrap();
        assert_eq!(anchor.start_line_new, Some(2));
        assert_eq!(anchor.end_line_new, Some(4));

        let old = select_lines(&f, Side::Old, 2, 2).unwrap();
        assert_eq!(old.start.index, 1);
        assert!(matches!(
            select_lines(&f, Side::New, 500, 500),
            Err(AnchorError::UnknownHunk(_))
        ));
    }

    #[test]
    fn relocate_unchanged_when_hunk_survives() {
        let f = file(ONE_LINE);
        let id = id_of(&f, 0);
        let comment = comment_at(anchor_selection(&f, &Selection::line(&id, 2), None).unwrap());
        assert_eq!(relocate(&comment, &file(ONE_LINE)), Relocation::Unchanged);
    }

    #[test]
    fn relocate_follows_shifted_text() {
        let f = file(ONE_LINE);
        let id = id_of(&f, 0);
        let comment = comment_at(anchor_selection(&f, &Selection::line(&id, 2), None).unwrap());

        // Same change, ten lines further down the file
        let shifted = ONE_LINE.replace("@@ -1,3 +1,3 @@", "@@ -11,3 +11,3 @@");
        let moved = file(&shifted);
        let relocation = relocate(&comment, &moved);
        assert_eq!(
            relocation,
            Relocation::Relocated {
                hunk_id: id_of(&moved, 0),
                start: 12,
                end: None,
            }
        );

        let view = relocation.view(&comment).unwrap();
        assert_eq!(view.comment_id, comment.comment_id);
        assert!(is_attached(&view, &id_of(&moved, 0), &moved.chunks[0].changes[2]));
    }

    #[test]
    fn relocate_range_keeps_span() {
        let f = file(TWO_HUNKS);
        let id = id_of(&f, 1);
        let comment = comment_at(anchor_selection(&f, &Selection::range(&id, 1, 2), None).unwrap());
        let shifted = TWO_HUNKS.replace("@@ -20,4 +21,3 @@ impl Foo", "@@ -30,4 +31,3 @@ impl Foo");
        let moved = file(&shifted);
        assert_eq!(
            relocate(&comment, &moved),
            Relocation::Relocated {
                hunk_id: id_of(&moved, 1),
                start: 31,
                end: Some(32),
            }
        );
    }

    #[test]
    fn relocate_lost_when_text_is_gone() {
        let f = file(ONE_LINE);
        let id = id_of(&f, 0);
        let comment = comment_at(anchor_selection(&f, &Selection::line(&id, 2), None).unwrap());
        let rewritten = file(&ONE_LINE.replace("+new", "+newer"));
        let relocation = relocate(&comment, &rewritten);
        assert_eq!(relocation, Relocation::Lost);
        assert!(relocation.view(&comment).is_none());
    }
}
