use super::anchor::find_chunk;
use super::locate::find_change;
use super::model::Comment;
use crate::git::ParsedFile;

/// Shown when neither the diff nor the comment can supply any text
pub const CONTEXT_UNAVAILABLE: &str = "(context not available)";

/// Lines kept on each side of the anchored change
const CONTEXT_RADIUS: usize = 2;

/// Short diff excerpt around a comment's anchor line.
///
/// Looks the comment's hunk up in `files` and returns up to two lines either
/// side of the anchored change. When the file, hunk or line is gone, the
/// comment's stored snapshot is returned instead, then a placeholder.
pub fn extract(files: &[ParsedFile], comment: &Comment) -> String {
    if let Some(excerpt) = excerpt(files, comment) {
        return excerpt;
    }
    match comment.line_content.as_deref() {
        Some(snapshot) if !snapshot.is_empty() => snapshot.to_string(),
        _ => CONTEXT_UNAVAILABLE.to_string(),
    }
}

fn excerpt(files: &[ParsedFile], comment: &Comment) -> Option<String> {
    let side = comment.side()?;
    let line = comment.start_line()?;

    let (chunk, index) = files
        .iter()
        .filter(|f| f.matches_path(&comment.file_path))
        .filter_map(|f| find_chunk(f, &comment.hunk_id))
        .find_map(|chunk| find_change(chunk, side, line).map(|idx| (chunk, idx)))?;

    let start = index.saturating_sub(CONTEXT_RADIUS);
    let end = (index + CONTEXT_RADIUS + 1).min(chunk.changes.len());
    let lines: Vec<&str> = chunk.changes[start..end]
        .iter()
        .map(|c| c.content.as_str())
        .collect();
    Some(lines.join("\n"))
}
