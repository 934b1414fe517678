use crate::git::Chunk;
use sha1::{Digest, Sha1};

/// Number of leading changes folded into a hunk's fingerprint
const FINGERPRINT_LINES: usize = 3;

/// Canonical `@@ -a,b +c,d @@` header rebuilt from the chunk's numbers.
pub fn hunk_header(chunk: &Chunk) -> String {
    format!(
        "@@ -{},{} +{},{} @@",
        chunk.old_start, chunk.old_lines, chunk.new_start, chunk.new_lines
    )
}

/// Stable, content-based identifier for a hunk.
///
/// SHA-1 over `path:header:first-3-lines`. Only the leading lines are hashed so the
/// id survives edits further down the hunk; two hunks of one file with identical
/// header and leading lines collide. Ids are persisted in comments, so this input
/// format must not change without migrating stored reviews.
pub fn hunk_id(file_path: &str, chunk: &Chunk) -> String {
    let leading: Vec<&str> = chunk
        .changes
        .iter()
        .take(FINGERPRINT_LINES)
        .map(|c| c.content.as_str())
        .collect();
    let input = format!("{}:{}:{}", file_path, hunk_header(chunk), leading.join("\n"));

    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
