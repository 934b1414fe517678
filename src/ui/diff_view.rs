use super::styles::{self, paint};
use crate::git::{Change, ChangeType, FileStatus, ParsedFile};
use crate::review::anchor::{attached, covered_by_range, relocate, Relocation};
use crate::review::hunk_id::hunk_id;
use crate::review::locate::{new_line, old_line};
use crate::review::Comment;

/// Gutter mark for a line carrying comments
const MARK_ATTACHED: &str = "●";
/// Gutter mark for a line inside a commented range
const MARK_IN_RANGE: &str = "│";

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub color: bool,
    pub line_numbers: bool,
    pub tab_width: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: true,
            line_numbers: true,
            tab_width: 4,
        }
    }
}

/// Render one file's diff with its review comments as terminal text.
///
/// Comments whose hunk changed are shown at their relocated position when
/// their text can still be found, and listed as outdated otherwise.
pub fn render_file(file: &ParsedFile, comments: &[Comment], opts: &RenderOptions) -> String {
    let mut placed: Vec<Comment> = Vec::new();
    let mut outdated: Vec<&Comment> = Vec::new();
    for comment in comments.iter().filter(|c| file.matches_path(&c.file_path)) {
        let relocation = relocate(comment, file);
        match relocation.view(comment) {
            Some(view) => {
                if matches!(relocation, Relocation::Relocated { .. }) {
                    log::debug!("Comment {} shown at relocated position", comment.comment_id);
                }
                placed.push(view);
            }
            None => outdated.push(comment),
        }
    }

    let mut out = String::new();
    out.push_str(&file_header(file, opts));
    out.push('\n');

    if file.binary {
        out.push_str(&paint("  Binary file not shown\n", styles::fg(styles::DIM), opts.color));
    } else if file.chunks.is_empty() {
        out.push_str(&paint("  No content changes\n", styles::fg(styles::DIM), opts.color));
    }

    let path = file.path();
    for chunk in &file.chunks {
        let id = hunk_id(path, chunk);
        out.push_str(&paint(&chunk.content, styles::hunk_header_style(), opts.color));
        out.push('\n');

        for change in &chunk.changes {
            let on_line = attached(&placed, &id, change);
            let mark = if !on_line.is_empty() {
                MARK_ATTACHED
            } else if covered_by_range(&placed, &id, change) {
                MARK_IN_RANGE
            } else {
                " "
            };
            out.push_str(&change_line(change, mark, opts));
            out.push('\n');
            for comment in on_line {
                out.push_str(&comment_block(comment, opts));
            }
        }
    }

    if !outdated.is_empty() {
        out.push_str(&render_outdated(&outdated, opts));
    }
    out
}

fn file_header(file: &ParsedFile, opts: &RenderOptions) -> String {
    let status = file.status();
    let status_style = match status {
        FileStatus::Added => styles::status_added(),
        FileStatus::Deleted => styles::status_deleted(),
        _ => styles::status_modified(),
    };
    let name = match status {
        FileStatus::Renamed(ref from) => format!("{} → {}", from, file.path()),
        _ => file.path().to_string(),
    };
    format!(
        "{} {}  {}",
        paint(status.symbol(), status_style, opts.color),
        paint(&name, styles::fg(styles::BRIGHT), opts.color),
        paint(
            &format!("+{} -{}", file.additions, file.deletions),
            styles::fg(styles::DIM),
            opts.color
        ),
    )
}

fn change_line(change: &Change, mark: &str, opts: &RenderOptions) -> String {
    let mut line = String::new();
    line.push_str(&paint(mark, styles::comment_style(), opts.color));
    if opts.line_numbers {
        let num = |n: Option<usize>| n.map(|n| format!("{:>4}", n)).unwrap_or_else(|| "    ".to_string());
        line.push_str(&paint(
            &format!("{} {} ", num(old_line(change)), num(new_line(change))),
            styles::fg(styles::DIM),
            opts.color,
        ));
    }
    let text = format!("{}{}", change.marker(), expand_tabs(&change.content, opts.tab_width));
    let style = match change.kind {
        ChangeType::Add => Some(styles::add_style()),
        ChangeType::Del => Some(styles::del_style()),
        ChangeType::Normal => None,
    };
    match style {
        Some(s) => line.push_str(&paint(&text, s, opts.color)),
        None => line.push_str(&text),
    }
    line
}

fn comment_block(comment: &Comment, opts: &RenderOptions) -> String {
    let indent = if opts.line_numbers { "           " } else { "  " };
    let style = if comment.resolved {
        styles::resolved_style()
    } else {
        styles::comment_style()
    };

    let mut head = format!("{} · {}", short_id(&comment.comment_id), comment.line_label().unwrap_or_default());
    if comment.resolved {
        head.push_str(" · resolved");
    }
    if !comment.tags.is_empty() {
        let tags: Vec<String> = comment.tags.iter().map(|t| format!("#{}", t)).collect();
        head.push_str(&format!(" · {}", tags.join(" ")));
    }

    let mut block = format!("{}┃ {}\n", indent, paint(&head, styles::fg(styles::MUTED), opts.color));
    for body_line in comment.comment.lines() {
        block.push_str(&format!("{}┃ {}\n", indent, paint(body_line, style, opts.color)));
    }
    block
}

/// Comments whose anchor no longer exists in the diff, with their stored snapshot
pub fn render_outdated(comments: &[&Comment], opts: &RenderOptions) -> String {
    let mut out = String::new();
    out.push_str(&paint(
        &format!("\nOutdated comments ({})\n", comments.len()),
        styles::fg(styles::YELLOW),
        opts.color,
    ));
    for comment in comments {
        out.push_str(&comment_block(comment, opts));
        out.push_str(&snapshot_block(comment, opts));
    }
    out
}

/// Comments on files that are no longer part of the diff, grouped under their path.
/// Empty when every comment's file is still in `files`.
pub fn render_orphaned(files: &[ParsedFile], comments: &[Comment], opts: &RenderOptions) -> String {
    let orphans: Vec<&Comment> = comments
        .iter()
        .filter(|c| !files.iter().any(|f| f.matches_path(&c.file_path)))
        .collect();
    if orphans.is_empty() {
        return String::new();
    }

    let mut out = paint(
        &format!("Comments on files no longer in the diff ({})\n", orphans.len()),
        styles::fg(styles::YELLOW),
        opts.color,
    );
    let mut last_path: Option<&str> = None;
    for comment in orphans {
        if last_path != Some(comment.file_path.as_str()) {
            out.push_str(&format!("{}\n", paint(&comment.file_path, styles::fg(styles::BRIGHT), opts.color)));
            last_path = Some(&comment.file_path);
        }
        out.push_str(&comment_block(comment, opts));
        out.push_str(&snapshot_block(comment, opts));
    }
    out
}

fn snapshot_block(comment: &Comment, opts: &RenderOptions) -> String {
    let Some(ref snapshot) = comment.line_content else {
        return String::new();
    };
    snapshot
        .lines()
        .map(|line| paint(&format!("    > {}\n", line), styles::fg(styles::DIM), opts.color))
        .collect()
}

/// Short display form of a comment id: the first 6 chars after the prefix
pub fn short_id(comment_id: &str) -> &str {
    let rest = comment_id.strip_prefix("comment_").unwrap_or(comment_id);
    rest.get(..6).unwrap_or(rest)
}

fn expand_tabs(text: &str, tab_width: u8) -> String {
    if !text.contains('\t') {
        return text.to_string();
    }
    let width = usize::from(tab_width.max(1));
    let mut out = String::with_capacity(text.len());
    let mut col = 0;
    for ch in text.chars() {
        if ch == '\t' {
            let pad = width - col % width;
            out.extend(std::iter::repeat(' ').take(pad));
            col += pad;
        } else {
            out.push(ch);
            col += 1;
        }
    }
    out
}
