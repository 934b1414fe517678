use super::styles::{self, paint};
use crate::git::{FileStatus, ParsedFile};
use crate::review::Comment;
use std::collections::BTreeMap;

/// Directory node of the changed-file tree. Files keep diff order.
#[derive(Debug, Default)]
pub struct FileTree<'a> {
    pub dirs: BTreeMap<String, FileTree<'a>>,
    pub files: Vec<&'a ParsedFile>,
}

impl<'a> FileTree<'a> {
    /// Group files by path segment
    pub fn build(files: &[&'a ParsedFile]) -> Self {
        let mut root = FileTree::default();
        for file in files {
            let mut node = &mut root;
            let mut segments: Vec<&str> = file.path().split('/').collect();
            segments.pop();
            for segment in segments.into_iter().filter(|s| !s.is_empty()) {
                node = node.dirs.entry(segment.to_string()).or_default();
            }
            node.files.push(*file);
        }
        root
    }

    pub fn file_count(&self) -> usize {
        self.files.len() + self.dirs.values().map(FileTree::file_count).sum::<usize>()
    }
}

/// Indented text listing of `tree`. Directory chains with a single child
/// collapse into one `a/b/c/` line.
pub fn render_tree(tree: &FileTree, comments: &[Comment], color: bool) -> String {
    let mut out = String::new();
    render_node(tree, comments, color, 0, &mut out);
    out
}

fn render_node(node: &FileTree, comments: &[Comment], color: bool, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);

    for (name, child) in &node.dirs {
        let mut label = format!("{}/", name);
        let mut dir = child;
        while dir.files.is_empty() && dir.dirs.len() == 1 {
            let Some((next_name, next)) = dir.dirs.iter().next() else {
                break;
            };
            label.push_str(&format!("{}/", next_name));
            dir = next;
        }
        out.push_str(&format!("{}{}\n", indent, paint(&label, styles::fg(styles::BLUE), color)));
        render_node(dir, comments, color, depth + 1, out);
    }

    for file in &node.files {
        out.push_str(&indent);
        out.push_str(&file_line(file, comments, color));
        out.push('\n');
    }
}

/// `~ name  +3 -1  ◆2` for one file
pub fn file_line(file: &ParsedFile, comments: &[Comment], color: bool) -> String {
    let name = file.path().rsplit('/').next().unwrap_or_default();
    entry(file, name, comments, color)
}

/// Like [`file_line`] but with the full path, for flat listings
pub fn path_line(file: &ParsedFile, comments: &[Comment], color: bool) -> String {
    entry(file, file.path(), comments, color)
}

fn entry(file: &ParsedFile, name: &str, comments: &[Comment], color: bool) -> String {
    let status = file.status();
    let style = match status {
        FileStatus::Added => styles::status_added(),
        FileStatus::Deleted => styles::status_deleted(),
        _ => styles::status_modified(),
    };
    let mut line = format!(
        "{} {}  {}",
        paint(status.symbol(), style, color),
        name,
        paint(&format!("+{} -{}", file.additions, file.deletions), styles::fg(styles::DIM), color)
    );

    let on_file: Vec<&Comment> = comments.iter().filter(|c| file.matches_path(&c.file_path)).collect();
    if !on_file.is_empty() {
        let open = on_file.iter().filter(|c| !c.resolved).count();
        let badge = format!("◆{}", on_file.len());
        let badge_style = if open == 0 {
            styles::resolved_style()
        } else {
            styles::comment_style()
        };
        line.push_str("  ");
        line.push_str(&paint(&badge, badge_style, color));
    }
    if let FileStatus::Renamed(from) = status {
        line.push_str(&paint(&format!("  (from {})", from), styles::fg(styles::MUTED), color));
    }
    line
}
