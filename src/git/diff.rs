use serde::{Deserialize, Serialize};

/// Kind of a single line in a hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Normal,
    Add,
    Del,
}

/// A single line in a diff hunk, marker stripped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    #[serde(rename = "type")]
    pub kind: ChangeType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_line: Option<usize>,
    /// Side-less line number filled by some parser back ends instead of old/new
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ln: Option<usize>,
}

impl Change {
    pub fn normal(content: &str, old: usize, new: usize) -> Self {
        Change {
            kind: ChangeType::Normal,
            content: content.to_string(),
            old_line: Some(old),
            new_line: Some(new),
            ln: None,
        }
    }

    pub fn add(content: &str, new: usize) -> Self {
        Change {
            kind: ChangeType::Add,
            content: content.to_string(),
            old_line: None,
            new_line: Some(new),
            ln: None,
        }
    }

    pub fn del(content: &str, old: usize) -> Self {
        Change {
            kind: ChangeType::Del,
            content: content.to_string(),
            old_line: Some(old),
            new_line: None,
            ln: None,
        }
    }

    /// The unified-diff marker this line was written with
    pub fn marker(&self) -> char {
        match self.kind {
            ChangeType::Add => '+',
            ChangeType::Del => '-',
            ChangeType::Normal => ' ',
        }
    }
}

/// A diff hunk: header numbers plus its lines in textual order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Raw `@@ ... @@` header line
    pub content: String,
    pub changes: Vec<Change>,
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
}

/// File change status derived from the old/new paths
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed(String), // old path
}

impl FileStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            FileStatus::Added => "+",
            FileStatus::Modified => "~",
            FileStatus::Deleted => "-",
            FileStatus::Renamed(_) => "R",
        }
    }
}

/// One file's changes in a diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    #[serde(default)]
    pub additions: usize,
    #[serde(default)]
    pub deletions: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub binary: bool,
}

impl ParsedFile {
    fn empty() -> Self {
        ParsedFile {
            from: None,
            to: None,
            chunks: Vec::new(),
            additions: 0,
            deletions: 0,
            binary: false,
        }
    }

    /// Current path of the file: `to` if present, else `from`
    pub fn path(&self) -> &str {
        self.to.as_deref().or(self.from.as_deref()).unwrap_or("")
    }

    pub fn status(&self) -> FileStatus {
        match (&self.from, &self.to) {
            (None, Some(_)) => FileStatus::Added,
            (Some(_), None) => FileStatus::Deleted,
            (Some(from), Some(to)) if from != to => FileStatus::Renamed(from.clone()),
            _ => FileStatus::Modified,
        }
    }

    /// Whether `path` names this file on either side
    pub fn matches_path(&self, path: &str) -> bool {
        self.path() == path || self.from.as_deref() == Some(path)
    }
}

/// Parse unified diff output into structured data.
///
/// Never fails: malformed headers yield zero-filled chunks, and a file block
/// whose paths cannot be determined is dropped without affecting later files.
pub fn parse_diff(raw: &str) -> Vec<ParsedFile> {
    let mut parser = Parser::default();
    for line in raw.lines() {
        parser.feed(line);
    }
    parser.finish()
}

#[derive(Default)]
struct Parser {
    files: Vec<ParsedFile>,
    current_file: Option<ParsedFile>,
    current_chunk: Option<Chunk>,
    old_line: usize,
    new_line: usize,
    /// Old/new lines still owed to the open hunk; `None` when the header was unreadable
    budget: Option<(usize, usize)>,
    /// A `---` header was already seen for the current file
    saw_old_header: bool,
}

impl Parser {
    fn feed(&mut self, line: &str) {
        if self.current_chunk.is_some() {
            let consumed = match self.budget {
                Some((old, new)) if old > 0 || new > 0 => self.push_change(line),
                // format-patch signature separator ends the patch
                Some(_) if line == "-- " => {
                    self.close_chunk();
                    true
                }
                // Header undercounted: keep taking unambiguous change lines
                Some(_) => !line.is_empty() && !is_header(line) && self.push_change(line),
                None => !is_header(line) && self.push_change(line),
            };
            if consumed {
                return;
            }
        }
        self.header(line);
    }

    /// Append a body line to the open hunk. Returns false if the line is not a body line.
    fn push_change(&mut self, line: &str) -> bool {
        let (kind, content) = match line.as_bytes().first() {
            Some(b'+') => (ChangeType::Add, &line[1..]),
            Some(b'-') => (ChangeType::Del, &line[1..]),
            Some(b' ') => (ChangeType::Normal, &line[1..]),
            None => (ChangeType::Normal, ""),
            // \ No newline at end of file
            Some(b'\\') => return true,
            _ => return false,
        };

        let change = match kind {
            ChangeType::Add => {
                let change = Change::add(content, self.new_line);
                self.new_line = self.new_line.saturating_add(1);
                self.spend(0, 1);
                change
            }
            ChangeType::Del => {
                let change = Change::del(content, self.old_line);
                self.old_line = self.old_line.saturating_add(1);
                self.spend(1, 0);
                change
            }
            ChangeType::Normal => {
                let change = Change::normal(content, self.old_line, self.new_line);
                self.old_line = self.old_line.saturating_add(1);
                self.new_line = self.new_line.saturating_add(1);
                self.spend(1, 1);
                change
            }
        };

        if let Some(ref mut file) = self.current_file {
            match kind {
                ChangeType::Add => file.additions += 1,
                ChangeType::Del => file.deletions += 1,
                ChangeType::Normal => {}
            }
        }
        if let Some(ref mut chunk) = self.current_chunk {
            chunk.changes.push(change);
        }
        true
    }

    fn spend(&mut self, old: usize, new: usize) {
        if let Some((ref mut old_left, ref mut new_left)) = self.budget {
            *old_left = old_left.saturating_sub(old);
            *new_left = new_left.saturating_sub(new);
        }
    }

    fn header(&mut self, line: &str) {
        // New file header: diff --git a/path b/path
        if let Some(rest) = line.strip_prefix("diff --git ") {
            self.start_file();
            let (from, to) = parse_git_paths(rest);
            if let Some(ref mut file) = self.current_file {
                file.from = from;
                file.to = to;
            }
            return;
        }
        // Other diff flavours name their paths in the ---/+++ lines
        if line.starts_with("diff ") {
            self.start_file();
            return;
        }

        if line.starts_with("@@") {
            self.open_chunk(line);
            return;
        }

        if let Some(rest) = line.strip_prefix("--- ") {
            self.close_chunk();
            // Plain unified diffs have no `diff` line: each `---` opens a file
            let needs_file = match self.current_file {
                Some(ref file) => self.saw_old_header || !file.chunks.is_empty(),
                None => true,
            };
            if needs_file {
                self.start_file();
            }
            self.saw_old_header = true;
            if let Some(ref mut file) = self.current_file {
                file.from = parse_header_path(rest);
            }
            return;
        }

        if let Some(rest) = line.strip_prefix("+++ ") {
            self.close_chunk();
            if self.current_file.is_none() {
                self.start_file();
            }
            if let Some(ref mut file) = self.current_file {
                file.to = parse_header_path(rest);
            }
            return;
        }

        if let Some(rest) = line.strip_prefix("Binary files ") {
            if self.current_file.is_none() {
                self.start_file();
            }
            if let Some(ref mut file) = self.current_file {
                file.binary = true;
                if file.from.is_none() && file.to.is_none() {
                    let (from, to) = parse_binary_paths(rest);
                    file.from = from;
                    file.to = to;
                }
            }
            return;
        }

        let Some(ref mut file) = self.current_file else {
            return;
        };
        if line.starts_with("new file mode") {
            file.from = None;
        } else if line.starts_with("deleted file mode") {
            file.to = None;
        } else if let Some(path) = line
            .strip_prefix("rename from ")
            .or_else(|| line.strip_prefix("copy from "))
        {
            file.from = Some(path.to_string());
        } else if let Some(path) = line
            .strip_prefix("rename to ")
            .or_else(|| line.strip_prefix("copy to "))
        {
            file.to = Some(path.to_string());
        }
        // index, similarity index, old mode, new mode: nothing to record
    }

    fn open_chunk(&mut self, line: &str) {
        self.close_chunk();
        if self.current_file.is_none() {
            self.start_file();
        }

        match parse_hunk_header(line) {
            Some(chunk) => {
                self.old_line = chunk.old_start;
                self.new_line = chunk.new_start;
                self.budget = Some((chunk.old_lines, chunk.new_lines));
                self.current_chunk = Some(chunk);
            }
            None => {
                log::debug!("Malformed hunk header, zero-filling: {}", line);
                self.old_line = 0;
                self.new_line = 0;
                self.budget = None;
                self.current_chunk = Some(Chunk {
                    content: line.to_string(),
                    changes: Vec::new(),
                    old_start: 0,
                    old_lines: 0,
                    new_start: 0,
                    new_lines: 0,
                });
            }
        }
    }

    fn close_chunk(&mut self) {
        if let Some(chunk) = self.current_chunk.take() {
            if let Some(ref mut file) = self.current_file {
                file.chunks.push(chunk);
            }
        }
        self.budget = None;
    }

    fn start_file(&mut self) {
        self.finish_file();
        self.current_file = Some(ParsedFile::empty());
        self.saw_old_header = false;
    }

    fn finish_file(&mut self) {
        self.close_chunk();
        if let Some(file) = self.current_file.take() {
            if file.from.is_none() && file.to.is_none() {
                log::debug!(
                    "Dropping diff block without file paths ({} hunks)",
                    file.chunks.len()
                );
            } else {
                self.files.push(file);
            }
        }
    }

    fn finish(mut self) -> Vec<ParsedFile> {
        self.finish_file();
        self.files
    }
}

/// Lines that can only start a new header, never a hunk body line
fn is_header(line: &str) -> bool {
    line.starts_with("diff ")
        || line.starts_with("@@")
        || line.starts_with("--- ")
        || line.starts_with("+++ ")
        || line.starts_with("index ")
        || line.starts_with("Binary files ")
}

/// Split "a/path b/path" from a `diff --git` line
fn parse_git_paths(rest: &str) -> (Option<String>, Option<String>) {
    match rest.find(" b/") {
        Some(idx) => (
            Some(strip_side_prefix(&rest[..idx]).to_string()),
            Some(rest[idx + 3..].to_string()),
        ),
        None => (None, None),
    }
}

/// Path from a `---`/`+++` line: drops a trailing timestamp, `a/`/`b/`, and maps /dev/null to None
fn parse_header_path(rest: &str) -> Option<String> {
    let path = rest.split('\t').next().unwrap_or("").trim_end();
    let path = path.trim_matches('"');
    if path.is_empty() || path == "/dev/null" {
        return None;
    }
    Some(strip_side_prefix(path).to_string())
}

/// "a/x and b/y differ"
fn parse_binary_paths(rest: &str) -> (Option<String>, Option<String>) {
    let rest = rest.strip_suffix(" differ").unwrap_or(rest);
    match rest.split_once(" and ") {
        Some((from, to)) => (parse_header_path(from), parse_header_path(to)),
        None => (None, None),
    }
}

fn strip_side_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

/// Parse a hunk header like "@@ -10,4 +10,15 @@ fn foo()"
fn parse_hunk_header(line: &str) -> Option<Chunk> {
    let after_first = line.strip_prefix("@@ ")?;
    let end_idx = after_first.find(" @@")?;
    let range_str = &after_first[..end_idx];

    // Parse "-old_start,old_count +new_start,new_count"
    let parts: Vec<&str> = range_str.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }

    let (old_start, old_lines) = parse_range(parts[0].strip_prefix('-')?)?;
    let (new_start, new_lines) = parse_range(parts[1].strip_prefix('+')?)?;

    Some(Chunk {
        content: line.to_string(),
        changes: Vec::new(),
        old_start,
        old_lines,
        new_start,
        new_lines,
    })
}

/// Parse "start,count" or just "start" (count defaults to 1)
fn parse_range(s: &str) -> Option<(usize, usize)> {
    if let Some((start, count)) = s.split_once(',') {
        Some((start.parse().ok()?, count.parse().ok()?))
    } else {
        Some((s.parse().ok()?, 1))
    }
}
