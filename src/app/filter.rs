use crate::git::{FileStatus, ParsedFile};
use crate::review::Comment;
use glob::{MatchOptions, Pattern};

// ── Types ──

/// Facts about a file that a keyword rule can test
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileTrait {
    Added,
    Modified,
    Deleted,
    Renamed,
    Binary,
    /// Has at least one review comment
    Commented,
    /// Has at least one unresolved review comment
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeOp {
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone)]
pub enum FilterRule {
    Glob { include: bool, pattern: Pattern },
    Trait { include: bool, kind: FileTrait },
    Size { include: bool, op: SizeOp, threshold: usize },
}

impl FilterRule {
    fn is_include(&self) -> bool {
        match self {
            FilterRule::Glob { include, .. }
            | FilterRule::Trait { include, .. }
            | FilterRule::Size { include, .. } => *include,
        }
    }
}

/// A file plus the review state the filter needs to see
pub struct FilterSubject<'a> {
    pub file: &'a ParsedFile,
    pub comments: &'a [Comment],
}

impl FilterSubject<'_> {
    fn any_comment(&self, pred: impl Fn(&Comment) -> bool) -> bool {
        self.comments
            .iter()
            .any(|c| self.file.matches_path(&c.file_path) && pred(c))
    }
}

// ── Parser ──

/// Parse a comma-separated filter expression such as `+*.rs,-*.lock,+added,>20`.
/// Invalid globs are skipped.
pub fn parse_filter_expr(expr: &str) -> Vec<FilterRule> {
    let mut rules = Vec::new();
    for segment in expr.split(',').map(str::trim) {
        let (include, body) = match segment.chars().next() {
            Some('-') => (false, segment[1..].trim()),
            Some('+') => (true, segment[1..].trim()),
            _ => (true, segment),
        };
        if body.is_empty() {
            continue;
        }

        if let Some(rule) = parse_size(include, body).or_else(|| parse_trait(include, body)) {
            rules.push(rule);
            continue;
        }

        match Pattern::new(body) {
            Ok(pattern) => rules.push(FilterRule::Glob { include, pattern }),
            Err(e) => log::debug!("Skipping invalid glob '{}': {}", body, e),
        }
    }
    rules
}

fn parse_size(include: bool, body: &str) -> Option<FilterRule> {
    let (op, num) = if let Some(rest) = body.strip_prefix('>') {
        (SizeOp::GreaterThan, rest)
    } else if let Some(rest) = body.strip_prefix('<') {
        (SizeOp::LessThan, rest)
    } else {
        return None;
    };
    let threshold = num.trim().parse::<usize>().ok()?;
    Some(FilterRule::Size {
        include,
        op,
        threshold,
    })
}

fn parse_trait(include: bool, body: &str) -> Option<FilterRule> {
    let kind = match body.to_lowercase().as_str() {
        "added" => FileTrait::Added,
        "modified" => FileTrait::Modified,
        "deleted" => FileTrait::Deleted,
        "renamed" => FileTrait::Renamed,
        "binary" => FileTrait::Binary,
        "commented" => FileTrait::Commented,
        "unresolved" => FileTrait::Unresolved,
        _ => return None,
    };
    Some(FilterRule::Trait { include, kind })
}

// ── Evaluator ──

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Whether a file stays visible. Include rules are OR-ed (none means all
/// files start included); any matching exclude rule hides the file.
pub fn apply_filter(rules: &[FilterRule], subject: &FilterSubject) -> bool {
    let mut includes = rules.iter().filter(|r| r.is_include()).peekable();
    let included = includes.peek().is_none() || includes.any(|r| matches_rule(r, subject));

    included
        && !rules
            .iter()
            .any(|r| !r.is_include() && matches_rule(r, subject))
}

/// Files of `files` that pass `rules`, in diff order
pub fn filter_files<'a>(
    rules: &[FilterRule],
    files: &'a [ParsedFile],
    comments: &[Comment],
) -> Vec<&'a ParsedFile> {
    files
        .iter()
        .filter(|file| apply_filter(rules, &FilterSubject { file: *file, comments }))
        .collect()
}

fn matches_rule(rule: &FilterRule, subject: &FilterSubject) -> bool {
    let file = subject.file;
    match rule {
        FilterRule::Glob { pattern, .. } => pattern.matches_with(file.path(), MATCH_OPTIONS),
        FilterRule::Trait { kind, .. } => match kind {
            FileTrait::Added => file.status() == FileStatus::Added,
            FileTrait::Modified => file.status() == FileStatus::Modified,
            FileTrait::Deleted => file.status() == FileStatus::Deleted,
            FileTrait::Renamed => matches!(file.status(), FileStatus::Renamed(_)),
            FileTrait::Binary => file.binary,
            FileTrait::Commented => subject.any_comment(|_| true),
            FileTrait::Unresolved => subject.any_comment(|c| !c.resolved),
        },
        FilterRule::Size { op, threshold, .. } => {
            let changed = file.additions + file.deletions;
            match op {
                SizeOp::GreaterThan => changed > *threshold,
                SizeOp::LessThan => changed < *threshold,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::model::Review;
    use crate::review::Anchor;

    fn file(from: Option<&str>, to: Option<&str>, additions: usize, deletions: usize) -> ParsedFile {
        ParsedFile {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
            chunks: Vec::new(),
            additions,
            deletions,
            binary: false,
        }
    }

    fn modified(path: &str, additions: usize, deletions: usize) -> ParsedFile {
        file(Some(path), Some(path), additions, deletions)
    }

    fn passes(expr: &str, f: &ParsedFile) -> bool {
        apply_filter(&parse_filter_expr(expr), &FilterSubject { file: f, comments: &[] })
    }

    // ── Parser ──

    #[test]
    fn empty_segments_are_ignored() {
        assert!(parse_filter_expr("").is_empty());
        assert!(parse_filter_expr("  ,  , ").is_empty());
        assert!(parse_filter_expr("+, -").is_empty());
    }

    #[test]
    fn prefixes_set_polarity() {
        let rules = parse_filter_expr("*.rs, +*.ts, -*.lock");
        assert_eq!(rules.len(), 3);
        assert!(matches!(&rules[0], FilterRule::Glob { include: true, .. }));
        assert!(matches!(&rules[1], FilterRule::Glob { include: true, .. }));
        assert!(matches!(&rules[2], FilterRule::Glob { include: false, .. }));
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let rules = parse_filter_expr("+MODIFIED,-Unresolved");
        assert!(matches!(
            &rules[0],
            FilterRule::Trait { include: true, kind: FileTrait::Modified }
        ));
        assert!(matches!(
            &rules[1],
            FilterRule::Trait { include: false, kind: FileTrait::Unresolved }
        ));
    }

    #[test]
    fn size_rules_allow_spaces() {
        let rules = parse_filter_expr("+> 10, -<3");
        assert!(matches!(
            &rules[0],
            FilterRule::Size { include: true, op: SizeOp::GreaterThan, threshold: 10 }
        ));
        assert!(matches!(
            &rules[1],
            FilterRule::Size { include: false, op: SizeOp::LessThan, threshold: 3 }
        ));
    }

    #[test]
    fn invalid_glob_is_skipped() {
        let rules = parse_filter_expr("[invalid, *.rs");
        assert_eq!(rules.len(), 1);
    }

    // ── Evaluator ──

    #[test]
    fn no_rules_shows_everything() {
        assert!(passes("", &modified("src/main.rs", 1, 1)));
    }

    #[test]
    fn globs_match_nested_paths() {
        assert!(passes("*.rs", &modified("src/deeply/nested/file.rs", 1, 0)));
        assert!(!passes("*.ts", &modified("src/main.rs", 1, 0)));
    }

    #[test]
    fn includes_or_then_excludes_win() {
        let expr = "+*.rs, +*.toml, -src/test*";
        assert!(passes(expr, &modified("src/main.rs", 1, 0)));
        assert!(passes(expr, &modified("Cargo.toml", 1, 0)));
        assert!(!passes(expr, &modified("src/test_utils.rs", 1, 0)));
        assert!(!passes(expr, &modified("app.ts", 1, 0)));
    }

    #[test]
    fn exclude_only_starts_from_all() {
        assert!(passes("-*.lock", &modified("package-lock.json", 9, 9)));
        assert!(!passes("-*.lock", &modified("Cargo.lock", 9, 9)));
    }

    #[test]
    fn status_keywords_follow_paths() {
        let added = file(None, Some("new.rs"), 3, 0);
        let deleted = file(Some("gone.rs"), None, 0, 3);
        let renamed = file(Some("old.rs"), Some("new_name.rs"), 1, 1);
        assert!(passes("+added", &added));
        assert!(!passes("+added", &modified("x.rs", 1, 1)));
        assert!(!passes("-deleted", &deleted));
        assert!(passes("+renamed", &renamed));
        // a deleted file is matched by its old path
        assert!(passes("gone.*", &deleted));
    }

    #[test]
    fn binary_keyword() {
        let mut png = modified("logo.png", 0, 0);
        png.binary = true;
        assert!(!passes("-binary", &png));
        assert!(passes("-binary", &modified("a.rs", 1, 0)));
    }

    #[test]
    fn size_is_strict() {
        assert!(passes("+>10", &modified("big.rs", 8, 5)));
        assert!(!passes("+>10", &modified("exact.rs", 5, 5)));
        assert!(!passes("-<3", &modified("tiny.rs", 1, 0)));
    }

    #[test]
    fn comment_keywords_use_review_state() {
        let files = vec![modified("a.rs", 1, 1), modified("b.rs", 1, 1)];
        let mut review = Review::new();
        let anchor = Anchor {
            file_path: "a.rs".to_string(),
            hunk_id: "h".to_string(),
            start_line_new: Some(1),
            ..Anchor::default()
        };
        review.add_comment(anchor, "check", vec![]);

        let commented = filter_files(&parse_filter_expr("+commented"), &files, &review.comments);
        assert_eq!(commented.len(), 1);
        assert_eq!(commented[0].path(), "a.rs");

        let id = review.comments[0].comment_id.clone();
        review.toggle_resolved(&id);
        let open = filter_files(&parse_filter_expr("+unresolved"), &files, &review.comments);
        assert!(open.is_empty());
        let rest = filter_files(&parse_filter_expr("-commented"), &files, &review.comments);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].path(), "b.rs");
    }
}
