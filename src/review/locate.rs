//! Line-number resolution for diff changes.
//!
//! Every reader of a change's old/new coordinate goes through here so the
//! `old_line`/`new_line` → `ln` fallback is applied the same way everywhere.

use crate::git::{Change, ChangeType, Chunk};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which file version a line number refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Old,
    New,
}

impl Side {
    /// Side a selection starting on `change` lives on: deletions are old, everything else new
    pub fn of(change: &Change) -> Side {
        match change.kind {
            ChangeType::Del => Side::Old,
            ChangeType::Add | ChangeType::Normal => Side::New,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Old => write!(f, "old"),
            Side::New => write!(f, "new"),
        }
    }
}

/// Old-file line number. `ln` only stands in on a change that exists in the old file.
pub fn old_line(change: &Change) -> Option<usize> {
    change.old_line.or(match change.kind {
        ChangeType::Add => None,
        ChangeType::Del | ChangeType::Normal => change.ln,
    })
}

/// New-file line number. `ln` only stands in on a change that exists in the new file.
pub fn new_line(change: &Change) -> Option<usize> {
    change.new_line.or(match change.kind {
        ChangeType::Del => None,
        ChangeType::Add | ChangeType::Normal => change.ln,
    })
}

pub fn line_on(change: &Change, side: Side) -> Option<usize> {
    match side {
        Side::Old => old_line(change),
        Side::New => new_line(change),
    }
}

/// Index of the change carrying `line` on `side`.
///
/// A changed line (`del` on the old side, `add` on the new side) wins over a
/// context line with the same number.
pub fn find_change(chunk: &Chunk, side: Side, line: usize) -> Option<usize> {
    let preferred = match side {
        Side::Old => ChangeType::Del,
        Side::New => ChangeType::Add,
    };
    let mut fallback = None;
    for (idx, change) in chunk.changes.iter().enumerate() {
        if line_on(change, side) != Some(line) {
            continue;
        }
        if change.kind == preferred {
            return Some(idx);
        }
        if fallback.is_none() {
            fallback = Some(idx);
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_ln(kind: ChangeType, ln: usize) -> Change {
        Change {
            kind,
            content: String::new(),
            old_line: None,
            new_line: None,
            ln: Some(ln),
        }
    }

    #[test]
    fn own_fields_win() {
        let mut c = Change::normal("x", 4, 6);
        c.ln = Some(99);
        assert_eq!(old_line(&c), Some(4));
        assert_eq!(new_line(&c), Some(6));
    }

    #[test]
    fn ln_fallback_stays_on_own_side() {
        let add = with_ln(ChangeType::Add, 7);
        assert_eq!(new_line(&add), Some(7));
        assert_eq!(old_line(&add), None);

        let del = with_ln(ChangeType::Del, 3);
        assert_eq!(old_line(&del), Some(3));
        assert_eq!(new_line(&del), None);
        assert_eq!(line_on(&del, Side::of(&del)), Some(3));
    }

    #[test]
    fn side_of_change() {
        assert_eq!(Side::of(&Change::del("a", 1)), Side::Old);
        assert_eq!(Side::of(&Change::add("a", 1)), Side::New);
        assert_eq!(Side::of(&Change::normal("a", 1, 1)), Side::New);
    }

    #[test]
    fn find_change_prefers_changed_lines() {
        let chunk = Chunk {
            content: String::new(),
            changes: vec![
                Change::normal("a", 1, 1),
                Change::del("b", 2),
                Change::add("B", 2),
                Change::normal("c", 3, 3),
            ],
            old_start: 1,
            old_lines: 3,
            new_start: 1,
            new_lines: 3,
        };
        assert_eq!(find_change(&chunk, Side::New, 2), Some(2));
        assert_eq!(find_change(&chunk, Side::Old, 2), Some(1));
        assert_eq!(find_change(&chunk, Side::Old, 3), Some(3));
        assert_eq!(find_change(&chunk, Side::New, 9), None);
    }
}
