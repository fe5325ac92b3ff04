//! Structured representation of a parsed unified diff.

use serde::{Deserialize, Serialize};

/// A single file's worth of diff: its hunks plus the flags recognized from
/// the extended-header lines that precede the first hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub old_path: String,
    pub new_path: String,
    pub hunks: Vec<Hunk>,
    pub is_new: bool,
    pub is_deleted: bool,
    pub is_renamed: bool,
    pub is_binary: bool,
}

impl FileDiff {
    pub fn new(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
            hunks: Vec::new(),
            is_new: false,
            is_deleted: false,
            is_renamed: false,
            is_binary: false,
        }
    }
}

/// One `@@ -A,B +C,D @@` block and its body lines, raw (with their
/// leading `+`/`-`/` ` marker still attached).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    pub header: String,
    pub lines: Vec<String>,
}

/// Where a new-file line number lands in the diff, in the coordinate the
/// hosting platform's review API requires for inline comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePosition {
    pub diff_position: u32,
    pub content: String,
    pub is_addition: bool,
}
