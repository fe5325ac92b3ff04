//! Unified diff parsing.
//!
//! Recognition rules match a conventional `git diff` unified format: a file
//! starts at `diff --git a/<old> b/<new>`; `new file mode` / `deleted file
//! mode` / `rename from` / `Binary files …` set flags on the current file;
//! a hunk starts at `@@ -A,B +C,D @@<header>` with missing counts defaulting
//! to 1; hunk body lines begin with `+`, `-`, a space, or are empty, and
//! anything else terminates the hunk (the next hunk header starts a fresh
//! one).

use crate::error::ParseError;
use crate::model::{FileDiff, Hunk};

/// Parses a full unified diff buffer into an ordered list of [`FileDiff`].
///
/// Unparseable hunk headers are skipped rather than failing the whole
/// parse — a handful of platforms emit diffs with the odd odd-ball hunk,
/// and losing one hunk is preferable to losing the entire review.
pub fn parse_unified_diff(diff_text: &str) -> Vec<FileDiff> {
    let mut files = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut in_hunk = false;

    for line in diff_text.split('\n') {
        if let Some(rest) = line.strip_prefix("diff --git a/") {
            if let Some(file) = current.take() {
                files.push(file);
            }
            current = split_diff_git_paths(rest).map(|(old, new)| FileDiff::new(old, new));
            in_hunk = false;
            continue;
        }

        if let Some(file) = current.as_mut() {
            if line.starts_with("new file mode") {
                file.is_new = true;
            } else if line.starts_with("deleted file mode") {
                file.is_deleted = true;
            } else if line.starts_with("rename from") {
                file.is_renamed = true;
            } else if line.starts_with("Binary files") {
                file.is_binary = true;
            }
        }

        if line.starts_with("@@") {
            in_hunk = false;
            if let Some(file) = current.as_mut() {
                match parse_hunk_header(line) {
                    Ok(hunk) => {
                        file.hunks.push(hunk);
                        in_hunk = true;
                    }
                    Err(err) => {
                        tracing::debug!(%err, line, "skipping unparseable hunk header");
                    }
                }
            }
            continue;
        }

        if in_hunk && is_hunk_body_line(line) {
            if let Some(hunk) = current.as_mut().and_then(|f| f.hunks.last_mut()) {
                hunk.lines.push(line.to_string());
            }
        } else {
            in_hunk = false;
        }
    }

    if let Some(file) = current.take() {
        files.push(file);
    }

    files
}

fn is_hunk_body_line(line: &str) -> bool {
    line.starts_with('+') || line.starts_with('-') || line.starts_with(' ') || line.is_empty()
}

/// Splits `"<old> b/<new>"` (the remainder of a `diff --git a/` line) into
/// its two paths. Uses the *last* ` b/` occurrence so that paths which
/// happen to contain the literal substring `" b/"` are still split
/// correctly, mirroring a greedy-leftmost regex match on both halves.
fn split_diff_git_paths(rest: &str) -> Option<(String, String)> {
    let idx = rest.rfind(" b/")?;
    let old = &rest[..idx];
    let new = &rest[idx + 3..];
    Some((old.to_string(), new.to_string()))
}

/// Parses a single `@@ -A,B +C,D @@<header>` line.
pub fn parse_hunk_header(line: &str) -> Result<Hunk, ParseError> {
    let rest = line
        .strip_prefix("@@ ")
        .ok_or_else(|| ParseError::InvalidHunkHeader(line.to_string()))?;
    let end = rest
        .find(" @@")
        .ok_or_else(|| ParseError::InvalidHunkHeader(line.to_string()))?;
    let ranges = &rest[..end];
    let header = rest[end + 3..].trim().to_string();

    let mut parts = ranges.split_whitespace();
    let old = parts
        .next()
        .ok_or_else(|| ParseError::InvalidHunkHeader(line.to_string()))?;
    let new = parts
        .next()
        .ok_or_else(|| ParseError::InvalidHunkHeader(line.to_string()))?;

    let (old_start, old_count) = split_range(old, '-')?;
    let (new_start, new_count) = split_range(new, '+')?;

    Ok(Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        header,
        lines: Vec::new(),
    })
}

/// Splits `"-A,B"` or `"-A"` (and the `+` equivalents) into `(start, count)`,
/// defaulting the count to 1 when omitted.
fn split_range(field: &str, prefix: char) -> Result<(u32, u32), ParseError> {
    let body = field
        .strip_prefix(prefix)
        .ok_or_else(|| ParseError::InvalidHunkHeader(field.to_string()))?;
    let mut parts = body.splitn(2, ',');
    let start = parts
        .next()
        .unwrap()
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidHunkHeader(field.to_string()))?;
    let count = match parts.next() {
        Some(c) => c
            .parse::<u32>()
            .map_err(|_| ParseError::Overflow(field.to_string()))?,
        None => 1,
    };
    Ok((start, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_file_single_hunk() {
        let diff = "diff --git a/src/main.py b/src/main.py\n\
index 111..222 100644\n\
--- a/src/main.py\n\
+++ b/src/main.py\n\
@@ -10,3 +10,5 @@ def main():\n\
     x = 1\n\
+    y = 2\n\
+    z = 3\n\
     return x\n";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 1);
        let f = &files[0];
        assert_eq!(f.new_path, "src/main.py");
        assert_eq!(f.hunks.len(), 1);
        let hunk = &f.hunks[0];
        assert_eq!(hunk.old_start, 10);
        assert_eq!(hunk.new_start, 10);
        assert_eq!(hunk.new_count, 5);
        assert_eq!(hunk.lines.len(), 4);
    }

    #[test]
    fn missing_counts_default_to_one() {
        let hunk = parse_hunk_header("@@ -5 +5 @@").unwrap();
        assert_eq!(hunk.old_count, 1);
        assert_eq!(hunk.new_count, 1);
    }

    #[test]
    fn flags_new_deleted_renamed_binary() {
        let diff = "diff --git a/a.bin b/a.bin\n\
new file mode 100644\n\
Binary files /dev/null and b/a.bin differ\n";
        let files = parse_unified_diff(diff);
        assert!(files[0].is_new);
        assert!(files[0].is_binary);
    }

    #[test]
    fn unparseable_hunk_header_is_skipped_not_fatal() {
        let diff = "diff --git a/x.py b/x.py\n@@ garbage @@\n+still parses file\n";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 1);
        assert!(files[0].hunks.is_empty());
    }
}
