//! Diff-position index: maps a new-file line number to the 1-based
//! position counter the hosting platform's review API requires for
//! inline comments.

use std::collections::{BTreeMap, HashMap};

use crate::model::{FileDiff, LinePosition};

/// Builds the `new_line_number -> LinePosition` map for one file.
///
/// `diff_position` increments for every line of the file's diff body,
/// including the `@@` header and deletion lines. Context and addition
/// lines advance `new_line`; deletions only advance `diff_position`.
/// Deleted or binary files have no addressable lines and yield an empty
/// index.
pub fn line_positions(file: &FileDiff) -> BTreeMap<u32, LinePosition> {
    let mut positions = BTreeMap::new();
    if file.is_deleted || file.is_binary {
        return positions;
    }

    let mut diff_position: u32 = 0;

    for hunk in &file.hunks {
        diff_position += 1; // the `@@` header line itself
        let mut new_line = hunk.new_start;

        for line in &hunk.lines {
            diff_position += 1;

            if let Some(content) = line.strip_prefix('+') {
                positions.insert(
                    new_line,
                    LinePosition {
                        diff_position,
                        content: content.to_string(),
                        is_addition: true,
                    },
                );
                new_line += 1;
            } else if line.starts_with('-') {
                // Deletion: no entry in the new file, diff_position already counted.
            } else {
                let content = line.strip_prefix(' ').unwrap_or(line.as_str());
                positions.insert(
                    new_line,
                    LinePosition {
                        diff_position,
                        content: content.to_string(),
                        is_addition: false,
                    },
                );
                new_line += 1;
            }
        }
    }

    positions
}

/// Builds the complete index across every reviewable file:
/// `{new_path: {line_number: LinePosition}}`.
pub fn build_position_index(files: &[FileDiff]) -> HashMap<String, BTreeMap<u32, LinePosition>> {
    let mut index = HashMap::new();
    for file in files {
        if !file.is_binary && !file.is_deleted {
            index.insert(file.new_path.clone(), line_positions(file));
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_unified_diff;

    #[test]
    fn position_counts_header_and_deletions() {
        let diff = "diff --git a/f.py b/f.py\n\
@@ -1,3 +1,3 @@\n\
 context\n\
-removed\n\
+added\n";
        let files = parse_unified_diff(diff);
        let positions = line_positions(&files[0]);
        // diff_position: 1 = @@ header, 2 = context, 3 = removed, 4 = added
        let context = positions.get(&1).unwrap();
        assert_eq!(context.diff_position, 2);
        assert!(!context.is_addition);
        let added = positions.get(&2).unwrap();
        assert_eq!(added.diff_position, 4);
        assert!(added.is_addition);
        assert_eq!(added.content, "added");
    }

    #[test]
    fn deleted_file_has_empty_index() {
        let diff = "diff --git a/f.py b/f.py\n\
deleted file mode 100644\n\
@@ -1,2 +0,0 @@\n\
-a\n\
-b\n";
        let files = parse_unified_diff(diff);
        assert!(line_positions(&files[0]).is_empty());
    }
}
