//! Glob include/exclude filtering over a diff's changed file paths.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::PathFilterError;
use crate::model::FileDiff;

/// Compiled include/exclude glob sets. A path passes iff `include` is empty
/// or matches, AND no `exclude` pattern matches.
pub struct PathFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, PathFilterError> {
        let include = if include.is_empty() {
            None
        } else {
            Some(build_set(include)?)
        };
        let exclude = build_set(exclude)?;
        Ok(Self { include, exclude })
    }

    pub fn passes(&self, path: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .map(|set| set.is_match(path))
            .unwrap_or(true);
        included && !self.exclude.is_match(path)
    }

    /// Filters a parsed diff's files in place, keeping only those whose
    /// `new_path` passes.
    pub fn filter(&self, files: Vec<FileDiff>) -> Vec<FileDiff> {
        files.into_iter().filter(|f| self.passes(&f.new_path)).collect()
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, PathFilterError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| PathFilterError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|source| PathFilterError::InvalidPattern {
            pattern: patterns.join(","),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> FileDiff {
        FileDiff::new(path, path)
    }

    #[test]
    fn include_and_exclude_combine() {
        let filter = PathFilter::new(
            &["src/**/*.py".to_string()],
            &["**/utils.py".to_string()],
        )
        .unwrap();

        let files = vec![file("src/main.py"), file("src/utils.py"), file("docs/a.md")];
        let kept = filter.filter(files);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].new_path, "src/main.py");
    }

    #[test]
    fn empty_include_means_everything_passes() {
        let filter = PathFilter::new(&[], &[]).unwrap();
        assert!(filter.passes("anything/at/all.rs"));
    }
}
