//! Workspace discovery from the root manifest's `workspaces` globs

use std::collections::BTreeSet;

use tracing::{debug, warn};
use wsync_fs::{NormalizedPath, constants::DEPENDENCY_CACHE};

use crate::{Error, Result};

/// Expand workspace globs into the set of root-relative workspace directories.
///
/// Patterns are resolved against `root`; a pattern starting with `!`
/// excludes what it matches. Only directories count, and neither the root
/// itself nor anything inside a dependency cache is ever a workspace.
pub fn expand_workspaces(
    root: &NormalizedPath,
    patterns: &[String],
) -> Result<BTreeSet<NormalizedPath>> {
    let mut included = BTreeSet::new();
    let mut excluded = BTreeSet::new();

    for pattern in patterns {
        let (negated, pattern) = split_negation(pattern);
        let matches = expand_one(root, pattern)?;
        if negated {
            excluded.extend(matches);
        } else {
            included.extend(matches);
        }
    }

    let workspaces: BTreeSet<NormalizedPath> = included.difference(&excluded).cloned().collect();
    debug!(count = workspaces.len(), "expanded workspace globs");
    Ok(workspaces)
}

/// Whether the root-relative directory `dir` is selected by `patterns`.
///
/// Same selection rules as [`expand_workspaces`], decided from the path
/// alone. The caller checks that `dir` is an existing directory.
pub fn matches_workspace(patterns: &[String], dir: &NormalizedPath) -> Result<bool> {
    if dir.is_base() || dir.escapes_base() || dir.contains_component(DEPENDENCY_CACHE) {
        return Ok(false);
    }
    let options = glob::MatchOptions {
        require_literal_separator: true,
        ..glob::MatchOptions::new()
    };

    let mut included = false;
    for pattern in patterns {
        let (negated, pattern) = split_negation(pattern);
        let normalized = pattern.trim_start_matches("./").trim_end_matches('/');
        let compiled = glob::Pattern::new(normalized).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        if compiled.matches_with(dir.as_str(), options) {
            if negated {
                return Ok(false);
            }
            included = true;
        }
    }
    Ok(included)
}

fn split_negation(pattern: &str) -> (bool, &str) {
    match pattern.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    }
}

fn expand_one(root: &NormalizedPath, pattern: &str) -> Result<Vec<NormalizedPath>> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(root.as_str()),
        pattern.trim_start_matches("./")
    );
    let entries = glob::glob(&full).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut matches = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!(pattern, "skipping unreadable glob entry: {}", e);
                continue;
            }
        };
        if !path.is_dir() {
            continue;
        }
        let Some(relative) = NormalizedPath::from(path).strip_prefix(root) else {
            continue;
        };
        if relative.is_base()
            || relative.escapes_base()
            || relative.contains_component(DEPENDENCY_CACHE)
        {
            continue;
        }
        matches.push(relative);
    }
    Ok(matches)
}
