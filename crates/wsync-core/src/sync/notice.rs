//! Change notices for rewritten documents

use similar::TextDiff;
use tracing::{debug, info};

use super::diff::Change;

/// Log what changed in `display_path`: one info line per change and the
/// full unified diff at debug level.
pub(crate) fn announce(display_path: &str, changes: &[Change], before: Option<&str>, after: &str) {
    if before.is_none() {
        info!(path = display_path, "created");
    }
    for change in changes {
        info!(path = display_path, "{}", change);
    }

    debug!(
        path = display_path,
        "\n{}",
        unified_diff(display_path, before.unwrap_or(""), after)
    );
}

/// Render a unified diff between two documents, empty when they are equal.
pub fn unified_diff(display_path: &str, before: &str, after: &str) -> String {
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(2)
        .header(display_path, display_path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_diff_marks_changed_lines() {
        let before = "{\n  \"references\": []\n}\n";
        let after = "{\n  \"references\": [\n    {\n      \"path\": \"../a\"\n    }\n  ]\n}\n";
        let diff = unified_diff("packages/b/tsconfig.json", before, after);
        assert!(diff.contains("--- packages/b/tsconfig.json"));
        assert!(diff.contains("-  \"references\": []"));
        assert!(diff.contains("+      \"path\": \"../a\""));
    }

    #[test]
    fn test_equal_documents_have_empty_diff() {
        assert!(unified_diff("x.json", "{}\n", "{}\n").is_empty());
    }
}
