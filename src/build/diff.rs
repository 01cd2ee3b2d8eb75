//! Diff summaries for updated destination files

use similar::{ChangeTag, TextDiff};

/// "+N, -M" line-diff summary between two text versions.
pub fn summarize(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);

    let mut additions = 0usize;
    let mut deletions = 0usize;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => additions += 1,
            ChangeTag::Delete => deletions += 1,
            ChangeTag::Equal => {}
        }
    }

    format!("+{}, -{}", additions, deletions)
}
