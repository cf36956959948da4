//! Line-based duplicate pattern detection.
//!
//! A pattern starting at a line is the run of consecutive meaningful lines
//! (non-blank, not a `#` comment, compared after stripping) capped at the
//! window. Runs reaching the minimum length are searched forward; only the
//! first recurrence per start line is reported.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// 1-based start of the pattern.
    pub first_line: usize,
    /// 1-based start of its first later recurrence.
    pub duplicate_line: usize,
    /// Stripped pattern lines.
    pub pattern_lines: Vec<String>,
}

impl DuplicateMatch {
    pub fn pattern(&self) -> String {
        self.pattern_lines.join("\n")
    }
}

/// Stripped text and fingerprint of a meaningful line; None breaks a run.
fn fingerprint(line: &str) -> Option<(&str, u64)> {
    let stripped = line.trim();
    if stripped.is_empty() || stripped.starts_with('#') {
        return None;
    }
    Some((stripped, xxh64(stripped.as_bytes(), 0)))
}

pub fn find_duplicates(lines: &[&str], window: usize, min_run: usize) -> Vec<DuplicateMatch> {
    let prints: Vec<Option<(&str, u64)>> = lines.iter().map(|l| fingerprint(l)).collect();
    let len = prints.len();
    let mut out = Vec::new();

    for i in 0..len.saturating_sub(2) {
        let run = prints[i..len.min(i + window)]
            .iter()
            .take_while(|p| p.is_some())
            .count();
        if run < min_run.max(1) {
            continue;
        }
        let pattern = &prints[i..i + run];

        let hit = (i + run..=len - run).find(|&k| {
            prints[k..k + run]
                .iter()
                .zip(pattern)
                .all(|(cand, pat)| match (cand, pat) {
                    (Some((ct, ch)), Some((pt, ph))) => ch == ph && ct == pt,
                    _ => false,
                })
        });

        if let Some(k) = hit {
            out.push(DuplicateMatch {
                first_line: i + 1,
                duplicate_line: k + 1,
                pattern_lines: pattern
                    .iter()
                    .flatten()
                    .map(|(text, _)| (*text).to_string())
                    .collect(),
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<&str> {
        src.lines().collect()
    }

    #[test]
    fn finds_repeated_three_line_block() {
        let src = "a = 1\nb = 2\nc = 3\n\nx = 0\n\na = 1\nb = 2\nc = 3\n";
        let found = find_duplicates(&lines(src), 10, 3);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first_line, 1);
        assert_eq!(found[0].duplicate_line, 7);
        assert_eq!(found[0].pattern(), "a = 1\nb = 2\nc = 3");
    }

    #[test]
    fn recurrence_at_end_of_file_is_found() {
        // Pattern occupies the final three lines exactly.
        let src = "a = 1\nb = 2\nc = 3\n\na = 1\nb = 2\nc = 3";
        let found = find_duplicates(&lines(src), 10, 3);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].duplicate_line, 5);
    }

    #[test]
    fn indentation_is_ignored_and_comments_break_runs() {
        let src = "if x:\n    a()\n    b()\n# note\nif x:\na()\nb()\n";
        let found = find_duplicates(&lines(src), 10, 3);
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].first_line, found[0].duplicate_line), (1, 5));
    }

    #[test]
    fn short_runs_are_ignored() {
        let src = "a = 1\nb = 2\n\na = 1\nb = 2\n";
        assert!(find_duplicates(&lines(src), 10, 3).is_empty());
    }

    #[test]
    fn overlapping_matches_are_reported_per_start_line() {
        let body = "a()\nb()\nc()\nd()\n";
        let src = format!("{body}\n{body}");
        let found = find_duplicates(&lines(&src), 10, 3);
        let starts: Vec<usize> = found.iter().map(|d| d.first_line).collect();
        assert_eq!(starts, vec![1, 2]);
        assert_eq!(found[1].pattern_lines, vec!["b()", "c()", "d()"]);
    }

    #[test]
    fn window_caps_pattern_length() {
        let body = "a()\nb()\nc()\nd()\ne()\n";
        let src = format!("{body}\n{body}");
        let found = find_duplicates(&lines(&src), 3, 3);
        assert_eq!(found[0].pattern_lines.len(), 3);
    }

    #[test]
    fn tiny_inputs_do_not_panic() {
        assert!(find_duplicates(&[], 10, 3).is_empty());
        assert!(find_duplicates(&["a"], 10, 3).is_empty());
        assert!(find_duplicates(&["a", "a"], 10, 3).is_empty());
    }
}
