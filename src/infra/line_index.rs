//! Newline index and line buffers with LF/CRLF-robust mapping.
//!
//! Goals
//! - Single pass over bytes to record '\n' positions.
//! - 1-based external line numbers (friendly for UX).
//! - O(1) line→byte start/end via the index.
//! - End byte excludes trailing '\r' for CRLF lines.
//! - Binary search for byte→line mapping.
//! - Line arrays that re-join with the original terminator style.
//!
//! Notes
//! - An empty buffer has 0 lines.
//! - A non-empty buffer without '\n' has 1 line.
//! - A trailing '\n' does not open a new line (matches `str::lines`).
//! - For ranges, end is exclusive (Rust slicing convention).

use std::cmp;

#[derive(Debug, Clone)]
pub struct NewlineIndex {
    /// Byte positions of every '\n' in the buffer.
    nl_positions: Vec<usize>,
    /// Total byte length of the buffer.
    len: usize,
}

impl NewlineIndex {
    /// Build an index recording positions of '\n'.
    pub fn build(bytes: &[u8]) -> Self {
        let mut nl_positions = Vec::with_capacity(bytes.len() / 48);
        let mut i = 0usize;

        // Single pass; record every '\n' offset.
        while let Some(pos) = memchr::memchr(b'\n', &bytes[i..]) {
            let abs = i + pos;
            nl_positions.push(abs);
            i = abs + 1;
        }

        Self {
            nl_positions,
            len: bytes.len(),
        }
    }

    /// Total number of logical lines.
    /// Empty buffer => 0 lines; a final '\n' closes the last line.
    pub fn line_count(&self) -> usize {
        if self.len == 0 {
            return 0;
        }
        match self.nl_positions.last() {
            Some(&last) if last + 1 == self.len => self.nl_positions.len(),
            _ => self.nl_positions.len() + 1,
        }
    }

    /// Start byte (inclusive) of a 1-based line.
    /// Returns None if line is out of range.
    pub fn start_byte_of_line(&self, line1: usize) -> Option<usize> {
        let total = self.line_count();
        if line1 == 0 || line1 > total {
            return None;
        }
        if line1 == 1 {
            return Some(0);
        }
        // For line L>1, start is one past the previous '\n'.
        self.nl_positions
            .get(line1 - 2)
            .map(|&prev_nl| prev_nl + 1)
    }

    /// End byte (exclusive) of a 1-based line.
    /// Returns None if line is out of range.
    /// For CRLF, excludes trailing '\r' before '\n'.
    pub fn end_byte_of_line(&self, line1: usize, bytes: &[u8]) -> Option<usize> {
        let total = self.line_count();
        if line1 == 0 || line1 > total {
            return None;
        }

        // Lines that end with '\n' (not the last line without NL)
        if line1 <= self.nl_positions.len() {
            let nl = self.nl_positions[line1 - 1];
            // If preceding byte is '\r', exclude it.
            if nl > 0 && bytes.get(nl.wrapping_sub(1)) == Some(&b'\r') {
                return Some(nl - 1);
            }
            return Some(nl);
        }

        // Last line without trailing '\n' ends at EOF.
        Some(self.len)
    }

    /// Byte range (start..end) for an inclusive 1-based line span.
    /// Returns None if the span is invalid or out of range.
    pub fn byte_range_for_lines(
        &self,
        start_line1: usize,
        end_line1: usize,
        bytes: &[u8],
    ) -> Option<(usize, usize)> {
        if start_line1 == 0 || end_line1 == 0 || start_line1 > end_line1 {
            return None;
        }
        let total = self.line_count();
        if total == 0 {
            return None;
        }

        let s = self.start_byte_of_line(start_line1)?;
        let e = self.end_byte_of_line(cmp::min(end_line1, total), bytes)?;

        if s <= e && e <= self.len {
            Some((s, e))
        } else {
            None
        }
    }

    /// 1-based line number covering the given byte offset.
    /// Offsets at '\n' belong to the line the '\n' terminates.
    /// Returns 0 for empty buffers.
    pub fn line_of_byte(&self, byte: usize) -> usize {
        if self.len == 0 {
            return 0;
        }
        // Number of '\n' strictly before `byte`.
        let idx = match self.nl_positions.binary_search(&byte) {
            Ok(pos) => pos,
            Err(pos) => pos,
        };
        idx + 1
    }

    /// 1-based (line, column) of a byte offset; column counts bytes.
    pub fn position_of_byte(&self, byte: usize) -> (usize, usize) {
        let line = self.line_of_byte(byte);
        if line == 0 {
            return (1, 1);
        }
        let start = self.start_byte_of_line(line).unwrap_or(0);
        (line, byte.saturating_sub(start) + 1)
    }
}

/// Line terminator style detected from the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Raw text split into lines, remembering how to put it back together.
///
/// Every rewrite stage edits the line array and calls [`SourceLines::join`],
/// so line endings and the final newline survive any number of passes. Each
/// line keeps its own terminator, which matters for files that mix LF and
/// CRLF inside string literals. Inserted lines take the dominant style.
#[derive(Debug, Clone)]
pub struct SourceLines {
    entries: Vec<(String, LineEnding)>,
    pub ending: LineEnding,
    pub trailing_newline: bool,
}

impl SourceLines {
    pub fn split(text: &str) -> Self {
        let crlf = memchr::memmem::find_iter(text.as_bytes(), b"\r\n").count();
        let lf = memchr::memchr_iter(b'\n', text.as_bytes()).count();
        let ending = if crlf > lf - crlf {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };

        let entries = text
            .split_inclusive('\n')
            .map(|raw| {
                if let Some(body) = raw.strip_suffix("\r\n") {
                    (body.to_string(), LineEnding::CrLf)
                } else if let Some(body) = raw.strip_suffix('\n') {
                    (body.to_string(), LineEnding::Lf)
                } else {
                    (raw.to_string(), ending)
                }
            })
            .collect();

        Self {
            entries,
            ending,
            trailing_newline: text.ends_with('\n'),
        }
    }

    pub fn join(&self) -> String {
        let mut out = String::new();
        let last = self.entries.len().saturating_sub(1);
        for (idx, (line, ending)) in self.entries.iter().enumerate() {
            out.push_str(line);
            if idx < last || self.trailing_newline {
                out.push_str(ending.as_str());
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 0-based line text without its terminator.
    pub fn get(&self, idx0: usize) -> Option<&str> {
        self.entries.get(idx0).map(|(line, _)| line.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(line, _)| line.as_str())
    }

    /// Line contents for in-place edits; terminators are untouched.
    pub fn lines_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.entries.iter_mut().map(|(line, _)| line)
    }

    /// Keep lines for which `keep(idx0, line)` holds, dropping the others
    /// together with their terminators.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &str) -> bool,
    {
        let mut idx = 0;
        self.entries.retain(|(line, _)| {
            let kept = keep(idx, line);
            idx += 1;
            kept
        });
    }

    /// Replace a 0-based half-open line range.
    pub fn splice(&mut self, range: std::ops::Range<usize>, content: Vec<String>) {
        let ending = self.ending;
        self.entries
            .splice(range, content.into_iter().map(|line| (line, ending)));
    }

    /// Apply `(before_line0, content)` insertions back-to-front so that
    /// indices still to be processed never shift.
    pub fn insert_all(&mut self, mut edits: Vec<(usize, Vec<String>)>) {
        edits.sort_by(|a, b| b.0.cmp(&a.0));
        for (at, content) in edits {
            let at = at.min(self.entries.len());
            self.splice(at..at, content);
        }
    }
}

/// Read-only view pairing raw text with its newline index.
#[derive(Debug, Clone)]
pub struct PositionIndex<'a> {
    text: &'a str,
    index: NewlineIndex,
    lines: Vec<&'a str>,
}

impl<'a> PositionIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            index: NewlineIndex::build(text.as_bytes()),
            lines: text.lines().collect(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    /// 1-based line text without its terminator.
    pub fn line(&self, line1: usize) -> Option<&'a str> {
        line1.checked_sub(1).and_then(|i| self.lines.get(i).copied())
    }

    /// Leading whitespace of a 1-based line.
    pub fn indent_of(&self, line1: usize) -> &'a str {
        self.line(line1)
            .map(|l| &l[..l.len() - l.trim_start().len()])
            .unwrap_or("")
    }

    /// Inclusive 1-based line span as it appears in the text.
    pub fn text_of_lines(&self, start_line1: usize, end_line1: usize) -> Option<&'a str> {
        let (lo, hi) =
            self.index
                .byte_range_for_lines(start_line1, end_line1, self.text.as_bytes())?;
        self.text.get(lo..hi)
    }

    /// Owned copies of an inclusive 1-based line span, clamped to the text.
    pub fn lines_between(&self, start_line1: usize, end_line1: usize) -> Vec<String> {
        if start_line1 == 0 || start_line1 > end_line1 {
            return Vec::new();
        }
        let end = end_line1.min(self.lines.len());
        self.lines
            .get(start_line1 - 1..end)
            .map(|s| s.iter().map(|l| l.to_string()).collect())
            .unwrap_or_default()
    }

    pub fn position_of_byte(&self, byte: usize) -> (usize, usize) {
        self.index.position_of_byte(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines_like_str_lines() {
        for text in ["", "a", "a\n", "a\nb", "a\nb\n", "\n\n", "a\r\nb\r\n"] {
            let idx = NewlineIndex::build(text.as_bytes());
            assert_eq!(idx.line_count(), text.lines().count(), "{text:?}");
        }
    }

    #[test]
    fn crlf_end_excludes_carriage_return() {
        let text = "ab\r\ncd\r\n";
        let idx = NewlineIndex::build(text.as_bytes());
        assert_eq!(idx.byte_range_for_lines(1, 1, text.as_bytes()), Some((0, 2)));
        assert_eq!(idx.byte_range_for_lines(2, 2, text.as_bytes()), Some((4, 6)));
    }

    #[test]
    fn byte_positions_are_one_based() {
        let text = "ab\ncd\n";
        let idx = NewlineIndex::build(text.as_bytes());
        assert_eq!(idx.position_of_byte(0), (1, 1));
        assert_eq!(idx.position_of_byte(2), (1, 3));
        assert_eq!(idx.position_of_byte(4), (2, 2));
    }

    #[test]
    fn source_lines_round_trip_preserves_style() {
        for text in ["a\nb\n", "a\nb", "a\r\nb\r\n", ""] {
            assert_eq!(SourceLines::split(text).join(), text);
        }
    }

    #[test]
    fn mixed_endings_are_kept_per_line() {
        let text = "a = 1\r\ns = '''x\ny'''\r\nb = 2\r\n";
        let mut src = SourceLines::split(text);
        assert_eq!(src.ending, LineEnding::CrLf);
        assert_eq!(src.join(), text);

        src.retain(|idx, _| idx != 0);
        src.insert_all(vec![(3, vec!["c = 3".to_string()])]);
        assert_eq!(src.join(), "s = '''x\ny'''\r\nb = 2\r\nc = 3\r\n");
    }

    #[test]
    fn insertions_apply_back_to_front() {
        let mut src = SourceLines::split("a\nb\nc\n");
        src.insert_all(vec![
            (1, vec!["x".to_string()]),
            (2, vec!["y".to_string()]),
        ]);
        assert_eq!(src.join(), "a\nx\nb\ny\nc\n");
    }

    #[test]
    fn position_index_slices_spans() {
        let text = "one\n  two\nthree\n";
        let pos = PositionIndex::new(text);
        assert_eq!(pos.line_count(), 3);
        assert_eq!(pos.indent_of(2), "  ");
        assert_eq!(pos.text_of_lines(2, 3), Some("  two\nthree"));
        assert_eq!(pos.lines_between(2, 9), vec!["  two", "three"]);
        assert!(pos.line(0).is_none());
    }
}
