//! Enumeration of well-formed conflict blocks.
//!
//! Used by hosts that want to list or bulk-resolve conflicts. Blocks that do
//! not close cleanly are skipped here; the resolver reports them in detail.

use std::ops::Range;

use serde::Serialize;

use crate::editor::HostEditor;
use crate::markers::{Annotations, MarkerKind, MarkerPatterns};

/// Line layout of one conflict block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictBlock {
    /// The `<<<<<<<` line.
    pub start: usize,
    /// The `=======` line.
    pub divider: usize,
    /// The `>>>>>>>` line.
    pub end: usize,
    /// Text after the opening marker, without any annotation.
    pub incoming_label: String,
    /// Text after the closing marker, without any annotation.
    pub current_label: String,
}

impl ConflictBlock {
    pub fn incoming_lines(&self) -> Range<usize> {
        self.start + 1..self.divider
    }

    pub fn current_lines(&self) -> Range<usize> {
        self.divider + 1..self.end
    }

    /// Total lines, markers included.
    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, line: usize) -> bool {
        (self.start..=self.end).contains(&line)
    }
}

enum State {
    Outside,
    Incoming { start: usize },
    Current { start: usize, divider: usize },
}

/// All well-formed blocks in buffer order.
pub fn find_blocks<E: HostEditor + ?Sized>(
    editor: &E,
    patterns: &MarkerPatterns,
    annotations: &Annotations,
) -> Vec<ConflictBlock> {
    let mut blocks = Vec::new();
    let mut state = State::Outside;

    for index in 0..editor.line_count() {
        let Some(text) = editor.line_text(index) else {
            break;
        };
        state = match (patterns.classify(text), state) {
            // A new opening marker always restarts, abandoning any open block.
            (Some(MarkerKind::IncomingStart), _) => State::Incoming { start: index },
            (Some(MarkerKind::Divider), State::Incoming { start }) => State::Current {
                start,
                divider: index,
            },
            (Some(MarkerKind::CurrentEnd), State::Current { start, divider }) => {
                let label = |kind, line: usize| {
                    let text = editor.line_text(line).unwrap_or_default();
                    patterns.label(kind, annotations.strip(text)).to_string()
                };
                blocks.push(ConflictBlock {
                    start,
                    divider,
                    end: index,
                    incoming_label: label(MarkerKind::IncomingStart, start),
                    current_label: label(MarkerKind::CurrentEnd, index),
                });
                State::Outside
            }
            (Some(MarkerKind::Divider | MarkerKind::CurrentEnd), _) => State::Outside,
            (None, state) => state,
        };
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::MemoryEditor;

    fn find(lines: &[&str]) -> Vec<ConflictBlock> {
        let editor = MemoryEditor::from_lines(lines.iter().copied());
        find_blocks(&editor, &MarkerPatterns::default(), &Annotations::default())
    }

    #[test]
    fn test_finds_block_layout_and_labels() {
        let blocks = find(&[
            "a",
            "<<<<<<< HEAD -- Incoming Change",
            "x",
            "y",
            "=======",
            "z",
            ">>>>>>> feature/login -- Current Change",
        ]);
        assert_eq!(blocks.len(), 1);
        let b = &blocks[0];
        assert_eq!((b.start, b.divider, b.end), (1, 4, 6));
        assert_eq!(b.incoming_label, "HEAD");
        assert_eq!(b.current_label, "feature/login");
        assert_eq!(b.incoming_lines(), 2..4);
        assert_eq!(b.current_lines(), 5..6);
        assert_eq!(b.line_count(), 6);
        assert!(b.contains(3));
        assert!(!b.contains(0));
    }

    #[test]
    fn test_multiple_blocks_in_order() {
        let blocks = find(&[
            "<<<<<<< a", "=======", ">>>>>>> b", "<<<<<<< c", "=======", ">>>>>>> d",
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].start, 3);
    }

    #[test]
    fn test_malformed_blocks_are_skipped() {
        let blocks = find(&[
            "<<<<<<< lost",
            "x",
            "<<<<<<< a",
            "=======",
            ">>>>>>> b",
            "=======",
            ">>>>>>> stray",
            "<<<<<<< open",
        ]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start, 2);
    }
}
