//! Host editor capabilities consumed by the engine.
//!
//! The engine never owns or copies the line buffer. Everything it does goes
//! through [`HostEditor`], addressed by 0-based line index, so the host keeps
//! its undo history, line identities and widgets consistent.
//!
//! [`MemoryEditor`] is a complete in-memory host used by the terminal front
//! end and the test suite.

pub mod memory;

use serde::Serialize;

use crate::conflict::control::{ControlWidget, WidgetOptions};
use crate::errors::EditorError;

pub use memory::MemoryEditor;

// ---------------------------------------------------------------------------
// Addressing types
// ---------------------------------------------------------------------------

/// Identity of a widget attached to a line. Stable while the line lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WidgetId(pub u64);

impl std::fmt::Display for WidgetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Column argument for [`HostEditor::replace_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Character offset within the line.
    At(usize),
    /// End of the line, whatever its length.
    End,
}

/// A cursor position. `ch` counts characters, not bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub ch: usize,
}

impl Position {
    pub fn line_start(line: usize) -> Self {
        Self { line, ch: 0 }
    }
}

/// A selection range; collapsed when `anchor == head`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
}

impl Selection {
    /// An empty selection at the start of `line`.
    pub fn collapsed(line: usize) -> Self {
        let pos = Position::line_start(line);
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Inclusive range of lines this selection touches.
    pub fn line_span(&self) -> (usize, usize) {
        let (a, b) = (self.anchor.line, self.head.line);
        (a.min(b), a.max(b))
    }
}

// ---------------------------------------------------------------------------
// Change notifications
// ---------------------------------------------------------------------------

/// What caused a buffer change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    /// Text typed or inserted programmatically.
    Input,
    /// Lines removed by a delete command.
    Delete,
    /// Replayed from the undo history.
    Undo,
    /// Replayed from the redo history.
    Redo,
    /// The whole document was replaced.
    SetValue,
}

/// One change notification, in the order the host applied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub origin: ChangeOrigin,
    /// First line affected, valid at the time the change was applied.
    pub from_line: usize,
    /// Number of lines removed at `from_line`.
    pub removed: usize,
    /// Text of the lines present at `from_line` after the change.
    pub text: Vec<String>,
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// The edit primitives a host editor exposes to the engine.
pub trait HostEditor {
    /// Number of lines currently in the buffer.
    fn line_count(&self) -> usize;

    /// Text of `line`, or `None` past the end of the buffer.
    fn line_text(&self, line: usize) -> Option<&str>;

    /// Whether `line` already carries at least one widget.
    fn line_has_widgets(&self, line: usize) -> bool;

    /// Add a styling class to `line`. Adding a class twice is a no-op.
    fn add_line_class(&mut self, line: usize, class: &str) -> Result<(), EditorError>;

    /// Attach a rendered widget to `line`.
    fn add_line_widget(
        &mut self,
        line: usize,
        widget: ControlWidget,
        options: WidgetOptions,
    ) -> Result<WidgetId, EditorError>;

    /// Current index of the line owning `widget`.
    fn widget_line(&self, widget: WidgetId) -> Option<usize>;

    /// Insert `text` on `line` at `column`.
    fn replace_range(&mut self, text: &str, line: usize, column: Column)
        -> Result<(), EditorError>;

    /// Drop the local edit history so earlier edits cannot be undone.
    fn clear_history(&mut self);

    /// Replace all selections.
    fn set_selections(&mut self, selections: Vec<Selection>) -> Result<(), EditorError>;

    /// Delete every line touched by the current selections as one edit.
    fn delete_selected_lines(&mut self) -> Result<(), EditorError>;

    /// Head of the primary selection.
    fn cursor(&self) -> Position;

    /// Collapse the selection to a single cursor at `pos`.
    fn set_cursor(&mut self, pos: Position) -> Result<(), EditorError>;
}

/// Hosts that queue change notifications for the session to consume.
pub trait ChangeSource {
    /// Drain the changes applied since the last call.
    fn take_changes(&mut self) -> Vec<Change>;
}

/// Resolves a widget to the index of its owning line at activation time.
pub trait LineResolver<E: HostEditor + ?Sized> {
    fn line_of(&self, editor: &E, widget: WidgetId) -> Option<usize>;
}

/// Asks the host itself where the widget lives.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostLineResolver;

impl<E: HostEditor + ?Sized> LineResolver<E> for HostLineResolver {
    fn line_of(&self, editor: &E, widget: WidgetId) -> Option<usize> {
        editor.widget_line(widget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_line_span_is_ordered() {
        let sel = Selection {
            anchor: Position { line: 5, ch: 2 },
            head: Position { line: 2, ch: 0 },
        };
        assert_eq!(sel.line_span(), (2, 5));
        assert!(!sel.is_collapsed());
        assert!(Selection::collapsed(3).is_collapsed());
    }

    #[test]
    fn test_host_line_resolver_follows_widget() {
        let mut editor = MemoryEditor::from_text("a\n<<<<<<< x\nb\n");
        let id = editor
            .add_line_widget(1, ControlWidget::default(), WidgetOptions::anchored_above())
            .unwrap();
        assert_eq!(HostLineResolver.line_of(&editor, id), Some(1));

        editor.set_selections(vec![Selection::collapsed(0)]).unwrap();
        editor.delete_selected_lines().unwrap();
        assert_eq!(HostLineResolver.line_of(&editor, id), Some(0));
    }
}
