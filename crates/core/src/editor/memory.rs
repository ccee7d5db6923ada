//! In-memory [`HostEditor`] implementation.
//!
//! Widgets and classes live on the line they were attached to, so they move
//! when earlier lines are deleted and disappear with their own line. Lines
//! brought back by undo are fresh lines with no widgets, like a real editor
//! recreating line handles.

use std::collections::BTreeSet;

use tracing::debug;

use crate::conflict::control::{ControlWidget, WidgetOptions};
use crate::editor::{
    Change, ChangeOrigin, ChangeSource, Column, HostEditor, Position, Selection, WidgetId,
};
use crate::errors::EditorError;

#[derive(Debug, Clone)]
struct AttachedWidget {
    id: WidgetId,
    widget: ControlWidget,
    options: WidgetOptions,
}

#[derive(Debug, Clone)]
struct Line {
    text: String,
    classes: Vec<String>,
    widgets: Vec<AttachedWidget>,
}

impl Line {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            classes: Vec::new(),
            widgets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
enum Edit {
    /// `text` inserted at character `ch` of `line`.
    Insert { line: usize, ch: usize, text: String },
    /// Lines removed, with their original indices in ascending order.
    DeleteLines { removed: Vec<(usize, String)> },
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    edit: Edit,
    before: Vec<Selection>,
    after: Vec<Selection>,
}

/// A line buffer with selections, widgets, and an undo/redo history.
#[derive(Debug, Clone)]
pub struct MemoryEditor {
    lines: Vec<Line>,
    line_ending: &'static str,
    trailing_newline: bool,
    selections: Vec<Selection>,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    changes: Vec<Change>,
    next_widget_id: u64,
    revision: u64,
}

impl Default for MemoryEditor {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            line_ending: "\n",
            trailing_newline: false,
            selections: vec![Selection::collapsed(0)],
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            changes: Vec::new(),
            next_widget_id: 1,
            revision: 0,
        }
    }
}

impl MemoryEditor {
    /// Build an editor from file contents. Line endings are preserved.
    pub fn from_text(text: &str) -> Self {
        let mut editor = Self::default();
        editor.load(text);
        editor
    }

    /// Build an editor from individual lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Line::new).collect(),
            ..Self::default()
        }
    }

    fn load(&mut self, text: &str) {
        self.line_ending = if text.contains("\r\n") { "\r\n" } else { "\n" };
        self.trailing_newline = text.ends_with('\n');
        self.lines = text.lines().map(Line::new).collect();
    }

    /// Replace the whole document, dropping widgets, classes and history.
    pub fn swap_doc(&mut self, text: &str) {
        let removed = self.lines.len();
        self.load(text);
        self.selections = vec![Selection::collapsed(0)];
        self.clear_history();
        self.changes.push(Change {
            origin: ChangeOrigin::SetValue,
            from_line: 0,
            removed,
            text: self.lines.iter().map(|l| l.text.clone()).collect(),
        });
        self.revision += 1;
        debug!(lines = self.lines.len(), "document swapped");
    }

    /// The buffer as text, with the original line ending convention.
    pub fn text(&self) -> String {
        self.render(|line| line)
    }

    /// Like [`text`](Self::text), passing each line through `map` first.
    pub fn render(&self, map: impl Fn(&str) -> &str) -> String {
        let mut out = self
            .lines
            .iter()
            .map(|l| map(l.text.as_str()))
            .collect::<Vec<_>>()
            .join(self.line_ending);
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(self.line_ending);
        }
        out
    }

    pub fn lines(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }

    pub fn line_classes(&self, line: usize) -> &[String] {
        self.lines.get(line).map_or(&[], |l| l.classes.as_slice())
    }

    /// Widget ids attached to `line`, in attachment order.
    pub fn widgets_on(&self, line: usize) -> Vec<WidgetId> {
        self.lines
            .get(line)
            .map(|l| l.widgets.iter().map(|w| w.id).collect())
            .unwrap_or_default()
    }

    /// Every live widget id in buffer order.
    pub fn widget_ids(&self) -> Vec<WidgetId> {
        self.lines
            .iter()
            .flat_map(|l| l.widgets.iter().map(|w| w.id))
            .collect()
    }

    pub fn widget(&self, id: WidgetId) -> Option<(&ControlWidget, WidgetOptions)> {
        self.lines
            .iter()
            .flat_map(|l| l.widgets.iter())
            .find(|w| w.id == id)
            .map(|w| (&w.widget, w.options))
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Incremented once per text mutation, however many lines it touches.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Revert the most recent recorded edit. Returns `false` when the
    /// history is empty.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.undo_stack.pop() else {
            return false;
        };

        match &entry.edit {
            Edit::Insert { line, ch, text } => {
                if let Some(l) = self.lines.get_mut(*line) {
                    if let Some(start) = byte_offset(&l.text, *ch) {
                        l.text.replace_range(start..start + text.len(), "");
                    }
                    let restored = l.text.clone();
                    self.changes.push(Change {
                        origin: ChangeOrigin::Undo,
                        from_line: *line,
                        removed: 1,
                        text: vec![restored],
                    });
                }
            }
            Edit::DeleteLines { removed } => {
                for (index, text) in removed {
                    self.lines.insert(*index, Line::new(text.clone()));
                }
                for (start, len) in runs(removed.iter().map(|(i, _)| *i)) {
                    self.changes.push(Change {
                        origin: ChangeOrigin::Undo,
                        from_line: start,
                        removed: 0,
                        text: self.lines[start..start + len]
                            .iter()
                            .map(|l| l.text.clone())
                            .collect(),
                    });
                }
            }
        }

        self.selections = entry.before.clone();
        self.redo_stack.push(entry);
        self.revision += 1;
        debug!(lines = self.lines.len(), "undo applied");
        true
    }

    /// Re-apply the most recently undone edit. A redone deletion is reported
    /// bottom-up, like the original deletion.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };

        match &entry.edit {
            Edit::Insert { line, ch, text } => {
                if let Ok(new_text) = self.apply_insert(*line, *ch, text) {
                    self.changes.push(Change {
                        origin: ChangeOrigin::Redo,
                        from_line: *line,
                        removed: 1,
                        text: vec![new_text],
                    });
                }
            }
            Edit::DeleteLines { removed } => {
                let indices: Vec<usize> = removed.iter().map(|(i, _)| *i).collect();
                self.apply_delete(&indices, ChangeOrigin::Redo);
            }
        }

        self.selections = entry.after.clone();
        self.undo_stack.push(entry);
        self.revision += 1;
        debug!(lines = self.lines.len(), "redo applied");
        true
    }

    fn check_line(&self, line: usize) -> Result<(), EditorError> {
        if line < self.lines.len() {
            Ok(())
        } else {
            Err(EditorError::LineOutOfRange {
                line,
                len: self.lines.len(),
            })
        }
    }

    fn record(&mut self, edit: Edit, before: Vec<Selection>) {
        self.undo_stack.push(HistoryEntry {
            edit,
            before,
            after: self.selections.clone(),
        });
        self.redo_stack.clear();
    }

    fn apply_insert(&mut self, line: usize, ch: usize, text: &str) -> Result<String, EditorError> {
        let len = self.lines.len();
        let target = self
            .lines
            .get_mut(line)
            .ok_or(EditorError::LineOutOfRange { line, len })?;
        let at = byte_offset(&target.text, ch).ok_or(EditorError::ColumnOutOfRange { line, ch })?;
        target.text.insert_str(at, text);
        Ok(target.text.clone())
    }

    /// Remove `indices` (ascending, unique) and report them bottom-up so each
    /// change's `from_line` is valid when applied in order.
    fn apply_delete(&mut self, indices: &[usize], origin: ChangeOrigin) -> Vec<(usize, String)> {
        let mut removed = Vec::with_capacity(indices.len());
        for &index in indices.iter().rev() {
            let line = self.lines.remove(index);
            removed.push((index, line.text));
        }
        removed.reverse();

        let mut spans = runs(indices.iter().copied());
        spans.reverse();
        for (start, len) in spans {
            self.changes.push(Change {
                origin,
                from_line: start,
                removed: len,
                text: Vec::new(),
            });
        }
        removed
    }

    fn clamp(&self, pos: Position) -> Position {
        let line = pos.line.min(self.lines.len().saturating_sub(1));
        let max_ch = self.lines.get(line).map_or(0, |l| l.text.chars().count());
        Position {
            line,
            ch: pos.ch.min(max_ch),
        }
    }
}

impl HostEditor for MemoryEditor {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_text(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(|l| l.text.as_str())
    }

    fn line_has_widgets(&self, line: usize) -> bool {
        self.lines.get(line).is_some_and(|l| !l.widgets.is_empty())
    }

    fn add_line_class(&mut self, line: usize, class: &str) -> Result<(), EditorError> {
        self.check_line(line)?;
        let classes = &mut self.lines[line].classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        Ok(())
    }

    fn add_line_widget(
        &mut self,
        line: usize,
        widget: ControlWidget,
        options: WidgetOptions,
    ) -> Result<WidgetId, EditorError> {
        self.check_line(line)?;
        let id = WidgetId(self.next_widget_id);
        self.next_widget_id += 1;
        self.lines[line].widgets.push(AttachedWidget {
            id,
            widget,
            options,
        });
        Ok(id)
    }

    fn widget_line(&self, widget: WidgetId) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.widgets.iter().any(|w| w.id == widget))
    }

    fn replace_range(
        &mut self,
        text: &str,
        line: usize,
        column: Column,
    ) -> Result<(), EditorError> {
        if text.contains('\n') {
            return Err(EditorError::Rejected(
                "multi-line inserts are not supported".into(),
            ));
        }
        self.check_line(line)?;
        let ch = match column {
            Column::At(ch) => ch,
            Column::End => self.lines[line].text.chars().count(),
        };

        let before = self.selections.clone();
        let new_text = self.apply_insert(line, ch, text)?;
        self.changes.push(Change {
            origin: ChangeOrigin::Input,
            from_line: line,
            removed: 1,
            text: vec![new_text],
        });
        self.record(
            Edit::Insert {
                line,
                ch,
                text: text.to_string(),
            },
            before,
        );
        self.revision += 1;
        Ok(())
    }

    fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn set_selections(&mut self, selections: Vec<Selection>) -> Result<(), EditorError> {
        if selections.is_empty() {
            return Err(EditorError::Rejected("at least one selection is required".into()));
        }
        for sel in &selections {
            let (_, last) = sel.line_span();
            if !(self.lines.is_empty() && last == 0) {
                self.check_line(last)?;
            }
        }
        self.selections = selections;
        Ok(())
    }

    fn delete_selected_lines(&mut self) -> Result<(), EditorError> {
        let len = self.lines.len();
        let targets: BTreeSet<usize> = self
            .selections
            .iter()
            .flat_map(|s| {
                let (a, b) = s.line_span();
                a..=b
            })
            .filter(|&l| l < len)
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        let indices: Vec<usize> = targets.into_iter().collect();
        let before = self.selections.clone();
        let removed = self.apply_delete(&indices, ChangeOrigin::Delete);

        let cursor = self.clamp(Position::line_start(indices[0]));
        self.selections = vec![Selection {
            anchor: cursor,
            head: cursor,
        }];
        self.record(Edit::DeleteLines { removed }, before);
        self.revision += 1;
        debug!(deleted = indices.len(), "lines deleted");
        Ok(())
    }

    fn cursor(&self) -> Position {
        self.selections.first().map(|s| s.head).unwrap_or_default()
    }

    fn set_cursor(&mut self, pos: Position) -> Result<(), EditorError> {
        let pos = self.clamp(pos);
        self.selections = vec![Selection {
            anchor: pos,
            head: pos,
        }];
        Ok(())
    }
}

impl ChangeSource for MemoryEditor {
    fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }
}

/// Byte offset of character `ch`, allowing one-past-the-end.
fn byte_offset(text: &str, ch: usize) -> Option<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .nth(ch)
}

/// Group ascending indices into `(start, len)` runs of consecutive lines.
fn runs(indices: impl IntoIterator<Item = usize>) -> Vec<(usize, usize)> {
    let mut out: Vec<(usize, usize)> = Vec::new();
    for i in indices {
        match out.last_mut() {
            Some((start, len)) if *start + *len == i => *len += 1,
            _ => out.push((i, 1)),
        }
    }
    out
}
