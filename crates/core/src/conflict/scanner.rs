//! Marker scanner.
//!
//! Walks the whole buffer once, in order, and makes sure every conflict
//! block carries its annotations and exactly one control. Lines that already
//! carry a widget are skipped, so re-running the scan is harmless.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{AnnotationConfig, EngineConfig};
use crate::conflict::control::{ControlWidget, WidgetOptions};
use crate::editor::{Column, HostEditor, WidgetId};
use crate::errors::{ConfigError, EditorError};
use crate::markers::{Annotations, MarkerKind, MarkerPatterns};

/// What a single scan changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Lines that received annotation text during this scan.
    pub annotated_lines: Vec<usize>,
    /// Controls attached during this scan, in buffer order.
    pub controls_attached: Vec<WidgetId>,
    /// Lines skipped because they already carried a widget.
    pub skipped_lines: usize,
}

impl ScanReport {
    /// `true` if the scan left the buffer and its widgets untouched.
    pub fn is_noop(&self) -> bool {
        self.annotated_lines.is_empty() && self.controls_attached.is_empty()
    }
}

/// Stateless scanner; holds only its configuration.
#[derive(Debug, Clone)]
pub struct MarkerScanner {
    patterns: MarkerPatterns,
    annotations: Annotations,
    marker_class: String,
    control: ControlWidget,
}

impl MarkerScanner {
    pub fn new(
        patterns: MarkerPatterns,
        annotations: Annotations,
        marker_class: impl Into<String>,
        control: ControlWidget,
    ) -> Self {
        Self {
            patterns,
            annotations,
            marker_class: marker_class.into(),
            control,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.patterns()?,
            config.annotations(),
            config.annotations.marker_class.clone(),
            ControlWidget::from_config(&config.controls),
        ))
    }

    pub fn patterns(&self) -> &MarkerPatterns {
        &self.patterns
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Annotate markers and attach controls across the whole buffer.
    pub fn scan<E: HostEditor + ?Sized>(&self, editor: &mut E) -> Result<ScanReport, EditorError> {
        let mut report = ScanReport::default();

        for line in 0..editor.line_count() {
            if editor.line_has_widgets(line) {
                report.skipped_lines += 1;
                continue;
            }
            let Some(text) = editor.line_text(line) else {
                break;
            };

            match self.patterns.classify(text) {
                Some(MarkerKind::IncomingStart) => {
                    if self.annotate(editor, line, &self.annotations.incoming)? {
                        report.annotated_lines.push(line);
                    }
                    editor.add_line_class(line, &self.marker_class)?;
                    let id = editor.add_line_widget(
                        line,
                        self.control.clone(),
                        WidgetOptions::anchored_above(),
                    )?;
                    debug!(line, widget = %id, "control attached");
                    report.controls_attached.push(id);
                }
                Some(MarkerKind::CurrentEnd) => {
                    if self.annotate(editor, line, &self.annotations.current)? {
                        report.annotated_lines.push(line);
                    }
                }
                Some(MarkerKind::Divider) | None => {}
            }
        }

        info!(
            controls = report.controls_attached.len(),
            annotated = report.annotated_lines.len(),
            skipped = report.skipped_lines,
            "marker scan complete"
        );
        Ok(report)
    }

    /// Append `annotation` unless the line already contains it. The write is
    /// bookkeeping, so the local history is cleared right after.
    fn annotate<E: HostEditor + ?Sized>(
        &self,
        editor: &mut E,
        line: usize,
        annotation: &str,
    ) -> Result<bool, EditorError> {
        if editor
            .line_text(line)
            .is_some_and(|text| text.contains(annotation))
        {
            return Ok(false);
        }
        editor.replace_range(annotation, line, Column::End)?;
        editor.clear_history();
        Ok(true)
    }
}

impl Default for MarkerScanner {
    fn default() -> Self {
        Self::new(
            MarkerPatterns::default(),
            Annotations::default(),
            AnnotationConfig::default().marker_class,
            ControlWidget::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::MemoryEditor;

    fn conflicted() -> MemoryEditor {
        MemoryEditor::from_lines([
            "fn main() {",
            "<<<<<<< HEAD",
            "    println!(\"theirs\");",
            "=======",
            "    println!(\"ours\");",
            ">>>>>>> feature",
            "}",
        ])
    }

    #[test]
    fn test_scan_annotates_and_attaches_control() {
        let mut editor = conflicted();
        let report = MarkerScanner::default().scan(&mut editor).unwrap();

        assert_eq!(report.annotated_lines, vec![1, 5]);
        assert_eq!(report.controls_attached.len(), 1);
        assert_eq!(editor.line_text(1), Some("<<<<<<< HEAD -- Incoming Change"));
        assert_eq!(editor.line_text(3), Some("======="));
        assert_eq!(editor.line_text(5), Some(">>>>>>> feature -- Current Change"));
        assert_eq!(editor.line_classes(1), ["resolve-conflicts".to_string()]);
        assert_eq!(editor.widgets_on(1), report.controls_attached);
        assert!(editor.widgets_on(5).is_empty());

        let (widget, options) = editor.widget(report.controls_attached[0]).unwrap();
        assert_eq!(widget.choices.len(), 3);
        assert!(options.above);
        assert!(options.no_h_scroll);
    }

    #[test]
    fn test_scan_twice_is_idempotent() {
        let mut editor = conflicted();
        let scanner = MarkerScanner::default();
        scanner.scan(&mut editor).unwrap();
        let before = editor.lines().join("\n");

        let report = scanner.scan(&mut editor).unwrap();
        assert!(report.is_noop());
        assert_eq!(report.skipped_lines, 1);
        assert_eq!(editor.lines().join("\n"), before);
        assert_eq!(editor.widget_ids().len(), 1);
        assert_eq!(editor.line_classes(1).len(), 1);
    }

    #[test]
    fn test_annotation_edits_are_not_undoable() {
        let mut editor = conflicted();
        MarkerScanner::default().scan(&mut editor).unwrap();
        assert!(!editor.can_undo());
        assert!(!editor.undo());
        assert!(editor.line_text(1).unwrap().ends_with(" -- Incoming Change"));
    }

    #[test]
    fn test_preannotated_line_gets_control_without_duplicate_text() {
        let mut editor = MemoryEditor::from_lines([
            "<<<<<<< HEAD -- Incoming Change",
            "a",
            "=======",
            "b",
            ">>>>>>> x -- Current Change",
        ]);
        let report = MarkerScanner::default().scan(&mut editor).unwrap();
        assert!(report.annotated_lines.is_empty());
        assert_eq!(report.controls_attached.len(), 1);
        assert_eq!(editor.line_text(0), Some("<<<<<<< HEAD -- Incoming Change"));
    }

    #[test]
    fn test_every_block_gets_one_control() {
        let mut editor = MemoryEditor::from_lines([
            "<<<<<<< a", "1", "=======", "2", ">>>>>>> b", "mid", "<<<<<<< c", "3", "=======",
            "4", ">>>>>>> d",
        ]);
        let report = MarkerScanner::default().scan(&mut editor).unwrap();
        assert_eq!(report.controls_attached.len(), 2);
        assert_eq!(editor.widget_line(report.controls_attached[1]), Some(6));
    }

    #[test]
    fn test_buffer_without_markers_is_untouched() {
        let mut editor = MemoryEditor::from_lines(["a", "b"]);
        let rev = editor.revision();
        let report = MarkerScanner::default().scan(&mut editor).unwrap();
        assert!(report.is_noop());
        assert_eq!(editor.revision(), rev);
    }
}
