//! Conflict-resolution session bound to one host editor.
//!
//! A [`ConflictSession`] owns the host editor handle and reacts to the
//! host's events one at a time:
//!
//! - [`EditorEvent::SwapDoc`] schedules a full re-scan for the next
//!   [`tick`](ConflictSession::tick), giving the host a turn to finish its
//!   own re-render first. Repeated swaps before the tick collapse into one
//!   scan.
//! - [`EditorEvent::Changes`] re-scans immediately when the first change is
//!   an undo that brings back an opening marker, then collapses the
//!   selection to a single cursor.
//! - [`EditorEvent::Activate`] looks up the control's line at activation
//!   time and resolves that block.
//!
//! Every handler runs to completion before the next event is processed.

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::conflict::{
    find_blocks, Branch, BranchResolver, ConflictBlock, MarkerScanner, Resolution, ScanReport,
};
use crate::editor::{
    Change, ChangeOrigin, ChangeSource, HostEditor, HostLineResolver, LineResolver, WidgetId,
};
use crate::errors::{ConfigError, CoreError, EditorError, ResolveError};

/// Events delivered by the host editor.
#[derive(Debug, Clone)]
pub enum EditorEvent {
    /// The buffer was replaced wholesale.
    SwapDoc,
    /// A batch of changes, in the order the host applied them.
    Changes(Vec<Change>),
    /// The user picked `branch` on the control `widget`.
    Activate { widget: WidgetId, branch: Branch },
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Nothing to do for this event.
    Ignored,
    /// A re-scan is queued for the next tick.
    ScanScheduled,
    /// A re-scan ran.
    Scanned(ScanReport),
    /// A block was resolved.
    Resolved(Resolution),
}

/// The engine wired to one host editor.
pub struct ConflictSession<E, R = HostLineResolver> {
    editor: E,
    line_resolver: R,
    scanner: MarkerScanner,
    resolver: BranchResolver,
    pending_scan: bool,
    scans_run: u64,
}

impl<E: HostEditor> ConflictSession<E, HostLineResolver> {
    /// Session that asks the host itself where controls live.
    pub fn new(editor: E, config: &EngineConfig) -> Result<Self, ConfigError> {
        Self::with_line_resolver(editor, HostLineResolver, config)
    }
}

impl<E: HostEditor, R: LineResolver<E>> ConflictSession<E, R> {
    pub fn with_line_resolver(
        editor: E,
        line_resolver: R,
        config: &EngineConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            editor,
            line_resolver,
            scanner: MarkerScanner::from_config(config)?,
            resolver: BranchResolver::from_config(config)?,
            pending_scan: false,
            scans_run: 0,
        })
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn scanner(&self) -> &MarkerScanner {
        &self.scanner
    }

    /// Number of full scans run so far.
    pub fn scans_run(&self) -> u64 {
        self.scans_run
    }

    pub fn has_pending_scan(&self) -> bool {
        self.pending_scan
    }

    /// Well-formed blocks currently in the buffer.
    pub fn blocks(&self) -> Vec<ConflictBlock> {
        find_blocks(
            &self.editor,
            self.scanner.patterns(),
            self.scanner.annotations(),
        )
    }

    /// Run a full scan right away.
    pub fn scan_now(&mut self) -> Result<ScanReport, EditorError> {
        self.scans_run += 1;
        self.scanner.scan(&mut self.editor)
    }

    /// Dispatch one host event.
    pub fn handle(&mut self, event: EditorEvent) -> Result<EventOutcome, CoreError> {
        match event {
            EditorEvent::SwapDoc => {
                if !self.pending_scan {
                    debug!("document swapped, re-scan deferred to next tick");
                }
                self.pending_scan = true;
                Ok(EventOutcome::ScanScheduled)
            }
            EditorEvent::Changes(changes) => self.on_changes(&changes),
            EditorEvent::Activate { widget, branch } => {
                Ok(EventOutcome::Resolved(self.accept(widget, branch)?))
            }
        }
    }

    /// Run the deferred scan, if one is queued.
    pub fn tick(&mut self) -> Result<Option<ScanReport>, CoreError> {
        if !std::mem::take(&mut self.pending_scan) {
            return Ok(None);
        }
        Ok(Some(self.scan_now()?))
    }

    /// Resolve the block owning `widget`, using its line as of now.
    pub fn accept(&mut self, widget: WidgetId, branch: Branch) -> Result<Resolution, ResolveError> {
        let line = self
            .line_resolver
            .line_of(&self.editor, widget)
            .ok_or(ResolveError::StaleControl(widget.0))?;
        info!(widget = %widget, line, %branch, "control activated");
        self.resolver.resolve(&mut self.editor, branch, line)
    }

    /// Resolve the block at `line` directly, without a control.
    pub fn resolve_at(&mut self, line: usize, branch: Branch) -> Result<Resolution, ResolveError> {
        self.resolver.resolve(&mut self.editor, branch, line)
    }

    fn on_changes(&mut self, changes: &[Change]) -> Result<EventOutcome, CoreError> {
        let Some(first) = changes.first() else {
            return Ok(EventOutcome::Ignored);
        };
        let restores_marker = first.origin == ChangeOrigin::Undo
            && first
                .text
                .first()
                .is_some_and(|text| self.scanner.patterns().is_incoming_start(text));
        if !restores_marker {
            return Ok(EventOutcome::Ignored);
        }

        debug!(line = first.from_line, "undo restored a conflict marker");
        let report = self.scan_now()?;
        // Undoing a multi-line delete restores one selection per line.
        let cursor = self.editor.cursor();
        self.editor.set_cursor(cursor)?;
        Ok(EventOutcome::Scanned(report))
    }
}

impl<E: HostEditor + ChangeSource, R: LineResolver<E>> ConflictSession<E, R> {
    /// Feed the host's queued change notifications back into the session.
    pub fn pump(&mut self) -> Result<EventOutcome, CoreError> {
        let changes = self.editor.take_changes();
        if changes.is_empty() {
            return Ok(EventOutcome::Ignored);
        }
        self.handle(EditorEvent::Changes(changes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::MemoryEditor;

    const DOC: &str = "<<<<<<< A\nin\n=======\ncur\n>>>>>>> B\n";

    fn session(text: &str) -> ConflictSession<MemoryEditor> {
        ConflictSession::new(MemoryEditor::from_text(text), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_swap_doc_defers_and_coalesces_scan() {
        let mut s = session("");
        s.editor_mut().swap_doc(DOC);
        assert_eq!(s.handle(EditorEvent::SwapDoc).unwrap(), EventOutcome::ScanScheduled);
        s.handle(EditorEvent::SwapDoc).unwrap();
        assert!(s.has_pending_scan());
        assert!(s.editor().widget_ids().is_empty());

        let report = s.tick().unwrap().unwrap();
        assert!(!s.has_pending_scan());
        assert_eq!(report.controls_attached.len(), 1);
        assert_eq!(s.scans_run(), 1);
        assert_eq!(s.tick().unwrap(), None);
    }

    #[test]
    fn test_activate_resolves_widget_block() {
        let mut s = session(DOC);
        let report = s.scan_now().unwrap();
        let widget = report.controls_attached[0];
        let outcome = s
            .handle(EditorEvent::Activate {
                widget,
                branch: Branch::Theirs,
            })
            .unwrap();
        assert!(matches!(outcome, EventOutcome::Resolved(_)));
        assert_eq!(s.editor().lines(), vec!["in"]);
    }

    #[test]
    fn test_stale_widget_is_reported() {
        let mut s = session(DOC);
        let widget = s.scan_now().unwrap().controls_attached[0];
        s.accept(widget, Branch::Ours).unwrap();
        let err = s.accept(widget, Branch::Ours).unwrap_err();
        assert_eq!(err, ResolveError::StaleControl(widget.0));
    }

    #[test]
    fn test_non_undo_changes_are_ignored() {
        let mut s = session(DOC);
        s.scan_now().unwrap();
        // The annotation writes are queued as input changes.
        assert_eq!(s.pump().unwrap(), EventOutcome::Ignored);
        assert_eq!(s.pump().unwrap(), EventOutcome::Ignored);
        assert_eq!(s.scans_run(), 1);
    }

    #[test]
    fn test_undo_of_resolution_rescans_once() {
        let mut s = session(DOC);
        let widget = s.scan_now().unwrap().controls_attached[0];
        s.accept(widget, Branch::Both).unwrap();
        s.pump().unwrap();

        assert!(s.editor_mut().undo());
        assert_eq!(s.editor().selections().len(), 3);
        let outcome = s.pump().unwrap();
        let EventOutcome::Scanned(report) = outcome else {
            panic!("expected a re-scan, got {outcome:?}");
        };
        assert_eq!(report.controls_attached.len(), 1);
        assert!(report.annotated_lines.is_empty());
        assert_eq!(s.scans_run(), 2);
        assert_eq!(s.editor().selections().len(), 1);
        assert_eq!(s.editor().widget_ids().len(), 1);
    }

    #[test]
    fn test_redo_does_not_rescan() {
        let mut s = session(DOC);
        let widget = s.scan_now().unwrap().controls_attached[0];
        s.accept(widget, Branch::Ours).unwrap();
        s.editor_mut().undo();
        s.pump().unwrap();
        s.editor_mut().redo();
        assert_eq!(s.pump().unwrap(), EventOutcome::Ignored);
        assert_eq!(s.editor().lines(), vec!["cur"]);
    }
}
