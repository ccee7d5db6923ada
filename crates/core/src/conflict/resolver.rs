//! Branch resolver.
//!
//! Given a branch and a line in a conflict block, computes the set of lines
//! to delete with one forward scan and removes them in a single host edit.
//!
//! The scan keeps one flag, "in a deletable section", which only changes
//! when a marker is crossed:
//!
//! | Line | Flag becomes |
//! |------|--------------|
//! | `<<<<<<<` | `branch == Ours` |
//! | `=======` | `branch == Theirs` |
//! | anything else | unchanged |
//!
//! A line is deleted when the flag is set or the line is a marker. The scan
//! stops after the block's `>>>>>>>` line.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, MalformedPolicy};
use crate::conflict::control::Branch;
use crate::editor::{HostEditor, Position, Selection};
use crate::errors::{ConfigError, MalformedReason, ResolveError};
use crate::markers::{MarkerKind, MarkerPatterns};

/// Ordered line indices to remove for one resolution. Consumed once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionSet {
    lines: Vec<usize>,
}

impl DeletionSet {
    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    pub fn first(&self) -> Option<usize> {
        self.lines.first().copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// One collapsed selection per line, ready for a "delete lines" command.
    pub fn into_selections(self) -> Vec<Selection> {
        self.lines.into_iter().map(Selection::collapsed).collect()
    }
}

/// The outcome of resolving one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub branch: Branch,
    /// Indices removed, as they were before the deletion.
    pub deleted: Vec<usize>,
    /// Where the cursor was placed, if anything was deleted.
    pub cursor_line: Option<usize>,
}

/// Applies a branch choice to a conflict block.
#[derive(Debug, Clone, Default)]
pub struct BranchResolver {
    patterns: MarkerPatterns,
    policy: MalformedPolicy,
}

impl BranchResolver {
    pub fn new(patterns: MarkerPatterns, policy: MalformedPolicy) -> Self {
        Self { patterns, policy }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.patterns()?, config.resolver.malformed))
    }

    pub fn policy(&self) -> MalformedPolicy {
        self.policy
    }

    /// Compute the lines to delete without touching the buffer.
    pub fn plan<E: HostEditor + ?Sized>(
        &self,
        editor: &E,
        branch: Branch,
        start: usize,
    ) -> Result<DeletionSet, ResolveError> {
        match self.policy {
            MalformedPolicy::Reject => self.plan_checked(editor, branch, start),
            MalformedPolicy::Degrade => Ok(self.plan_unchecked(editor, branch, start)),
        }
    }

    /// Resolve the block at `start` in favour of `branch`.
    pub fn resolve<E: HostEditor + ?Sized>(
        &self,
        editor: &mut E,
        branch: Branch,
        start: usize,
    ) -> Result<Resolution, ResolveError> {
        let set = self.plan(editor, branch, start)?;
        let Some(first) = set.first() else {
            debug!(start, %branch, "nothing to delete");
            return Ok(Resolution {
                branch,
                deleted: Vec::new(),
                cursor_line: None,
            });
        };

        let deleted = set.lines().to_vec();
        editor.set_selections(set.into_selections())?;
        editor.delete_selected_lines()?;
        editor.set_cursor(Position::line_start(first))?;

        info!(start, %branch, deleted = deleted.len(), "conflict block resolved");
        Ok(Resolution {
            branch,
            deleted,
            cursor_line: Some(first),
        })
    }

    /// The scan as originally designed: no validation, runs to the end of the
    /// buffer if the block never closes.
    fn plan_unchecked<E: HostEditor + ?Sized>(
        &self,
        editor: &E,
        branch: Branch,
        start: usize,
    ) -> DeletionSet {
        let mut deletable = false;
        let mut lines = Vec::new();

        for index in start..editor.line_count() {
            let Some(text) = editor.line_text(index) else {
                break;
            };
            let kind = self.patterns.classify(text);
            match kind {
                Some(MarkerKind::IncomingStart) => deletable = branch == Branch::Ours,
                Some(MarkerKind::Divider) => deletable = branch == Branch::Theirs,
                Some(MarkerKind::CurrentEnd) | None => {}
            }
            if deletable || kind.is_some() {
                lines.push(index);
            }
            if kind == Some(MarkerKind::CurrentEnd) {
                return DeletionSet { lines };
            }
        }

        warn!(start, "conflict block never closed; scanned to end of buffer");
        DeletionSet { lines }
    }

    fn plan_checked<E: HostEditor + ?Sized>(
        &self,
        editor: &E,
        branch: Branch,
        start: usize,
    ) -> Result<DeletionSet, ResolveError> {
        let len = editor.line_count();
        if start >= len {
            return Err(ResolveError::LineOutOfRange { line: start, len });
        }
        let head = self.block_head(editor, start)?;
        let malformed = |reason| ResolveError::MalformedConflictBlock {
            start_line: head,
            reason,
        };

        let mut deletable = false;
        let mut divider_seen = false;
        let mut lines = Vec::new();

        for index in head..len {
            let Some(text) = editor.line_text(index) else {
                break;
            };
            let kind = self.patterns.classify(text);
            match kind {
                Some(MarkerKind::IncomingStart) if index != head => {
                    return Err(malformed(MalformedReason::Nested));
                }
                Some(MarkerKind::IncomingStart) => deletable = branch == Branch::Ours,
                Some(MarkerKind::Divider) => {
                    if divider_seen {
                        return Err(malformed(MalformedReason::DuplicateDivider));
                    }
                    divider_seen = true;
                    deletable = branch == Branch::Theirs;
                }
                Some(MarkerKind::CurrentEnd) if !divider_seen => {
                    return Err(malformed(MalformedReason::MissingDivider));
                }
                Some(MarkerKind::CurrentEnd) | None => {}
            }
            if deletable || kind.is_some() {
                lines.push(index);
            }
            if kind == Some(MarkerKind::CurrentEnd) {
                return Ok(DeletionSet { lines });
            }
        }

        Err(malformed(MalformedReason::Unterminated))
    }

    /// Walk back from `start` to the `<<<<<<<` line of the enclosing block.
    fn block_head<E: HostEditor + ?Sized>(
        &self,
        editor: &E,
        start: usize,
    ) -> Result<usize, ResolveError> {
        for index in (0..=start).rev() {
            let kind = editor.line_text(index).and_then(|t| self.patterns.classify(t));
            match kind {
                Some(MarkerKind::IncomingStart) => {
                    if index != start {
                        debug!(start, head = index, "start line normalized to block head");
                    }
                    return Ok(index);
                }
                // A close marker above the start means we are between blocks.
                Some(MarkerKind::CurrentEnd) if index != start => break,
                _ => {}
            }
        }
        Err(ResolveError::NotInConflictBlock(start))
    }
}
