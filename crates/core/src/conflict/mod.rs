//! Conflict-marker scanning and resolution.
//!
//! The conflict subsystem is responsible for:
//! 1. **Scanning** -- annotating marker lines and attaching one control per block.
//! 2. **Resolving** -- deleting markers and the unchosen side in one edit.
//! 3. **Enumerating** -- listing well-formed blocks for bulk operations.

pub mod blocks;
pub mod control;
pub mod resolver;
pub mod scanner;

pub use blocks::{find_blocks, ConflictBlock};
pub use control::{Branch, ControlChoice, ControlWidget, WidgetOptions};
pub use resolver::{BranchResolver, DeletionSet, Resolution};
pub use scanner::{MarkerScanner, ScanReport};
