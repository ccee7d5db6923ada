//! mergemarks core library.
//!
//! This crate provides the conflict-marker resolution engine: marker
//! classification, the host editor capability traits and an in-memory host,
//! the marker scanner, the branch resolver, and the session that wires them
//! to a host's events.

pub mod config;
pub mod conflict;
pub mod editor;
pub mod errors;
pub mod markers;
pub mod session;

// Re-exports for convenience.
pub use config::EngineConfig;
pub use conflict::{Branch, BranchResolver, MarkerScanner};
pub use editor::{HostEditor, MemoryEditor};
pub use session::{ConflictSession, EditorEvent, EventOutcome};
