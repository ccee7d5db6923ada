//! Error types for the mergemarks core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Host editor errors
// ---------------------------------------------------------------------------

/// Errors raised by a host editor while executing an edit primitive.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditorError {
    /// A line index outside the current buffer was addressed.
    #[error("line {line} is out of range (buffer has {len} lines)")]
    LineOutOfRange { line: usize, len: usize },

    /// A column past the end of the addressed line was requested.
    #[error("column {ch} is out of range for line {line}")]
    ColumnOutOfRange { line: usize, ch: usize },

    /// The host refused the edit for its own reasons.
    #[error("host editor rejected the edit: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Resolution errors
// ---------------------------------------------------------------------------

/// Why a conflict block was judged malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// No closing `>>>>>>>` marker before the end of the buffer.
    Unterminated,
    /// A second `<<<<<<<` marker appeared before the block closed.
    Nested,
    /// The block closed without a `=======` divider.
    MissingDivider,
    /// The block contains more than one `=======` divider.
    DuplicateDivider,
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unterminated => write!(f, "no closing marker before end of buffer"),
            Self::Nested => write!(f, "nested opening marker"),
            Self::MissingDivider => write!(f, "missing divider"),
            Self::DuplicateDivider => write!(f, "more than one divider"),
        }
    }
}

/// Errors from the branch resolver.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The starting line does not exist.
    #[error("start line {line} is out of range (buffer has {len} lines)")]
    LineOutOfRange { line: usize, len: usize },

    /// The starting line is not inside any conflict block.
    #[error("line {0} is not inside a conflict block")]
    NotInConflictBlock(usize),

    /// The block starting at `start_line` is not well formed.
    #[error("malformed conflict block at line {start_line}: {reason}")]
    MalformedConflictBlock {
        start_line: usize,
        reason: MalformedReason,
    },

    /// A control was activated but its owning line could not be found.
    #[error("control {0} no longer belongs to a line")]
    StaleControl(u64),

    /// The host failed while applying the deletion.
    #[error("resolution edit failed: {0}")]
    Editor(#[from] EditorError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading or writing the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_includes_line() {
        let err = ResolveError::MalformedConflictBlock {
            start_line: 7,
            reason: MalformedReason::MissingDivider,
        };
        let msg = err.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("missing divider"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let editor_err = EditorError::LineOutOfRange { line: 3, len: 2 };
        let core_err: CoreError = editor_err.clone().into();
        assert!(matches!(core_err, CoreError::Editor(_)));

        let resolve_err: ResolveError = editor_err.into();
        assert!(matches!(resolve_err, ResolveError::Editor(_)));
        let core_err: CoreError = resolve_err.into();
        assert!(matches!(core_err, CoreError::Resolve(_)));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "markers.divider".into(),
            detail: "bad regex".into(),
        };
        assert!(err.to_string().contains("markers.divider"));
    }
}
