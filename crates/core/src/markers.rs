//! Conflict marker classification.
//!
//! The three delimiter patterns are held as data in [`MarkerPatterns`] so a
//! change to the marker format is a one-place edit. [`Annotations`] holds the
//! suffixes the scanner appends to the opening and closing markers.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default pattern for the line opening a conflict block.
pub const INCOMING_START_PATTERN: &str = "^<<<<<<<";
/// Default pattern for the divider between the two sides.
pub const DIVIDER_PATTERN: &str = "^=======$";
/// Default pattern for the line closing a conflict block.
pub const CURRENT_END_PATTERN: &str = "^>>>>>>>";

/// Default annotation appended to the opening marker.
pub const INCOMING_ANNOTATION: &str = " -- Incoming Change";
/// Default annotation appended to the closing marker.
pub const CURRENT_ANNOTATION: &str = " -- Current Change";

/// The kind of a marker line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// `<<<<<<<`: opens a block; the incoming side follows.
    IncomingStart,
    /// `=======`: separates incoming from current.
    Divider,
    /// `>>>>>>>`: closes the block.
    CurrentEnd,
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncomingStart => write!(f, "incoming_start"),
            Self::Divider => write!(f, "divider"),
            Self::CurrentEnd => write!(f, "current_end"),
        }
    }
}

/// Compiled marker patterns.
#[derive(Debug, Clone)]
pub struct MarkerPatterns {
    incoming_start: Regex,
    divider: Regex,
    current_end: Regex,
}

impl MarkerPatterns {
    /// Compile a pattern set. Errors name the offending `markers.*` field.
    pub fn new(
        incoming_start: &str,
        divider: &str,
        current_end: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            incoming_start: compile("markers.incoming_start", incoming_start)?,
            divider: compile("markers.divider", divider)?,
            current_end: compile("markers.current_end", current_end)?,
        })
    }

    /// Classify one line of text.
    pub fn classify(&self, text: &str) -> Option<MarkerKind> {
        if self.incoming_start.is_match(text) {
            Some(MarkerKind::IncomingStart)
        } else if self.divider.is_match(text) {
            Some(MarkerKind::Divider)
        } else if self.current_end.is_match(text) {
            Some(MarkerKind::CurrentEnd)
        } else {
            None
        }
    }

    pub fn is_incoming_start(&self, text: &str) -> bool {
        self.incoming_start.is_match(text)
    }

    pub fn is_divider(&self, text: &str) -> bool {
        self.divider.is_match(text)
    }

    pub fn is_current_end(&self, text: &str) -> bool {
        self.current_end.is_match(text)
    }

    /// `true` for any of the three marker kinds.
    pub fn is_marker(&self, text: &str) -> bool {
        self.classify(text).is_some()
    }

    /// Text following the marker itself, e.g. the branch name after
    /// `<<<<<<<`. Empty when the line does not match `kind`.
    pub fn label<'a>(&self, kind: MarkerKind, text: &'a str) -> &'a str {
        let re = match kind {
            MarkerKind::IncomingStart => &self.incoming_start,
            MarkerKind::Divider => &self.divider,
            MarkerKind::CurrentEnd => &self.current_end,
        };
        re.find(text).map_or("", |m| text[m.end()..].trim())
    }
}

impl Default for MarkerPatterns {
    fn default() -> Self {
        Self::new(INCOMING_START_PATTERN, DIVIDER_PATTERN, CURRENT_END_PATTERN)
            .unwrap_or_else(|e| unreachable!("built-in marker pattern rejected: {e}"))
    }
}

fn compile(field: &str, pattern: &str) -> Result<Regex, ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: "pattern must not be empty".into(),
        });
    }
    Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
        field: field.into(),
        detail: e.to_string(),
    })
}

/// Annotation suffixes appended to the block's boundary lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotations {
    pub incoming: String,
    pub current: String,
}

impl Annotations {
    /// The annotation that belongs on a marker of `kind`, if any.
    pub fn for_kind(&self, kind: MarkerKind) -> Option<&str> {
        match kind {
            MarkerKind::IncomingStart => Some(&self.incoming),
            MarkerKind::CurrentEnd => Some(&self.current),
            MarkerKind::Divider => None,
        }
    }

    /// Remove a trailing annotation from `line`, leaving other text alone.
    pub fn strip<'a>(&self, line: &'a str) -> &'a str {
        line.strip_suffix(self.incoming.as_str())
            .or_else(|| line.strip_suffix(self.current.as_str()))
            .unwrap_or(line)
    }
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            incoming: INCOMING_ANNOTATION.into(),
            current: CURRENT_ANNOTATION.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_default_markers() {
        let p = MarkerPatterns::default();
        assert_eq!(p.classify("<<<<<<< HEAD"), Some(MarkerKind::IncomingStart));
        assert_eq!(p.classify("======="), Some(MarkerKind::Divider));
        assert_eq!(p.classify(">>>>>>> feature"), Some(MarkerKind::CurrentEnd));
        assert_eq!(p.classify("let x = 1;"), None);
    }

    #[test]
    fn test_divider_must_be_exact() {
        let p = MarkerPatterns::default();
        assert!(!p.is_divider("======= "));
        assert!(!p.is_divider(" ======="));
        assert!(!p.is_divider("========"));
    }

    #[test]
    fn test_markers_only_match_at_line_start() {
        let p = MarkerPatterns::default();
        assert!(!p.is_marker("  <<<<<<< HEAD"));
        assert!(!p.is_marker("x >>>>>>> branch"));
    }

    #[test]
    fn test_annotated_markers_still_classify() {
        let p = MarkerPatterns::default();
        let line = format!("<<<<<<< HEAD{INCOMING_ANNOTATION}");
        assert!(p.is_incoming_start(&line));
        let line = format!(">>>>>>> topic{CURRENT_ANNOTATION}");
        assert!(p.is_current_end(&line));
    }

    #[test]
    fn test_custom_patterns() {
        let p = MarkerPatterns::new("^<<<<", "^====$", "^>>>>").unwrap();
        assert_eq!(p.classify("<<<< a"), Some(MarkerKind::IncomingStart));
        assert_eq!(p.classify("===="), Some(MarkerKind::Divider));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = MarkerPatterns::new("^<<<<<<<", "(", "^>>>>>>>");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "markers.divider"
        ));
    }

    #[test]
    fn test_label_follows_marker() {
        let p = MarkerPatterns::default();
        assert_eq!(p.label(MarkerKind::IncomingStart, "<<<<<<< HEAD"), "HEAD");
        assert_eq!(p.label(MarkerKind::CurrentEnd, ">>>>>>> topic/x "), "topic/x");
        assert_eq!(p.label(MarkerKind::CurrentEnd, "<<<<<<< HEAD"), "");
    }

    #[test]
    fn test_strip_annotation() {
        let a = Annotations::default();
        assert_eq!(a.strip("<<<<<<< HEAD -- Incoming Change"), "<<<<<<< HEAD");
        assert_eq!(a.strip(">>>>>>> topic -- Current Change"), ">>>>>>> topic");
        assert_eq!(a.strip("plain"), "plain");
    }
}
