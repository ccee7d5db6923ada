//! TOML-based configuration for the conflict-resolution engine.
//!
//! Every section is optional; a missing file section falls back to the
//! built-in defaults, so an empty file is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conflict::control::Branch;
use crate::errors::ConfigError;
use crate::markers::{self, Annotations, MarkerPatterns};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level engine configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Annotation text and styling class for marker lines.
    #[serde(default)]
    pub annotations: AnnotationConfig,

    /// The three marker patterns.
    #[serde(default)]
    pub markers: MarkerConfig,

    /// Labels for the interactive control.
    #[serde(default)]
    pub controls: ControlConfig,

    /// Resolver behaviour.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Terminal host settings.
    #[serde(default)]
    pub cli: CliConfig,
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// Text appended to boundary lines, and the class added to opening lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnotationConfig {
    #[serde(default = "default_incoming_annotation")]
    pub incoming: String,

    #[serde(default = "default_current_annotation")]
    pub current: String,

    /// Styling class added to every `<<<<<<<` line.
    #[serde(default = "default_marker_class")]
    pub marker_class: String,
}

fn default_incoming_annotation() -> String {
    markers::INCOMING_ANNOTATION.into()
}
fn default_current_annotation() -> String {
    markers::CURRENT_ANNOTATION.into()
}
fn default_marker_class() -> String {
    "resolve-conflicts".into()
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            incoming: default_incoming_annotation(),
            current: default_current_annotation(),
            marker_class: default_marker_class(),
        }
    }
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// Regular expressions recognising the three marker lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkerConfig {
    #[serde(default = "default_incoming_start")]
    pub incoming_start: String,

    #[serde(default = "default_divider")]
    pub divider: String,

    #[serde(default = "default_current_end")]
    pub current_end: String,
}

fn default_incoming_start() -> String {
    markers::INCOMING_START_PATTERN.into()
}
fn default_divider() -> String {
    markers::DIVIDER_PATTERN.into()
}
fn default_current_end() -> String {
    markers::CURRENT_END_PATTERN.into()
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            incoming_start: default_incoming_start(),
            divider: default_divider(),
            current_end: default_current_end(),
        }
    }
}

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// Labels shown on the three-choice control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlConfig {
    #[serde(default = "default_ours_label")]
    pub ours_label: String,

    #[serde(default = "default_theirs_label")]
    pub theirs_label: String,

    #[serde(default = "default_both_label")]
    pub both_label: String,

    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_ours_label() -> String {
    "Accept Current Change".into()
}
fn default_theirs_label() -> String {
    "Accept Incoming Change".into()
}
fn default_both_label() -> String {
    "Accept Both Changes".into()
}
fn default_separator() -> String {
    " | ".into()
}

impl ControlConfig {
    pub fn label_for(&self, branch: Branch) -> &str {
        match branch {
            Branch::Ours => &self.ours_label,
            Branch::Theirs => &self.theirs_label,
            Branch::Both => &self.both_label,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            ours_label: default_ours_label(),
            theirs_label: default_theirs_label(),
            both_label: default_both_label(),
            separator: default_separator(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// What the resolver does with a block it cannot parse.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Refuse to edit and report `MalformedConflictBlock`.
    #[default]
    Reject,
    /// Keep scanning to the end of the buffer, deleting whatever the last
    /// seen section state says.
    Degrade,
}

/// Resolver settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolverConfig {
    #[serde(default)]
    pub malformed: MalformedPolicy,
}

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Terminal host settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Remove annotation suffixes from marker lines before writing a file.
    #[serde(default = "default_true")]
    pub strip_annotations: bool,
}

fn default_log_level() -> String {
    "warn".into()
}
fn default_true() -> bool {
    true
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            strip_annotations: default_true(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl EngineConfig {
    /// Load an [`EngineConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Like [`load_from_file`](Self::load_from_file) but a missing file
    /// yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load_from_file(&path) {
            Err(ConfigError::FileNotFound(p)) => {
                debug!(path = %p, "no configuration file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Validate that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.patterns()?;

        let texts = [
            ("annotations.incoming", &self.annotations.incoming),
            ("annotations.current", &self.annotations.current),
            ("annotations.marker_class", &self.annotations.marker_class),
            ("controls.ours_label", &self.controls.ours_label),
            ("controls.theirs_label", &self.controls.theirs_label),
            ("controls.both_label", &self.controls.both_label),
        ];
        for (field, value) in texts {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "must not be empty".into(),
                });
            }
            if value.contains('\n') {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "must be a single line".into(),
                });
            }
        }

        if self.annotations.incoming == self.annotations.current {
            return Err(ConfigError::InvalidValue {
                field: "annotations.current".into(),
                detail: "must differ from annotations.incoming".into(),
            });
        }

        if self.cli.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "cli.log_level".into(),
                detail: format!("unknown level '{}'", self.cli.log_level),
            });
        }

        Ok(())
    }

    /// Compile the configured marker patterns.
    pub fn patterns(&self) -> Result<MarkerPatterns, ConfigError> {
        MarkerPatterns::new(
            &self.markers.incoming_start,
            &self.markers.divider,
            &self.markers.current_end,
        )
    }

    pub fn annotations(&self) -> Annotations {
        Annotations {
            incoming: self.annotations.incoming.clone(),
            current: self.annotations.current.clone(),
        }
    }

    /// Render this configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[annotations]
incoming = " (theirs)"
current = " (ours)"
marker_class = "conflict-head"

[markers]
incoming_start = "^<<<<<<<"
divider = "^=======$"
current_end = "^>>>>>>>"

[controls]
ours_label = "Keep mine"
theirs_label = "Keep theirs"
both_label = "Keep both"
separator = " / "

[resolver]
malformed = "degrade"

[cli]
log_level = "debug"
strip_annotations = false
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: EngineConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.annotations.incoming, " (theirs)");
        assert_eq!(config.controls.label_for(Branch::Ours), "Keep mine");
        assert_eq!(config.resolver.malformed, MalformedPolicy::Degrade);
        assert!(!config.cli.strip_annotations);
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.annotations.incoming, " -- Incoming Change");
        assert_eq!(config.annotations.current, " -- Current Change");
        assert_eq!(config.resolver.malformed, MalformedPolicy::Reject);
        assert_eq!(config.cli.log_level, "warn");
        assert!(config.cli.strip_annotations);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = EngineConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.cli.log_level, "debug");
    }

    #[test]
    fn test_file_not_found() {
        let result = EngineConfig::load_from_file("/nonexistent/mergemarks.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = EngineConfig::load_or_default("/nonexistent/mergemarks.toml").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[resolver]\nmalformed = \"explode\"\n").unwrap();
        let result = EngineConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let mut config = EngineConfig::default();
        config.markers.current_end = "[".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "markers.current_end"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_label() {
        let mut config = EngineConfig::default();
        config.controls.both_label = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "controls.both_label"
        ));
    }

    #[test]
    fn test_validate_rejects_identical_annotations() {
        let mut config = EngineConfig::default();
        config.annotations.current = config.annotations.incoming.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let mut config = EngineConfig::default();
        config.cli.log_level = "loud".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "cli.log_level"
        ));
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let rendered = EngineConfig::default().to_toml_string().unwrap();
        let parsed: EngineConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, EngineConfig::default());
    }
}
