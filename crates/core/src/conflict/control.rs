//! The interactive control anchored above each conflict block.
//!
//! A [`ControlWidget`] is the host-independent description of the three
//! "Accept ..." choices. The host renders it however it likes; activating a
//! choice feeds an [`EditorEvent::Activate`](crate::session::EditorEvent)
//! back into the session.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ControlConfig;

/// Which side of a conflict the user keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    /// Keep the current side (below the divider).
    Ours,
    /// Keep the incoming side (above the divider).
    Theirs,
    /// Keep both sides, incoming first.
    Both,
}

impl Branch {
    pub const ALL: [Branch; 3] = [Branch::Ours, Branch::Theirs, Branch::Both];
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ours => write!(f, "ours"),
            Self::Theirs => write!(f, "theirs"),
            Self::Both => write!(f, "both"),
        }
    }
}

impl FromStr for Branch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ours" | "current" => Ok(Self::Ours),
            "theirs" | "incoming" => Ok(Self::Theirs),
            "both" => Ok(Self::Both),
            other => Err(format!(
                "invalid branch '{other}': use 'ours', 'theirs' or 'both'"
            )),
        }
    }
}

/// One selectable choice on a control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlChoice {
    pub branch: Branch,
    pub label: String,
}

/// Placement flags passed to the host when attaching a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WidgetOptions {
    /// Render above the owning line rather than below it.
    pub above: bool,
    /// Do not scroll horizontally with the line content.
    pub no_h_scroll: bool,
}

impl WidgetOptions {
    /// Block widget anchored above its line, pinned horizontally.
    pub fn anchored_above() -> Self {
        Self {
            above: true,
            no_h_scroll: true,
        }
    }
}

/// Host-independent description of a conflict control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlWidget {
    pub choices: Vec<ControlChoice>,
    pub separator: String,
    pub bold: bool,
}

impl ControlWidget {
    /// Build the standard three-choice control from config labels.
    pub fn from_config(config: &ControlConfig) -> Self {
        let choices = Branch::ALL
            .iter()
            .map(|&branch| ControlChoice {
                branch,
                label: config.label_for(branch).to_string(),
            })
            .collect();
        Self {
            choices,
            separator: config.separator.clone(),
            bold: true,
        }
    }

    /// The choice bound to `branch`, if the control offers it.
    pub fn choice(&self, branch: Branch) -> Option<&ControlChoice> {
        self.choices.iter().find(|c| c.branch == branch)
    }

    /// Plain-text rendering, e.g. for terminal hosts.
    pub fn render_text(&self) -> String {
        self.choices
            .iter()
            .map(|c| c.label.as_str())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

impl Default for ControlWidget {
    fn default() -> Self {
        Self::from_config(&ControlConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_from_str_aliases() {
        assert_eq!("ours".parse::<Branch>().unwrap(), Branch::Ours);
        assert_eq!("Current".parse::<Branch>().unwrap(), Branch::Ours);
        assert_eq!("incoming".parse::<Branch>().unwrap(), Branch::Theirs);
        assert_eq!("BOTH".parse::<Branch>().unwrap(), Branch::Both);
        assert!("mine".parse::<Branch>().is_err());
    }

    #[test]
    fn test_default_control_renders_three_choices() {
        let widget = ControlWidget::default();
        assert_eq!(widget.choices.len(), 3);
        assert_eq!(
            widget.render_text(),
            "Accept Current Change | Accept Incoming Change | Accept Both Changes"
        );
        assert!(widget.bold);
    }

    #[test]
    fn test_choice_lookup() {
        let widget = ControlWidget::default();
        let both = widget.choice(Branch::Both).unwrap();
        assert_eq!(both.label, "Accept Both Changes");
    }

    #[test]
    fn test_branch_serde_lowercase() {
        let json = serde_json::to_string(&Branch::Theirs).unwrap();
        assert_eq!(json, "\"theirs\"");
    }
}
