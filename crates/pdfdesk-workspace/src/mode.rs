//! Workspace interaction modes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a page click currently means. Exactly one mode is active at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Plain browsing; clicks do nothing.
    #[default]
    View,
    Merge,
    /// Clicks toggle page selection for extraction.
    Split,
    Convert,
    /// Clicks stage a signature placement.
    Sign,
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionMode::View => "view",
            InteractionMode::Merge => "merge",
            InteractionMode::Split => "split",
            InteractionMode::Convert => "convert",
            InteractionMode::Sign => "sign",
        };
        f.write_str(name)
    }
}
