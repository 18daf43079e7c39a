//! Per-application compatibility policy, built from the `[compat]` settings table.

use std::collections::HashSet;

use crate::settings::CompatSettings;

/// Quirks of one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppCompat {
    /// Treat every field as a web edit text (content may be rewritten by the app).
    pub pretend_web_field: bool,
    /// Caret reports landing on the composition tail are ignored.
    pub ignore_tail_moves: bool,
    pub fullscreen_supported: bool,
}

impl Default for AppCompat {
    fn default() -> Self {
        Self {
            pretend_web_field: false,
            ignore_tail_moves: false,
            fullscreen_supported: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompatPolicy {
    web_field: HashSet<String>,
    ignore_tail_moves: HashSet<String>,
    fullscreen_unsupported: HashSet<String>,
}

impl CompatPolicy {
    pub fn from_settings(compat: &CompatSettings) -> Self {
        Self {
            web_field: compat.web_field_packages.iter().cloned().collect(),
            ignore_tail_moves: compat.ignore_tail_move_packages.iter().cloned().collect(),
            fullscreen_unsupported: compat
                .fullscreen_unsupported_packages
                .iter()
                .cloned()
                .collect(),
        }
    }

    pub fn for_package(&self, package_name: &str) -> AppCompat {
        AppCompat {
            pretend_web_field: self.web_field.contains(package_name),
            ignore_tail_moves: self.ignore_tail_moves.contains(package_name),
            fullscreen_supported: !self.fullscreen_unsupported.contains(package_name),
        }
    }
}
