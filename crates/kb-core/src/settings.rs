//! Global settings loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Read and install a settings file.
pub fn init_from_file(path: &Path) -> Result<(), SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    init_custom(content)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub selection: SelectionSettings,
    #[serde(default)]
    pub compat: CompatSettings,
    pub housekeeping: HousekeepingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSettings {
    pub max_records: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompatSettings {
    #[serde(default)]
    pub web_field_packages: Vec<String>,
    #[serde(default)]
    pub ignore_tail_move_packages: Vec<String>,
    #[serde(default)]
    pub fullscreen_unsupported_packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingSettings {
    pub sync_interval_secs: u64,
    pub memory_trim_delay_secs: u64,
}

impl HousekeepingSettings {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn memory_trim_delay(&self) -> Duration {
        Duration::from_secs(self.memory_trim_delay_secs)
    }
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_positive {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }
    macro_rules! check_package_names {
        ($section:ident . $field:ident) => {
            if let Some(bad) = s.$section.$field.iter().find(|p| p.trim().is_empty()) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: format!("package name must be non-empty, got {bad:?}"),
                });
            }
        };
    }

    check_positive!(selection.max_records);
    check_positive!(housekeeping.sync_interval_secs);
    check_positive!(housekeeping.memory_trim_delay_secs);

    check_package_names!(compat.web_field_packages);
    check_package_names!(compat.ignore_tail_move_packages);
    check_package_names!(compat.fullscreen_unsupported_packages);

    Ok(())
}
