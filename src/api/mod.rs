//! UniFFI export layer: bindings for the platform input method service.
//!
//! Each public type here maps to a generated class, record or enum.

mod engine;
mod session;
mod types;

pub use engine::KbEngine;
pub use session::KbSession;
pub use types::{
    KbCandidate, KbCandidateCategory, KbCommand, KbCompositionMode, KbCursorPlacement,
    KbDeviceConfig, KbEngineKey, KbEngineResponse, KbError, KbFieldInfo, KbInputFieldType,
    KbKeyEnvelope, KbKeyboardSpecification, KbOrientation, KbPreferenceChange, KbPreferences,
    KbRawKeyEvent, KbRequestUpdate, KbSelectionUpdate, KbSpanStyle, KbStyledSpan,
};

use std::path::Path;

// ---------------------------------------------------------------------------
// Top-level functions
// ---------------------------------------------------------------------------

#[uniffi::export]
fn engine_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[uniffi::export]
fn settings_load_config(path: String) -> Result<(), KbError> {
    let content = std::fs::read_to_string(&path).map_err(|e| KbError::Io {
        msg: format!("{path}: {e}"),
    })?;
    kb_core::settings::init_custom(content)
        .map_err(|e| KbError::InvalidData { msg: e.to_string() })?;
    Ok(())
}

#[uniffi::export]
fn settings_default_config() -> String {
    kb_core::settings::default_toml().to_string()
}

#[uniffi::export]
fn trace_init(log_dir: String) {
    crate::trace_init::init_tracing(Path::new(&log_dir));
}
