//! Data model shared by the session core and the host layer: key envelopes,
//! keyboard specifications, the conversion-engine protocol, editor field
//! attributes, per-application compatibility and global settings.

pub mod compat;
pub mod engine;
pub mod field;
pub mod key;
pub mod preferences;
pub mod settings;
pub mod spec;
pub mod unicode;
