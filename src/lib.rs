//! Host-facing layer of the input method core: the engine worker thread, the
//! session runner that orders engine work against incoming keys, housekeeping
//! timers and the UniFFI bindings.

uniffi::setup_scaffolding!();

pub mod api;
pub mod executor;
pub mod housekeeping;
pub mod runner;
pub mod trace_init;

#[cfg(test)]
mod testing;

pub use runner::SessionRunner;
