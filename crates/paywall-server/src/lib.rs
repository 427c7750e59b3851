//! The paywall as a standalone service: settings, logging, the HTTP app and
//! background grant compaction. `main.rs` only wires these together.

pub mod app;
pub mod compaction;
pub mod settings;
pub mod telemetry;
