//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod config;
pub mod directory;
pub mod headless_combat;
pub mod live;
pub mod notifier;
pub mod persistence;
pub mod ports;
pub mod settings;
pub mod telemetry;
