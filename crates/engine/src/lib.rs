//! Skirmish Engine library.
//!
//! Asynchronous PvP against saved characters: arena fights, sleep attacks
//! through hired guards, lodging, bounties and the shared save store that
//! every session reads and writes.
//!
//! ## Structure
//!
//! - `use_cases/` - PvP attempts orchestrated over the ports
//! - `infrastructure/` - Port traits and their adapters (SQLite, in-memory, live push)
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod use_cases;

/// Shared builders for engine tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
