//! Use cases - user story orchestration.
//!
//! Each use case wires ports together for one player-facing request and
//! returns a report the session layer renders.

pub mod pvp;

pub use pvp::PvpUseCases;
