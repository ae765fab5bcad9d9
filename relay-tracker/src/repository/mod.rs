//! Repository Module
//!
//! Data access layer for the tracker.
//! Runs live in memory for the lifetime of the process.

pub mod run;

pub use run::RunStore;
