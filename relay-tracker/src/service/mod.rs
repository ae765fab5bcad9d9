//! Service Module
//!
//! Business logic layer for the tracker.
//! Services orchestrate between the run store and the domain lifecycle.

pub mod fixtures;
pub mod run;

// Re-export for convenience
pub use run as run_service;
