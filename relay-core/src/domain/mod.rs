//! Core domain types
//!
//! This module contains the run and stage structures used across Relay crates.
//! The tracker owns and mutates them; clients only read them.

pub mod run;
pub mod stage;
