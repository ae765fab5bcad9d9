//! Relay Core
//!
//! Core types and abstractions for the Relay pipeline run tracker.
//!
//! This crate contains:
//! - Domain types: pipeline runs, stages and the stage lifecycle
//! - DTOs: request, query and response shapes shared by tracker and clients
//! - Errors: transition errors raised by the lifecycle

pub mod domain;
pub mod dto;
pub mod error;

pub use error::TransitionError;
