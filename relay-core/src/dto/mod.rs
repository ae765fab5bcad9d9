//! Data Transfer Objects
//!
//! Request and response shapes exchanged between the tracker API and its
//! clients (CLI, dashboard).

pub mod health;
pub mod query;
pub mod run;
