//! Core domain models for Retention Hub
//!
//! This crate contains the shared data structures used across
//! the retention service: Connection, Warehouse, Policy, Source, Rule,
//! and the resolution/export result types.

pub mod error;
pub mod models;

pub use error::CoreError;
pub use models::*;
