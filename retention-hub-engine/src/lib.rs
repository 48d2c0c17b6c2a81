//! Policy resolution engine for Retention Hub
//!
//! Resolves the effective retention policy and legal hold for a
//! (schema, table) coordinate by applying the three-tier precedence
//! chain (source default, schema override, table override), and builds
//! the orchestration-ready export document for a source.
//!
//! The engine is stateless: every operation is a read against the
//! record store followed by in-memory computation. It never writes and
//! never retries.

pub mod error;
pub mod export;
pub mod resolve;

pub use error::EngineError;
pub use resolve::ResolutionEngine;
