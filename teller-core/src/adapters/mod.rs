//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the AccountStore port (atomic multi-write)
//! - An in-memory store for tests, with or without atomic multi-write

pub mod duckdb;
pub mod memory;
