//! Domain logic for the listing marketplace's bulk import subsystem.
//!
//! Everything here is free of HTTP and SQL: the pipeline talks to storage
//! through the [`import::store::DocumentStore`] trait so the same code runs
//! against PostgreSQL in production and an in-memory store in tests.

pub mod error;
pub mod import;
pub mod types;
