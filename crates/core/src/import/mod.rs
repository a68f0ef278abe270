//! Bulk import pipeline: decode, normalize, validate, resolve, persist, report.
//!
//! The generic path (properties and the configuration kinds) flags in-file
//! duplicates as warnings and imports them anyway. The leads path rejects
//! rows whose canonical phone number was already seen.

pub mod decoder;
pub mod duplicates;
pub mod phone;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod row;
pub mod schema;
pub mod session;
pub mod slug;
pub mod store;
pub mod template;
pub mod validator;
