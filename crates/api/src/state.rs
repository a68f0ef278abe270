use std::sync::Arc;

use propline_core::import::phone::PhonePolicy;
use propline_core::import::store::DocumentStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Document storage the import pipeline reads and writes.
    pub store: Arc<dyn DocumentStore>,
    /// Phone canonicalization rules for lead imports.
    pub phone_policy: Arc<dyn PhonePolicy>,}
