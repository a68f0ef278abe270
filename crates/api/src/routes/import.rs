use axum::routing::{get, post};
use axum::Router;

use crate::handlers::import;
use crate::state::AppState;

/// Routes mounted at `/import`.
///
/// ```text
/// POST /{kind}             import_file
/// POST /{kind}/validate    validate_file
/// GET  /{kind}/template    download_template
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{kind}", post(import::import_file))
        .route("/{kind}/validate", post(import::validate_file))
        .route("/{kind}/template", get(import::download_template))
}
