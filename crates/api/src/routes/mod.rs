pub mod health;
pub mod import;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /import/{kind}                    import a CSV/XLSX upload (POST)
/// /import/{kind}/validate           dry-run validation report (POST)
/// /import/{kind}/template           download template (?format=csv|xlsx)
/// ```
///
/// `{kind}` is one of `properties`, `categories`, `states`, `amenities`,
/// `developers`, `facilities`, `leads`.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/import", import::router())
}
