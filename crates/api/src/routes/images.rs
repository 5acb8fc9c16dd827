use axum::routing::{get, post};
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Routes mounted at `/images`.
///
/// ```text
/// GET    /{id}                      -> get_image
/// POST   /{id}/download             -> download_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(images::get_image))
        .route("/{id}/download", post(images::download_image))
}
