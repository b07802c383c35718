//! Defines routes for the image upload API and static file serving.
//!
//! ## Structure
//! - **Image endpoints** (JSON envelope responses)
//!   - `POST   /api/images` — upload (multipart `file` field)
//!   - `GET    /api/images` — list stored images
//!   - `GET    /api/images/{id}` — fetch one record
//!   - `GET    /api/images/{id}/download` — stream raw bytes as attachment
//!   - `DELETE /api/images/{id}` — remove a stored image
//!
//! - **Static serving**
//!   - `GET /static/images/{filename}` — raw file at each record's `url`
//!
//! - **Health endpoints**
//!   - `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        image_handlers::{
            delete_image, download_image, get_image, list_images, serve_image, upload_image,
        },
    },
    services::image_service::ImageService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build and return the router for all image routes.
///
/// The router carries shared state (`ImageService`) to all handlers. The
/// request body limit is raised above the upload ceiling so oversize
/// payloads reach the validator and fail with the policy message rather
/// than a bare 413; the slack covers multipart framing overhead.
pub fn routes(max_upload_bytes: u64) -> Router<ImageService> {
    let body_limit = (max_upload_bytes as usize).saturating_mul(2);

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // image endpoints
        .route("/api/images", post(upload_image).get(list_images))
        .route("/api/images/{id}", get(get_image).delete(delete_image))
        .route("/api/images/{id}/download", get(download_image))
        // static serving of stored files
        .route("/static/images/{filename}", get(serve_image))
        .layer(DefaultBodyLimit::max(body_limit))
}
