use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::{api, websocket};
use crate::app::SharedState;

/// Uploads of enterprise batches can be far larger than axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Create the axum router with all routes.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // --- Core ---
        .route("/status", get(status_handler))
        .route("/ws", get(websocket::ws_handler))
        // --- Auth ---
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/me", get(api::auth::me))
        .route("/api/auth/password", post(api::auth::change_password))
        .route("/api/auth/username", post(api::auth::change_username))
        // --- Formats ---
        .route("/api/formats", get(api::formats::list_formats))
        // --- Barcode batches ---
        .route("/api/barcode/upload", post(api::batch::upload_barcode))
        .route("/api/barcode/generate", post(api::batch::generate_barcode))
        .route("/api/barcode/status", get(api::batch::barcode_status))
        .route("/api/barcode/reset", post(api::batch::reset_barcode))
        .route("/api/barcode/single", post(api::single::single_barcode))
        // --- QR batches ---
        .route("/api/qr/upload", post(api::batch::upload_qr))
        .route("/api/qr/generate", post(api::batch::generate_qr))
        .route("/api/qr/status", get(api::batch::qr_status))
        .route("/api/qr/reset", post(api::batch::reset_qr))
        .route("/api/qr/single", post(api::single::single_qr))
        // --- Downloads ---
        .route("/api/downloads/{id}", get(api::downloads::download_archive))
        // --- Middleware ---
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn status_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": "1.0.0"
    }))
}
