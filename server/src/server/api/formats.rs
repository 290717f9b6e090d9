//! Format registry listing.

use axum::Json;
use code_formats::QR_SERIAL;
use serde_json::{Value, json};

/// GET /api/formats
pub async fn list_formats() -> Json<Value> {
    super::ok_json(json!({
        "barcode": code_formats::list_formats(),
        "qr": &QR_SERIAL,
    }))
}
