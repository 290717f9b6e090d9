//! Batch upload, generation and progress for both generators.
//!
//!   POST /api/{barcode,qr}/upload    – load a text file (multipart `file`)
//!   POST /api/{barcode,qr}/generate  – start the chunked run
//!   GET  /api/{barcode,qr}/status    – current `BatchRun`
//!   POST /api/{barcode,qr}/reset     – drop the loaded batch

use axum::Json;
use axum::extract::{Multipart, Query, State};
use axum::http::HeaderMap;
use code_formats::{FormatDescriptor, QR_SERIAL, find_format};
use code_render::BarcodeOptions;
use serde::Deserialize;
use serde_json::json;

use crate::app::SharedState;
use crate::services::accounts::PlanLevel;
use crate::services::batch::{BatchPipeline, PipelineError, RunRequest};
use crate::services::input::{ValidationError, decode_upload};

use super::{ApiError, ApiResult, err_json, ok_json, require_session};

#[derive(Deserialize)]
pub struct UploadQuery {
    pub format: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct GenerateBarcodeRequest {
    pub format: Option<String>,
    pub options: Option<BarcodeOptions>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct GenerateQrRequest {
    pub secret: String,
}

struct Upload {
    format: Option<String>,
    bytes: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut format = None;
    let mut bytes = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| err_json(400, &e.to_string()))?;
                bytes = Some(data.to_vec());
            }
            "format" => {
                format = Some(field.text().await.map_err(|e| err_json(400, &e.to_string()))?);
            }
            _ => {}
        }
    }
    let bytes = bytes.ok_or_else(|| err_json(400, "No file provided"))?;
    Ok(Upload { format, bytes })
}

fn validation_error(e: ValidationError) -> ApiError {
    let status = match e {
        ValidationError::Busy => 409,
        _ => 400,
    };
    err_json(status, &e.to_string())
}

fn pipeline_error(e: PipelineError) -> ApiError {
    let status = match e {
        PipelineError::Busy => 409,
        PipelineError::NoBatch | PipelineError::MissingSecret | PipelineError::UnknownFormat(_) => 400,
        _ => 500,
    };
    err_json(status, &e.to_string())
}

/// Pick the barcode format from the query string, falling back to the form field.
fn resolve_format(
    query: Option<&str>,
    field: Option<&str>,
) -> Result<&'static FormatDescriptor, ApiError> {
    let id = query
        .or(field)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| err_json(400, "No barcode format selected"))?;
    find_format(id).ok_or_else(|| err_json(400, &format!("Unknown format: {id}")))
}

/// Styling is a top-tier feature; other plans always get the defaults.
fn effective_options(plan: PlanLevel, requested: Option<BarcodeOptions>) -> BarcodeOptions {
    match requested {
        Some(options) if plan.allows_custom_style() => options,
        _ => BarcodeOptions::default(),
    }
}

async fn load_batch(
    pipeline: &BatchPipeline,
    upload: &Upload,
    format: &'static FormatDescriptor,
    plan: PlanLevel,
) -> ApiResult {
    let text = decode_upload(&upload.bytes).map_err(validation_error)?;
    let count = pipeline
        .load(&text, format, plan.max_batch_size())
        .await
        .map_err(validation_error)?;
    Ok(ok_json(json!({ "count": count, "run": pipeline.snapshot() })))
}

/// POST /api/barcode/upload
pub async fn upload_barcode(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> ApiResult {
    let (token, user) = require_session(&state, &headers).await?;
    let upload = read_upload(multipart).await?;
    let format = resolve_format(query.format.as_deref(), upload.format.as_deref())?;
    let ws = state.workspace(&token).await;
    load_batch(&ws.barcode, &upload, format, user.plan).await
}

/// POST /api/qr/upload
pub async fn upload_qr(
    State(state): State<SharedState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult {
    let (token, user) = require_session(&state, &headers).await?;
    let upload = read_upload(multipart).await?;
    let ws = state.workspace(&token).await;
    load_batch(&ws.qr, &upload, &QR_SERIAL, user.plan).await
}

/// POST /api/barcode/generate
pub async fn generate_barcode(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<GenerateBarcodeRequest>,
) -> ApiResult {
    let (token, user) = require_session(&state, &headers).await?;
    let ws = state.workspace(&token).await;

    if let Some(requested) = body.format.as_deref() {
        if let Some(loaded) = ws.barcode.loaded_format().await {
            if loaded.id != requested {
                return Err(err_json(
                    409,
                    &format!(
                        "The loaded file was validated as {}; upload it again to use {requested}",
                        loaded.name
                    ),
                ));
            }
        }
    }

    let options = effective_options(user.plan, body.options);
    options.check().map_err(|e| err_json(400, &e.to_string()))?;

    ws.barcode
        .start(RunRequest {
            options,
            ..RunRequest::default()
        })
        .await
        .map_err(pipeline_error)?;
    Ok(ok_json(json!({ "run": ws.barcode.snapshot() })))
}

/// POST /api/qr/generate
pub async fn generate_qr(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<GenerateQrRequest>,
) -> ApiResult {
    let (token, _) = require_session(&state, &headers).await?;
    let ws = state.workspace(&token).await;
    ws.qr
        .start(RunRequest {
            secret: body.secret,
            ..RunRequest::default()
        })
        .await
        .map_err(pipeline_error)?;
    Ok(ok_json(json!({ "run": ws.qr.snapshot() })))
}

/// GET /api/barcode/status
pub async fn barcode_status(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult {
    let (token, _) = require_session(&state, &headers).await?;
    let ws = state.workspace(&token).await;
    Ok(ok_json(json!({ "pipelineId": ws.barcode.id(), "run": ws.barcode.snapshot() })))
}

/// GET /api/qr/status
pub async fn qr_status(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult {
    let (token, _) = require_session(&state, &headers).await?;
    let ws = state.workspace(&token).await;
    Ok(ok_json(json!({ "pipelineId": ws.qr.id(), "run": ws.qr.snapshot() })))
}

/// POST /api/barcode/reset
pub async fn reset_barcode(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult {
    let (token, _) = require_session(&state, &headers).await?;
    let ws = state.workspace(&token).await;
    ws.barcode.reset().await.map_err(pipeline_error)?;
    Ok(ok_json(json!({ "run": ws.barcode.snapshot() })))
}

/// POST /api/qr/reset
pub async fn reset_qr(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult {
    let (token, _) = require_session(&state, &headers).await?;
    let ws = state.workspace(&token).await;
    ws.qr.reset().await.map_err(pipeline_error)?;
    Ok(ok_json(json!({ "run": ws.qr.snapshot() })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn query_format_wins_over_form_field() {
        assert_eq!(resolve_format(Some("ITF"), Some("MSI")).unwrap().id, "ITF");
        assert_eq!(resolve_format(None, Some(" MSI ")).unwrap().id, "MSI");
    }

    #[test]
    fn missing_or_unknown_format_is_bad_request() {
        assert_eq!(resolve_format(None, None).unwrap_err().0, StatusCode::BAD_REQUEST);
        let (status, Json(body)) = resolve_format(Some("EAN13"), None).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("EAN13"));
    }

    #[test]
    fn custom_options_need_top_tier() {
        let custom = BarcodeOptions {
            height: 50,
            ..BarcodeOptions::default()
        };
        assert_eq!(
            effective_options(PlanLevel::Pro, Some(custom.clone())),
            BarcodeOptions::default()
        );
        assert_eq!(effective_options(PlanLevel::Enterprise, Some(custom.clone())), custom);
        assert_eq!(effective_options(PlanLevel::Enterprise, None), BarcodeOptions::default());
    }

    #[test]
    fn busy_maps_to_conflict() {
        assert_eq!(validation_error(ValidationError::Busy).0, StatusCode::CONFLICT);
        assert_eq!(pipeline_error(PipelineError::Busy).0, StatusCode::CONFLICT);
        assert_eq!(
            validation_error(ValidationError::LimitExceeded { limit: 10, count: 11 }).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(pipeline_error(PipelineError::MissingSecret).0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn generate_bodies_accept_empty_json() {
        let body: GenerateBarcodeRequest = serde_json::from_str("{}").unwrap();
        assert!(body.format.is_none() && body.options.is_none());
        let body: GenerateBarcodeRequest =
            serde_json::from_str(r#"{"format":"ITF","options":{"height":40}}"#).unwrap();
        assert_eq!(body.options.unwrap().height, 40);
        let body: GenerateQrRequest = serde_json::from_str(r#"{"secret":"pw"}"#).unwrap();
        assert_eq!(body.secret, "pw");
    }
}
