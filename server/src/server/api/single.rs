//! Single-code rendering for previews and one-off codes.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use code_formats::find_format;
use code_render::{
    BarcodeJob, BarcodeOptions, Logo, LogoShape, QrJob, QrStyle, Rasterizer, RenderJob, Symbology,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::app::SharedState;

use super::{ApiError, ApiResult, err_json, ok_json, require_session};

const DEFAULT_LOGO_SIZE_PCT: u32 = 20;

#[derive(Deserialize)]
pub struct SingleBarcodeRequest {
    pub format: String,
    pub value: String,
    #[serde(default)]
    pub options: Option<BarcodeOptions>,
}

/// Render one job off the async runtime.
async fn render(state: &SharedState, job: RenderJob) -> Result<Vec<u8>, ApiError> {
    let rasterizer = state.rasterizer().clone();
    tokio::task::spawn_blocking(move || rasterizer.rasterize(&job))
        .await
        .map_err(|e| err_json(500, &e.to_string()))?
        .map_err(|e| err_json(400, &e.to_string()))
}

fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// POST /api/barcode/single – returns `{ dataUrl }`
pub async fn single_barcode(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<SingleBarcodeRequest>,
) -> ApiResult {
    let (_, user) = require_session(&state, &headers).await?;
    let format = find_format(&body.format)
        .ok_or_else(|| err_json(400, &format!("Unknown format: {}", body.format)))?;

    let value = format.normalize(body.value.trim());
    if !format.validate(&value) {
        return Err(err_json(400, format.error_message));
    }

    let options = match body.options {
        Some(options) if user.plan.allows_custom_style() => options,
        _ => BarcodeOptions::default(),
    };
    options.check().map_err(|e| err_json(400, &e.to_string()))?;
    let symbology: Symbology = format
        .format
        .parse()
        .map_err(|e: code_render::UnknownSymbology| err_json(500, &e.to_string()))?;

    let png = render(
        &state,
        RenderJob::Barcode(BarcodeJob {
            symbology,
            value: value.clone(),
            options,
        }),
    )
    .await?;

    Ok(ok_json(json!({
        "format": format.id,
        "value": value,
        "dataUrl": png_data_url(&png),
    })))
}

/// Form fields of a single QR request.
#[derive(Debug, Default)]
struct QrForm {
    value: String,
    color: Option<String>,
    logo: Option<Vec<u8>>,
    logo_shape: LogoShape,
    logo_size: u32,
}

fn parse_logo_shape(raw: &str) -> Result<LogoShape, ApiError> {
    match raw.trim().to_lowercase().as_str() {
        "" | "original" => Ok(LogoShape::Original),
        "circle" => Ok(LogoShape::Circle),
        "square" => Ok(LogoShape::Square),
        other => Err(err_json(400, &format!("Unknown logo shape: {other}"))),
    }
}

async fn read_qr_form(mut multipart: Multipart) -> Result<QrForm, ApiError> {
    let mut form = QrForm {
        logo_size: DEFAULT_LOGO_SIZE_PCT,
        ..QrForm::default()
    };
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        if name == "logo" {
            let data = field
                .bytes()
                .await
                .map_err(|e| err_json(400, &e.to_string()))?;
            if !data.is_empty() {
                form.logo = Some(data.to_vec());
            }
            continue;
        }
        let text = field.text().await.map_err(|e| err_json(400, &e.to_string()))?;
        match name.as_str() {
            "value" => form.value = text,
            "color" => form.color = Some(text.trim().to_string()).filter(|c| !c.is_empty()),
            "logoShape" => form.logo_shape = parse_logo_shape(&text)?,
            "logoSize" => {
                form.logo_size = text
                    .trim()
                    .parse()
                    .map_err(|_| err_json(400, "logoSize must be a whole percentage"))?;
            }
            _ => {}
        }
    }
    Ok(form)
}

/// POST /api/qr/single – returns the PNG itself
pub async fn single_qr(
    State(state): State<SharedState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, (StatusCode, Json<Value>)> {
    require_session(&state, &headers).await?;
    let form = read_qr_form(multipart).await?;
    if form.value.trim().is_empty() {
        return Err(err_json(400, "Enter the content to encode"));
    }

    let logo = form
        .logo
        .as_deref()
        .map(|bytes| Logo::decode(bytes, form.logo_shape, form.logo_size))
        .transpose()
        .map_err(|e| err_json(400, &e.to_string()))?;

    let mut style = QrStyle::default();
    if let Some(color) = form.color {
        style.dark = color;
    }

    let png = render(
        &state,
        RenderJob::Qr(QrJob {
            payload: form.value,
            caption: None,
            style,
            logo,
        }),
    )
    .await?;

    Response::builder()
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(png))
        .map_err(|e| err_json(500, &e.to_string()))
}
