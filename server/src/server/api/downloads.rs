//! One-shot archive downloads from the in-memory shelf.

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use serde_json::Value;

use crate::app::SharedState;

use super::err_json;

fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

/// GET /api/downloads/{id} – the archive is released once served
pub async fn download_archive(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let shelf = state
        .shelf()
        .ok_or_else(|| err_json(404, "Archives are saved to the server's download directory"))?;
    let archive = shelf
        .take(&id)
        .ok_or_else(|| err_json(404, "Download not found or already fetched"))?;

    tracing::info!(id = %id, file = %archive.file_name, size = archive.bytes.len(), "Archive downloaded");

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_DISPOSITION, content_disposition(&archive.file_name))
        .body(Body::from(archive.bytes))
        .map_err(|e| err_json(500, &e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, DownloadMode};
    use crate::services::archive::{Archive, DownloadSink, DownloadTicket};

    #[test]
    fn disposition_quotes_file_name() {
        assert_eq!(
            content_disposition("ITF 1 - 3.zip"),
            "attachment; filename=\"ITF 1 - 3.zip\""
        );
        assert_eq!(content_disposition("a\"b.zip"), "attachment; filename=\"a_b.zip\"");
    }

    #[tokio::test]
    async fn archive_is_served_once() {
        let config = AppConfig {
            download_mode: DownloadMode::Shelf,
            ..AppConfig::default()
        };
        let state = SharedState::new(config, None);
        let ticket = state
            .shelf()
            .unwrap()
            .deliver(Archive {
                label: "QR Codes 1 - 2".into(),
                file_name: "QR Codes 1 - 2.zip".into(),
                bytes: vec![1, 2, 3],
                entries: 2,
            })
            .unwrap();
        let DownloadTicket::Shelved { id, .. } = ticket else {
            panic!("expected a shelved ticket");
        };

        let resp = download_archive(State(state.clone()), Path(id.clone()))
            .await
            .unwrap();
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/zip");

        let err = download_archive(State(state), Path(id)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }
}
