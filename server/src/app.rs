use std::collections::HashMap;
use std::sync::Arc;

use ab_glyph::FontArc;
use code_render::{Rasterizer, SoftwareRasterizer};
use tokio::sync::{RwLock, broadcast};

use crate::config::{AppConfig, DownloadMode};
use crate::services::accounts::{AuthService, InMemoryUserRepository};
use crate::services::archive::DownloadSink;
use crate::services::batch::{BatchKind, BatchPipeline, PipelineDeps, PipelineSettings};
use crate::services::downloads::{DirectorySink, DownloadShelf};

/// The two generators owned by one login session.
#[derive(Clone)]
pub struct Workspace {
    pub barcode: BatchPipeline,
    pub qr: BatchPipeline,
}

/// Application shared state accessible from axum handlers.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    /// Broadcast channel for WebSocket messages
    ws_tx: broadcast::Sender<String>,
    config: RwLock<AppConfig>,
    auth: AuthService,
    /// Renderer shared by single-code requests and every pipeline
    rasterizer: Arc<SoftwareRasterizer>,
    /// Present only in [`DownloadMode::Shelf`]
    shelf: Option<Arc<DownloadShelf>>,
    pipeline_deps: PipelineDeps,
    /// Session token -> workspace
    workspaces: RwLock<HashMap<String, Workspace>>,
}

impl SharedState {
    /// Create shared state from loaded config and an optional caption font.
    pub fn new(config: AppConfig, font: Option<FontArc>) -> Self {
        let (ws_tx, _) = broadcast::channel(2048);
        let rasterizer = Arc::new(SoftwareRasterizer::new(font));

        let (shelf, sink): (Option<Arc<DownloadShelf>>, Arc<dyn DownloadSink>) =
            match config.download_mode {
                DownloadMode::Shelf => {
                    let shelf = Arc::new(DownloadShelf::new(config.download_shelf_capacity));
                    (Some(shelf.clone()), shelf as Arc<dyn DownloadSink>)
                }
                DownloadMode::Directory => {
                    let sink: Arc<dyn DownloadSink> =
                        Arc::new(DirectorySink::new(config.downloads_dir()));
                    (None, sink)
                }
            };

        let pipeline_deps = PipelineDeps {
            rasterizer: rasterizer.clone() as Arc<dyn Rasterizer>,
            sink,
            events: Some(ws_tx.clone()),
            settings: PipelineSettings {
                chunk_size: config.chunk_size,
                cooldown: config.chunk_cooldown,
                payload_host: config.qr_payload_host.clone(),
            },
        };

        Self {
            inner: Arc::new(SharedStateInner {
                ws_tx,
                config: RwLock::new(config),
                auth: AuthService::new(Arc::new(InMemoryUserRepository::seeded())),
                rasterizer,
                shelf,
                pipeline_deps,
                workspaces: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn server_port(&self) -> u16 {
        // Read from config; fallback to 8080.
        self.inner
            .config
            .try_read()
            .map(|c| c.server_port)
            .unwrap_or(8080)
    }

    pub fn ws_sender(&self) -> &broadcast::Sender<String> {
        &self.inner.ws_tx
    }

    pub fn subscribe_ws(&self) -> broadcast::Receiver<String> {
        self.inner.ws_tx.subscribe()
    }

    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    pub fn rasterizer(&self) -> &SoftwareRasterizer {
        &self.inner.rasterizer
    }

    pub fn shelf(&self) -> Option<&DownloadShelf> {
        self.inner.shelf.as_deref()
    }

    /// The workspace of a session, created on first use.
    pub async fn workspace(&self, token: &str) -> Workspace {
        if let Some(ws) = self.inner.workspaces.read().await.get(token) {
            return ws.clone();
        }
        let mut workspaces = self.inner.workspaces.write().await;
        workspaces
            .entry(token.to_string())
            .or_insert_with(|| {
                let deps = &self.inner.pipeline_deps;
                Workspace {
                    barcode: BatchPipeline::new(BatchKind::Barcode, deps.clone()),
                    qr: BatchPipeline::new(BatchKind::Qr, deps.clone()),
                }
            })
            .clone()
    }

    /// Forget a session's workspace. A run in progress keeps going to completion.
    pub async fn drop_workspace(&self, token: &str) {
        self.inner.workspaces.write().await.remove(token);
    }
}
