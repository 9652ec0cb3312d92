use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

use asset_packager::AssetIndex;

use crate::config::ServerConfig;
use crate::error::ServerResult;

pub mod error;
pub mod package;
pub mod status;

pub struct Server {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Server {
    /// Binds `config.bind_addr` and serves packages from `index` until
    /// [`Server::shutdown`] is called or the server is dropped.
    pub async fn start(config: &ServerConfig, index: Arc<AssetIndex>) -> ServerResult<Self> {
        let bind_addr = config.validate()?;
        let state = Arc::new(ServerState {
            index,
            package_prefix: config.package_prefix.clone(),
        });
        let app = router(state, config.cors);

        let listener = TcpListener::bind(bind_addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(error) = served {
                log::error!("package server stopped with error: {error}");
            }
        });

        log::info!("package server listening on {addr}");
        Ok(Server {
            addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&mut self) -> Result<(), String> {
        if let Some(sender) = self.shutdown.take() {
            sender
                .send(())
                .map_err(|_| "failed to send server shutdown signal".to_string())
        } else {
            Ok(())
        }
    }

    /// Signals shutdown and waits for in-flight requests to finish.
    pub async fn stop(mut self) -> Result<(), String> {
        self.shutdown()?;
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|error| format!("package server task failed: {error}"))?;
        }
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn router(state: Arc<ServerState>, cors: bool) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .route("/package", post(package::build))
        .route("/status", get(status::index_status))
        .route("/assets", get(status::list_assets))
        .route("/state", get(status::asset_state))
        .with_state(state);
    if !cors {
        return app;
    }
    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

async fn health() -> &'static str {
    "ok"
}

pub(crate) struct ServerState {
    pub(crate) index: Arc<AssetIndex>,
    pub(crate) package_prefix: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::{tempdir, TempDir};

    async fn start_for(dir: &TempDir, prefix: &str) -> (Server, Arc<AssetIndex>) {
        let index = Arc::new(AssetIndex::open(dir.path()).expect("open index"));
        let config = ServerConfig {
            asset_dir: dir.path().to_path_buf(),
            bind_addr: "127.0.0.1:0".to_string(),
            package_prefix: prefix.to_string(),
            cors: true,
        };
        let server = Server::start(&config, index.clone()).await.expect("start");
        (server, index)
    }

    fn asset_dir() -> TempDir {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("x.txt"), b"served bytes").expect("write x");
        dir
    }

    fn entries(package: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = tar::Archive::new(GzDecoder::new(package));
        archive
            .entries()
            .expect("entries")
            .map(|entry| {
                let mut entry = entry.expect("entry");
                let name = entry.path().expect("path").to_string_lossy().to_string();
                let mut bytes = Vec::new();
                entry.read_to_end(&mut bytes).expect("body");
                (name, bytes)
            })
            .collect()
    }

    #[tokio::test]
    async fn start_binds_random_port() {
        let dir = asset_dir();
        let (server, _index) = start_for(&dir, "").await;
        assert_ne!(server.addr().port(), 0);
        server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = asset_dir();
        let (server, _index) = start_for(&dir, "").await;

        let body = reqwest::get(format!("http://{}/health", server.addr()))
            .await
            .expect("request")
            .text()
            .await
            .expect("body");
        assert_eq!(body, "ok");
        server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn package_returns_archive_with_manifest() {
        let dir = asset_dir();
        let (server, _index) = start_for(&dir, "pkg").await;

        let response = reqwest::Client::new()
            .post(format!("http://{}/package", server.addr()))
            .body(r#"["x.txt", "missing.txt"]"#)
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            package::PACKAGE_CONTENT_TYPE
        );
        assert_eq!(
            response.headers()["content-encoding"],
            package::PACKAGE_CONTENT_ENCODING
        );

        let bytes = response.bytes().await.expect("bytes");
        let entries = entries(&bytes);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "pkg/x.txt");
        assert_eq!(entries[0].1, b"served bytes");
        assert_eq!(entries[1].0, "pkg/metadata.json");

        let manifest: serde_json::Value = serde_json::from_slice(&entries[1].1).expect("manifest");
        assert_eq!(
            manifest,
            serde_json::json!({
                "ResourcesRequested": ["x.txt", "missing.txt"],
                "ResourcesFailed": ["missing.txt"]
            })
        );
        server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn package_rejects_malformed_body() {
        let dir = asset_dir();
        let (server, _index) = start_for(&dir, "").await;

        let response = reqwest::Client::new()
            .post(format!("http://{}/package", server.addr()))
            .body("not json")
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json().await.expect("error body");
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "bad_request");
        server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn status_and_assets_reflect_index() {
        let dir = asset_dir();
        let (server, index) = start_for(&dir, "").await;

        let status: serde_json::Value = reqwest::get(format!("http://{}/status", server.addr()))
            .await
            .expect("request")
            .json()
            .await
            .expect("status body");
        assert_eq!(status["presentAssets"], 1);
        assert_eq!(status["watching"], true);
        assert_eq!(status["root"], index.root().to_string_lossy().to_string());

        let assets: Vec<String> = reqwest::get(format!("http://{}/assets", server.addr()))
            .await
            .expect("request")
            .json()
            .await
            .expect("assets body");
        assert_eq!(assets, vec!["x.txt"]);
        server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn state_distinguishes_unknown_from_removed() {
        let dir = asset_dir();
        let (server, index) = start_for(&dir, "").await;
        let state_of = |path: &str| {
            let url = format!("http://{}/state?path={path}", server.addr());
            async move {
                let body: serde_json::Value = reqwest::get(url)
                    .await
                    .expect("request")
                    .json()
                    .await
                    .expect("state body");
                body["state"].as_str().unwrap_or_default().to_string()
            }
        };

        assert_eq!(state_of("x.txt").await, "present");
        assert_eq!(state_of("never.txt").await, "unknown");

        std::fs::remove_file(dir.path().join("x.txt")).expect("remove x");
        for _ in 0..500 {
            if !index.exists("x.txt") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(state_of("x.txt").await, "removed");

        let response = reqwest::get(format!("http://{}/state", server.addr()))
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.expect("error body");
        assert_eq!(body["error"]["code"], "bad_request");
        server.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn start_rejects_invalid_bind_addr() {
        let dir = asset_dir();
        let index = Arc::new(AssetIndex::open(dir.path()).expect("open index"));
        let config = ServerConfig {
            asset_dir: dir.path().to_path_buf(),
            bind_addr: "nowhere".to_string(),
            ..ServerConfig::default()
        };
        assert!(Server::start(&config, index).await.is_err());
    }
}
