//! Common test utilities for E2E tests

use tempfile::TempDir;
use tidepool::{config, AppState};
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance with default federation settings
    pub async fn new() -> Self {
        Self::with_hub_timeout(5).await
    }

    /// Create a test server with a specific per-hub timeout (seconds)
    pub async fn with_hub_timeout(hub_timeout_seconds: u64) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "test.example.com".to_string(),
                protocol: "https".to_string(),
            },
            database: config::DatabaseConfig { path: db_path },
            federation: config::FederationConfig {
                hub_timeout_seconds,
                max_concurrent_pings: 10,
                hubs: vec![],
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client. Redirects stay visible to assertions.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = tidepool::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a test author with a feed, returning (feed id, feed url)
    pub async fn create_test_author(&self, username: &str) -> (String, String) {
        let response = self
            .client
            .post(self.url("/signup"))
            .json(&serde_json::json!({ "username": username }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "signup should succeed");

        let json: serde_json::Value = response.json().await.unwrap();
        (
            json["feed_id"].as_str().unwrap().to_string(),
            json["feed_url"].as_str().unwrap().to_string(),
        )
    }
}

/// A mock hub that accepts every request and counts the hits.
///
/// Spawns a real Axum server on an ephemeral port, the same way remote
/// hubs appear to the notifier in production.
pub struct MockHub {
    pub url: String,
    hits: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl MockHub {
    pub async fn start() -> Self {
        use axum::routing::post;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();

        let app = axum::Router::new().route(
            "/",
            post(move || {
                let hits = hits_clone.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    axum::http::StatusCode::NO_CONTENT
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/", addr),
            hits,
        }
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// A hub endpoint that accepts TCP connections but never answers.
///
/// Forces the notifier into its timeout path.
pub struct UnresponsiveHub {
    pub url: String,
    _sockets: tokio::task::JoinHandle<()>,
}

impl UnresponsiveHub {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                if let Ok((socket, _)) = listener.accept().await {
                    // Hold the connection open without ever responding.
                    held.push(socket);
                }
            }
        });

        Self {
            url: format!("http://{}/", addr),
            _sockets: handle,
        }
    }
}
