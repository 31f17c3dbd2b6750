//! Common test utilities for API testing with mocks.
//!
//! The fixture builds an in-process router over a real library: sqlite
//! ledger and cache, `.strm` renderer and duplicate index on a temporary
//! directory, with mocked metadata, list source and host.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

use vlibrary_core::{
    config::{DatabaseConfig, LibraryConfig, ServerConfig},
    lists::SnapshotListProvider,
    removal::RemovalEvent,
    render::{MOVIES_DIR, SHOWS_DIR},
    testing::{MockHost, MockListSource, MockMetadataProvider},
    Collaborators, Config, FsDuplicateIndex, Library, RefreshState, RemovalQueue, SqliteCache,
    SqliteLedger, StrmRenderer,
};

/// Re-export fixtures for test convenience
pub use vlibrary_core::testing::fixtures;

/// Test fixture with controllable mocks.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub library: Arc<Library>,
    pub metadata: Arc<MockMetadataProvider>,
    pub source: Arc<MockListSource>,
    pub host: Arc<MockHost>,
    /// Receiving end of the removal queue; nothing flushes it in these tests.
    pub removals: mpsc::UnboundedReceiver<RemovalEvent>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture with the library enabled.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let library_path = temp_dir.path().join("library");
        std::fs::create_dir_all(&library_path).expect("Failed to create library dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            library: LibraryConfig {
                path: library_path.clone(),
                write_nfo_movies: false,
                write_nfo_shows: false,
                ..Default::default()
            },
            ..Default::default()
        };

        let ledger = Arc::new(SqliteLedger::new(&db_path).expect("Failed to create ledger"));
        let cache = Arc::new(SqliteCache::new(&db_path).expect("Failed to create cache"));
        let metadata = Arc::new(MockMetadataProvider::new());
        let source = Arc::new(MockListSource::new());
        let host = Arc::new(MockHost::new());

        let collaborators = Collaborators {
            ledger,
            index: Arc::new(FsDuplicateIndex::new(
                library_path.join(MOVIES_DIR),
                library_path.join(SHOWS_DIR),
            )),
            metadata: metadata.clone(),
            lists: Arc::new(SnapshotListProvider::new(source.clone(), cache.clone())),
            renderer: Arc::new(StrmRenderer::new(config.library.render_config())),
            host: host.clone(),
            cache,
        };

        let (queue, removals) = RemovalQueue::channel();
        let library = Arc::new(Library::new(
            config.library.clone(),
            config.sync.clone(),
            collaborators,
            RefreshState::new(),
            queue,
        ));
        library
            .check_paths()
            .await
            .expect("Failed to prepare library paths");

        // No coordinator: the API must work without background refresh
        let state = Arc::new(vlibrary_server::state::AppState::new(
            config,
            Some(library.clone()),
            None,
        ));
        let router = vlibrary_server::api::create_router(state);

        Self {
            router,
            library,
            metadata,
            source,
            host,
            removals,
            temp_dir,
        }
    }

    /// Create a fixture whose library is disabled.
    pub fn disabled() -> Router {
        let state = Arc::new(vlibrary_server::state::AppState::new(
            Config::default(),
            None,
            None,
        ));
        vlibrary_server::api::create_router(state)
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        send(&self.router, "GET", path).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        send(&self.router, "POST", path).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        send(&self.router, "DELETE", path).await
    }
}

/// Send a request to a router and decode the JSON body, if any.
pub async fn send(router: &Router, method: &str, path: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap();

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let body_bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect body")
        .to_bytes();

    let body: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    TestResponse { status, body }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
