use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vlibrary_core::host::KodiConfig;
use vlibrary_core::lists::DisabledListProvider;
use vlibrary_core::refresh::UpdateGate;
use vlibrary_core::{
    load_config, validate_config, Collaborators, Config, DuplicateIndex, FsDuplicateIndex,
    HeadlessHost, HostControl, KeyValueCache, KodiHost, Library, ListProvider, MetadataProvider,
    RefreshCoordinator, RefreshState, RemovalQueue, RemovalWorker, Renderer,
    SnapshotListProvider, SqliteCache, SqliteLedger, StateLedger, StrmRenderer, TmdbClient,
    TraktClient,
};

use vlibrary_core::config::HostBackend;
use vlibrary_core::render::{MOVIES_DIR, SHOWS_DIR};
use vlibrary_server::api::create_router;
use vlibrary_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("VLIBRARY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    let (library, coordinator) = if config.library.enabled {
        let (library, coordinator) = build_library(&config).await?;
        (Some(library), coordinator)
    } else {
        info!("Library disabled in config");
        (None, None)
    };

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        library,
        coordinator.clone(),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop coordinator if running
    if let Some(ref coordinator) = coordinator {
        info!("Stopping refresh coordinator...");
        coordinator.stop().await;
    }

    info!("Server shut down");
    Ok(())
}

/// Wire the collaborators, the library and the refresh coordinator.
///
/// The coordinator is only started when the library paths check out;
/// otherwise the host is told and the API still serves requests.
async fn build_library(
    config: &Config,
) -> Result<(Arc<Library>, Option<Arc<RefreshCoordinator>>)> {
    // The ledger and the cache share one sqlite file
    let ledger: Arc<dyn StateLedger> = Arc::new(
        SqliteLedger::new(&config.database.path).context("Failed to create state ledger")?,
    );
    let cache: Arc<dyn KeyValueCache> = Arc::new(
        SqliteCache::new(&config.database.path).context("Failed to create cache")?,
    );
    info!("Ledger and cache initialized");

    let library_path = &config.library.path;
    let index: Arc<dyn DuplicateIndex> = Arc::new(FsDuplicateIndex::new(
        library_path.join(MOVIES_DIR),
        library_path.join(SHOWS_DIR),
    ));
    let renderer: Arc<dyn Renderer> = Arc::new(StrmRenderer::new(config.library.render_config()));

    let tmdb_config = config
        .tmdb
        .clone()
        .context("[tmdb] section is required when the library is enabled")?;
    info!("Initializing TMDB client");
    let metadata: Arc<dyn MetadataProvider> =
        Arc::new(TmdbClient::new(tmdb_config).context("Failed to create TMDB client")?);

    let lists: Arc<dyn ListProvider> = match &config.trakt {
        Some(trakt_config) => {
            info!("Initializing Trakt list source");
            let source = TraktClient::new(trakt_config.clone())
                .context("Failed to create Trakt client")?;
            Arc::new(SnapshotListProvider::new(
                Arc::new(source),
                Arc::clone(&cache),
            ))
        }
        None => {
            info!("No list service configured, remote list sync disabled");
            Arc::new(DisabledListProvider)
        }
    };

    let host = build_host(config)?;

    let refresh = RefreshState::new();
    let (removals, removal_rx) = RemovalQueue::channel();

    let library = Arc::new(Library::new(
        config.library.clone(),
        config.sync.clone(),
        Collaborators {
            ledger: Arc::clone(&ledger),
            index: Arc::clone(&index),
            metadata,
            lists,
            renderer,
            host: Arc::clone(&host),
            cache,
        },
        refresh.clone(),
        removals.clone(),
    ));

    if let Err(e) = library.check_paths().await {
        warn!("Library paths unusable, background refresh disabled: {}", e);
        host.notify(&format!("Library unavailable: {}", e)).await;
        return Ok((library, None));
    }

    let worker = RemovalWorker::new(
        removal_rx,
        ledger,
        index,
        Arc::clone(&host),
        library.clone(),
        config.scheduler.removal_debounce(),
    );
    let coordinator = RefreshCoordinator::new(
        config.scheduler.clone(),
        UpdateGate::from(&config.library),
        refresh,
        library.clone(),
        host,
    )
    .with_removal_worker(worker, removals);

    coordinator.start().await;
    info!("Refresh coordinator started");

    Ok((library, Some(Arc::new(coordinator))))
}

fn build_host(config: &Config) -> Result<Arc<dyn HostControl>> {
    let auto_confirm = config.host.auto_confirm;
    match config.host.backend {
        HostBackend::Headless => {
            info!("No media center attached, running headless");
            Ok(Arc::new(HeadlessHost::new(auto_confirm)))
        }
        HostBackend::Kodi => {
            let kodi_config: KodiConfig = config
                .host
                .kodi
                .clone()
                .context("Kodi backend selected but no [host.kodi] config provided")?;
            info!("Connecting to Kodi at {}", kodi_config.url);
            let host = KodiHost::new(kodi_config, auto_confirm)
                .context("Failed to create Kodi host")?;
            Ok(Arc::new(host))
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
