use anyhow::Result;
use axum::extract::FromRef;
use axum::http::HeaderName;
use axum::Router;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::accounts::UserService;
use crate::catalog::CatalogService;
use crate::config::{Collections, Config};
use crate::library::LibraryService;
use crate::models::{Movie, TvShow};
use crate::routes;
use crate::store::{Database, MediaStore, RatingStore, UserStore, WatchlistStore};
use crate::tmdb::{GenreProvider, MetadataProvider, TmdbClient};

const MAX_BODY_BYTES: usize = 1024 * 1024; // 1MB safety cap
const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, FromRef)]
pub struct AppState {
    pub movies: Arc<CatalogService<Movie>>,
    pub tv: Arc<CatalogService<TvShow>>,
    pub users: Arc<UserService>,
    pub library: Arc<LibraryService>,
    pub genres: Arc<dyn GenreProvider>,
    pub db: Database,
}

impl AppState {
    /// Wires every store and service on top of `db`, with `provider` answering
    /// all metadata lookups.
    pub fn new<P>(db: Database, collections: &Collections, provider: Arc<P>) -> Self
    where
        P: MetadataProvider<Movie> + MetadataProvider<TvShow> + GenreProvider + 'static,
    {
        let movie_store: Arc<MediaStore<Movie>> = Arc::new(MediaStore::new(&db, &collections.movies));
        let tv_store: Arc<MediaStore<TvShow>> = Arc::new(MediaStore::new(&db, &collections.tv));
        let user_store = Arc::new(UserStore::new(&db, &collections.users));

        let library = LibraryService::new(
            user_store.clone(),
            movie_store.clone(),
            tv_store.clone(),
            Arc::new(WatchlistStore::new(&db, &collections.watchlist)),
            Arc::new(RatingStore::new(&db, &collections.ratings)),
        );

        Self {
            movies: Arc::new(CatalogService::new(movie_store, provider.clone())),
            tv: Arc::new(CatalogService::new(tv_store, provider.clone())),
            users: Arc::new(UserService::new(user_store)),
            library: Arc::new(library),
            genres: provider,
            db,
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let db = Database::open(&config.database_path, config.store_timeout)?;
    let tmdb = Arc::new(TmdbClient::new(
        &config.tmdb_base_url,
        &config.tmdb_api_key,
        config.tmdb_timeout,
    )?);
    info!("Using TMDB at {}", config.tmdb_base_url);

    let state = AppState::new(db.clone(), &config.collections, tmdb);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {} ({})", addr, config.environment);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        })
        .into_future();
    let grace = config.shutdown_grace;
    let deadline = async move {
        let _ = stop_rx.wait_for(|stopped| *stopped).await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        res = server => res?,
        _ = deadline => {
            warn!("In-flight requests still running after {}s, forcing shutdown", grace.as_secs());
        }
    }

    // Connection tasks abandoned at the deadline still hold pool clones; the
    // last connection closes when the runtime drops them.
    drop(db);
    info!("Server stopped");
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", routes::api_router())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C), draining requests");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM), draining requests");
        }
    }
}
