use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use cycleit_shared::constants::MAX_LISTING_IMAGES;
use cycleit_shared::Bucket;
use cycleit_store::Database;

use crate::blob_store::{content_type_for, BlobStore};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::{auth, exchanges, listings, messaging, profile};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub blob_store: Arc<BlobStore>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, blob_store: BlobStore, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            blob_store: Arc::new(blob_store),
            rate_limiter: RateLimiter::from_config(&config),
            config: Arc::new(config),
        }
    }

    /// Open the database and blob store named by `config`.
    pub async fn open(config: ServerConfig) -> Result<Self, ServerError> {
        let db = match &config.database_path {
            Some(path) => Database::open_at(path)?,
            None => Database::new()?,
        };
        let blob_store = BlobStore::new(
            config.blob_storage_path.clone(),
            config.max_image_size,
            config.public_base_url.clone(),
        )
        .await?;
        Ok(Self::new(db, blob_store, config))
    }

    /// Lock the database. Never hold the guard across an `.await`.
    pub fn db(&self) -> Result<MutexGuard<'_, Database>, ServerError> {
        self.db
            .lock()
            .map_err(|_| ServerError::Internal("database lock poisoned".into()))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    // room for a full set of listing images plus the text fields
    let body_limit = state.config.max_image_size * MAX_LISTING_IMAGES + 1024 * 1024;

    Router::new()
        .route("/health", get(health_check))
        // auth
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/login", post(auth::sign_in))
        .route("/auth/logout", post(auth::sign_out))
        .route("/auth/session", get(auth::current_session))
        // listings
        .route("/categories", get(listings::list_categories))
        .route(
            "/listings",
            get(listings::browse).post(listings::create_listing),
        )
        .route(
            "/listings/:id",
            get(listings::listing_detail)
                .patch(listings::set_active)
                .delete(listings::delete_listing),
        )
        .route(
            "/listings/:id/interest",
            get(listings::interest_status).post(listings::express_interest),
        )
        .route("/me/listings", get(listings::my_listings))
        // messaging
        .route("/messages", post(messaging::send_message))
        .route("/messages/conversations", get(messaging::conversations))
        .route("/messages/conversations/:user_id", get(messaging::thread))
        // exchanges
        .route(
            "/exchanges",
            get(exchanges::board).post(exchanges::create_exchange),
        )
        .route("/exchanges/:id", patch(exchanges::update_status))
        // profile
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/profile/avatar", put(profile::upload_avatar))
        .route("/dashboard", get(profile::dashboard))
        // public objects
        .route("/storage/:bucket/*key", get(serve_object))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn serve_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, ServerError> {
    let bucket: Bucket = bucket.parse()?;
    let data = state.blob_store.get(bucket, &key).await?;
    Ok((
        [(header::CONTENT_TYPE, content_type_for(&key))],
        Body::from(data),
    )
        .into_response())
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
