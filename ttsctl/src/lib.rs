//! # ttsctl: credit-metered text-to-speech orchestration
//!
//! `ttsctl` sits between end users and a remote GPU speech-synthesis endpoint. It prices each
//! request, checks and debits a per-account credit ledger, calls the provider, and records the
//! resulting audio artifact so the account can list and delete its generations later. Credits are
//! topped up by signed payment-provider webhooks.
//!
//! ## Overview
//!
//! Each account starts with a signup grant. A generation costs one credit per started block of
//! 100 characters of input text. The provider writes the audio into the artifact bucket itself
//! and answers with the key it wrote; the service never handles generated audio bytes, only
//! uploaded reference voice samples.
//!
//! ### Request Flow
//!
//! #### Speech generation (`POST /api/v1/speech`)
//!
//! The request is authenticated by the [`auth`] layer (a signed session token, or a trusted proxy
//! header), which also creates the account with its signup grant on first sight. The
//! [`generation::Orchestrator`] validates the input, rejects unaffordable requests before any
//! provider call, synthesizes, mints a download URL and only then debits the account and records
//! the project in one atomic step. A provider failure costs nothing; a failed debit removes the
//! orphaned artifact.
//!
//! #### Payment webhooks (`POST /webhooks/payments`)
//!
//! The [`billing`] module verifies the Standard Webhooks signature and timestamp, maps the
//! purchased product to a credit amount and credits the account exactly once per delivery id,
//! so provider redeliveries are harmless.
//!
//! ### Core Components
//!
//! - **API layer** ([`api`]): axum handlers and request/response models under `/api/v1`
//! - **Persistence** ([`store`], [`db`]): the [`store::Datastore`] seam, implemented over
//!   PostgreSQL repositories or in memory
//! - **Artifacts** ([`blob`]): S3 or local-filesystem object store with read-time URL minting
//! - **Provider** ([`inference`]): the HTTP client for the synthesis endpoint
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use ttsctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = ttsctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     ttsctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod billing;
pub mod blob;
pub mod config;
pub mod db;
pub mod errors;
pub mod generation;
pub mod inference;
mod metrics;
mod openapi;
pub mod store;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue, Method},
    routing::{delete, get, post},
};
use axum_prometheus::{PrometheusMetricLayer, metrics_exporter_prometheus::PrometheusHandle};
use bon::Builder;
use once_cell::sync::Lazy;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, info, instrument, Level};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    api::handlers::voices::MULTIPART_OVERHEAD_BYTES,
    auth::session::SessionProvider,
    billing::{Billing, PaymentWebhookVerifier},
    blob::BlobStore,
    config::{CorsOrigin, StorageBackend},
    generation::Orchestrator,
    inference::InferenceProvider,
    openapi::ApiDoc,
    store::{Datastore, InMemoryStore, PostgresStore},
};

pub use config::Config;
pub use types::{AccountId, Credits, ProjectId, VoiceId};

/// The HTTP metrics recorder is process-global, so the layer is created once and shared by
/// every router built in this process.
static HTTP_METRICS: Lazy<(PrometheusMetricLayer<'static>, PrometheusHandle)> = Lazy::new(PrometheusMetricLayer::pair);

/// Application state shared across all request handlers.
///
/// Every external dependency sits behind a trait object, so tests swap in an in-memory store,
/// a temporary local artifact directory and a mock provider without touching handler code.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .store(store)
///     .blobs(blobs)
///     .inference(inference)
///     .sessions(sessions)
///     .maybe_webhook_verifier(verifier)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Datastore>,
    pub blobs: Arc<dyn BlobStore>,
    pub inference: Arc<dyn InferenceProvider>,
    pub sessions: Arc<dyn SessionProvider>,
    pub webhook_verifier: Option<Arc<dyn PaymentWebhookVerifier>>,
}

impl AppState {
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            self.store.clone(),
            self.blobs.clone(),
            self.inference.clone(),
            &self.config.inference,
        )
    }

    pub fn billing(&self) -> Billing {
        Billing::new(
            self.store.clone(),
            self.webhook_verifier.clone(),
            self.config.payments.products.clone(),
        )
    }
}

/// Get the ttsctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect to PostgreSQL and bring the schema up to date
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    info!("Using external database");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(config.database.acquire_timeout)
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;
    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    let mut any_origin = false;
    for origin in &config.cors.allowed_origins {
        match origin {
            CorsOrigin::Wildcard => any_origin = true,
            CorsOrigin::Url(url) => origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?),
        }
    }
    // A literal "*" is not accepted inside an origin list
    let allow_origin = if any_origin { AllowOrigin::any() } else { AllowOrigin::list(origins) };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Mount point for locally stored artifacts, derived from the public base URL
fn local_artifact_mount(public_base_url: &url::Url) -> Option<String> {
    let path = public_base_url.path().trim_end_matches('/');
    (!path.is_empty()).then(|| path.to_string())
}

/// Build the main application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - Account API routes under `/api/v1` (speech, projects, voices, credits)
/// - The payment webhook receiver
/// - OpenAPI document and docs page
/// - File serving for the local artifact backend
/// - Optional Prometheus metrics
/// - CORS configuration
/// - Tracing middleware
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let upload_limit = (state.config.limits.max_voice_upload_bytes + MULTIPART_OVERHEAD_BYTES) as usize;

    let api_routes = Router::new()
        .route("/speech", post(api::handlers::speech::create_speech))
        .route("/projects", get(api::handlers::projects::list_projects))
        .route("/projects/{project_id}", delete(api::handlers::projects::delete_project))
        .route(
            "/voices",
            get(api::handlers::voices::list_voices)
                .post(api::handlers::voices::upload_voice)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/credits/balance", get(api::handlers::credits::get_balance))
        .route("/credits/transactions", get(api::handlers::credits::list_transactions))
        .with_state(state.clone());

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        // Webhook routes (external services, not part of client API docs)
        .route("/webhooks/payments", post(api::handlers::payments::webhook))
        .with_state(state.clone())
        .nest("/api/v1", api_routes)
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    if let StorageBackend::Local { path, public_base_url } = &state.config.storage.backend
        && let Some(mount) = local_artifact_mount(public_base_url)
    {
        debug!(mount = %mount, root = %path.display(), "Serving local artifacts");
        router = router.nest_service(&mount, ServeDir::new(path));
    }

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = HTTP_METRICS.clone();

        // Combine the HTTP metrics with the service's own counters
        router = router
            .route(
                "/internal/metrics",
                get(|| async move {
                    let mut rendered = metric_handle.render();
                    rendered.push_str(&metrics::render_default_registry());
                    rendered
                }),
            )
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and runs the HTTP server.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects the datastore, runs migrations and builds the
///    artifact store, provider client and session providers
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, drains requests and closes the pool
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting ttsctl with configuration: {:#?}", config);

        let (store, pool): (Arc<dyn Datastore>, Option<PgPool>) = if config.database.in_memory {
            info!("Using in-memory datastore: all state is lost on shutdown");
            (Arc::new(InMemoryStore::new()), None)
        } else {
            let pool = setup_database(&config).await?;
            (Arc::new(PostgresStore::new(pool.clone())), Some(pool))
        };

        let blobs = blob::create_blob_store(&config.storage).await?;
        let inference = inference::create_inference_provider(&config.inference)?;
        let sessions = auth::session::create_session_provider(&config.auth)?;
        let webhook_verifier = billing::create_webhook_verifier(&config.payments)?;
        if webhook_verifier.is_none() {
            info!("No payment webhook secret configured; webhook deliveries will be rejected");
        }

        let state = AppState::builder()
            .config(config.clone())
            .store(store)
            .blobs(blobs)
            .inference(inference)
            .sessions(sessions)
            .maybe_webhook_verifier(webhook_verifier)
            .build();

        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "ttsctl listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::TestHarness;

    #[tokio::test]
    async fn test_healthz_and_openapi_are_public() {
        let harness = TestHarness::new().await;
        let server = harness.server();

        let response = server.get("/healthz").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "OK");

        let response = server.get("/api-docs/openapi.json").await;
        response.assert_status_ok();
        let doc: serde_json::Value = response.json();
        assert!(doc["paths"]["/speech"].is_object());
        assert!(doc["paths"].get("/webhooks/payments").is_none());

        server.get("/docs").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders_service_counters() {
        let mut harness = TestHarness::new().await;
        harness.state.config.enable_metrics = true;
        let server = harness.server();

        server.get("/healthz").await.assert_status_ok();

        let response = server.get("/internal/metrics").await;
        response.assert_status_ok();
        assert!(response.text().contains("axum_http_requests_total"));
    }

    #[tokio::test]
    async fn test_local_artifacts_are_served() {
        let harness = TestHarness::new().await;
        harness.state.blobs.put("voices/a/sample.wav", bytes::Bytes::from_static(b"RIFF"), "audio/wav").await.unwrap();

        let response = harness.server().get("/artifacts/voices/a/sample.wav").await;
        response.assert_status_ok();
        assert_eq!(response.as_bytes().as_ref(), b"RIFF");
    }

    #[test]
    fn test_local_artifact_mount() {
        let url = |s: &str| url::Url::parse(s).unwrap();
        assert_eq!(local_artifact_mount(&url("http://localhost:3001/artifacts/")).as_deref(), Some("/artifacts"));
        assert_eq!(local_artifact_mount(&url("https://cdn.example.com/a/b")).as_deref(), Some("/a/b"));
        assert_eq!(local_artifact_mount(&url("https://cdn.example.com/")), None);
    }

    #[test]
    fn test_cors_layer_accepts_configured_origins() {
        let mut config = Config::default();
        config.cors.allowed_origins = vec![CorsOrigin::Url(url::Url::parse("https://app.example.com").unwrap())];
        let _: Router = Router::new().layer(create_cors_layer(&config).unwrap());

        config.cors.allowed_origins.push(CorsOrigin::Wildcard);
        config.cors.allow_credentials = false;
        let _: Router = Router::new().layer(create_cors_layer(&config).unwrap());
    }

    #[tokio::test]
    async fn test_in_memory_application_builds() {
        let mut config = Config::default();
        config.database.in_memory = true;
        config.enable_metrics = false;
        config.auth.session.secret_key = Some("test-secret".to_string());
        let artifacts = tempfile::tempdir().unwrap();
        config.storage.backend = StorageBackend::Local {
            path: artifacts.path().to_path_buf(),
            public_base_url: url::Url::parse("http://localhost:3001/artifacts/").unwrap(),
        };

        let server = Application::new(config).await.unwrap().into_test_server();
        server.get("/healthz").await.assert_status_ok();
        server.get("/api/v1/credits/balance").await.assert_status_unauthorized();
    }
}
