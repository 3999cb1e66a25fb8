use axum::http::HeaderName;
use axum::routing::get;
use axum::{Extension, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;

use crate::config::Config;
use crate::controllers::{self, AppState};
use crate::extractors::json::MAX_BODY_BYTES;
use crate::response::ApiResponse;
use crate::seed::{self, SeedReport};
use crate::taxonomy::CANONICAL;

/// The Stockroom access-control service.
pub struct App {
    pub config: Config,
    pub db: DatabaseConnection,
}

impl App {
    /// Connect, migrate and (when configured) seed.
    pub async fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        if config.uses_dev_secret() && !config.is_dev() {
            tracing::warn!("JWT_SECRET is the built-in development value; set a real secret");
        }

        let db = crate::db::connect(&config).await?;
        crate::db::migrate(&db).await?;

        let app = App { config, db };
        if app.config.seed_on_start {
            app.seed().await?;
        }
        Ok(app)
    }

    /// Run the idempotent seeder against the canonical catalog.
    pub async fn seed(&self) -> Result<SeedReport, crate::error::StockroomError> {
        seed::run(&self.db, CANONICAL, &self.config.admin).await
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.db.clone(), self.config.clone())
    }

    pub fn router(&self) -> Router {
        build_router(self.state())
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.config.server_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Stockroom listening on http://{}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

/// Assemble every route with the shared layers.
///
/// The token codec travels as a request extension so the gate middleware and
/// the `Authenticated` extractor can reach it without the router state.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", controllers::auth::routes())
        .nest("/permissions", controllers::permissions::routes())
        .nest("/roles", controllers::roles::routes())
        .nest("/users", controllers::users::routes())
        .merge(controllers::probe::routes());

    let x_request_id = HeaderName::from_static("x-request-id");
    let codec = state.codec.clone();

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
        // Innermost layers applied first; each `Router::layer` normalizes the
        // response body so `CorsLayer` sees `axum::body::Body`.
        .layer(Extension(codec))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                        .on_response(
                            DefaultOnResponse::new()
                                .level(tracing::Level::INFO)
                                .latency_unit(LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(CorsLayer::permissive()),
        )
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> ApiResponse<Health> {
    ApiResponse::success(Health { status: "ok" })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down Stockroom server...");
}
