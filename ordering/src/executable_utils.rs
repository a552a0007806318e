use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use common::config::{BackendConfig, Config};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{error::Error, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use crate::{
    error::OrderError,
    extractor::{FullOrder, OrdersExtractor},
    model::{ModelId, OrderCreateRequest, OrderPatch, OrderPatchRequest},
    storage::OrdersStorage,
    ui_model::{Filter, FilterItem},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "target/debug/config/total_config.yaml")]
    pub config: String,
}

pub fn initialize_executable() -> Result<Config, Box<dyn Error + Send + Sync>> {
    let args = Args::parse();
    println!("Loading config from: {}", args.config);
    let config = Config::load(&args.config)?;
    Ok(config)
}

/// `RUST_LOG` wins over the configured level when set.
pub fn initialize_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.common.database_url)
        .await
}

pub fn install_metrics_recorder() -> Result<PrometheusHandle, Box<dyn Error + Send + Sync>> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

#[derive(Clone)]
pub struct AppState {
    orders: Arc<dyn OrdersStorage>,
    extractor: Arc<OrdersExtractor>,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(orders: Arc<dyn OrdersStorage>, extractor: Arc<OrdersExtractor>) -> Self {
        Self {
            orders,
            extractor,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            OrderError::InvalidArgument(_)
            | OrderError::IncorrectOrderParameters(_)
            | OrderError::NoPlace(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            OrderError::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
            OrderError::AlreadyExists(_) => (StatusCode::CONFLICT, self.to_string()),
            OrderError::MalformedVisitTime(_) | OrderError::Database(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal Server Error. Error: {}", self),
                )
            }
        };
        (status, Json(ErrorMessage { message })).into_response()
    }
}

// Malformed or wrongly typed input is reported like any other invalid argument.
impl From<JsonRejection> for OrderError {
    fn from(rejection: JsonRejection) -> Self {
        OrderError::InvalidArgument(rejection.body_text())
    }
}

impl From<QueryRejection> for OrderError {
    fn from(rejection: QueryRejection) -> Self {
        OrderError::InvalidArgument(rejection.body_text())
    }
}

impl From<PathRejection> for OrderError {
    fn from(rejection: PathRejection) -> Self {
        OrderError::InvalidArgument(rejection.body_text())
    }
}

/// Query string of `GET /orders`; absent parameters do not filter.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub client: Option<ModelId>,
    pub status: Option<String>,
    pub cooks_status: Option<String>,
    pub waiters_status: Option<String>,
}

impl From<OrdersQuery> for Filter {
    fn from(query: OrdersQuery) -> Self {
        let mut filter = Filter::new();
        filter
            .add_filter_item(FilterItem::new("client", query.client))
            .add_filter_item(FilterItem::new("status", query.status))
            .add_filter_item(FilterItem::new("cooks_status", query.cooks_status))
            .add_filter_item(FilterItem::new("waiters_status", query.waiters_status));
        filter
    }
}

pub fn create_router(
    state: AppState,
    config: &BackendConfig,
) -> Result<Router, Box<dyn Error + Send + Sync>> {
    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new().allow_origin(origin.parse::<header::HeaderValue>()?),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let app = Router::new()
        .route("/orders", get(get_all_orders).post(create_order))
        .route("/orders/{id}", get(get_order_by_id).patch(patch_order))
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_millis(config.request_timeout_ms)))
        .with_state(state);

    Ok(app)
}

pub async fn run_backend(
    config: BackendConfig,
    state: AppState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = create_router(state, &config)?;

    tracing::info!("Starting backend service at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FullOrder>), OrderError> {
    let Json(request) = payload?;
    let info = request.validate()?;
    let order = state.orders.add(&info).await?;
    let full = state.extractor.get_full_order_info(order).await?;
    Ok((StatusCode::CREATED, Json(full)))
}

pub async fn get_all_orders(
    State(state): State<AppState>,
    query: Result<Query<OrdersQuery>, QueryRejection>,
) -> Result<Json<Vec<FullOrder>>, OrderError> {
    let Query(query) = query?;
    let filter = Filter::from(query);
    let orders = state.orders.get_all(&filter).await?;
    let full = state.extractor.get_full_orders(orders).await?;
    Ok(Json(full))
}

pub async fn get_order_by_id(
    State(state): State<AppState>,
    id: Result<Path<ModelId>, PathRejection>,
) -> Result<Json<FullOrder>, OrderError> {
    let Path(id) = id?;
    let order = state.orders.get_by_id(id).await?;
    Ok(Json(state.extractor.get_full_order_info(order).await?))
}

pub async fn patch_order(
    State(state): State<AppState>,
    id: Result<Path<ModelId>, PathRejection>,
    payload: Result<Json<OrderPatchRequest>, JsonRejection>,
) -> Result<Json<FullOrder>, OrderError> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let patch = OrderPatch::try_from(request)?;
    let order = state.orders.update(id, &patch).await?;
    Ok(Json(state.extractor.get_full_order_info(order).await?))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
