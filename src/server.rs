use crate::config::AppConfig;
use crate::data::Dataset;
use crate::error::DemoError;
use crate::export::{csv_bytes, CSV_FILE_NAME};
use crate::join::join_points;
use crate::scene::{render_scene, RenderOutcome, RenderRequest, Scene};
use crate::selection::select_region;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const INDEX_HTML: &str = include_str!("../static/index.html");

pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub config: AppConfig,
}

#[derive(Deserialize)]
pub struct SceneParams {
    region: Option<String>,
    buffer_km: Option<u32>,
    show_all: Option<bool>,
    show_outside: Option<bool>,
}

#[derive(Deserialize)]
pub struct CsvParams {
    region: Option<String>,
}

#[derive(Serialize)]
pub struct BufferControl {
    min: u32,
    max: u32,
    step: u32,
    default: u32,
}

#[derive(Serialize)]
pub struct ControlsResponse {
    regions: Vec<String>,
    default_region: Option<String>,
    buffer_km: BufferControl,
    show_all_regions: bool,
    show_points_outside: bool,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Errors surfaced to HTTP clients.
pub enum ApiError {
    NoSuchRegion(String),
    NoRegions,
    Demo(DemoError),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NoSuchRegion(name) => (StatusCode::NOT_FOUND, format!("no such region: {}", name)),
            ApiError::NoRegions => (StatusCode::NOT_FOUND, "dataset has no regions".to_string()),
            ApiError::Demo(e @ DemoError::InvalidBuffer { .. }) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Demo(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Internal(e) => {
                warn!("request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/controls", get(controls_handler))
        .route("/api/scene", get(scene_handler))
        .route("/api/joined.csv", get(csv_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Arc<Dataset>) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState { dataset, config });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

impl AppState {
    fn resolve_region(&self, requested: Option<String>) -> Result<String, ApiError> {
        match requested {
            Some(name) => Ok(name),
            None => self
                .dataset
                .default_region(&self.config.controls.default_region)
                .ok_or(ApiError::NoRegions),
        }
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn controls_handler(State(state): State<Arc<AppState>>) -> Json<ControlsResponse> {
    let controls = &state.config.controls;
    Json(ControlsResponse {
        regions: state.dataset.region_names(),
        default_region: state.dataset.default_region(&controls.default_region),
        buffer_km: BufferControl {
            min: controls.buffer_min_km,
            max: controls.buffer_max_km,
            step: controls.buffer_step_km,
            default: controls.buffer_km,
        },
        show_all_regions: controls.show_all_regions,
        show_points_outside: controls.show_points_outside,
    })
}

async fn scene_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SceneParams>,
) -> Result<Json<Scene>, ApiError> {
    let controls = &state.config.controls;
    let region = state.resolve_region(params.region)?;

    let mut request = RenderRequest::with_defaults(region, controls);
    if let Some(km) = params.buffer_km {
        request.buffer_km = km;
    }
    if let Some(show) = params.show_all {
        request.show_all_regions = show;
    }
    if let Some(show) = params.show_outside {
        request.show_points_outside = show;
    }

    // geometry work and the rayon join stay off the async workers
    let worker = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        render_scene(&worker.dataset, &worker.config.controls, &request)
    })
    .await
    .map_err(|e| ApiError::Internal(e.into()))?
    .map_err(ApiError::Demo)?;

    match outcome {
        RenderOutcome::Rendered(scene) => Ok(Json(scene)),
        RenderOutcome::NoSuchRegion { name } => Err(ApiError::NoSuchRegion(name)),
    }
}

// The join ignores the buffer, so the CSV only depends on the region.
async fn csv_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CsvParams>,
) -> Result<Response, ApiError> {
    let region = state.resolve_region(params.region)?;

    let worker = state.clone();
    let body = tokio::task::spawn_blocking(move || {
        let selection = select_region(&worker.dataset.regions, &region)
            .ok_or_else(|| ApiError::NoSuchRegion(region.clone()))?;
        let rows = join_points(&worker.dataset.points, &selection);
        csv_bytes(&rows).map_err(ApiError::Internal)
    })
    .await
    .map_err(|e| ApiError::Internal(e.into()))??;

    let disposition = format!("attachment; filename=\"{}\"", CSV_FILE_NAME);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
