use crate::config::AppConfig;
use crate::error::RegistryError;
use crate::registry::Registry;
use crate::selection::{self, Selection, SelectionRequest};
use crate::types::{Bounds, LonLat};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

pub struct AppState {
    pub registry: Arc<Registry>,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct QueryResponse {
    name: String,
}

#[derive(Debug, Serialize)]
pub struct DistrictResponse {
    name: String,
    centroid: LonLat,
    bounds: Bounds,
    geometry: geojson::Geometry,
}

/// Registry errors as JSON `{"error": ...}` with a matching status code.
pub struct ApiError(RegistryError);

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
            RegistryError::DegenerateGeometry { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RegistryError::InvalidPoint { .. } => StatusCode::BAD_REQUEST,
            RegistryError::DataLoad { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/districts", get(list_handler))
        .route("/api/districts/:name", get(district_handler))
        .route("/api/geojson", get(geojson_handler))
        .route("/api/query", get(query_handler))
        .route("/api/select", post(select_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, registry: Arc<Registry>) -> Result<()> {
    let state = Arc::new(AppState { registry });

    let mut app = router(state);
    if let Some(static_dir) = &config.server.static_dir {
        info!("Serving dashboard assets from {:?}", static_dir);
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn list_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.registry.list_names())
}

async fn geojson_handler(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(state.registry.to_feature_collection())
}

async fn district_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<DistrictResponse>, ApiError> {
    let registry = &state.registry;
    let boundary = registry.boundary_of(&name)?;

    Ok(Json(DistrictResponse {
        centroid: registry.centroid_of(&name)?,
        bounds: registry.bounds_of(&name)?,
        geometry: geojson::Geometry::new(geojson::Value::from(boundary)),
        name,
    }))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Option<QueryResponse>>, ApiError> {
    let point = LonLat::new(params.lon, params.lat);
    let hit = state.registry.find_containing(point)?;

    match hit {
        Some(district) => debug!("({}, {}) -> {}", point.lon, point.lat, district.name),
        None => debug!("({}, {}) -> no district", point.lon, point.lat),
    }

    Ok(Json(hit.map(|d| QueryResponse {
        name: d.name.clone(),
    })))
}

async fn select_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<Option<Selection>>, ApiError> {
    let selection = selection::resolve(&state.registry, &request).inspect_err(|e| {
        warn!("Selection {:?} failed: {}", request, e);
    })?;
    Ok(Json(selection))
}
