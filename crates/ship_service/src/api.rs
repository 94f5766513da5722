//! HTTP API handlers and routes using axum.
//!
//! Routes:
//! - GET /                        - map page (index template)
//! - GET /static/*                - static assets
//! - GET /shipCount               - number of known ships
//! - GET /shipDump                - full state/info/history per ship
//! - GET /shipInfoWindow/{mmsi}   - merged state + voyage info
//! - GET /shipHistory/{mmsi}      - route history, newest first
//! - GET /ships/{sw}/{ne}         - ships inside a bounding box
//! - GET /searchFields            - (mmsi, name, position) search list
//! - GET /shipMeta                - static AIS enumerations
//!
//! Client-side failures (malformed MMSI, bad bbox, unknown ship, index not
//! ready) all map to 404.

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use common::geo::BoundingBox;
use serde::Serialize;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::cache::SpatialCache;
use crate::meta::ship_metadata;
use crate::store::Ships;

/// Application state shared across handlers.
pub struct AppState {
    pub ships: Arc<Ships>,
    pub cache: Arc<SpatialCache>,
    /// Index page, rendered once at startup.
    pub index_html: String,
    pub static_dir: PathBuf,
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();

    Router::new()
        .route("/", get(index_handler))
        .route("/shipCount", get(ship_count_handler))
        .route("/shipDump", get(ship_dump_handler))
        .route("/shipInfoWindow/{mmsi}", get(ship_info_window_handler))
        .route("/shipHistory/{mmsi}", get(ship_history_handler))
        .route("/ships/{sw}/{ne}", get(ships_bbox_handler))
        .route("/searchFields", get(search_fields_handler))
        .route("/shipMeta", get(ship_meta_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Render the index template with the map API key. A missing or broken
/// template is a startup failure, not a request-time one.
pub fn render_index(html_dir: &FsPath, maps_api_key: &str) -> anyhow::Result<String> {
    let path = html_dir.join("templates").join("index.html");
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("could not read index template {}", path.display()))?;

    let mut env = minijinja::Environment::new();
    env.add_template_owned("index".to_string(), source)
        .context("could not parse index template")?;

    let html = env
        .get_template("index")
        .context("index template missing")?
        .render(minijinja::context! { api_key => maps_api_key })
        .context("could not render index template")?;

    Ok(html)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.index_html.clone())
}

/// GET /shipCount
async fn ship_count_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.ships.count())
}

/// GET /shipDump
async fn ship_dump_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.ships.dump())
}

/// GET /shipInfoWindow/{mmsi}
async fn ship_info_window_handler(
    State(state): State<Arc<AppState>>,
    Path(mmsi): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mmsi = parse_mmsi(&mmsi)?;
    match state.ships.info_window(mmsi) {
        Some(window) => Ok(Json(window)),
        None => Err(ApiError::NotFound(format!("ship {} not found", mmsi))),
    }
}

/// GET /shipHistory/{mmsi}
async fn ship_history_handler(
    State(state): State<Arc<AppState>>,
    Path(mmsi): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mmsi = parse_mmsi(&mmsi)?;
    match state.ships.history(mmsi) {
        Some(history) => Ok(Json(history)),
        None => Err(ApiError::NotFound(format!("ship {} not found", mmsi))),
    }
}

/// GET /ships/{sw}/{ne}
async fn ships_bbox_handler(
    State(state): State<Arc<AppState>>,
    Path((sw, ne)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let sw = parse_latlon(&sw)?;
    let ne = parse_latlon(&ne)?;
    let bbox = BoundingBox::new(sw, ne);

    match state.ships.ships_in_box(&bbox, &state.cache.geo_index()) {
        Ok(ships) => Ok(Json(ships)),
        Err(e) => {
            info!("ships bbox query failed: {}", e);
            Err(ApiError::NotFound(e.to_string()))
        }
    }
}

/// GET /searchFields
async fn search_fields_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let fields = state.cache.search_list();
    Json(fields.as_ref().clone())
}

/// GET /shipMeta
async fn ship_meta_handler() -> impl IntoResponse {
    Json(ship_metadata())
}

fn parse_mmsi(raw: &str) -> Result<u32, ApiError> {
    raw.parse::<u32>()
        .map_err(|_| ApiError::NotFound(format!("invalid MMSI '{}'", raw)))
}

fn parse_latlon(raw: &str) -> Result<[f64; 2], ApiError> {
    let invalid = || ApiError::NotFound(format!("invalid coordinate pair '{}'", raw));

    let (lat, lng) = raw.split_once(',').ok_or_else(invalid)?;
    let lat = lat.trim().parse::<f64>().map_err(|_| invalid())?;
    let lng = lng.trim().parse::<f64>().map_err(|_| invalid())?;
    Ok([lat, lng])
}

// ============================================================================
// Error Handling
// ============================================================================

/// API error types.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse { error: message });

        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_latlon() {
        assert_eq!(parse_latlon("37.79,-122.41").unwrap(), [37.79, -122.41]);
        assert_eq!(parse_latlon(" 1.5 , 2.5 ").unwrap(), [1.5, 2.5]);
        assert!(parse_latlon("37.79").is_err());
        assert!(parse_latlon("a,b").is_err());
        assert!(parse_latlon("1,2,3").is_err());
    }

    #[test]
    fn test_parse_mmsi() {
        assert_eq!(parse_mmsi("366000001").unwrap(), 366000001);
        assert!(parse_mmsi("").is_err());
        assert!(parse_mmsi("-5").is_err());
        assert!(parse_mmsi("fish").is_err());
    }
}
