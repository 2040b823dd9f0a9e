//! HTTP API exposing the detection pipeline and the aggregation engine.
//!
//! Routes:
//!   GET    /api/health                 → health check
//!   GET    /api/locations              → monitoring-location registry
//!   POST   /api/detect/{image_name}    → analyse an uploaded image
//!   GET    /api/history                → raw event log
//!   DELETE /api/history                → clear the log
//!   GET    /api/summary/metrics        → dashboard headline numbers
//!   GET    /api/summary/species        → species summary
//!   GET    /api/summary/distribution   → species distribution (chart feed)
//!   GET    /api/summary/locations      → location summary
//!   GET    /api/summary/timeline       → daily timeline
//!   GET    /api/reports/{kind}         → summary report as CSV
//!   POST   /api/export                 → raw history export (csv/json)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use biowatch_common::config::Config;
use biowatch_common::event::DetectionEvent;
use biowatch_common::locations::Registry;
use biowatch_common::protocol::{ClearResponse, DetectResponse, ExportResponse, HealthResponse};
use biowatch_common::TIMESTAMP_FORMAT;
use biowatch_detector::{annotate, ingest, Detector};
use biowatch_engine::export::{self, ExportFormat};
use biowatch_engine::{aggregate, HistoryStore};

/// Shared state for route handlers.
#[derive(Clone)]
struct AppState {
    config: Config,
    store: HistoryStore,
    registry: Arc<Registry>,
    detector: Arc<Mutex<Box<dyn Detector>>>,
    start_time: Instant,
}

/// Start the HTTP server. Blocks until shutdown.
pub async fn run(
    config: Config,
    store: HistoryStore,
    registry: Registry,
    detector: Box<dyn Detector>,
    shutdown: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listen_addr = config.listen_addr.clone();
    let state = AppState {
        config,
        store,
        registry: Arc::new(registry),
        detector: Arc::new(Mutex::new(detector)),
        start_time: Instant::now(),
    };

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/locations", get(locations))
        .route("/api/detect/{image_name}", post(detect))
        .route("/api/history", get(history))
        .route("/api/history", delete(clear_history))
        .route("/api/summary/metrics", get(summary_metrics))
        .route("/api/summary/species", get(summary_species))
        .route("/api/summary/distribution", get(summary_distribution))
        .route("/api/summary/locations", get(summary_locations))
        .route("/api/summary/timeline", get(summary_timeline))
        .route("/api/reports/{kind}", get(report_csv))
        .route("/api/export", post(export_history))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("BioWatch API listening on {listen_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
            }
        })
        .await?;

    Ok(())
}

// ── route handlers ───────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn locations(State(state): State<AppState>) -> Json<Registry> {
    Json((*state.registry).clone())
}

#[derive(Debug, Deserialize)]
struct DetectQuery {
    location: Option<String>,
}

async fn detect(
    State(state): State<AppState>,
    Path(image_name): Path<String>,
    Query(query): Query<DetectQuery>,
    body: Bytes,
) -> Result<Json<DetectResponse>, StatusCode> {
    // Sanitise: prevent directory traversal in stored names
    if image_name.contains('/') || image_name.contains('\\') || image_name.contains("..") {
        return Err(StatusCode::BAD_REQUEST);
    }
    if body.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let location = match &query.location {
        Some(name) => Some(state.registry.get(name).ok_or(StatusCode::NOT_FOUND)?),
        None => None,
    };

    let (image, metadata) =
        ingest::load_image(&body, state.config.max_image_dim).map_err(|e| {
            warn!("Rejecting upload {image_name}: {e:#}");
            StatusCode::UNPROCESSABLE_ENTITY
        })?;

    let records = {
        let mut detector = state.detector.lock().await;
        detector.detect(&image)
    };

    let detection_id = uuid::Uuid::new_v4().to_string();
    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();

    // Annotation is best-effort; detection results survive without it.
    let annotated_path = match save_annotated(&state, &detection_id, &image, &records) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("Cannot write annotated image for {detection_id}: {e:#}");
            None
        }
    };

    let events: Vec<DetectionEvent> = records
        .iter()
        .map(|r| DetectionEvent::from_record(&detection_id, &timestamp, &image_name, location, r))
        .collect();

    // A failed write must surface: the user needs to know the run was lost.
    state.store.append(&events).map_err(|e| {
        tracing::error!("History append failed: {e:#}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    info!(
        "Detection {detection_id}: {} event(s) for {image_name}",
        events.len()
    );

    Ok(Json(DetectResponse {
        detection_id,
        timestamp,
        image_name,
        events,
        metadata,
        annotated_path,
    }))
}

fn save_annotated(
    state: &AppState,
    detection_id: &str,
    image: &image::RgbImage,
    records: &[biowatch_common::event::DetectionRecord],
) -> anyhow::Result<String> {
    std::fs::create_dir_all(&state.config.annotated_dir)?;
    let path = state.config.annotated_dir.join(format!("{detection_id}.png"));
    annotate::annotate(image, records).save(&path)?;
    Ok(path.to_string_lossy().to_string())
}

async fn history(State(state): State<AppState>) -> Json<Vec<DetectionEvent>> {
    Json(state.store.load())
}

async fn clear_history(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse {
        cleared: state.store.clear(),
    })
}

// ── summaries ────────────────────────────────────────────────────────────

async fn summary_metrics(State(state): State<AppState>) -> Json<aggregate::DashboardMetrics> {
    Json(aggregate::dashboard_metrics(&state.store.load()))
}

async fn summary_species(State(state): State<AppState>) -> Json<Vec<aggregate::SpeciesSummary>> {
    Json(aggregate::species_summary(&state.store.load()))
}

async fn summary_distribution(
    State(state): State<AppState>,
) -> Json<Vec<aggregate::SpeciesCount>> {
    Json(aggregate::species_distribution(&state.store.load()))
}

async fn summary_locations(
    State(state): State<AppState>,
) -> Json<Vec<aggregate::LocationSummary>> {
    Json(aggregate::location_summary(&state.store.load()))
}

async fn summary_timeline(State(state): State<AppState>) -> Json<Vec<aggregate::TimelineSummary>> {
    Json(aggregate::timeline_summary(&state.store.load()))
}

// ── reports ──────────────────────────────────────────────────────────────

async fn report_csv(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let log = state.store.load();
    let (filename, body) = match kind.as_str() {
        "species" => (
            "species_summary_report.csv",
            export::species_report_csv(&aggregate::species_summary(&log)),
        ),
        "locations" => (
            "location_analysis_report.csv",
            export::location_report_csv(&aggregate::location_summary(&log)),
        ),
        "timeline" => (
            "detection_timeline_report.csv",
            export::timeline_report_csv(&aggregate::timeline_summary(&log)),
        ),
        _ => return Err(StatusCode::NOT_FOUND),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    ))
}

// ── export ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ExportQuery {
    start: Option<String>,
    end: Option<String>,
    format: Option<String>,
}

async fn export_history(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<ExportResponse>, StatusCode> {
    let parse_date = |value: &Option<String>| -> Result<Option<NaiveDate>, StatusCode> {
        match value {
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| StatusCode::BAD_REQUEST),
            None => Ok(None),
        }
    };
    let start = parse_date(&query.start)?;
    let end = parse_date(&query.end)?;
    let format: ExportFormat = query
        .format
        .as_deref()
        .unwrap_or("csv")
        .parse()
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    match export::export_history(&state.store, &state.config.export_dir, start, end, format) {
        Ok(Some(path)) => Ok(Json(ExportResponse {
            path: path.to_string_lossy().to_string(),
        })),
        // Nothing in range: not an error, just nothing to download.
        Ok(None) => Err(StatusCode::NO_CONTENT),
        Err(e) => {
            tracing::error!("Export failed: {e:#}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
