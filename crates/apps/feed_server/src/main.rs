mod sample;
mod visible;

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracking::snapshot::{PositionRecord, Snapshot, SnapshotEnvelope, SnapshotError, TrackedObject};

use crate::sample::SampleConstellation;
use crate::visible::{ObserverLocation, VisibleParams, VisibleResponse, visible_from};

#[derive(Clone)]
struct AppState {
    feed: Arc<FeedConfig>,
    http: reqwest::Client,
    started: Instant,
}

#[derive(Clone, Debug)]
struct FeedConfig {
    /// Real position feed to relay. Sample data is served when unset or failing.
    upstream_url: Option<String>,
    sample: SampleConstellation,
}

#[derive(Debug)]
enum UpstreamError {
    Http(reqwest::Error),
    Snapshot(SnapshotError),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Http(err) => write!(f, "upstream request failed: {err}"),
            UpstreamError::Snapshot(err) => write!(f, "upstream payload rejected: {err}"),
        }
    }
}

impl std::error::Error for UpstreamError {}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr: SocketAddr = match env::var("FEED_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
        .parse()
    {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid FEED_ADDR: {err}");
            return ExitCode::FAILURE;
        }
    };

    let feed = FeedConfig {
        upstream_url: env::var("FEED_UPSTREAM_URL").ok().filter(|url| !url.trim().is_empty()),
        sample: SampleConstellation {
            count: env_var_usize("FEED_SAMPLE_COUNT", 10).clamp(1, 1_000),
            altitude_km: env_var_f64("FEED_SAMPLE_ALTITUDE_KM", 550.0).max(0.0),
            drift_period_secs: env_var_f64("FEED_SAMPLE_PERIOD_SECS", 5_760.0),
            ..SampleConstellation::default()
        },
    };

    let state = AppState {
        feed: Arc::new(feed),
        http: reqwest::Client::new(),
        started: Instant::now(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    let app = router(state.clone()).layer(cors).layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            return ExitCode::FAILURE;
        }
    };
    match &state.feed.upstream_url {
        Some(url) => info!("feed server listening on http://{addr} (upstream {url})"),
        None => info!("feed server listening on http://{addr} (sample data)"),
    }
    if let Err(err) = axum::serve(listener, app).await {
        error!("server error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/satellites", get(get_satellites))
        .route("/api/satellites/visible", get(get_visible))
        .with_state(state)
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

async fn get_satellites(State(state): State<AppState>) -> Json<SnapshotEnvelope> {
    Json(current_envelope(&state).await)
}

async fn get_visible(
    State(state): State<AppState>,
    query: Result<Query<VisibleParams>, QueryRejection>,
) -> Response {
    let resolved = match query {
        Ok(Query(params)) => params.resolve(),
        Err(err) => {
            warn!("rejected visible query: {err}");
            None
        }
    };
    let Some((observer, min_elevation)) = resolved else {
        return invalid_coordinates();
    };

    let envelope = current_envelope(&state).await;
    let objects: Vec<TrackedObject> = envelope.positions.iter().map(to_object).collect();
    let satellites = visible_from(observer, min_elevation, &objects);
    Json(VisibleResponse {
        observer_location: ObserverLocation {
            lat: observer.lat_deg,
            lon: observer.lon_deg,
        },
        min_elevation_degrees: min_elevation,
        visible_count: satellites.len(),
        satellites,
        timestamp: envelope.timestamp,
    })
    .into_response()
}

fn invalid_coordinates() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Invalid coordinates provided" })),
    )
        .into_response()
}

/// Upstream positions when available, otherwise the sample constellation.
async fn current_envelope(state: &AppState) -> SnapshotEnvelope {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let elapsed = state.started.elapsed().as_secs_f64();

    let Some(url) = &state.feed.upstream_url else {
        return state
            .feed
            .sample
            .envelope_at(elapsed, timestamp, "Sample data - no upstream feed configured");
    };

    match fetch_upstream(&state.http, url).await {
        Ok(snapshot) => {
            if !snapshot.skipped.is_empty() {
                warn!("upstream snapshot: {} records rejected", snapshot.skipped.len());
            }
            let positions: Vec<PositionRecord> = snapshot
                .objects
                .iter()
                .map(|object| PositionRecord::from_object(object, Some(timestamp.clone())))
                .collect();
            SnapshotEnvelope {
                satellite_count: snapshot
                    .meta
                    .as_ref()
                    .and_then(|m| m.satellite_count)
                    .map_or(snapshot.record_count(), |n| n as usize),
                positions_calculated: positions.len(),
                positions,
                data_source: "upstream".to_string(),
                tle_age_hours: snapshot
                    .meta
                    .as_ref()
                    .and_then(|m| m.tle_age_hours)
                    .unwrap_or(0.0),
                note: snapshot.meta.and_then(|m| m.note),
                timestamp,
            }
        }
        Err(err) => {
            warn!("{err}; serving sample data");
            state
                .feed
                .sample
                .envelope_at(elapsed, timestamp, "Sample data - upstream fetch failed")
        }
    }
}

async fn fetch_upstream(http: &reqwest::Client, url: &str) -> Result<Snapshot, UpstreamError> {
    let body = http
        .get(url)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(UpstreamError::Http)?
        .text()
        .await
        .map_err(UpstreamError::Http)?;
    Snapshot::parse_json(&body).map_err(UpstreamError::Snapshot)
}

fn to_object(record: &PositionRecord) -> TrackedObject {
    TrackedObject {
        id: record.norad_id.into(),
        name: record.name.clone(),
        lat: record.lat,
        lng: record.lng,
        altitude_km: record.altitude_km,
        velocity_kmh: record.velocity_kmh,
    }
}

fn env_var_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::{AppState, FeedConfig, get_satellites, get_visible};
    use crate::sample::SampleConstellation;
    use crate::visible::VisibleParams;
    use axum::body::to_bytes;
    use axum::extract::{Query, State};
    use axum::http::{StatusCode, Uri};
    use std::sync::Arc;
    use std::time::Instant;

    fn state(upstream_url: Option<&str>) -> AppState {
        AppState {
            feed: Arc::new(FeedConfig {
                upstream_url: upstream_url.map(str::to_string),
                sample: SampleConstellation::default(),
            }),
            http: reqwest::Client::new(),
            started: Instant::now(),
        }
    }

    #[tokio::test]
    async fn serves_sample_envelope_without_upstream() {
        let envelope = get_satellites(State(state(None))).await.0;
        assert_eq!(envelope.satellite_count, 10);
        assert_eq!(envelope.positions.len(), 10);
        assert_eq!(envelope.data_source, "sample_data");
    }

    #[tokio::test]
    async fn falls_back_to_sample_when_upstream_fails() {
        let envelope = get_satellites(State(state(Some("http://127.0.0.1:9/positions"))))
            .await
            .0;
        assert_eq!(envelope.data_source, "sample_data");
        assert_eq!(
            envelope.note.as_deref(),
            Some("Sample data - upstream fetch failed")
        );
    }

    #[tokio::test]
    async fn visible_rejects_invalid_coordinates() {
        let params = VisibleParams {
            lat: Some(120.0),
            ..VisibleParams::default()
        };
        let resp = get_visible(State(state(None)), Ok(Query(params))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = get_visible(State(state(None)), Ok(Query(VisibleParams::default()))).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn visible_reports_unparseable_query_as_json() {
        let uri: Uri = "/api/satellites/visible?lat=abc".parse().unwrap();
        let rejection = Query::<VisibleParams>::try_from_uri(&uri).unwrap_err();
        let resp = get_visible(State(state(None)), Err(rejection)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Invalid coordinates provided");
    }
}
