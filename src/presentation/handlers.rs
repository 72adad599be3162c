// HTTP request handlers
use crate::application::dataset_loader::LoadError;
use crate::application::stream_engine::{StreamError, StreamPhase};
use crate::domain::weather::DataPoint;
use crate::domain::window::{UnknownWindow, WindowSelection};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct RangeQuery {
    pub range: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StreamStatus {
    pub phase: StreamPhase,
    pub active: bool,
    pub processed: usize,
    pub total: usize,
    pub history: usize,
    pub step_interval_ms: u64,
}

/// Error body returned by the stream endpoints.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<StreamError> for ApiError {
    fn from(error: StreamError) -> Self {
        let status = match &error {
            StreamError::Load(LoadError::Fetch { .. }) => StatusCode::BAD_GATEWAY,
            StreamError::Load(LoadError::Validation { .. }) | StreamError::InvalidDataset(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            StreamError::Cancelled => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

fn parse_range(state: &AppState, range: Option<&str>) -> Result<WindowSelection, ApiError> {
    match range {
        None => Ok(state.dashboard.default_range()),
        Some(raw) => raw
            .parse()
            .map_err(|e: UnknownWindow| ApiError::bad_request(e.to_string())),
    }
}

fn status_of(state: &AppState) -> StreamStatus {
    let engine = &state.engine;
    StreamStatus {
        phase: engine.phase(),
        active: engine.is_active(),
        processed: engine.processed_count(),
        total: engine.total_points(),
        history: engine.history().borrow().len(),
        step_interval_ms: engine.settings().step_interval_ms,
    }
}

/// Wraps a stream of serializable items as named SSE events.
fn sse_json<S, T>(
    name: &'static str,
    items: S,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let mut items = Box::pin(items);
    let events = async_stream::stream! {
        while let Some(item) = items.next().await {
            match Event::default().event(name).json_data(&item) {
                Ok(event) => yield Ok::<Event, Infallible>(event),
                Err(e) => tracing::warn!(error = %e, event = name, "failed to encode event"),
            }
        }
    };
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn stream_status(State(state): State<Arc<AppState>>) -> Json<StreamStatus> {
    Json(status_of(&state))
}

/// Loads the configured dataset and starts playback.
/// Clients cannot pick the location; it comes from configuration only.
pub async fn start_stream(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StreamStatus>, ApiError> {
    state.engine.start(&state.dataset.location).await?;
    Ok(Json(status_of(&state)))
}

pub async fn stop_stream(State(state): State<Arc<AppState>>) -> Json<StreamStatus> {
    state.engine.stop();
    Json(status_of(&state))
}

pub async fn reset_stream(State(state): State<Arc<AppState>>) -> Json<StreamStatus> {
    state.engine.reset();
    state.dashboard.reset_trends();
    Json(status_of(&state))
}

pub async fn current_reading(State(state): State<Arc<AppState>>) -> Response {
    let reading = state.dashboard.readings().borrow().clone();
    match reading {
        Some(reading) => Json(reading).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn history(State(state): State<Arc<AppState>>) -> Json<Vec<DataPoint>> {
    let snapshot = state.engine.history().borrow().clone();
    Json(snapshot.to_vec())
}

pub async fn window_stats(
    Query(query): Query<RangeQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let selection = parse_range(&state, query.range.as_deref())?;
    Ok(Json(state.dashboard.window_report(selection)))
}

/// Live readings as server-sent events
pub async fn live_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sse_json("reading", state.dashboard.live_readings())
}

/// Window reports recomputed on every history snapshot
pub async fn stats_events(
    Query(query): Query<RangeQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let selection = parse_range(&state, query.range.as_deref())?;
    Ok(sse_json("stats", state.dashboard.reports(selection)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_service::DashboardService;
    use crate::application::dataset_loader::DatasetLoader;
    use crate::application::document_source::DocumentSource;
    use crate::application::stream_engine::StreamEngine;
    use crate::application::unit_converter::UnitConverter;
    use crate::domain::weather::RawDocument;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::config::{
        ConversionSettings, DatasetSettings, StatisticsSettings, StreamSettings,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSource {
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentSource for RecordingSource {
        async fn fetch(&self, location: &str) -> anyhow::Result<RawDocument> {
            self.fetched.lock().push(location.to_string());
            anyhow::bail!("offline")
        }
    }

    fn app_state(source: Arc<RecordingSource>, location: &str) -> Arc<AppState> {
        let loader = DatasetLoader::new(UnitConverter::new(ConversionSettings::default()), source);
        let engine = Arc::new(StreamEngine::new(
            loader,
            Arc::new(FixedClock::at_millis(0)),
            StreamSettings::default(),
        ));
        let dashboard = DashboardService::new(engine.clone(), &StatisticsSettings::default(), 5);
        Arc::new(AppState {
            engine,
            dashboard,
            dataset: DatasetSettings {
                location: location.to_string(),
                autostart: false,
            },
        })
    }

    #[tokio::test]
    async fn test_start_only_loads_configured_location() {
        let source = Arc::new(RecordingSource::default());
        let state = app_state(source.clone(), "/srv/weather/day.yml");

        let error = start_stream(State(state.clone())).await.unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        assert_eq!(*source.fetched.lock(), vec!["/srv/weather/day.yml".to_string()]);
        assert_eq!(state.engine.phase(), StreamPhase::Idle);
    }

    #[test]
    fn test_stream_errors_map_to_status() {
        let fetch = StreamError::Load(LoadError::Fetch {
            location: "http://example.org/data.yml".to_string(),
            cause: anyhow::anyhow!("connection refused"),
        });
        assert_eq!(ApiError::from(fetch).status, StatusCode::BAD_GATEWAY);

        let invalid = StreamError::InvalidDataset(0);
        assert_eq!(ApiError::from(invalid).status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::from(StreamError::Cancelled).status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_error_message_is_kept() {
        let error = ApiError::from(StreamError::InvalidDataset(3));
        assert_eq!(error.message, "dataset failed validation (3 points)");
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
