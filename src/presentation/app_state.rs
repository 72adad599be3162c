// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::stream_engine::StreamEngine;
use crate::infrastructure::config::DatasetSettings;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<StreamEngine>,
    pub dashboard: DashboardService,
    pub dataset: DatasetSettings,
}
