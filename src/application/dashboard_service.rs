// Dashboard service - Live readings with trend memory and window reports
use crate::application::stream_engine::StreamEngine;
use crate::application::window_statistics::{SeriesTrends, StatisticsEngine};
use crate::domain::statistics::WindowReport;
use crate::domain::weather::DataPoint;
use crate::domain::window::{Trend, UnknownWindow, WindowSelection};
use crate::infrastructure::config::StatisticsSettings;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveReading {
    pub point: DataPoint,
    pub temperature_trend: Trend,
    pub energy_trend: Trend,
    pub processed: usize,
}

#[derive(Clone)]
pub struct DashboardService {
    engine: Arc<StreamEngine>,
    statistics: StatisticsEngine,
    default_range: WindowSelection,
    trends: Arc<Mutex<SeriesTrends>>,
    readings_tx: Arc<watch::Sender<Option<LiveReading>>>,
}

impl DashboardService {
    pub fn new(
        engine: Arc<StreamEngine>,
        settings: &StatisticsSettings,
        sampling_interval_secs: u32,
    ) -> Self {
        let default_range = settings
            .default_range
            .parse()
            .unwrap_or_else(|e: UnknownWindow| {
                tracing::warn!(
                    error = %e,
                    fallback = %WindowSelection::default(),
                    "invalid default range"
                );
                WindowSelection::default()
            });
        let (readings_tx, _) = watch::channel(None);

        Self {
            engine,
            statistics: StatisticsEngine::new(sampling_interval_secs, settings.descriptive_window),
            default_range,
            trends: Arc::new(Mutex::new(SeriesTrends::default())),
            readings_tx: Arc::new(readings_tx),
        }
    }

    /// Feeds every point the engine publishes through the trend trackers and republishes it
    /// as a `LiveReading`. The task ends when the engine goes away.
    pub fn spawn_trend_tracking(&self) -> JoinHandle<()> {
        let mut current = self.engine.current_point();
        let weak_engine = Arc::downgrade(&self.engine);
        let trends = self.trends.clone();
        let readings_tx = self.readings_tx.clone();

        tokio::spawn(async move {
            // Whatever was published before subscribing is the first observation
            let mut pending = current.borrow_and_update().clone();
            loop {
                if let Some(point) = pending.take() {
                    let Some(engine) = weak_engine.upgrade() else {
                        break;
                    };
                    let (temperature_trend, energy_trend) = trends.lock().observe(&point);
                    tracing::debug!(
                        time = %point.time,
                        ?temperature_trend,
                        ?energy_trend,
                        "live reading"
                    );
                    readings_tx.send_replace(Some(LiveReading {
                        point,
                        temperature_trend,
                        energy_trend,
                        processed: engine.processed_count(),
                    }));
                }
                if current.changed().await.is_err() {
                    break;
                }
                pending = current.borrow_and_update().clone();
            }
            tracing::debug!("trend tracking finished");
        })
    }

    /// Latest reading on subscribe, then every new one.
    pub fn readings(&self) -> watch::Receiver<Option<LiveReading>> {
        self.readings_tx.subscribe()
    }

    pub fn live_readings(&self) -> BoxStream<'static, LiveReading> {
        WatchStream::new(self.readings())
            .filter_map(futures::future::ready)
            .boxed()
    }

    pub fn window_report(&self, selection: WindowSelection) -> WindowReport {
        let history = self.engine.history().borrow().clone();
        self.statistics.report(&history, selection)
    }

    /// A report for the current history, then one per new history snapshot.
    pub fn reports(&self, selection: WindowSelection) -> BoxStream<'static, WindowReport> {
        let statistics = self.statistics.clone();
        WatchStream::new(self.engine.history())
            .map(move |history| statistics.report(&history, selection))
            .boxed()
    }

    pub fn current_trends(&self) -> (Trend, Trend) {
        let trends = self.trends.lock();
        (trends.temperature.current(), trends.energy.current())
    }

    pub fn reset_trends(&self) {
        self.trends.lock().reset();
        tracing::debug!("trend memory cleared");
    }

    pub fn default_range(&self) -> WindowSelection {
        self.default_range
    }

    pub fn engine(&self) -> &Arc<StreamEngine> {
        &self.engine
    }
}
