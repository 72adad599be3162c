// Stream engine - Replays a static dataset as a live feed on a fixed cadence
use crate::application::dataset_loader::{DatasetLoader, LoadError};
use crate::domain::time_of_day::SECONDS_PER_DAY;
use crate::domain::weather::DataPoint;
use crate::infrastructure::clock::Clock;
use crate::infrastructure::config::StreamSettings;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Immutable copy of the rolling history as published to subscribers.
pub type HistorySnapshot = Arc<[DataPoint]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamPhase {
    Idle,
    Loading,
    Streaming,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("dataset failed validation ({0} points)")]
    InvalidDataset(usize),
    #[error("start cancelled by a stop or reset while loading")]
    Cancelled,
}

/// Maps a wall-clock offset to a dataset index, clamped into `[0, len - 1]`.
/// `sample_interval_ms` is the spacing of the dataset's points, not the playback cadence.
pub fn start_index(millis_since_midnight: u64, sample_interval_ms: u64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let steps = (millis_since_midnight / sample_interval_ms.max(1)) as usize;
    if steps >= len {
        tracing::warn!(
            computed = steps,
            len,
            "start index beyond dataset end, clamping to last point"
        );
    }
    steps.min(len - 1)
}

/// One tick's output.
#[derive(Debug, Clone)]
pub struct Emission {
    pub point: DataPoint,
    pub history: HistorySnapshot,
    pub wrapped: bool,
}

/// Playback cursor and rolling history, with no timer attached.
#[derive(Debug)]
pub struct Playback {
    dataset: Vec<DataPoint>,
    current_index: usize,
    history: VecDeque<DataPoint>,
    history_preload: usize,
    max_history: usize,
}

impl Playback {
    pub fn new(history_preload: usize, max_history: usize) -> Self {
        Self {
            dataset: Vec::new(),
            current_index: 0,
            history: VecDeque::with_capacity(max_history),
            history_preload,
            max_history: max_history.max(1),
        }
    }

    /// Positions the cursor at `index`, seeds the history with the points before it and
    /// returns the point to show right away along with the seeded history.
    pub fn begin(
        &mut self,
        dataset: Vec<DataPoint>,
        index: usize,
    ) -> (Option<DataPoint>, HistorySnapshot) {
        self.dataset = dataset;
        self.current_index = index.min(self.dataset.len().saturating_sub(1));
        self.preload();
        (self.dataset.get(self.current_index).cloned(), self.snapshot())
    }

    /// Emits the point under the cursor and advances. Past the end the cursor wraps to 0,
    /// the history is re-seeded and point 0 is emitted in the same tick.
    pub fn tick(&mut self) -> Option<Emission> {
        if self.dataset.is_empty() {
            return None;
        }

        let wrapped = self.current_index >= self.dataset.len();
        if wrapped {
            self.current_index = 0;
            self.preload();
        }

        let point = self.dataset[self.current_index].clone();
        self.history.push_back(point.clone());
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
        self.current_index += 1;

        Some(Emission {
            point,
            history: self.snapshot(),
            wrapped,
        })
    }

    pub fn clear(&mut self) {
        self.dataset = Vec::new();
        self.history.clear();
        self.current_index = 0;
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        self.history.iter().cloned().collect()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    fn preload(&mut self) {
        let start = self.current_index.saturating_sub(self.history_preload);
        let end = self.current_index.min(self.dataset.len());
        self.history = self.dataset[start.min(end)..end].iter().cloned().collect();
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }
}

struct EngineState {
    phase: StreamPhase,
    playback: Playback,
    // Bumped on every start/stop/reset; a ticker only mutates state for its own epoch.
    epoch: u64,
    ticker: Option<JoinHandle<()>>,
}

struct Shared {
    state: Mutex<EngineState>,
    current_tx: watch::Sender<Option<DataPoint>>,
    history_tx: watch::Sender<HistorySnapshot>,
}

impl Shared {
    fn publish(&self, current: Option<DataPoint>, history: HistorySnapshot) {
        if current.is_some() {
            self.current_tx.send_replace(current);
        }
        self.history_tx.send_replace(history);
    }
}

/// Replays a dataset as if it were live.
///
/// All state sits behind a single mutex shared by the public methods and the ticker task,
/// and snapshots are published while that lock is held, so a `stop()` that has returned
/// is never followed by another emission. Subscribers receive the latest current point and
/// history snapshot immediately on subscribe (`watch` semantics).
pub struct StreamEngine {
    loader: DatasetLoader,
    clock: Arc<dyn Clock>,
    settings: StreamSettings,
    shared: Arc<Shared>,
}

impl StreamEngine {
    pub fn new(loader: DatasetLoader, clock: Arc<dyn Clock>, settings: StreamSettings) -> Self {
        let (current_tx, _) = watch::channel(None);
        let (history_tx, _) = watch::channel(HistorySnapshot::from(Vec::new()));
        let playback = Playback::new(settings.history_preload, settings.max_history);

        Self {
            loader,
            clock,
            settings,
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState {
                    phase: StreamPhase::Idle,
                    playback,
                    epoch: 0,
                    ticker: None,
                }),
                current_tx,
                history_tx,
            }),
        }
    }

    /// Loads the dataset at `location` and starts streaming it.
    /// A no-op while already loading or streaming.
    pub async fn start(&self, location: &str) -> Result<(), StreamError> {
        let epoch = {
            let mut state = self.shared.state.lock();
            if matches!(state.phase, StreamPhase::Loading | StreamPhase::Streaming) {
                tracing::debug!(phase = ?state.phase, "start ignored, engine busy");
                return Ok(());
            }
            state.phase = StreamPhase::Loading;
            state.epoch += 1;
            state.epoch
        };

        let loaded = self.loader.load(location).await;

        let mut state = self.shared.state.lock();
        if state.epoch != epoch || state.phase != StreamPhase::Loading {
            tracing::info!(location, "dataset loaded after stop/reset, discarding");
            return Err(StreamError::Cancelled);
        }
        match loaded {
            Ok(dataset) => {
                self.begin(&mut state, dataset);
                Ok(())
            }
            Err(e) => {
                tracing::error!(location, error = %e, "failed to start streaming");
                state.phase = StreamPhase::Idle;
                Err(e.into())
            }
        }
    }

    /// Starts streaming an already loaded dataset. Must be called within a tokio runtime.
    pub fn start_with_dataset(&self, dataset: Vec<DataPoint>) -> Result<(), StreamError> {
        if !DatasetLoader::validate(&dataset) {
            return Err(StreamError::InvalidDataset(dataset.len()));
        }

        let mut state = self.shared.state.lock();
        if matches!(state.phase, StreamPhase::Loading | StreamPhase::Streaming) {
            tracing::debug!(phase = ?state.phase, "start ignored, engine busy");
            return Ok(());
        }
        self.begin(&mut state, dataset);
        Ok(())
    }

    fn begin(&self, state: &mut EngineState, dataset: Vec<DataPoint>) {
        let step_ms = self.settings.step_interval_ms.max(1);
        let sample_ms = ((self.loader.converter().sampling_interval_secs() * 1000.0) as u64).max(1);
        let expected = (SECONDS_PER_DAY as u64 * 1000 / sample_ms) as usize;
        if dataset.len() < expected {
            tracing::warn!(
                points = dataset.len(),
                expected,
                "dataset covers less than a full day"
            );
        }

        let index = start_index(self.clock.millis_since_midnight(), sample_ms, dataset.len());
        let (current, history) = state.playback.begin(dataset, index);
        let preloaded = history.len();
        self.shared.publish(current, history);

        state.phase = StreamPhase::Streaming;
        state.epoch += 1;
        state.ticker = Some(spawn_ticker(
            self.shared.clone(),
            state.epoch,
            Duration::from_millis(step_ms),
        ));

        tracing::info!(
            index,
            total = state.playback.len(),
            step_ms,
            preloaded,
            "streaming started"
        );
    }

    /// Cancels the ticker. Safe from any state.
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        if Self::halt(&mut state) {
            state.phase = StreamPhase::Stopped;
            tracing::info!(processed = state.playback.current_index(), "streaming stopped");
        }
    }

    /// Stops, then drops the dataset, cursor and history.
    pub fn reset(&self) {
        let mut state = self.shared.state.lock();
        Self::halt(&mut state);
        state.phase = StreamPhase::Idle;
        state.playback.clear();
        self.shared.history_tx.send_replace(state.playback.snapshot());
        tracing::info!("stream reset");
    }

    // Returns whether something was running.
    fn halt(state: &mut EngineState) -> bool {
        let running = matches!(state.phase, StreamPhase::Loading | StreamPhase::Streaming);
        state.epoch += 1;
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        running
    }

    pub fn current_point(&self) -> watch::Receiver<Option<DataPoint>> {
        self.shared.current_tx.subscribe()
    }

    pub fn history(&self) -> watch::Receiver<HistorySnapshot> {
        self.shared.history_tx.subscribe()
    }

    pub fn processed_count(&self) -> usize {
        self.shared.state.lock().playback.current_index()
    }

    pub fn is_active(&self) -> bool {
        self.shared.state.lock().phase == StreamPhase::Streaming
    }

    pub fn total_points(&self) -> usize {
        self.shared.state.lock().playback.len()
    }

    pub fn phase(&self) -> StreamPhase {
        self.shared.state.lock().phase
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }
}

impl Drop for StreamEngine {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        Self::halt(&mut state);
    }
}

fn spawn_ticker(shared: Arc<Shared>, epoch: u64, period: Duration) -> JoinHandle<()> {
    // First tick one full period after start; t=0 was published by begin()
    let first = Instant::now() + period;
    tokio::spawn(async move {
        let mut ticker = interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let mut state = shared.state.lock();
            if state.epoch != epoch || state.phase != StreamPhase::Streaming {
                break;
            }
            if let Some(emission) = state.playback.tick() {
                if emission.wrapped {
                    tracing::info!(total = state.playback.len(), "dataset wrapped to start");
                }
                shared.publish(Some(emission.point), emission.history);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::document_source::DocumentSource;
    use crate::application::unit_converter::UnitConverter;
    use crate::domain::time_of_day::format_hms;
    use crate::domain::weather::{RawDocument, RawSample, RawSeries};
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::config::ConversionSettings;
    use async_trait::async_trait;
    use tokio::time::timeout;

    struct StaticSource(RawDocument);

    #[async_trait]
    impl DocumentSource for StaticSource {
        async fn fetch(&self, _location: &str) -> anyhow::Result<RawDocument> {
            Ok(self.0.clone())
        }
    }

    fn dataset(len: usize) -> Vec<DataPoint> {
        (0..len)
            .map(|i| DataPoint::new(format_hms(i as u32 * 5), 10.0 + i as f64 * 0.01, i as f64))
            .collect()
    }

    fn raw_document(len: usize) -> RawDocument {
        let temperature = (0..len)
            .map(|i| RawSample::new(format_hms(i as u32 * 5), 2931.5))
            .collect();
        let power = (0..len)
            .map(|i| RawSample::new(format_hms(i as u32 * 5), 1.0))
            .collect();
        RawDocument::new(
            RawSeries::new(Some("dK"), temperature),
            RawSeries::new(Some("MW"), power),
        )
    }

    fn engine(clock: FixedClock, document: RawDocument) -> StreamEngine {
        engine_with(clock, document, StreamSettings::default())
    }

    fn engine_with(
        clock: FixedClock,
        document: RawDocument,
        settings: StreamSettings,
    ) -> StreamEngine {
        let loader = DatasetLoader::new(
            UnitConverter::new(ConversionSettings::default()),
            Arc::new(StaticSource(document)),
        );
        StreamEngine::new(loader, Arc::new(clock), settings)
    }

    #[test]
    fn test_start_index_clamps() {
        assert_eq!(start_index(0, 5000, 100), 0);
        assert_eq!(start_index(12_345, 5000, 100), 2);
        assert_eq!(start_index(86_399_999, 5000, 17_280), 17_279);
        assert_eq!(start_index(86_399_999, 5000, 100), 99);
        assert_eq!(start_index(3_600_000, 5000, 1), 0);
        for millis in (0..86_400_000u64).step_by(3_333_333) {
            for len in [1usize, 7, 500, 17_280] {
                let index = start_index(millis, 5000, len);
                assert!(index <= len - 1);
            }
        }
    }

    #[test]
    fn test_begin_seeds_history() {
        let data = dataset(300);
        let mut playback = Playback::new(60, 200);
        let (current, history) = playback.begin(data.clone(), 120);

        assert_eq!(current, Some(data[120].clone()));
        assert_eq!(history.len(), 60);
        assert_eq!(history[0], data[60]);
        assert_eq!(history[59], data[119]);

        let (_, history) = Playback::new(60, 200).begin(data.clone(), 10);
        assert_eq!(&history[..], &data[..10]);
    }

    #[test]
    fn test_history_is_last_emitted_points() {
        let data = dataset(500);
        let mut playback = Playback::new(60, 200);
        playback.begin(data.clone(), 0);

        let mut emitted = Vec::new();
        for ticks in 1..=450 {
            let emission = playback.tick().unwrap();
            emitted.push(emission.point.clone());
            assert!(emission.history.len() <= 200);
            let expected = ticks.min(200);
            assert_eq!(emission.history.len(), expected);
            assert_eq!(&emission.history[..], &emitted[emitted.len() - expected..]);
        }
    }

    #[test]
    fn test_wraps_once_per_pass() {
        let data = dataset(250);
        let mut playback = Playback::new(60, 200);
        playback.begin(data.clone(), 180);

        let mut wraps = 0;
        for _ in 0..data.len() {
            let emission = playback.tick().unwrap();
            assert!(playback.current_index() <= data.len());
            if emission.wrapped {
                wraps += 1;
                assert_eq!(emission.point, data[0]);
                assert!(emission.history.len() <= 60);
                assert_eq!(emission.history.len(), 1);
                assert_eq!(playback.current_index(), 1);
            }
        }
        assert_eq!(wraps, 1);
        assert_eq!(playback.current_index(), 180);
    }

    #[test]
    fn test_index_non_decreasing_until_wrap() {
        let mut playback = Playback::new(60, 200);
        playback.begin(dataset(20), 5);
        let mut last = playback.current_index();
        for _ in 0..15 {
            playback.tick();
            assert!(playback.current_index() > last);
            last = playback.current_index();
        }
        assert_eq!(last, 20);
        playback.tick();
        assert_eq!(playback.current_index(), 1);
    }

    #[test]
    fn test_empty_playback_never_emits() {
        let mut playback = Playback::new(60, 200);
        assert!(playback.tick().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_publishes_immediately() {
        let data = dataset(300);
        let engine = engine(FixedClock::at_hms(0, 10, 0), RawDocument::default());
        engine.start_with_dataset(data.clone()).unwrap();

        assert_eq!(*engine.current_point().borrow(), Some(data[120].clone()));
        assert_eq!(engine.history().borrow().len(), 60);
        assert_eq!(engine.processed_count(), 120);
        assert_eq!(engine.total_points(), 300);
        assert!(engine.is_active());
        assert_eq!(engine.phase(), StreamPhase::Streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_full_interval() {
        let data = dataset(300);
        let engine = engine(FixedClock::at_hms(0, 10, 0), RawDocument::default());
        engine.start_with_dataset(data.clone()).unwrap();

        let mut current = engine.current_point();
        assert!(timeout(Duration::from_millis(4_999), current.changed()).await.is_err());

        current.changed().await.unwrap();
        assert_eq!(*current.borrow_and_update(), Some(data[120].clone()));
        assert_eq!(engine.processed_count(), 121);
        assert_eq!(engine.history().borrow().len(), 61);

        current.changed().await.unwrap();
        assert_eq!(*current.borrow_and_update(), Some(data[121].clone()));
        assert_eq!(engine.processed_count(), 122);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_index_follows_sampling_interval_not_cadence() {
        let data = dataset(17_280);
        let settings = StreamSettings {
            step_interval_ms: 1000,
            ..StreamSettings::default()
        };
        let engine = engine_with(FixedClock::at_hms(12, 0, 0), RawDocument::default(), settings);
        engine.start_with_dataset(data.clone()).unwrap();

        let current = engine.current_point().borrow().clone().unwrap();
        assert_eq!(current.time, "12:00:00");
        assert_eq!(engine.processed_count(), 8640);

        // playback still advances on the configured cadence
        let mut updates = engine.current_point();
        assert!(timeout(Duration::from_millis(999), updates.changed()).await.is_err());
        timeout(Duration::from_millis(500), updates.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(engine.processed_count(), 8641);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clamps_short_dataset() {
        let engine = engine(FixedClock::at_hms(23, 0, 0), RawDocument::default());
        engine.start_with_dataset(dataset(10)).unwrap();
        assert_eq!(engine.processed_count(), 9);

        let mut history = engine.history();
        history.changed().await.unwrap();
        assert_eq!(engine.processed_count(), 10);
        history.changed().await.unwrap();
        // wrapped: point 0 emitted, cursor at 1
        assert_eq!(engine.processed_count(), 1);
        assert_eq!(history.borrow().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_emission() {
        let engine = engine(FixedClock::at_hms(0, 0, 0), RawDocument::default());
        engine.start_with_dataset(dataset(50)).unwrap();
        let mut current = engine.current_point();

        engine.stop();
        engine.stop();
        assert!(!engine.is_active());
        assert_eq!(engine.phase(), StreamPhase::Stopped);
        assert!(timeout(Duration::from_secs(60), current.changed()).await.is_err());
        assert_eq!(engine.processed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_noop() {
        let engine = engine(FixedClock::at_hms(0, 0, 0), RawDocument::default());
        engine.start_with_dataset(dataset(50)).unwrap();
        engine.start_with_dataset(dataset(80)).unwrap();
        engine.start("ignored").await.unwrap();
        assert_eq!(engine.total_points(), 50);

        let mut current = engine.current_point();
        current.changed().await.unwrap();
        // a second timer would have advanced the cursor twice
        assert!(timeout(Duration::from_millis(4_000), current.changed()).await.is_err());
        assert_eq!(engine.processed_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_state() {
        let engine = engine(FixedClock::at_hms(0, 20, 0), RawDocument::default());
        engine.start_with_dataset(dataset(400)).unwrap();
        engine.reset();

        assert_eq!(engine.phase(), StreamPhase::Idle);
        assert_eq!(engine.total_points(), 0);
        assert_eq!(engine.processed_count(), 0);
        assert!(engine.history().borrow().is_empty());

        engine.start_with_dataset(dataset(400)).unwrap();
        assert_eq!(engine.processed_count(), 240);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_subscriber_gets_latest() {
        let data = dataset(50);
        let engine = engine(FixedClock::at_hms(0, 0, 25), RawDocument::default());
        engine.start_with_dataset(data.clone()).unwrap();

        let late = engine.current_point();
        assert_eq!(*late.borrow(), Some(data[5].clone()));
        assert_eq!(engine.history().borrow().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_loads_through_loader() {
        let engine = engine(FixedClock::at_hms(0, 0, 10), raw_document(30));
        engine.start("memory").await.unwrap();

        assert!(engine.is_active());
        assert_eq!(engine.total_points(), 30);
        assert_eq!(engine.processed_count(), 2);
        let current = engine.current_point().borrow().clone().unwrap();
        assert_eq!(current.time, "00:00:10");
        assert!((current.temperature - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_start_rejects_bad_document() {
        let engine = engine(FixedClock::at_hms(0, 0, 0), RawDocument::default());
        let err = engine.start("memory").await.unwrap_err();
        assert!(matches!(err, StreamError::Load(LoadError::Validation { .. })));
        assert_eq!(engine.phase(), StreamPhase::Idle);
        assert!(!engine.is_active());
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_dataset() {
        let engine = engine(FixedClock::at_hms(0, 0, 0), RawDocument::default());
        let err = engine.start_with_dataset(Vec::new()).unwrap_err();
        assert!(matches!(err, StreamError::InvalidDataset(0)));
        assert_eq!(engine.phase(), StreamPhase::Idle);
    }
}
