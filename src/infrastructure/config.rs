use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub dataset: DatasetSettings,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub conversion: ConversionSettings,
    #[serde(default)]
    pub statistics: StatisticsSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetSettings {
    /// File path, http(s) URL, or `synthetic:` for a generated day.
    #[serde(default = "default_location")]
    pub location: String,
    /// Whether to start streaming as soon as the service is up.
    #[serde(default = "default_true")]
    pub autostart: bool,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            location: default_location(),
            autostart: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StreamSettings {
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,
    #[serde(default = "default_history_preload")]
    pub history_preload: usize,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            step_interval_ms: default_step_interval_ms(),
            history_preload: default_history_preload(),
            max_history: default_max_history(),
        }
    }
}

/// What the loader does with readings that cannot be converted
/// (non-finite, negative power, missing power sample).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidReadingPolicy {
    /// Substitute 0 and log a warning.
    #[default]
    ZeroFill,
    /// Substitute 0, log a warning and mark the point as substituted.
    Flag,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ConversionSettings {
    #[serde(default = "default_sampling_interval_secs")]
    pub sampling_interval_secs: u32,
    #[serde(default = "default_kelvin_threshold")]
    pub kelvin_threshold: f64,
    #[serde(default)]
    pub invalid_readings: InvalidReadingPolicy,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            sampling_interval_secs: default_sampling_interval_secs(),
            kelvin_threshold: default_kelvin_threshold(),
            invalid_readings: InvalidReadingPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StatisticsSettings {
    #[serde(default = "default_descriptive_window")]
    pub descriptive_window: usize,
    #[serde(default = "default_range")]
    pub default_range: String,
}

impl Default for StatisticsSettings {
    fn default() -> Self {
        Self {
            descriptive_window: default_descriptive_window(),
            default_range: default_range(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_location() -> String {
    "assets/data.yml".to_string()
}

fn default_true() -> bool {
    true
}

fn default_step_interval_ms() -> u64 {
    5000
}

fn default_history_preload() -> usize {
    60
}

fn default_max_history() -> usize {
    200
}

fn default_sampling_interval_secs() -> u32 {
    5
}

fn default_kelvin_threshold() -> f64 {
    200.0
}

fn default_descriptive_window() -> usize {
    60
}

fn default_range() -> String {
    "15m".to_string()
}

/// Loads `config/weather.*` (optional) overlaid with `WEATHER__*` environment variables,
/// e.g. `WEATHER__STREAM__STEP_INTERVAL_MS=1000`.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/weather").required(false))
        .add_source(config::Environment::with_prefix("WEATHER").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
