// Derived window statistics domain models
use super::window::WindowSelection;
use serde::Serialize;

/// Aggregates over the selected window.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WindowStats {
    pub temp_avg: f64,
    pub temp_max: f64,
    pub energy_sum: f64,
    pub points: usize,
    pub prod_avg_per_min: f64,
    pub prod_avg_per_hour: f64,
    /// Latest energy as a percentage of the window peak.
    pub utilization_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Aggregates {
    pub temp_avg: f64,
    pub energy_sum: f64,
    pub points: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonSource {
    /// Disjoint window immediately preceding the current one.
    PreviousWindow,
    /// First half of the current window standing in for the previous one.
    HalfWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviousWindowComparison {
    pub source: ComparisonSource,
    pub previous: Aggregates,
    pub current: Aggregates,
    pub temp_avg_pct: f64,
    pub energy_sum_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Peak {
    pub time: String,
    pub label: String,
    pub energy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Variability {
    #[serde(rename = "very stable")]
    VeryStable,
    #[default]
    #[serde(rename = "stable")]
    Stable,
    #[serde(rename = "variable")]
    Variable,
    #[serde(rename = "very variable")]
    VeryVariable,
}

impl Variability {
    pub fn from_range(range: f64) -> Self {
        if range < 2.0 {
            Variability::VeryStable
        } else if range < 5.0 {
            Variability::Stable
        } else if range < 10.0 {
            Variability::Variable
        } else {
            Variability::VeryVariable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariabilityReport {
    pub state: Variability,
    pub range: f64,
    /// Half the range, formatted as "±X.X".
    pub variation_label: String,
}

impl Default for VariabilityReport {
    fn default() -> Self {
        Self {
            state: Variability::Stable,
            range: 0.0,
            variation_label: "±0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HalfWindowDelta {
    pub temperature_pct: f64,
    pub energy_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesDescriptive {
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub points: usize,
    pub temperature: SeriesDescriptive,
    pub energy: SeriesDescriptive,
    /// Pearson correlation between temperature and energy.
    pub correlation: f64,
}

/// Energy sums by part of day, keyed on the hour of each point's timestamp.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DayPartEnergy {
    pub night: f64,
    pub morning: f64,
    pub afternoon: f64,
    pub evening: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TemperatureBands {
    pub below_10: usize,
    pub from_10_to_20: usize,
    pub from_20_to_30: usize,
    pub from_30: usize,
}

/// Compact per-series summary shown next to a KPI value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub min: f64,
    pub max: f64,
    pub last: f64,
    pub pct_half: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowReport {
    pub selection: WindowSelection,
    pub label: &'static str,
    pub window_points: usize,
    pub stats: WindowStats,
    pub peak: Option<Peak>,
    pub variability: VariabilityReport,
    pub half_window: Option<HalfWindowDelta>,
    pub comparison: PreviousWindowComparison,
    pub descriptive: Option<DescriptiveStats>,
    pub day_parts: DayPartEnergy,
    pub temperature_bands: TemperatureBands,
    pub temperature_summary: Option<SeriesSummary>,
    pub energy_summary: Option<SeriesSummary>,
}
