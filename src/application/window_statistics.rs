// Window statistics - Trends, aggregates and comparisons over the rolling history
use crate::domain::statistics::{
    Aggregates, ComparisonSource, DayPartEnergy, DescriptiveStats, HalfWindowDelta, Peak,
    PreviousWindowComparison, SeriesDescriptive, SeriesSummary, TemperatureBands, Variability,
    VariabilityReport, WindowReport, WindowStats,
};
use crate::domain::time_of_day::{hour_of, short_label};
use crate::domain::weather::DataPoint;
use crate::domain::window::{Trend, WindowSelection};
use statrs::statistics::{Data, OrderStatistics, Statistics};

pub const TREND_EPSILON: f64 = 0.001;
// Absorbs f64 subtraction error, e.g. 9.9995 - 10.0005 lands just below -0.001.
const TREND_SLACK: f64 = 1e-9;
const DENOMINATOR_EPSILON: f64 = 1e-9;
const MIN_WINDOW_POINTS: usize = 12;
const MIN_HALF_WINDOW_POINTS: usize = 6;

pub fn compare_trend(prev: f64, next: f64) -> Trend {
    let delta = next - prev;
    let threshold = TREND_EPSILON + TREND_SLACK;
    if delta > threshold {
        Trend::Up
    } else if delta < -threshold {
        Trend::Down
    } else {
        Trend::Flat
    }
}

/// Trend of one series with hysteresis: a flat step keeps the last real direction.
#[derive(Debug, Clone, Default)]
pub struct TrendTracker {
    last_value: Option<f64>,
    last_direction: Option<Trend>,
}

impl TrendTracker {
    pub fn observe(&mut self, value: f64) -> Trend {
        if let Some(prev) = self.last_value {
            let raw = compare_trend(prev, value);
            if raw != Trend::Flat {
                self.last_direction = Some(raw);
            }
        }
        self.last_value = Some(value);
        self.current()
    }

    pub fn current(&self) -> Trend {
        self.last_direction.unwrap_or(Trend::Flat)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeriesTrends {
    pub temperature: TrendTracker,
    pub energy: TrendTracker,
}

impl SeriesTrends {
    pub fn observe(&mut self, point: &DataPoint) -> (Trend, Trend) {
        (
            self.temperature.observe(point.temperature),
            self.energy.observe(point.energy),
        )
    }

    pub fn reset(&mut self) {
        self.temperature.reset();
        self.energy.reset();
    }
}

/// Number of points for `selection`. Shrinks to what is available; the floor of 12 only
/// applies when nothing is available yet.
pub fn window_points(
    selection: WindowSelection,
    available: usize,
    sampling_interval_secs: u32,
) -> usize {
    let requested = selection.requested_points(sampling_interval_secs);
    if available > 0 {
        requested.min(available)
    } else {
        requested.max(MIN_WINDOW_POINTS)
    }
}

pub fn trailing(history: &[DataPoint], n: usize) -> &[DataPoint] {
    &history[history.len().saturating_sub(n)..]
}

/// `numerator / denominator`, or 0 when the denominator is near zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < DENOMINATOR_EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn percent_change(from: f64, to: f64) -> f64 {
    ratio(to - from, from) * 100.0
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

pub fn aggregates(window: &[DataPoint]) -> Aggregates {
    Aggregates {
        temp_avg: mean(window.iter().map(|p| p.temperature)),
        energy_sum: window.iter().map(|p| p.energy).sum(),
        points: window.len(),
    }
}

pub fn window_stats(window: &[DataPoint], sampling_interval_secs: u32) -> WindowStats {
    let Some(last) = window.last() else {
        return WindowStats::default();
    };

    let base = aggregates(window);
    let temp_max = window
        .iter()
        .map(|p| p.temperature)
        .fold(f64::NEG_INFINITY, f64::max);
    let peak_energy = window.iter().map(|p| p.energy).fold(f64::NEG_INFINITY, f64::max);
    let minutes = window.len() as f64 * sampling_interval_secs as f64 / 60.0;

    WindowStats {
        temp_avg: base.temp_avg,
        temp_max,
        energy_sum: base.energy_sum,
        points: base.points,
        prod_avg_per_min: ratio(base.energy_sum, minutes),
        prod_avg_per_hour: ratio(base.energy_sum, minutes / 60.0),
        utilization_pct: ratio(last.energy, peak_energy) * 100.0,
    }
}

/// Highest strictly positive energy in the window; ties keep the first occurrence.
pub fn find_peak(window: &[DataPoint]) -> Option<Peak> {
    let mut best: Option<&DataPoint> = None;
    for point in window {
        let current = best.map_or(0.0, |p| p.energy);
        if point.energy > current {
            best = Some(point);
        }
    }
    best.map(|p| Peak {
        time: p.time.clone(),
        label: short_label(&p.time),
        energy: p.energy,
    })
}

pub fn variability(window: &[DataPoint]) -> VariabilityReport {
    if window.is_empty() {
        return VariabilityReport::default();
    }
    let (min, max) = window.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.temperature), hi.max(p.temperature))
    });
    let range = max - min;
    VariabilityReport {
        state: Variability::from_range(range),
        range,
        variation_label: format!("±{:.1}", range / 2.0),
    }
}

/// Second half against first half: mean temperature and summed energy.
pub fn half_window_delta(window: &[DataPoint]) -> Option<HalfWindowDelta> {
    if window.len() < MIN_HALF_WINDOW_POINTS {
        return None;
    }
    let (first, second) = window.split_at(window.len() / 2);
    let (a, b) = (aggregates(first), aggregates(second));
    Some(HalfWindowDelta {
        temperature_pct: percent_change(a.temp_avg, b.temp_avg),
        energy_pct: percent_change(a.energy_sum, b.energy_sum),
    })
}

/// Compares the current window of `n` points with the one before it. Without `2n` points of
/// history the first half of the current window stands in for the previous window and only
/// its second half counts as current.
pub fn previous_window_comparison(history: &[DataPoint], n: usize) -> PreviousWindowComparison {
    let n = n.min(history.len());
    let len = history.len();

    let (source, previous, current) = if n > 0 && len >= 2 * n {
        (
            ComparisonSource::PreviousWindow,
            &history[len - 2 * n..len - n],
            &history[len - n..],
        )
    } else {
        let window = trailing(history, n);
        let (first, second) = window.split_at(window.len() / 2);
        (ComparisonSource::HalfWindow, first, second)
    };

    let (previous, current) = (aggregates(previous), aggregates(current));
    let (temp_avg_pct, energy_sum_pct) = if previous.points == 0 {
        (0.0, 0.0)
    } else {
        (
            percent_change(previous.temp_avg, current.temp_avg),
            percent_change(previous.energy_sum, current.energy_sum),
        )
    };

    PreviousWindowComparison {
        source,
        previous,
        current,
        temp_avg_pct,
        energy_sum_pct,
    }
}

fn describe(values: &[f64]) -> SeriesDescriptive {
    let mut data = Data::new(values.to_vec());
    SeriesDescriptive {
        median: data.median(),
        p25: data.percentile(25),
        p75: data.percentile(75),
        std_dev: values.iter().population_std_dev(),
    }
}

/// Median, quartiles, standard deviation and temperature/energy correlation over the
/// trailing `window` points, regardless of the selected range.
pub fn descriptive_stats(history: &[DataPoint], window: usize) -> Option<DescriptiveStats> {
    let tail = trailing(history, window);
    if tail.is_empty() {
        return None;
    }
    let temperatures: Vec<f64> = tail.iter().map(|p| p.temperature).collect();
    let energies: Vec<f64> = tail.iter().map(|p| p.energy).collect();

    let temperature = describe(&temperatures);
    let energy = describe(&energies);
    let covariance = temperatures.iter().population_covariance(energies.iter());
    let correlation = ratio(covariance, temperature.std_dev * energy.std_dev);

    Some(DescriptiveStats {
        points: tail.len(),
        temperature,
        energy,
        correlation,
    })
}

pub fn energy_by_day_part(window: &[DataPoint]) -> DayPartEnergy {
    window.iter().fold(DayPartEnergy::default(), |mut parts, p| {
        match hour_of(&p.time) {
            0..6 => parts.night += p.energy,
            6..12 => parts.morning += p.energy,
            12..18 => parts.afternoon += p.energy,
            _ => parts.evening += p.energy,
        }
        parts
    })
}

pub fn temperature_bands(window: &[DataPoint]) -> TemperatureBands {
    window.iter().fold(TemperatureBands::default(), |mut bands, p| {
        let t = p.temperature;
        if t < 10.0 {
            bands.below_10 += 1;
        } else if t < 20.0 {
            bands.from_10_to_20 += 1;
        } else if t < 30.0 {
            bands.from_20_to_30 += 1;
        } else {
            bands.from_30 += 1;
        }
        bands
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfAggregate {
    Mean,
    Sum,
}

pub fn series_summary(values: &[f64], aggregate: HalfAggregate) -> Option<SeriesSummary> {
    let last = *values.last()?;
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));

    let pct_half = (values.len() >= MIN_HALF_WINDOW_POINTS).then(|| {
        let (first, second) = values.split_at(values.len() / 2);
        let combine = |half: &[f64]| match aggregate {
            HalfAggregate::Mean => mean(half.iter().copied()),
            HalfAggregate::Sum => half.iter().sum(),
        };
        percent_change(combine(first), combine(second))
    });

    Some(SeriesSummary {
        min,
        max,
        last,
        pct_half,
        count: values.len(),
    })
}

#[derive(Debug, Clone)]
pub struct StatisticsEngine {
    sampling_interval_secs: u32,
    descriptive_window: usize,
}

impl StatisticsEngine {
    pub fn new(sampling_interval_secs: u32, descriptive_window: usize) -> Self {
        Self {
            sampling_interval_secs: sampling_interval_secs.max(1),
            descriptive_window,
        }
    }

    pub fn window_points(&self, selection: WindowSelection, available: usize) -> usize {
        window_points(selection, available, self.sampling_interval_secs)
    }

    pub fn report(&self, history: &[DataPoint], selection: WindowSelection) -> WindowReport {
        let n = self.window_points(selection, history.len());
        let window = trailing(history, n);
        let temperatures: Vec<f64> = window.iter().map(|p| p.temperature).collect();
        let energies: Vec<f64> = window.iter().map(|p| p.energy).collect();

        WindowReport {
            selection,
            label: selection.label(),
            window_points: window.len(),
            stats: window_stats(window, self.sampling_interval_secs),
            peak: find_peak(window),
            variability: variability(window),
            half_window: half_window_delta(window),
            comparison: previous_window_comparison(history, n),
            descriptive: descriptive_stats(history, self.descriptive_window),
            day_parts: energy_by_day_part(window),
            temperature_bands: temperature_bands(window),
            temperature_summary: series_summary(&temperatures, HalfAggregate::Mean),
            energy_summary: series_summary(&energies, HalfAggregate::Sum),
        }
    }
}
