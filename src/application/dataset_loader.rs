// Dataset loader - Fetch, normalize and join the raw temperature/power series
use crate::application::document_source::DocumentSource;
use crate::application::unit_converter::UnitConverter;
use crate::domain::time_of_day::to_seconds;
use crate::domain::weather::{DataPoint, PowerUnit, RawDocument, RawSample, TemperatureUnit};
use crate::infrastructure::config::InvalidReadingPolicy;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to fetch dataset from {location}: {cause:#}")]
    Fetch {
        location: String,
        cause: anyhow::Error,
    },
    #[error("dataset from {location} failed validation ({points} points)")]
    Validation { location: String, points: usize },
}

/// Anomalies recovered while processing a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub malformed: bool,
    pub unrecognized_units: usize,
    pub missing_power: usize,
    pub invalid_temperature: usize,
    pub invalid_power: usize,
    pub duplicate_timestamps: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        *self == LoadReport::default()
    }
}

#[derive(Clone)]
pub struct DatasetLoader {
    converter: UnitConverter,
    source: Arc<dyn DocumentSource>,
}

impl DatasetLoader {
    pub fn new(converter: UnitConverter, source: Arc<dyn DocumentSource>) -> Self {
        Self { converter, source }
    }

    pub fn converter(&self) -> &UnitConverter {
        &self.converter
    }

    /// Fetches the document at `location`, normalizes it and validates the result.
    pub async fn load(&self, location: &str) -> Result<Vec<DataPoint>, LoadError> {
        let document = self
            .source
            .fetch(location)
            .await
            .map_err(|cause| LoadError::Fetch {
                location: location.to_string(),
                cause,
            })?;

        let points = self.process(&document);
        if !Self::validate(&points) {
            return Err(LoadError::Validation {
                location: location.to_string(),
                points: points.len(),
            });
        }

        tracing::info!(location, points = points.len(), "dataset loaded");
        Ok(points)
    }

    pub fn process(&self, document: &RawDocument) -> Vec<DataPoint> {
        self.process_with_report(document).0
    }

    /// Joins both series by timestamp. Output follows the temperature series sorted by
    /// time of day; a missing or unusable power sample never drops the temperature point.
    pub fn process_with_report(&self, document: &RawDocument) -> (Vec<DataPoint>, LoadReport) {
        let mut report = LoadReport::default();

        let (Some(temperature), Some(power)) = (&document.temperature, &document.power) else {
            tracing::warn!("document is missing the temperature or power series");
            report.malformed = true;
            return (Vec::new(), report);
        };
        let (Some(temperature_values), Some(power_values)) = (&temperature.values, &power.values)
        else {
            tracing::warn!("document series have no values");
            report.malformed = true;
            return (Vec::new(), report);
        };

        let temperature_unit = TemperatureUnit::from_tag(temperature.unit.as_deref());
        if let TemperatureUnit::Unrecognized(tag) = &temperature_unit {
            tracing::warn!(
                unit = %tag,
                kelvin_threshold = self.converter.settings().kelvin_threshold,
                "unrecognized temperature unit, using magnitude heuristic"
            );
            report.unrecognized_units += 1;
        }
        let power_unit = PowerUnit::from_tag(power.unit.as_deref());
        if let PowerUnit::Unrecognized(tag) = &power_unit {
            tracing::warn!(unit = %tag, "unrecognized power unit, assuming MW");
            report.unrecognized_units += 1;
        }

        // Last write wins on duplicate power timestamps
        let mut power_by_time: HashMap<&str, Option<f64>> = HashMap::new();
        for sample in sort_by_time(power_values) {
            let value = sample.value.as_ref().and_then(UnitConverter::parse_number);
            if power_by_time.insert(sample.time.trim(), value).is_some() {
                report.duplicate_timestamps += 1;
            }
        }

        let temperatures = dedupe_sorted(sort_by_time(temperature_values), &mut report);
        let flag = self.converter.settings().invalid_readings == InvalidReadingPolicy::Flag;
        let mut first_missing: Option<&str> = None;

        let points = temperatures
            .into_iter()
            .map(|sample| {
                let time = sample.time.trim();
                let mut substituted = false;

                let raw_temperature = sample.value.as_ref().and_then(UnitConverter::parse_number);
                let temperature = match raw_temperature.map(|raw| {
                    self.converter
                        .try_temperature_to_celsius(raw, &temperature_unit)
                }) {
                    Some(Ok(celsius)) => celsius,
                    Some(Err(e)) => {
                        tracing::debug!(time, error = %e, "temperature conversion failed");
                        report.invalid_temperature += 1;
                        substituted = true;
                        0.0
                    }
                    None => {
                        tracing::debug!(time, "non-numeric temperature value");
                        report.invalid_temperature += 1;
                        substituted = true;
                        0.0
                    }
                };

                let energy = match power_by_time.get(time) {
                    Some(Some(raw)) => {
                        match self.converter.try_power_to_kilowatt_hours(*raw, &power_unit) {
                            Ok(kwh) => kwh,
                            Err(e) => {
                                tracing::debug!(time, error = %e, "power conversion failed");
                                report.invalid_power += 1;
                                substituted = true;
                                0.0
                            }
                        }
                    }
                    Some(None) => {
                        tracing::debug!(time, "non-numeric power value");
                        report.invalid_power += 1;
                        substituted = true;
                        0.0
                    }
                    None => {
                        tracing::debug!(time, "no power sample for timestamp");
                        first_missing.get_or_insert(time);
                        report.missing_power += 1;
                        substituted = true;
                        0.0
                    }
                };

                let point = DataPoint::new(time, temperature, energy);
                if flag && substituted {
                    point.substituted()
                } else {
                    point
                }
            })
            .collect::<Vec<_>>();

        if report.missing_power > 0 {
            tracing::warn!(
                count = report.missing_power,
                first = first_missing.unwrap_or_default(),
                "temperature samples without matching power, energy set to 0"
            );
        }
        if report.invalid_temperature > 0 || report.invalid_power > 0 {
            tracing::warn!(
                temperature = report.invalid_temperature,
                power = report.invalid_power,
                policy = ?self.converter.settings().invalid_readings,
                "invalid readings substituted with 0"
            );
        }
        if report.duplicate_timestamps > 0 {
            tracing::debug!(
                count = report.duplicate_timestamps,
                "duplicate timestamps collapsed, last value kept"
            );
        }

        (points, report)
    }

    /// Load-time gate: non-empty and a well-formed first point.
    pub fn validate(points: &[DataPoint]) -> bool {
        let Some(sample) = points.first() else {
            tracing::warn!("dataset is empty");
            return false;
        };
        if sample.time.trim().is_empty() || !sample.is_finite() {
            tracing::warn!(?sample, "dataset has an ill-shaped first point");
            return false;
        }
        true
    }
}

// Stable, so duplicates keep their document order
fn sort_by_time(values: &[RawSample]) -> Vec<&RawSample> {
    let mut sorted: Vec<&RawSample> = values.iter().collect();
    sorted.sort_by_key(|s| to_seconds(&s.time));
    sorted
}

fn dedupe_sorted<'a>(sorted: Vec<&'a RawSample>, report: &mut LoadReport) -> Vec<&'a RawSample> {
    let mut deduped: Vec<&RawSample> = Vec::with_capacity(sorted.len());
    for sample in sorted {
        match deduped.last_mut() {
            Some(last) if last.time.trim() == sample.time.trim() => {
                *last = sample;
                report.duplicate_timestamps += 1;
            }
            _ => deduped.push(sample),
        }
    }
    deduped
}
