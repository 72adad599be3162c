// Weather domain models: raw document shape and normalized data points
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a point carries the measured value or a substituted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingQuality {
    #[default]
    Measured,
    Substituted,
}

/// One normalized sample: temperature in °C, energy in kWh for one sampling interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub time: String,
    pub temperature: f64,
    pub energy: f64,
    #[serde(default)]
    pub quality: ReadingQuality,
}

impl DataPoint {
    pub fn new(time: impl Into<String>, temperature: f64, energy: f64) -> Self {
        Self {
            time: time.into(),
            temperature,
            energy,
            quality: ReadingQuality::Measured,
        }
    }

    pub fn substituted(mut self) -> Self {
        self.quality = ReadingQuality::Substituted;
        self
    }

    pub fn is_finite(&self) -> bool {
        self.temperature.is_finite() && self.energy.is_finite()
    }
}

/// Raw numeric value as found in the source document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawSample {
    pub time: String,
    #[serde(default)]
    pub value: Option<RawValue>,
}

impl RawSample {
    pub fn new(time: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self {
            time: time.into(),
            value: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct RawSeries {
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<RawSample>>,
}

impl RawSeries {
    pub fn new(unit: Option<&str>, values: Vec<RawSample>) -> Self {
        Self {
            unit: unit.map(str::to_string),
            values: Some(values),
        }
    }
}

/// Deserialized input document. Both series are optional so that a malformed
/// document still parses and can be rejected softly by the loader.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct RawDocument {
    #[serde(default)]
    pub temperature: Option<RawSeries>,
    #[serde(default)]
    pub power: Option<RawSeries>,
}

impl RawDocument {
    pub fn new(temperature: RawSeries, power: RawSeries) -> Self {
        Self {
            temperature: Some(temperature),
            power: Some(power),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemperatureUnit {
    Decikelvin,
    Kelvin,
    Celsius,
    Unrecognized(String),
}

impl TemperatureUnit {
    /// A missing tag means the legacy decikelvin format.
    pub fn from_tag(tag: Option<&str>) -> Self {
        let Some(tag) = tag else {
            return TemperatureUnit::Decikelvin;
        };
        match tag.trim() {
            "dK" | "dk" | "decikelvin" => TemperatureUnit::Decikelvin,
            "K" | "kelvin" => TemperatureUnit::Kelvin,
            "°C" | "ºC" | "C" | "degC" | "celsius" => TemperatureUnit::Celsius,
            other => TemperatureUnit::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemperatureUnit::Decikelvin => write!(f, "dK"),
            TemperatureUnit::Kelvin => write!(f, "K"),
            TemperatureUnit::Celsius => write!(f, "°C"),
            TemperatureUnit::Unrecognized(tag) => write!(f, "{}", tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerUnit {
    Megawatt,
    Kilowatt,
    Watt,
    Unrecognized(String),
}

impl PowerUnit {
    /// A missing tag means the legacy megawatt format.
    pub fn from_tag(tag: Option<&str>) -> Self {
        let Some(tag) = tag else {
            return PowerUnit::Megawatt;
        };
        match tag.trim() {
            "MW" | "megawatt" => PowerUnit::Megawatt,
            "kW" | "KW" | "kilowatt" => PowerUnit::Kilowatt,
            "W" | "watt" => PowerUnit::Watt,
            other => PowerUnit::Unrecognized(other.to_string()),
        }
    }

    /// Factor that brings a raw value in this unit to megawatts.
    pub fn megawatt_factor(&self) -> f64 {
        match self {
            PowerUnit::Megawatt | PowerUnit::Unrecognized(_) => 1.0,
            PowerUnit::Kilowatt => 1e-3,
            PowerUnit::Watt => 1e-6,
        }
    }
}

impl fmt::Display for PowerUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerUnit::Megawatt => write!(f, "MW"),
            PowerUnit::Kilowatt => write!(f, "kW"),
            PowerUnit::Watt => write!(f, "W"),
            PowerUnit::Unrecognized(tag) => write!(f, "{}", tag),
        }
    }
}
