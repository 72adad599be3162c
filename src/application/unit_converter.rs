// Unit converter - Raw dataset units to display units
use crate::domain::weather::{PowerUnit, RawValue, TemperatureUnit};
use crate::infrastructure::config::ConversionSettings;

const ABSOLUTE_ZERO_CELSIUS: f64 = 273.15;
const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("non-finite {quantity} value: {value}")]
    NonFinite { quantity: &'static str, value: f64 },
    #[error("negative power value: {0} MW")]
    NegativePower(f64),
    #[error("invalid sampling interval: {0} s")]
    InvalidInterval(f64),
}

#[derive(Debug, Clone)]
pub struct UnitConverter {
    settings: ConversionSettings,
}

impl UnitConverter {
    pub fn new(settings: ConversionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    pub fn sampling_interval_secs(&self) -> f64 {
        self.settings.sampling_interval_secs as f64
    }

    /// °C = dK / 10 - 273.15
    pub fn try_decikelvin_to_celsius(&self, decikelvin: f64) -> Result<f64, ConversionError> {
        finite("temperature", decikelvin)?;
        Ok(decikelvin / 10.0 - ABSOLUTE_ZERO_CELSIUS)
    }

    pub fn decikelvin_to_celsius(&self, decikelvin: f64) -> f64 {
        lenient(self.try_decikelvin_to_celsius(decikelvin))
    }

    pub fn try_kelvin_to_celsius(&self, kelvin: f64) -> Result<f64, ConversionError> {
        finite("temperature", kelvin)?;
        Ok(kelvin - ABSOLUTE_ZERO_CELSIUS)
    }

    pub fn kelvin_to_celsius(&self, kelvin: f64) -> f64 {
        lenient(self.try_kelvin_to_celsius(kelvin))
    }

    pub fn try_celsius_to_celsius(&self, celsius: f64) -> Result<f64, ConversionError> {
        finite("temperature", celsius)
    }

    pub fn celsius_to_celsius(&self, celsius: f64) -> f64 {
        lenient(self.try_celsius_to_celsius(celsius))
    }

    /// Converts a raw temperature in `unit` to °C.
    ///
    /// Unrecognized units go through a best-effort magnitude heuristic: values at or above
    /// the configured threshold are read as Kelvin, anything below as Celsius already.
    pub fn try_temperature_to_celsius(
        &self,
        raw: f64,
        unit: &TemperatureUnit,
    ) -> Result<f64, ConversionError> {
        match unit {
            TemperatureUnit::Decikelvin => self.try_decikelvin_to_celsius(raw),
            TemperatureUnit::Kelvin => self.try_kelvin_to_celsius(raw),
            TemperatureUnit::Celsius => self.try_celsius_to_celsius(raw),
            TemperatureUnit::Unrecognized(_) if raw >= self.settings.kelvin_threshold => {
                self.try_kelvin_to_celsius(raw)
            }
            TemperatureUnit::Unrecognized(_) => self.try_celsius_to_celsius(raw),
        }
    }

    pub fn temperature_to_celsius(&self, raw: f64, unit: &TemperatureUnit) -> f64 {
        lenient(self.try_temperature_to_celsius(raw, unit))
    }

    /// kWh = MW × 1000 × (interval / 3600)
    pub fn try_megawatts_to_kilowatt_hours(
        &self,
        megawatts: f64,
        interval_secs: f64,
    ) -> Result<f64, ConversionError> {
        finite("power", megawatts)?;
        if megawatts < 0.0 {
            return Err(ConversionError::NegativePower(megawatts));
        }
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(ConversionError::InvalidInterval(interval_secs));
        }
        Ok(megawatts * 1000.0 * (interval_secs / SECONDS_PER_HOUR))
    }

    pub fn megawatts_to_kilowatt_hours(&self, megawatts: f64, interval_secs: f64) -> f64 {
        lenient(self.try_megawatts_to_kilowatt_hours(megawatts, interval_secs))
    }

    /// Energy for one sampling interval from a raw power reading in `unit`.
    pub fn try_power_to_kilowatt_hours(
        &self,
        raw: f64,
        unit: &PowerUnit,
    ) -> Result<f64, ConversionError> {
        self.try_megawatts_to_kilowatt_hours(
            raw * unit.megawatt_factor(),
            self.sampling_interval_secs(),
        )
    }

    pub fn power_to_kilowatt_hours(&self, raw: f64, unit: &PowerUnit) -> f64 {
        lenient(self.try_power_to_kilowatt_hours(raw, unit))
    }

    /// Parses a raw numeric value, accepting strings with a decimal comma.
    pub fn parse_number(value: &RawValue) -> Option<f64> {
        let parsed = match value {
            RawValue::Number(n) => Some(*n),
            RawValue::Text(text) => normalize_decimal(text.trim()).parse::<f64>().ok(),
        };
        parsed.filter(|n| n.is_finite())
    }

    pub fn sanitize_number(value: Option<&RawValue>, fallback: f64) -> f64 {
        value.and_then(Self::parse_number).unwrap_or(fallback)
    }
}

// "12,75" is a decimal comma; with a '.' present commas group thousands.
fn normalize_decimal(text: &str) -> String {
    if text.contains('.') {
        text.replace(',', "")
    } else {
        text.replace(',', ".")
    }
}

fn finite(quantity: &'static str, value: f64) -> Result<f64, ConversionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConversionError::NonFinite { quantity, value })
    }
}

fn lenient(result: Result<f64, ConversionError>) -> f64 {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "conversion failed, substituting 0");
        0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter() -> UnitConverter {
        UnitConverter::new(ConversionSettings::default())
    }

    #[test]
    fn test_decikelvin_to_celsius() {
        let c = converter();
        assert!((c.decikelvin_to_celsius(2931.5) - 20.0).abs() < 1e-9);
        for dk in [0.0, 1.0, 2731.5, 3100.25, -50.0] {
            assert!((c.decikelvin_to_celsius(dk) - (dk / 10.0 - 273.15)).abs() < 1e-9);
        }
        assert_eq!(c.decikelvin_to_celsius(f64::NAN), 0.0);
        assert_eq!(c.decikelvin_to_celsius(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_megawatts_to_kilowatt_hours() {
        let c = converter();
        let expected = 100.0 * 1000.0 * (5.0 / 3600.0);
        assert!((c.megawatts_to_kilowatt_hours(100.0, 5.0) - expected).abs() < 1e-9);
        assert!((c.megawatts_to_kilowatt_hours(100.0, 5.0) - 138.888).abs() < 0.001);
        assert_eq!(c.megawatts_to_kilowatt_hours(-1.0, 5.0), 0.0);
        assert_eq!(c.megawatts_to_kilowatt_hours(100.0, 0.0), 0.0);
        assert_eq!(c.megawatts_to_kilowatt_hours(100.0, -5.0), 0.0);
        assert_eq!(c.megawatts_to_kilowatt_hours(f64::NAN, 5.0), 0.0);
    }

    #[test]
    fn test_strict_errors() {
        let c = converter();
        assert_eq!(
            c.try_megawatts_to_kilowatt_hours(-2.0, 5.0),
            Err(ConversionError::NegativePower(-2.0))
        );
        assert!(matches!(
            c.try_decikelvin_to_celsius(f64::NAN),
            Err(ConversionError::NonFinite { quantity: "temperature", .. })
        ));
    }

    #[test]
    fn test_temperature_units_and_heuristic() {
        let c = converter();
        let unknown = TemperatureUnit::Unrecognized("?".to_string());
        let kelvin = c.try_temperature_to_celsius(293.15, &TemperatureUnit::Kelvin).unwrap();
        assert!((kelvin - 20.0).abs() < 1e-9);
        let celsius = c.try_temperature_to_celsius(21.5, &TemperatureUnit::Celsius).unwrap();
        assert_eq!(celsius, 21.5);
        assert!((c.try_temperature_to_celsius(300.0, &unknown).unwrap() - 26.85).abs() < 1e-9);
        assert_eq!(c.try_temperature_to_celsius(25.0, &unknown).unwrap(), 25.0);

        let custom = UnitConverter::new(ConversionSettings {
            kelvin_threshold: 400.0,
            ..ConversionSettings::default()
        });
        assert_eq!(custom.try_temperature_to_celsius(300.0, &unknown).unwrap(), 300.0);
    }

    #[test]
    fn test_power_units() {
        let c = converter();
        let mw = c.try_power_to_kilowatt_hours(1.0, &PowerUnit::Megawatt).unwrap();
        let kw = c.try_power_to_kilowatt_hours(1000.0, &PowerUnit::Kilowatt).unwrap();
        let w = c.try_power_to_kilowatt_hours(1_000_000.0, &PowerUnit::Watt).unwrap();
        assert!((mw - kw).abs() < 1e-9);
        assert!((mw - w).abs() < 1e-9);
        assert_eq!(c.power_to_kilowatt_hours(-3.0, &PowerUnit::Kilowatt), 0.0);
        let lenient = c.temperature_to_celsius(2931.5, &TemperatureUnit::Decikelvin);
        assert!((lenient - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_sanitize_number() {
        assert_eq!(UnitConverter::sanitize_number(Some(&RawValue::Number(4.5)), 0.0), 4.5);
        assert_eq!(UnitConverter::sanitize_number(Some(&"12,75".into()), 0.0), 12.75);
        assert_eq!(UnitConverter::sanitize_number(Some(&" 3.5 ".into()), 0.0), 3.5);
        assert_eq!(UnitConverter::sanitize_number(Some(&"n/a".into()), -1.0), -1.0);
        assert_eq!(UnitConverter::sanitize_number(Some(&"NaN".into()), 7.0), 7.0);
        assert_eq!(UnitConverter::sanitize_number(None, 2.0), 2.0);
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(UnitConverter::parse_number(&"1,234.5".into()), Some(1234.5));
        assert_eq!(UnitConverter::parse_number(&"2,931,500.25".into()), Some(2_931_500.25));
        assert_eq!(UnitConverter::parse_number(&"12,75".into()), Some(12.75));
        assert_eq!(UnitConverter::parse_number(&"1,2,3".into()), None);
    }
}
