// Synthetic document source - A generated day of weather/power samples in raw units
use crate::application::document_source::DocumentSource;
use crate::domain::time_of_day::{format_hms, SECONDS_PER_DAY};
use crate::domain::weather::{RawDocument, RawSample, RawSeries};
use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

pub const SCHEME: &str = "synthetic:";

const PEAK_POWER_MW: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct SyntheticDocumentSource {
    interval_secs: u32,
}

impl SyntheticDocumentSource {
    pub fn new(interval_secs: u32) -> Self {
        Self {
            interval_secs: interval_secs.max(1),
        }
    }

    /// `synthetic:` or `synthetic:<seed>`
    pub fn seed_from(location: &str) -> Option<u64> {
        location
            .strip_prefix(SCHEME)
            .and_then(|rest| rest.trim().parse().ok())
    }

    /// Temperature follows a daily sine with ±1 °C noise; power follows a daylight
    /// bell between 06:00 and 18:00. Values are emitted in dK and MW.
    pub fn generate(&self, seed: u64) -> RawDocument {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut temperature = Vec::new();
        let mut power = Vec::new();

        for second in (0..SECONDS_PER_DAY).step_by(self.interval_secs as usize) {
            let hours = second as f64 / 3600.0;
            let time = format_hms(second);

            let celsius = 15.0 + 10.0 * (hours / 24.0 * PI).sin() + rng.gen_range(-1.0..1.0);
            let decikelvin = ((celsius + 273.15) * 10.0).round();

            let solar = ((hours - 6.0) / 12.0 * PI).sin().max(0.0);
            let megawatts = solar * PEAK_POWER_MW * rng.gen_range(0.8..1.0);

            temperature.push(RawSample::new(time.clone(), decikelvin));
            power.push(RawSample::new(time, (megawatts * 1000.0).round() / 1000.0));
        }

        RawDocument::new(
            RawSeries::new(Some("dK"), temperature),
            RawSeries::new(Some("MW"), power),
        )
    }
}

#[async_trait]
impl DocumentSource for SyntheticDocumentSource {
    async fn fetch(&self, location: &str) -> Result<RawDocument> {
        let seed = Self::seed_from(location).unwrap_or_else(|| rand::thread_rng().r#gen());
        tracing::info!(seed, interval_secs = self.interval_secs, "generating synthetic dataset");
        Ok(self.generate(seed))
    }
}
