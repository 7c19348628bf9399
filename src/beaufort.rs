//! # Beaufort Wind-Force Classifier
//!
//! Maps a wind speed in knots onto the 13-band Beaufort scale and projects the
//! speed onto a 0–100 gauge.
//!
//! ## Boundary Rule
//! Bands are scanned in ascending force order and the first band whose
//! `max_kts` is greater than or equal to the speed wins. A speed sitting exactly
//! on a boundary therefore belongs to the *lower* band: 3.0 kts is force 1,
//! 3.01 kts is force 2. Force 12 has no upper bound and catches everything past
//! force 11.
//!
//! ## Wave Heights
//! `wave_height` is a fixed descriptor per band, taken from the published
//! scale. It is display data, not a sea-state estimate.
//!
//! ## Gauge Projections
//! - **Linear**: `min(speed, 64) / 64 * 100`
//! - **Logarithmic**: `ln(1 + speed) / ln(65) * 100`, clamped to 0–100. Keeps
//!   light and moderate winds visually apart at the expense of the gale tail.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::ServiceError;

/// Speed at which both gauges read 100%.
pub const GAUGE_MAX_KTS: f64 = 64.0;

/// One row of the Beaufort scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaufortBand {
    pub force: u8,
    pub min_kts: f64,
    /// `None` only for force 12
    pub max_kts: Option<f64>,
    pub label: &'static str,
    pub wave_height: &'static str,
    pub color: &'static str,
}

const fn band(
    force: u8,
    min_kts: f64,
    max_kts: Option<f64>,
    label: &'static str,
    wave_height: &'static str,
    color: &'static str,
) -> BeaufortBand {
    BeaufortBand {
        force,
        min_kts,
        max_kts,
        label,
        wave_height,
        color,
    }
}

/// The full scale, force 0 through 12. Contiguous: each band starts where the
/// previous one ends.
pub static BEAUFORT_SCALE: [BeaufortBand; 13] = [
    band(0, 0.0, Some(1.0), "Calm", "0 ft", "#e0f3f8"),
    band(1, 1.0, Some(3.0), "Light air", "0-1 ft", "#c6e9f1"),
    band(2, 3.0, Some(6.0), "Light breeze", "1-2 ft", "#abdda4"),
    band(3, 6.0, Some(10.0), "Gentle breeze", "2-3.5 ft", "#66c2a5"),
    band(4, 10.0, Some(16.0), "Moderate breeze", "3.5-6 ft", "#3288bd"),
    band(5, 16.0, Some(21.0), "Fresh breeze", "6-10 ft", "#5e4fa2"),
    band(6, 21.0, Some(27.0), "Strong breeze", "10-13 ft", "#fee08b"),
    band(7, 27.0, Some(33.0), "Near gale", "13-20 ft", "#fdae61"),
    band(8, 33.0, Some(40.0), "Gale", "18-25 ft", "#f46d43"),
    band(9, 40.0, Some(47.0), "Strong gale", "23-32 ft", "#d53e4f"),
    band(10, 47.0, Some(55.0), "Storm", "29-41 ft", "#9e0142"),
    band(11, 55.0, Some(63.0), "Violent storm", "37-52 ft", "#67001f"),
    band(12, 63.0, None, "Hurricane force", "46+ ft", "#40004b"),
];

/// Classify a wind speed in knots.
///
/// Missing (`None`) or NaN speeds classify as force 0.
///
/// # Example
/// ```
/// use bay_conditions_lib::beaufort::classify;
///
/// assert_eq!(classify(3.0).force, 1);
/// assert_eq!(classify(3.01).force, 2);
/// assert_eq!(classify(None).force, 0);
/// ```
pub fn classify(speed_kts: impl Into<Option<f64>>) -> &'static BeaufortBand {
    let speed = match speed_kts.into() {
        Some(speed) if !speed.is_nan() => speed,
        _ => return &BEAUFORT_SCALE[0],
    };

    BEAUFORT_SCALE
        .iter()
        .find(|band| band.max_kts.map_or(true, |max| max >= speed))
        .unwrap_or(&BEAUFORT_SCALE[12])
}

/// Which projection a wind gauge uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeScale {
    #[default]
    Linear,
    #[serde(alias = "logarithmic")]
    Log,
}

impl FromStr for GaugeScale {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(GaugeScale::Linear),
            "log" | "logarithmic" => Ok(GaugeScale::Log),
            other => Err(ServiceError::Validation(format!(
                "unknown gauge scale '{}', expected 'linear' or 'log'",
                other
            ))),
        }
    }
}

impl GaugeScale {
    /// Gauge needle position in percent, 0–100.
    pub fn position(self, speed_kts: impl Into<Option<f64>>) -> f64 {
        let speed = match speed_kts.into() {
            Some(speed) if !speed.is_nan() => speed.max(0.0),
            _ => return 0.0,
        };

        match self {
            GaugeScale::Linear => speed.min(GAUGE_MAX_KTS) / GAUGE_MAX_KTS * 100.0,
            GaugeScale::Log => {
                ((1.0 + speed).ln() / (1.0 + GAUGE_MAX_KTS).ln() * 100.0).clamp(0.0, 100.0)
            }
        }
    }
}
