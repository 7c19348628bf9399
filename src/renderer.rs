//! # Terminal Conditions Report
//!
//! Plain-text rendering of [`HarborConditions`] for the `report` command: the
//! wind reading, its Beaufort band, both gauge projections drawn as bars, and
//! the upcoming tide events.

use crate::beaufort::GaugeScale;
use crate::server::HarborConditions;
use crate::tide_data::TideKind;

/// Width of a gauge bar in characters, excluding brackets.
const GAUGE_WIDTH: usize = 30;

/// Format an optional value with a fixed precision, or a dash when absent.
fn format_value(value: Option<f64>, decimals: usize, unit: Option<&str>) -> String {
    match value {
        Some(v) => match unit {
            Some(unit) => format!("{:.*} {}", decimals, v, unit),
            None => format!("{:.*}", decimals, v),
        },
        None => "—".to_string(),
    }
}

/// Draw a 0–100 position as a filled bar, e.g. `[#####-----]  50.0%`.
pub fn gauge_bar(position: f64, width: usize) -> String {
    let clamped = if position.is_finite() {
        position.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((clamped / 100.0) * width as f64).round() as usize;
    format!(
        "[{}{}] {:>5.1}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        clamped
    )
}

/// Render the full report.
pub fn render_report(conditions: &HarborConditions) -> String {
    let harbor = &conditions.harbor;
    let reading = &conditions.marine.data;
    let band = conditions.beaufort;
    let units = &reading.units;
    let mut out = String::new();

    out.push_str(&format!(
        "{} (station {})  {:.4}, {:.4}\n",
        harbor.name, harbor.tide_station, harbor.lat, harbor.lon
    ));
    out.push_str(&format!(
        "Observed {}{}\n\n",
        reading.timestamp.as_deref().unwrap_or("—"),
        if conditions.marine.cached { " (cached)" } else { "" }
    ));

    out.push_str(&format!(
        "Wind      {} gusting {} from {}\n",
        format_value(reading.wind_speed_kts, 1, Some("kn")),
        format_value(reading.wind_gust_kts, 1, Some("kn")),
        format_value(reading.wind_direction_deg, 0, Some("°")),
    ));
    out.push_str(&format!(
        "Beaufort  Force {} · {} · seas {}\n",
        band.force, band.label, band.wave_height
    ));
    for (name, scale) in [("Linear", GaugeScale::Linear), ("Log", GaugeScale::Log)] {
        out.push_str(&format!(
            "{:<10}{}\n",
            name,
            gauge_bar(scale.position(reading.wind_speed_kts), GAUGE_WIDTH)
        ));
    }
    out.push_str(&format!(
        "Temp {}   Humidity {}   Pressure {}   Visibility {}\n\n",
        format_value(reading.temperature_c, 1, units.temperature.as_deref()),
        format_value(reading.humidity, 0, units.humidity.as_deref()),
        format_value(reading.pressure_hpa, 1, units.pressure.as_deref()),
        format_value(reading.visibility, 0, units.visibility.as_deref()),
    ));

    let tides = &conditions.tides.data;
    out.push_str(&format!(
        "Tides ({} of {} predictions upcoming)\n",
        tides.upcoming.len(),
        tides.raw_count
    ));
    if tides.upcoming.is_empty() {
        out.push_str("  none in the next 24 hours\n");
    }
    for event in &tides.upcoming {
        let label = match event.kind {
            Some(TideKind::High) => "High",
            Some(TideKind::Low) => "Low",
            None => "",
        };
        out.push_str(&format!(
            "  {:<5} {}  {}\n",
            label,
            event.time,
            format_value(event.value_ft, 2, Some("ft"))
        ));
    }

    out
}

/// Print the report to stdout.
pub fn draw_ascii(conditions: &HarborConditions) {
    print!("{}", render_report(conditions));
}
