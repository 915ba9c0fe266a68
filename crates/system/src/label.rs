//! Text rendering of the battery state for panel output.

use battbar_config::{DisplayConfig, OutputFormat};
use battbar_core::{AppState, BatteryRecord, BatteryStatus};
use serde::Serialize;

/// Shown when no estimate is available.
pub const UNKNOWN_TIME: &str = "??:??";

/// Format minutes as `HH:MM`, rounding to the nearest minute.
pub fn format_time_left(minutes: Option<f64>) -> String {
    let Some(minutes) = minutes.filter(|m| m.is_finite()) else {
        return UNKNOWN_TIME.to_string();
    };
    let total = minutes.round().max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// `BAT0 58%`, with a trailing `+` while charging.
pub fn battery_segment(record: &BatteryRecord, show_description: bool) -> String {
    let mut segment = record.id.clone();
    if show_description && !record.description.is_empty() {
        segment.push_str(&format!(" ({})", record.description));
    }
    segment.push_str(&format!(" {}%", record.charge_percent.round() as i64));
    if record.is_charging() {
        segment.push('+');
    }
    segment
}

/// One-line plain text: every battery followed by the time label.
pub fn status_line(state: &AppState, display: &DisplayConfig) -> String {
    let segments: Vec<String> = state
        .snapshot
        .iter()
        .map(|b| battery_segment(b, display.show_description))
        .collect();
    let batteries = if segments.is_empty() {
        "n/a".to_string()
    } else {
        segments.join(" ")
    };
    format!("{batteries}  {}", time_label(state))
}

#[derive(Debug, Serialize)]
struct PanelOutput {
    text: String,
    tooltip: String,
    class: &'static str,
    percentage: u8,
}

/// One-line JSON object for text-panel hosts (`text`, `tooltip`, `class`,
/// `percentage`).
pub fn panel_json(state: &AppState, display: &DisplayConfig) -> serde_json::Result<String> {
    serde_json::to_string(&PanelOutput {
        text: status_line(state, display),
        tooltip: tooltip(state),
        class: css_class(state, display.low_percent),
        percentage: mean_charge(state).round().clamp(0.0, 100.0) as u8,
    })
}

/// Render in whichever format the config asks for.
pub fn render(state: &AppState, display: &DisplayConfig) -> serde_json::Result<String> {
    match display.format {
        OutputFormat::Text => Ok(status_line(state, display)),
        OutputFormat::Json => panel_json(state, display),
    }
}

fn time_label(state: &AppState) -> String {
    if state.available {
        format_time_left(state.minutes_left)
    } else {
        UNKNOWN_TIME.to_string()
    }
}

fn tooltip(state: &AppState) -> String {
    let mut lines: Vec<String> = state
        .snapshot
        .iter()
        .map(|b| {
            let mut line = b.id.clone();
            if !b.description.is_empty() {
                line.push_str(&format!(" ({})", b.description));
            }
            line.push_str(&format!(
                ": {}, {:.1}%, {:.2}/{:.2} Wh, {:.2} W",
                b.status, b.charge_percent, b.energy_now_wh, b.energy_full_wh, b.power_now_w
            ));
            line
        })
        .collect();
    if let Some(error) = state.last_error.as_deref().filter(|_| !state.available) {
        lines.push(format!("Unavailable: {error}"));
    }
    lines.join("\n")
}

fn css_class(state: &AppState, low_percent: f64) -> &'static str {
    if !state.available {
        return "unavailable";
    }
    let batteries = || state.snapshot.iter();
    if batteries().any(BatteryRecord::is_charging) {
        "charging"
    } else if batteries().any(|b| b.status == BatteryStatus::Discharging) {
        if mean_charge(state) < low_percent {
            "low"
        } else {
            "discharging"
        }
    } else {
        "idle"
    }
}

fn mean_charge(state: &AppState) -> f64 {
    let count = state.snapshot.len();
    if count == 0 {
        return 0.0;
    }
    state.snapshot.iter().map(|b| b.charge_percent).sum::<f64>() / count as f64
}
