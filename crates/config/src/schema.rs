use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure parsed from `battbar.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BattConfig {
    /// How and when battery data is collected.
    pub monitor: MonitorConfig,
    /// How the status line is rendered.
    pub display: DisplayConfig,
}

/// Refresh scheduling and the external commands involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Regular poll interval in seconds.
    pub interval_secs: u64,
    /// Poll interval used while no estimate is available.
    pub fast_interval_secs: u64,
    /// Delay before respawning a failed power-event monitor.
    pub error_backoff_secs: u64,
    /// Argv of the battery report command.
    pub report_command: Vec<String>,
    /// Argv of the power-event monitor; empty disables event triggers.
    pub power_event_command: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs:       20,
            fast_interval_secs:  2,
            error_backoff_secs:  30,
            report_command:      argv(&["sudo", "/usr/bin/tlp-stat", "-b"]),
            power_event_command: argv(&["/usr/bin/upower", "--monitor"]),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn fast_interval(&self) -> Duration {
        Duration::from_secs(self.fast_interval_secs.max(1))
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs.max(1))
    }
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub format: OutputFormat,
    /// Append the header description to each battery segment.
    pub show_description: bool,
    /// Charge percentage below which a discharging battery counts as low.
    pub low_percent: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            format:           OutputFormat::Text,
            show_description: false,
            low_percent:      10.0,
        }
    }
}

/// Status line encoding written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `BAT0 58% BAT1 97%  02:15`
    #[default]
    Text,
    /// One JSON object per line with `text`, `tooltip` and `class`.
    Json,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: BattConfig = toml::from_str(
            r#"
            [monitor]
            interval_secs = 60

            [display]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.monitor.interval_secs, 60);
        assert_eq!(config.monitor.fast_interval_secs, 2);
        assert_eq!(config.monitor.report_command[1], "/usr/bin/tlp-stat");
        assert_eq!(config.display.format, OutputFormat::Json);
        assert_eq!(config.display.low_percent, 10.0);
    }

    #[test]
    fn empty_file_is_default() {
        let config: BattConfig = toml::from_str("").unwrap();
        assert_eq!(config, BattConfig::default());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let monitor = MonitorConfig {
            interval_secs: 0,
            ..MonitorConfig::default()
        };
        assert_eq!(monitor.interval(), Duration::from_secs(1));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let result: Result<BattConfig, _> = toml::from_str("[display]\nformat = \"xml\"");
        assert!(result.is_err());
    }
}
