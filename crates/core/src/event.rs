use chrono::{DateTime, Local};

use crate::state::Snapshot;

/// What caused a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// First refresh after the monitor starts.
    Startup,
    /// Regular (or fast) poll interval elapsed.
    Timer,
    /// The power-event monitor printed a line.
    PowerEvent,
}

/// Result of one refresh cycle: report command, parse, estimate.
#[derive(Debug, Clone)]
pub struct BatteryUpdate {
    pub trigger: RefreshTrigger,
    /// Empty unless `ok`.
    pub snapshot: Snapshot,
    /// `false` when the report matched no battery block.
    pub ok: bool,
    /// Minutes to empty (or to full for a charging battery).
    pub minutes_left: Option<f64>,
    /// Set when the report command itself failed.
    pub error: Option<String>,
    pub taken_at: DateTime<Local>,
}

/// All messages that can flow through the application event bus.
///
/// Sources:
/// - Refresh monitor task → `Battery`
/// - Config watcher task  → `ConfigReloaded`
/// - Ctrl-C handler       → `Shutdown`
#[derive(Debug, Clone)]
pub enum Message {
    /// Fresh battery data (or a failed attempt) from the monitor.
    Battery(BatteryUpdate),
    /// Config file changed on disk; triggers a live reload.
    ConfigReloaded,
    /// Graceful shutdown requested.
    Shutdown,
}
