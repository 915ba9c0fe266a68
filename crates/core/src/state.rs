use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::event::BatteryUpdate;

/// Charging state as reported by the power-supply `status` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryStatus {
    Charging,
    Discharging,
    /// External power connected but the charge threshold holds charging off.
    NotCharging,
    Full,
    #[default]
    Unknown,
}

impl BatteryStatus {
    /// Map a raw status string (`"Charging"`, `"Not charging"`, ...) onto a
    /// variant. A trailing parenthesised remark is ignored; anything
    /// unrecognised becomes [`BatteryStatus::Unknown`].
    pub fn from_report(raw: &str) -> Self {
        let text = raw.split('(').next().unwrap_or("").trim();
        match text.to_ascii_lowercase().as_str() {
            "charging" => Self::Charging,
            "discharging" => Self::Discharging,
            "not charging" => Self::NotCharging,
            "full" => Self::Full,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Charging => "Charging",
            Self::Discharging => "Discharging",
            Self::NotCharging => "Not charging",
            Self::Full => "Full",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_charging(&self) -> bool {
        matches!(self, Self::Charging)
    }
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One physical battery as seen in the latest report.
///
/// Energies are in watt-hours and power in watts. Fields the report did not
/// carry keep their defaults (zero, `Unknown`, `None`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatteryRecord {
    /// Device name, e.g. `"BAT0"`. Unique within a [`Snapshot`].
    pub id: String,
    /// Free-text label from the block header, e.g. `"Main / Internal"`.
    pub description: String,
    /// State of charge (0.0 – 100.0).
    pub charge_percent: f64,
    pub status: BatteryStatus,
    /// Last full-charge capacity.
    pub energy_full_wh: f64,
    /// Energy currently stored.
    pub energy_now_wh: f64,
    /// Magnitude of the instantaneous charge or discharge rate.
    pub power_now_w: f64,

    // Informational only; never used by the estimator.
    pub energy_full_design_wh: Option<f64>,
    pub cycle_count: Option<u32>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    /// Full-charge capacity relative to design capacity (0.0 – 100.0).
    pub capacity_percent: Option<f64>,
    pub start_threshold: Option<u8>,
    pub stop_threshold: Option<u8>,
    pub force_discharge: Option<bool>,
}

impl BatteryRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn is_charging(&self) -> bool {
        self.status.is_charging()
    }
}

/// Every battery found in one report, keyed and ordered by id.
///
/// A snapshot is built from scratch on every parse and replaces the previous
/// one wholesale; batteries missing from the newer report disappear.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    batteries: BTreeMap<String, BatteryRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any earlier record with the same id.
    pub fn insert(&mut self, record: BatteryRecord) -> Option<BatteryRecord> {
        self.batteries.insert(record.id.clone(), record)
    }

    pub fn get(&self, id: &str) -> Option<&BatteryRecord> {
        self.batteries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.batteries.contains_key(id)
    }

    /// Records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &BatteryRecord> {
        self.batteries.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.batteries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.batteries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batteries.is_empty()
    }
}

impl FromIterator<BatteryRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = BatteryRecord>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a BatteryRecord;
    type IntoIter = std::collections::btree_map::Values<'a, String, BatteryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.batteries.values()
    }
}

/// What the presentation layer renders from.
///
/// A failed refresh never clears the last good snapshot; it only flips
/// `available` so the output can show the data as stale.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Last snapshot from a report that matched at least one battery.
    pub snapshot: Snapshot,
    /// Minutes remaining from the last good snapshot.
    pub minutes_left: Option<f64>,
    /// `false` while the latest refresh produced no battery data.
    pub available: bool,
    /// When `snapshot` was taken.
    pub updated_at: Option<DateTime<Local>>,
    /// Reason the latest refresh failed, if it did.
    pub last_error: Option<String>,
}

impl AppState {
    /// Fold a refresh result into the state.
    pub fn apply(&mut self, update: BatteryUpdate) {
        if update.ok {
            self.snapshot = update.snapshot;
            self.minutes_left = update.minutes_left;
            self.available = true;
            self.updated_at = Some(update.taken_at);
            self.last_error = None;
        } else {
            self.available = false;
            self.last_error = Some(
                update
                    .error
                    .unwrap_or_else(|| "no battery found in report".to_string()),
            );
        }
    }

    /// `true` once at least one good snapshot has been received.
    pub fn has_data(&self) -> bool {
        self.updated_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RefreshTrigger;

    fn update(ok: bool, ids: &[&str]) -> BatteryUpdate {
        BatteryUpdate {
            trigger: RefreshTrigger::Timer,
            snapshot: ids.iter().map(|id| BatteryRecord::new(*id)).collect(),
            ok,
            minutes_left: ok.then_some(42.0),
            error: None,
            taken_at: Local::now(),
        }
    }

    #[test]
    fn status_from_report_text() {
        assert_eq!(BatteryStatus::from_report("Charging"), BatteryStatus::Charging);
        assert_eq!(BatteryStatus::from_report(" Discharging "), BatteryStatus::Discharging);
        assert_eq!(BatteryStatus::from_report("Not charging"), BatteryStatus::NotCharging);
        assert_eq!(BatteryStatus::from_report("Full"), BatteryStatus::Full);
        assert_eq!(
            BatteryStatus::from_report("Discharging (on battery)"),
            BatteryStatus::Discharging
        );
        assert_eq!(BatteryStatus::from_report("Invalid"), BatteryStatus::Unknown);
        assert_eq!(BatteryStatus::from_report(""), BatteryStatus::Unknown);
    }

    #[test]
    fn snapshot_iterates_in_id_order() {
        let snapshot: Snapshot = ["BAT1", "BAT0", "BAT2"]
            .into_iter()
            .map(BatteryRecord::new)
            .collect();
        let ids: Vec<&str> = snapshot.ids().collect();
        assert_eq!(ids, ["BAT0", "BAT1", "BAT2"]);
    }

    #[test]
    fn failed_update_keeps_previous_snapshot() {
        let mut state = AppState::default();
        state.apply(update(true, &["BAT0"]));
        assert!(state.available);

        state.apply(update(false, &[]));
        assert!(!state.available);
        assert!(state.snapshot.contains("BAT0"));
        assert_eq!(state.minutes_left, Some(42.0));
        assert!(state.last_error.is_some());
    }

    #[test]
    fn good_update_replaces_snapshot() {
        let mut state = AppState::default();
        state.apply(update(true, &["BAT0", "BAT1"]));
        state.apply(update(true, &["BAT0"]));
        assert_eq!(state.snapshot.len(), 1);
        assert!(!state.snapshot.contains("BAT1"));
    }
}
