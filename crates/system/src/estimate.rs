//! Aggregate energy figures and the time-remaining estimate.

use battbar_core::Snapshot;

/// Energy currently stored across all batteries, in Wh.
pub fn total_energy_now(snapshot: &Snapshot) -> f64 {
    snapshot.iter().map(|b| b.energy_now_wh).sum()
}

/// Full-charge capacity across all batteries, in Wh.
pub fn total_energy_full(snapshot: &Snapshot) -> f64 {
    snapshot.iter().map(|b| b.energy_full_wh).sum()
}

/// Combined charge/discharge rate, in W.
pub fn total_power_now(snapshot: &Snapshot) -> f64 {
    snapshot.iter().map(|b| b.power_now_w).sum()
}

/// Minutes until full or empty.
///
/// A charging battery takes priority: the first one in id order gives its
/// own time to full and every other battery is ignored. With nothing
/// charging the result is the combined time to empty. Returns `None` when
/// the relevant power figure is zero, including for an empty snapshot.
pub fn estimate_minutes_remaining(snapshot: &Snapshot) -> Option<f64> {
    if let Some(charging) = snapshot.iter().find(|b| b.is_charging()) {
        return minutes(
            charging.energy_full_wh - charging.energy_now_wh,
            charging.power_now_w,
        );
    }
    minutes(total_energy_now(snapshot), total_power_now(snapshot))
}

fn minutes(energy_wh: f64, power_w: f64) -> Option<f64> {
    if power_w == 0.0 {
        return None;
    }
    let minutes = 60.0 * energy_wh / power_w;
    minutes.is_finite().then_some(minutes)
}
