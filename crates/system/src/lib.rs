pub mod command;
pub mod estimate;
pub mod label;
pub mod power_events;
pub mod report;

pub use estimate::{
    estimate_minutes_remaining, total_energy_full, total_energy_now, total_power_now,
};
pub use report::parse_report;

use battbar_config::MonitorConfig;
use battbar_core::{BatteryUpdate, RefreshTrigger, Snapshot};
use chrono::Local;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, warn};

/// Spawn a background Tokio task that refreshes battery data on a timer and
/// on every power event, forwarding each [`BatteryUpdate`] through the
/// returned channel.
///
/// Refreshes never overlap: triggers arriving while a report is being read
/// wait for the next cycle. The task stops automatically when the receiver
/// is dropped.
pub fn spawn_monitor(config: MonitorConfig) -> mpsc::Receiver<BatteryUpdate> {
    let (tx, rx) = mpsc::channel(4);

    tokio::spawn(async move {
        let mut events = if config.power_event_command.is_empty() {
            None
        } else {
            Some(power_events::spawn_power_events(
                config.power_event_command.clone(),
                config.error_backoff(),
            ))
        };
        let mut trigger = RefreshTrigger::Startup;

        loop {
            let update = refresh(&config.report_command, trigger).await;
            let delay = next_delay(&update, &config);

            if tx.send(update).await.is_err() {
                break; // all receivers dropped
            }

            trigger = tokio::select! {
                _ = time::sleep(delay) => RefreshTrigger::Timer,
                _ = next_power_event(&mut events) => RefreshTrigger::PowerEvent,
                _ = tx.closed() => break,
            };
        }
    });

    rx
}

/// Run one refresh cycle: report command, parse, estimate.
///
/// A failing command is not fatal; it produces an update with `ok == false`
/// and the error text.
pub async fn refresh(report_command: &[String], trigger: RefreshTrigger) -> BatteryUpdate {
    let taken_at = Local::now();

    match command::run_report(report_command).await {
        Ok(text) => {
            let (snapshot, ok) = parse_report(&text);
            let minutes_left = estimate_minutes_remaining(&snapshot);
            if ok {
                debug!(
                    ?trigger,
                    batteries = snapshot.len(),
                    ?minutes_left,
                    "battery report parsed"
                );
            } else {
                warn!("Battery report matched no battery block");
            }
            BatteryUpdate {
                trigger,
                snapshot,
                ok,
                minutes_left,
                error: None,
                taken_at,
            }
        }
        Err(e) => {
            warn!("Battery report failed: {e}");
            BatteryUpdate {
                trigger,
                snapshot: Snapshot::new(),
                ok: false,
                minutes_left: None,
                error: Some(e.to_string()),
                taken_at,
            }
        }
    }
}

/// How long to wait before the next timed refresh.
///
/// A failed command backs off; a good report without an estimate (no power
/// reading yet, typically right after plugging in) is re-polled quickly.
pub fn next_delay(update: &BatteryUpdate, config: &MonitorConfig) -> Duration {
    if update.error.is_some() {
        config.error_backoff()
    } else if update.ok && update.minutes_left.is_none() {
        config.fast_interval()
    } else {
        config.interval()
    }
}

async fn next_power_event(events: &mut Option<mpsc::Receiver<()>>) {
    if let Some(rx) = events.as_mut() {
        if rx.recv().await.is_some() {
            return;
        }
    }
    if events.take().is_some() {
        warn!("Power event listener stopped; falling back to interval polling");
    }
    std::future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
+++ ThinkPad Battery Status: BAT0 (Main / Internal)
/sys/class/power_supply/BAT0/energy_full                    =  20000 [mWh]
/sys/class/power_supply/BAT0/energy_now                     =  10000 [mWh]
/sys/class/power_supply/BAT0/power_now                      =   5000 [mW]
/sys/class/power_supply/BAT0/status                         = Discharging

Charge                                                      =   50.0 [%]
";

    fn report_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("battbar-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn cat(path: &std::path::Path) -> Vec<String> {
        vec!["cat".into(), path.display().to_string()]
    }

    fn config_for(report_command: Vec<String>) -> MonitorConfig {
        MonitorConfig {
            report_command,
            power_event_command: Vec::new(),
            ..MonitorConfig::default()
        }
    }

    fn update(ok: bool, minutes_left: Option<f64>, error: Option<&str>) -> BatteryUpdate {
        BatteryUpdate {
            trigger: RefreshTrigger::Timer,
            snapshot: Snapshot::new(),
            ok,
            minutes_left,
            error: error.map(str::to_string),
            taken_at: Local::now(),
        }
    }

    #[tokio::test]
    async fn refresh_parses_and_estimates() {
        let path = report_file("refresh.txt", REPORT);
        let update = refresh(&cat(&path), RefreshTrigger::Timer).await;
        std::fs::remove_file(&path).ok();

        assert!(update.ok);
        assert!(update.error.is_none());
        assert_eq!(update.snapshot.get("BAT0").unwrap().charge_percent, 50.0);
        assert_eq!(update.minutes_left, Some(120.0));
    }

    #[tokio::test]
    async fn refresh_reports_command_failure() {
        let argv = vec!["/nonexistent/tlp-stat".to_string()];
        let update = refresh(&argv, RefreshTrigger::PowerEvent).await;

        assert!(!update.ok);
        assert!(update.snapshot.is_empty());
        assert!(update.error.is_some());
        assert_eq!(update.trigger, RefreshTrigger::PowerEvent);
    }

    #[tokio::test]
    async fn refresh_with_unparsable_output() {
        let argv = vec!["echo".to_string(), "no battery here".to_string()];
        let update = refresh(&argv, RefreshTrigger::Timer).await;

        assert!(!update.ok);
        assert!(update.error.is_none());
        assert_eq!(update.minutes_left, None);
    }

    #[test]
    fn delay_selection() {
        let config = MonitorConfig::default();
        assert_eq!(next_delay(&update(true, Some(60.0), None), &config), Duration::from_secs(20));
        assert_eq!(next_delay(&update(true, None, None), &config), Duration::from_secs(2));
        assert_eq!(next_delay(&update(false, None, None), &config), Duration::from_secs(20));
        assert_eq!(
            next_delay(&update(false, None, Some("exit status: 1")), &config),
            Duration::from_secs(30)
        );
    }

    #[tokio::test]
    async fn monitor_emits_startup_update() {
        let path = report_file("monitor.txt", REPORT);
        let mut rx = spawn_monitor(config_for(cat(&path)));

        let first = time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(first.trigger, RefreshTrigger::Startup);
        assert!(first.ok);
    }

    #[tokio::test]
    async fn power_event_triggers_refresh() {
        let path = report_file("events.txt", REPORT);
        let config = MonitorConfig {
            interval_secs: 3600,
            power_event_command: vec!["sh".into(), "-c".into(), "sleep 0.3; echo changed; sleep 10".into()],
            ..config_for(cat(&path))
        };
        let mut rx = spawn_monitor(config);

        let first = time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.trigger, RefreshTrigger::Startup);

        let second = time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(second.trigger, RefreshTrigger::PowerEvent);
        assert!(second.ok);
    }
}
