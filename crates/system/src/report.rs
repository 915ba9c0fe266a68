//! Parser for the battery section of `tlp-stat -b`.
//!
//! A report is a sequence of blocks, one per battery:
//!
//! ```text
//! +++ ThinkPad Battery Status: BAT0 (Main / Internal)
//! /sys/class/power_supply/BAT0/energy_full                    =  19760 [mWh]
//! /sys/class/power_supply/BAT0/energy_now                     =  11530 [mWh]
//! /sys/class/power_supply/BAT0/power_now                      =   6174 [mW]
//! /sys/class/power_supply/BAT0/status                         = Discharging
//!
//! tpacpi-bat.BAT0.startThreshold                              =     75 [%]
//!
//! Charge                                                      =   58.4 [%]
//! ```
//!
//! Each line is tokenised on its own; a block collects the lines between its
//! header and the next section line. Every line that names a battery must
//! name the header's battery, otherwise the whole block is dropped.

use battbar_core::{BatteryRecord, BatteryStatus, Snapshot};
use tracing::debug;

const SYSFS_PREFIX: &str = "/sys/class/power_supply/";
const TPACPI_PREFIX: &str = "tpacpi-bat.";
const STATUS_TITLE: &str = "Battery Status:";

/// One tokenised report line.
#[derive(Debug, Clone, PartialEq)]
enum Line<'a> {
    /// `+++ ThinkPad Battery Status: BAT0 (Main / Internal)`
    Header { id: &'a str, description: &'a str },
    /// Any other `+++` / `---` line; closes the current block.
    Section,
    /// `<prefix><name> = <value> [<unit>]`
    Field(Field<'a>),
    /// Blank or free-form text.
    Other,
}

#[derive(Debug, Clone, PartialEq)]
struct Field<'a> {
    /// Battery named by the line prefix; `None` for bare labels like `Charge`.
    id: Option<&'a str>,
    name: &'a str,
    value: &'a str,
    unit: Option<&'a str>,
}

/// Parse one full report.
///
/// Returns the batteries found and whether at least one block matched.
/// Malformed blocks are skipped, never reported as errors; a report with no
/// usable block yields an empty snapshot and `false`.
pub fn parse_report(text: &str) -> (Snapshot, bool) {
    let mut snapshot = Snapshot::new();
    let mut block: Option<Block> = None;

    for line in text.lines() {
        match tokenize(line) {
            Line::Header { id, description } => {
                finish(block.take(), &mut snapshot);
                block = Some(Block::new(id, description));
            }
            Line::Section => finish(block.take(), &mut snapshot),
            Line::Field(field) => {
                if let Some(block) = block.as_mut() {
                    block.accept(&field);
                }
            }
            Line::Other => {}
        }
    }
    finish(block, &mut snapshot);

    let ok = !snapshot.is_empty();
    (snapshot, ok)
}

fn finish(block: Option<Block>, snapshot: &mut Snapshot) {
    let Some(block) = block else { return };
    let id = block.record.id.clone();
    match block.into_record() {
        Ok(record) => {
            if snapshot.insert(record).is_some() {
                debug!("battery {id} reported twice; keeping the later block");
            }
        }
        Err(reason) => debug!("skipping block for battery {id}: {reason}"),
    }
}

// ── Tokenizer ────────────────────────────────────────────────────────────────

fn tokenize(line: &str) -> Line<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Line::Other;
    }
    if let Some(rest) = line.strip_prefix("+++") {
        return parse_header(rest).unwrap_or(Line::Section);
    }
    if line.starts_with("---") {
        return Line::Section;
    }

    let Some((key, value)) = line.split_once('=') else {
        return Line::Other;
    };
    let key = key.trim();
    let (value, unit) = split_unit(value.trim());

    let (id, name) = if let Some(rest) = key.strip_prefix(SYSFS_PREFIX) {
        match rest.split_once('/') {
            Some((id, name)) => (Some(id), name),
            None => return Line::Other,
        }
    } else if let Some(rest) = key.strip_prefix(TPACPI_PREFIX) {
        match rest.split_once('.') {
            Some((id, name)) => (Some(id), name),
            None => return Line::Other,
        }
    } else if is_word(key) {
        (None, key)
    } else {
        return Line::Other;
    };

    if id.is_some_and(|id| !is_word(id)) || name.is_empty() {
        return Line::Other;
    }

    Line::Field(Field { id, name, value, unit })
}

/// `[ThinkPad ]Battery Status: <id>[ (<description>)]`
fn parse_header(rest: &str) -> Option<Line<'_>> {
    let rest = rest.trim_start();
    let rest = rest.strip_prefix("ThinkPad").map(str::trim_start).unwrap_or(rest);
    let rest = rest.strip_prefix(STATUS_TITLE)?.trim_start();

    let id_end = rest
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(rest.len());
    let (id, tail) = rest.split_at(id_end);
    if !is_word(id) {
        return None;
    }

    let tail = tail.trim();
    let description = if tail.is_empty() {
        ""
    } else {
        tail.strip_prefix('(')?.strip_suffix(')')?.trim()
    };

    Some(Line::Header { id, description })
}

/// Split `"19760 [mWh]"` into `("19760", Some("mWh"))`.
fn split_unit(value: &str) -> (&str, Option<&str>) {
    if let Some(inner) = value.strip_suffix(']') {
        if let Some(open) = inner.rfind('[') {
            return (inner[..open].trim_end(), Some(inner[open + 1..].trim()));
        }
    }
    (value, None)
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ── Block assembly ───────────────────────────────────────────────────────────

struct Block {
    record: BatteryRecord,
    fields: usize,
    rejected: Option<String>,
}

impl Block {
    fn new(id: &str, description: &str) -> Self {
        let mut record = BatteryRecord::new(id);
        record.description = description.to_string();
        Self {
            record,
            fields: 0,
            rejected: None,
        }
    }

    fn accept(&mut self, field: &Field<'_>) {
        if self.rejected.is_some() {
            return;
        }
        if let Some(id) = field.id {
            if id != self.record.id {
                self.rejected = Some(format!("line for {id} inside the block"));
                return;
            }
        }
        self.fields += 1;
        if let Err(reason) = self.apply(field) {
            self.rejected = Some(format!("{}: {reason}", field.name));
        }
    }

    fn apply(&mut self, field: &Field<'_>) -> Result<(), String> {
        let r = &mut self.record;
        match field.name {
            "energy_full" => r.energy_full_wh = milli(quantity(field, "mWh")?),
            "energy_now" => r.energy_now_wh = milli(quantity(field, "mWh")?),
            "power_now" => r.power_now_w = milli(quantity(field, "mW")?),
            "status" => r.status = BatteryStatus::from_report(field.value),
            "Charge" => r.charge_percent = quantity(field, "%")?,

            "manufacturer" => r.manufacturer = text(field.value),
            "model_name" => r.model = text(field.value),
            "cycle_count" => r.cycle_count = field.value.parse().ok(),
            "energy_full_design" => {
                r.energy_full_design_wh = quantity(field, "mWh").ok().map(milli)
            }
            "Capacity" => r.capacity_percent = quantity(field, "%").ok(),
            "startThreshold" | "charge_start_threshold" | "charge_control_start_threshold" => {
                r.start_threshold = field.value.parse().ok()
            }
            "stopThreshold" | "charge_stop_threshold" | "charge_control_end_threshold" => {
                r.stop_threshold = field.value.parse().ok()
            }
            "forceDischarge" => {
                r.force_discharge = match field.value {
                    "0" => Some(false),
                    "1" => Some(true),
                    _ => None,
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn into_record(self) -> Result<BatteryRecord, String> {
        if let Some(reason) = self.rejected {
            return Err(reason);
        }
        if self.fields == 0 {
            return Err("header without fields".to_string());
        }
        Ok(self.record)
    }
}

/// A non-negative decimal number carrying exactly the expected unit.
fn quantity(field: &Field<'_>, unit: &str) -> Result<f64, String> {
    if field.unit != Some(unit) {
        return Err(format!(
            "expected [{unit}], found {}",
            field.unit.map_or("no unit".to_string(), |u| format!("[{u}]"))
        ));
    }
    let value = field.value;
    let well_formed = !value.is_empty()
        && value.chars().all(|c| c.is_ascii_digit() || c == '.')
        && value.starts_with(|c: char| c.is_ascii_digit());
    if !well_formed {
        return Err(format!("'{value}' is not a number"));
    }
    value.parse().map_err(|_| format!("'{value}' is not a number"))
}

fn milli(value: f64) -> f64 {
    value / 1000.0
}

fn text(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
