pub mod error;
pub mod event;
pub mod state;

pub use error::{BattError, Result};
pub use event::{BatteryUpdate, Message, RefreshTrigger};
pub use state::{AppState, BatteryRecord, BatteryStatus, Snapshot};
