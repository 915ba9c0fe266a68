use battbar_core::{BattError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// First line printed by `upower --monitor`; it announces the stream and is
/// not an event.
const UPOWER_BANNER: &str = "Monitoring activity from the power daemon";

enum Exit {
    /// The monitor process ended on its own.
    Ended,
    /// Nobody is listening any more.
    ReceiverGone,
}

/// Spawn a background task that runs the power-event monitor command and
/// fires once for every line it prints.
///
/// The channel holds a single pending trigger, so a burst of lines collapses
/// into one refresh. The monitor process is respawned after `backoff` if it
/// exits or cannot be started, and killed once the receiver is dropped.
pub fn spawn_power_events(argv: Vec<String>, backoff: Duration) -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        loop {
            match listen(&argv, &tx).await {
                Ok(Exit::ReceiverGone) => return,
                Ok(Exit::Ended) => {
                    warn!("Power monitor exited; restarting in {}s…", backoff.as_secs())
                }
                Err(e) => error!("{e}; retrying in {}s…", backoff.as_secs()),
            }

            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = tx.closed() => return,
            }
        }
    });

    rx
}

async fn listen(argv: &[String], tx: &mpsc::Sender<()>) -> Result<Exit> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| BattError::Monitor("power event command is empty".into()))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| BattError::Monitor(format!("cannot run '{program}': {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| BattError::Monitor("power monitor has no stdout".into()))?;
    let mut lines = BufReader::new(stdout).lines();

    info!("Listening for power events from '{program}'");

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if is_banner(&line) {
                        continue;
                    }
                    debug!("power event: {line}");
                    if let Err(mpsc::error::TrySendError::Closed(())) = tx.try_send(()) {
                        return Ok(Exit::ReceiverGone);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    return Err(BattError::Monitor(format!("reading '{program}' output: {e}")));
                }
            },
            _ = tx.closed() => return Ok(Exit::ReceiverGone),
        }
    }

    let status = child.wait().await?;
    debug!("'{program}' exited with {status}");
    Ok(Exit::Ended)
}

fn is_banner(line: &str) -> bool {
    line.starts_with(UPOWER_BANNER)
}
