use battbar_core::{BattError, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::warn;

/// Run the battery report command and return its stdout.
///
/// stdin is closed so a `sudo` that wants a password fails instead of
/// hanging. A non-zero exit only counts as failure when nothing was printed;
/// `tlp-stat` exits non-zero on some warnings while still producing a
/// usable report.
pub async fn run_report(argv: &[String]) -> Result<String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| BattError::Command("report command is empty".into()))?;

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| BattError::Command(format!("cannot run '{program}': {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stdout.trim().is_empty() {
        return Err(BattError::Command(format!(
            "'{program}' {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    warn!("'{program}' {}; parsing its output anyway", output.status);
    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn returns_stdout() {
        let out = run_report(&sh("printf 'line one\\nline two\\n'")).await.unwrap();
        assert_eq!(out, "line one\nline two\n");
    }

    #[tokio::test]
    async fn silent_failure_is_an_error() {
        let err = run_report(&sh("echo denied >&2; exit 1")).await.unwrap_err();
        assert!(matches!(err, BattError::Command(ref msg) if msg.contains("denied")));
    }

    #[tokio::test]
    async fn failing_command_with_output_is_kept() {
        let out = run_report(&sh("echo partial; exit 3")).await.unwrap();
        assert_eq!(out, "partial\n");
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let argv = vec!["/nonexistent/battbar-report".to_string()];
        assert!(matches!(run_report(&argv).await, Err(BattError::Command(_))));
    }

    #[tokio::test]
    async fn empty_command_is_an_error() {
        assert!(matches!(run_report(&[]).await, Err(BattError::Command(_))));
    }
}
