//! Bounded execution of black-box stack commands.
//!
//! Every engine/orchestrator query goes through here: spawn, capture
//! both streams, enforce a deadline. Failures come back as values, never
//! as panics, so one broken command cannot take down a diagnostic run.

use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured output is capped so a runaway log stream cannot balloon the
/// report.
const MAX_CAPTURE_BYTES: usize = 64 * 1024;

/// Outcome of one bounded command invocation.
#[derive(Debug)]
pub enum CommandOutcome {
    /// Process ran to completion, with any exit code.
    Completed {
        success: bool,
        stdout: String,
        stderr: String,
    },
    /// Process exceeded its deadline and was killed.
    TimedOut,
    /// Process could not be spawned or awaited.
    Faulted(String),
}

/// Run `program` with `args` in `dir`, bounded by `timeout`.
pub async fn run_bounded(
    program: &str,
    args: &[&str],
    dir: &Path,
    timeout: Duration,
) -> CommandOutcome {
    debug!("running {} {:?} in {}", program, args, dir.display());

    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(dir).kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.output()).await {
        Err(_) => CommandOutcome::TimedOut,
        Ok(Err(e)) => CommandOutcome::Faulted(e.to_string()),
        Ok(Ok(output)) => CommandOutcome::Completed {
            success: output.status.success(),
            stdout: capture(&output.stdout),
            stderr: capture(&output.stderr),
        },
    }
}

fn capture(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_CAPTURE_BYTES {
        return text.into_owned();
    }
    let mut cut = MAX_CAPTURE_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n[output truncated]", &text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cwd() -> PathBuf {
        std::env::current_dir().unwrap()
    }

    #[tokio::test]
    async fn captures_stdout_on_success() {
        let outcome = run_bounded("echo", &["hello"], &cwd(), Duration::from_secs(5)).await;
        match outcome {
            CommandOutcome::Completed { success, stdout, .. } => {
                assert!(success);
                assert_eq!(stdout.trim(), "hello");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_is_completed_not_faulted() {
        let outcome = run_bounded("false", &[], &cwd(), Duration::from_secs(5)).await;
        match outcome {
            CommandOutcome::Completed { success, .. } => assert!(!success),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_binary_faults() {
        let outcome = run_bounded(
            "definitely-not-a-real-binary",
            &[],
            &cwd(),
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(outcome, CommandOutcome::Faulted(_)));
    }

    #[tokio::test]
    async fn deadline_is_enforced() {
        let outcome = run_bounded("sleep", &["5"], &cwd(), Duration::from_millis(100)).await;
        assert!(matches!(outcome, CommandOutcome::TimedOut));
    }

    #[test]
    fn capture_truncates_on_char_boundary() {
        let big = "é".repeat(MAX_CAPTURE_BYTES);
        let captured = capture(big.as_bytes());
        assert!(captured.ends_with("[output truncated]"));
    }
}
