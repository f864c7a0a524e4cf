//! Exec command: run a program under a retry policy.

use anyhow::{Context, Result};
use rtry_core::config::{RtryConfig, SwallowMode};
use rtry_core::retry::{
    AttemptLogger, OperationId, Outcome, RetryError, RetryPolicy, TracingLogger,
};
use rtry_core::timeout::Deadline;
use std::io;
use std::process::{Child, Command, ExitStatus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Why a single run of the program produced no exit code.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start program: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed to wait for program: {0}")]
    Wait(#[source] io::Error),
    #[error("program {0}")]
    Signalled(ExitStatus),
    #[error("program killed at deadline")]
    Killed,
}

/// Flag overrides on top of the `[retry]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOptions {
    pub attempts: Option<u32>,
    pub delay_secs: Option<f64>,
    pub timeout_secs: Option<f64>,
    pub swallow: Option<SwallowMode>,
    pub until_code: i32,
    pub command: Vec<String>,
}

/// Logs through tracing and echoes each attempt to stderr.
struct EchoLogger;

impl AttemptLogger<i32, CommandError> for EchoLogger {
    fn log(&self, attempt: u32, outcome: Outcome<'_, i32, CommandError>, operation: &OperationId) {
        TracingLogger.log(attempt, outcome, operation);
        match outcome {
            Outcome::Value(code) => eprintln!("rtry: attempt {attempt}: exit code {code}"),
            Outcome::Error(e) => eprintln!("rtry: attempt {attempt}: {e}"),
        }
    }
}

fn build_policy(cfg: &RtryConfig, opts: &ExecOptions) -> Result<RetryPolicy<i32, CommandError>> {
    let mut retry = cfg.retry.clone();
    if opts.attempts.is_some() {
        retry.attempts = opts.attempts;
    }
    if let Some(delay) = opts.delay_secs {
        retry.delay_secs = delay;
    }
    if opts.timeout_secs.is_some() {
        retry.timeout_secs = opts.timeout_secs;
    }
    if let Some(swallow) = opts.swallow {
        retry.swallow = swallow;
    }
    let defaults = retry.to_defaults().context("invalid retry settings")?;

    let until_code = opts.until_code;
    let policy = RetryPolicy::builder_from(&defaults)
        .until(move |code: &i32| *code == until_code)
        .logger(EchoLogger)
        .build()?;
    Ok(policy)
}

/// The child of the attempt in flight, shared between the attempt and the
/// caller so either side can kill it when the deadline fires.
type ChildSlot = Arc<Mutex<Option<Child>>>;

fn lock(slot: &ChildSlot) -> MutexGuard<'_, Option<Child>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Kill and reap the child in `slot`, if one is still running.
fn reap(slot: &ChildSlot) {
    let child = lock(slot).take();
    if let Some(mut child) = child {
        let pid = child.id();
        let _ = child.kill();
        let _ = child.wait();
        tracing::debug!(pid, "killed child at deadline");
    }
}

/// Run the program once. A deadline active on this thread kills the child
/// when it fires.
fn run_once(program: &str, args: &[String], slot: &ChildSlot) -> Result<i32, CommandError> {
    let deadline = Deadline::current();
    {
        // Spawning under the lock keeps `reap` from missing a child started
        // right as the deadline fires.
        let mut running = lock(slot);
        if deadline.as_ref().is_some_and(Deadline::is_cancelled) {
            return Err(CommandError::Killed);
        }
        let child = Command::new(program)
            .args(args)
            .spawn()
            .map_err(CommandError::Spawn)?;
        *running = Some(child);
    }

    loop {
        {
            let mut running = lock(slot);
            let Some(child) = running.as_mut() else {
                return Err(CommandError::Killed);
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    running.take();
                    return status.code().ok_or(CommandError::Signalled(status));
                }
                Ok(None) => {}
                Err(e) => {
                    if let Some(mut child) = running.take() {
                        let _ = child.kill();
                        let _ = child.wait();
                    }
                    return Err(CommandError::Wait(e));
                }
            }
        }
        match &deadline {
            Some(deadline) => {
                if deadline.sleep(POLL_INTERVAL).is_err() {
                    reap(slot);
                    return Err(CommandError::Killed);
                }
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    }
}

/// Run `opts.command` under the merged policy and return the exit code to
/// propagate. No child outlives the call.
pub fn run_exec(cfg: &RtryConfig, opts: ExecOptions) -> Result<i32> {
    let policy = build_policy(cfg, &opts)?;
    let mut command = opts.command.into_iter();
    let program = command.next().context("no program given")?;
    let args: Vec<String> = command.collect();

    let slot = ChildSlot::default();
    let running = Arc::clone(&slot);
    let operation = policy.wrap(move || run_once(&program, &args, &running));
    match operation.named("exec").call() {
        Ok(code) => Ok(code),
        Err(RetryError::Cancelled(c)) => {
            // The abandoned attempt may still be polling; kill its child here.
            reap(&slot);
            anyhow::bail!("timed out after {:?}", c.deadline())
        }
        Err(e) => Err(anyhow::Error::new(e)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use rtry_core::config::RetryConfig;
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    fn opts(command: Vec<String>) -> ExecOptions {
        ExecOptions {
            attempts: Some(2),
            delay_secs: Some(0.0),
            timeout_secs: None,
            swallow: None,
            until_code: 0,
            command,
        }
    }

    #[test]
    fn run_once_reports_exit_code() {
        let slot = ChildSlot::default();
        assert_eq!(run_once("sh", &sh("exit 3")[1..], &slot).unwrap(), 3);
        assert_eq!(run_once("true", &[], &slot).unwrap(), 0);
        assert!(lock(&slot).is_none());
    }

    #[test]
    fn run_once_spawn_failure() {
        let err = run_once("/nonexistent/rtry-test-binary", &[], &ChildSlot::default()).unwrap_err();
        assert!(matches!(err, CommandError::Spawn(_)));
    }

    #[test]
    fn exec_returns_last_code_when_never_satisfied() {
        let code = run_exec(&RtryConfig::default(), opts(sh("exit 4"))).unwrap();
        assert_eq!(code, 4);
    }

    #[test]
    fn exec_until_code_matches() {
        let mut o = opts(sh("exit 7"));
        o.until_code = 7;
        assert_eq!(run_exec(&RtryConfig::default(), o).unwrap(), 7);
    }

    #[test]
    fn exec_retries_until_success() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran-once");
        let script = format!(
            "if [ -e {p} ]; then exit 0; else touch {p}; exit 1; fi",
            p = marker.display()
        );
        assert_eq!(run_exec(&RtryConfig::default(), opts(sh(&script))).unwrap(), 0);
        assert!(marker.exists());
    }

    #[test]
    fn exec_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        let mut o = opts(sh(&format!("echo $$ > {}; exec sleep 5", pidfile.display())));
        o.attempts = Some(1);
        o.timeout_secs = Some(0.3);
        let start = Instant::now();
        let err = run_exec(&RtryConfig::default(), o).unwrap_err();
        assert!(err.to_string().starts_with("timed out"));
        assert!(start.elapsed() < Duration::from_secs(3));

        // The child must already be gone when run_exec returns.
        let pid = std::fs::read_to_string(&pidfile).unwrap();
        let alive = Command::new("kill")
            .args(["-0", pid.trim()])
            .stderr(std::process::Stdio::null())
            .status()
            .unwrap();
        assert!(!alive.success());
    }

    #[test]
    fn run_once_refuses_to_spawn_after_deadline() {
        let slot = ChildSlot::default();
        let res = rtry_core::Timeout::new(Duration::from_millis(20))
            .run({
                let slot = Arc::clone(&slot);
                move |deadline| {
                    while deadline.checkpoint().is_ok() {
                        thread::sleep(Duration::from_millis(5));
                    }
                    run_once("sleep", &["5".to_string()], &slot)
                }
            });
        assert!(res.unwrap_err().is_cancelled());
        thread::sleep(Duration::from_millis(100));
        assert!(lock(&slot).is_none());
    }

    #[test]
    fn flags_override_config() {
        let cfg = RtryConfig {
            retry: RetryConfig {
                attempts: Some(9),
                delay_secs: 2.0,
                timeout_secs: Some(60.0),
                swallow: SwallowMode::None,
            },
        };
        let mut o = opts(sh("exit 0"));
        o.swallow = Some(SwallowMode::All);
        o.timeout_secs = Some(0.0);
        let policy = build_policy(&cfg, &o).unwrap();
        assert_eq!(policy.attempts(), Some(2));
        assert_eq!(policy.timeout(), Some(Duration::ZERO));
    }

    #[test]
    fn invalid_flag_values_are_rejected() {
        let mut o = opts(sh("exit 0"));
        o.delay_secs = Some(-1.0);
        assert!(build_policy(&RtryConfig::default(), &o).is_err());
    }
}
