//! Bounded execution of an external procedure.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use mathscore_core::error::PredictorError;

/// What to run: a program, its fixed arguments, and where to run it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl ProcedureCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The command line as a single display string.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished procedure.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code, `None` when killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a failed exit into [`PredictorError::NonZeroExit`].
    pub fn into_success(self) -> Result<Self, PredictorError> {
        if self.success() {
            Ok(self)
        } else {
            Err(PredictorError::NonZeroExit {
                code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Run `command` once with `extra_args` appended, optionally feeding `stdin`.
///
/// The child is killed if `timeout` elapses or the returned future is dropped.
pub async fn run(
    command: &ProcedureCommand,
    extra_args: &[&str],
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<ProcessOutput, PredictorError> {
    let start = Instant::now();

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .args(extra_args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = &command.working_dir {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|e| PredictorError::Launch {
        command: command.display(),
        message: e.to_string(),
    })?;
    tracing::debug!(command = %command.display(), pid = ?child.id(), "procedure started");

    let input = stdin.zip(child.stdin.take());
    let feed = async move {
        if let Some((bytes, mut pipe)) = input {
            // A child that exits without reading its input closes the pipe early;
            // its exit status tells the real story.
            if let Err(e) = pipe.write_all(bytes).await {
                tracing::warn!("failed to write procedure stdin: {e}");
            }
        }
    };
    // Output is drained while stdin is fed, so a child echoing a large payload
    // never blocks on a full stdout pipe.
    let io = async move {
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        output
    };

    let output = match tokio::time::timeout(timeout, io).await {
        Ok(result) => result.map_err(|e| PredictorError::Launch {
            command: command.display(),
            message: e.to_string(),
        })?,
        Err(_) => {
            tracing::warn!(command = %command.display(), ?timeout, "procedure timed out, killed");
            return Err(PredictorError::Timeout(timeout));
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let out = ProcessOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration_ms,
    };
    tracing::debug!(exit_code = ?out.exit_code, duration_ms, "procedure finished");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ProcedureCommand {
        ProcedureCommand::new("sh").with_args(["-c", script, "procedure"])
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let output = run(&sh("echo hello"), &[], None, Duration::from_secs(10))
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn appends_extra_args() {
        let output = run(&sh("printf %s \"$1\""), &["[1,2,3]"], None, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(output.stdout, "[1,2,3]");
    }

    #[tokio::test]
    async fn feeds_stdin() {
        let output = run(&sh("cat"), &[], Some(b"{\"a\":1}"), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(output.stdout, "{\"a\":1}");
    }

    #[tokio::test]
    async fn nonzero_exit_keeps_stderr() {
        let output = run(&sh("echo boom >&2; exit 42"), &[], None, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(42));
        let err = output.into_success().unwrap_err();
        assert_eq!(
            err,
            PredictorError::NonZeroExit {
                code: Some(42),
                stderr: "boom\n".into()
            }
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_failure() {
        let cmd = ProcedureCommand::new("mathscore_nonexistent_program_xyz");
        let err = run(&cmd, &[], None, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, PredictorError::Launch { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn slow_procedure_times_out() {
        let start = Instant::now();
        let err = run(&sh("sleep 30"), &[], None, Duration::from_millis(300))
            .await
            .unwrap_err();
        assert_eq!(err, PredictorError::Timeout(Duration::from_millis(300)));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn large_stdin_is_echoed_without_blocking() {
        let payload = vec![b'x'; 1024 * 1024];
        let output = run(&sh("cat"), &[], Some(&payload), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.len(), payload.len());
    }

    #[tokio::test]
    async fn timed_out_procedure_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let marker_arg = marker.to_string_lossy().into_owned();

        let err = run(
            &sh("sleep 1; touch \"$1\""),
            &[&marker_arg],
            None,
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PredictorError::Timeout(_)));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!marker.exists(), "procedure kept running after its timeout");
    }

    #[tokio::test]
    async fn runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let cmd = sh("cat marker.txt").with_working_dir(dir.path());
        let output = run(&cmd, &[], None, Duration::from_secs(10)).await.unwrap();
        assert_eq!(output.stdout, "here");
    }

    #[test]
    fn display_joins_program_and_args() {
        let cmd = ProcedureCommand::new("python").with_args(["predict_math_score.py"]);
        assert_eq!(cmd.display(), "python predict_math_score.py");
    }
}
