//! Render CLI command builder and runner.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{parse_progress_line, RenderProgress};

/// Builder for render CLI invocations.
#[derive(Debug, Clone)]
pub struct RenderCommand {
    program: String,
    args: Vec<String>,
}

impl RenderCommand {
    /// Create a command for a program resolved through `PATH`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Pass the render props through a file.
    pub fn props_file(self, path: impl AsRef<Path>) -> Self {
        let flag = format!("--props={}", path.as_ref().to_string_lossy());
        self.arg(flag)
    }

    /// Positional output path.
    pub fn output(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_string_lossy().to_string();
        self.arg(path)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn build_args(&self) -> Vec<String> {
        self.args.clone()
    }
}

/// Captured output of a finished render invocation.
#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl RenderOutput {
    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

enum Exit {
    Finished(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

/// Runner for render commands with progress tracking, timeout and cancellation.
#[derive(Debug, Clone, Default)]
pub struct RenderRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout: Option<Duration>,
}

impl RenderRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the subprocess once the receiver flips to `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run a command, reporting every parsed progress line.
    ///
    /// A non-zero exit becomes [`MediaError::RenderFailed`] carrying the
    /// captured output so callers can classify it.
    pub async fn run_with_progress<F>(
        &self,
        cmd: &RenderCommand,
        progress_callback: F,
    ) -> MediaResult<RenderOutput>
    where
        F: Fn(RenderProgress) + Send + Sync + 'static,
    {
        let program = check_render_cli(cmd.program())?;
        let args = cmd.build_args();
        debug!("Running render CLI: {} {}", cmd.program(), args.join(" "));

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = command.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("stderr not captured"))?;

        let callback = Arc::new(progress_callback);
        let stdout_task = tokio::spawn(collect_lines(stdout, Arc::clone(&callback)));
        let stderr_task = tokio::spawn(collect_lines(stderr, callback));

        let status = match self.wait_for_exit(&mut child).await {
            Ok(status) => status,
            Err(e) => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(e);
            }
        };

        let output = RenderOutput {
            stdout: stdout_task.await.unwrap_or_default(),
            stderr: stderr_task.await.unwrap_or_default(),
            exit_code: status.code(),
        };
        metrics::histogram!("vrender_render_subprocess_seconds")
            .record(started.elapsed().as_secs_f64());

        if status.success() {
            Ok(output)
        } else {
            Err(MediaError::render_failed(
                "Render CLI exited with non-zero status",
                Some(output.combined()),
                status.code(),
            ))
        }
    }

    async fn wait_for_exit(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        let timeout = self.timeout;
        let deadline = async move {
            match timeout {
                Some(limit) => {
                    tokio::time::sleep(limit).await;
                    limit
                }
                None => std::future::pending().await,
            }
        };

        let exit = tokio::select! {
            status = child.wait() => Exit::Finished(status),
            limit = deadline => Exit::TimedOut(limit),
            _ = cancelled(self.cancel_rx.clone()) => Exit::Cancelled,
        };

        match exit {
            Exit::Finished(status) => Ok(status?),
            Exit::TimedOut(limit) => {
                warn!("Render timed out after {:?}, killing process", limit);
                let _ = child.kill().await;
                Err(MediaError::Timeout(limit))
            }
            Exit::Cancelled => {
                info!("Render cancelled, killing process");
                let _ = child.kill().await;
                Err(MediaError::Cancelled)
            }
        }
    }
}

/// Resolves once the flag is raised; never if there is no receiver.
async fn cancelled(cancel_rx: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = cancel_rx else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

async fn collect_lines<R, F>(reader: R, callback: Arc<F>) -> String
where
    R: AsyncRead + Unpin,
    F: Fn(RenderProgress) + Send + Sync + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    let mut captured = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(progress) = parse_progress_line(&line) {
            callback(progress);
        }
        captured.push_str(&line);
        captured.push('\n');
    }
    captured
}

/// Check that the render CLI resolves.
pub fn check_render_cli(program: &str) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::RendererNotFound(program.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_command_builder() {
        let cmd = RenderCommand::new("npx")
            .args(["remotion", "render", "src/index.ts", "Main"])
            .output("/tmp/out.mp4")
            .props_file("/tmp/props.json");

        let args = cmd.build_args();
        assert_eq!(args[0], "remotion");
        assert!(args.contains(&"/tmp/out.mp4".to_string()));
        assert_eq!(args.last().unwrap(), "--props=/tmp/props.json");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let cmd = RenderCommand::new("vrender-definitely-not-installed");
        let err = RenderRunner::new().run_with_progress(&cmd, |_| {}).await.unwrap_err();
        assert!(matches!(err, MediaError::RendererNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_output_and_progress() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cmd = RenderCommand::new("sh")
            .arg("-c")
            .arg("echo 'Rendered 1/2'; echo 'Encoded 2/2' 1>&2; echo done");

        let output = RenderRunner::new()
            .run_with_progress(&cmd, move |p| sink.lock().unwrap().push(p.percentage()))
            .await
            .unwrap();

        assert!(output.stdout.contains("done"));
        assert!(output.stderr.contains("Encoded 2/2"));
        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![40, 100]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_keeps_output() {
        let cmd = RenderCommand::new("sh")
            .arg("-c")
            .arg("echo 'Rate Exceeded' 1>&2; exit 3");
        let err = RenderRunner::new().run_with_progress(&cmd, |_| {}).await.unwrap_err();
        assert_eq!(err.kind(), vrender_models::JobErrorKind::Submission);
        assert!(err.output().unwrap().contains("Rate Exceeded"));
        assert!(matches!(
            err,
            MediaError::RenderFailed {
                exit_code: Some(3),
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let cmd = RenderCommand::new("sleep").arg("5");
        let err = RenderRunner::new()
            .with_timeout(Duration::from_millis(100))
            .run_with_progress(&cmd, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Timeout(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_kills_process() {
        let (tx, rx) = watch::channel(false);
        let cmd = RenderCommand::new("sleep").arg("5");
        let runner = RenderRunner::new().with_cancel(rx);
        let handle = tokio::spawn(async move { runner.run_with_progress(&cmd, |_| {}).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, MediaError::Cancelled));
    }
}
