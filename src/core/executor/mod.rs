//! Runs a saved script as a child process with a cleared environment, a
//! wall-clock limit and bounded output capture.

use crate::core::config::ExecutorConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use uuid::Uuid;

const READ_CHUNK_BYTES: usize = 8192;

/// How long capture tasks may keep draining pipes after the child is gone.
const CAPTURE_DRAIN_LIMIT: Duration = Duration::from_secs(1);

/// Where and how the child runs.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEnvironment {
    pub working_dir: PathBuf,
    /// Variables set on top of the passthrough allowlist.
    pub vars: BTreeMap<String, String>,
}

impl ExecutionEnvironment {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            vars: BTreeMap::new(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub script_path: PathBuf,
    /// Overrides the configured timeout when set.
    pub timeout: Option<Duration>,
    pub environment: ExecutionEnvironment,
}

impl ExecutionRequest {
    pub fn new(script_path: impl Into<PathBuf>, environment: ExecutionEnvironment) -> Self {
        Self {
            script_path: script_path.into(),
            timeout: None,
            environment,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Classification of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success,
    RuntimeFailure,
    Timeout,
    LaunchFailure,
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExecutionOutcome::Success => "success",
            ExecutionOutcome::RuntimeFailure => "runtime_failure",
            ExecutionOutcome::Timeout => "timeout",
            ExecutionOutcome::LaunchFailure => "launch_failure",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub run_id: Uuid,
    pub outcome: ExecutionOutcome,
    pub exit_code: Option<i32>,
    /// Terminating signal, when the child died from one.
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub elapsed_ms: u64,
    pub started_at: DateTime<Utc>,
    /// Launch failure or timeout detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.outcome == ExecutionOutcome::Success
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    fn launch_failure(run_id: Uuid, started_at: DateTime<Utc>, start: Instant, message: String) -> Self {
        Self {
            run_id,
            outcome: ExecutionOutcome::LaunchFailure,
            exit_code: None,
            signal: None,
            stdout: String::new(),
            stderr: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            elapsed_ms: start.elapsed().as_millis() as u64,
            started_at,
            message: Some(message),
        }
    }
}

/// Byte buffer that keeps at most `limit` bytes and counts what it drops.
#[derive(Debug, Clone)]
pub struct BoundedBuffer {
    limit: usize,
    data: Vec<u8>,
    dropped: u64,
}

impl BoundedBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            data: Vec::new(),
            dropped: 0,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        let room = self.limit.saturating_sub(self.data.len());
        let kept = bytes.len().min(room);
        self.data.extend_from_slice(&bytes[..kept]);
        self.dropped += (bytes.len() - kept) as u64;
    }

    pub fn is_truncated(&self) -> bool {
        self.dropped > 0
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lossy UTF-8 text with a truncation marker when bytes were dropped.
    pub fn to_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.data).into_owned();
        if self.is_truncated() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&format!("...[output truncated after {} bytes]", self.limit));
        }
        text
    }
}

/// Seam between the pipeline and process spawning.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, request: ExecutionRequest) -> ExecutionResult;
}

/// Process-backed runner.
#[derive(Debug, Clone)]
pub struct WorkflowExecutor {
    interpreter: String,
    timeout: Duration,
    grace_period: Duration,
    output_limit: usize,
    passthrough_env: Vec<String>,
}

impl WorkflowExecutor {
    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            timeout: config.timeout(),
            grace_period: config.grace_period(),
            output_limit: config.output_limit_bytes,
            passthrough_env: config.passthrough_env.clone(),
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one script to completion, timeout or launch failure.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let timeout = request.timeout.unwrap_or(self.timeout);

        if !request.script_path.is_file() {
            let message = format!("script not found: {}", request.script_path.display());
            tracing::warn!(run_id = %run_id, %message, "launch failed");
            return ExecutionResult::launch_failure(run_id, started_at, start, message);
        }

        let mut command = self.build_command(&request);
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                let message = format!("failed to start '{}': {}", self.interpreter, err);
                tracing::warn!(run_id = %run_id, %message, "launch failed");
                return ExecutionResult::launch_failure(run_id, started_at, start, message);
            }
        };

        tracing::info!(
            run_id = %run_id,
            pid = child.id().unwrap_or(0),
            script = %request.script_path.display(),
            timeout_ms = timeout.as_millis() as u64,
            "script started"
        );

        let stdout = Arc::new(Mutex::new(BoundedBuffer::new(self.output_limit)));
        let stderr = Arc::new(Mutex::new(BoundedBuffer::new(self.output_limit)));
        let stdout_task = spawn_capture(child.stdout.take(), Arc::clone(&stdout));
        let stderr_task = spawn_capture(child.stderr.take(), Arc::clone(&stderr));

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = tokio::time::sleep(timeout) => None,
        };

        let (outcome, status, message) = match waited {
            Some(Ok(status)) => {
                let outcome = if status.success() {
                    ExecutionOutcome::Success
                } else {
                    ExecutionOutcome::RuntimeFailure
                };
                (outcome, Some(status), None)
            }
            Some(Err(err)) => (
                ExecutionOutcome::RuntimeFailure,
                None,
                Some(format!("failed to wait for script: {}", err)),
            ),
            None => {
                tracing::warn!(run_id = %run_id, timeout_ms = timeout.as_millis() as u64, "script timed out");
                self.terminate(&mut child).await;
                (
                    ExecutionOutcome::Timeout,
                    None,
                    Some(format!("timed out after {}", humantime::format_duration(timeout))),
                )
            }
        };

        drain(stdout_task).await;
        drain(stderr_task).await;
        let (stdout_text, stdout_truncated) = snapshot(&stdout);
        let (stderr_text, stderr_truncated) = snapshot(&stderr);

        let result = ExecutionResult {
            run_id,
            outcome,
            exit_code: status.as_ref().and_then(ExitStatus::code),
            signal: status.as_ref().and_then(exit_signal),
            stdout: stdout_text,
            stderr: stderr_text,
            stdout_truncated,
            stderr_truncated,
            elapsed_ms: start.elapsed().as_millis() as u64,
            started_at,
            message,
        };

        tracing::info!(
            run_id = %run_id,
            outcome = %result.outcome,
            exit_code = result.exit_code.unwrap_or(-1),
            elapsed_ms = result.elapsed_ms,
            "script finished"
        );
        result
    }

    fn build_command(&self, request: &ExecutionRequest) -> Command {
        let mut command = Command::new(&self.interpreter);
        command
            .arg(&request.script_path)
            .current_dir(&request.environment.working_dir)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for key in &self.passthrough_env {
            if let Ok(value) = std::env::var(key) {
                command.env(key, value);
            }
        }
        command.envs(&request.environment.vars);

        #[cfg(unix)]
        command.process_group(0);

        command
    }

    /// SIGTERM the child's process group, wait out the grace period, then
    /// SIGKILL whatever is left and reap the child.
    async fn terminate(&self, child: &mut Child) {
        let pid = child.id();
        signal_group(pid, Signal::Terminate);

        match tokio::time::timeout(self.grace_period, child.wait()).await {
            Ok(_) => {
                signal_group(pid, Signal::Kill);
            }
            Err(_) => {
                tracing::warn!(pid = pid.unwrap_or(0), "grace period elapsed, killing script");
                signal_group(pid, Signal::Kill);
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
    }
}

#[async_trait]
impl ScriptRunner for WorkflowExecutor {
    async fn run(&self, request: ExecutionRequest) -> ExecutionResult {
        self.execute(request).await
    }
}

enum Signal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: Option<u32>, signal: Signal) {
    let Some(pid) = pid else {
        return;
    };
    let signal = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // The child leads its own group, so the negative pid addresses every
    // process it spawned as well.
    unsafe {
        libc::kill(-(pid as i32), signal);
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: Option<u32>, _signal: Signal) {}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

fn spawn_capture<R>(reader: Option<R>, buffer: Arc<Mutex<BoundedBuffer>>) -> Option<JoinHandle<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = reader?;
    Some(tokio::spawn(async move {
        let mut chunk = vec![0u8; READ_CHUNK_BYTES];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(read) => {
                    if let Ok(mut buffer) = buffer.lock() {
                        buffer.push(&chunk[..read]);
                    }
                }
            }
        }
    }))
}

async fn drain(task: Option<JoinHandle<()>>) {
    let Some(mut task) = task else {
        return;
    };
    if tokio::time::timeout(CAPTURE_DRAIN_LIMIT, &mut task).await.is_err() {
        task.abort();
    }
}

fn snapshot(buffer: &Arc<Mutex<BoundedBuffer>>) -> (String, bool) {
    match buffer.lock() {
        Ok(buffer) => (buffer.to_text(), buffer.is_truncated()),
        Err(_) => (String::new(), false),
    }
}
