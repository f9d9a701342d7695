#![forbid(unsafe_code)]

//! Child-process execution for candidate programs.
//!
//! A program is written into a private scratch directory, started with the
//! configured runtime, fed its stdin, and reaped when it exits or when the
//! wall-clock deadline passes. Stdout and stderr are drained on reader
//! threads so a chatty child can never block on a full pipe.
//!
//! At the deadline the whole process tree is killed, not only the direct
//! child. Readers are waited on for a bounded time afterwards, so a
//! descendant that escaped the kill and still holds a pipe cannot hold the
//! caller past the deadline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60);
/// Per-stream capture cap; anything past it is drained and dropped.
pub const MAX_CAPTURE_BYTES: usize = 1 << 20;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// How long reader threads may keep draining once the child is reaped.
const READER_GRACE: Duration = Duration::from_millis(250);

pub const PYTHON_ENV: &str = "PZL_PYTHON";
pub const NODE_ENV: &str = "PZL_NODE";

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("runtime `{program}` not found")]
    RuntimeNotFound { program: String },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{stream} reader thread panicked")]
    ReaderPanicked { stream: &'static str },
}

impl SandboxError {
    fn io(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io { context, source }
    }
}

/// Interpreter invocation: `program args... <source file>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extension given to the written source file, without the dot.
    pub extension: String,
}

impl RuntimeCommand {
    #[must_use]
    pub fn new(program: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            extension: extension.into(),
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// `python3`, or the interpreter named by `PZL_PYTHON`.
    #[must_use]
    pub fn python() -> Self {
        Self::new(resolve_program(PYTHON_ENV, "python3"), "py")
    }

    /// `node`, or the binary named by `PZL_NODE`.
    #[must_use]
    pub fn node() -> Self {
        Self::new(resolve_program(NODE_ENV, "node"), "js")
    }

    /// Whether the runtime can be started at all (`<program> --version`).
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }
}

fn resolve_program(env_key: &str, fallback: &str) -> String {
    std::env::var(env_key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[derive(Debug, Clone, Copy)]
pub struct ProgramSpec<'a> {
    pub runtime: &'a RuntimeCommand,
    pub source: &'a str,
    pub stdin: &'a [u8],
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub elapsed_ms: u64,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

impl ProcessOutcome {
    /// Exited on its own with status 0. A timeout or non-zero exit is a
    /// failure even when stdout holds a plausible result.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Last non-empty stdout line, the result channel for drivers.
    #[must_use]
    pub fn result_line(&self) -> Option<&str> {
        self.stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
    }

    /// First `limit` characters of stderr, for failure messages.
    #[must_use]
    pub fn stderr_excerpt(&self, limit: usize) -> String {
        excerpt(&self.stderr, limit)
    }
}

#[must_use]
pub fn excerpt(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[must_use]
pub fn clamp_timeout(timeout: Duration) -> Duration {
    timeout.clamp(MIN_TIMEOUT, MAX_TIMEOUT)
}

/// Runs one program to completion or deadline.
pub fn run_program(spec: &ProgramSpec<'_>) -> Result<ProcessOutcome, SandboxError> {
    let scratch = tempfile::Builder::new()
        .prefix("pzl-sandbox-")
        .tempdir()
        .map_err(SandboxError::io("create scratch dir"))?;
    let source_path = scratch
        .path()
        .join(format!("program.{}", spec.runtime.extension));
    std::fs::write(&source_path, spec.source).map_err(SandboxError::io("write program source"))?;

    let timeout = clamp_timeout(spec.timeout);
    let mut child = spawn(spec.runtime, &source_path, scratch.path())?;
    tracing::debug!(
        target: "pzl.sandbox",
        program = %spec.runtime.program,
        pid = child.id(),
        timeout_ms = duration_ms(timeout),
        "spawned candidate process"
    );

    // Detached: a descendant may keep stdin open without reading it. A
    // child that exits early closes the pipe and the broken-pipe error
    // carries no information.
    if let Some(mut pipe) = child.stdin.take() {
        let payload = spec.stdin.to_vec();
        thread::spawn(move || {
            let _ = pipe.write_all(&payload);
        });
    }
    let stdout_reader = child.stdout.take().map(spawn_capture);
    let stderr_reader = child.stderr.take().map(spawn_capture);

    let started_at = Instant::now();
    let (exit_code, timed_out) = wait_with_deadline(&mut child, timeout, started_at)?;

    // Descendants of a child that exited on its own are reparented and out
    // of reach; their pipes are abandoned at the deadline instead.
    let drain_budget = if timed_out {
        READER_GRACE
    } else {
        timeout.saturating_sub(started_at.elapsed()) + READER_GRACE
    };
    let drain_deadline = Instant::now() + drain_budget;
    let stdout = collect_capture(stdout_reader, drain_deadline, "stdout")?;
    let stderr = collect_capture(stderr_reader, drain_deadline, "stderr")?;
    let elapsed_ms = duration_ms(started_at.elapsed());

    if timed_out {
        tracing::warn!(
            target: "pzl.sandbox",
            program = %spec.runtime.program,
            elapsed_ms,
            "candidate process killed at deadline"
        );
    }

    Ok(ProcessOutcome {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout.bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr.bytes).into_owned(),
        timed_out,
        elapsed_ms,
        stdout_truncated: stdout.truncated,
        stderr_truncated: stderr.truncated,
    })
}

fn spawn(runtime: &RuntimeCommand, source_path: &Path, workdir: &Path) -> Result<Child, SandboxError> {
    Command::new(&runtime.program)
        .args(&runtime.args)
        .arg(source_path)
        .current_dir(workdir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                SandboxError::RuntimeNotFound {
                    program: runtime.program.clone(),
                }
            } else {
                SandboxError::Io {
                    context: "spawn runtime",
                    source,
                }
            }
        })
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    started_at: Instant,
) -> Result<(Option<i32>, bool), SandboxError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status.code(), false)),
            Ok(None) => {
                if started_at.elapsed() >= timeout {
                    kill_process_tree(child.id());
                    let _ = child.kill();
                    let status = child.wait().map_err(SandboxError::io("wait after kill"))?;
                    return Ok((status.code(), true));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                kill_process_tree(child.id());
                let _ = child.kill();
                let _ = child.wait();
                return Err(SandboxError::Io {
                    context: "poll child",
                    source,
                });
            }
        }
    }
}

/// Kills `pid` and all of its descendants, leaves first. Must run before
/// `pid` itself is reaped, while its children are still linked to it.
fn kill_process_tree(pid: u32) {
    let root = sysinfo::Pid::from_u32(pid);
    let mut sys = sysinfo::System::new();
    sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);

    let mut children_map: HashMap<sysinfo::Pid, Vec<sysinfo::Pid>> = HashMap::new();
    for (pid, process) in sys.processes() {
        if let Some(parent) = process.parent() {
            children_map.entry(parent).or_default().push(*pid);
        }
    }

    let mut tree = vec![root];
    let mut cursor = 0;
    while let Some(&pid) = tree.get(cursor) {
        cursor += 1;
        if let Some(children) = children_map.get(&pid) {
            tree.extend(children.iter().copied());
        }
    }

    for pid in tree.into_iter().rev() {
        if let Some(process) = sys.process(pid) {
            if process.kill_with(sysinfo::Signal::Kill) != Some(true) {
                let _ = process.kill();
            }
        }
    }
}

#[derive(Debug, Default)]
struct Capture {
    bytes: Vec<u8>,
    truncated: bool,
}

struct CaptureHandle {
    shared: Arc<Mutex<Capture>>,
    done: Receiver<()>,
}

fn spawn_capture<R>(mut stream: R) -> CaptureHandle
where
    R: Read + Send + 'static,
{
    let shared = Arc::new(Mutex::new(Capture::default()));
    let (done_tx, done) = mpsc::channel();
    let sink = Arc::clone(&shared);
    thread::spawn(move || {
        let mut chunk = [0_u8; 8192];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(read) => {
                    let Ok(mut capture) = sink.lock() else { break };
                    let room = MAX_CAPTURE_BYTES.saturating_sub(capture.bytes.len());
                    if read > room {
                        capture.truncated = true;
                    }
                    capture.bytes.extend_from_slice(&chunk[..read.min(room)]);
                }
            }
        }
        let _ = done_tx.send(());
    });
    CaptureHandle { shared, done }
}

/// Takes what the reader has captured by `deadline`. A stream still open at
/// that point is cut off and marked truncated.
fn collect_capture(
    handle: Option<CaptureHandle>,
    deadline: Instant,
    stream: &'static str,
) -> Result<Capture, SandboxError> {
    let Some(handle) = handle else {
        return Ok(Capture::default());
    };
    let wait = deadline.saturating_duration_since(Instant::now());
    let finished = match handle.done.recv_timeout(wait) {
        Ok(()) => true,
        Err(RecvTimeoutError::Timeout) => false,
        Err(RecvTimeoutError::Disconnected) => return Err(SandboxError::ReaderPanicked { stream }),
    };
    let mut capture = handle
        .shared
        .lock()
        .map(|mut guard| std::mem::take(&mut *guard))
        .map_err(|_| SandboxError::ReaderPanicked { stream })?;
    if !finished {
        tracing::warn!(target: "pzl.sandbox", stream, "stream still open past the deadline; capture cut off");
        capture.truncated = true;
    }
    Ok(capture)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
