//! Client owning the extraction worker process and its line channel.

use std::ffi::OsStr;
use std::process::Stdio;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::error::{CollectionError, CollectionResult};
use super::protocol::CollectRequest;
use crate::config::WorkerSettings;

/// The duplex stream pair, locked as a unit for the whole exchange.
#[derive(Debug)]
struct Channel {
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    /// Set after a timeout or EOF: the stream no longer sits on a
    /// request/response boundary and must not be reused.
    poisoned: bool,
}

/// Client for the long-running extraction worker.
///
/// Spawning a fresh worker per "autodoc" instruction would dominate the
/// documentation run, so one process is kept alive and fed one request
/// line per collected object. The worker correlates request N with
/// response N purely by arrival order on its stdio streams; the client
/// therefore allows exactly one exchange in flight and rejects concurrent
/// use instead of interleaving it.
///
/// # Example
///
/// ```ignore
/// let client = WorkerClient::spawn("pytkdocs", &["--line-by-line".into()]).await?;
/// let line = client.exchange(&request).await?;
/// client.terminate();
/// ```
#[derive(Debug)]
pub struct WorkerClient {
    /// The guarded duplex channel. `try_lock` failure means misuse.
    channel: Mutex<Channel>,

    /// Handle to the worker child process. Taken on terminate.
    child: StdMutex<Option<Child>>,

    /// Optional per-exchange timeout.
    timeout: Option<Duration>,
}

impl WorkerClient {
    /// Spawn a worker process with no exchange timeout.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::Spawn`] if the executable cannot be
    /// launched. No process is left running in that case.
    pub async fn spawn(program: impl AsRef<OsStr>, args: &[String]) -> CollectionResult<Self> {
        Self::spawn_with_timeout(program, args, None).await
    }

    /// Spawn a worker process with an optional per-exchange timeout.
    ///
    /// The child runs with `PYTHONUNBUFFERED=1` so each response line
    /// becomes visible as soon as the worker produces it, and with
    /// `kill_on_drop` so the process cannot outlive its client, error
    /// paths included.
    pub async fn spawn_with_timeout(
        program: impl AsRef<OsStr>,
        args: &[String],
        timeout: Option<Duration>,
    ) -> CollectionResult<Self> {
        debug!(program = %program.as_ref().to_string_lossy(), "spawning extraction worker");

        let mut child = Command::new(program.as_ref())
            .args(args)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(CollectionError::Spawn)?;

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");

        Ok(Self {
            channel: Mutex::new(Channel {
                stdin: BufWriter::new(stdin),
                stdout: BufReader::new(stdout),
                poisoned: false,
            }),
            child: StdMutex::new(Some(child)),
            timeout,
        })
    }

    /// Spawn a worker using settings configuration.
    ///
    /// Resolves the worker command (composing the setup-command wrapper if
    /// one is configured) and applies the configured exchange timeout.
    pub async fn spawn_with_settings(settings: &WorkerSettings) -> CollectionResult<Self> {
        let (program, args) = settings.worker_command()?;
        Self::spawn_with_timeout(program, &args, settings.exchange_timeout()).await
    }

    /// Send one request line and read one response line.
    ///
    /// The whole exchange (write, flush, blocking read of a single line)
    /// happens under one channel guard. A concurrent call does not queue;
    /// it fails with [`CollectionError::ChannelBusy`], since silently
    /// interleaving would desynchronize every subsequent response. Callers
    /// running collects from several tasks must serialize them.
    ///
    /// # Errors
    ///
    /// - [`CollectionError::ChannelBusy`] if another exchange is in flight.
    /// - [`CollectionError::ChannelPoisoned`] if an earlier timeout or EOF
    ///   left the stream mid-exchange.
    /// - [`CollectionError::Timeout`] when the configured timeout expires;
    ///   the channel is poisoned, not resynchronized.
    /// - [`CollectionError::WorkerExited`] on EOF.
    /// - [`CollectionError::Encode`] / [`CollectionError::Write`] /
    ///   [`CollectionError::Read`] for the corresponding failures.
    pub async fn exchange(&self, request: &CollectRequest) -> CollectionResult<String> {
        let mut channel = self
            .channel
            .try_lock()
            .map_err(|_| CollectionError::ChannelBusy)?;

        if channel.poisoned {
            return Err(CollectionError::ChannelPoisoned);
        }

        let line = serde_json::to_string(request).map_err(CollectionError::Encode)? + "\n";

        debug!("writing request to worker stdin");
        channel
            .stdin
            .write_all(line.as_bytes())
            .await
            .map_err(CollectionError::Write)?;
        channel.stdin.flush().await.map_err(CollectionError::Write)?;

        debug!("reading response from worker stdout");
        let mut response = String::new();
        let read = match self.timeout {
            Some(timeout) => {
                match tokio::time::timeout(timeout, channel.stdout.read_line(&mut response)).await {
                    Ok(read) => read,
                    Err(_) => {
                        // The response may still arrive later; the stream
                        // position can no longer be trusted.
                        channel.poisoned = true;
                        error!(secs = timeout.as_secs(), "worker exchange timed out");
                        return Err(CollectionError::Timeout(timeout.as_secs()));
                    }
                }
            }
            None => channel.stdout.read_line(&mut response).await,
        };

        match read {
            Ok(0) => {
                channel.poisoned = true;
                Err(CollectionError::WorkerExited)
            }
            Ok(_) => Ok(response),
            Err(e) => Err(CollectionError::Read(e)),
        }
    }

    /// Send a termination signal to the worker process.
    ///
    /// Best effort: in-flight data is not flushed. Idempotent: calling
    /// this twice, or with no live process, does nothing.
    pub fn terminate(&self) {
        let mut slot = self.child.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(mut child) = slot.take() {
            debug!("terminating extraction worker");
            let _ = child.start_kill();
        }
    }

    /// Check if the worker process is still running.
    pub fn is_alive(&self) -> bool {
        let mut slot = self.child.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match slot.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// The configured per-exchange timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
