//! Remote command execution over the pod `exec` subresource.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::api::{Api, AttachParams, AttachedProcess};
use kubewright_core::{Error, Result};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::sink::{FileSink, LineCollector, LogSink, WriteSink};

pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

pub const STATUS_SUCCESS: &str = "Success";

/// Poll deadline for the demux loop; `KUBEWRIGHT_EXEC_POLL_MS` overrides.
pub fn poll_interval() -> Duration {
    let ms = std::env::var("KUBEWRIGHT_EXEC_POLL_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(1000);
    Duration::from_millis(ms)
}

/// An attached remote process: two output channels plus a trailing status frame.
#[async_trait::async_trait]
pub trait ExecSession: Send {
    fn take_stdout(&mut self) -> Option<ByteStream>;
    fn take_stderr(&mut self) -> Option<ByteStream>;
    /// Status frame from the error channel; only meaningful once both outputs closed.
    async fn status(&mut self) -> Option<Status>;
}

#[async_trait::async_trait]
impl ExecSession for AttachedProcess {
    fn take_stdout(&mut self) -> Option<ByteStream> {
        self.stdout().map(|r| ReaderStream::new(r).boxed())
    }

    fn take_stderr(&mut self) -> Option<ByteStream> {
        self.stderr().map(|r| ReaderStream::new(r).boxed())
    }

    async fn status(&mut self) -> Option<Status> {
        match self.take_status() {
            Some(fut) => fut.await,
            None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    pub container: Option<String>,
    pub stdin: bool,
    pub stdout: bool,
    pub stderr: bool,
    pub tty: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self { container: None, stdin: false, stdout: true, stderr: true, tty: false }
    }
}

impl ExecOptions {
    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.container = Some(name.into());
        self
    }

    pub fn attach_params(&self) -> AttachParams {
        let ap = AttachParams::default().stdin(self.stdin).stdout(self.stdout).stderr(self.stderr).tty(self.tty);
        match &self.container {
            Some(c) => ap.container(c.clone()),
            None => ap,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// Output went to log sinks; the command succeeded.
    Streamed,
    /// Output captured in memory; `status` is returned whatever it says.
    Preloaded { stdout: Vec<String>, stderr: Vec<String>, status: Option<Status> },
}

/// Exit code carried by a failure status: the `ExitCode` cause, else the first cause, else 1.
pub fn exit_code(status: &Status) -> i32 {
    let causes = status.details.as_ref().and_then(|d| d.causes.as_deref()).unwrap_or_default();
    let parse = |c: &k8s_openapi::apimachinery::pkg::apis::meta::v1::StatusCause| {
        c.message.as_deref().and_then(|m| m.trim().parse::<i32>().ok())
    };
    causes
        .iter()
        .find(|c| c.reason.as_deref() == Some("ExitCode"))
        .and_then(parse)
        .or_else(|| causes.first().and_then(parse))
        .unwrap_or(1)
}

pub fn is_success(status: &Status) -> bool {
    status.status.as_deref() == Some(STATUS_SUCCESS)
}

enum Event {
    Out(Option<std::io::Result<Bytes>>),
    Err(Option<std::io::Result<Bytes>>),
    Idle,
}

async fn next_chunk(stream: &mut Option<ByteStream>) -> Option<std::io::Result<Bytes>> {
    match stream.as_mut() {
        Some(s) => s.next().await,
        None => None,
    }
}

/// Drain stdout/stderr into their sinks until both close, then read the status frame.
pub async fn pump<S>(session: &mut S, stdout: &mut dyn WriteSink, stderr: &mut dyn WriteSink, poll: Duration) -> Result<Option<Status>>
where
    S: ExecSession + ?Sized,
{
    let mut out = session.take_stdout();
    let mut err = session.take_stderr();
    while out.is_some() || err.is_some() {
        let event = tokio::select! {
            c = next_chunk(&mut out), if out.is_some() => Event::Out(c),
            c = next_chunk(&mut err), if err.is_some() => Event::Err(c),
            _ = tokio::time::sleep(poll) => Event::Idle,
        };
        match event {
            Event::Out(Some(Ok(b))) => stdout.write(&b)?,
            Event::Err(Some(Ok(b))) => stderr.write(&b)?,
            Event::Out(Some(Err(e))) | Event::Err(Some(Err(e))) => {
                warn!(error = %e, "exec stream error");
                return Err(e.into());
            }
            Event::Out(None) => out = None,
            Event::Err(None) => err = None,
            Event::Idle => {}
        }
    }
    stdout.flush()?;
    stderr.flush()?;
    Ok(session.status().await)
}

/// Run `command` through an attached session. In streaming mode a non-success status
/// becomes [`Error::ExecFailure`] and an absent one [`Error::MissingStatus`]; in preloaded
/// mode the status is handed back.
pub async fn exec_with<S>(
    session: &mut S,
    command: &[String],
    stdout: &mut dyn WriteSink,
    stderr: &mut dyn WriteSink,
    preload: bool,
) -> Result<Option<Status>>
where
    S: ExecSession + ?Sized,
{
    metrics::counter!("exec_runs_total", 1);
    let status = pump(session, stdout, stderr, poll_interval()).await?;
    if preload {
        return Ok(status);
    }
    match &status {
        Some(st) if !is_success(st) => {
            debug!(status = ?st, "exec status frame");
            metrics::counter!("exec_failures_total", 1);
            Err(Error::ExecFailure { command: command.join(" "), code: exit_code(st) })
        }
        Some(_) => Ok(status),
        None => {
            warn!(command = %command.join(" "), "exec ended without a status frame");
            metrics::counter!("exec_failures_total", 1);
            Err(Error::MissingStatus(command.join(" ")))
        }
    }
}

/// Preloaded: capture output into line collectors. Streaming: stdout to info, stderr to error log.
pub async fn run_session<S>(session: &mut S, command: &[String], preload: bool) -> Result<ExecOutcome>
where
    S: ExecSession + ?Sized,
{
    if preload {
        let (mut out, mut err) = (LineCollector::new(), LineCollector::new());
        let status = exec_with(session, command, &mut out, &mut err, true).await?;
        Ok(ExecOutcome::Preloaded { stdout: out.into_lines(), stderr: err.into_lines(), status })
    } else {
        exec_with(session, command, &mut LogSink::info(), &mut LogSink::error(), false).await?;
        Ok(ExecOutcome::Streamed)
    }
}

/// Stream stdout into a file; the file is released on every exit path.
pub async fn copy_session_to_file<S>(session: &mut S, command: &[String], local_path: &Path) -> Result<()>
where
    S: ExecSession + ?Sized,
{
    info!(path = %local_path.display(), "copying from pod");
    let mut file = FileSink::create(local_path)?;
    let res = exec_with(session, command, &mut file, &mut LogSink::error(), false).await;
    let closed = file.close();
    res?;
    closed
}

pub fn cat_command(remote_path: &str) -> Vec<String> {
    vec!["/bin/sh".into(), "-c".into(), format!("cat {remote_path}")]
}

pub async fn attach(pods: &Api<Pod>, pod: &str, command: &[String], opts: &ExecOptions) -> Result<AttachedProcess> {
    debug!(pod = %pod, command = ?command, container = ?opts.container, "exec attach");
    Ok(pods.exec(pod, command.to_vec(), &opts.attach_params()).await?)
}

pub async fn run_command(pods: &Api<Pod>, pod: &str, command: &[String], opts: &ExecOptions, preload: bool) -> Result<ExecOutcome> {
    let mut proc = attach(pods, pod, command, opts).await?;
    let outcome = run_session(&mut proc, command, preload).await;
    let _ = proc.join().await;
    outcome
}

pub async fn copy_file_from_pod(pods: &Api<Pod>, pod: &str, remote_path: &str, local_path: &Path, opts: &ExecOptions) -> Result<()> {
    let command = cat_command(remote_path);
    let mut proc = attach(pods, pod, &command, opts).await?;
    let res = copy_session_to_file(&mut proc, &command, local_path).await;
    let _ = proc.join().await;
    res
}
