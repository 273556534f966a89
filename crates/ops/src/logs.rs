//! Pod log tailing.

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, LogParams};
use kubewright_core::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::sink::{LogSink, WriteSink};

/// Options for [`get_logs`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOptions {
    pub container: Option<String>,
    /// Follow the stream until the container exits.
    pub follow: bool,
    /// Tail last n lines (server-side)
    pub tail_lines: Option<i64>,
    /// Only return logs newer than X seconds
    pub since_seconds: Option<i64>,
}

impl LogOptions {
    pub fn log_params(&self) -> LogParams {
        LogParams {
            container: self.container.clone(),
            follow: self.follow,
            tail_lines: self.tail_lines,
            since_seconds: self.since_seconds,
            ..Default::default()
        }
    }
}

/// Consume a byte stream, split it into lines and write each one to `sink`.
/// Invalid UTF-8 is replaced with U+FFFD rather than dropped.
/// A trailing partial line is flushed at end of stream. Returns the number of lines written.
pub async fn pump_bytes_to_lines<S, E>(stream: S, sink: &mut dyn WriteSink, ctx: Option<&str>) -> Result<usize>
where
    S: futures::Stream<Item = std::result::Result<bytes::Bytes, E>>,
    E: std::fmt::Display,
{
    let stream = stream.fuse();
    futures::pin_mut!(stream);
    let mut buf = bytes::BytesMut::new();
    let mut lines = 0usize;
    while let Some(next) = stream.next().await {
        match next {
            Ok(chunk) => {
                buf.extend_from_slice(&chunk);
                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line = buf.split_to(pos);
                    let _ = buf.split_to(1); // drop '\n'
                    sink.write(String::from_utf8_lossy(&line).as_bytes())?;
                    lines += 1;
                }
            }
            Err(e) => {
                warn!(ctx = ?ctx, error = %e, "log stream error");
                break;
            }
        }
    }
    if !buf.is_empty() {
        sink.write(String::from_utf8_lossy(&buf).as_bytes())?;
        lines += 1;
    }
    info!(ctx = ?ctx, lines, "log pump ended");
    Ok(lines)
}

/// Stream a pod's log into `sink` line by line.
pub async fn stream_logs(pods: &Api<Pod>, pod: &str, opts: &LogOptions, sink: &mut dyn WriteSink) -> Result<usize> {
    use tokio_util::{compat::FuturesAsyncReadCompatExt, io::ReaderStream};

    let lp = opts.log_params();
    info!(pod = %pod, container = ?lp.container, follow = lp.follow, tail = ?lp.tail_lines, since = ?lp.since_seconds, "logs stream starting");
    let reader = pods.log_stream(pod, &lp).await?;
    // futures::io::AsyncRead -> tokio::io::AsyncRead -> bytes stream
    let stream = ReaderStream::new(reader.compat());
    pump_bytes_to_lines(stream, sink, Some(pod)).await
}

/// Forward a pod's log to the info log.
pub async fn get_logs(pods: &Api<Pod>, pod: &str, opts: &LogOptions) -> Result<usize> {
    stream_logs(pods, pod, opts, &mut LogSink::info()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::LineCollector;
    use futures::stream;

    #[tokio::test]
    async fn splits_lines_across_chunks_and_flushes_tail() {
        let chunks = vec![
            Ok::<bytes::Bytes, std::io::Error>(bytes::Bytes::from_static(b"hello\nwor")),
            Ok::<bytes::Bytes, std::io::Error>(bytes::Bytes::from_static(b"ld\n")),
            Ok::<bytes::Bytes, std::io::Error>(bytes::Bytes::from_static(b"tail")),
        ];
        let mut out = LineCollector::new();
        let n = pump_bytes_to_lines(stream::iter(chunks), &mut out, Some("test")).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(out.lines(), ["hello", "world", "tail"]);
    }

    #[tokio::test]
    async fn stream_error_ends_pump_keeping_prior_lines() {
        let s = async_stream::stream! {
            yield Ok::<bytes::Bytes, std::io::Error>(bytes::Bytes::from_static(b"a\nb\n"));
            yield Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
            yield Ok(bytes::Bytes::from_static(b"never\n"));
        };
        let mut out = LineCollector::new();
        pump_bytes_to_lines(s, &mut out, None).await.unwrap();
        assert_eq!(out.lines(), ["a", "b"]);
    }

    #[tokio::test]
    async fn invalid_utf8_lines_are_kept_lossily() {
        let chunks = vec![Ok::<bytes::Bytes, std::io::Error>(bytes::Bytes::from_static(b"ok\n\xff\xfe\nfine\nbad \xc3"))];
        let mut out = LineCollector::new();
        assert_eq!(pump_bytes_to_lines(stream::iter(chunks), &mut out, None).await.unwrap(), 4);
        assert_eq!(out.lines(), ["ok", "\u{fffd}\u{fffd}", "fine", "bad \u{fffd}"]);
    }

    #[test]
    fn log_params_carry_options() {
        let opts = LogOptions { container: Some("app".into()), follow: true, tail_lines: Some(10), since_seconds: Some(60) };
        let lp = opts.log_params();
        assert_eq!(lp.container.as_deref(), Some("app"));
        assert!(lp.follow);
        assert_eq!(lp.tail_lines, Some(10));
        assert_eq!(lp.since_seconds, Some(60));
    }
}
