use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kubewright_ops::exec::{pump, ByteStream};
use kubewright_ops::{ExecSession, LineCollector};

struct Interleaved {
    stdout: Option<ByteStream>,
    stderr: Option<ByteStream>,
    status_reads: usize,
}

#[async_trait::async_trait]
impl ExecSession for Interleaved {
    fn take_stdout(&mut self) -> Option<ByteStream> {
        self.stdout.take()
    }

    fn take_stderr(&mut self) -> Option<ByteStream> {
        self.stderr.take()
    }

    async fn status(&mut self) -> Option<Status> {
        self.status_reads += 1;
        Some(Status { status: Some("Success".into()), ..Default::default() })
    }
}

#[tokio::test(start_paused = true)]
async fn slow_channels_drain_in_order_before_status() {
    let stdout = async_stream::stream! {
        for i in 0..3 {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            yield Ok::<Bytes, std::io::Error>(Bytes::from(format!("out {i}\n")));
        }
    };
    let stderr = async_stream::stream! {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        yield Ok::<Bytes, std::io::Error>(Bytes::from_static(b"warn\n"));
    };
    let mut session = Interleaved { stdout: Some(stdout.boxed()), stderr: Some(stderr.boxed()), status_reads: 0 };

    let (mut out, mut err) = (LineCollector::new(), LineCollector::new());
    let status = pump(&mut session, &mut out, &mut err, Duration::from_secs(1)).await.unwrap();

    assert_eq!(out.lines(), ["out 0", "out 1", "out 2"]);
    assert_eq!(err.lines(), ["warn"]);
    assert_eq!(status.and_then(|s| s.status).as_deref(), Some("Success"));
    assert_eq!(session.status_reads, 1);
}
