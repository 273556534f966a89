//! kubewright ops: long-running pod operations.
//! Exec with stdout/stderr demultiplexing, copy-out, log tailing, replica scaling and readiness waits.

#![forbid(unsafe_code)]

pub mod exec;
pub mod logs;
pub mod scaling;
pub mod sink;

pub use exec::{copy_file_from_pod, exit_code, run_command, ExecOptions, ExecOutcome, ExecSession};
pub use logs::{get_logs, stream_logs, LogOptions};
pub use scaling::{is_pod_ready, scale, scale_down_all, wait_pods, ClusterOps, KubeCluster, Scaled, WaitOptions, WorkloadKind};
pub use sink::{FileSink, LineCollector, LogSink, WriteSink};
