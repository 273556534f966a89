use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use kubewright_api::{Call, KubeApi};
use kubewright_ops::{exit_code, ExecOutcome, LogOptions, Scaled, WaitOptions};
use serde_json::json;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "kubewrightctl", version, about = "kubewright: exec, logs, copy-out, scaling and status probes")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Kubernetes namespace (default: in-cluster namespace or current context)
    #[arg(long = "ns", global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ScaleKind { Deployment, Statefulset }

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum StatusKind { Pod, Job }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a pod's log
    Logs {
        pod: String,
        #[arg(short = 'c', long = "container")]
        container: Option<String>,
        /// Lines of recent log to show
        #[arg(long = "tail")]
        tail: Option<i64>,
        /// Only logs newer than this many seconds
        #[arg(long = "since")]
        since: Option<i64>,
        #[arg(short = 'f', long = "follow", action = ArgAction::SetTrue)]
        follow: bool,
    },
    /// Run a command in a pod
    Exec {
        pod: String,
        #[arg(short = 'c', long = "container")]
        container: Option<String>,
        /// Capture output and print it instead of logging it
        #[arg(long = "capture", action = ArgAction::SetTrue)]
        capture: bool,
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Copy a file out of a pod
    Cp {
        pod: String,
        remote: String,
        local: PathBuf,
        #[arg(short = 'c', long = "container")]
        container: Option<String>,
    },
    /// Set replicas on a Deployment or StatefulSet
    Scale {
        #[arg(value_enum)]
        kind: ScaleKind,
        name: String,
        replicas: i32,
        /// Wait for the workload's pods to settle
        #[arg(long = "wait", action = ArgAction::SetTrue)]
        wait: bool,
    },
    /// Scale every Deployment and StatefulSet in the namespace to zero
    ScaleDownAll,
    /// Wait until pods matching a label selector are ready or gone
    Wait {
        selector: String,
        #[arg(long = "timeout", default_value_t = 120)]
        timeout: u64,
        #[arg(long = "delay", default_value_t = 3)]
        delay: u64,
        #[arg(long = "start-delay", default_value_t = 3)]
        start_delay: u64,
    },
    /// Print a pod or job phase and exit with its status code
    Status {
        #[arg(value_enum)]
        kind: StatusKind,
        name: String,
    },
}

fn init_tracing() {
    let env = std::env::var("KUBEWRIGHT_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("KUBEWRIGHT_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid KUBEWRIGHT_METRICS_ADDR; expected host:port");
        }
    }
}

fn print_scaled(output: Output, scaled: &[Scaled]) -> Result<()> {
    match output {
        Output::Human => {
            for s in scaled {
                println!("{}", s.message());
            }
        }
        Output::Json => {
            let rows: Vec<_> = scaled
                .iter()
                .map(|s| json!({"kind": s.kind.as_str(), "name": s.name, "replicas": s.replicas}))
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let t0 = Instant::now();
    let api = KubeApi::new(cli.namespace.as_deref(), None).await?;
    info!(ns = %api.namespace(), took_ms = %t0.elapsed().as_millis(), "connected");

    match cli.command {
        Commands::Logs { pod, container, tail, since, follow } => {
            let opts = LogOptions { container, follow, tail_lines: tail, since_seconds: since };
            let lines = api.get_logs(&pod, &opts, Call::default()).await?;
            info!(pod = %pod, lines, "logs done");
        }
        Commands::Exec { pod, container, capture, command } => {
            let outcome = api.run_command(&pod, &command, container.as_deref(), capture, Call::default()).await?;
            if let ExecOutcome::Preloaded { stdout, stderr, status } = outcome {
                let code = status.as_ref().filter(|s| s.status.as_deref() != Some("Success")).map(exit_code).unwrap_or(0);
                match cli.output {
                    Output::Human => {
                        stdout.iter().for_each(|l| println!("{l}"));
                        stderr.iter().for_each(|l| eprintln!("{l}"));
                    }
                    Output::Json => {
                        println!("{}", serde_json::to_string_pretty(&json!({"stdout": stdout, "stderr": stderr, "code": code}))?);
                    }
                }
                if code != 0 {
                    std::process::exit(code);
                }
            }
        }
        Commands::Cp { pod, remote, local, container } => {
            api.copy_file_from_pod(&pod, &remote, &local, container.as_deref(), Call::default()).await?;
            info!(pod = %pod, remote = %remote, local = %local.display(), "copied");
        }
        Commands::Scale { kind, name, replicas, wait } => {
            let scaled = match kind {
                ScaleKind::Deployment => api.scale_deployment(&name, replicas, wait, Call::default()).await?,
                ScaleKind::Statefulset => api.scale_stateful_set(&name, replicas, wait, Call::default()).await?,
            };
            print_scaled(cli.output, std::slice::from_ref(&scaled))?;
        }
        Commands::ScaleDownAll => {
            let scaled = api.scale_down_all(Call::default()).await?;
            print_scaled(cli.output, &scaled)?;
        }
        Commands::Wait { selector, timeout, delay, start_delay } => {
            let opts = WaitOptions {
                delay: Duration::from_secs(delay),
                timeout: Duration::from_secs(timeout),
                start_delay: Duration::from_secs(start_delay),
            };
            api.wait_pods(&selector, None, &opts, Call::default()).await?;
            info!(selector = %selector, took_ms = %t0.elapsed().as_millis(), "pods settled");
        }
        Commands::Status { kind, name } => {
            let (phase, code) = match kind {
                StatusKind::Pod => {
                    let st = api.pod_status(&name, Call::default()).await?.ok_or_else(|| anyhow!("pod {name} not found"))?;
                    (st.phase().to_string(), st.code())
                }
                StatusKind::Job => {
                    let st = api.job_status(&name, Call::default()).await?.ok_or_else(|| anyhow!("job {name} not found"))?;
                    (st.phase().to_string(), st.code())
                }
            };
            match cli.output {
                Output::Human => println!("{phase}"),
                Output::Json => println!("{}", serde_json::to_string_pretty(&json!({"name": name, "phase": phase, "code": code}))?),
            }
            std::process::exit(code);
        }
    }
    Ok(())
}
