use crate::output;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;
use tokio_util::sync::CancellationToken;

use hyperion_engine::{DocumentExecutor, ExecutorConfig};
use hyperion_rpc::{DocumentService, RpcServer, DEFAULT_BIND};

/// Serve document submissions over HTTP
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, value_name = "ADDR", default_value = DEFAULT_BIND, env = "HYPERION_BIND")]
    pub bind: SocketAddr,

    /// Working directory for executed documents
    #[arg(long, short = 'w', value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Maximum number of tasks running at once
    #[arg(long, value_name = "N", env = "HYPERION_MAX_PARALLEL")]
    pub max_parallel: Option<usize>,
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let mut config = ExecutorConfig::default();
    if let Some(dir) = args.working_dir {
        config = config.with_working_dir(dir);
    }
    if let Some(max) = args.max_parallel {
        config = config.with_max_parallel_tasks(max);
    }

    output::status("Serving", &format!("http://{}", args.bind));
    output::info(&format!(
        "Working directory {}, up to {} parallel tasks",
        config.working_dir.display(),
        config.max_parallel_tasks
    ));

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
        }
        signal.cancel();
    });

    let server = RpcServer::new(DocumentService::new(DocumentExecutor::with_config(config)));
    server.serve(args.bind, shutdown).await?;

    output::success("Server stopped");
    Ok(())
}
