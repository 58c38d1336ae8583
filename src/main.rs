mod cli;
mod config;

use std::process::ExitCode;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::debug;

use kubelike_k8s::KubeClient;
use kubelike_logs::stream_matching_logs;

use crate::cli::Args;
use crate::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Diagnostics go to stderr so they never mix with log output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let command = args.into_command(&config)?;

    let client = KubeClient::new(command.context.as_deref(), command.namespace.as_deref()).await?;

    let sources = tokio::time::timeout(
        command.pod_running_timeout,
        client.resolve_sources(
            &command.target,
            &command.request,
            command.all_pods,
            command.all_containers,
        ),
    )
    .await
    .map_err(|_| {
        anyhow!(
            "timed out after {} waiting for {}",
            humantime::format_duration(command.pod_running_timeout),
            command.target
        )
    })??;

    if sources.is_empty() {
        if command.target.is_selector() {
            eprintln!("No resources found in {} namespace.", client.namespace());
        }
        return Ok(());
    }

    debug!(
        sources = sources.len(),
        follow = command.options.follow,
        "streaming logs"
    );

    let mut stdout = tokio::io::stdout();
    stream_matching_logs(sources, &mut stdout, &command.options).await?;

    Ok(())
}
