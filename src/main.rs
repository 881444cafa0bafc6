use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use escrow_agent::{
    agent::Orchestrator,
    cli::{Command, args_from_env},
    config::{Config, build_notification_sink},
    logging::init_tracing,
    request::{UnrecognizedPolicyHandling, load_requests},
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = args_from_env()?;
    let config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    let _logging_guard = init_tracing(&config.logging)?;

    let orchestrator = Orchestrator::new(
        config.oracle.build().context("failed to build oracle client")?,
        config.ledger.build(),
        build_notification_sink(&config.notifications)
            .context("failed to build notification sinks")?,
        &config.agent,
    );

    match &args.command {
        Command::Release { request_path } => {
            release_batch(&orchestrator, request_path, config.agent.unrecognized_policy).await
        }
        Command::Cancel {
            contract_id,
            reason,
        } => cancel_escrow(&orchestrator, contract_id, reason).await,
    }
}

async fn release_batch(
    orchestrator: &Orchestrator,
    request_path: &Path,
    handling: UnrecognizedPolicyHandling,
) -> Result<()> {
    let requests = load_requests(request_path, handling)?;

    let cancel = CancellationToken::new();
    spawn_signal_watcher(cancel.clone())?;

    tracing::info!(
        target: "agent",
        requests = requests.len(),
        request_file = %request_path.display(),
        "batch_started"
    );

    let mut failed = 0_usize;
    for request in &requests {
        if cancel.is_cancelled() {
            tracing::warn!(
                target: "agent",
                contract_id = %request.contract_id(),
                "request_skipped_after_shutdown"
            );
            failed += 1;
            continue;
        }

        let report = orchestrator
            .process_with_cancellation(request, &cancel)
            .await;
        eprintln!(
            "{}: {} after {} attempt(s)",
            report.contract_id,
            report.terminal.label(),
            report.attempts
        );
        if !report.succeeded() {
            failed += 1;
        }
    }

    tracing::info!(
        target: "agent",
        requests = requests.len(),
        failed = failed,
        "batch_finished"
    );

    if failed > 0 {
        return Err(anyhow!(
            "{failed} of {} request(s) did not release",
            requests.len()
        ));
    }
    Ok(())
}

async fn cancel_escrow(orchestrator: &Orchestrator, contract_id: &str, reason: &str) -> Result<()> {
    let report = orchestrator.cancel_escrow(contract_id, reason).await;
    eprintln!("{}: {}", report.contract_id, report.terminal.label());
    if !report.refunded() {
        return Err(anyhow!("escrow {contract_id} was not refunded"));
    }
    Ok(())
}

fn spawn_signal_watcher(cancel: CancellationToken) -> Result<()> {
    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    tokio::spawn(async move {
        let signal_name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
            _ = cancel.cancelled() => return,
        };
        tracing::warn!(target: "agent", signal = signal_name, "shutdown_requested");
        eprintln!("received {signal_name}; cancelling in-flight payment");
        cancel.cancel();
    });
    Ok(())
}
