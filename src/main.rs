// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use momo_sync::config::{EngineConfig, DEFAULT_LEDGER_API_URL, LEDGER_API_URL_ENV};
use momo_sync::ingest::listener::DEFAULT_PUSH_CAPACITY;
use momo_sync::ingest::{IngestionEvent, Poller, PushListener};
use momo_sync::logging::{init_logging, LogFormat};
use momo_sync::sms::{detect, JsonInboxProvider, MessageSourceProvider, RawMessage};
use momo_sync::state::Engine;
use momo_sync::storage::{FileSecretStore, StoragePaths};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_logging(LogFormat::default());
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    init_logging(config.log_format);
    if config.ledger_api_url == DEFAULT_LEDGER_API_URL {
        warn!(
            default = DEFAULT_LEDGER_API_URL,
            "{LEDGER_API_URL_ENV} not set, using local development ledger"
        );
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "momo-sync stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: EngineConfig) -> Result<(), BoxError> {
    let secrets = FileSecretStore::open(StoragePaths::new(&config.data_dir))?;
    let engine = Engine::new(config.clone(), Arc::new(secrets))?;

    if !engine.bootstrap().await? {
        match &config.login {
            Some(login) => {
                engine.login(&login.username, &login.password, true).await?;
                info!(username = %login.username, "Logged in");
            }
            None => warn!("No stored session and no login configured, capture waits for login"),
        }
    }

    let providers: Vec<Box<dyn MessageSourceProvider>> =
        vec![Box::new(JsonInboxProvider::new(config.inbox_path()))];
    let capability = detect(&providers);

    let orchestrator = engine.orchestrator().clone();
    let poller = Poller::new(orchestrator.clone(), capability, engine.session().watch())
        .with_interval(config.poll_interval)
        .with_batch_size(config.poll_batch_size);
    let (listener, push) = PushListener::new(orchestrator.clone(), DEFAULT_PUSH_CAPACITY);

    let shutdown = CancellationToken::new();
    let poller_task = tokio::spawn(poller.run(shutdown.clone()));
    let listener_task = tokio::spawn(listener.run(shutdown.clone()));
    let stdin_task = tokio::spawn(forward_stdin(push, shutdown.clone()));
    let report_task = tokio::spawn(print_captures(orchestrator.subscribe(), shutdown.clone()));

    info!("momo-sync running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.cancel();

    for task in [poller_task, listener_task, stdin_task, report_task] {
        if let Err(e) = task.await {
            warn!(error = %e, "Background task ended abnormally");
        }
    }
    Ok(())
}

/// Each stdin line is one pushed message. A pending stdin read can hold up
/// process exit until the next line or EOF.
async fn forward_stdin(push: mpsc::Sender<RawMessage>, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => return,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => {
                let message = RawMessage::new("stdin", line, Utc::now().timestamp_millis());
                if push.send(message).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Could not read stdin");
                return;
            }
        }
    }
}

/// Captured transactions go to stdout as JSON lines.
async fn print_captures(
    mut events: broadcast::Receiver<IngestionEvent>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => return,
            event = events.recv() => event,
        };
        match event {
            Ok(IngestionEvent::Captured { transaction, .. }) => {
                match serde_json::to_string(&transaction) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!(error = %e, "Could not encode captured transaction"),
                }
            }
            Ok(IngestionEvent::CaptureHalted) => {
                warn!("Session expired, set LEDGER_USERNAME/LEDGER_PASSWORD and restart to log in")
            }
            Ok(IngestionEvent::PassFinished { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Capture report fell behind")
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
