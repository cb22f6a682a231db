use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

mod archive;
mod cli;
mod clock;
mod command;
mod config;
mod console;
mod context;
mod editor;
mod engine;
mod error;
mod generate;
mod http;
mod ingest;
mod monitor;
mod patch;
mod paths;
mod question;
mod walker;
mod watcher;
mod xml;

#[cfg(test)]
mod test_support;

use cli::Cli;
use clock::{Clock, SystemClock};
use command::Command;
use config::LiveReloadConfig;
use context::SyncContext;
use editor::ProcessEditor;
use engine::{EngineExit, EngineSettings, SyncEngine};
use generate::{AnthropicGenerator, AnthropicSettings};
use ingest::AnswerIngestService;
use monitor::{ChangeMonitor, MonitorSettings};
use paths::PathSet;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = PathSet::new(&cli.docx_path);
    let config = LiveReloadConfig::load(paths.document_dir());

    let editor_command = cli
        .editor_command()
        .unwrap_or_else(|| config.editor.command.clone());
    let editor = ProcessEditor::new(&editor_command)?;
    if let Some(profile) = editor.profile_dir() {
        tracing::debug!("editor profile: {}", profile.display());
    }

    // The blocking HTTP client must not be built inside the async runtime.
    let api_key = config.generation.resolved_api_key();
    if api_key.is_none() {
        tracing::warn!("no API key configured; answer generation will fail");
    }
    let generator = AnthropicGenerator::new(AnthropicSettings {
        api_url: config.generation.api_url.clone(),
        api_key,
        model: config.generation.model.clone(),
        max_tokens: config.generation.max_tokens,
        temperature: config.generation.temperature,
        timeout: Duration::from_secs(config.generation.timeout_secs),
    })?;

    let (context, receiver) = SyncContext::new(paths);
    let context = Arc::new(context);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let engine = SyncEngine::new(
        Arc::clone(&context),
        receiver,
        editor,
        Arc::clone(&clock),
        EngineSettings {
            liveness_tick: config.sync.liveness_tick(),
            reload_debounce: config.sync.debounce(),
        },
    );
    let engine_thread = std::thread::Builder::new()
        .name("sync-engine".into())
        .spawn(move || engine.run())
        .context("failed to spawn the sync engine")?;

    let stop_monitor = Arc::new(AtomicBool::new(false));
    let monitor = ChangeMonitor::new(
        Arc::clone(&context),
        clock,
        MonitorSettings {
            poll_interval: config.sync.poll_interval(),
            debounce: config.sync.debounce(),
        },
    );
    let monitor_thread = {
        let stop = Arc::clone(&stop_monitor);
        std::thread::Builder::new()
            .name("change-monitor".into())
            .spawn(move || monitor.run(&stop))
            .context("failed to spawn the change monitor")?
    };

    // Never joined: a read on stdin cannot be interrupted.
    {
        let commands = context.commands().clone();
        std::thread::Builder::new()
            .name("console".into())
            .spawn(move || console::run(std::io::stdin().lock(), commands))
            .context("failed to spawn the console reader")?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build the async runtime")?;
    let runtime_guard = runtime.enter();

    let ingest = Arc::new(AnswerIngestService::new(
        Arc::clone(&context),
        Arc::new(generator),
        config.generation.write_failure_text,
    ));

    {
        let commands = context.commands().clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted");
                let _ = commands.send(Command::Quit);
            }
        });
    }

    let shutdown = Arc::new(Notify::new());
    if config.server.enabled && !cli.no_server {
        let port = cli.port.unwrap_or(config.server.port);
        let host = config.server.host.clone();
        let ingest = Arc::clone(&ingest);
        let shutdown = Arc::clone(&shutdown);
        runtime.spawn(async move {
            let signal = async move { shutdown.notified().await };
            if let Err(err) = http::run(ingest, &host, port, signal).await {
                tracing::error!("answer ingress stopped: {err:#}");
            }
        });
    }

    let question_watcher = if config.question_file.enabled {
        let debounce = Duration::from_millis(config.question_file.debounce_ms);
        match watcher::start_question_watcher(context.paths().question_file(), debounce) {
            Ok((handle, events)) => {
                runtime.spawn(question::run(Arc::clone(&ingest), events));
                Some(handle)
            }
            Err(err) => {
                tracing::warn!("question file trigger disabled: {err:#}");
                None
            }
        }
    } else {
        None
    };

    let exit = engine_thread
        .join()
        .map_err(|_| anyhow::anyhow!("sync engine panicked"))?;

    stop_monitor.store(true, Ordering::Relaxed);
    shutdown.notify_one();
    if monitor_thread.join().is_err() {
        tracing::warn!("change monitor panicked");
    }
    drop(question_watcher);
    drop(runtime_guard);
    runtime.shutdown_timeout(Duration::from_secs(2));

    match exit? {
        EngineExit::Quit | EngineExit::QueueClosed => {}
        EngineExit::EditorClosed => tracing::info!("preview closed"),
    }
    Ok(())
}
