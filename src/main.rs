#![forbid(unsafe_code)]

//! `lead-intake` operator binary for the lead engagement queue.
//!
//! Bootstraps configuration and the `SQLite` store, then either runs the
//! refresh, readmission, and retention loops (`serve`) or performs a single
//! operator command.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use lead_intake::config::GlobalConfig;
use lead_intake::models::disposition::DispositionAction;
use lead_intake::models::lead::NewLead;
use lead_intake::models::view::{AttemptClassification, LeadViewEntry};
use lead_intake::orchestrator::service::LeadQueueService;
use lead_intake::persistence::outreach_repo::OutreachRepo;
use lead_intake::persistence::store::{LeadStore, SqliteLeadStore};
use lead_intake::persistence::{db, retention};
use lead_intake::queue::refresh::QueueEvent;
use lead_intake::scheduler::readmission;
use lead_intake::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Disposition as typed on the command line.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum ActionArg {
    NotAnswered,
    ScheduleNow,
    CallbackLater,
    NotInterested,
    InvalidNumber,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the refresh, readmission, and retention loops until interrupted.
    Serve,
    /// Print the current queue.
    View,
    /// Apply one disposition to a lead.
    Dispose {
        /// Target lead id.
        lead_id: String,
        /// Disposition action.
        #[arg(value_enum)]
        action: ActionArg,
        /// Callback offset in days (required for `callback-later`).
        #[arg(long)]
        offset_days: Option<u32>,
    },
    /// Move the pending callback of a suspended lead.
    Reschedule {
        /// Target lead id.
        lead_id: String,
        /// New callback offset in days.
        #[arg(long)]
        offset_days: u32,
    },
    /// Print pending email outreach requests as JSON lines.
    Outreach {
        /// Mark each printed request as dispatched.
        #[arg(long)]
        mark_dispatched: bool,
    },
    /// Admit a lead into the queue.
    Admit {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        origin_label: Option<String>,
    },
    /// Synthesize a demo lead.
    #[cfg(feature = "test-leads")]
    TestLead,
}

#[derive(Debug, Parser)]
#[command(name = "lead-intake", about = "Lead engagement queue", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = Arc::new(GlobalConfig::load_from_path(&args.config)?);
    info!("configuration loaded");

    let db = Arc::new(db::connect(&config.database_path).await?);
    let store: Arc<dyn LeadStore> = Arc::new(SqliteLeadStore::new(Arc::clone(&db)));
    let service = LeadQueueService::new(Arc::clone(&config), store);

    match args.command {
        Command::Serve => serve(&service, db).await,
        Command::Reschedule {
            lead_id,
            offset_days,
        } => {
            let callback = service
                .dispositions()
                .reschedule_callback(&lead_id, offset_days, Utc::now())
                .await?;
            println!("{}", to_json(&callback)?);
            Ok(())
        }
        Command::Outreach { mark_dispatched } => {
            let repo = OutreachRepo::new(db);
            for request in repo.list_pending().await? {
                println!("{}", to_json(&request)?);
                if mark_dispatched {
                    repo.mark_dispatched(request.id, Utc::now()).await?;
                }
            }
            Ok(())
        }
        Command::View => {
            service.refresh().await?;
            print_view(&service.current_view().await);
            Ok(())
        }
        Command::Dispose {
            lead_id,
            action,
            offset_days,
        } => {
            let action = to_action(action, offset_days)?;
            service.refresh().await?;
            let effect = service.apply_disposition(&lead_id, action).await?;
            println!("{}", to_json(&effect)?);
            Ok(())
        }
        Command::Admit {
            first_name,
            last_name,
            email,
            phone,
            company,
            address,
            source,
            origin_label,
        } => {
            let lead = service
                .admit(NewLead {
                    first_name,
                    last_name,
                    email,
                    phone,
                    company,
                    address,
                    source,
                    origin_label,
                })
                .await?;
            println!("{}", lead.id);
            Ok(())
        }
        #[cfg(feature = "test-leads")]
        Command::TestLead => {
            let lead = service.request_test_lead().await?;
            println!("{}", lead.id);
            Ok(())
        }
    }
}

async fn serve(service: &LeadQueueService, db: Arc<db::Database>) -> Result<()> {
    let config = service.config();
    let ct = CancellationToken::new();

    // ── Live queue refresh ──────────────────────────────
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let refresh_handle = service.refresher(event_tx, ct.clone()).spawn();
    info!(
        interval_secs = config.queue.refresh_interval_seconds,
        "queue refresh started"
    );

    // ── Callback readmission ────────────────────────────
    let readmission_handle = readmission::spawn_readmission_task(
        Arc::clone(service.store()),
        config.scheduler.poll_interval(),
        ct.clone(),
        Some(refresh_handle.notifier()),
    );
    info!("callback readmission started");

    // ── Retention ───────────────────────────────────────
    let retention_handle = retention::spawn_retention_task(db, config.retention_days, ct.clone());
    info!("retention service started");

    let events_ct = ct.clone();
    let events_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                () = events_ct.cancelled() => break,
                event = event_rx.recv() => match event {
                    Some(QueueEvent::Reconciled(result)) => info!(
                        arrived = ?result.arrived,
                        departed = ?result.departed,
                        "queue reconciled"
                    ),
                    Some(QueueEvent::HighlightsCleared(ids)) => {
                        info!(count = ids.len(), "arrival highlights cleared");
                    }
                    Some(QueueEvent::RefreshFailed(err)) => warn!(%err, "queue refresh failed"),
                    None => break,
                },
            }
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    refresh_handle.await_completion().await;
    let _ = tokio::join!(readmission_handle, retention_handle, events_handle);
    info!("lead-intake shut down");

    Ok(())
}

fn to_action(action: ActionArg, offset_days: Option<u32>) -> Result<DispositionAction> {
    Ok(match action {
        ActionArg::NotAnswered => DispositionAction::NotAnswered,
        ActionArg::ScheduleNow => DispositionAction::ScheduleNow,
        ActionArg::NotInterested => DispositionAction::NotInterested,
        ActionArg::InvalidNumber => DispositionAction::InvalidNumber,
        ActionArg::CallbackLater => DispositionAction::CallbackLater {
            offset_days: offset_days.ok_or_else(|| {
                AppError::Config("--offset-days is required for callback-later".into())
            })?,
        },
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|err| AppError::Io(format!("failed to encode json: {err}")))
}

fn print_view(view: &[LeadViewEntry]) {
    if view.is_empty() {
        println!("queue is empty");
        return;
    }
    for entry in view {
        let badge = match entry.attempt_classification {
            AttemptClassification::None => String::new(),
            AttemptClassification::Warning(n) => format!(" [{n} attempts]"),
            AttemptClassification::Exhausted(n) => format!(" [{n} attempts, exhausted]"),
        };
        let marker = if entry.highlight { '*' } else { ' ' };
        let origin = entry.lead.origin_label.as_deref().unwrap_or("-");
        println!(
            "{marker} {id}  {name}  {origin}{badge}",
            id = entry.lead.id,
            name = entry.lead.display_name(),
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
