use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bankroll::config::{default_config_path, ResolvedConfig};
use bankroll::format::format_amount;
use bankroll::models::Id;
use bankroll::pipeline::{
    BankOutcome, FixedSyncPrompter, Pipeline, PipelineContext, RunReport, SyncOutcome,
    SyncPrompter,
};
use bankroll::report::{render_change, render_history_line, render_matured, render_snapshot};
use bankroll::storage::{JsonFileSnapshotStore, SnapshotStore};
use bankroll::sync::{RemoteCredentials, SyncEngine};
use bankroll::clock::{Clock, SystemClock};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bankroll")]
#[command(about = "Daily bank balance and FD snapshots")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON on stderr
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract every configured bank into today's snapshot, then offer to sync
    Run {
        /// Only process these banks (repeatable)
        #[arg(long = "bank", value_name = "ID")]
        banks: Vec<String>,

        /// Sync without asking
        #[arg(long, conflicts_with = "no_sync")]
        yes: bool,

        /// Never sync
        #[arg(long)]
        no_sync: bool,
    },
    /// Push a stored snapshot to the remote tracker
    Sync {
        /// Snapshot date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Sync without asking
        #[arg(long)]
        yes: bool,
    },
    /// Print a stored snapshot
    Show {
        /// Snapshot date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List stored snapshots with their totals
    History,
    /// Show current configuration
    Config,
}

struct ConfirmPrompter;

impl SyncPrompter for ConfirmPrompter {
    fn confirm_sync(&self, prompt: &str) -> Result<bool> {
        use dialoguer::console::Term;
        use dialoguer::{theme::ColorfulTheme, Confirm};

        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact_on(&Term::stderr())
            .context("Failed to prompt for sync confirmation")
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

fn print_run_summary(report: &RunReport, config: &ResolvedConfig) {
    for outcome in &report.outcomes {
        match outcome {
            BankOutcome::Processed { report: bank } => {
                if bank.reconciled.is_empty() {
                    println!("{}: no configured accounts found", bank.bank_id);
                }
                // FD count as stored, so pooled banks show the whole pool.
                for account in &bank.reconciled {
                    println!(
                        "{}: {}, FDs: {}",
                        account.label,
                        format_amount(account.balance, &config.display),
                        account.fd_count
                    );
                }
            }
            BankOutcome::Failed { bank, error } => {
                println!("{bank}: FAILED ({error})");
            }
        }
    }
    println!(
        "Saved {} account(s) for {}",
        report.snapshot.len(),
        report.date
    );
}

async fn sync_day(
    pipeline: &Pipeline,
    config: &ResolvedConfig,
    date: NaiveDate,
    prompter: &dyn SyncPrompter,
) -> Result<()> {
    let remote = config
        .remote
        .as_ref()
        .context("No [remote] section in config; cannot sync")?;
    let connect = || -> Result<(SyncEngine, RemoteCredentials)> {
        let engine = SyncEngine::new(Arc::new(remote.backend()?));
        Ok((engine, remote.credentials()?))
    };

    match pipeline.sync(date, prompter, connect).await?
    {
        SyncOutcome::Synced { count } => println!("Uploaded {count} account(s) for {date}"),
        SyncOutcome::Declined => println!("Sync skipped"),
        SyncOutcome::NothingToSync => println!("No accounts stored for {date}; nothing to sync"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)?;
    let today = SystemClock.today();

    match cli.command {
        Command::Run {
            banks,
            yes,
            no_sync,
        } => {
            let only = banks
                .into_iter()
                .map(Id::from_string_checked)
                .collect::<Result<Vec<_>, _>>()?;
            let pipeline = Pipeline::new(config.banks.clone(), PipelineContext::from_config(&config));

            let report = pipeline.run(&only).await?;
            print_run_summary(&report, &config);

            if no_sync || config.remote.is_none() {
                return Ok(());
            }
            let prompter: Box<dyn SyncPrompter> = if yes {
                Box::new(FixedSyncPrompter::allow())
            } else {
                Box::new(ConfirmPrompter)
            };
            sync_day(&pipeline, &config, report.date, prompter.as_ref()).await?;
        }
        Command::Sync { date, yes } => {
            let pipeline = Pipeline::new(config.banks.clone(), PipelineContext::from_config(&config));
            let prompter: Box<dyn SyncPrompter> = if yes {
                Box::new(FixedSyncPrompter::allow())
            } else {
                Box::new(ConfirmPrompter)
            };
            sync_day(&pipeline, &config, date.unwrap_or(today), prompter.as_ref()).await?;
        }
        Command::Show { date } => {
            let date = date.unwrap_or(today);
            let store = JsonFileSnapshotStore::new(&config.data_dir);
            let snapshot = store
                .get(date)
                .await?
                .with_context(|| format!("No snapshot stored for {date}"))?;

            println!("{}", render_snapshot(&snapshot, &config.display));
            let matured = render_matured(&snapshot, &config.display);
            if !matured.is_empty() {
                println!();
                for line in matured {
                    println!("{line}");
                }
            }
            if let Some(previous) = store.latest_before(date).await? {
                println!();
                println!("{}", render_change(&previous, &snapshot, &config.display));
            }
        }
        Command::History => {
            let store = JsonFileSnapshotStore::new(&config.data_dir);
            let dates = store.list_dates().await?;
            if dates.is_empty() {
                println!("No snapshots stored in {}", config.data_dir.display());
            }
            for date in dates {
                if let Some(snapshot) = store.get(date).await? {
                    println!("{}", render_history_line(&snapshot, &config.display));
                }
            }
        }
        Command::Config => {
            println!("Config file: {}", config.config_path.display());
            println!("Data directory: {}", config.data_dir.display());
            println!("Banks:");
            for bank in &config.banks {
                println!(
                    "  {} ({} - {}): {} account(s)",
                    bank.id,
                    bank.name,
                    bank.holder_name,
                    bank.accounts.len()
                );
            }
            match &config.remote {
                Some(remote) => println!("Remote: {} ({:?} mode)", remote.url, remote.mode),
                None => println!("Remote: not configured"),
            }
            println!(
                "Display: {} ({:?} grouping)",
                config.display.currency_symbol, config.display.grouping
            );
            println!("Ambiguous matches: {:?}", config.reconcile.on_ambiguous);
        }
    }

    Ok(())
}
