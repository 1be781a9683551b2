use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use manutrack::{
    Advance, Manuscript, ManuscriptDraft, ManuscriptPatch, ManuscriptQuery, MutationCoordinator,
    Priority, ReviewQueue, Status, TrackerConfig, TrackerError,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "manutrack", version, about = "Track manuscripts through the review workflow")]
struct Cli {
    /// Use the on-device store regardless of environment settings
    #[arg(long, global = true)]
    offline: bool,

    /// Data directory for the on-device store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL of the remote tracker service
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List manuscripts
    List {
        #[arg(long)]
        status: Option<Status>,
    },
    /// Log a new manuscript
    Add {
        manuscript_id: String,
        journal_code: String,
        #[arg(long, default_value = "Normal")]
        priority: Priority,
        #[arg(long, default_value = "UNTOUCHED")]
        status: Status,
    },
    /// Change the status of one manuscript
    Status { id: String, status: Status },
    /// Change the priority of one manuscript
    Priority { id: String, priority: Priority },
    /// Move several manuscripts to one status
    BulkStatus {
        status: Status,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Record that a query was raised
    Query { id: String },
    /// Record that a notification email was sent
    Email { id: String },
    /// Add a note
    Note { id: String, text: String },
    /// Delete a manuscript permanently
    Delete {
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Review manuscripts one at a time, marking each worked
    Review {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    SetTarget { target: u32 },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let gateway = config
        .build_gateway()
        .context("failed to open persistence gateway")?;
    let coordinator = Arc::new(MutationCoordinator::new(gateway));
    coordinator
        .bootstrap()
        .await
        .context("failed to load manuscripts")?;

    if let Err(err) = run(&coordinator, cli.command).await {
        if err
            .downcast_ref::<TrackerError>()
            .is_some_and(TrackerError::is_local_rejection)
        {
            eprintln!("nothing was sent to the backing store");
        }
        return Err(err);
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("manutrack=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_config(cli: &Cli) -> Result<TrackerConfig> {
    if cli.offline {
        return Ok(match &cli.data_dir {
            Some(dir) => TrackerConfig::local(dir.clone()),
            None => TrackerConfig::local_from_env(),
        });
    }
    if let Some(url) = &cli.api_url {
        return Ok(TrackerConfig::remote(url.clone()));
    }

    let config = TrackerConfig::from_env().context("invalid environment configuration")?;
    match (&cli.data_dir, config.backend.name()) {
        (Some(dir), "local") => Ok(TrackerConfig::local(dir.clone())),
        _ => Ok(config),
    }
}

async fn run(coordinator: &MutationCoordinator, command: Command) -> Result<()> {
    match command {
        Command::List { status } => {
            let mut query = ManuscriptQuery::new();
            query.status = status;
            for manuscript in coordinator.query(&query).await {
                print_row(&manuscript);
            }
            let counts = coordinator.status_counts().await;
            let summary: Vec<String> = counts
                .iter()
                .map(|(status, count)| format!("{}={}", status, count))
                .collect();
            println!("{}", summary.join("  "));
            warn_if_stale(coordinator).await;
        }
        Command::Add {
            manuscript_id,
            journal_code,
            priority,
            status,
        } => {
            let draft = ManuscriptDraft::new(manuscript_id, journal_code)
                .priority(priority)
                .status(status);
            let created = coordinator.create_entity(draft).await?;
            print_row(&created);
        }
        Command::Status { id, status } => {
            report(&id, coordinator.set_status(&id, status).await?)?;
        }
        Command::Priority { id, priority } => {
            report(&id, coordinator.set_priority(&id, priority).await?)?;
        }
        Command::BulkStatus { status, ids } => {
            let outcome = coordinator
                .bulk_update(&ids, ManuscriptPatch::new().status(status))
                .await;
            warn_if_stale(coordinator).await;
            println!("{} manuscript(s) moved to {}", outcome?, status);
        }
        Command::Query { id } => {
            report(&id, coordinator.raise_query(&id).await?)?;
        }
        Command::Email { id } => {
            report(&id, coordinator.mark_emailed(&id).await?)?;
        }
        Command::Note { id, text } => {
            report(&id, coordinator.add_note(&id, &text).await?)?;
        }
        Command::Delete { id, yes } => {
            if !yes {
                bail!("deleting '{}' cannot be undone; re-run with --yes to confirm", id);
            }
            if coordinator.delete_entity(&id).await? {
                println!("deleted {}", id);
            }
        }
        Command::Review { ids } => review(coordinator, &ids).await?,
        Command::Settings { action } => match action {
            SettingsAction::Show => {
                let settings = coordinator.settings().await;
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            SettingsAction::SetTarget { target } => {
                let settings = coordinator.settings().await.target_per_cycle(target);
                let saved = coordinator.save_settings(settings).await?;
                println!("target per cycle: {}", saved.target_per_cycle);
            }
        },
    }
    Ok(())
}

async fn review(coordinator: &MutationCoordinator, ids: &[String]) -> Result<()> {
    let mut queue = ReviewQueue::new();
    let Some(mut item) = queue.start(coordinator, ids).await? else {
        println!("nothing to review");
        return Ok(());
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_row(&item.proposal);
        println!("confirm as WORKED? [y]es / [q]uit");
        let Some(answer) = lines.next_line().await? else {
            queue.cancel();
            break;
        };

        match answer.trim() {
            "y" | "Y" | "yes" => match queue.confirm_and_advance(coordinator, item.proposal.clone()).await {
                Ok(Advance::Next(next)) => item = next,
                Ok(Advance::Finished) => break,
                Err(err) => eprintln!("could not save {}: {} (try again or quit)", item.id, err),
            },
            "q" | "Q" | "quit" => {
                let abandoned = queue.cancel();
                println!("stopped; {} manuscript(s) left unreviewed", abandoned.len());
                break;
            }
            _ => println!("please answer y or q"),
        }
    }

    println!("{} manuscript(s) confirmed", queue.confirmed().len());
    Ok(())
}

async fn warn_if_stale(coordinator: &MutationCoordinator) {
    if coordinator.is_stale().await {
        eprintln!("warning: could not resync with the backing store; the list may show unsaved changes");
    }
}

fn report(id: &str, outcome: Option<Manuscript>) -> Result<()> {
    match outcome {
        Some(manuscript) => {
            print_row(&manuscript);
            Ok(())
        }
        None => bail!("no manuscript with id '{}'", id),
    }
}

fn print_row(manuscript: &Manuscript) {
    let due = manuscript
        .due_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    let completed = manuscript
        .visible_completed_date()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<36}  {:<14}  {:<8}  {:<11}  {:<6}  due {}  done {}  notes {}",
        manuscript.id,
        manuscript.manuscript_id,
        manuscript.journal_code,
        manuscript.status,
        manuscript.priority,
        due,
        completed,
        manuscript.notes.len()
    );
}
