// APIMAN - APIHub support assistant
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use apiman::config::{load_config, Config};
use apiman::errors::{database_open_error, describe_startup_error};
use apiman::metrics::ServiceMetrics;
use apiman::notify::{create_notifier, DisabledNotifier, Notifier};
use apiman::providers::create_provider;
use apiman::router::QueryRouter;
use apiman::server::SupportServer;
use apiman::storage::SqliteStore;
use apiman::tickets::{TicketDesk, RECENTLY_CLOSED_LIMIT};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "apiman")]
#[command(about = "APIHub support assistant", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve {
        /// Bind address, overrides config and APIMAN_BIND
        #[arg(long)]
        bind: Option<String>,
    },
    /// Route a single question and print the reply
    Ask {
        /// Question text
        query: String,
    },
    /// List open and recently closed tickets
    Tickets,
    /// Close a ticket by id
    CloseTicket {
        id: String,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args = Args::parse();
    if let Err(e) = run(args.command.unwrap_or(Command::Serve { bind: None })).await {
        eprintln!("{}", describe_startup_error(&e));
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    let mut config = load_config()?;

    match command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            run_server(config).await
        }
        Command::Ask { query } => run_ask(&config, &query).await,
        Command::Tickets => run_list_tickets(&config).await,
        Command::CloseTicket { id } => run_close_ticket(&config, &id).await,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Bridge `log` records from dependencies
    tracing_log::LogTracer::init().ok();
}

fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let path = config.database_path.display().to_string();
    let store = SqliteStore::open(&config.database_path)
        .map_err(|e| anyhow::anyhow!(database_open_error(&path, e)))?;
    tracing::info!(path = %path, "Document store opened");
    Ok(Arc::new(store))
}

fn notifier_for(config: &Config) -> Arc<dyn Notifier> {
    match create_notifier(config) {
        Ok(notifier) => Arc::from(notifier),
        Err(e) => {
            tracing::warn!("Ticket notifications disabled: {:#}", e);
            Arc::new(DisabledNotifier)
        }
    }
}

async fn run_server(config: Config) -> Result<()> {
    let store = open_store(&config)?;
    let llm = create_provider(&config.llm)?;
    let server = SupportServer::new(&config, store, llm, notifier_for(&config))?;
    server.serve().await
}

fn ticket_desk(config: &Config, store: Arc<SqliteStore>) -> Result<TicketDesk> {
    let metrics = ServiceMetrics::new()?;
    Ok(TicketDesk::new(store, notifier_for(config), metrics))
}

async fn run_ask(config: &Config, query: &str) -> Result<()> {
    let store = open_store(config)?;
    let metrics = ServiceMetrics::new()?;
    let desk = TicketDesk::new(store, notifier_for(config), metrics.clone());
    let router = QueryRouter::new(create_provider(&config.llm)?, desk, metrics)
        .with_history_window(config.history_window)
        .with_temperature(config.llm.temperature);

    let outcome = router.route(query, &[]).await;
    println!("{}", outcome.reply);
    if let Some(ticket_id) = outcome.ticket_id() {
        eprintln!("Ticket #{} created", ticket_id);
    }
    Ok(())
}

async fn run_list_tickets(config: &Config) -> Result<()> {
    let desk = ticket_desk(config, open_store(config)?)?;
    let now = chrono::Utc::now();

    let open = desk.open_tickets().await.context("Failed to load open tickets")?;
    println!("Open tickets ({}):", open.len());
    for ticket in &open {
        println!(
            "  {}  {}  [{}h open]  {}",
            ticket.id,
            ticket.created_at.format("%Y-%m-%d %H:%M"),
            ticket.hours_open(now),
            ticket.title
        );
    }

    let closed = desk
        .recently_closed(RECENTLY_CLOSED_LIMIT)
        .await
        .context("Failed to load closed tickets")?;
    println!("Recently closed ({}):", closed.len());
    for ticket in &closed {
        println!("  {}  {}h  {}", ticket.id, ticket.hours_open(now), ticket.title);
    }
    Ok(())
}

async fn run_close_ticket(config: &Config, id: &str) -> Result<()> {
    let desk = ticket_desk(config, open_store(config)?)?;
    let ticket = desk
        .close(id)
        .await
        .with_context(|| format!("Failed to close ticket {}", id))?;
    println!("Ticket #{} closed", ticket.id);
    Ok(())
}
