//! kiosk CLI: run the kitchen and manage customers and orders.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use kiosk_rs::config::Config;
use kiosk_rs::engine::Kitchen;
use kiosk_rs::model::producer::ProducerId;
use kiosk_rs::model::{OrderId, State, Tier};
use kiosk_rs::storage::{MemoryStore, OrderStore, SqliteStore};
use kiosk_rs::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "kiosk", about = "Two-tier order dispatch for a restaurant kiosk")]
struct Cli {
    /// Read settings from a TOML file instead of the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the kitchen until interrupted
    Serve {
        /// Number of cooks (overrides KIOSK_COOKS)
        #[arg(long)]
        cooks: Option<usize>,
        /// Submit this many orders from a VIP and a regular customer at start
        #[arg(long, default_value_t = 0)]
        simulate: usize,
    },
    /// Customer operations
    Customer {
        #[command(subcommand)]
        action: CustomerAction,
    },
    /// Order operations
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Completed and incomplete order counts
    Stats,
}

#[derive(Subcommand)]
enum CustomerAction {
    /// Register a customer
    Add {
        name: String,
        /// Tier: vip or regular
        #[arg(long, default_value = "regular")]
        tier: Tier,
    },
    /// Stop a customer from submitting orders
    Retire { id: ProducerId },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Submit an order for a customer
    Submit { customer: ProducerId },
    /// List orders, newest first
    List {
        /// Filter by state (pending, in_progress, done)
        #[arg(long)]
        state: Option<State>,
        /// Maximum orders to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one order as JSON
    Show { id: OrderId },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::from_toml_file(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Command::Serve { cooks, simulate } => cmd_serve(config, cooks, simulate).await,
        Command::Customer { action } => {
            let store = open_store(&config)?;
            match action {
                CustomerAction::Add { name, tier } => {
                    let producer = store.add_producer(name, tier)?;
                    println!("{}  {}  {}", producer.id, producer.tier, producer.name);
                }
                CustomerAction::Retire { id } => {
                    store.retire_producer(id)?;
                    println!("Retired: {id}");
                }
            }
            Ok(())
        }
        Command::Order { action } => {
            let store = open_store(&config)?;
            match action {
                OrderAction::Submit { customer } => {
                    // Queued by the next `serve` on recovery.
                    let kitchen = Kitchen::with_store(store, config.kitchen_config());
                    let order = kitchen.submit_order(customer)?;
                    println!("Created: {} (tier: {})", order.id, order.tier);
                }
                OrderAction::List { state, limit } => cmd_order_list(&*store, state, limit)?,
                OrderAction::Show { id } => {
                    let order = store.get(id)?;
                    println!("{}", serde_json::to_string_pretty(&order)?);
                }
            }
            Ok(())
        }
        Command::Stats => {
            let stats = open_store(&config)?.stats()?;
            println!("Completed:  {}", stats.completed);
            println!("Incomplete: {}", stats.incomplete);
            Ok(())
        }
    }
}

fn open_store(config: &Config) -> anyhow::Result<Arc<SqliteStore>> {
    let path = config
        .db_path
        .as_ref()
        .context("KIOSK_DB_PATH (or db_path) must be set for this command")?;
    Ok(Arc::new(SqliteStore::open(path)?))
}

async fn cmd_serve(config: Config, cooks: Option<usize>, simulate: usize) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "kiosk".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let mut settings = config.kitchen_config();
    if let Some(n) = cooks {
        settings.pool_size = n;
    }

    let kitchen = match config.db_path {
        Some(ref path) => {
            let store = Arc::new(SqliteStore::open(path)?);
            let kitchen = Kitchen::with_store(Arc::clone(&store), settings);
            kitchen.recover()?;
            if simulate > 0 {
                let vip = store.add_producer("vip", Tier::Privileged)?;
                let regular = store.add_producer("regular", Tier::Standard)?;
                submit_alternating(&kitchen, vip.id, regular.id, simulate)?;
            }
            kitchen
        }
        None => {
            tracing::warn!("KIOSK_DB_PATH not set, orders are kept in memory only");
            let store = Arc::new(MemoryStore::new());
            let kitchen = Kitchen::with_store(Arc::clone(&store), settings);
            if simulate > 0 {
                let vip = store.add_producer("vip", Tier::Privileged);
                let regular = store.add_producer("regular", Tier::Standard);
                submit_alternating(&kitchen, vip.id, regular.id, simulate)?;
            }
            kitchen
        }
    };

    let wanted = kitchen.config().pool_size;
    let active = kitchen.workers().iter().filter(|w| w.worker.active).count();
    for i in active..wanted {
        kitchen.register_worker(format!("cook-{}", i + 1))?;
    }
    kitchen.start_pool(wanted);

    tokio::signal::ctrl_c().await.ok();
    kitchen.shutdown().await;

    let stats = kitchen.stats()?;
    tracing::info!(
        completed = stats.completed,
        incomplete = stats.incomplete,
        "kiosk stopped"
    );
    Ok(())
}

fn submit_alternating(
    kitchen: &Kitchen,
    vip: ProducerId,
    regular: ProducerId,
    count: usize,
) -> anyhow::Result<()> {
    for i in 0..count {
        let producer = if i % 2 == 0 { regular } else { vip };
        kitchen.submit_order(producer)?;
    }
    Ok(())
}

fn cmd_order_list(store: &dyn OrderStore, state: Option<State>, limit: usize) -> anyhow::Result<()> {
    let orders = store.list(state, limit)?;
    if orders.is_empty() {
        println!("No orders found.");
        return Ok(());
    }

    println!(
        "{:<8}  {:<10}  {:<11}  {:<8}  CREATED",
        "ID", "TIER", "STATE", "WORKER"
    );
    println!("{}", "-".repeat(64));
    for order in &orders {
        let short_id = &order.id.to_string()[..8];
        let worker = order
            .worker
            .map(|w| w.to_string()[..8].to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8}  {:<10}  {:<11}  {:<8}  {}",
            short_id,
            order.tier,
            order.state,
            worker,
            order.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!("\n{} order(s)", orders.len());
    Ok(())
}
