//! localsync CLI
//!
//! Thin wrapper around localsync-core for inspecting a device's offline data
//! directory.
//!
//! ## Usage
//!
//! ```bash
//! # Connectivity, queue depth and cache summary
//! localsync status
//!
//! # Show or clear the cached cart
//! localsync cart show
//! localsync cart clear
//!
//! # Show or clear the cached profile
//! localsync profile show
//!
//! # Recently viewed products
//! localsync products recent --limit 5
//!
//! # Pending offline operations
//! localsync queue list
//! localsync queue remove <id>
//!
//! # Operations abandoned after their last retry
//! localsync dead-letters list
//!
//! # Record a connectivity observation
//! localsync network offline
//! ```

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use localsync_core::{EngineConfig, SyncEngine};

/// localsync - offline cache inspector
#[derive(Parser)]
#[command(name = "localsync")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and manage the offline cache and operation queue")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory (default: ~/.localsync/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show connectivity, sync and cache summary
    Status,

    /// Cached cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },

    /// Cached profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Cached products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },

    /// Offline operation queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },

    /// Abandoned operations
    DeadLetters {
        #[command(subcommand)]
        action: DeadLetterAction,
    },

    /// Record a connectivity observation
    Network {
        #[command(subcommand)]
        action: NetworkAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart items
    Show {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the cached cart
    Clear,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the cached profile
    Show {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the cached profile
    Clear,
}

#[derive(Subcommand)]
enum ProductsAction {
    /// Recently viewed products, newest first
    Recent {
        /// Maximum number of products to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Remove every cached product
    Clear,
}

#[derive(Subcommand)]
enum QueueAction {
    /// List pending operations, oldest first
    List {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove one pending operation
    Remove {
        /// Operation id
        id: String,
    },
    /// Remove every pending operation
    Clear,
}

#[derive(Subcommand)]
enum DeadLetterAction {
    /// List abandoned operations
    List,
    /// Empty the dead-letter log
    Clear,
}

#[derive(Subcommand)]
enum NetworkAction {
    /// Mark the device online (runs a sync pass on reconnection)
    Online,
    /// Mark the device offline
    Offline,
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".localsync")
        .join("data")
}

fn fmt_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let engine = SyncEngine::open(&data_dir, config)?;

    match cli.command {
        Commands::Status => {
            let network = engine.network_status();
            let profile = engine.profile_cache().load();

            println!("localsync v0.1.0");
            println!();
            println!("Network:");
            println!(
                "  State: {}",
                if network.is_connected { "online" } else { "offline" }
            );
            println!("  Last connected: {}", fmt_time(network.last_connected));
            println!("  Last disconnected: {}", fmt_time(network.last_disconnected));
            println!("  Last sync: {}", fmt_time(engine.last_sync()));
            println!();
            println!("Cache:");
            println!("  Cart items: {}", engine.cart_cache().item_count());
            match profile {
                Some(profile) => println!("  Profile: {} ({})", profile.display_name, profile.uid),
                None => println!("  Profile: (none)"),
            }
            println!("  Products: {}", engine.product_cache().read_all().len());
            println!();
            println!("Queue:");
            println!("  Pending operations: {}", engine.queue().len());
            println!("  Dead letters: {}", engine.dead_letters().len());
            println!();
            println!("Data directory: {}", data_dir.display());
        }

        Commands::Cart { action } => match action {
            CartAction::Show { json } => {
                let items = engine.cart_cache().load();
                if json {
                    println!("{}", serde_json::to_string_pretty(&items)?);
                } else if items.is_empty() {
                    println!("Cart is empty.");
                } else {
                    println!("Cart ({} items):", engine.cart_cache().item_count());
                    for item in &items {
                        println!(
                            "  {} x{}  {} {}  [{}/{}]  {}",
                            item.product_id,
                            item.selected_quantity,
                            item.price.amount,
                            item.price.currency_code,
                            item.selected_color,
                            item.selected_size,
                            item.title
                        );
                    }
                }
            }
            CartAction::Clear => {
                if !engine.cart_cache().clear() {
                    anyhow::bail!("Failed to clear cart cache");
                }
                println!("Cart cache cleared.");
            }
        },

        Commands::Profile { action } => match action {
            ProfileAction::Show { json } => match engine.profile_cache().record() {
                Some(record) if json => println!("{}", serde_json::to_string_pretty(&record)?),
                Some(record) => {
                    let profile = &record.value;
                    println!("Profile:");
                    println!("  UID: {}", profile.uid);
                    println!("  Name: {}", profile.display_name);
                    if let Some(email) = &profile.email {
                        println!("  Email: {}", email);
                    }
                    if !profile.bio.is_empty() {
                        println!("  Bio: {}", profile.bio);
                    }
                    println!(
                        "  Followers: {}  Following: {}",
                        profile.followers_count, profile.following_count
                    );
                    println!("  Last updated: {}", profile.last_updated.to_rfc3339());
                    println!("  Cached at: {}", record.cached_at.to_rfc3339());
                }
                None => println!("No cached profile."),
            },
            ProfileAction::Clear => {
                if !engine.profile_cache().clear() {
                    anyhow::bail!("Failed to clear profile cache");
                }
                println!("Profile cache cleared.");
            }
        },

        Commands::Products { action } => match action {
            ProductsAction::Recent { limit } => {
                let products = engine.product_cache().recently_viewed(limit);
                if products.is_empty() {
                    println!("No cached products.");
                } else {
                    println!("Recently viewed:");
                    for cached in products {
                        println!(
                            "  {}  {}  {} {}  (viewed {})",
                            cached.product.id,
                            cached.product.title,
                            cached.product.price.amount,
                            cached.product.price.currency_code,
                            cached.viewed_at.to_rfc3339()
                        );
                    }
                }
            }
            ProductsAction::Clear => {
                if !engine.product_cache().clear() {
                    anyhow::bail!("Failed to clear product cache");
                }
                println!("Product cache cleared.");
            }
        },

        Commands::Queue { action } => match action {
            QueueAction::List { json } => {
                let pending = engine.queue().pending();
                if json {
                    println!("{}", serde_json::to_string_pretty(&pending)?);
                } else if pending.is_empty() {
                    println!("Queue is empty.");
                } else {
                    println!("Pending operations ({}):", pending.len());
                    for op in pending {
                        print!(
                            "  {}  {}  retries {}/{}",
                            op.id,
                            op.type_name(),
                            op.retry_count,
                            op.max_retries
                        );
                        match op.last_error {
                            Some(error) => println!("  last error: {}", error),
                            None => println!(),
                        }
                    }
                }
            }
            QueueAction::Remove { id } => {
                if engine.queue().remove(&id)? {
                    println!("Removed {}", id);
                } else {
                    anyhow::bail!("No pending operation with id {}", id);
                }
            }
            QueueAction::Clear => {
                engine.queue().clear()?;
                println!("Queue cleared.");
            }
        },

        Commands::DeadLetters { action } => match action {
            DeadLetterAction::List => {
                let entries = engine.dead_letters().list();
                if entries.is_empty() {
                    println!("No dead letters.");
                } else {
                    println!("Dead letters ({}):", entries.len());
                    for entry in entries {
                        println!(
                            "  {}  {}  abandoned {}  last error: {}",
                            entry.operation.id,
                            entry.operation.type_name(),
                            entry.abandoned_at.to_rfc3339(),
                            entry.operation.last_error.as_deref().unwrap_or("-")
                        );
                    }
                }
            }
            DeadLetterAction::Clear => {
                if !engine.dead_letters().clear() {
                    anyhow::bail!("Failed to clear dead-letter log");
                }
                println!("Dead-letter log cleared.");
            }
        },

        Commands::Network { action } => {
            let online = matches!(action, NetworkAction::Online);
            match engine.observe(online).await {
                Some(report) => println!(
                    "Now online. Sync pass ran {} callbacks at {}.",
                    report.callbacks_run,
                    report.finished_at.to_rfc3339()
                ),
                None => println!("Now {}.", if online { "online" } else { "offline" }),
            }
        }
    }

    Ok(())
}
