//! Bad Marketplace CLI - catalog browsing and a file-backed cart.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! bm-cli catalog list
//! bm-cli catalog search mug
//! bm-cli catalog tag office
//!
//! # Work with the cart stored in ./bad_marketplace.json
//! bm-cli cart add 3 -q 2
//! bm-cli cart update 3 5
//! bm-cli cart show
//! bm-cli cart checkout
//!
//! # Use another storage file and catalog
//! bm-cli --storage /tmp/cart.json --catalog products.json cart show
//! ```
//!
//! Output goes through `tracing`; set `RUST_LOG` to adjust verbosity.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use bad_marketplace_core::ProductId;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bm-cli")]
#[command(author, version, about = "Bad Marketplace CLI tools")]
struct Cli {
    /// JSON file standing in for the browser's storage area
    #[arg(long, global = true, default_value = "bad_marketplace.json")]
    storage: PathBuf,

    /// Product catalog JSON (defaults to the embedded demo catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse products
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage the stored cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List every product
    List,
    /// Search names, descriptions and tags
    Search {
        /// Search text (two characters or more)
        query: String,
    },
    /// Products with an exact tag
    Tag {
        tag: String,
    },
    /// Distinct tags
    Tags,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents and totals
    Show,
    /// Add a product
    Add {
        id: ProductId,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (zero or less removes it)
    Update {
        id: ProductId,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        id: ProductId,
    },
    /// Empty the cart
    Clear,
    /// Demo checkout
    Checkout,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bad_marketplace_cli=info,bad_marketplace_core=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = commands::load_catalog(cli.catalog.as_deref()).await?;

    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::List => commands::catalog::list(&catalog),
            CatalogAction::Search { query } => commands::catalog::search(&catalog, &query),
            CatalogAction::Tag { tag } => commands::catalog::tag(&catalog, &tag),
            CatalogAction::Tags => commands::catalog::tags(&catalog),
        },
        Commands::Cart { action } => {
            let mut cart = commands::cart::open(&cli.storage, catalog)?;
            match action {
                CartAction::Show => commands::cart::show(&cart),
                CartAction::Add { id, quantity } => {
                    commands::cart::add(&mut cart, id, quantity)?;
                }
                CartAction::Update { id, quantity } => {
                    commands::cart::update(&mut cart, id, quantity);
                }
                CartAction::Remove { id } => commands::cart::remove(&mut cart, id),
                CartAction::Clear => commands::cart::clear(&mut cart),
                CartAction::Checkout => commands::cart::checkout(&cart),
            }
        }
    }
    Ok(())
}
