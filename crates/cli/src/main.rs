//! Harbor & Pine CLI - Dataset checks and pricing tools.
//!
//! # Usage
//!
//! ```bash
//! # Validate the embedded seed dataset
//! harbor-cli seed check
//!
//! # Validate and export another dataset as JSON
//! harbor-cli seed export --file ./store.yaml --out store.json
//!
//! # Price a cart: two of variant 101, express shipping, with a coupon
//! harbor-cli quote --item 101:2 --coupon WELCOME10 --express
//! ```
//!
//! # Commands
//!
//! - `seed check` - Run the dataset integrity checks
//! - `seed export` - Write the dataset as JSON
//! - `quote` - Price a cart against the dataset's settings and coupons
//!
//! `--file` defaults to `HARBOR_SEED_FILE` (also read from `.env`), and to
//! the embedded seed when that is unset.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use harbor_core::cart::ShippingMethod;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CommandError;
use commands::quote::ItemSpec;

#[derive(Parser)]
#[command(name = "harbor-cli")]
#[command(author, version, about = "Harbor & Pine CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check or export the seed dataset
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
    /// Price a cart
    Quote {
        #[command(flatten)]
        source: DatasetArgs,

        /// Cart line as VARIANT_ID:QUANTITY (repeatable)
        #[arg(short, long = "item", required = true)]
        items: Vec<ItemSpec>,

        /// Coupon code to apply
        #[arg(short, long)]
        coupon: Option<String>,

        /// Use express shipping
        #[arg(long)]
        express: bool,
    },
}

#[derive(Subcommand)]
enum SeedAction {
    /// Validate dataset integrity
    Check {
        #[command(flatten)]
        source: DatasetArgs,
    },
    /// Write the dataset as JSON
    Export {
        #[command(flatten)]
        source: DatasetArgs,

        /// Output path
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Args)]
struct DatasetArgs {
    /// YAML dataset to load instead of the embedded seed
    #[arg(short, long, env = "HARBOR_SEED_FILE")]
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "harbor_cli=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().without_time().with_target(false))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Seed { action } => match action {
            SeedAction::Check { source } => {
                commands::seed::check(source.file.as_deref()).await?;
            }
            SeedAction::Export { source, out } => {
                commands::seed::export(source.file.as_deref(), &out).await?;
            }
        },
        Commands::Quote {
            source,
            items,
            coupon,
            express,
        } => {
            let dataset = commands::load_dataset(source.file.as_deref()).await?;
            let method = if express {
                ShippingMethod::Express
            } else {
                ShippingMethod::Standard
            };
            let report = commands::quote::build_quote(
                &dataset,
                &items,
                coupon.as_deref(),
                method,
                Utc::now(),
            )?;
            commands::quote::log_report(&report);
        }
    }
    Ok(())
}
