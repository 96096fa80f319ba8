//! Dayliz CLI - Database migrations and geofence tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! dayliz migrate
//!
//! # Classify a location against the database
//! dayliz classify --lat 25.5138 --lon 90.2036
//!
//! # Classify offline against a zones file
//! dayliz classify --lat 25.5138 --lon 90.2036 --zones zones.json
//!
//! # Inspect the city dataset
//! dayliz cities list
//! dayliz cities check --file cities.json
//!
//! # Manage delivery zones
//! dayliz zones list
//! dayliz zones import zones.json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `classify` - Print the access decision for a coordinate as JSON
//! - `cities` - List served cities or check the dataset for overlaps
//! - `zones` - List active zones or import zones from a file

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "dayliz")]
#[command(author, version, about = "Dayliz geofencing tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Classify a location
    Classify {
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Zones file for offline classification (skips the database)
        #[arg(long)]
        zones: Option<PathBuf>,

        /// City dataset override (defaults to the bundled dataset)
        #[arg(long, env = "GEOFENCE_CITY_BOUNDARIES")]
        cities: Option<PathBuf>,

        /// Cart subtotal in INR; prints a delivery quote when ordering is possible
        #[arg(long)]
        subtotal: Option<Decimal>,
    },
    /// Inspect the city dataset
    Cities {
        #[command(subcommand)]
        action: CitiesAction,
    },
    /// Manage delivery zones
    Zones {
        #[command(subcommand)]
        action: ZonesAction,
    },
}

#[derive(Subcommand)]
enum CitiesAction {
    /// List served cities in lookup order
    List {
        /// City dataset override (defaults to the bundled dataset)
        #[arg(long, env = "GEOFENCE_CITY_BOUNDARIES")]
        file: Option<PathBuf>,
    },
    /// Validate the dataset and report overlapping cities
    Check {
        /// City dataset override (defaults to the bundled dataset)
        #[arg(long, env = "GEOFENCE_CITY_BOUNDARIES")]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ZonesAction {
    /// List active zones from the database
    List,
    /// Insert or update towns and zones from a zones file
    Import {
        /// Zones file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // clap reads `env` fallbacks, so load .env first
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Classify {
            lat,
            lon,
            zones,
            cities,
            subtotal,
        } => {
            let options = commands::classify::ClassifyOptions {
                zones_file: zones,
                cities_file: cities,
                subtotal,
            };
            commands::classify::run(lat, lon, &options).await?;
        }
        Commands::Cities { action } => match action {
            CitiesAction::List { file } => commands::cities::list(file.as_deref())?,
            CitiesAction::Check { file } => commands::cities::check(file.as_deref())?,
        },
        Commands::Zones { action } => match action {
            ZonesAction::List => commands::zones::list().await?,
            ZonesAction::Import { file } => commands::zones::import(&file).await?,
        },
    }
    Ok(())
}
