use anyhow::Context;
use clap::{Parser, Subcommand};
use district_registry::{server, AppConfig, LonLat, RegistryCache};
use geo::Area;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the district API for the dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print all district names, sorted
    List {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the district containing a lon/lat point
    Locate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
    },
    /// Print centroid, bounds and area of one district
    Inspect {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cache = RegistryCache::new();

    match &cli.command {
        Commands::Serve { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            let registry = cache
                .get_or_load(&app_config.boundary_source()?)
                .context("Failed to load district boundaries")?;

            server::start_server(app_config, registry).await?;
        }
        Commands::List { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            let registry = cache.get_or_load(&app_config.boundary_source()?)?;

            for name in registry.list_names() {
                println!("{}", name);
            }
        }
        Commands::Locate { config, lon, lat } => {
            let app_config = AppConfig::load_from_file(config)?;
            let registry = cache.get_or_load(&app_config.boundary_source()?)?;

            match registry.find_containing(LonLat::new(*lon, *lat))? {
                Some(district) => println!("{}", district.name),
                None => println!("No district contains ({}, {})", lon, lat),
            }
        }
        Commands::Inspect { config, name } => {
            let app_config = AppConfig::load_from_file(config)?;
            let registry = cache.get_or_load(&app_config.boundary_source()?)?;

            let boundary = registry.boundary_of(name)?;
            let centroid = registry.centroid_of(name)?;
            let [min_lon, min_lat, max_lon, max_lat] = registry.bounds_of(name)?;

            println!("{}", name);
            println!("  polygons: {}", boundary.0.len());
            println!("  centroid: {:.6}, {:.6}", centroid.lon, centroid.lat);
            println!("  bounds:   {:.6}, {:.6} .. {:.6}, {:.6}", min_lon, min_lat, max_lon, max_lat);
            println!("  area:     {:.8} sq deg", boundary.unsigned_area());
        }
    }

    Ok(())
}
