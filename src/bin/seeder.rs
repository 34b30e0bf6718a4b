use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bootcamp_api::config::AppConfig;
use bootcamp_api::database::{seed, PgStore};

#[derive(Parser)]
#[command(name = "bootcamp-seeder", about = "Import or destroy bootcamp directory sample data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Import users, bootcamps and courses from JSON files")]
    Import {
        #[arg(long, help = "Directory holding users.json, bootcamps.json and courses.json", default_value = "_data")]
        data_dir: PathBuf,
    },

    #[command(about = "Delete every user, bootcamp and course")]
    Destroy,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let url = config
        .database
        .url
        .as_deref()
        .context("DATABASE_URL must be set to seed a database")?;

    let store = PgStore::connect(url, &config.database).await?;
    store.migrate().await?;

    match cli.command {
        Commands::Import { data_dir } => {
            let report = seed::import(&store, &data_dir).await?;
            println!(
                "Data imported: {} users, {} bootcamps, {} courses",
                report.users, report.bootcamps, report.courses
            );
        }
        Commands::Destroy => {
            let removed = seed::destroy(&store).await?;
            println!("Data destroyed: {} documents", removed);
        }
    }
    Ok(())
}
