use std::path::PathBuf;

use class_server::{config::ServerConfig, events::ProgressNotifier, server, utils::init_log};
use clap::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    #[arg(short = 'H', long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Log directory (stdout when absent)
    #[arg(short, long)]
    log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();
    let _guard = init_log(args.log);

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(database) = args.database {
        config.database = database;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let options = SqliteConnectOptions::new()
        .filename(&config.database)
        .create_if_missing(true)
        .foreign_keys(true);
    let database = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!().run(&database).await?;

    let notifier = ProgressNotifier::new(config.event_capacity);
    let state = server::AppState::new(database, notifier);
    let app = server::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
