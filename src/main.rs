mod cli;

use std::path::PathBuf;

use actix_web::{App, HttpServer, web};
use clap::{Parser, Subcommand};
use dotdb::Config;
use dotdb::server::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dotdb")]
#[command(about = "A minimal persistent vector database")]
#[command(version)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the store files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Name of the store to open
    #[arg(short, long, global = true)]
    store: Option<String>,

    /// Vector dimension
    #[arg(short, long, global = true)]
    dimension: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session (default)
    Repl,

    /// Start the HTTP server
    Serve {
        /// Address to bind to
        #[arg(short, long)]
        bind: Option<String>,
    },
}

fn resolve_config(cli: &Cli) -> Result<Config, String> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(store) = &cli.store {
        config.store_name = store.clone();
    }
    if let Some(dimension) = cli.dimension {
        config.dimension = dimension;
    }
    if let Some(Commands::Serve { bind: Some(bind) }) = &cli.command {
        config.bind = bind.clone();
    }

    Ok(config)
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Some(Commands::Serve { .. }) => {
            let state = web::Data::new(AppState::open(&config).await?);
            info!(bind = %config.bind, store = %config.store_name, "serving");

            HttpServer::new(move || App::new().app_data(state.clone()).configure(dotdb::server::config))
                .bind(&config.bind)?
                .run()
                .await?;
        }
        Some(Commands::Repl) | None => cli::run_repl(&config).await?,
    }

    Ok(())
}
