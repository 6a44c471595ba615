//! `ticklist [bind]`: serve the todo list.
//!
//! Run with:
//!   RUST_LOG=info cargo run -- :8080

use std::process::ExitCode;

use ticklist::{Config, Error, Renderer, Server, Store, Todos, app};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Error> {
    let config = Config::from_env()?.with_args(std::env::args().skip(1))?;
    info!(bind = %config.bind, database = %config.database.display(), "configuration loaded");

    let store = Store::open(&config.database)?;
    let todos = Todos::new(store, Renderer::default());

    Server::new(config.bind).serve(app::router(todos)).await
}
