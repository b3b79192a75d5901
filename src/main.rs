//! azstorage-rs demo server: the blob verbs over HTTP.

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use azstorage_rs::{ApiServer, Args, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug {
        Level::DEBUG
    } else if args.silent {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from(args);
    let server = ApiServer::new(config)?;
    server.run().await
}
