//! Clanview operator console
//!
//! Usage: clanview [server-url] [view-width]

use clanview_client::{runtime, ClientConfig};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clanview=info,clanview_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = ClientConfig::from_env()?;

    // Positional args override the environment
    let args: Vec<String> = env::args().collect();
    if let Some(url) = args.get(1) {
        config.server_url = url.clone();
    }
    if let Some(width) = args.get(2).and_then(|s| s.parse().ok()) {
        config.container_width = width;
    }
    config.validate()?;

    println!("Clanview");
    println!("========");
    println!("Server: {}", config.server_url);
    println!();

    runtime::run(config).await?;
    Ok(())
}
