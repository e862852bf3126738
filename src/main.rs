// src/main.rs

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use linguatech_client::cli::{self, Cli};
use linguatech_client::config::Config;

#[tokio::main]
async fn main() {
    dotenv().ok();
    // Parse first so --help works without any environment set up.
    let cli = Cli::parse();
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "client.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::new(&config.rust_log);
    // Stderr keeps log lines out of the interactive quiz output.
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    tracing::info!("LinguaTech client starting");

    if let Err(e) = cli::run(cli.command, config).await {
        tracing::error!("Command failed: {}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}
