use clap::Parser;
use evmctl::cli::Cli;
use evmctl::config::Settings;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "evmctl=info",
        1 => "evmctl=debug",
        _ => "evmctl=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cli.run(&settings).await {
        error!("{e}");
        std::process::exit(1);
    }
}
