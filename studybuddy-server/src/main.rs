use clap::Parser;
use studybuddy_server::{ServerConfig, run_server, telemetry::init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_tracing(config.verbose, config.json_logs);

    run_server(config).await
}
