use clap::Parser;
use mock_service::Behavior;
use std::net::SocketAddr;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(about = "Local stand-in for the PKA event search endpoint.")]
struct MockCli {
    #[arg(short, long, default_value = "0.0.0.0:1234")]
    addr: SocketAddr,

    /// `ok`, `status:<code>`, `limited:<tps>`, `delay:<ms>` or `flaky:<probability>`.
    #[arg(short, long, default_value_t = Behavior::Ok)]
    behavior: Behavior,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=debug,tower_http=info")),
        )
        .init();

    let args = MockCli::parse();
    tracing::info!("Serving {} on {}", args.behavior, args.addr);

    tokio::spawn(mock_service::tps_measure_task());
    mock_service::run(args.addr, args.behavior).await
}
