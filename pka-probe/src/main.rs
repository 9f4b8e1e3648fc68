use clap::Parser;
use pka_probe::cli::ProbeCli;
use std::process::ExitCode;
#[allow(unused_imports)]
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pka_probe=info")),
        )
        .init();

    let cli = ProbeCli::parse();

    if let Some(addr) = cli.metrics_addr {
        install_metrics(addr)?;
    }

    let scenario = pka_probe::search_pka_event(&cli.settings())?;
    info!("Probing {}", scenario_target(&cli));
    let stats = scenario.with_config(cli.scenario_config()).await?;

    println!("{stats}");

    cli.export_summary(&stats)?;
    Ok(cli.exit_code(&stats))
}

fn scenario_target(cli: &ProbeCli) -> String {
    format!(
        "{}{}",
        cli.base_url.trim_end_matches('/'),
        pka_probe_core::SEARCH_PKA_EVENT_PATH
    )
}

#[cfg(feature = "metrics")]
fn install_metrics(addr: std::net::SocketAddr) -> anyhow::Result<()> {
    use anyhow::Context;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("unable to start the Prometheus exporter")?;
    info!("Serving metrics on {addr}");
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(addr: std::net::SocketAddr) -> anyhow::Result<()> {
    warn!("Ignoring --metrics-addr {addr}: built without the `metrics` feature.");
    Ok(())
}
