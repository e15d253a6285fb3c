use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
use voltmesh_federation::AggregationStrategy;
use voltmesh_node::{
    config::{load_config, ConfigFormat},
    service::DemoService,
};
use voltmesh_telemetry::{TelemetryConfig, TelemetryHandle};

#[derive(Debug, Parser)]
#[command(
    name = "voltmesh-node",
    version,
    about = "Runs the voltmesh federated learning network and cross-segment data hub demo"
)]
struct Cli {
    /// Path to configuration file (TOML or YAML).
    #[arg(long, default_value = "configs/voltmesh-node.toml")]
    config: PathBuf,
    /// Explicit configuration format override.
    #[arg(long, value_enum, default_value_t = ConfigFormat::Auto)]
    config_format: ConfigFormat,
    /// Override the number of rounds per demo task.
    #[arg(long)]
    rounds: Option<u32>,
    /// Seed every random source (connections, privacy noise).
    #[arg(long)]
    seed: Option<u64>,
    /// Force an aggregation strategy on every demo task.
    #[arg(long)]
    strategy: Option<AggregationStrategy>,
    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = load_config(&cli.config, cli.config_format)?;
    if let Some(rounds) = cli.rounds {
        config.demo.rounds = rounds;
    }
    if let Some(seed) = cli.seed {
        config.apply_seed(seed);
    }
    if let Some(strategy) = cli.strategy {
        config.demo.strategy = Some(strategy);
    }
    config.validate()?;

    let telemetry = TelemetryHandle::from_config(TelemetryConfig::sample("voltmesh-node"));
    let service = DemoService::new(config, telemetry.clone());
    let report = service.run()?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let snapshot = telemetry.flush();
    for (name, value) in &snapshot.counters {
        tracing::info!(counter = %name, value, "telemetry");
    }
    Ok(())
}
