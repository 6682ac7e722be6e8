mod fanout;

use anyhow::Context;
use basalt_admission::AdmissionQueue;
use basalt_config::BasaltConfig;
use fanout::FanOut;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            BasaltConfig::load(&path).with_context(|| format!("loading config from {path}"))?
        }
        None => BasaltConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level)?)
        .init();

    let queue = AdmissionQueue::new(config.admission)?;
    let fanout = FanOut::new(queue, config.workload);

    let limits = fanout.limits();
    info!(
        max_concurrent = limits.max_concurrent,
        max_queue_size = limits.max_queue_size,
        tasks = config.workload.tasks,
        "BASALT: starting fan-out"
    );

    let report = fanout.run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
