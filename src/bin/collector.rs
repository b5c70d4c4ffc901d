use energy_monitor::collector::Collector;
use energy_monitor::device::DeviceClient;
use energy_monitor::repositories::ReadingRepository;
use energy_monitor::{db, Config};
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let cfg = Config::from_env()?;
    info!(
        device_ip = %cfg.device.ip,
        poll_interval_secs = cfg.collector.poll_interval_secs,
        "configuration loaded"
    );

    let pool = db::connect(&cfg.database).await?;
    db::init_schema(&pool).await?;
    info!("connected to database");

    let device = DeviceClient::connect(&cfg.device).await?;
    info!(device_id = %device.device_id(), "device client ready");

    let readings = ReadingRepository::new(pool);
    let mut collector = Collector::initialize(device, readings, cfg.collector.clone()).await?;
    info!("starting data collection");

    let interval = Duration::from_secs(cfg.collector.poll_interval_secs);
    let sig = tokio::signal::ctrl_c();
    tokio::pin!(sig);
    loop {
        // An in-flight tick always completes; shutdown is observed during
        // the inter-tick sleep.
        match collector.tick().await {
            Ok(stored) => debug!(stored, "tick complete"),
            Err(e) => error!("error in data collection: {e}"),
        }

        tokio::select! {
            biased;
            _ = &mut sig => {
                info!("shutdown requested; data collection stopped");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    Ok(())
}
