use energy_monitor::api::{routes, ApiState};
use energy_monitor::repositories::{DashboardRepository, RateRepository, RollupRepository};
use energy_monitor::rollup::RollupEngine;
use energy_monitor::{db, Config};
use tracing::info;
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
    info!("configuration loaded");

    let pool = db::connect(&cfg.database).await?;
    db::init_schema(&pool).await?;
    info!("connected to database");

    let engine = RollupEngine::new(
        RollupRepository::new(pool.clone()),
        RateRepository::new(pool.clone()),
        cfg.rollup.sample_interval_secs,
        cfg.rollup.interval_secs,
    );
    tokio::spawn(engine.run());
    info!(interval_secs = cfg.rollup.interval_secs, "rollup engine scheduled");

    let state = ApiState {
        dashboard: DashboardRepository::new(pool.clone()),
        rates: RateRepository::new(pool),
    };
    let app = routes::create_router(state);

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    info!("starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
