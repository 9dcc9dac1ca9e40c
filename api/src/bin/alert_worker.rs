use api::{bootstrap::build_state, config::AppConfig, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing()?;

    // Worker mode always runs the evaluator loop, whatever the env says.
    let mut config = AppConfig::from_env()?;
    config.enable_alert_worker = true;
    let _state = build_state(&config).await?;
    tracing::info!(
        interval_secs = config.alert_interval.as_secs(),
        "alert worker started"
    );

    // The evaluator loop was spawned in build_state; park this task forever.
    std::future::pending::<()>().await;
    Ok(())
}
