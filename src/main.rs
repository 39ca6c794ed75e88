use anyhow::Context;
use lectern_app::{register_all, AppServices};
use lectern_kernel::{settings::Settings, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load Lectern settings")?;
    lectern_telemetry::init(&settings.telemetry);

    tracing::info!(
        env = ?settings.environment,
        store = ?settings.database.path,
        theme = settings.theme.active.display_name(),
        "lectern bootstrap starting"
    );

    let services = AppServices::build(settings)?;
    let mut registry = ModuleRegistry::new();
    register_all(&mut registry, &services)?;

    let ctx = services.init_ctx();
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = lectern_http::start_server(&registry, &services.settings, shutdown_signal()).await;

    registry.stop_all().await?;
    tracing::info!("lectern shut down");
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
