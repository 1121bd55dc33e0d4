use sirius_jobs_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes,
    services::session_sweeper::start_session_sweeper,
    AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
    cancel.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(&config.log_format);

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool)?;
    let cancel = CancellationToken::new();

    {
        let worker = app_state.license_worker();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match worker.prime().await {
                Ok(primed) => info!(primed, "license recheck queue primed"),
                Err(e) => tracing::error!(error = ?e, "failed to prime license rechecks"),
            }
            worker.run(cancel).await;
        });
    }

    let mut scheduler = start_session_sweeper(
        app_state.session_service.clone(),
        &config.session_sweep_cron,
    )
    .await?;

    let app = routes::router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = ?e, "session sweeper did not shut down cleanly");
    }
    info!("server stopped");
    Ok(())
}
