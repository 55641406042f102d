use anyhow::anyhow;
use axum::serve;
use futures::TryFutureExt;
use gateway::{app, build_app_state, get_config_info, get_log_level, setup_logger, GatewaySettings};
use log::{error, info, warn};
use std::{net::SocketAddr, str::FromStr};
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = get_config_info();
    let log_level = get_log_level(&cli);

    setup_logger()
        .level(log_level)
        .level_for("gateway", log_level)
        .level_for("http_response", log_level)
        .level_for("http_request", log_level)
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .apply()?;

    if let Some(err) = &cli.config_error {
        warn!("{}, using defaults", err);
    }

    let host = cli.host();
    let port = cli.port();
    let settings = GatewaySettings {
        data_dir: cli.data_dir(),
        provider_url: cli.provider_url(),
        user_agent: cli.user_agent(),
        request_timeout: cli.request_timeout(),
        retries: cli.retries(),
        cache_ttl: cli.cache_ttl(),
    };

    let socket_addr = SocketAddr::from_str(&format!("{}:{}", host, port))
        .map_err(|e| anyhow!("invalid address: {}", e))?;

    info!("wxshim gateway starting...");
    info!("  Listen:    http://{}", socket_addr);
    info!("  Docs:      http://{}/docs", socket_addr);
    info!("  Shards:    {}", settings.data_dir);
    info!("  Forecasts: {}", settings.provider_url);

    let app_state = build_app_state(settings).await.map_err(|e| {
        error!("error building app: {}", e);
        e
    })?;

    let listener = TcpListener::bind(socket_addr)
        .map_err(|e| anyhow!("error binding to socket: {}", e))
        .await?;

    serve(
        listener,
        app(app_state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("wxshim gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
