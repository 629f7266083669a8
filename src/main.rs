use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use cppqd::http::{AppState, router};
use cppqd::{Config, ConnectionRegistry, Dashboard, Keyspace, RespConnector};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APP_NAME: &str = "📋 cppqd";

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

#[tokio::main]
async fn main() -> std::io::Result<()> {
    setup().await;
    run_forever().await
}

// -----------------------------------------------------------------------------
// ----- Setup -----------------------------------------------------------------

async fn setup() {
    // This has to be the first thing we do, because it initializes the config
    Config::init().await;

    init_tracing();
}

fn init_tracing() {
    let config = Config::snapshot();
    let filter = EnvFilter::try_new(config.log_level.as_str()).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// -----------------------------------------------------------------------------
// ----- Run -------------------------------------------------------------------

async fn run_forever() -> std::io::Result<()> {
    let config = Config::snapshot();

    let connector = RespConnector::new(config.store.connect_timeout, config.store.command_timeout);
    let registry = Arc::new(ConnectionRegistry::new(connector));
    let dashboard = Dashboard::new(
        registry.clone(),
        Keyspace::new(config.store.key_prefix.clone()),
        config.store.scan_count,
    );
    let app = router(Arc::new(AppState::new(dashboard, config.session.clone())));

    let socket = if config.listen_addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    socket.set_reuseaddr(true)?;
    socket.bind(config.listen_addr)?;

    let listener: TcpListener = socket.listen(1024)?;

    info!("{} listening on {}", APP_NAME, config.listen_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(e) = &served {
        error!("server error: {e}");
    }

    registry.shutdown().await;
    info!("{} stopped", APP_NAME);

    served
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("{} shutting down", APP_NAME);
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
