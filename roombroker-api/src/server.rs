//! Server bootstrap
//!
//! Startup is all-or-nothing: configuration, logging, the metrics exporter,
//! the store connection and the listener must all come up before the first
//! request is served.

use std::future::Future;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{info, warn};

use roombroker_core::config::Config;
use roombroker_core::logging::{init_logging_with_config, LogConfig};
use roombroker_core::registry::store::{self, CoordinationStore};
use roombroker_core::BrokerService;

use crate::error::StartupError;
use crate::proto::room_broker_server::RoomBrokerServer;
use crate::service::RoomBrokerService;

/// Connect the coordination store and wire the broker
pub async fn build_broker(config: &Config) -> Result<BrokerService, StartupError> {
    let store = store::open(config.store_url()?).await?;
    broker_over(config, store).await
}

/// Wire the broker over an opened store, failing if the store does not answer
pub async fn broker_over(
    config: &Config,
    store: Arc<dyn CoordinationStore>,
) -> Result<BrokerService, StartupError> {
    let store = store::ensure_reachable(store).await?;
    info!(instance = %config.instance.id, "Coordination store reachable");

    Ok(BrokerService::from_config(config, store)?)
}

/// Serve the broker on an already-bound listener until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    broker: BrokerService,
    shutdown: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()>,
{
    Server::builder()
        .add_service(RoomBrokerServer::new(RoomBrokerService::new(broker)))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await?;

    Ok(())
}

/// Full process lifecycle for the server binary
pub async fn run(config: Config) -> Result<(), StartupError> {
    init_logging_with_config(LogConfig::try_from(&config.logging)?)?;

    if config.metrics.enabled {
        PrometheusBuilder::new()
            .with_http_listener(config.metrics.bind_address)
            .install()
            .map_err(|e| StartupError::Metrics(e.to_string()))?;
        info!(address = %config.metrics.bind_address, "Prometheus exporter listening");
    }
    // Descriptions sent before a recorder is installed are dropped
    roombroker_core::metrics::init_metrics();

    let broker = build_broker(&config).await?;

    let listener = TcpListener::bind(config.server.listen_address).await?;
    info!(address = %listener.local_addr()?, "Room broker gRPC server starting");

    serve(listener, broker, shutdown_signal()).await?;

    info!("Room broker stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
