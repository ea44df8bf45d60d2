use std::net::SocketAddr;

use accounts::config::Configuration;
use accounts::{app, initialize_state, telemetry};
use opentelemetry::global;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let config = Configuration::default().path(path).read();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Export spans and logs when a collector is configured.
    let (tracer_provider, logger_provider, otel_layer) = match &config.telemetry.otlp_endpoint {
        Some(endpoint) => {
            let tracer = telemetry::setup_tracer(endpoint)?;
            global::set_tracer_provider(tracer.clone());
            let (logger, bridge) = telemetry::setup_logging(endpoint)?;
            (Some(tracer), Some(logger), Some(bridge.with_filter(EnvFilter::new("info"))))
        },
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(otel_layer)
        .init();

    let metrics = if config.telemetry.metrics {
        Some(telemetry::setup_metrics_recorder()?)
    } else {
        None
    };

    let state = initialize_state(config.clone(), metrics).await?;

    let addr: SocketAddr = format!("{}:{}", config.address, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, version = %config.version, "server started");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(provider) = tracer_provider {
        if let Err(err) = provider.shutdown() {
            tracing::warn!(error = %err, "tracer provider did not shut down cleanly");
        }
    }
    if let Some(provider) = logger_provider {
        if let Err(err) = provider.shutdown() {
            tracing::warn!(error = %err, "logger provider did not shut down cleanly");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down");
}
