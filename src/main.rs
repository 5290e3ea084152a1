use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info};

use chaos_admission::health::{HealthState, run_health_server};
use chaos_admission::validation;
use chaos_admission::{Dispatcher, WebhookConfig, WebhookState, run_webhook_server};

/// Grace period for in-flight admission requests during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install the TLS crypto provider before any TLS operations
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
        && rustls::crypto::CryptoProvider::get_default().is_none()
    {
        return Err("Failed to install rustls crypto provider and no provider is available".into());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chaos_admission=info".parse()?),
        )
        .init();

    info!("Starting chaos-admission");

    let config = WebhookConfig::from_env()?;
    let registry = validation::init()?;
    let dispatcher = Dispatcher::new(registry);
    info!(
        tags = registry.len(),
        kinds = dispatcher.kind_names().count(),
        "Validation registry initialized"
    );

    let health_state = Arc::new(HealthState::new());
    health_state.metrics.set_registered_tags(registry.len());

    // Probes must answer even without certificates
    let health_handle = {
        let health_state = health_state.clone();
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!(error = %e, "Health server error");
            }
        })
    };

    let webhook_handle = if config.tls_available() {
        info!("TLS certificates found, starting webhook server");
        let state = Arc::new(WebhookState::new(dispatcher, Some(health_state.clone())));
        let webhook_config = config.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = run_webhook_server(&webhook_config, state).await {
                error!(error = %e, "Webhook server error");
            }
        });
        health_state.set_ready(true).await;
        Some(handle)
    } else {
        info!(
            cert = %config.cert_path.display(),
            key = %config.key_path.display(),
            "TLS certificates not found, webhook server disabled"
        );
        None
    };

    let webhook_future = async {
        if let Some(handle) = webhook_handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Webhook server task panicked");
            }
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = health_handle => {
            if let Err(e) = result {
                error!(error = %e, "Health server task panicked");
            }
        }
        _ = webhook_future => {}
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Stop receiving new admission requests
            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            info!(
                "Waiting {}s for in-flight requests to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;
        }
    }

    info!("chaos-admission stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
