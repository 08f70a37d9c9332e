//! # hook-relay
//!
//! Binary entry point for the hook-relay webhook service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes structured logging
//! - Wires default logging listeners onto the dispatcher
//! - Starts the HTTP server from the `hook_relay_service` library

use hook_relay_core::EventDispatcher;
use hook_relay_service::{config::ServiceConfig, errors::ServiceError, start_server};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hook_relay_service=info,hook_relay_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting hook-relay");

    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Sources (applied in order — later sources override earlier ones):
    //  1. /etc/hook-relay/service.yaml           — system-wide defaults
    //  2. ./config/service.yaml                  — deployment-local override
    //  3. Path given by HOOK_RELAY_CONFIG_FILE   — operator-specified file
    //  4. Environment variables prefixed HOOK_RELAY (double-underscore
    //     separator), e.g. HOOK_RELAY__SERVER__PORT=9090 sets server.port.
    //
    // Every field carries a serde default except the webhook secret, which
    // validate() enforces: a relay that cannot verify signatures must not
    // start.
    // -------------------------------------------------------------------------
    let mut config_builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/hook-relay/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    // Optional explicit path supplied by the operator.
    if let Ok(explicit_path) = std::env::var("HOOK_RELAY_CONFIG_FILE") {
        if !explicit_path.is_empty() {
            config_builder = config_builder.add_source(
                config::File::with_name(&explicit_path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
            info!(path = %explicit_path, "Loading configuration from explicit path");
        }
    }

    let config = match config_builder
        .add_source(config::Environment::with_prefix("HOOK_RELAY").separator("__"))
        .build()
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "Failed to build configuration; aborting");
            std::process::exit(3);
        }
    };

    let service_config: ServiceConfig = match config.try_deserialize() {
        Ok(sc) => sc,
        Err(e) => {
            error!(
                error = %e,
                "Could not deserialize service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    // -------------------------------------------------------------------------
    // Wire the dispatcher
    //
    // The binary installs logging listeners on the wildcard and error
    // channels so every delivery and every rejection leaves a trace line.
    // Applications embedding the library register their own listeners here
    // instead.
    // -------------------------------------------------------------------------
    let dispatcher = Arc::new(EventDispatcher::new());

    dispatcher.on("*", |event| {
        info!(
            event = %event.event,
            delivery_id = %event.delivery_id,
            "received webhook event"
        );
    });

    dispatcher.on_error(|failure, meta| {
        warn!(
            kind = failure.kind(),
            method = %meta.method,
            path = %meta.path,
            delivery_id = meta.delivery_id.as_deref().unwrap_or("<none>"),
            error = %failure,
            "webhook delivery rejected"
        );
    });

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        hook_path = %service_config.webhook.path,
        "Starting HTTP server"
    );

    // Start the server
    if let Err(e) = start_server(service_config, dispatcher, None).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }

    Ok(())
}
