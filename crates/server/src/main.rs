//! TTS Gateway Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use tts_gateway_config::{load_settings, Settings};
use tts_gateway_server::{build_synthesis_handle, create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration first; tracing depends on the observability section
    let env = std::env::var("TTS_GATEWAY_ENV").ok();
    let config = load_settings(env.as_deref())?;

    init_tracing(&config);

    tracing::info!("Starting TTS Gateway v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        env = env.as_deref().unwrap_or("default"),
        backend = ?config.synthesis.backend,
        max_chunk_chars = config.synthesis.max_chunk_chars,
        "Loaded configuration"
    );

    if config.observability.metrics_enabled {
        init_metrics()?;
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    let handle = Arc::new(build_synthesis_handle(&config.synthesis));
    if config.synthesis.warm_up {
        match handle.warm_up().await {
            Ok(()) => tracing::info!(backend = ?handle.backend_name(), "Synthesis backend loaded"),
            Err(e) => tracing::warn!(error = %e, "Backend warm-up failed; will retry on first request"),
        }
    }

    let state = AppState::new(config.clone(), handle);
    let cleanup_shutdown = state.output.start_cleanup_task();
    tracing::info!(
        directory = %state.output.directory().display(),
        retention_hours = config.output.retention_hours,
        "Started output cleanup task"
    );

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = cleanup_shutdown.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// Initialize tracing, exporting spans over OTLP when an endpoint is
/// configured and the `otlp` feature is built in.
fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("tts_gateway={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    #[cfg(feature = "otlp")]
    if let Some(otlp_endpoint) = &config.observability.otlp_endpoint {
        use opentelemetry_otlp::WithExportConfig;

        match opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(otlp_endpoint),
            )
            .with_trace_config(
                opentelemetry_sdk::trace::Config::default().with_resource(
                    opentelemetry_sdk::Resource::new(vec![
                        opentelemetry::KeyValue::new("service.name", "tts-gateway"),
                        opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    ]),
                ),
            )
            .install_batch(opentelemetry_sdk::runtime::Tokio)
        {
            Ok(tracer) => {
                let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

                subscriber.with(fmt_layer).with(otel_layer).init();

                tracing::info!(
                    endpoint = %otlp_endpoint,
                    "OpenTelemetry tracing enabled, exporting to OTLP endpoint"
                );
                return;
            }
            Err(e) => {
                eprintln!(
                    "Failed to initialize OpenTelemetry: {}. Falling back to console logging.",
                    e
                );
            }
        }
    }

    #[cfg(not(feature = "otlp"))]
    if config.observability.otlp_endpoint.is_some() {
        eprintln!("otlp_endpoint is set but this build lacks the `otlp` feature; ignoring it.");
    }

    subscriber.with(fmt_layer).init();
}
