use anyhow::Context;
use clap::Parser;
use discord_image::config::{DEFAULT_CONFIG_FILE, RelayConfig};
use discord_image::infrastructure::{relay, staging};
use discord_image::models::ContainerId;
use discord_image::services::ingress::{IngressPolicy, IngressService};
use discord_image::{AppState, create_app};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the HTTP server
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Config file (falls back to $CONFIG_FILE, then config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & logging
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "discord_image=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Discord Image relay...");

    // 2. Configuration
    let config_path = args
        .config
        .or_else(|| std::env::var("CONFIG_FILE").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = RelayConfig::load(&config_path)
        .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
    config.validate()?;

    info!(
        "🛡️  Relay Config: Max Size={}MB, Auto Delete={}, Public Host={}, Proxy Host={}",
        config.max_upload_size / 1024 / 1024,
        config.auto_delete,
        config.public_host.as_deref().unwrap_or("<request host>"),
        config.proxy_host.as_deref().unwrap_or("<none>")
    );

    // 3. Staging directory and platform session, both required before serving
    let staging_store = staging::setup_staging(&config).await?;
    let discord = relay::setup_relay(&config).await?;

    let ingress = Arc::new(IngressService::new(
        staging_store,
        discord.clone(),
        config.cdn_origin.clone(),
        IngressPolicy {
            container: ContainerId::new(config.channel_id.clone()),
            max_upload_size: config.max_upload_size,
            auto_delete: config.auto_delete,
            public_host: config.public_host.clone(),
            proxy_host: config.proxy_host.clone(),
        },
    ));

    let state = AppState {
        relay: discord.clone(),
        ingress,
        config,
    };

    // 4. HTTP server
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ Server listening on: http://0.0.0.0:{}", args.port);
    info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", args.port);

    // 5. Serve until SIGINT/SIGTERM, then close the session
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    discord.close();

    if let Err(e) = served {
        error!("❌ Server runtime error: {}", e);
        return Err(e.into());
    }

    info!("👋 Relay exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
