use std::panic;
use std::sync::Arc;

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coderoom::routes::create_app_router;
use coderoom::{AppState, Config};

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "coderoom=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    if config.execution_enabled() {
        info!("Code execution proxy enabled ({})", config.exec_service_url);
    } else {
        warn!("No execution service credentials configured - code execution will be disabled");
    }

    // CORS: lock down to the configured client origin, stay permissive
    // when none is set (local development).
    let cors = match config.cors_origins.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([CONTENT_TYPE])
                .allow_credentials(true),
            Err(_) => {
                warn!("Invalid CORS origin {:?}, falling back to permissive", origin);
                CorsLayer::permissive()
            }
        },
        None => CorsLayer::permissive(),
    };

    let server_address = config.server_address();
    let app_state = Arc::new(AppState::new(config));

    let app_routes = create_app_router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let listener = tokio::net::TcpListener::bind(&server_address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", server_address));

    info!("🚀 Server running on http://{}", server_address);
    info!("📡 WebSocket available at ws://{}/ws", server_address);
    info!("📚 Swagger UI available at http://{}/swagger", server_address);

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
