// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use storefront_server::{
    api::router, config::AppConfig, init_tracing, seed, state::AppState,
};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting storefront server");

    let state = AppState::from_config(&config).expect("Failed to initialize application state");

    if config.seed_sample_products {
        seed::seed_catalogue_if_empty(&state.store).expect("Failed to seed sample catalogue");
    }
    if let Some(admin) = &config.seed_admin {
        if seed::seed_admin(&state.store, admin).expect("Failed to seed bootstrap admin") {
            tracing::info!(username = %admin.username, "Bootstrap admin created");
        }
    }

    let allowed_origins = config.allowed_origins();
    tracing::info!(origins = ?allowed_origins, "CORS allow-list");
    let app = router(state, &allowed_origins);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read bound address");

    tracing::info!(%addr, "Storefront server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");
}

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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping...");
}
