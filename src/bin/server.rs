use log::{error, info, warn};
use std::net::SocketAddr;

use sitework::config::ServerConfig;
use sitework::core::AppState;
use sitework::handlers;

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, storage={}, tls={}",
        config.host,
        config.port,
        if config.storage.is_hosted() { "hosted" } else { "memory" },
        config.enable_tls
    );
    if config.development_mode {
        warn!("Development mode is enabled");
    }

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let state = match AppState::from_config(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            std::process::exit(1);
        }
    };
    state.start_background_tasks();

    let routes = handlers::routes(state.clone());

    match (&state.config.tls_cert_path, &state.config.tls_key_path) {
        (Some(cert), Some(key)) if state.config.enable_tls => {
            info!("Starting SiteWork API on https://{}", addr);
            warp::serve(routes)
                .tls()
                .cert_path(cert)
                .key_path(key)
                .run(addr)
                .await;
        }
        _ => {
            info!("Starting SiteWork API on http://{}", addr);
            warp::serve(routes).run(addr).await;
        }
    }
}
