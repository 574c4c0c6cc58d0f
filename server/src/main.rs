mod config;
mod routes;
mod services;
mod state;


use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::ProxyConfig::from_env().expect("invalid proxy configuration");
    let port = config.port;
    tracing::info!(
        target_api = %config.target_api,
        cookie_secure = config.cookie_secure,
        static_dir = config.static_dir.as_deref().unwrap_or("-"),
        "proxy configured"
    );

    let state = state::AppState::new(config).expect("upstream http client init failed");
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "dashboard proxy listening");
    axum::serve(listener, app).await.expect("server failed");
}
