mod config;
mod history;
mod palette;
mod protocol;
mod registry;
mod routes;
mod state;
mod stroke;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid configuration");
    let port = config.port;

    let state = state::AppState::new(config);
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "sketchroom listening");
    axum::serve(listener, app).await.expect("server failed");
}
