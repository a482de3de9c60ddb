use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "23000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    match std::env::var("BTCPAY_API_KEY").ok().filter(|k| !k.is_empty()) {
        Some(key) => {
            info!(%addr, "listening, api key required");
            mock_server::run_with_api_key(listener, &key).await
        }
        None => {
            info!(%addr, "listening");
            mock_server::run(listener).await
        }
    }
}
