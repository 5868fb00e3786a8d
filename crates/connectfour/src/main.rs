use connectfour::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ConnectFourError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        http = %config.http_addr,
        ws = ?config.ws_addr,
        fallback_secs = config.matches.fallback_delay.as_secs(),
        "starting Connect Four server"
    );

    let server = ConnectFourServer::builder().config(config).build().await?;
    server.run().await
}
