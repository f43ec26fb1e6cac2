//! InkRoom relay server binary.

use inkroom_server::{RelayConfig, RelayError, serve};

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkroom_server=info,tower_http=info".into()),
        )
        .init();

    let config = RelayConfig::from_env()?;
    serve(config).await
}
