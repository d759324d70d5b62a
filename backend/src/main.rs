use anyhow::Result;
use tracing::info;

use bookbank_backend::config::AppConfig;
use bookbank_backend::logging::init_tracing;
use bookbank_backend::{create_router, initialize_backend};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    let addr = config.bind_address()?;

    let app_state = initialize_backend(config).await?;
    let app = create_router(app_state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
