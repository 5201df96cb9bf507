//! ipamsrv entry point

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use ipamsrv::bootstrap::{self, Args};
use ipamsrv::routes::create_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let service_info = bootstrap::create_service_info();

    let config = bootstrap::load_configuration(&args)?;
    if args.validate {
        bootstrap::validate_configuration(&config)?;
        println!("Configuration valid ({})", config.bind_address());
        return Ok(());
    }

    bootstrap::init_environment(&service_info, &config)?;
    bootstrap::validate_configuration(&config)?;

    let bind_address = config.bind_address();
    let state = bootstrap::create_app_state(config).await?;
    let app = create_routes(state);

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;
    info!("API listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(common::shutdown::wait_for_shutdown())
        .await
        .context("API server error")?;

    info!("ipamsrv stopped");
    Ok(())
}
