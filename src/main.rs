use clap::Parser;
use emoji_tales::config::ServerConfig;
use emoji_tales::server;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();

    println!("--- [Emoji Tales] ---");
    println!("Worker Threads: {}", config.worker_threads());
    println!("Model: {}", config.model);
    println!("Provider: {}", config.api_base);
    println!("---------------------");

    tokio::runtime::Builder::new_multi_thread()
    .worker_threads(config.worker_threads())
    .enable_all()
    .build()?
    .block_on(async_main(config))
}

async fn async_main(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("info,emoji_tales=info"));
    tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_level(true)
    .init();

    let service = emoji_tales::build_service(&config)?;
    let routes = server::routes(service);

    let (addr, serving) = warp::serve(routes).try_bind_with_graceful_shutdown(config.socket_addr(), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })?;

    tracing::info!("Server running on {}", addr);
    tracing::info!("API documentation available at http://{}/docs", addr);

    serving.await;
    tracing::info!("Shutting down.");
    Ok(())
}
