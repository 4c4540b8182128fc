use std::sync::Arc;

use harbor::config::Config;
use harbor::handler::EchoHandler;
use harbor::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Arc::new(Config::load()?);
    let grace = cfg.shutdown_grace();

    let server = Server::open(Arc::clone(&cfg))?;
    let handle = server.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("termination signal received");
            handle.initiate(grace);
        }
    });

    let outcome = server.run(Arc::new(EchoHandler)).await?;
    tracing::info!(outcome = %outcome, "server stopped");

    Ok(())
}
