use std::process;

use facelens_proxy::config::ProxyConfig;
use facelens_proxy::routes::AppState;
use facelens_proxy::server;
use facelens_proxy::upstream::FaceClient;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ProxyConfig::from_env()?;
    let client = FaceClient::new(&config.endpoint, &config.api_key, config.upstream_timeout)?;
    let state = AppState::new(client, &config);
    server::serve(&config.bind_addr, state).await?;
    Ok(())
}
