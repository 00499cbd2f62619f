mod api;
mod blockchain;
mod config;
mod error;
mod ledger;
mod mining;
mod transaction;
mod wallet;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;

use api::AppState;
use config::MinerConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = MinerConfig::from_env();
    let (host, port) = (config.host.clone(), config.port);

    let state = web::Data::new(AppState::new(config));
    let (key, _) = state
        .keys
        .generate_for(&state.config.node_number)
        .map_err(std::io::Error::other)?;
    info!(
        "node {} rewards go to {} (version={}, prefix={:?}, timeout={}s)",
        state.config.node_number,
        key.address,
        state.config.version,
        state.config.difficulty_prefix,
        state.config.timeout.as_secs()
    );

    println!("⛏️ Starting miner at http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
