mod chain;
mod health;
mod mining;
pub mod models;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::get_difficulty)
            .service(chain::set_difficulty)
            .service(tx::post_transaction)
            .service(tx::get_mempool)
            .service(wallet::list_keys)
            .service(wallet::create_key)
            .service(mining::start_session)
            .service(mining::get_session)
            .service(mining::change_coinbase)
            .service(mining::search)
            .service(mining::cancel_search)
            .service(mining::submit_block),
    );
}
