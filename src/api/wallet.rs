use actix_web::{HttpResponse, get, post, web};

use super::models::{AppState, KeysResponse, NewKeyResponse};
use crate::error::MiningError;
use crate::ledger::MinerIdentity;

#[get("/keys/")]
pub async fn list_keys(state: web::Data<AppState>) -> Result<HttpResponse, MiningError> {
    let node_number = state.config.node_number.clone();
    let keys = state.keys.keys_for(&node_number)?;
    Ok(HttpResponse::Ok().json(KeysResponse { node_number, keys }))
}

/// Create a new reward key for this node. The private key is shown only once.
#[post("/keys/")]
pub async fn create_key(state: web::Data<AppState>) -> Result<HttpResponse, MiningError> {
    let (key, secret) = state.keys.generate_for(&state.config.node_number)?;
    Ok(HttpResponse::Ok().json(NewKeyResponse {
        private_key: secret,
        public_key: key.public_key,
        address: key.address,
    }))
}
