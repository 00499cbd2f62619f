use actix_web::{HttpResponse, get, post, web};
use log::{info, warn};

use super::models::{AppState, ChainResponse, DifficultyResponse, SetDifficultyRequest};
use crate::config::is_lower_hex;
use crate::error::MiningError;

/// Get the full chain of accepted headers.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> Result<HttpResponse, MiningError> {
    let bc = state.ledger.chain()?;
    Ok(HttpResponse::Ok().json(ChainResponse {
        length: bc.len(),
        valid: bc.is_valid_chain(),
        chain: &bc.chain,
    }))
}

/// Get the difficulty prefix new candidates are built with.
#[get("/difficulty/")]
pub async fn get_difficulty(state: web::Data<AppState>) -> Result<HttpResponse, MiningError> {
    let session = state.session()?;
    Ok(HttpResponse::Ok().json(DifficultyResponse {
        difficulty_prefix: session.difficulty_prefix().to_string(),
    }))
}

/// Update the difficulty prefix (affects the next session only).
#[post("/difficulty/")]
pub async fn set_difficulty(
    state: web::Data<AppState>,
    body: web::Json<SetDifficultyRequest>,
) -> Result<HttpResponse, MiningError> {
    let prefix = body.difficulty_prefix.trim();
    if !is_lower_hex(prefix) {
        warn!("difficulty prefix {prefix:?} is not lowercase hex; no hash can satisfy it");
    }
    let mut session = state.session()?;
    session.set_difficulty_prefix(prefix);
    info!("difficulty prefix set to {prefix:?}");
    Ok(HttpResponse::Ok().json(DifficultyResponse {
        difficulty_prefix: session.difficulty_prefix().to_string(),
    }))
}
