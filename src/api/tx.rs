use actix_web::{HttpResponse, get, post, web};
use log::{debug, warn};

use super::models::{AppState, MempoolResponse, NewTxRequest};
use crate::error::MiningError;
use crate::transaction::PendingTx;

/// Queue a transfer in the pending pool.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> Result<HttpResponse, MiningError> {
    let body = body.into_inner();
    if body.amount == 0 {
        warn!("POST /tx/ - rejected: zero amount");
        return Ok(HttpResponse::BadRequest().body("amount must be > 0"));
    }
    if body.from.trim().is_empty() || body.to.trim().is_empty() {
        warn!("POST /tx/ - rejected: missing sender or recipient");
        return Ok(HttpResponse::BadRequest().body("from and to are required"));
    }

    let tx = PendingTx {
        from: body.from,
        to: body.to,
        amount: body.amount,
    };
    let size = state.ledger.add_transaction(tx.clone())?;
    debug!(
        "POST /tx/ - {} -> {} ({}) queued, pool size {size}",
        tx.from, tx.to, tx.amount
    );
    Ok(HttpResponse::Ok().json(tx))
}

/// List the pending pool, oldest first.
#[get("/mempool/")]
pub async fn get_mempool(state: web::Data<AppState>) -> Result<HttpResponse, MiningError> {
    let pool = state.ledger.pool()?;
    Ok(HttpResponse::Ok().json(MempoolResponse {
        size: pool.len(),
        transactions: pool.snapshot(),
    }))
}
