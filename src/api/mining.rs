use actix_web::{HttpResponse, get, post, web};
use log::{debug, info, warn};

use super::models::{
    AppState, CancelResponse, CoinbaseRequest, MessageResponse, SearchResponse, SessionRequest,
};
use crate::error::MiningError;
use crate::mining::{Candidate, SearchOutcome, find_nonce};

/// Start a session, or reload it from the current tip.
#[post("/mining/session/")]
pub async fn start_session(state: web::Data<AppState>) -> Result<HttpResponse, MiningError> {
    let mut session = state.session()?;
    session.start(&state.ledger, &state.ledger, &state.keys)?;
    Ok(HttpResponse::Ok().json(session.view()))
}

#[get("/mining/session/")]
pub async fn get_session(state: web::Data<AppState>) -> Result<HttpResponse, MiningError> {
    let session = state.session()?;
    Ok(HttpResponse::Ok().json(session.view()))
}

/// Credit the block reward to another key of this node.
#[post("/mining/coinbase/")]
pub async fn change_coinbase(
    state: web::Data<AppState>,
    req: web::Json<CoinbaseRequest>,
) -> Result<HttpResponse, MiningError> {
    let mut session = state.session()?;
    session.change_coinbase(&req.session_id, &state.keys, req.address.trim())?;
    Ok(HttpResponse::Ok().json(session.view()))
}

/// Reports a search back to the session from the worker thread.
///
/// Dropped without `finish` (the worker panicked), it abandons the search,
/// so the session never stays in `searching` once the worker is gone.
struct SearchReport {
    state: web::Data<AppState>,
    session_id: String,
    reported: bool,
}

impl SearchReport {
    fn new(state: web::Data<AppState>, session_id: String) -> Self {
        Self {
            state,
            session_id,
            reported: false,
        }
    }

    fn finish(&mut self, candidate: Candidate, outcome: &SearchOutcome) -> Result<(), MiningError> {
        self.reported = true;
        self.state
            .session()?
            .finish_search(&self.session_id, candidate, outcome)
    }
}

impl Drop for SearchReport {
    fn drop(&mut self) {
        if self.reported {
            return;
        }
        match self.state.session() {
            Ok(mut session) => {
                session.abandon_search(&self.session_id, "worker stopped before reporting")
            }
            Err(e) => warn!("SEARCH - could not abandon session {}: {e}", self.session_id),
        }
    }
}

/// Run the nonce search on the blocking pool; the session lock is not held
/// while hashing, so cancel and status requests stay responsive.
///
/// The worker records the outcome itself, so the session settles even when
/// this request is dropped before the search ends.
#[post("/mining/search/")]
pub async fn search(
    state: web::Data<AppState>,
    req: web::Json<SessionRequest>,
) -> Result<HttpResponse, MiningError> {
    let session_id = req.into_inner().session_id;
    let (mut candidate, params, cancel) = state.session()?.begin_search(&session_id)?;
    debug!(
        "SEARCH - #{} started (prefix={:?}, budget={}s)",
        candidate.height(),
        params.difficulty_prefix,
        params.budget.as_secs()
    );

    let mut report = SearchReport::new(state.clone(), session_id);
    let outcome = web::block(move || {
        let outcome = find_nonce(&mut candidate, &params, &cancel);
        report.finish(candidate, &outcome)?;
        Ok::<_, MiningError>(outcome)
    })
    .await
    .map_err(|e| MiningError::Worker(e.to_string()))??;

    if outcome.is_sealed() {
        info!("MINER - {}", outcome.message());
    } else {
        debug!("MINER - {}", outcome.message());
    }

    Ok(HttpResponse::Ok().json(SearchResponse {
        message: outcome.message(),
        outcome,
    }))
}

#[post("/mining/cancel/")]
pub async fn cancel_search(
    state: web::Data<AppState>,
    req: web::Json<SessionRequest>,
) -> Result<HttpResponse, MiningError> {
    let height = state.session()?.cancel(&req.session_id)?;
    Ok(HttpResponse::Ok().json(CancelResponse {
        cancelled_height: height,
    }))
}

/// Broadcast the sealed block to the ledger.
#[post("/mining/submit/")]
pub async fn submit_block(
    state: web::Data<AppState>,
    req: web::Json<SessionRequest>,
) -> Result<HttpResponse, MiningError> {
    let message = state.session()?.submit(&req.session_id, &state.ledger)?;
    info!("MINER - {message}");
    Ok(HttpResponse::Ok().json(MessageResponse { message }))
}
