use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced at the boundary of build, search and submit.
///
/// None of these are fatal: the operator can always start a new session.
#[derive(Debug, Error)]
pub enum MiningError {
    #[error("could not retrieve chain state: {0}")]
    Retrieval(String),

    #[error("could not resolve miner identity: {0}")]
    Identity(String),

    #[error("block rejected: {0}")]
    Submission(String),

    #[error("height overflow after block {0}")]
    HeightOverflow(u64),

    #[error("no candidate block; start a mining session first")]
    NoCandidate,

    #[error("block is not sealed yet")]
    NotSealed,

    #[error("block was already sealed; start a new session")]
    AlreadySealed,

    #[error("a search is already running for height {0}")]
    SearchInFlight(u64),

    #[error("no search is running")]
    NoSearchRunning,

    #[error("session {0} is no longer current")]
    StaleSession(String),

    #[error("search worker failed: {0}")]
    Worker(String),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

#[derive(Serialize)]
struct ErrorJson {
    message: String,
}

impl ResponseError for MiningError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Retrieval(_) | Self::Identity(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Submission(_) | Self::HeightOverflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NoCandidate
            | Self::NotSealed
            | Self::AlreadySealed
            | Self::SearchInFlight(_)
            | Self::NoSearchRunning
            | Self::StaleSession(_) => StatusCode::CONFLICT,
            Self::Worker(_) | Self::Poisoned(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorJson {
            message: self.to_string(),
        })
    }
}
