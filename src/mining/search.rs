use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{info, trace};
use serde::Serialize;

use super::builder::Candidate;
use super::now_ms;
use crate::blockchain::{SealedBlock, hash_hex, header_bytes, validate_hash};

/// Shared flag that stops a running search before its deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// `difficulty_prefix` must equal the candidate's `nbits`: the header is
/// hashed with its recorded `nbits`, and a ledger checks the hash against it.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub version: String,
    pub difficulty_prefix: String,
    pub budget: Duration,
}

/// How a search ended. Only `Sealed` carries a hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    Sealed {
        block: SealedBlock,
        attempts: u64,
        elapsed_ms: u64,
    },
    /// Budget spent without a match.
    TimedOut { attempts: u64, elapsed_ms: u64 },
    Cancelled { attempts: u64, elapsed_ms: u64 },
    /// Every `u64` nonce was tried; the counter does not wrap.
    Exhausted { attempts: u64, elapsed_ms: u64 },
}

impl SearchOutcome {
    pub fn is_sealed(&self) -> bool {
        matches!(self, Self::Sealed { .. })
    }

    pub fn attempts(&self) -> u64 {
        match self {
            Self::Sealed { attempts, .. }
            | Self::TimedOut { attempts, .. }
            | Self::Cancelled { attempts, .. }
            | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Operator-facing summary.
    pub fn message(&self) -> String {
        match self {
            Self::Sealed { block, .. } => format!(
                "Found nonce {} for block #{} (hash {})",
                block.block().nonce,
                block.height(),
                block.hash()
            ),
            Self::TimedOut { attempts, .. } => {
                format!("Timed out after {attempts} attempts; try again or lower the difficulty")
            }
            Self::Cancelled { attempts, .. } => format!("Search cancelled after {attempts} attempts"),
            Self::Exhausted { attempts, .. } => {
                format!("Nonce space exhausted after {attempts} attempts")
            }
        }
    }
}

/// Search for the first nonce, counting up from 0, whose header hash starts
/// with the difficulty prefix. Blocks the calling thread for up to the budget.
pub fn find_nonce(
    candidate: &mut Candidate,
    params: &SearchParams,
    cancel: &CancelToken,
) -> SearchOutcome {
    find_nonce_observed(candidate, params, cancel, |_, _| {})
}

/// Like [`find_nonce`], reporting every `(nonce, digest)` tried to `observe`.
pub fn find_nonce_observed<F>(
    candidate: &mut Candidate,
    params: &SearchParams,
    cancel: &CancelToken,
    observe: F,
) -> SearchOutcome
where
    F: FnMut(u64, &str),
{
    search_from(candidate, params, cancel, 0, observe)
}

fn search_from<F>(
    candidate: &mut Candidate,
    params: &SearchParams,
    cancel: &CancelToken,
    first_nonce: u64,
    mut observe: F,
) -> SearchOutcome
where
    F: FnMut(u64, &str),
{
    debug_assert_eq!(
        candidate.block.nbits, params.difficulty_prefix,
        "search prefix differs from the candidate's nbits"
    );

    let start = Instant::now();
    let mut nonce = first_nonce;
    let mut attempts: u64 = 0;

    let outcome = loop {
        let elapsed = start.elapsed();
        if elapsed >= params.budget {
            break SearchOutcome::TimedOut {
                attempts,
                elapsed_ms: elapsed.as_millis() as u64,
            };
        }
        if cancel.is_cancelled() {
            break SearchOutcome::Cancelled {
                attempts,
                elapsed_ms: elapsed.as_millis() as u64,
            };
        }

        let block = &mut candidate.block;
        block.time = format!("{:x}", now_ms());
        let nonce_hex = format!("{nonce:x}");
        let digest = hash_hex(&header_bytes(
            &params.version,
            &block.prev_hash,
            &block.merkle_root,
            &block.time,
            &block.nbits,
            &nonce_hex,
        ));
        attempts += 1;
        trace!("{nonce} {digest}");
        observe(nonce, &digest);

        if validate_hash(&digest, &params.difficulty_prefix) {
            block.nonce = nonce_hex;
            break SearchOutcome::Sealed {
                block: SealedBlock::new(block.clone(), digest),
                attempts,
                elapsed_ms: start.elapsed().as_millis() as u64,
            };
        }

        nonce = match nonce.checked_add(1) {
            Some(next) => next,
            None => {
                break SearchOutcome::Exhausted {
                    attempts,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                };
            }
        };
    };

    info!(
        "SEARCH - #{} finished after {} attempts, elapsed {:.3} sec: {}",
        candidate.height(),
        outcome.attempts(),
        start.elapsed().as_secs_f64(),
        outcome.message()
    );
    outcome
}
