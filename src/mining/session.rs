use std::mem;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

use super::builder::{Candidate, Miner, build_candidate};
use super::now_ms;
use super::search::{CancelToken, SearchOutcome, SearchParams};
use crate::blockchain::{BASE_REWARD, Block, SealedBlock};
use crate::config::MinerConfig;
use crate::error::MiningError;
use crate::ledger::{ChainTip, MinerIdentity, Submission, TransactionPool};
use crate::transaction::PendingTx;
use crate::transaction::model::with_coinbase;

#[derive(Debug)]
enum SessionState {
    Idle,
    Ready(Candidate),
    /// The candidate is owned by the worker running the search.
    Searching {
        height: u64,
        cancel: CancelToken,
    },
    Sealed(SealedBlock),
    Submitted {
        height: u64,
    },
}

impl SessionState {
    fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready(_) => "ready",
            Self::Searching { .. } => "searching",
            Self::Sealed(_) => "sealed",
            Self::Submitted { .. } => "submitted",
        }
    }
}

/// One operator's mining workflow: build, search, submit.
///
/// At most one search runs per session; `begin_search` hands the candidate
/// to the worker and `finish_search` takes it back.
#[derive(Debug)]
pub struct MiningSession {
    id: Option<String>,
    node_number: String,
    version: String,
    difficulty_prefix: String,
    timeout: Duration,
    state: SessionState,
    transactions: Vec<PendingTx>,
    last_result: Option<String>,
}

/// Serializable snapshot for the presentation layer.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Option<String>,
    pub status: &'static str,
    pub node_number: String,
    pub difficulty_prefix: String,
    pub timeout_secs: u64,
    pub candidate: Option<Block>,
    pub sealed: Option<SealedBlock>,
    pub searching_height: Option<u64>,
    pub submitted_height: Option<u64>,
    pub transactions: Vec<PendingTx>,
    pub last_result: Option<String>,
}

impl MiningSession {
    pub fn new(config: &MinerConfig) -> Self {
        Self {
            id: None,
            node_number: config.node_number.clone(),
            version: config.version.clone(),
            difficulty_prefix: config.difficulty_prefix.clone(),
            timeout: config.timeout,
            state: SessionState::Idle,
            transactions: Vec::new(),
            last_result: None,
        }
    }

    /// Start (or reload) the session from the current chain tip.
    ///
    /// Any previous candidate is discarded. On failure the session is left
    /// without a candidate so no search can start.
    pub fn start<C, P, I>(
        &mut self,
        chain: &C,
        pool: &P,
        identity: &I,
    ) -> Result<String, MiningError>
    where
        C: ChainTip + ?Sized,
        P: TransactionPool + ?Sized,
        I: MinerIdentity + ?Sized,
    {
        if let SessionState::Searching { height, .. } = self.state {
            return Err(MiningError::SearchInFlight(height));
        }

        self.id = None;
        self.state = SessionState::Idle;
        self.transactions.clear();
        self.last_result = None;

        let prev = chain.latest_block()?;
        let address = identity
            .keys_for(&self.node_number)?
            .into_iter()
            .next()
            .map(|k| k.address)
            .ok_or_else(|| {
                MiningError::Identity(format!("node {} has no keys", self.node_number))
            })?;
        let pending = pool.pending_transactions()?;

        let miner = Miner {
            node_number: self.node_number.clone(),
            address: address.clone(),
        };
        let candidate = build_candidate(
            &prev,
            &miner,
            &self.version,
            &self.difficulty_prefix,
            now_ms(),
        )?;

        let id = Uuid::new_v4().to_string();
        info!(
            "SESSION {id} - candidate #{} on tip #{} ({} pending txs, nbits={})",
            candidate.height(),
            prev.height,
            pending.len(),
            self.difficulty_prefix
        );

        self.transactions = with_coinbase(&address, BASE_REWARD, pending);
        self.state = SessionState::Ready(candidate);
        self.id = Some(id.clone());
        Ok(id)
    }

    /// Credit the reward to another address owned by this node.
    pub fn change_coinbase<I>(
        &mut self,
        session_id: &str,
        identity: &I,
        address: &str,
    ) -> Result<(), MiningError>
    where
        I: MinerIdentity + ?Sized,
    {
        self.check_id(session_id)?;

        let owned = identity
            .keys_for(&self.node_number)?
            .iter()
            .any(|k| k.address == address);
        if !owned {
            return Err(MiningError::Identity(format!(
                "address {address} does not belong to node {}",
                self.node_number
            )));
        }

        let candidate = match &mut self.state {
            SessionState::Ready(candidate) => candidate,
            SessionState::Idle => return Err(MiningError::NoCandidate),
            SessionState::Searching { height, .. } => {
                return Err(MiningError::SearchInFlight(*height));
            }
            SessionState::Sealed(_) | SessionState::Submitted { .. } => {
                return Err(MiningError::AlreadySealed);
            }
        };
        candidate.set_address(address);
        match self.transactions.first_mut() {
            Some(coinbase) if coinbase.is_coinbase() => coinbase.to = address.to_string(),
            _ => self
                .transactions
                .insert(0, PendingTx::coinbase(address, BASE_REWARD)),
        }
        debug!("SESSION {session_id} - coinbase now credits {address}");
        Ok(())
    }

    /// Take the candidate out for a worker. Refuses while another search runs.
    pub fn begin_search(
        &mut self,
        session_id: &str,
    ) -> Result<(Candidate, SearchParams, CancelToken), MiningError> {
        self.check_id(session_id)?;

        match &self.state {
            SessionState::Ready(_) => {}
            SessionState::Idle => return Err(MiningError::NoCandidate),
            SessionState::Searching { height, .. } => {
                return Err(MiningError::SearchInFlight(*height));
            }
            SessionState::Sealed(_) | SessionState::Submitted { .. } => {
                return Err(MiningError::AlreadySealed);
            }
        }
        let SessionState::Ready(candidate) = mem::replace(&mut self.state, SessionState::Idle)
        else {
            return Err(MiningError::NoCandidate);
        };

        let cancel = CancelToken::new();
        let params = SearchParams {
            version: self.version.clone(),
            difficulty_prefix: candidate.block().nbits.clone(),
            budget: self.timeout,
        };
        self.state = SessionState::Searching {
            height: candidate.height(),
            cancel: cancel.clone(),
        };
        self.last_result = None;
        Ok((candidate, params, cancel))
    }

    /// Return the worker's candidate and record how the search ended.
    pub fn finish_search(
        &mut self,
        session_id: &str,
        candidate: Candidate,
        outcome: &SearchOutcome,
    ) -> Result<(), MiningError> {
        self.check_id(session_id)?;
        if !matches!(self.state, SessionState::Searching { .. }) {
            return Err(MiningError::NoSearchRunning);
        }

        self.state = match outcome {
            SearchOutcome::Sealed { block, .. } => SessionState::Sealed(block.clone()),
            _ => SessionState::Ready(candidate),
        };
        self.last_result = Some(outcome.message());
        Ok(())
    }

    /// Drop a search whose worker never reported back. The candidate is lost.
    pub fn abandon_search(&mut self, session_id: &str, reason: &str) {
        if self.id.as_deref() == Some(session_id)
            && matches!(self.state, SessionState::Searching { .. })
        {
            warn!("SESSION {session_id} - search abandoned: {reason}");
            self.state = SessionState::Idle;
            self.last_result = Some(format!("Search failed: {reason}"));
        }
    }

    /// Trip the cancel token of the running search; returns its height.
    pub fn cancel(&self, session_id: &str) -> Result<u64, MiningError> {
        self.check_id(session_id)?;
        match &self.state {
            SessionState::Searching { height, cancel } => {
                cancel.cancel();
                info!("SESSION {session_id} - cancel requested for #{height}");
                Ok(*height)
            }
            _ => Err(MiningError::NoSearchRunning),
        }
    }

    /// Hand the sealed block to the submission collaborator.
    pub fn submit<S>(&mut self, session_id: &str, submission: &S) -> Result<String, MiningError>
    where
        S: Submission + ?Sized,
    {
        self.check_id(session_id)?;
        let sealed = match &self.state {
            SessionState::Sealed(sealed) => sealed.clone(),
            SessionState::Searching { height, .. } => {
                return Err(MiningError::SearchInFlight(*height));
            }
            SessionState::Submitted { .. } => return Err(MiningError::AlreadySealed),
            SessionState::Idle | SessionState::Ready(_) => return Err(MiningError::NotSealed),
        };

        match submission.submit(sealed) {
            Ok(height) => {
                let msg = format!("Succeed to create new block. Height number: {height}");
                info!("SESSION {session_id} - {msg}");
                self.state = SessionState::Submitted { height };
                self.last_result = Some(msg.clone());
                Ok(msg)
            }
            Err(e) => {
                warn!("SESSION {session_id} - submission failed: {e}");
                self.last_result = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn difficulty_prefix(&self) -> &str {
        &self.difficulty_prefix
    }

    /// Change the prefix used for candidates built from now on.
    pub fn set_difficulty_prefix(&mut self, prefix: &str) {
        self.difficulty_prefix = prefix.to_string();
    }

    pub fn view(&self) -> SessionView {
        let (candidate, sealed, searching_height, submitted_height) = match &self.state {
            SessionState::Idle => (None, None, None, None),
            SessionState::Ready(c) => (Some(c.block().clone()), None, None, None),
            SessionState::Searching { height, .. } => (None, None, Some(*height), None),
            SessionState::Sealed(s) => (None, Some(s.clone()), None, None),
            SessionState::Submitted { height } => (None, None, None, Some(*height)),
        };
        SessionView {
            session_id: self.id.clone(),
            status: self.state.label(),
            node_number: self.node_number.clone(),
            difficulty_prefix: self.difficulty_prefix.clone(),
            timeout_secs: self.timeout.as_secs(),
            candidate,
            sealed,
            searching_height,
            submitted_height,
            transactions: self.transactions.clone(),
            last_result: self.last_result.clone(),
        }
    }

    fn check_id(&self, session_id: &str) -> Result<(), MiningError> {
        match &self.id {
            Some(id) if id == session_id => Ok(()),
            Some(_) => Err(MiningError::StaleSession(session_id.to_string())),
            None => Err(MiningError::NoCandidate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Blockchain;
    use crate::ledger::InMemoryLedger;
    use crate::mining::search::find_nonce;
    use crate::wallet::KeyRing;

    fn config(prefix: &str) -> MinerConfig {
        MinerConfig {
            node_number: "node-1".into(),
            difficulty_prefix: prefix.into(),
            timeout: Duration::from_secs(5),
            ..MinerConfig::default()
        }
    }

    fn fixture(prefix: &str) -> (MiningSession, InMemoryLedger, KeyRing, String) {
        let cfg = config(prefix);
        let ledger = InMemoryLedger::new(Blockchain::new(&cfg.version, Block::genesis(prefix)));
        let keys = KeyRing::new();
        let (key, _) = keys.generate_for("node-1").unwrap();
        (MiningSession::new(&cfg), ledger, keys, key.address)
    }

    fn run_search(session: &mut MiningSession, id: &str) -> SearchOutcome {
        let (mut candidate, params, cancel) = session.begin_search(id).unwrap();
        let outcome = find_nonce(&mut candidate, &params, &cancel);
        session.finish_search(id, candidate, &outcome).unwrap();
        outcome
    }

    #[test]
    fn start_builds_candidate_on_tip_with_coinbase_first() {
        let (mut session, ledger, keys, address) = fixture("");
        ledger
            .add_transaction(PendingTx {
                from: "a".into(),
                to: "b".into(),
                amount: 3,
            })
            .unwrap();

        session.start(&ledger, &ledger, &keys).unwrap();
        let view = session.view();

        assert_eq!(view.status, "ready");
        let candidate = view.candidate.unwrap();
        assert_eq!(candidate.height, 1);
        assert_eq!(candidate.address, address);
        assert_eq!(view.transactions.len(), 2);
        assert_eq!(view.transactions[0], PendingTx::coinbase(&address, BASE_REWARD));
    }

    #[test]
    fn missing_identity_leaves_no_candidate() {
        let cfg = config("");
        let ledger = InMemoryLedger::new(Blockchain::new(&cfg.version, Block::genesis("")));
        let mut session = MiningSession::new(&cfg);

        let err = session.start(&ledger, &ledger, &KeyRing::new()).unwrap_err();
        assert!(matches!(err, MiningError::Identity(_)));
        assert_eq!(session.view().status, "idle");
        assert!(session.view().session_id.is_none());
    }

    #[test]
    fn missing_tip_leaves_no_candidate() {
        let cfg = config("");
        let ledger = InMemoryLedger::new(Blockchain::empty(&cfg.version));
        let keys = KeyRing::new();
        keys.generate_for("node-1").unwrap();
        let mut session = MiningSession::new(&cfg);

        let err = session.start(&ledger, &ledger, &keys).unwrap_err();
        assert!(matches!(err, MiningError::Retrieval(_)));
        assert!(matches!(
            session.begin_search("anything"),
            Err(MiningError::NoCandidate)
        ));
    }

    #[test]
    fn full_cycle_submits_sealed_block() {
        let (mut session, ledger, keys, _) = fixture("");
        let id = session.start(&ledger, &ledger, &keys).unwrap();

        assert!(run_search(&mut session, &id).is_sealed());
        assert_eq!(session.view().status, "sealed");

        let msg = session.submit(&id, &ledger).unwrap();
        assert_eq!(msg, "Succeed to create new block. Height number: 1");
        assert_eq!(ledger.latest_block().unwrap().height, 1);
        assert_eq!(session.view().submitted_height, Some(1));

        // next session chains on the new tip
        session.start(&ledger, &ledger, &keys).unwrap();
        assert_eq!(session.view().candidate.unwrap().height, 2);
    }

    #[test]
    fn second_search_is_refused_while_one_runs() {
        let (mut session, ledger, keys, _) = fixture("");
        let id = session.start(&ledger, &ledger, &keys).unwrap();

        let (candidate, _, cancel) = session.begin_search(&id).unwrap();
        assert!(matches!(
            session.begin_search(&id),
            Err(MiningError::SearchInFlight(1))
        ));
        assert!(matches!(
            session.start(&ledger, &ledger, &keys),
            Err(MiningError::SearchInFlight(1))
        ));

        assert_eq!(session.cancel(&id).unwrap(), 1);
        assert!(cancel.is_cancelled());

        let outcome = SearchOutcome::Cancelled {
            attempts: 0,
            elapsed_ms: 0,
        };
        session.finish_search(&id, candidate, &outcome).unwrap();
        assert_eq!(session.view().status, "ready");
    }

    #[test]
    fn timeout_keeps_candidate_for_retry() {
        let (mut session, ledger, keys, _) = fixture(&"0".repeat(65));
        session.timeout = Duration::from_millis(50);
        let id = session.start(&ledger, &ledger, &keys).unwrap();

        let outcome = run_search(&mut session, &id);
        assert!(matches!(outcome, SearchOutcome::TimedOut { .. }));

        let view = session.view();
        assert_eq!(view.status, "ready");
        assert_eq!(view.candidate.unwrap().nonce, "0");
        assert!(view.last_result.unwrap().starts_with("Timed out"));
        assert!(matches!(session.submit(&id, &ledger), Err(MiningError::NotSealed)));
    }

    #[test]
    fn stale_session_id_is_rejected() {
        let (mut session, ledger, keys, _) = fixture("");
        let old = session.start(&ledger, &ledger, &keys).unwrap();
        let new = session.start(&ledger, &ledger, &keys).unwrap();
        assert_ne!(old, new);
        assert!(matches!(
            session.begin_search(&old),
            Err(MiningError::StaleSession(_))
        ));
        assert!(session.begin_search(&new).is_ok());
    }

    #[test]
    fn rejected_submission_is_reported_not_retried() {
        let (mut session, ledger, keys, _) = fixture("");
        let id = session.start(&ledger, &ledger, &keys).unwrap();
        run_search(&mut session, &id);

        // someone else extends the tip first
        let mut rival = MiningSession::new(&config(""));
        let rival_id = rival.start(&ledger, &ledger, &keys).unwrap();
        run_search(&mut rival, &rival_id);
        rival.submit(&rival_id, &ledger).unwrap();

        let err = session.submit(&id, &ledger).unwrap_err();
        assert!(matches!(err, MiningError::Submission(_)));
        assert_eq!(session.view().status, "sealed");
        assert_eq!(ledger.latest_block().unwrap().height, 1);
    }

    #[test]
    fn coinbase_can_move_to_another_owned_key() {
        let (mut session, ledger, keys, _) = fixture("");
        let id = session.start(&ledger, &ledger, &keys).unwrap();
        let (other, _) = keys.generate_for("node-1").unwrap();

        session.change_coinbase(&id, &keys, &other.address).unwrap();
        let view = session.view();
        assert_eq!(view.candidate.unwrap().address, other.address);
        assert_eq!(view.transactions[0].to, other.address);

        assert!(matches!(
            session.change_coinbase(&id, &keys, "not-mine"),
            Err(MiningError::Identity(_))
        ));
    }

    #[test]
    fn difficulty_change_applies_to_next_candidate() {
        let (mut session, ledger, keys, _) = fixture("");
        session.start(&ledger, &ledger, &keys).unwrap();
        session.set_difficulty_prefix("00");
        assert_eq!(session.view().candidate.unwrap().nbits, "");

        session.start(&ledger, &ledger, &keys).unwrap();
        assert_eq!(session.view().candidate.unwrap().nbits, "00");
    }

    #[test]
    fn abandoned_search_returns_to_idle_and_can_restart() {
        let (mut session, ledger, keys, _) = fixture("");
        let id = session.start(&ledger, &ledger, &keys).unwrap();
        let (_candidate, _, _) = session.begin_search(&id).unwrap();

        session.abandon_search(&id, "worker panicked");
        let view = session.view();
        assert_eq!(view.status, "idle");
        assert_eq!(
            view.last_result.as_deref(),
            Some("Search failed: worker panicked")
        );
        assert!(matches!(session.begin_search(&id), Err(MiningError::NoCandidate)));

        let fresh = session.start(&ledger, &ledger, &keys).unwrap();
        assert_ne!(fresh, id);
        assert_eq!(session.view().status, "ready");
    }

    #[test]
    fn abandon_ignores_other_sessions() {
        let (mut session, ledger, keys, _) = fixture("");
        let id = session.start(&ledger, &ledger, &keys).unwrap();
        session.begin_search(&id).unwrap();

        session.abandon_search("someone-else", "late worker");
        assert_eq!(session.view().status, "searching");
    }
}
