use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::card::Card;

/// Human choice for one duplicate email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Overwrite,
    Skip,
}

/// email -> action, one entry expected per duplicate.
pub type DecisionMap = HashMap<String, Decision>;

/// Where a reconciliation run currently stands.
///
/// `Suspended` is the only externally visible pause: the state is handed
/// back to the caller, who re-submits it with decisions attached. Resuming
/// goes straight to decision application; the batch is never re-classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStage {
    Start,
    Classified,
    Suspended,
    Ready,
    Applied,
    Committed,
}

/// Working state of one reconciliation run, created fresh per batch and
/// discarded after commit. Serializable so that a suspended run can travel
/// to the client and back as its own continuation token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationState {
    /// The raw batch, in submission order.
    pub incoming: Vec<Card>,
    /// Cards with no key collision, including every keyless card.
    pub fresh: Vec<Card>,
    /// Cards whose email already exists in the contact store.
    pub conflicting: Vec<Card>,
    /// True iff `conflicting` is non-empty and no decisions are attached.
    pub pending_human: bool,
    /// Absent until the caller supplies them on resume.
    pub decisions: Option<DecisionMap>,
    /// Final sequence to persist: fresh first, then overwritten duplicates.
    pub committed: Vec<Card>,
    /// Emails explicitly skipped by a human decision.
    pub dropped_keys: Vec<String>,
    pub stage: ReconcileStage,
}

impl ReconciliationState {
    pub fn new(incoming: Vec<Card>) -> Self {
        ReconciliationState {
            incoming,
            fresh: Vec::new(),
            conflicting: Vec::new(),
            pending_human: false,
            decisions: None,
            committed: Vec::new(),
            dropped_keys: Vec::new(),
            stage: ReconcileStage::Start,
        }
    }
}

/// One contact that could not be persisted during commit. Commits are
/// best-effort per record; failures are reported, never swallowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitFailure {
    pub email: String,
    pub error: String,
}
