//! The reconciliation state machine.
//!
//! One run walks a batch of extracted cards through
//! classify -> gate -> apply -> commit. The gate is the single suspension
//! point: when duplicates exist and no decisions are attached, the run
//! stops and the whole `ReconciliationState` goes back to the caller.
//! Nothing has been written at that point, so an abandoned suspended state
//! needs no cleanup. Resuming attaches the decisions and continues at
//! apply; the batch is never re-classified against a store that may have
//! moved underneath it.

use shared_types::{
    Card, CommitFailure, Decision, DecisionMap, ReconcileStage, ReconciliationState,
};
use thiserror::Error;

use crate::reconcile::store::ContactStore;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A conflicting card has no entry in the decision map. Surfaced as an
    /// error rather than silently dropping the card.
    #[error("decision required for duplicate email(s): {}", emails.join(", "))]
    DecisionRequired { emails: Vec<String> },

    /// Resume was called with a state that is not waiting for decisions.
    #[error("reconciliation is not suspended (stage: {stage:?})")]
    NotSuspended { stage: ReconcileStage },

    #[error("contact store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Result of a run: the final state plus any contacts that failed to
/// persist. Commit is best-effort per record, so failures are data here,
/// not an `Err`.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub state: ReconciliationState,
    pub commit_failures: Vec<CommitFailure>,
}

/// Run a fresh batch. Returns early with a `Suspended` state when human
/// decisions are needed; otherwise runs through to `Committed`.
pub async fn invoke<S: ContactStore + ?Sized>(
    store: &S,
    batch: Vec<Card>,
) -> Result<ReconcileOutcome, ReconcileError> {
    let state = ReconciliationState::new(batch);
    let state = classify(store, state).await?;
    let state = gate(state);

    if state.stage == ReconcileStage::Suspended {
        tracing::info!(
            duplicates = state.conflicting.len(),
            "reconciliation suspended for human decisions"
        );
        return Ok(ReconcileOutcome {
            state,
            commit_failures: Vec::new(),
        });
    }

    let state = apply_decisions(state)?;
    commit(store, state).await
}

/// Resume a suspended run with the human's per-email decisions. Goes
/// straight to apply and commit.
pub async fn resume<S: ContactStore + ?Sized>(
    store: &S,
    mut state: ReconciliationState,
    decisions: DecisionMap,
) -> Result<ReconcileOutcome, ReconcileError> {
    if state.stage != ReconcileStage::Suspended {
        return Err(ReconcileError::NotSuspended { stage: state.stage });
    }

    state.decisions = Some(decisions);
    state.pending_human = false;
    state.stage = ReconcileStage::Ready;

    let state = apply_decisions(state)?;
    commit(store, state).await
}

/// Partition the batch into fresh and conflicting cards. A card without an
/// email can never collide and always lands in `fresh`; everything else is
/// routed by an existence check against the store. Read-only: no writes
/// happen before the gate.
async fn classify<S: ContactStore + ?Sized>(
    store: &S,
    mut state: ReconciliationState,
) -> Result<ReconciliationState, ReconcileError> {
    let mut fresh = Vec::new();
    let mut conflicting = Vec::new();

    for card in &state.incoming {
        match card.key() {
            None => fresh.push(card.clone()),
            Some(email) => {
                if store.exists(email).await? {
                    conflicting.push(card.clone());
                } else {
                    fresh.push(card.clone());
                }
            }
        }
    }

    state.pending_human = !conflicting.is_empty() && state.decisions.is_none();
    state.fresh = fresh;
    state.conflicting = conflicting;
    state.stage = ReconcileStage::Classified;
    Ok(state)
}

/// The single suspension point. Pending human input parks the run as
/// `Suspended`; otherwise it is `Ready` to apply.
fn gate(mut state: ReconciliationState) -> ReconciliationState {
    state.stage = if state.pending_human {
        ReconcileStage::Suspended
    } else {
        ReconcileStage::Ready
    };
    state
}

/// Fold the decisions into the classified sets: fresh cards are always
/// committed, conflicting cards decided "overwrite" follow them in their
/// original relative order, and "skip" emails land in `dropped_keys`.
/// Pure computation over in-memory state; the store is not consulted.
fn apply_decisions(
    mut state: ReconciliationState,
) -> Result<ReconciliationState, ReconcileError> {
    let decisions = state.decisions.clone().unwrap_or_default();

    let mut overwrites: Vec<Card> = Vec::new();
    let mut undecided: Vec<String> = Vec::new();

    for card in &state.conflicting {
        // Conflicting cards always have a key; classify put them there.
        let Some(email) = card.key() else { continue };
        match decisions.get(email) {
            Some(Decision::Overwrite) => {
                // Deduplicate by email, keeping the last occurrence. A
                // batch should not contain the same email twice, but if it
                // does, the later card wins.
                match overwrites.iter().position(|c| c.key() == Some(email)) {
                    Some(pos) => overwrites[pos] = card.clone(),
                    None => overwrites.push(card.clone()),
                }
            }
            Some(Decision::Skip) => {}
            None => undecided.push(email.to_string()),
        }
    }

    if !undecided.is_empty() {
        return Err(ReconcileError::DecisionRequired { emails: undecided });
    }

    let mut dropped_keys: Vec<String> = decisions
        .iter()
        .filter(|(_, decision)| **decision == Decision::Skip)
        .map(|(email, _)| email.clone())
        .collect();
    dropped_keys.sort();

    state.committed = state.fresh.iter().cloned().chain(overwrites).collect();
    state.dropped_keys = dropped_keys;
    state.stage = ReconcileStage::Applied;
    Ok(state)
}

/// Persist the committed cards in sequence order. Keyless cards are never
/// written. Each card commits independently: a store failure is recorded
/// and reported, and the rest of the batch is still attempted.
async fn commit<S: ContactStore + ?Sized>(
    store: &S,
    mut state: ReconciliationState,
) -> Result<ReconcileOutcome, ReconcileError> {
    let mut commit_failures = Vec::new();

    for card in &state.committed {
        let Some(email) = card.key() else { continue };
        if let Err(err) = store.upsert(card).await {
            tracing::warn!("failed to persist contact {}: {}", email, err);
            commit_failures.push(CommitFailure {
                email: email.to_string(),
                error: err.to_string(),
            });
        }
    }

    state.stage = ReconcileStage::Committed;
    tracing::info!(
        saved = state.committed.len() - commit_failures.len(),
        skipped = state.dropped_keys.len(),
        failed = commit_failures.len(),
        "reconciliation committed"
    );

    Ok(ReconcileOutcome {
        state,
        commit_failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory stand-in for the SQLite store.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<HashMap<String, Card>>,
        fail_emails: Vec<String>,
    }

    impl MemoryStore {
        fn with_contacts(cards: Vec<Card>) -> Self {
            let store = MemoryStore::default();
            {
                let mut rows = store.rows.lock().unwrap();
                for card in cards {
                    let email = card.key().expect("seed cards need an email").to_string();
                    rows.insert(email, card);
                }
            }
            store
        }

        fn get(&self, email: &str) -> Option<Card> {
            self.rows.lock().unwrap().get(email).cloned()
        }
    }

    #[async_trait::async_trait]
    impl ContactStore for MemoryStore {
        async fn exists(&self, email: &str) -> anyhow::Result<bool> {
            Ok(self.rows.lock().unwrap().contains_key(email))
        }

        async fn upsert(&self, card: &Card) -> anyhow::Result<()> {
            let email = card
                .key()
                .ok_or_else(|| anyhow::anyhow!("cannot persist a contact without an email"))?;
            if self.fail_emails.iter().any(|e| e == email) {
                anyhow::bail!("storage unavailable");
            }
            self.rows
                .lock()
                .unwrap()
                .insert(email.to_string(), card.clone());
            Ok(())
        }

        async fn list_all(&self) -> anyhow::Result<Vec<Card>> {
            Ok(self.rows.lock().unwrap().values().cloned().collect())
        }
    }

    fn card(email: &str, name: &str) -> Card {
        Card {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            ..Card::default()
        }
    }

    fn keyless_card(name: &str) -> Card {
        Card {
            name: Some(name.to_string()),
            ..Card::default()
        }
    }

    fn decisions(entries: &[(&str, Decision)]) -> DecisionMap {
        entries
            .iter()
            .map(|(email, decision)| (email.to_string(), *decision))
            .collect()
    }

    #[tokio::test]
    async fn test_empty_store_commits_batch_in_one_invocation() {
        let store = MemoryStore::default();
        let outcome = invoke(&store, vec![card("a@x.com", "A")]).await.unwrap();

        assert_eq!(outcome.state.stage, ReconcileStage::Committed);
        assert!(!outcome.state.pending_human);
        assert_eq!(outcome.state.committed.len(), 1);
        assert!(outcome.commit_failures.is_empty());
        assert_eq!(store.get("a@x.com").unwrap().name.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_duplicate_suspends_then_overwrite_on_resume() {
        let store = MemoryStore::with_contacts(vec![card("a@x.com", "A")]);
        let outcome = invoke(&store, vec![card("a@x.com", "A2")]).await.unwrap();

        assert_eq!(outcome.state.stage, ReconcileStage::Suspended);
        assert!(outcome.state.pending_human);
        assert_eq!(outcome.state.conflicting.len(), 1);
        assert!(outcome.state.committed.is_empty());
        // No writes happened before suspension.
        assert_eq!(store.get("a@x.com").unwrap().name.as_deref(), Some("A"));

        let resumed = resume(
            &store,
            outcome.state,
            decisions(&[("a@x.com", Decision::Overwrite)]),
        )
        .await
        .unwrap();

        assert_eq!(resumed.state.stage, ReconcileStage::Committed);
        assert_eq!(store.get("a@x.com").unwrap().name.as_deref(), Some("A2"));
        assert!(resumed.state.dropped_keys.is_empty());
    }

    #[tokio::test]
    async fn test_skip_leaves_row_unchanged_and_records_key() {
        let store = MemoryStore::with_contacts(vec![card("a@x.com", "A")]);
        let outcome = invoke(&store, vec![card("a@x.com", "A2")]).await.unwrap();

        let resumed = resume(
            &store,
            outcome.state,
            decisions(&[("a@x.com", Decision::Skip)]),
        )
        .await
        .unwrap();

        assert_eq!(store.get("a@x.com").unwrap().name.as_deref(), Some("A"));
        assert_eq!(resumed.state.dropped_keys, vec!["a@x.com".to_string()]);
        assert!(resumed.state.committed.is_empty());
    }

    #[tokio::test]
    async fn test_keyless_card_is_fresh_but_never_persisted() {
        let store = MemoryStore::default();
        let outcome = invoke(&store, vec![keyless_card("NoEmail")]).await.unwrap();

        assert_eq!(outcome.state.stage, ReconcileStage::Committed);
        assert_eq!(outcome.state.fresh.len(), 1);
        assert_eq!(outcome.state.committed.len(), 1);
        assert!(outcome.commit_failures.is_empty());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_card_routes_as_keyless_fresh() {
        let store = MemoryStore::with_contacts(vec![card("a@x.com", "A")]);
        let batch = vec![Card::extraction_failure("parse_failed")];
        let outcome = invoke(&store, batch).await.unwrap();

        // An extraction failure never suspends the batch and is never
        // flagged as a duplicate.
        assert_eq!(outcome.state.stage, ReconcileStage::Committed);
        assert!(outcome.state.conflicting.is_empty());
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_partition_is_complete_and_disjoint() {
        let store = MemoryStore::with_contacts(vec![card("dup@x.com", "Old")]);
        let batch = vec![
            card("new@x.com", "N"),
            card("dup@x.com", "D"),
            keyless_card("K"),
        ];
        let outcome = invoke(&store, batch.clone()).await.unwrap();
        let state = &outcome.state;

        assert_eq!(state.fresh.len() + state.conflicting.len(), batch.len());
        assert_eq!(
            state.fresh.iter().filter_map(Card::key).collect::<Vec<_>>(),
            vec!["new@x.com"]
        );
        assert_eq!(
            state
                .conflicting
                .iter()
                .filter_map(Card::key)
                .collect::<Vec<_>>(),
            vec!["dup@x.com"]
        );
    }

    #[tokio::test]
    async fn test_pending_human_only_without_decisions() {
        // Conflicts plus attached decisions do not suspend.
        let store = MemoryStore::with_contacts(vec![card("a@x.com", "A")]);
        let outcome = invoke(&store, vec![card("a@x.com", "A2")]).await.unwrap();
        assert!(outcome.state.pending_human);

        // A batch with no conflicts never suspends.
        let outcome = invoke(&store, vec![card("b@x.com", "B")]).await.unwrap();
        assert!(!outcome.state.pending_human);
        assert_eq!(outcome.state.stage, ReconcileStage::Committed);
    }

    #[tokio::test]
    async fn test_applying_same_decisions_twice_is_idempotent() {
        // Apply is pure, so re-running the same suspended state with
        // the same decisions yields identical committed/dropped sets.
        let store = MemoryStore::with_contacts(vec![card("a@x.com", "A"), card("b@x.com", "B")]);
        let suspended = invoke(&store, vec![card("a@x.com", "A2"), card("b@x.com", "B2")])
            .await
            .unwrap()
            .state;

        let picks = decisions(&[("a@x.com", Decision::Overwrite), ("b@x.com", Decision::Skip)]);

        let first = resume(&store, suspended.clone(), picks.clone()).await.unwrap();
        let second = resume(&store, suspended, picks).await.unwrap();

        assert_eq!(first.state.committed, second.state.committed);
        assert_eq!(first.state.dropped_keys, second.state.dropped_keys);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_fields_with_null() {
        // Overwrite is total: nulls clear previously stored values.
        let seeded = Card {
            phone: Some("03-0000-0000".to_string()),
            company: Some("Acme".to_string()),
            ..card("a@x.com", "A")
        };
        let store = MemoryStore::with_contacts(vec![seeded]);

        let incoming = card("a@x.com", "A2"); // no phone, no company
        let suspended = invoke(&store, vec![incoming]).await.unwrap().state;
        resume(
            &store,
            suspended,
            decisions(&[("a@x.com", Decision::Overwrite)]),
        )
        .await
        .unwrap();

        let row = store.get("a@x.com").unwrap();
        assert_eq!(row.name.as_deref(), Some("A2"));
        assert_eq!(row.phone, None);
        assert_eq!(row.company, None);
    }

    #[tokio::test]
    async fn test_no_conflict_fast_path() {
        let store = MemoryStore::default();
        let batch = vec![card("a@x.com", "A"), card("b@x.com", "B")];
        let outcome = invoke(&store, batch).await.unwrap();

        assert_eq!(outcome.state.stage, ReconcileStage::Committed);
        assert_eq!(outcome.state.committed, outcome.state.fresh);
        assert!(outcome.state.dropped_keys.is_empty());
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_undecided_duplicate_is_an_error() {
        let store = MemoryStore::with_contacts(vec![card("a@x.com", "A"), card("b@x.com", "B")]);
        let suspended = invoke(&store, vec![card("a@x.com", "A2"), card("b@x.com", "B2")])
            .await
            .unwrap()
            .state;

        let result = resume(
            &store,
            suspended,
            decisions(&[("a@x.com", Decision::Overwrite)]),
        )
        .await;

        match result {
            Err(ReconcileError::DecisionRequired { emails }) => {
                assert_eq!(emails, vec!["b@x.com".to_string()]);
            }
            other => panic!("expected DecisionRequired, got {other:?}"),
        }
        // The error aborts before commit: nothing was overwritten.
        assert_eq!(store.get("a@x.com").unwrap().name.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_resume_requires_suspended_state() {
        let store = MemoryStore::default();
        let committed = invoke(&store, vec![card("a@x.com", "A")]).await.unwrap().state;

        let result = resume(&store, committed, DecisionMap::new()).await;
        assert!(matches!(
            result,
            Err(ReconcileError::NotSuspended {
                stage: ReconcileStage::Committed
            })
        ));
    }

    #[tokio::test]
    async fn test_commit_is_best_effort_per_record() {
        let mut store = MemoryStore::default();
        store.fail_emails = vec!["bad@x.com".to_string()];

        let batch = vec![card("good@x.com", "G"), card("bad@x.com", "B"), card("also@x.com", "C")];
        let outcome = invoke(&store, batch).await.unwrap();

        assert_eq!(outcome.state.stage, ReconcileStage::Committed);
        assert_eq!(outcome.commit_failures.len(), 1);
        assert_eq!(outcome.commit_failures[0].email, "bad@x.com");
        // Records after the failing one were still attempted.
        assert!(store.get("good@x.com").is_some());
        assert!(store.get("also@x.com").is_some());
        assert!(store.get("bad@x.com").is_none());
    }

    #[tokio::test]
    async fn test_overwrites_follow_fresh_in_original_order() {
        let store = MemoryStore::with_contacts(vec![card("d1@x.com", "D1"), card("d2@x.com", "D2")]);
        let batch = vec![
            card("d2@x.com", "D2-new"),
            card("n@x.com", "N"),
            card("d1@x.com", "D1-new"),
        ];
        let suspended = invoke(&store, batch).await.unwrap().state;

        let resumed = resume(
            &store,
            suspended,
            decisions(&[
                ("d1@x.com", Decision::Overwrite),
                ("d2@x.com", Decision::Overwrite),
            ]),
        )
        .await
        .unwrap();

        // Fresh first, then overwritten duplicates in their original
        // relative order within the batch.
        let order: Vec<_> = resumed
            .state
            .committed
            .iter()
            .filter_map(Card::key)
            .collect();
        assert_eq!(order, vec!["n@x.com", "d2@x.com", "d1@x.com"]);
    }
}
