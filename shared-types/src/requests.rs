use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::reconcile::{CommitFailure, DecisionMap, ReconciliationState};

/// One uploaded card image, base64-encoded. The filename is only used to
/// pick the image MIME type for the vision request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardImage {
    pub filename: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// Request to extract cards from images and reconcile them in one step.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanRequest {
    pub images: Vec<CardImage>,
}

/// Request to reconcile already-extracted cards.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub cards: Vec<Card>,
}

/// Request to resume a suspended reconciliation with human decisions.
/// `state` is the suspended state exactly as it was returned.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResumeRequest {
    pub state: ReconciliationState,
    pub decisions: DecisionMap,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub state: ReconciliationState,
    pub commit_failures: Vec<CommitFailure>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactsResponse {
    pub contacts: Vec<Card>,
}
