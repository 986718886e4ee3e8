use serde::{Deserialize, Serialize};

pub mod card;
pub mod reconcile;
pub mod requests;

pub use card::Card;
pub use reconcile::{
    CommitFailure, Decision, DecisionMap, ReconcileStage, ReconciliationState,
};
pub use requests::{
    CardImage, ContactsResponse, ReconcileRequest, ReconcileResponse, ResumeRequest, ScanRequest,
};

/// Error response for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
