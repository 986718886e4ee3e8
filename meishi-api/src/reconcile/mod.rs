pub mod store;
pub mod workflow;

pub use store::{ContactStore, SqliteContactStore};
pub use workflow::{invoke, resume, ReconcileError, ReconcileOutcome};
