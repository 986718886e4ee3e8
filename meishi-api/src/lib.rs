pub mod config;
pub mod database;
pub mod handlers;
pub mod integrations;
pub mod reconcile;

pub use database::Database;
