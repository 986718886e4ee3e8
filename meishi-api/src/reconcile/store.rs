use crate::database::contacts as contacts_db;
use crate::database::AsyncDbConnection;
use anyhow::Result;
use async_trait::async_trait;
use shared_types::Card;

/// The contact store as the workflow sees it: an existence check keyed on
/// email, an atomic insert-or-overwrite, and a listing for display. The
/// workflow never touches SQL directly, which keeps the state machine
/// testable against an in-memory store.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn exists(&self, email: &str) -> Result<bool>;
    async fn upsert(&self, card: &Card) -> Result<()>;
    async fn list_all(&self) -> Result<Vec<Card>>;
}

pub struct SqliteContactStore {
    conn: AsyncDbConnection,
}

impl SqliteContactStore {
    pub fn new(conn: AsyncDbConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ContactStore for SqliteContactStore {
    async fn exists(&self, email: &str) -> Result<bool> {
        contacts_db::contact_exists(self.conn.clone(), email).await
    }

    async fn upsert(&self, card: &Card) -> Result<()> {
        contacts_db::upsert_contact(self.conn.clone(), card).await
    }

    async fn list_all(&self) -> Result<Vec<Card>> {
        contacts_db::list_contacts(self.conn.clone()).await
    }
}
