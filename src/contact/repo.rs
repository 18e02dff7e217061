use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo_types::{ContactMessage, NewContactMessage};
use crate::error::StoreError;

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn create(&self, msg: NewContactMessage) -> Result<ContactMessage, StoreError>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<ContactMessage>, StoreError>;
}

pub struct PgContactStore {
    db: PgPool,
}

impl PgContactStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn create(&self, msg: NewContactMessage) -> Result<ContactMessage, StoreError> {
        let row = sqlx::query_as::<_, ContactMessage>(
            r#"
            INSERT INTO contact_messages (id, name, email, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, message, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&msg.name)
        .bind(&msg.email)
        .bind(&msg.message)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<ContactMessage>, StoreError> {
        let rows = sqlx::query_as::<_, ContactMessage>(
            r#"
            SELECT id, name, email, message, created_at
            FROM contact_messages
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

#[derive(Default)]
pub struct MemoryContactStore {
    messages: RwLock<Vec<ContactMessage>>,
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn create(&self, msg: NewContactMessage) -> Result<ContactMessage, StoreError> {
        let record = ContactMessage {
            id: Uuid::new_v4(),
            name: msg.name,
            email: msg.email,
            message: msg.message,
            created_at: OffsetDateTime::now_utc(),
        };
        self.messages.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<ContactMessage>, StoreError> {
        let mut out: Vec<ContactMessage> =
            self.messages.read().await.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}
