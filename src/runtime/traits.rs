//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{Database, DbError};
use crate::grades::GradeEntry;
use crate::state_machine::{GradeSlot, Session, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Opaque failure of a profile store operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("profile store failure: {0}")]
pub struct StoreError(pub String);

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        StoreError(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("no transport is subscribed to the outbox")]
    NoSubscribers,
    #[allow(dead_code)] // Returned by the mock channel in tests
    #[error("user {0} is unreachable")]
    Unreachable(UserId),
}

/// Persistent per-user profile, the feedback log, and parked conversations
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load_degree_flag(&self, user_id: UserId) -> Result<Option<bool>, StoreError>;

    async fn save_degree_flag(&self, user_id: UserId, is_exact_sciences: bool)
        -> Result<(), StoreError>;

    /// Empty when nothing was stored
    async fn load_grades(&self, user_id: UserId, slot: GradeSlot)
        -> Result<Vec<GradeEntry>, StoreError>;

    async fn save_grades(
        &self,
        user_id: UserId,
        slot: GradeSlot,
        grades: &[GradeEntry],
    ) -> Result<(), StoreError>;

    async fn store_feedback(&self, user_id: UserId, text: &str) -> Result<(), StoreError>;

    async fn all_user_ids(&self) -> Result<Vec<UserId>, StoreError>;

    async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError>;

    async fn count_users(&self) -> Result<i64, StoreError>;

    /// Keep an unfinished conversation while its task is not running
    async fn park_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Remove and return the parked conversation for `user_id`
    async fn take_parked_session(&self, user_id: UserId) -> Result<Option<Session>, StoreError>;
}

/// Delivery of messages to users other than the sender
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn deliver(&self, to: UserId, text: &str) -> Result<(), DeliveryError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ProfileStore + ?Sized> ProfileStore for Arc<T> {
    async fn load_degree_flag(&self, user_id: UserId) -> Result<Option<bool>, StoreError> {
        (**self).load_degree_flag(user_id).await
    }

    async fn save_degree_flag(
        &self,
        user_id: UserId,
        is_exact_sciences: bool,
    ) -> Result<(), StoreError> {
        (**self).save_degree_flag(user_id, is_exact_sciences).await
    }

    async fn load_grades(
        &self,
        user_id: UserId,
        slot: GradeSlot,
    ) -> Result<Vec<GradeEntry>, StoreError> {
        (**self).load_grades(user_id, slot).await
    }

    async fn save_grades(
        &self,
        user_id: UserId,
        slot: GradeSlot,
        grades: &[GradeEntry],
    ) -> Result<(), StoreError> {
        (**self).save_grades(user_id, slot, grades).await
    }

    async fn store_feedback(&self, user_id: UserId, text: &str) -> Result<(), StoreError> {
        (**self).store_feedback(user_id, text).await
    }

    async fn all_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        (**self).all_user_ids().await
    }

    async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        (**self).user_exists(user_id).await
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        (**self).count_users().await
    }

    async fn park_session(&self, session: &Session) -> Result<(), StoreError> {
        (**self).park_session(session).await
    }

    async fn take_parked_session(&self, user_id: UserId) -> Result<Option<Session>, StoreError> {
        (**self).take_parked_session(user_id).await
    }
}

#[async_trait]
impl<T: MessageChannel + ?Sized> MessageChannel for Arc<T> {
    async fn deliver(&self, to: UserId, text: &str) -> Result<(), DeliveryError> {
        (**self).deliver(to, text).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as `ProfileStore`
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for DatabaseStore {
    async fn load_degree_flag(&self, user_id: UserId) -> Result<Option<bool>, StoreError> {
        Ok(self.db.get_degree_flag(user_id)?)
    }

    async fn save_degree_flag(
        &self,
        user_id: UserId,
        is_exact_sciences: bool,
    ) -> Result<(), StoreError> {
        Ok(self.db.set_degree_flag(user_id, is_exact_sciences)?)
    }

    async fn load_grades(
        &self,
        user_id: UserId,
        slot: GradeSlot,
    ) -> Result<Vec<GradeEntry>, StoreError> {
        Ok(self.db.get_grades(user_id, slot)?)
    }

    async fn save_grades(
        &self,
        user_id: UserId,
        slot: GradeSlot,
        grades: &[GradeEntry],
    ) -> Result<(), StoreError> {
        Ok(self.db.set_grades(user_id, slot, grades)?)
    }

    async fn store_feedback(&self, user_id: UserId, text: &str) -> Result<(), StoreError> {
        let feedback = self.db.add_feedback(user_id, text)?;
        tracing::debug!(feedback_id = feedback.id, user_id, "Stored feedback");
        Ok(())
    }

    async fn all_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.db.all_user_ids()?)
    }

    async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        Ok(self.db.user_exists(user_id)?)
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        Ok(self.db.count_users()?)
    }

    async fn park_session(&self, session: &Session) -> Result<(), StoreError> {
        Ok(self.db.park_session(session)?)
    }

    async fn take_parked_session(&self, user_id: UserId) -> Result<Option<Session>, StoreError> {
        Ok(self.db.take_parked_session(user_id)?)
    }
}

/// A message addressed to someone other than the sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub to: UserId,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Fan-out of deliveries to whatever transports are subscribed
#[derive(Clone)]
pub struct OutboxChannel {
    tx: broadcast::Sender<Delivery>,
}

impl OutboxChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Delivery> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl MessageChannel for OutboxChannel {
    async fn deliver(&self, to: UserId, text: &str) -> Result<(), DeliveryError> {
        let delivery = Delivery {
            to,
            text: text.to_string(),
            sent_at: Utc::now(),
        };
        self.tx
            .send(delivery)
            .map(|_| ())
            .map_err(|_| DeliveryError::NoSubscribers)
    }
}
