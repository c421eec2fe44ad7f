//! Active session registry
//!
//! Tracks which users are mid-conversation and when they were last seen.
//! Only used for observability; session lookup goes through the runtime
//! manager's handle map.

use crate::state_machine::UserId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct SessionRegistry {
    active: Mutex<HashMap<UserId, DateTime<Utc>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the user active now; returns true when newly registered
    pub fn register(&self, user_id: UserId) -> bool {
        self.active
            .lock()
            .unwrap()
            .insert(user_id, Utc::now())
            .is_none()
    }

    /// Returns true when the user was registered
    pub fn unregister(&self, user_id: UserId) -> bool {
        self.active.lock().unwrap().remove(&user_id).is_some()
    }

    pub fn count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    #[allow(dead_code)] // Used in tests
    pub fn last_active(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.active.lock().unwrap().get(&user_id).copied()
    }
}
