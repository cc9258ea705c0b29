//! In-memory interaction history.
//!
//! `InteractionLog` holds a bounded window of `UserInteraction` records for
//! all users. When the log is full the oldest entry is evicted before the
//! new one is inserted (ring-buffer semantics backed by `VecDeque`).
//!
//! The log itself is not `Sync`; the personalization service wraps it in
//! a `tokio::sync::RwLock`.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default maximum number of interactions retained in memory.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// A user clicking, expanding or filtering a dashboard component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInteraction {
    pub user_id: String,
    pub component_id: String,
    pub interaction_type: String,
    pub metric_key: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Capacity-bounded in-memory log of `UserInteraction` values.
#[derive(Debug)]
pub struct InteractionLog {
    data: VecDeque<UserInteraction>,
    capacity: usize,
}

impl Default for InteractionLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl InteractionLog {
    /// Create a new log with the given maximum capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Append an interaction, evicting the oldest if the log is full.
    pub fn push(&mut self, interaction: UserInteraction) {
        if self.data.len() >= self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(interaction);
    }

    /// Interactions of `user_id` with a timestamp >= `since`, oldest first.
    pub fn for_user_since(&self, user_id: &str, since: DateTime<Utc>) -> Vec<UserInteraction> {
        self.data
            .iter()
            .filter(|i| i.user_id == user_id && i.timestamp >= since)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
