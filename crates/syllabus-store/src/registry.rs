//! Plan registry: process-lifetime storage for completed learning plans.
//!
//! [`PlanStore`] is the seam for alternative backends; the only provided
//! implementation is [`InMemoryPlanRegistry`], which keeps everything behind a
//! single [`RwLock`] and is gone when the process exits.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{LearningPlan, PlanSummary, RequestMetadata, StoredPlan};

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("learning plan {0} not found")]
    NotFound(Uuid),
}

/// Pagination parameters for [`PlanStore::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub limit: usize,
    pub offset: usize,
}

impl ListQuery {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }
}

/// One page of plan summaries, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<PlanSummary>,
    /// Number of plans in the registry when the page was taken.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Keyed storage for completed plans.
///
/// Implementations must be safe under concurrent access: concurrent
/// [`store`](PlanStore::store) calls never share an id, and a `delete`
/// followed by a `get` of the same id observes [`RegistryError::NotFound`].
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Store a plan under a freshly generated id. Never overwrites.
    async fn store(
        &self,
        plan: LearningPlan,
        metadata: RequestMetadata,
    ) -> Result<StoredPlan, RegistryError>;

    /// Fetch a copy of a stored plan.
    async fn get(&self, request_id: Uuid) -> Result<StoredPlan, RegistryError>;

    /// List summaries ordered by creation time, newest first.
    async fn list(&self, query: ListQuery) -> Result<Page, RegistryError>;

    /// Remove a plan. Deleting an unknown id returns `NotFound`.
    async fn delete(&self, request_id: Uuid) -> Result<(), RegistryError>;

    /// Number of stored plans.
    async fn len(&self) -> usize;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};

struct Entry {
    /// Insertion sequence; breaks ties between equal timestamps.
    seq: u64,
    plan: StoredPlan,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Uuid, Entry>,
    next_seq: u64,
}

/// In-memory [`PlanStore`].
#[derive(Default)]
pub struct InMemoryPlanRegistry {
    inner: RwLock<Inner>,
}

impl InMemoryPlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for InMemoryPlanRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryPlanRegistry").finish_non_exhaustive()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanRegistry {
    async fn store(
        &self,
        plan: LearningPlan,
        metadata: RequestMetadata,
    ) -> Result<StoredPlan, RegistryError> {
        let mut inner = self.inner.write().await;

        let mut request_id = Uuid::new_v4();
        while inner.entries.contains_key(&request_id) {
            tracing::warn!(request_id = %request_id, "generated request id collided, regenerating");
            request_id = Uuid::new_v4();
        }

        let stored = StoredPlan {
            request_id,
            created_at: Utc::now(),
            plan,
            metadata,
        };
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            request_id,
            Entry {
                seq,
                plan: stored.clone(),
            },
        );

        tracing::debug!(request_id = %request_id, "stored learning plan");
        Ok(stored)
    }

    async fn get(&self, request_id: Uuid) -> Result<StoredPlan, RegistryError> {
        let inner = self.inner.read().await;
        inner
            .entries
            .get(&request_id)
            .map(|e| e.plan.clone())
            .ok_or(RegistryError::NotFound(request_id))
    }

    async fn list(&self, query: ListQuery) -> Result<Page, RegistryError> {
        let inner = self.inner.read().await;
        let total = inner.entries.len();

        let mut entries: Vec<&Entry> = inner.entries.values().collect();
        entries.sort_by(|a, b| {
            b.plan
                .created_at
                .cmp(&a.plan.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        let items = entries
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|e| e.plan.summary())
            .collect();

        Ok(Page {
            items,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }

    async fn delete(&self, request_id: Uuid) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        match inner.entries.remove(&request_id) {
            Some(_) => {
                tracing::debug!(request_id = %request_id, "deleted learning plan");
                Ok(())
            }
            None => Err(RegistryError::NotFound(request_id)),
        }
    }

    async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}
