//! Batch coordinator: runs many independent plan requests concurrently.
//!
//! Every item is validated, generated and stored on its own task. The number
//! of plans in flight is bounded by a semaphore; results flow back over a
//! channel tagged with their input index and are reported in input order.
//! One item's failure never affects another.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use syllabus_store::{PlanRequest, PlanStore, StoredPlan, ValidationError};

use crate::workflow::{WorkflowEngine, WorkflowError};

/// Why a single batch item failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to generate learning plan: {0}")]
    Generation(WorkflowError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ItemError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Generation(_) => "generation",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<WorkflowError> for ItemError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::Validation(v) => Self::Validation(v),
            other => Self::Generation(other),
        }
    }
}

/// Validate `request`, run the workflow and store the resulting plan with
/// the request's metadata and the run's fallback list.
pub async fn submit_plan(
    engine: &WorkflowEngine,
    store: &dyn PlanStore,
    request: &PlanRequest,
    cancel: CancellationToken,
) -> Result<StoredPlan, ItemError> {
    let run = engine.run_request(request, cancel).await?;
    let mut metadata = request.metadata();
    metadata.fallbacks = run.fallbacks;
    let stored = store
        .store(run.plan, metadata)
        .await
        .map_err(|e| ItemError::Internal(e.to_string()))?;
    tracing::info!(
        request_id = %stored.request_id,
        topic = %stored.plan.user_input.topic,
        degraded = stored.is_degraded(),
        "learning plan stored"
    );
    Ok(stored)
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum plans generated at the same time.
    pub max_concurrent_plans: usize,
}

impl BatchConfig {
    pub const DEFAULT_MAX_CONCURRENT_PLANS: usize = 4;
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_plans: Self::DEFAULT_MAX_CONCURRENT_PLANS,
        }
    }
}

/// Outcome for one input of a batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub index: usize,
    pub request: PlanRequest,
    pub outcome: Result<StoredPlan, ItemError>,
}

/// Per-item outcomes in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items that produced a stored plan.
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }
}

/// Message sent from an item task back to the collector.
struct ItemDone {
    index: usize,
    outcome: Result<StoredPlan, ItemError>,
}

#[derive(Clone)]
pub struct BatchCoordinator {
    engine: WorkflowEngine,
    store: Arc<dyn PlanStore>,
    config: BatchConfig,
}

impl BatchCoordinator {
    pub fn new(engine: WorkflowEngine, store: Arc<dyn PlanStore>, config: BatchConfig) -> Self {
        Self {
            engine,
            store,
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Generate and store one plan per request.
    pub async fn create_plans(&self, requests: Vec<PlanRequest>) -> BatchReport {
        self.create_plans_with_cancel(requests, CancellationToken::new())
            .await
    }

    /// Like [`Self::create_plans`], but items still waiting to start a stage
    /// stop once `cancel` fires.
    pub async fn create_plans_with_cancel(
        &self,
        requests: Vec<PlanRequest>,
        cancel: CancellationToken,
    ) -> BatchReport {
        let total = requests.len();
        if total == 0 {
            return BatchReport::default();
        }
        tracing::info!(
            items = total,
            max_concurrent = self.config.max_concurrent_plans,
            "starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_plans.max(1)));
        let (tx, mut rx) = mpsc::channel::<ItemDone>(total);

        for (index, request) in requests.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let engine = self.engine.clone();
            let store = Arc::clone(&self.store);
            let cancel = cancel.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let outcome = submit_plan(&engine, store.as_ref(), &request, cancel).await;
                if let Err(e) = &outcome {
                    tracing::warn!(index, kind = e.kind(), error = %e, "batch item failed");
                }
                let _ = tx.send(ItemDone { index, outcome }).await;
            });
        }
        // Only task-held senders remain; the loop below ends when all
        // tasks have finished or died.
        drop(tx);

        let mut slots: Vec<Option<Result<StoredPlan, ItemError>>> =
            (0..total).map(|_| None).collect();
        while let Some(done) = rx.recv().await {
            slots[done.index] = Some(done.outcome);
        }

        let items: Vec<BatchItem> = requests
            .into_iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (request, slot))| BatchItem {
                index,
                request,
                outcome: slot.unwrap_or_else(|| {
                    tracing::error!(index, "batch item task ended without a result");
                    Err(ItemError::Internal(
                        "plan task ended without a result".to_string(),
                    ))
                }),
            })
            .collect();

        let report = BatchReport { items };
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch complete"
        );
        report
    }
}
