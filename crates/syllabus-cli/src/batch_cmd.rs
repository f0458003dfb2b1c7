//! `syllabus batch`: generate plans for every request in a JSON file.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use syllabus_core::{BatchCoordinator, BatchItem, ItemError, WorkflowEngine, WorkflowError};
use syllabus_store::{InMemoryPlanRegistry, LearningPlan, PlanRequest, StageKind};

use crate::config::SyllabusConfig;

/// Message shown for failures whose details stay in the logs.
pub const GENERATION_FAILED: &str = "failed to generate learning plan";

/// One batch result as reported to users (CLI `--output` and HTTP).
#[derive(Debug, Serialize)]
pub struct BatchItemResponse {
    pub index: usize,
    pub success: bool,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<StageKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<LearningPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl BatchItemResponse {
    pub fn from_item(item: BatchItem) -> Self {
        match item.outcome {
            Ok(stored) => Self {
                index: item.index,
                success: true,
                topic: item.request.topic,
                request_id: Some(stored.request_id),
                degraded: Some(stored.is_degraded()),
                fallbacks: stored.metadata.fallbacks,
                data: Some(stored.plan),
                error: None,
                error_kind: None,
            },
            Err(e) => Self::failure(item.index, item.request.topic, &e),
        }
    }

    pub fn failure(index: usize, topic: String, error: &ItemError) -> Self {
        Self {
            index,
            success: false,
            topic,
            request_id: None,
            degraded: None,
            fallbacks: Vec::new(),
            data: None,
            error: Some(public_message(error)),
            error_kind: Some(error.kind()),
        }
    }

    /// An item that could not be decoded into a request at all.
    pub fn rejected(index: usize, topic: String, message: String) -> Self {
        Self {
            index,
            success: false,
            topic,
            request_id: None,
            degraded: None,
            fallbacks: Vec::new(),
            data: None,
            error: Some(message),
            error_kind: Some("validation"),
        }
    }
}

/// User-facing text for an item error. Validation problems are shown as-is;
/// anything internal is reduced to a generic message.
pub fn public_message(error: &ItemError) -> String {
    match error {
        ItemError::Validation(e) => e.to_string(),
        ItemError::Generation(WorkflowError::Cancelled { .. }) => {
            "plan generation was cancelled".to_string()
        }
        ItemError::Generation(_) | ItemError::Internal(_) => GENERATION_FAILED.to_string(),
    }
}

/// `"k/N successful"`.
pub fn success_summary(results: &[BatchItemResponse]) -> String {
    let succeeded = results.iter().filter(|r| r.success).count();
    format!("{succeeded}/{} successful", results.len())
}

/// Raw batch elements split into decodable requests and per-index
/// rejections. A malformed element never fails its neighbours.
#[derive(Debug, Default)]
pub struct DecodedBatch {
    /// Original index of each entry in `requests`.
    positions: Vec<usize>,
    requests: Vec<PlanRequest>,
    rejected: Vec<BatchItemResponse>,
}

impl DecodedBatch {
    pub fn decode(raw_items: Vec<Value>) -> Self {
        let mut batch = Self::default();
        for (index, raw) in raw_items.into_iter().enumerate() {
            let topic = raw
                .get("topic")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            match serde_json::from_value::<PlanRequest>(raw) {
                Ok(request) => {
                    batch.positions.push(index);
                    batch.requests.push(request);
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "undecodable batch item");
                    batch.rejected.push(BatchItemResponse::rejected(
                        index,
                        topic,
                        format!("invalid request: {e}"),
                    ));
                }
            }
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.requests.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the decodable requests and merge every outcome back into input
    /// order.
    pub async fn run(
        self,
        coordinator: &BatchCoordinator,
        cancel: CancellationToken,
    ) -> Vec<BatchItemResponse> {
        let Self {
            positions,
            requests,
            rejected,
        } = self;

        let report = coordinator
            .create_plans_with_cancel(requests, cancel)
            .await;
        let mut results: Vec<BatchItemResponse> = report
            .items
            .into_iter()
            .map(|item| {
                let index = positions[item.index];
                let mut response = BatchItemResponse::from_item(item);
                response.index = index;
                response
            })
            .chain(rejected)
            .collect();
        results.sort_by_key(|r| r.index);
        results
    }
}

/// Read a batch file. Only a file that is not a JSON array fails as a
/// whole; individual elements are decoded later.
pub fn read_batch_file(path: &Path) -> Result<Vec<Value>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let items: Vec<Value> = serde_json::from_str(&contents)
        .with_context(|| format!("{} must contain a JSON array", path.display()))?;
    Ok(items)
}

pub async fn run_batch(config: &SyllabusConfig, file: &Path, output: Option<&Path>) -> Result<()> {
    let batch = DecodedBatch::decode(read_batch_file(file)?);
    if batch.is_empty() {
        println!("No requests in {}.", file.display());
        return Ok(());
    }

    let engine = WorkflowEngine::new(config.build_generator()?, config.workflow.clone());
    let store = Arc::new(InMemoryPlanRegistry::new());
    let coordinator = BatchCoordinator::new(engine, store, config.batch.clone());

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted; remaining plans stop before their next stage...");
            on_ctrl_c.cancel();
        }
    });

    eprintln!(
        "Generating {} learning plans ({} at a time)...",
        batch.len(),
        config.batch.max_concurrent_plans
    );
    let results = batch.run(&coordinator, cancel).await;

    for item in &results {
        if item.success {
            let note = if item.fallbacks.is_empty() {
                String::new()
            } else {
                let names: Vec<String> = item.fallbacks.iter().map(ToString::to_string).collect();
                format!(" (fallback: {})", names.join(", "))
            };
            let id = item.request_id.map(|id| id.to_string()).unwrap_or_default();
            println!("[{}] ok     {} -> {id}{note}", item.index, item.topic);
        } else {
            println!(
                "[{}] failed {} ({}): {}",
                item.index,
                item.topic,
                item.error_kind.unwrap_or("internal"),
                item.error.as_deref().unwrap_or(GENERATION_FAILED)
            );
        }
    }
    println!("{}", success_summary(&results));

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&results).context("failed to serialize results")?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Results written to {}", path.display());
    }
    Ok(())
}
