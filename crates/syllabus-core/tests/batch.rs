//! Batch coordinator tests.

use std::sync::Arc;
use std::time::Duration;

use syllabus_core::{BatchConfig, BatchCoordinator, ItemError, WorkflowConfig, WorkflowEngine};
use syllabus_store::{InMemoryPlanRegistry, ListQuery, PlanRequest, PlanStore, ValidationError};
use syllabus_test_utils::{ScriptedGenerator, request_for};

fn coordinator(
    generator: Arc<ScriptedGenerator>,
    max_concurrent_plans: usize,
) -> (BatchCoordinator, Arc<InMemoryPlanRegistry>) {
    let store = Arc::new(InMemoryPlanRegistry::new());
    let engine = WorkflowEngine::new(generator, WorkflowConfig::default());
    let batch = BatchCoordinator::new(
        engine,
        store.clone(),
        BatchConfig {
            max_concurrent_plans,
        },
    );
    (batch, store)
}

#[tokio::test]
async fn malformed_item_k_fails_in_place() {
    let (batch, store) = coordinator(Arc::new(ScriptedGenerator::healthy()), 3);
    let mut requests: Vec<PlanRequest> = (0..5).map(|i| request_for(&format!("Topic {i}"))).collect();
    requests[2].topic = "   ".to_string();

    let report = batch.create_plans(requests).await;

    assert_eq!(report.len(), 5);
    assert_eq!(report.succeeded(), 4);
    for (i, item) in report.items.iter().enumerate() {
        assert_eq!(item.index, i);
        if i == 2 {
            assert_eq!(
                item.outcome.as_ref().unwrap_err(),
                &ItemError::Validation(ValidationError::EmptyTopic)
            );
        } else {
            let stored = item.outcome.as_ref().unwrap();
            assert_eq!(stored.plan.user_input.topic, format!("Topic {i}"));
        }
    }
    assert_eq!(store.len().await, 4);
}

#[tokio::test]
async fn results_keep_input_order() {
    let generator = Arc::new(ScriptedGenerator::healthy().with_delay(Duration::from_millis(5)));
    let (batch, _) = coordinator(generator, 8);
    let requests: Vec<PlanRequest> = (0..8).map(|i| request_for(&format!("T{i}"))).collect();

    let report = batch.create_plans(requests).await;

    let topics: Vec<String> = report
        .items
        .iter()
        .map(|i| i.outcome.as_ref().unwrap().plan.user_input.topic.clone())
        .collect();
    let expected: Vec<String> = (0..8).map(|i| format!("T{i}")).collect();
    assert_eq!(topics, expected);
}

#[tokio::test]
async fn plan_concurrency_is_bounded() {
    let generator = Arc::new(ScriptedGenerator::healthy().with_delay(Duration::from_millis(20)));
    let (batch, _) = coordinator(generator.clone(), 1);
    let requests = vec![request_for("A"), request_for("B"), request_for("C")];

    let report = batch.create_plans(requests).await;

    assert_eq!(report.succeeded(), 3);
    // One plan at a time; topic details within that plan may overlap.
    assert!(generator.max_in_flight() <= WorkflowConfig::DEFAULT_DETAIL_CONCURRENCY);
}

#[tokio::test]
async fn stored_plans_are_listed_newest_first() {
    let (batch, store) = coordinator(Arc::new(ScriptedGenerator::healthy()), 1);
    let report = batch
        .create_plans(vec![request_for("First"), request_for("Second")])
        .await;
    assert_eq!(report.succeeded(), 2);

    let page = store.list(ListQuery::new(10, 0)).await.unwrap();
    assert_eq!(page.total, 2);
    let ids: Vec<_> = page.items.iter().map(|s| s.request_id).collect();
    for item in &report.items {
        assert!(ids.contains(&item.outcome.as_ref().unwrap().request_id));
    }
}
