//! End-to-end workflow tests against scripted generators.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use syllabus_core::generation::GenerationError;
use syllabus_core::{WorkflowConfig, WorkflowEngine, WorkflowError};
use syllabus_store::StageKind;
use syllabus_test_utils::{
    DEFAULT_TOPICS, FailingGenerator, HangingGenerator, ScriptedGenerator, python_beginner_input,
    topic_plan_json,
};

fn engine_with(generator: Arc<dyn syllabus_core::Generator>) -> WorkflowEngine {
    WorkflowEngine::new(generator, WorkflowConfig::default())
}

#[tokio::test]
async fn detail_count_matches_main_topics() {
    for topics in [vec!["One"], vec!["A", "B", "C", "D", "E", "F", "G"]] {
        let generator = ScriptedGenerator::healthy()
            .respond(StageKind::TopicPlanning, topic_plan_json(&topics));
        let plan = engine_with(Arc::new(generator))
            .create_plan(python_beginner_input())
            .await
            .unwrap();

        assert_eq!(plan.topic_details.len(), topics.len());
        assert_eq!(plan.topic_plan.main_topics, topics);
    }
}

#[tokio::test]
async fn every_stage_calls_the_generator() {
    let generator = Arc::new(ScriptedGenerator::healthy());
    let run = engine_with(generator.clone())
        .run(python_beginner_input(), CancellationToken::new())
        .await
        .unwrap();

    assert!(!run.is_degraded());
    assert_eq!(generator.calls(StageKind::GapAnalysis), 1);
    assert_eq!(generator.calls(StageKind::TopicPlanning), 1);
    assert_eq!(generator.calls(StageKind::TopicDetail), DEFAULT_TOPICS.len());
    assert_eq!(generator.calls(StageKind::PlanCombiner), 1);
}

#[tokio::test]
async fn failing_generator_still_yields_valid_plan() {
    let generator = Arc::new(FailingGenerator::new());
    let run = engine_with(generator.clone())
        .run(python_beginner_input(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.fallbacks, StageKind::ALL);
    assert!(run.plan.check_consistency().is_ok());
    assert!(!run.plan.recommended_resources.is_empty());
    // gap + planning + 3 fallback topics + combiner
    assert_eq!(generator.calls(), 6);
}

#[tokio::test]
async fn python_beginner_scenario() {
    let plan = engine_with(Arc::new(FailingGenerator::new()))
        .create_plan(python_beginner_input())
        .await
        .unwrap();

    assert_eq!(plan.knowledge_gap.current_level, "Complete beginner");
    assert!(!plan.topic_plan.main_topics.is_empty());
    assert!(!plan.success_metrics.is_empty());
    assert!(plan.topic_details[0].resources[0].starts_with("Video"));
}

#[tokio::test]
async fn out_of_order_details_stay_in_topic_order() {
    let generator = ScriptedGenerator::healthy()
        .with_topic_delay("Foundations", Duration::from_millis(150))
        .with_topic_delay("Techniques", Duration::from_millis(75));
    let plan = engine_with(Arc::new(generator))
        .create_plan(python_beginner_input())
        .await
        .unwrap();

    let names: Vec<&str> = plan
        .topic_details
        .iter()
        .map(|d| d.topic_name.as_str())
        .collect();
    assert_eq!(names, DEFAULT_TOPICS);
}

#[tokio::test]
async fn detail_calls_respect_concurrency_limit() {
    let topics = ["A", "B", "C", "D", "E", "F"];
    let generator = Arc::new(
        ScriptedGenerator::healthy()
            .respond(StageKind::TopicPlanning, topic_plan_json(&topics))
            .with_delay(Duration::from_millis(20)),
    );
    let config = WorkflowConfig {
        detail_concurrency: 2,
        ..WorkflowConfig::default()
    };

    WorkflowEngine::new(generator.clone(), config)
        .create_plan(python_beginner_input())
        .await
        .unwrap();

    assert_eq!(generator.calls(StageKind::TopicDetail), topics.len());
    assert!(generator.max_in_flight() <= 2, "{}", generator.max_in_flight());
    assert_eq!(generator.max_in_flight(), 2);
}

#[tokio::test]
async fn single_topic_failure_degrades_only_detail() {
    let generator = ScriptedGenerator::healthy()
        .fail_topic("Techniques", GenerationError::Http("reset".to_string()));
    let run = engine_with(Arc::new(generator))
        .run(python_beginner_input(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.fallbacks, vec![StageKind::TopicDetail]);
    assert_eq!(
        run.plan.topic_details[0].description,
        "Generated description of Foundations"
    );
    assert!(run.plan.topic_details[1].description.contains("Understand Techniques"));
}

#[tokio::test]
async fn hanging_generator_is_bounded_by_timeout() {
    let config = WorkflowConfig {
        call_timeout: Duration::from_millis(50),
        detail_concurrency: 4,
    };
    let started = Instant::now();
    let run = WorkflowEngine::new(Arc::new(HangingGenerator), config)
        .run(python_beginner_input(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.fallbacks, StageKind::ALL);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn cancellation_before_first_stage() {
    let generator = Arc::new(ScriptedGenerator::healthy());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine_with(generator.clone())
        .run(python_beginner_input(), cancel)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WorkflowError::Cancelled {
            before: StageKind::GapAnalysis
        }
    );
    assert_eq!(generator.total_calls(), 0);
}

#[tokio::test]
async fn cancellation_between_stages_lets_current_stage_finish() {
    let generator = Arc::new(ScriptedGenerator::healthy().with_delay(Duration::from_millis(100)));
    let cancel = CancellationToken::new();
    let engine = engine_with(generator.clone());

    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { engine.run(python_beginner_input(), cancel).await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel.cancel();

    let err = handle.await.unwrap().unwrap_err();
    assert_eq!(
        err,
        WorkflowError::Cancelled {
            before: StageKind::TopicPlanning
        }
    );
    assert_eq!(generator.calls(StageKind::GapAnalysis), 1);
}

#[tokio::test]
async fn engine_is_reusable_across_plans() {
    let engine = engine_with(Arc::new(ScriptedGenerator::healthy()));
    let other = engine.clone();
    let a = other.create_plan(python_beginner_input());
    let b = engine.create_plan(python_beginner_input());
    let (a, b) = tokio::join!(a, b);
    assert_eq!(a.unwrap(), b.unwrap());
}
