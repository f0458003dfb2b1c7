//! `syllabus generate`: run one plan and print it.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use syllabus_core::WorkflowEngine;
use syllabus_store::{LearningPlan, PlanRequest, StageKind};

use crate::config::SyllabusConfig;

/// JSON document written by `--json`.
#[derive(Debug, Serialize)]
pub struct PlanOutput<'a> {
    pub degraded: bool,
    pub fallbacks: &'a [StageKind],
    pub plan: &'a LearningPlan,
}

pub async fn run_generate(
    config: &SyllabusConfig,
    request: &PlanRequest,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let input = request.validate().context("invalid plan request")?;
    let engine = WorkflowEngine::new(config.build_generator()?, config.workflow.clone());

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted; stopping after the current stage...");
            on_ctrl_c.cancel();
        }
    });

    eprintln!("Generating learning plan for {:?}...", input.topic);
    let run = engine
        .run(input, cancel)
        .await
        .context("failed to generate learning plan")?;

    let rendered = if json {
        let doc = PlanOutput {
            degraded: run.is_degraded(),
            fallbacks: &run.fallbacks,
            plan: &run.plan,
        };
        let mut text = serde_json::to_string_pretty(&doc).context("failed to serialize plan")?;
        text.push('\n');
        text
    } else {
        render_plan(&run.plan, &run.fallbacks)
    };

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Learning plan written to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn bullet_list(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str("  (none)\n");
    }
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

/// Human-readable plan for the terminal.
pub fn render_plan(plan: &LearningPlan, fallbacks: &[StageKind]) -> String {
    let mut out = String::new();
    let input = &plan.user_input;

    let _ = writeln!(out, "Learning plan: {}", input.topic);
    let _ = writeln!(out, "Format: {}", input.preferred_format);
    if !fallbacks.is_empty() {
        let names: Vec<String> = fallbacks.iter().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "Note: default content was used for: {}",
            names.join(", ")
        );
    }

    let gap = &plan.knowledge_gap;
    out.push_str("\n== Knowledge gap ==\n");
    let _ = writeln!(out, "Current level: {}", gap.current_level);
    let _ = writeln!(out, "Target level:  {}", gap.target_level);
    out.push_str("Gaps:\n");
    bullet_list(&mut out, &gap.identified_gaps);
    let _ = writeln!(out, "{}", gap.gap_analysis);

    let topics = &plan.topic_plan;
    out.push_str("\n== Curriculum ==\n");
    let _ = writeln!(out, "Estimated duration: {}", topics.estimated_duration);
    for (i, topic) in topics.main_topics.iter().enumerate() {
        let _ = writeln!(out, "  {}. {topic}", i + 1);
    }
    if !topics.learning_objectives.is_empty() {
        out.push_str("Objectives:\n");
        bullet_list(&mut out, &topics.learning_objectives);
    }

    out.push_str("\n== Topics ==\n");
    for (i, detail) in plan.topic_details.iter().enumerate() {
        let _ = writeln!(out, "\n{}. {}", i + 1, detail.topic_name);
        let _ = writeln!(out, "{}", detail.description);
        out.push_str("Resources:\n");
        bullet_list(&mut out, &detail.resources);
        out.push_str("Exercises:\n");
        bullet_list(&mut out, &detail.exercises);
        let _ = writeln!(out, "Assessment: {}", detail.assessment_criteria);
    }

    out.push_str("\n== Learning path ==\n");
    let _ = writeln!(out, "{}", plan.learning_path);
    let _ = writeln!(out, "Timeline: {}", plan.timeline);
    out.push_str("Recommended resources:\n");
    bullet_list(&mut out, &plan.recommended_resources);
    out.push_str("Success metrics:\n");
    bullet_list(&mut out, &plan.success_metrics);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use syllabus_core::WorkflowConfig;
    use syllabus_test_utils::{FailingGenerator, ScriptedGenerator, python_beginner_input};

    async fn plan_from(generator: Arc<dyn syllabus_core::Generator>) -> syllabus_core::PlanRun {
        WorkflowEngine::new(generator, WorkflowConfig::default())
            .run(python_beginner_input(), CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn render_lists_every_section() {
        let run = plan_from(Arc::new(ScriptedGenerator::healthy())).await;
        let text = render_plan(&run.plan, &run.fallbacks);

        assert!(text.starts_with("Learning plan: Python Programming\n"));
        assert!(text.contains("== Knowledge gap =="));
        assert!(text.contains("  1. Foundations"));
        assert!(text.contains("\n3. Projects\n"));
        assert!(text.contains("Timeline: 6 weeks"));
        assert!(!text.contains("default content"));
    }

    #[tokio::test]
    async fn render_notes_fallbacks() {
        let run = plan_from(Arc::new(FailingGenerator::new())).await;
        let text = render_plan(&run.plan, &run.fallbacks);

        assert!(text.contains(
            "default content was used for: gap_analysis, topic_planning, topic_detail, plan_combiner"
        ));
        assert!(text.contains("Current level: Complete beginner"));
    }

    #[tokio::test]
    async fn json_output_carries_fallbacks() {
        let run = plan_from(Arc::new(FailingGenerator::new())).await;
        let doc = PlanOutput {
            degraded: run.is_degraded(),
            fallbacks: &run.fallbacks,
            plan: &run.plan,
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["degraded"], true);
        assert_eq!(value["fallbacks"][0], "gap_analysis");
        assert_eq!(value["plan"]["user_input"]["preferred_format"], "video");
    }
}
