//! Integration tests for the `syllabus` binary.
//!
//! Every test runs with an isolated `XDG_CONFIG_HOME` and no API key, so
//! plans come entirely from fallback content and no network is touched.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

fn syllabus(config_home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_syllabus"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("SYLLABUS_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("SYLLABUS_MODEL")
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run syllabus binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// -----------------------------------------------------------------------
// init
// -----------------------------------------------------------------------

#[test]
fn init_refuses_to_overwrite_without_force() {
    let home = TempDir::new().unwrap();

    let first = syllabus(home.path(), &["init", "--api-key", "abcdefghijklmnop"]);
    assert!(first.status.success(), "{}", stderr(&first));
    assert!(stdout(&first).contains("abcd...mnop"));
    assert!(!stdout(&first).contains("abcdefghijklmnop"));

    let written = std::fs::read_to_string(home.path().join("syllabus/config.toml")).unwrap();
    assert!(written.contains("api_key = \"abcdefghijklmnop\""));

    let second = syllabus(home.path(), &["init"]);
    assert!(!second.status.success());
    assert!(stderr(&second).contains("already exists"));

    let forced = syllabus(home.path(), &["init", "--force", "--model", "custom-model"]);
    assert!(forced.status.success(), "{}", stderr(&forced));
    let written = std::fs::read_to_string(home.path().join("syllabus/config.toml")).unwrap();
    assert!(written.contains("model = \"custom-model\""));
}

// -----------------------------------------------------------------------
// generate
// -----------------------------------------------------------------------

#[test]
fn generate_without_key_uses_fallback_plan() {
    let home = TempDir::new().unwrap();
    let output = syllabus(
        home.path(),
        &[
            "generate",
            "--topic",
            "Python Programming",
            "--background",
            "Complete beginner",
            "--json",
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["degraded"], true);
    assert_eq!(
        json["plan"]["knowledge_gap"]["current_level"],
        "Complete beginner"
    );
    let topics = json["plan"]["topic_plan"]["main_topics"].as_array().unwrap();
    assert!(!topics.is_empty());
    assert_eq!(
        json["plan"]["topic_details"].as_array().unwrap().len(),
        topics.len()
    );
    assert!(
        !json["plan"]["success_metrics"]
            .as_array()
            .unwrap()
            .is_empty()
    );
}

#[test]
fn generate_writes_text_plan_to_file() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("plan.txt");
    let output = syllabus(
        home.path(),
        &[
            "generate",
            "--topic",
            "Rust",
            "--format",
            "text",
            "--output",
            out.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("Learning plan: Rust\n"));
    assert!(text.contains("== Learning path =="));
    assert!(text.contains("default content was used for"));
}

#[test]
fn generate_rejects_unknown_format() {
    let home = TempDir::new().unwrap();
    let output = syllabus(
        home.path(),
        &["generate", "--topic", "Rust", "--format", "hologram"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("preferred_format"));
}

#[test]
fn generate_fails_on_unparseable_config() {
    let home = TempDir::new().unwrap();
    std::fs::create_dir_all(home.path().join("syllabus")).unwrap();
    std::fs::write(home.path().join("syllabus/config.toml"), "not = [valid").unwrap();

    let output = syllabus(home.path(), &["generate", "--topic", "Rust"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to parse config file"));
}

// -----------------------------------------------------------------------
// batch
// -----------------------------------------------------------------------

#[test]
fn batch_reports_each_item_in_order() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("requests.json");
    let results = home.path().join("results.json");
    std::fs::write(
        &input,
        r#"[
            {"topic": "Rust", "background": "C", "preferred_format": "text"},
            {"topic": "", "background": "", "preferred_format": "video"},
            {"topic": "SQL", "background": "", "preferred_format": "audio"}
        ]"#,
    )
    .unwrap();

    let output = syllabus(
        home.path(),
        &[
            "batch",
            input.to_str().unwrap(),
            "--output",
            results.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("2/3 successful"), "{out}");
    assert!(out.contains("topic must not be empty"), "{out}");

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&results).unwrap()).unwrap();
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["success"], true);
    assert_eq!(items[1]["success"], false);
    assert_eq!(items[1]["error_kind"], "validation");
    assert_eq!(items[2]["topic"], "SQL");
    assert_eq!(items[2]["degraded"], true);
}

#[test]
fn batch_with_mistyped_element_still_runs_the_rest() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("requests.json");
    let results = home.path().join("results.json");
    std::fs::write(
        &input,
        r#"[
            {"topic": "Rust", "background": "C", "preferred_format": "text"},
            {"topic": 42, "background": "", "preferred_format": "video"},
            {"topic": "SQL", "background": "", "preferred_format": "audio"}
        ]"#,
    )
    .unwrap();

    let output = syllabus(
        home.path(),
        &[
            "batch",
            input.to_str().unwrap(),
            "--output",
            results.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("2/3 successful"), "{out}");
    assert!(out.contains("[1] failed"), "{out}");

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&results).unwrap()).unwrap();
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["success"], true);
    assert_eq!(items[1]["success"], false);
    assert_eq!(items[1]["error_kind"], "validation");
    assert_eq!(items[2]["success"], true);
    assert_eq!(items[2]["topic"], "SQL");
}

#[test]
fn batch_file_that_is_not_an_array_fails() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("requests.json");
    std::fs::write(&input, r#"{"topic": "Rust"}"#).unwrap();

    let output = syllabus(home.path(), &["batch", input.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("must contain a JSON array"));
}
