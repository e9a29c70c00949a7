//! Integration tests for document execution
//!
//! These tests read YAML documents and run them end to end with real shell processes.

#![cfg(unix)]

use std::time::{Duration, Instant};

use hyperion_engine::{
    progress_channel, DocumentExecutor, DocumentParameters, DocumentReader, DocumentResult,
    EngineEvent, ExecutorConfig, ProgressReceiver,
};
use tempfile::TempDir;

const NAMES: &str = r#"
taskgroups:
  - title: names
    tasks:
      - type: shell
        tags: [first]
        code: echo "Gandalf"
        variable:
          name: name1
      - type: shell
        tags: [second]
        code: echo "Frodo"
        variable:
          name: name2
"#;

fn executor_in(dir: &TempDir) -> (DocumentExecutor, ProgressReceiver) {
    let (tx, rx) = progress_channel();
    let config = ExecutorConfig::default()
        .with_working_dir(dir.path())
        .with_cancel_grace(Duration::from_secs(1));
    (DocumentExecutor::with_config(config).with_progress(tx), rx)
}

fn variable_events(rx: &mut ProgressReceiver) -> Vec<(String, String)> {
    let mut values = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let EngineEvent::VariableSet { name, value, .. } = event {
            values.push((name, value));
        }
    }
    values
}

// =============================================================================
// Sequential groups and tag filtering
// =============================================================================

#[tokio::test]
async fn test_sequential_names() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (executor, mut rx) = executor_in(&dir);
    let document = DocumentReader::read_str(NAMES).expect("Failed to read document");

    let result = executor
        .execute(&document, &DocumentParameters::default())
        .await;

    assert!(result.success);
    assert_eq!(
        variable_events(&mut rx),
        vec![
            ("name1".to_string(), "Gandalf".to_string()),
            ("name2".to_string(), "Frodo".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_tag_filtered_names() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (executor, mut rx) = executor_in(&dir);
    let document = DocumentReader::read_str(NAMES).expect("Failed to read document");

    let parameters = DocumentParameters::new(["first"], 5);
    let result = executor.execute(&document, &parameters).await;

    assert!(result.success);
    let variables = document.task_groups[0].variables().await;
    assert_eq!(variables.len(), 1);
    assert_eq!(variables["name1"].value(), "Gandalf");
    assert_eq!(variable_events(&mut rx).len(), 1);
}

// =============================================================================
// "With" fan-out
// =============================================================================

#[tokio::test]
async fn test_with_fan_out_from_document() {
    let yaml = r#"
model:
  test1: hello world 1!
taskgroups:
  - title: fan-out
    tasks:
      - type: shell
        code: echo "{{ with.value }}"
        with:
          - hello world 1!
          - hello world 2!
          - hello world 3!
      - type: shell
        code: echo "{{ with.value }}"
        with:
          - "{{ model.attributes.test1 }}"
          - hello world 4!
"#;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (executor, mut rx) = executor_in(&dir);
    let document = DocumentReader::read_str(yaml).expect("Failed to read document");

    let result = executor
        .execute(&document, &DocumentParameters::default())
        .await;

    assert!(result.success);
    let values: Vec<String> = variable_events(&mut rx)
        .into_iter()
        .map(|(_, value)| value)
        .collect();
    assert_eq!(
        values,
        vec![
            "hello world 1!",
            "hello world 2!",
            "hello world 3!",
            "hello world 1!",
            "hello world 4!",
        ]
    );
}

// =============================================================================
// Timeout and aggregation
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_kills_processes_and_continues() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let yaml = r#"
taskgroups:
  - title: slow
    parallel: true
    tasks:
      - type: shell
        code: sleep 2; touch slow-marker
  - title: after
    tasks:
      - type: shell
        code: touch after-marker
"#;
    let (executor, _rx) = executor_in(&dir);
    let document = DocumentReader::read_str(yaml).expect("Failed to read document");

    let parameters = DocumentParameters::default().with_timeout(Duration::from_millis(300));
    let started = Instant::now();
    let result = executor.execute(&document, &parameters).await;

    assert!(!result.success);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(dir.path().join("after-marker").exists());

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!dir.path().join("slow-marker").exists());
}

#[tokio::test]
async fn test_matrix_runs_every_group() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let yaml = r#"
matrix:
  - title: one
    parameters:
      suffix: "1"
  - title: two
    parameters:
      suffix: "2"
taskgroups:
  - title: failing
    tasks:
      - type: shell
        code: exit 1
  - title: writing
    tasks:
      - type: write-file
        content: "matrix {{ matrix.suffix }}"
        destination: "out-{{ matrix.suffix }}.txt"
      - type: shell
        code: cat "{{ variables.default.value }}"
        variable:
          name: content
"#;
    let (executor, mut rx) = executor_in(&dir);
    let document = DocumentReader::read_str(yaml).expect("Failed to read document");

    let result = executor
        .execute(&document, &DocumentParameters::default())
        .await;

    assert!(!result.success);
    assert!(result.started <= result.finished);
    assert!(dir.path().join("out-1.txt").exists());
    assert!(dir.path().join("out-2.txt").exists());

    let contents: Vec<String> = variable_events(&mut rx)
        .into_iter()
        .filter(|(name, _)| name == "content")
        .map(|(_, value)| value)
        .collect();
    assert_eq!(contents, vec!["matrix 1", "matrix 2"]);
}

// =============================================================================
// Unreadable documents
// =============================================================================

#[tokio::test]
async fn test_unreadable_document_yields_failed_result() {
    let result = match DocumentReader::read_slice(b"taskgroups: [") {
        Ok(_) => panic!("document should not be readable"),
        Err(_) => DocumentResult::failed(),
    };

    assert!(!result.success);
    assert_eq!(result.started, result.finished);
}
