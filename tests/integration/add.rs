use crate::common::{TestProject, helper_agent};
use agpkg_cli::test_utils::AgentFixture;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_add_local_agent() {
    let project = TestProject::new();
    let source = project.local_agent(&helper_agent());

    project
        .cmd()
        .args(["add", &source])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed agent 'helper'"))
        .stdout(predicate::str::contains("Next steps"));

    let dir = project.agent_dir("helper");
    assert!(dir.join("agent.yaml").is_file());
    assert!(dir.join("index.ts").is_file());
    assert!(dir.join("lib/util.ts").is_file());

    let manifest = project.manifest();
    assert!(manifest.contains("name: test-project"), "unrelated keys are kept:\n{manifest}");
    assert!(manifest.contains("id: helper"));
    assert!(manifest.contains("Answers questions"));
}

#[test]
fn test_add_without_project_manifest_fails() {
    let project = TestProject::without_manifest();
    let source = project.local_agent(&helper_agent());

    project
        .cmd()
        .args(["add", &source])
        .assert()
        .failure()
        .stderr(predicate::str::contains("project.yaml"));

    assert!(!project.agent_dir("helper").exists());
}

#[test]
fn test_add_conflict_then_force() {
    let project = TestProject::new();
    let source = project.local_agent(&helper_agent());

    // A directory nobody registered
    helper_agent().file("stale.txt", "left over").write_to(&project.agent_dir("helper"));

    project
        .cmd()
        .args(["add", &source])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    assert!(project.agent_dir("helper").join("stale.txt").exists());

    project
        .cmd()
        .args(["add", &source, "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Replaced agent 'helper'"));
    assert!(!project.agent_dir("helper").join("stale.txt").exists());
    assert_eq!(project.manifest().matches("id: helper").count(), 1);
}

#[test]
fn test_force_does_not_override_registration() {
    let project = TestProject::new();
    let source = project.local_agent(&helper_agent());
    project.cmd().args(["add", &source]).assert().success();
    let before = project.manifest();

    project
        .cmd()
        .args(["add", &source, "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(project.manifest(), before);
    assert!(project.agent_dir("helper").join("index.ts").is_file());
}

#[test]
fn test_add_with_alternate_name() {
    let project = TestProject::new();
    let source = project.local_agent(&helper_agent());

    project.cmd().args(["add", &source, "--as", "assistant"]).assert().success();
    project.cmd().args(["add", &source, "second-helper"]).assert().success();

    assert!(project.agent_dir("assistant").join("index.ts").is_file());
    assert!(project.agent_dir("second-helper").join("index.ts").is_file());
    assert!(!project.agent_dir("helper").exists());

    let manifest = project.manifest();
    assert!(manifest.contains("id: assistant"));
    assert!(manifest.contains("id: second-helper"));
}

#[test]
fn test_add_rejects_invalid_agent() {
    let project = TestProject::new();
    let fixture = AgentFixture::new("sneaky").file("index.ts", "const out = eval(input);\n");
    let source = project.local_agent(&fixture);

    project
        .cmd()
        .args(["add", &source])
        .assert()
        .failure()
        .stderr(predicate::str::contains("eval"));

    assert!(!project.agent_dir("sneaky").exists());
    assert!(!project.manifest().contains("sneaky"));
}

#[test]
fn test_add_reports_skipped_dependencies() {
    let project = TestProject::new();
    let fixture = helper_agent().npm("lodash");
    let source = project.local_agent(&fixture);

    project
        .cmd()
        .args(["add", &source, "--no-install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("npm install lodash"));
}

#[test]
fn test_add_missing_local_source() {
    let project = TestProject::new();
    let missing = project.path().join("sources/nope").to_string_lossy().into_owned();

    project
        .cmd()
        .args(["add", &missing])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_add_malformed_source() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["add", "not a source"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Supported source formats"));
}
