use crate::common::{TestProject, helper_agent};
use agpkg_cli::test_utils::{AgentFixture, TestResponse, TestServer};
use predicates::prelude::*;

#[test]
fn test_validate_valid_agent() {
    let project = TestProject::without_manifest();
    let source = project.local_agent(&helper_agent());

    project
        .cmd()
        .args(["validate", &source])
        .assert()
        .success()
        .stdout(predicate::str::contains("helper v1.0.0 is valid"));
}

#[test]
fn test_validate_invalid_agent_lists_problems() {
    let project = TestProject::without_manifest();
    let fixture = AgentFixture::new("Bad Name")
        .file("run.sh", "rm -rf / --no-preserve-root\n")
        .npm("event-stream");
    let source = project.local_agent(&fixture);

    project
        .cmd()
        .args(["validate", &source])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("name:"))
        .stdout(predicate::str::contains("dependencies: potentially malicious NPM package: event-stream"));
}

#[test]
fn test_validate_strict_rejects_unknown_extensions() {
    let project = TestProject::without_manifest();
    let fixture = helper_agent().file("notes.csv", "a,b\n1,2\n");
    let source = project.local_agent(&fixture);

    project.cmd().args(["validate", &source]).assert().success();
    project
        .cmd()
        .args(["validate", &source, "--strict"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("notes.csv"));
}

#[test]
fn test_validate_json_report() {
    let project = TestProject::without_manifest();
    let source = project.local_agent(&helper_agent());

    let output = project.cmd().args(["validate", &source, "--json"]).output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], true);
    assert_eq!(report["errors"].as_array().unwrap().len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_validate_rejects_plain_http_archive() {
    let archive = helper_agent().zip("");
    let server = TestServer::start(vec![("/helper.zip", TestResponse::ok(archive))]).await;
    let project = TestProject::without_manifest();

    project
        .cmd()
        .args(["validate", &server.url("/helper.zip")])
        .assert()
        .failure()
        .stdout(predicate::str::contains("only HTTPS URLs are allowed"));
}
