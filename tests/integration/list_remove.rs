use crate::common::{TestProject, helper_agent};
use agpkg_cli::test_utils::AgentFixture;
use predicates::prelude::*;

#[test]
fn test_list_empty_project() {
    let project = TestProject::new();

    project
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No agents installed"));
}

#[test]
fn test_list_shows_installed_agents() {
    let project = TestProject::new();
    let helper = project.local_agent(&helper_agent());
    let summarizer = project.local_agent(
        &AgentFixture::new("summarizer")
            .language("python")
            .file("main.py", "def run():\n    return 'summary'\n"),
    );

    project.cmd().args(["add", &helper]).assert().success();
    project.cmd().args(["add", &summarizer, "--no-install"]).assert().success();

    project
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("helper"))
        .stdout(predicate::str::contains("[typescript]"))
        .stdout(predicate::str::contains("summarizer"))
        .stdout(predicate::str::contains("[python]"));

    let output = project.cmd().args(["list", "--names-only"]).output().unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), "helper\nsummarizer\n");
}

#[test]
fn test_remove_agent() {
    let project = TestProject::new();
    let source = project.local_agent(&helper_agent());
    project.cmd().args(["add", &source]).assert().success();

    project
        .cmd()
        .args(["remove", "helper"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed agent 'helper'"));

    assert!(!project.agent_dir("helper").exists());
    assert!(!project.manifest().contains("id: helper"));

    project
        .cmd()
        .args(["rm", "helper"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is not installed"));
}

#[test]
fn test_remove_rejects_path_names() {
    let project = TestProject::new();

    let source = project.local_agent(&helper_agent());
    project.cmd().args(["add", &source]).assert().success();

    for name in ["../project", "..", "."] {
        project
            .cmd()
            .args(["uninstall", name])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid agent name"));
    }

    assert!(project.manifest_path().is_file());
    assert!(project.agent_dir("helper").join("index.ts").is_file());
}
