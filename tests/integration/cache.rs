use crate::common::{TestProject, helper_agent};
use agpkg_cli::test_utils::{TestResponse, TestServer};
use predicates::prelude::*;

#[test]
fn test_cache_info_on_empty_cache() {
    let project = TestProject::without_manifest();

    project
        .cmd()
        .args(["cache", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries: 0"))
        .stdout(predicate::str::contains("0 B"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cache_info_and_clean_after_remote_fetch() {
    let archive = helper_agent().zip("helper-main");
    let server = TestServer::start(vec![("/helper.zip", TestResponse::ok(archive))]).await;
    let project = TestProject::without_manifest();
    let url = server.url("/helper.zip");

    // Validation fails on plain HTTP but the package is still fetched and cached
    project.cmd().args(["validate", &url]).assert().failure();

    project
        .cmd()
        .arg("cache")
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries: 1"))
        .stdout(predicate::str::contains(url.as_str()));

    project
        .cmd()
        .args(["cache", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 cache entries"));

    project
        .cmd()
        .args(["cache", "clean", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 cache entries"));

    assert_eq!(std::fs::read_dir(project.cache_dir()).unwrap().count(), 0);
}
