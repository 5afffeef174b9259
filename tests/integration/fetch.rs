use crate::common::helper_agent;
use agpkg_cli::cache::Cache;
use agpkg_cli::core::AgpkgError;
use agpkg_cli::fetcher::Fetcher;
use agpkg_cli::source::{SourceKind, SourceResolver};
use agpkg_cli::test_utils::{TestResponse, TestServer, init_test_logging, zip_archive};
use tempfile::TempDir;

fn fetcher(temp: &TempDir) -> Fetcher {
    Fetcher::new(Cache::new(temp.path().join("cache"))).unwrap()
}

fn agpkg_error(err: &anyhow::Error) -> &AgpkgError {
    err.downcast_ref::<AgpkgError>().unwrap_or_else(|| panic!("untyped error: {err:#}"))
}

#[tokio::test]
async fn test_remote_fetch_populates_and_reuses_cache() {
    init_test_logging(None);
    let archive = helper_agent().zip("helper-main");
    let server = TestServer::start(vec![("/helper.zip", TestResponse::ok(archive))]).await;
    let temp = TempDir::new().unwrap();
    let fetcher = fetcher(&temp);

    let source = SourceResolver::new().resolve(&server.url("/helper.zip")).unwrap();
    assert_eq!(source.kind, SourceKind::Url);

    let package = fetcher.fetch(&source).await.unwrap();
    assert_eq!(package.manifest.name, "helper");
    assert_eq!(package.files.len(), 2);
    assert!(package.root_path.ends_with("helper-main"));
    assert_eq!(server.hits(), 1);

    let again = fetcher.fetch(&source).await.unwrap();
    assert_eq!(again.files, package.files);
    assert_eq!(server.hits(), 1, "second fetch is served from the cache");

    assert_eq!(fetcher.cache().entries().unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleted_cache_content_triggers_download() {
    let archive = helper_agent().zip("");
    let server = TestServer::start(vec![("/helper.zip", TestResponse::ok(archive))]).await;
    let temp = TempDir::new().unwrap();
    let fetcher = fetcher(&temp);
    let source = SourceResolver::new().resolve(&server.url("/helper.zip")).unwrap();

    let package = fetcher.fetch(&source).await.unwrap();
    std::fs::remove_dir_all(&package.root_path).unwrap();

    fetcher.fetch(&source).await.unwrap();
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_declared_size_over_limit() {
    let server = TestServer::start(vec![("/big.zip", TestResponse::ok(vec![0u8; 4096]))]).await;
    let temp = TempDir::new().unwrap();
    let fetcher = fetcher(&temp).with_max_download_size(1024);
    let source = SourceResolver::new().resolve(&server.url("/big.zip")).unwrap();

    let err = fetcher.fetch(&source).await.unwrap_err();
    assert!(matches!(agpkg_error(&err), AgpkgError::TooLarge { limit: 1024, .. }));
    assert!(fetcher.cache().entries().unwrap().is_empty());
}

#[tokio::test]
async fn test_streamed_size_over_limit() {
    let server = TestServer::start(vec![("/big.zip", TestResponse::without_length(vec![0u8; 4096]))]).await;
    let temp = TempDir::new().unwrap();
    let fetcher = fetcher(&temp).with_max_download_size(1024);
    let resolver = SourceResolver::new();
    let source = resolver.resolve(&server.url("/big.zip")).unwrap();

    let err = fetcher.fetch(&source).await.unwrap_err();
    assert!(matches!(agpkg_error(&err), AgpkgError::TooLarge { .. }));
    assert!(!fetcher.cache().download_path(&resolver.cache_key(&source)).exists());
}

#[tokio::test]
async fn test_missing_remote_is_not_found() {
    let server = TestServer::start(Vec::new()).await;
    let temp = TempDir::new().unwrap();
    let source = SourceResolver::new().resolve(&server.url("/missing.zip")).unwrap();

    let err = fetcher(&temp).fetch(&source).await.unwrap_err();
    assert!(matches!(agpkg_error(&err), AgpkgError::NotFound { .. }));
}

#[tokio::test]
async fn test_server_error_is_network_error() {
    let server = TestServer::start(vec![("/agent.zip", TestResponse::status(500))]).await;
    let temp = TempDir::new().unwrap();
    let source = SourceResolver::new().resolve(&server.url("/agent.zip")).unwrap();

    let err = fetcher(&temp).fetch(&source).await.unwrap_err();
    match agpkg_error(&err) {
        AgpkgError::Network { reason, .. } => assert!(reason.contains("500"), "{reason}"),
        other => panic!("expected network error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_corrupt_archive_fails_extraction() {
    let server =
        TestServer::start(vec![("/agent.zip", TestResponse::ok(b"definitely not a zip".to_vec()))]).await;
    let temp = TempDir::new().unwrap();
    let source = SourceResolver::new().resolve(&server.url("/agent.zip")).unwrap();

    let err = fetcher(&temp).fetch(&source).await.unwrap_err();
    assert!(matches!(agpkg_error(&err), AgpkgError::ExtractionFailed { .. }));
}

#[tokio::test]
async fn test_archive_without_manifest() {
    let archive = zip_archive(&[("repo-main/", b""), ("repo-main/README.md", b"# readme")]);
    let server = TestServer::start(vec![("/agent.zip", TestResponse::ok(archive))]).await;
    let temp = TempDir::new().unwrap();
    let source = SourceResolver::new().resolve(&server.url("/agent.zip")).unwrap();

    let err = fetcher(&temp).fetch(&source).await.unwrap_err();
    assert!(matches!(agpkg_error(&err), AgpkgError::ManifestMissing { .. }));
}
