//! Shared helpers for driving the CLI against a temporary project.

use agpkg_cli::test_utils::AgentFixture;
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary project with its own config and cache directory.
pub struct TestProject {
    temp: TempDir,
}

impl TestProject {
    /// Creates a project containing an empty `project.yaml`.
    pub fn new() -> Self {
        let project = Self::without_manifest();
        fs::write(project.manifest_path(), "name: test-project\nagents: []\n").unwrap();
        project
    }

    /// Creates the directory layout but no `project.yaml`.
    pub fn without_manifest() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("project")).unwrap();
        fs::create_dir_all(temp.path().join("sources")).unwrap();
        let config = format!(
            "cache_dir = \"{}\"\n",
            temp.path().join("cache").to_string_lossy().replace('\\', "/")
        );
        fs::write(temp.path().join("config.toml"), config).unwrap();
        Self { temp }
    }

    pub fn project_dir(&self) -> PathBuf {
        self.temp.path().join("project")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project_dir().join("project.yaml")
    }

    pub fn manifest(&self) -> String {
        fs::read_to_string(self.manifest_path()).unwrap()
    }

    pub fn agent_dir(&self, name: &str) -> PathBuf {
        self.project_dir().join("agents").join(name)
    }

    /// Writes a local agent source and returns its absolute path as a string.
    pub fn local_agent(&self, fixture: &AgentFixture) -> String {
        let dir = self.temp.path().join("sources").join(&fixture.manifest.name);
        fixture.write_to(&dir).to_string_lossy().into_owned()
    }

    /// `agpkg` preconfigured with this project's config and project directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("agpkg").unwrap();
        cmd.arg("--config")
            .arg(self.temp.path().join("config.toml"))
            .arg("--project-dir")
            .arg(self.project_dir())
            .arg("--no-progress")
            .env_remove("AGPKG_CACHE_DIR")
            .env_remove("AGPKG_CATALOG_URL")
            .env_remove("AGPKG_CONFIG")
            .env("NO_COLOR", "1");
        cmd
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

/// A small, valid typescript agent.
pub fn helper_agent() -> AgentFixture {
    AgentFixture::new("helper")
        .description("Answers questions")
        .file("index.ts", "export function run(): string {\n  return 'ok';\n}\n")
        .file("lib/util.ts", "export const VERSION = 1;\n")
}
