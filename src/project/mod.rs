//! Project manifest store.
//!
//! The installer records each installed agent in the project's manifest
//! (`project.yaml` at the project root). It only ever appends or removes a single
//! registration by name; everything else in the file belongs to other tools and is
//! carried through load and save untouched.
//!
//! ```yaml
//! project_id: proj_123
//! name: my-project
//! agents:
//!   - id: vector-store
//!     name: vector-store
//!     description: Vector memory for agents
//!     types: []
//! ```
//!
//! The store is a trait so callers can substitute their own persistence;
//! [`YamlProjectStore`] is the file-backed default.

use crate::constants::PROJECT_MANIFEST_FILE;
use crate::core::AgpkgError;
use crate::utils::fs::atomic_write;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One agent registered in the project manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRegistration {
    /// Stable identifier derived from the name
    pub id: String,
    /// Agent name (the directory under `agents/`)
    pub name: String,
    /// Description copied from the package manifest
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Agent types; left empty by the installer
    #[serde(default)]
    pub types: Vec<String>,
}

/// The project manifest as seen by this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    /// Keys this crate does not interpret, preserved in their original order
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
    /// Registered agents
    #[serde(default)]
    pub agents: Vec<AgentRegistration>,
    /// Project root the manifest was loaded from
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl ProjectManifest {
    /// Empty manifest for `project_root`.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Default::default()
        }
    }

    /// Registration for `name`, if any.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&AgentRegistration> {
        self.agents.iter().find(|agent| agent.name == name)
    }

    /// Appends a registration.
    pub fn add(&mut self, registration: AgentRegistration) {
        self.agents.push(registration);
    }

    /// Drops every registration named `name`; returns whether any was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.agents.len();
        self.agents.retain(|agent| agent.name != name);
        self.agents.len() != before
    }
}

/// Loads and persists project manifests.
pub trait ProjectStore: Send + Sync {
    /// Loads the manifest of the project at `project_root`.
    ///
    /// # Errors
    ///
    /// [`AgpkgError::ProjectManifestNotFound`] when the project has no manifest.
    fn load(&self, project_root: &Path) -> Result<ProjectManifest>;

    /// Persists `manifest` back to its project.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be written.
    fn save(&self, manifest: &ProjectManifest) -> Result<()>;
}

/// File-backed store over `<project_root>/project.yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlProjectStore;

impl YamlProjectStore {
    /// Path of the manifest file for a project.
    #[must_use]
    pub fn manifest_path(project_root: &Path) -> PathBuf {
        project_root.join(PROJECT_MANIFEST_FILE)
    }

    /// Whether `project_root` has a manifest file.
    #[must_use]
    pub fn exists(project_root: &Path) -> bool {
        Self::manifest_path(project_root).is_file()
    }
}

impl ProjectStore for YamlProjectStore {
    fn load(&self, project_root: &Path) -> Result<ProjectManifest> {
        let path = Self::manifest_path(project_root);
        if !path.is_file() {
            return Err(AgpkgError::ProjectManifestNotFound { path }.into());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read project manifest: {}", path.display()))?;

        let mut manifest: ProjectManifest = if content.trim().is_empty() {
            ProjectManifest::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| AgpkgError::ProjectManifestParse {
                path: path.clone(),
                reason: e.to_string(),
            })?
        };
        manifest.project_root = project_root.to_path_buf();

        debug!("Loaded project manifest with {} agents", manifest.agents.len());
        Ok(manifest)
    }

    fn save(&self, manifest: &ProjectManifest) -> Result<()> {
        let path = Self::manifest_path(&manifest.project_root);
        let content = serde_yaml::to_string(manifest).context("Failed to serialize project manifest")?;
        atomic_write(&path, content.as_bytes())
            .with_context(|| format!("Failed to write project manifest: {}", path.display()))?;
        debug!("Saved project manifest {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registration(name: &str) -> AgentRegistration {
        AgentRegistration {
            id: name.to_string(),
            name: name.to_string(),
            description: format!("{name} agent"),
            types: Vec::new(),
        }
    }

    #[test]
    fn test_load_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let err = YamlProjectStore.load(temp.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AgpkgError>(),
            Some(AgpkgError::ProjectManifestNotFound { .. })
        ));
        assert!(!YamlProjectStore::exists(temp.path()));
    }

    #[test]
    fn test_load_invalid_manifest() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("project.yaml"), "agents: [unclosed").unwrap();

        let err = YamlProjectStore.load(temp.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AgpkgError>(),
            Some(AgpkgError::ProjectManifestParse { .. })
        ));
    }

    #[test]
    fn test_save_preserves_unrelated_keys() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("project.yaml"),
            "project_id: proj_123\nname: demo\ndeployment:\n  resources:\n    memory: 1Gi\n",
        )
        .unwrap();

        let mut manifest = YamlProjectStore.load(temp.path()).unwrap();
        assert!(manifest.agents.is_empty());
        manifest.add(registration("helper"));
        YamlProjectStore.save(&manifest).unwrap();

        let content = std::fs::read_to_string(temp.path().join("project.yaml")).unwrap();
        assert!(content.contains("project_id: proj_123"));
        assert!(content.contains("memory: 1Gi"));

        let reloaded = YamlProjectStore.load(temp.path()).unwrap();
        assert_eq!(reloaded.agents, vec![registration("helper")]);
        assert_eq!(reloaded.extra, manifest.extra);
    }

    #[test]
    fn test_find_and_remove() {
        let mut manifest = ProjectManifest::new("/project");
        manifest.add(registration("a"));
        manifest.add(registration("b"));

        assert!(manifest.find("a").is_some());
        assert!(manifest.remove("a"));
        assert!(!manifest.remove("a"));
        assert!(manifest.find("a").is_none());
        assert_eq!(manifest.agents.len(), 1);
    }

    #[test]
    fn test_empty_file_is_empty_manifest() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("project.yaml"), "").unwrap();

        let manifest = YamlProjectStore.load(temp.path()).unwrap();
        assert!(manifest.agents.is_empty());
        assert_eq!(manifest.project_root, temp.path());
    }
}
