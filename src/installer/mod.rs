//! Installation of validated packages into a project.
//!
//! An installed agent lives at `<project>/agents/<name>/` and holds the package's
//! declared files plus a freshly encoded `agent.yaml`. It is also registered in the
//! project manifest through a [`ProjectStore`].
//!
//! # Install sequence
//!
//! 1. Validate the package. An invalid package is refused even with `force`.
//! 2. Pick the target name: the override if given, else the manifest name.
//! 3. Check the name, and unless `force`, that `agents/<name>` does not exist.
//! 4. Write every file and the re-encoded manifest into a staging directory
//!    `agents/.<name>.staging-<uuid>`.
//! 5. Load the project manifest, reject a name that is already registered (`force`
//!    does not apply here), add the registration and save.
//! 6. Move the staging directory into place. With `force` the previous directory is
//!    first moved aside and deleted once the new one is in place. If the move fails
//!    the previous project manifest and directory are restored.
//! 7. Unless skipped, install the declared dependencies for the agent's language.
//!
//! The staging directory is removed on any failure before step 6, so a failed
//! install leaves neither a partial `agents/<name>` nor a modified project manifest.
//! Dependency installation happens after the agent is in place and is not undone
//! when it fails.

use crate::constants::{AGENTS_DIR, PACKAGE_MANIFEST_FILE};
use crate::core::AgpkgError;
use crate::deps::{CommandDependencyInstaller, DependencyInstaller, PackageFamily};
use crate::manifest::{Package, PackageManifest};
use crate::project::{AgentRegistration, ProjectManifest, ProjectStore, YamlProjectStore};
use crate::utils::fs::{ensure_dir, remove_dir_if_exists};
use crate::utils::path_validation::is_safe_relative_path;
use crate::validator::{Validator, validate_agent_name};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options for [`Installer::install`].
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Install under this name instead of the manifest name
    pub name_override: Option<String>,
    /// Replace an existing agent of the same name
    pub force: bool,
    /// Do not run package managers for declared dependencies
    pub skip_dependency_install: bool,
}

/// What an install produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Name the agent was installed under
    pub name: String,
    /// Installed directory
    pub path: PathBuf,
    /// Number of package files written (excluding `agent.yaml`)
    pub files_written: usize,
    /// Whether an existing agent was replaced
    pub replaced: bool,
    /// Families whose dependencies were installed
    pub dependency_families: Vec<PackageFamily>,
}

/// Installs, removes and lists agents in one project.
#[derive(Debug, Clone)]
pub struct Installer<S = YamlProjectStore, D = CommandDependencyInstaller> {
    project_root: PathBuf,
    validator: Validator,
    store: S,
    dependencies: D,
}

impl Installer {
    /// Installer for `project_root` using `project.yaml` and the real package managers.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let dependencies = CommandDependencyInstaller::new(&project_root);
        Self::with_collaborators(project_root, YamlProjectStore, dependencies)
    }
}

impl<S: ProjectStore, D: DependencyInstaller> Installer<S, D> {
    /// Installer with explicit project store and dependency installer.
    pub fn with_collaborators(project_root: impl Into<PathBuf>, store: S, dependencies: D) -> Self {
        Self {
            project_root: project_root.into(),
            validator: Validator::default(),
            store,
            dependencies,
        }
    }

    /// Replaces the validator (for strict mode).
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// `<project>/agents`
    #[must_use]
    pub fn agents_dir(&self) -> PathBuf {
        self.project_root.join(AGENTS_DIR)
    }

    /// Installs `package` into the project.
    ///
    /// # Errors
    ///
    /// - [`AgpkgError::ValidationFailed`] when the package is invalid
    /// - [`AgpkgError::InvalidName`] for a target name unusable as a directory
    /// - [`AgpkgError::NameConflict`] when `agents/<name>` exists and `force` is not
    ///   set, or when the name is already registered in the project manifest
    /// - [`AgpkgError::ProjectManifestNotFound`] when the project has no manifest
    /// - [`AgpkgError::UnsupportedLanguage`] / [`AgpkgError::DependencyInstallFailed`]
    ///   from dependency installation
    pub fn install(&self, package: &Package, options: &InstallOptions) -> Result<InstallOutcome> {
        let manifest = &package.manifest;
        self.validator.validate(package).into_result(&manifest.name)?;

        let name = options
            .name_override
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&manifest.name)
            .to_string();
        validate_agent_name(&name)?;

        let target = self.agents_dir().join(&name);
        let replaced = target.exists();
        if replaced && !options.force {
            return Err(AgpkgError::NameConflict { name, path: target }.into());
        }

        let staging = self.agents_dir().join(format!(".{name}.staging-{}", uuid::Uuid::new_v4()));
        let staged = stage_package(package, &staging)
            .and_then(|files_written| self.register(&name, manifest).map(|p| (files_written, p)));
        let (files_written, previous) = match staged {
            Ok(result) => result,
            Err(e) => {
                discard(&staging);
                return Err(e);
            }
        };

        if let Err(e) = self.commit(&staging, &target, &name) {
            if let Err(restore) = self.store.save(&previous) {
                warn!("Failed to restore project manifest after failed install: {:#}", restore);
            }
            discard(&staging);
            return Err(e);
        }
        info!("Installed agent '{}' at {}", name, target.display());

        let dependency_families = if options.skip_dependency_install {
            Vec::new()
        } else {
            self.install_dependencies(manifest)?
        };

        Ok(InstallOutcome {
            name,
            path: target,
            files_written,
            replaced,
            dependency_families,
        })
    }

    /// Records the agent in the project manifest and returns the manifest as it was
    /// before the change. A registered name conflicts even under `force`.
    fn register(&self, name: &str, manifest: &PackageManifest) -> Result<ProjectManifest> {
        let mut project = self.store.load(&self.project_root)?;
        if project.find(name).is_some() {
            return Err(AgpkgError::NameConflict {
                name: name.to_string(),
                path: YamlProjectStore::manifest_path(&self.project_root),
            }
            .into());
        }

        let previous = project.clone();
        project.add(AgentRegistration {
            id: slugify(name),
            name: name.to_string(),
            description: manifest.description.clone(),
            types: Vec::new(),
        });

        self.store.save(&project)?;
        Ok(previous)
    }

    /// Moves the staging directory to `target`, replacing what is there.
    fn commit(&self, staging: &Path, target: &Path, name: &str) -> Result<()> {
        let backup = if target.exists() {
            let backup = self.agents_dir().join(format!(".{name}.backup-{}", uuid::Uuid::new_v4()));
            std::fs::rename(target, &backup).map_err(|e| AgpkgError::io("moving aside", target, &e))?;
            Some(backup)
        } else {
            None
        };

        if let Err(e) = std::fs::rename(staging, target) {
            if let Some(backup) = &backup {
                if let Err(restore) = std::fs::rename(backup, target) {
                    warn!("Failed to restore {} from {}: {}", target.display(), backup.display(), restore);
                }
            }
            return Err(AgpkgError::io("installing", target, &e).into());
        }

        if let Some(backup) = backup {
            if let Err(e) = std::fs::remove_dir_all(&backup) {
                warn!("Failed to remove previous installation {}: {}", backup.display(), e);
            }
        }
        Ok(())
    }

    fn install_dependencies(&self, manifest: &PackageManifest) -> Result<Vec<PackageFamily>> {
        let Some(deps) = manifest.dependencies.as_ref().filter(|deps| !deps.is_empty()) else {
            return Ok(Vec::new());
        };

        let family = PackageFamily::for_language(manifest.language()?);
        let packages = match family {
            PackageFamily::Npm => &deps.npm,
            PackageFamily::Pip => &deps.pip,
            PackageFamily::Go => &deps.go,
        };
        if packages.is_empty() {
            return Ok(Vec::new());
        }

        self.dependencies.install_dependencies(family, packages)?;
        Ok(vec![family])
    }

    /// Removes an installed agent and its registration.
    ///
    /// A missing directory is not an error. Returns whether a directory or a
    /// registration was removed.
    ///
    /// # Errors
    ///
    /// - [`AgpkgError::InvalidName`] for names that are not plain agent names
    /// - [`AgpkgError::ProjectManifestNotFound`] when the project has no manifest
    pub fn uninstall(&self, name: &str) -> Result<bool> {
        validate_agent_name(name)?;

        let dir = self.agents_dir().join(name);
        let had_dir = dir.is_dir();
        remove_dir_if_exists(&dir)?;

        let mut project = self.store.load(&self.project_root)?;
        let had_registration = project.remove(name);
        self.store.save(&project)?;

        debug!("Uninstalled '{}' (directory: {}, registration: {})", name, had_dir, had_registration);
        Ok(had_dir || had_registration)
    }

    /// Names of installed agents: subdirectories of `agents/` holding an `agent.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error if `agents/` exists but cannot be read.
    pub fn list_installed(&self) -> Result<Vec<String>> {
        let agents_dir = self.agents_dir();
        if !agents_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&agents_dir)
            .with_context(|| format!("Failed to read {}", agents_dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // Staging and backup directories
            if name.starts_with('.') {
                continue;
            }
            if entry.path().join(PACKAGE_MANIFEST_FILE).is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Re-reads the manifest of an installed agent.
    ///
    /// # Errors
    ///
    /// - [`AgpkgError::InvalidName`] for names that are not plain agent names
    /// - [`AgpkgError::ManifestMissing`] when the agent is not installed
    pub fn installed_manifest(&self, name: &str) -> Result<PackageManifest> {
        validate_agent_name(name)?;
        PackageManifest::load_from_dir(&self.agents_dir().join(name))
    }
}

/// Writes the package files and its manifest under `staging`.
fn stage_package(package: &Package, staging: &Path) -> Result<usize> {
    ensure_dir(staging)?;

    let mut written = 0;
    for (relative, content) in &package.files {
        if !is_safe_relative_path(relative) {
            warn!("Skipping unsafe package path: {}", relative);
            continue;
        }

        let path = staging.join(relative);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        std::fs::write(&path, content).map_err(|e| AgpkgError::io("writing", &path, &e))?;
        written += 1;
    }

    let manifest_path = staging.join(PACKAGE_MANIFEST_FILE);
    let encoded = package.manifest.to_yaml()?;
    std::fs::write(&manifest_path, encoded).map_err(|e| AgpkgError::io("writing", &manifest_path, &e))?;

    debug!("Staged {} files in {}", written, staging.display());
    Ok(written)
}

fn discard(staging: &Path) {
    if let Err(e) = remove_dir_if_exists(staging) {
        warn!("Failed to remove staging directory {}: {:#}", staging.display(), e);
    }
}

/// Registration id for an agent name: lowercase with spaces replaced by `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}
