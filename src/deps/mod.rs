//! Per-language dependency installation.
//!
//! After an agent is installed its declared dependencies are handed to a
//! [`DependencyInstaller`], one call per package family. The default
//! [`CommandDependencyInstaller`] runs the ecosystem's package manager inside the
//! project root:
//!
//! | Family | Command                     | Requires       |
//! |--------|-----------------------------|----------------|
//! | npm    | `npm install <pkgs...>`     | `package.json` |
//! | pip    | `pip install <pkgs...>`     |                |
//! | go     | `go get <pkg>` per package  | `go.mod`       |
//!
//! Commands are blocking and run without a timeout.

use crate::core::AgpkgError;
use crate::manifest::Language;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Package ecosystem a dependency list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageFamily {
    /// npm (typescript, javascript)
    Npm,
    /// pip (python)
    Pip,
    /// Go modules
    Go,
}

impl PackageFamily {
    /// Family used to install dependencies for `language`.
    #[must_use]
    pub const fn for_language(language: Language) -> Self {
        match language {
            Language::TypeScript | Language::JavaScript => Self::Npm,
            Language::Python => Self::Pip,
            Language::Go => Self::Go,
        }
    }

    /// Lowercase family name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Pip => "pip",
            Self::Go => "go",
        }
    }

    /// Binaries that can install this family, in order of preference.
    const fn tools(self) -> &'static [&'static str] {
        match self {
            Self::Npm => &["npm"],
            Self::Pip => &["pip", "pip3"],
            Self::Go => &["go"],
        }
    }

    /// Project file that must exist before installing, if any.
    const fn required_file(self) -> Option<&'static str> {
        match self {
            Self::Npm => Some("package.json"),
            Self::Pip => None,
            Self::Go => Some("go.mod"),
        }
    }
}

impl fmt::Display for PackageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs third-party packages an agent depends on.
pub trait DependencyInstaller: Send + Sync {
    /// Installs `packages` with the package manager for `family`.
    ///
    /// # Errors
    ///
    /// - [`AgpkgError::ToolNotFound`] when the package manager is not installed
    /// - [`AgpkgError::DependencyInstallFailed`] when it fails
    fn install_dependencies(&self, family: PackageFamily, packages: &[String]) -> Result<()>;
}

/// Runs the real package manager binaries in a project directory.
#[derive(Debug, Clone)]
pub struct CommandDependencyInstaller {
    project_root: PathBuf,
}

impl CommandDependencyInstaller {
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    fn locate_tool(family: PackageFamily) -> Result<PathBuf, AgpkgError> {
        family
            .tools()
            .iter()
            .find_map(|tool| which::which(tool).ok())
            .ok_or_else(|| AgpkgError::ToolNotFound {
                tool: family.as_str().to_string(),
            })
    }

    fn run(&self, family: PackageFamily, tool: &Path, args: &[&str], packages: &[String]) -> Result<()> {
        debug!("Running {} {} in {}", tool.display(), args.join(" "), self.project_root.display());

        let output = Command::new(tool)
            .args(args)
            .current_dir(&self.project_root)
            .output()
            .with_context(|| format!("Failed to execute {}", tool.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgpkgError::DependencyInstallFailed {
                family: family.to_string(),
                packages: packages.to_vec(),
                reason: format!("exit code {:?}: {}", output.status.code(), stderr.trim()),
            }
            .into());
        }

        Ok(())
    }
}

impl DependencyInstaller for CommandDependencyInstaller {
    fn install_dependencies(&self, family: PackageFamily, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }

        if let Some(file) = family.required_file() {
            if !self.project_root.join(file).is_file() {
                return Err(AgpkgError::DependencyInstallFailed {
                    family: family.to_string(),
                    packages: packages.to_vec(),
                    reason: format!("{file} not found in project root"),
                }
                .into());
            }
        }

        let tool = Self::locate_tool(family)?;
        info!("Installing {} {} dependencies", packages.len(), family);

        match family {
            PackageFamily::Npm | PackageFamily::Pip => {
                let mut args = vec!["install"];
                args.extend(packages.iter().map(String::as_str));
                self.run(family, &tool, &args, packages)
            }
            PackageFamily::Go => {
                for package in packages {
                    self.run(family, &tool, &["get", package.as_str()], packages)?;
                }
                Ok(())
            }
        }
    }
}
