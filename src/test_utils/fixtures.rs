//! Agent package fixtures.

use crate::manifest::{Dependencies, Package, PackageManifest};
use crate::source::SourceResolver;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Builder for a small agent package.
#[derive(Clone, Debug)]
pub struct AgentFixture {
    pub manifest: PackageManifest,
    pub contents: Vec<(String, Vec<u8>)>,
}

impl AgentFixture {
    /// A typescript agent named `name` with no files yet.
    pub fn new(name: &str) -> Self {
        Self {
            manifest: PackageManifest {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                description: format!("{name} test agent"),
                language_name: "typescript".to_string(),
                ..Default::default()
            },
            contents: Vec::new(),
        }
    }

    pub fn language(mut self, language: &str) -> Self {
        self.manifest.language_name = language.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.manifest.description = description.to_string();
        self
    }

    /// Adds a declared file with content.
    pub fn file(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.manifest.files.push(path.to_string());
        self.contents.push((path.to_string(), content.as_ref().to_vec()));
        self
    }

    /// Declares a file in the manifest without providing its content.
    pub fn declare(mut self, path: &str) -> Self {
        self.manifest.files.push(path.to_string());
        self
    }

    pub fn npm(mut self, package: &str) -> Self {
        self.dependencies().npm.push(package.to_string());
        self
    }

    pub fn pip(mut self, package: &str) -> Self {
        self.dependencies().pip.push(package.to_string());
        self
    }

    fn dependencies(&mut self) -> &mut Dependencies {
        self.manifest.dependencies.get_or_insert_with(Dependencies::default)
    }

    /// Writes `agent.yaml` and every file under `dir`.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        fs::create_dir_all(dir).expect("create agent dir");
        fs::write(dir.join("agent.yaml"), self.manifest.to_yaml().expect("encode manifest"))
            .expect("write agent.yaml");
        for (path, content) in &self.contents {
            let target = dir.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).expect("create parent dir");
            }
            fs::write(&target, content).expect("write agent file");
        }
        dir.to_path_buf()
    }

    /// In-memory package attributed to a local source.
    pub fn package(&self) -> Package {
        let source = SourceResolver::new()
            .resolve(&format!("./{}", self.manifest.name))
            .expect("resolve local source");
        Package {
            source,
            manifest: self.manifest.clone(),
            files: self.contents.iter().cloned().collect::<BTreeMap<_, _>>(),
            root_path: PathBuf::from(&self.manifest.name),
            fetched_at: Utc::now(),
        }
    }

    /// Zip archive of the package with every entry under `prefix` (may be empty).
    pub fn zip(&self, prefix: &str) -> Vec<u8> {
        let join = |name: &str| {
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}/{name}", prefix.trim_end_matches('/'))
            }
        };

        let manifest = self.manifest.to_yaml().expect("encode manifest");
        let mut entries = vec![(join("agent.yaml"), manifest.into_bytes())];
        entries.extend(self.contents.iter().map(|(path, content)| (join(path), content.clone())));

        let borrowed: Vec<(&str, &[u8])> =
            entries.iter().map(|(name, content)| (name.as_str(), content.as_slice())).collect();
        zip_archive(&borrowed)
    }
}

/// Writes a typescript agent called `name` with the given files into `dir`.
pub fn write_agent(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    files
        .iter()
        .fold(AgentFixture::new(name), |fixture, (path, content)| fixture.file(path, content))
        .write_to(dir)
}

/// Builds an in-memory zip archive from `(name, content)` pairs.
///
/// Names are written as given, including unsafe ones, so extraction can be tested
/// against hostile archives.
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).expect("add zip directory");
        } else {
            writer.start_file(*name, options).expect("start zip entry");
            writer.write_all(content).expect("write zip entry");
        }
    }
    writer.finish().expect("finish zip").into_inner()
}
