//! Package validation.
//!
//! [`Validator::validate`] never fails. It runs every check against a fetched
//! [`Package`] and collects all problems into a [`ValidationReport`], so a user sees
//! everything wrong with a package at once. Callers must check
//! [`ValidationReport::valid`]; the installer refuses invalid packages regardless of
//! `--force`.
//!
//! # Checks
//!
//! - **Manifest structure**: name (required, at most 50 characters, `[a-zA-Z0-9._-]`),
//!   version, description, a supported language, a non-empty file list, and declared
//!   paths that are relative and free of `..`.
//! - **File content**: every file actually present in the package is checked for size
//!   (10 MiB), denied executable extensions, and in strict mode an extension
//!   allow-list.
//! - **Dangerous constructs**: `eval(`, `exec(`, `system(`, `shell_exec`, `passthru`,
//!   `base64_decode`, `document.write(`, `innerHTML=` (case-insensitive).
//! - **Hardcoded secrets**: generic key/secret/password/token assignments and
//!   vendor-shaped tokens.
//! - **Source origin**: URL sources must use `https://`.
//! - **Dependencies**: npm and pip names are checked against known-malicious packages.
//!
//! Every error message is prefixed with the area it concerns (`name:`, `files:`,
//! `source:`, `dependencies:`).
//!
//! # Example
//!
//! ```rust,no_run
//! use agpkg_cli::validator::Validator;
//! # fn check(package: &agpkg_cli::manifest::Package) {
//! let report = Validator::new(false).validate(package);
//! if !report.valid {
//!     for error in &report.errors {
//!         eprintln!("  - {error}");
//!     }
//! }
//! # }
//! ```

use crate::constants::{MAX_AGENT_NAME_LENGTH, MAX_FILE_SIZE};
use crate::core::AgpkgError;
use crate::manifest::{Dependencies, Language, Package, PackageManifest};
use crate::source::SourceKind;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;

/// Extensions permitted in strict mode.
const ALLOWED_EXTENSIONS: &[&str] =
    &["ts", "js", "py", "go", "yaml", "yml", "json", "md", "txt", "toml", "sh", "bat"];

/// Extensions rejected in every mode.
const DENIED_EXTENSIONS: &[&str] = &["exe", "dll", "so", "bin", "app"];

const MALICIOUS_NPM: &[&str] = &["event-stream", "eslint-scope", "getcookies"];
const MALICIOUS_PIP: &[&str] = &["python3-dateutil", "python3-urllib3", "jeIlyfish"];

static NAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").ok());

static DANGEROUS_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    compile(&[
        (r"(?i)eval\s*\(", "potentially dangerous eval() usage"),
        (r"(?i)exec\s*\(", "potentially dangerous exec() usage"),
        (r"(?i)system\s*\(", "potentially dangerous system() usage"),
        (r"(?i)shell_exec", "potentially dangerous shell execution"),
        (r"(?i)passthru", "potentially dangerous command execution"),
        (r"(?i)base64_decode", "potentially obfuscated code"),
        (r"(?i)document\.write\s*\(", "potentially dangerous DOM manipulation"),
        (r"(?i)innerHTML\s*=", "potentially dangerous HTML injection"),
    ])
});

static SECRET_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    compile(&[
        (r#"(?i)(api[_-]?key|apikey)\s*[:=]\s*["']?[a-zA-Z0-9]{20,}"#, "potential API key"),
        (r#"(?i)(secret|password|passwd|pwd)\s*[:=]\s*["']?[a-zA-Z0-9]{8,}"#, "potential hardcoded secret"),
        (r#"(?i)token\s*[:=]\s*["']?[a-zA-Z0-9]{20,}"#, "potential access token"),
        (r"sk-[a-zA-Z0-9]{20,}", "potential OpenAI API key"),
        (r"ghp_[a-zA-Z0-9]{36}", "potential GitHub personal access token"),
    ])
});

fn compile(patterns: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    patterns
        .iter()
        .filter_map(|(pattern, message)| Regex::new(pattern).ok().map(|re| (re, *message)))
        .collect()
}

/// Outcome of validating one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// `true` iff `errors` is empty
    pub valid: bool,
    /// Every problem found, in check order
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Converts an invalid report into [`AgpkgError::ValidationFailed`].
    ///
    /// # Errors
    ///
    /// Returns the error when the report is not valid.
    pub fn into_result(self, name: &str) -> Result<(), AgpkgError> {
        if self.valid {
            Ok(())
        } else {
            Err(AgpkgError::ValidationFailed {
                name: name.to_string(),
                issues: self.errors,
            })
        }
    }
}

/// Structural, content and security checks for fetched packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    strict: bool,
}

impl Validator {
    /// Creates a validator. `strict` enables the extension allow-list.
    #[must_use]
    pub const fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Runs every check and reports all problems found.
    #[must_use]
    pub fn validate(&self, package: &Package) -> ValidationReport {
        let mut errors = Vec::new();

        check_manifest(&package.manifest, &mut errors);
        self.check_files(package, &mut errors);
        check_source(package, &mut errors);
        if let Some(deps) = &package.manifest.dependencies {
            check_dependencies(deps, &mut errors);
        }

        ValidationReport::from_errors(errors)
    }

    fn check_files(&self, package: &Package, errors: &mut Vec<String>) {
        if package.files.is_empty() {
            errors.push("files: agent package must contain files".to_string());
            return;
        }

        for (name, content) in &package.files {
            if content.len() > MAX_FILE_SIZE {
                errors.push(format!(
                    "files: file too large: {name} ({} bytes, max {MAX_FILE_SIZE})",
                    content.len()
                ));
            }

            if let Some(ext) = extension(name) {
                if DENIED_EXTENSIONS.contains(&ext.as_str()) {
                    errors.push(format!("files: dangerous file extension not allowed: {name}"));
                } else if self.strict && !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                    errors.push(format!("files: file extension not allowed: {name}"));
                }
            }

            check_content(name, content, errors);
        }
    }
}

/// Checks a name an agent is about to be installed under.
///
/// # Errors
///
/// [`AgpkgError::InvalidName`] when the name is empty, has characters outside
/// `[a-zA-Z0-9._-]`, or consists only of dots (`.` and `..` name directories
/// outside the agent's own).
pub fn validate_agent_name(name: &str) -> Result<(), AgpkgError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(AgpkgError::InvalidName {
            name: name.to_string(),
        })
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.chars().all(|c| c == '.') && NAME_PATTERN.as_ref().is_some_and(|re| re.is_match(name))
}

fn check_manifest(manifest: &PackageManifest, errors: &mut Vec<String>) {
    if manifest.name.is_empty() {
        errors.push("name: agent name is required".to_string());
    } else {
        if manifest.name.chars().count() > MAX_AGENT_NAME_LENGTH {
            errors.push(format!(
                "name: agent name too long (max {MAX_AGENT_NAME_LENGTH} characters)"
            ));
        }
        if !is_valid_name(&manifest.name) {
            errors.push(
                "name: agent name contains invalid characters (only alphanumeric, dots, underscores, and hyphens allowed)"
                    .to_string(),
            );
        }
    }

    if manifest.version.is_empty() {
        errors.push("version: agent version is required".to_string());
    }

    if manifest.description.is_empty() {
        errors.push("description: agent description is required".to_string());
    }

    if manifest.language_name.is_empty() {
        errors.push("language: agent language is required".to_string());
    } else if manifest.language().is_err() {
        let supported: Vec<&str> = Language::ALL.iter().map(|l| l.as_str()).collect();
        errors.push(format!(
            "language: unsupported language: {} (supported: {})",
            manifest.language_name,
            supported.join(", ")
        ));
    }

    if manifest.files.is_empty() {
        errors.push("files: agent must specify at least one file".to_string());
    }

    for file in &manifest.files {
        if file.contains("..") {
            errors.push(format!("files: file path contains directory traversal: {file}"));
        }
        if Path::new(file).is_absolute() || file.starts_with('/') || file.starts_with('\\') {
            errors.push(format!("files: file path must be relative: {file}"));
        }
    }
}

fn check_content(name: &str, content: &[u8], errors: &mut Vec<String>) {
    let text = String::from_utf8_lossy(content);

    for (pattern, message) in DANGEROUS_PATTERNS.iter() {
        if pattern.is_match(&text) {
            errors.push(format!("files: suspicious content in {name}: {message}"));
        }
    }

    for (pattern, message) in SECRET_PATTERNS.iter() {
        if pattern.is_match(&text) {
            errors.push(format!("files: potential hardcoded secret in {name}: {message}"));
        }
    }
}

fn check_source(package: &Package, errors: &mut Vec<String>) {
    if package.source.kind == SourceKind::Url && !package.source.location.starts_with("https://") {
        errors.push("source: only HTTPS URLs are allowed for security".to_string());
    }
}

fn check_dependencies(deps: &Dependencies, errors: &mut Vec<String>) {
    for name in deps.npm.iter().filter(|n| is_listed(n, MALICIOUS_NPM)) {
        errors.push(format!("dependencies: potentially malicious NPM package: {name}"));
    }
    for name in deps.pip.iter().filter(|n| is_listed(n, MALICIOUS_PIP)) {
        errors.push(format!("dependencies: potentially malicious Python package: {name}"));
    }
}

fn is_listed(name: &str, list: &[&str]) -> bool {
    list.iter().any(|entry| entry.eq_ignore_ascii_case(name))
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceResolver;
    use crate::test_utils::AgentFixture;

    fn validate(fixture: &AgentFixture) -> ValidationReport {
        Validator::new(false).validate(&fixture.package())
    }

    fn has_error(report: &ValidationReport, needle: &str) -> bool {
        report.errors.iter().any(|e| e.contains(needle))
    }

    #[test]
    fn test_valid_package() {
        let report = validate(&AgentFixture::new("my-agent").file("index.ts", "export const x = 1;"));
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_missing_name_is_reported() {
        let report = validate(&AgentFixture::new("").file("index.ts", "export {};"));
        assert!(!report.valid);
        assert!(has_error(&report, "name: agent name is required"));
    }

    #[test]
    fn test_unsupported_language() {
        let report = validate(&AgentFixture::new("a").language("rust").file("index.ts", "x"));
        assert!(!report.valid);
        assert!(has_error(&report, "unsupported language: rust"));
    }

    #[test]
    fn test_language_is_case_insensitive() {
        let report = validate(&AgentFixture::new("a").language("Python").file("main.py", "x = 1"));
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn test_errors_accumulate() {
        let mut fixture = AgentFixture::new("bad name!").file("index.ts", "eval(input)");
        fixture.manifest.version.clear();
        fixture.manifest.description.clear();

        let report = validate(&fixture);
        assert!(has_error(&report, "invalid characters"));
        assert!(has_error(&report, "version: agent version is required"));
        assert!(has_error(&report, "description: agent description is required"));
        assert!(has_error(&report, "eval()"));
        assert_eq!(report.errors.len(), 4);
    }

    #[test]
    fn test_name_length_limit() {
        let long = "a".repeat(MAX_AGENT_NAME_LENGTH + 1);
        assert!(has_error(&validate(&AgentFixture::new(&long).file("a.ts", "x")), "too long"));

        let max = "a".repeat(MAX_AGENT_NAME_LENGTH);
        assert!(validate(&AgentFixture::new(&max).file("a.ts", "x")).valid);
    }

    #[test]
    fn test_traversal_and_absolute_declared_paths() {
        let report = validate(
            &AgentFixture::new("a").file("index.ts", "x").declare("../escape.ts").declare("/etc/passwd"),
        );
        assert!(has_error(&report, "directory traversal: ../escape.ts"));
        assert!(has_error(&report, "must be relative: /etc/passwd"));
    }

    #[test]
    fn test_empty_file_list() {
        let report = validate(&AgentFixture::new("a"));
        assert!(has_error(&report, "at least one file"));
        assert!(has_error(&report, "must contain files"));
    }

    #[test]
    fn test_oversized_file() {
        let big = vec![b'a'; MAX_FILE_SIZE + 1];
        let report = validate(&AgentFixture::new("a").file("data.txt", big));
        assert!(has_error(&report, "file too large: data.txt"));
    }

    #[test]
    fn test_denied_extension_in_any_mode() {
        let report = validate(&AgentFixture::new("a").file("index.ts", "x").file("tool.EXE", "MZ"));
        assert!(has_error(&report, "dangerous file extension not allowed: tool.EXE"));
    }

    #[test]
    fn test_allow_list_only_in_strict_mode() {
        let fixture = AgentFixture::new("a").file("index.ts", "x").file("logo.png", "png");

        assert!(Validator::new(false).validate(&fixture.package()).valid);

        let strict = Validator::new(true).validate(&fixture.package());
        assert!(!strict.valid);
        assert!(has_error(&strict, "file extension not allowed: logo.png"));
    }

    #[test]
    fn test_dangerous_patterns() {
        let cases = [
            ("EVAL (x)", "eval()"),
            ("child.exec(cmd)", "exec()"),
            ("os.system('ls')", "system()"),
            ("shell_exec($c)", "shell execution"),
            ("passthru($c)", "command execution"),
            ("base64_decode($s)", "obfuscated"),
            ("document.write(x)", "DOM manipulation"),
            ("el.innerHTML = x", "HTML injection"),
        ];
        for (content, expected) in cases {
            let report = validate(&AgentFixture::new("a").file("index.ts", content));
            assert!(has_error(&report, expected), "{content}: {:?}", report.errors);
        }
    }

    #[test]
    fn test_secret_patterns() {
        let github = format!("ghp_{}", "a".repeat(36));
        let cases: [(&str, &str); 5] = [
            ("const api_key = 'abcdefghijklmnopqrstuvwx'", "potential API key"),
            ("password: hunter2hunter2", "potential hardcoded secret"),
            ("token = ABCDEFGHIJKLMNOPQRSTUVWXYZ", "potential access token"),
            ("sk-abcdefghijklmnopqrstuvwxyz", "OpenAI"),
            (github.as_str(), "GitHub"),
        ];
        for (content, expected) in cases {
            let report = validate(&AgentFixture::new("a").file("config.ts", content));
            assert!(has_error(&report, expected), "{content}: {:?}", report.errors);
        }
    }

    #[test]
    fn test_http_url_source_rejected() {
        let mut package = AgentFixture::new("a").file("index.ts", "x").package();
        package.source = SourceResolver::new().resolve("http://example.com/a.zip").unwrap();
        assert!(has_error(&Validator::new(false).validate(&package), "only HTTPS URLs"));

        package.source = SourceResolver::new().resolve("https://example.com/a.zip").unwrap();
        assert!(Validator::new(false).validate(&package).valid);
    }

    #[test]
    fn test_malicious_dependencies() {
        let report = validate(
            &AgentFixture::new("a")
                .file("index.ts", "x")
                .npm("Event-Stream")
                .npm("left-pad")
                .pip("jeIlyfish"),
        );
        assert!(has_error(&report, "malicious NPM package: Event-Stream"));
        assert!(has_error(&report, "malicious Python package: jeIlyfish"));
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_into_result() {
        let report = validate(&AgentFixture::new("").file("index.ts", "x"));
        let err = report.into_result("pkg").unwrap_err();
        assert!(matches!(err, AgpkgError::ValidationFailed { name, issues } if name == "pkg" && !issues.is_empty()));
    }

    #[test]
    fn test_validate_agent_name() {
        assert!(validate_agent_name("my-agent_v1.0").is_ok());
        assert!(matches!(validate_agent_name(""), Err(AgpkgError::InvalidName { .. })));
        assert!(matches!(validate_agent_name("my agent"), Err(AgpkgError::InvalidName { .. })));
        assert!(matches!(validate_agent_name("a/b"), Err(AgpkgError::InvalidName { .. })));
    }

    #[test]
    fn test_dot_only_names_are_rejected() {
        for name in [".", "..", "..."] {
            assert!(matches!(validate_agent_name(name), Err(AgpkgError::InvalidName { .. })), "{name}");
        }
        assert!(validate_agent_name(".hidden").is_ok());
        assert!(validate_agent_name("v1..2").is_ok());

        let report = validate(&AgentFixture::new("..").file("index.ts", "export {};"));
        assert!(has_error(&report, "name: agent name contains invalid characters"));
    }
}
