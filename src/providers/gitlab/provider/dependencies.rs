use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use super::core::GitLabProvider;
use crate::error::{GlInsightsError, Result};
use crate::insights::{DependencyFinding, DependencyReport, ManifestFormat};
use crate::manifest::version::{is_stale, lower_bound, parse_lenient, to_version_req};
use crate::manifest::{self, DeclaredDependency, DEFAULT_MANIFESTS};

/// Registry lookups in flight at once.
const LOOKUP_CONCURRENCY: usize = 8;

/// Requirements that point somewhere other than the package registry.
const NON_REGISTRY_REQUIREMENTS: [&str; 4] = ["git", "path", "workspace", "url"];

/// npm specifiers resolved outside the registry, or under another package name.
const NON_REGISTRY_PREFIXES: [&str; 12] = [
    "workspace:",
    "file:",
    "link:",
    "portal:",
    "npm:",
    "git:",
    "git+",
    "github:",
    "gitlab:",
    "bitbucket:",
    "http:",
    "https:",
];

impl GitLabProvider {
    pub async fn dependency_check(
        &self,
        project: &str,
        manifest_path: Option<&str>,
        branch: Option<&str>,
    ) -> Result<DependencyReport> {
        let (manifest_path, format, content) = match manifest_path {
            Some(path) => {
                // Reject unsupported names before touching the network
                let format = manifest::detect_format(path)?;
                let content = self.fetch_manifest(project, path, branch).await?;
                (path.to_string(), format, content)
            }
            None => self.find_default_manifest(project, branch).await?,
        };

        info!("Checking dependencies in {manifest_path} for project: {project}");

        let declared = manifest::parse(format, &content)?;
        if declared.is_empty() {
            warn!("{manifest_path} declares no dependencies");
        }

        let findings: Vec<DependencyFinding> = stream::iter(
            declared
                .iter()
                .map(|dependency| self.check_dependency(format, dependency)),
        )
        .buffered(LOOKUP_CONCURRENCY)
        .collect()
        .await;

        let stale_dependencies = findings.iter().filter(|f| f.stale).count();

        Ok(DependencyReport {
            project: project.to_string(),
            manifest_path,
            format,
            total_dependencies: findings.len(),
            stale_dependencies,
            findings,
        })
    }

    async fn fetch_manifest(
        &self,
        project: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<String> {
        self.api
            .get_file(project, path, branch)
            .await
            .map_err(|err| match err {
                GlInsightsError::NotFound(_) => GlInsightsError::NotFound(format!(
                    "Manifest '{path}' not found in project '{project}'"
                )),
                other => other,
            })
    }

    async fn find_default_manifest(
        &self,
        project: &str,
        branch: Option<&str>,
    ) -> Result<(String, ManifestFormat, String)> {
        for candidate in DEFAULT_MANIFESTS {
            match self.api.get_file(project, candidate, branch).await {
                Ok(content) => {
                    let format = manifest::detect_format(candidate)?;
                    return Ok((candidate.to_string(), format, content));
                }
                Err(GlInsightsError::NotFound(_)) => {
                    debug!("{candidate} not present in project: {project}");
                }
                Err(err) => return Err(err),
            }
        }

        Err(GlInsightsError::NotFound(format!(
            "No supported manifest ({}) found in project '{project}'",
            DEFAULT_MANIFESTS.join(", ")
        )))
    }

    async fn check_dependency(
        &self,
        format: ManifestFormat,
        dependency: &DeclaredDependency,
    ) -> DependencyFinding {
        let current = lower_bound(&dependency.requirement);
        let mut finding = DependencyFinding {
            name: dependency.name.clone(),
            kind: dependency.kind,
            requirement: dependency.requirement.clone(),
            current_version: current.as_ref().map(ToString::to_string),
            latest_version: None,
            stale: false,
            lookup_error: None,
        };

        if !is_registry_requirement(&dependency.requirement) {
            debug!("Skipping registry lookup for {}", dependency.name);
            return finding;
        }

        match self.registry.latest_version(format, &dependency.name).await {
            Ok(latest) => {
                if let Some(latest_version) = parse_lenient(&latest) {
                    let requirement = to_version_req(format, &dependency.requirement);
                    finding.stale =
                        is_stale(requirement.as_ref(), current.as_ref(), &latest_version);
                }
                finding.latest_version = Some(latest);
            }
            Err(err) => {
                warn!("Registry lookup failed for {}: {err}", dependency.name);
                finding.lookup_error = Some(err.to_string());
            }
        }

        finding
    }
}

fn is_registry_requirement(requirement: &str) -> bool {
    let requirement = requirement.trim();
    // Version ranges never contain '/'; "user/repo" is GitHub shorthand
    !(NON_REGISTRY_REQUIREMENTS.contains(&requirement)
        || NON_REGISTRY_PREFIXES
            .iter()
            .any(|prefix| requirement.starts_with(prefix))
        || requirement.contains('/'))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::insights::DependencyKind;
    use crate::providers::gitlab::client::testing::MockGitLab;
    use crate::providers::registry::testing::StaticRegistry;

    const CARGO_MANIFEST: &str = r#"
[package]
name = "app"
version = "0.1.0"

[dependencies]
serde = "1.0"
reqwest = { version = "0.11", features = ["json"] }
internal = { path = "../internal" }
unpublished = "2.0"

[dev-dependencies]
mockito = "1.5"
"#;

    fn provider(api: MockGitLab, registry: StaticRegistry) -> GitLabProvider {
        GitLabProvider::new(Arc::new(api), Arc::new(registry))
    }

    fn finding<'a>(report: &'a DependencyReport, name: &str) -> &'a DependencyFinding {
        report
            .findings
            .iter()
            .find(|f| f.name == name)
            .unwrap()
    }

    fn registry() -> StaticRegistry {
        StaticRegistry::new(&[
            ("serde", "1.0.210"),
            ("reqwest", "0.12.8"),
            ("mockito", "1.5.0"),
            ("react", "18.3.1"),
            ("requests", "2.32.3"),
        ])
    }

    #[tokio::test]
    async fn test_cargo_manifest_staleness() {
        let api = MockGitLab::new().with_file("Cargo.toml", CARGO_MANIFEST);

        let report = provider(api, registry())
            .dependency_check("group/app", Some("Cargo.toml"), None)
            .await
            .unwrap();

        assert_eq!(report.format, ManifestFormat::Cargo);
        assert_eq!(report.total_dependencies, 5);
        assert_eq!(report.stale_dependencies, 1);

        let serde = finding(&report, "serde");
        assert!(!serde.stale);
        assert_eq!(serde.current_version.as_deref(), Some("1.0.0"));
        assert_eq!(serde.latest_version.as_deref(), Some("1.0.210"));

        assert!(finding(&report, "reqwest").stale);

        let internal = finding(&report, "internal");
        assert!(!internal.stale);
        assert_eq!(internal.latest_version, None);
        assert_eq!(internal.lookup_error, None);

        assert_eq!(finding(&report, "mockito").kind, DependencyKind::Dev);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_recorded_not_fatal() {
        let api = MockGitLab::new().with_file("Cargo.toml", CARGO_MANIFEST);

        let report = provider(api, registry())
            .dependency_check("group/app", Some("Cargo.toml"), None)
            .await
            .unwrap();

        let unpublished = finding(&report, "unpublished");
        assert!(!unpublished.stale);
        assert!(unpublished.lookup_error.is_some());
    }

    #[tokio::test]
    async fn test_default_manifest_search_order() {
        let api = MockGitLab::new()
            .with_file("package.json", r#"{"dependencies": {"react": "^17.0.2"}}"#)
            .with_file("requirements.txt", "requests==2.32.3\n");

        let report = provider(api, registry())
            .dependency_check("group/app", None, Some("main"))
            .await
            .unwrap();

        assert_eq!(report.manifest_path, "package.json");
        assert_eq!(report.format, ManifestFormat::Npm);
        assert_eq!(report.stale_dependencies, 1);
    }

    #[tokio::test]
    async fn test_pinned_requirement_is_not_stale_at_latest() {
        let api = MockGitLab::new().with_file("requirements.txt", "requests==2.32.3\n");

        let report = provider(api, registry())
            .dependency_check("group/app", None, None)
            .await
            .unwrap();

        assert_eq!(report.manifest_path, "requirements.txt");
        assert_eq!(report.stale_dependencies, 0);
    }

    #[test]
    fn test_registry_requirements() {
        assert!(is_registry_requirement("^1.2.0"));
        assert!(is_registry_requirement(">=2.0, <3"));
        assert!(is_registry_requirement("latest"));
        assert!(!is_registry_requirement("workspace:*"));
        assert!(!is_registry_requirement("file:../shared"));
        assert!(!is_registry_requirement("npm:react@^18.0.0"));
        assert!(!is_registry_requirement("git+https://gitlab.com/group/lib.git"));
        assert!(!is_registry_requirement("github:owner/repo#main"));
        assert!(!is_registry_requirement("owner/repo"));
        assert!(!is_registry_requirement("path"));
    }

    #[tokio::test]
    async fn test_npm_local_and_aliased_specs_skip_registry() {
        let api = MockGitLab::new().with_file(
            "package.json",
            r#"{
                "dependencies": {
                    "react": "^18.0.0",
                    "shared": "workspace:*",
                    "legacy-react": "npm:react@^16.0.0",
                    "forked": "git+https://gitlab.com/group/forked.git"
                }
            }"#,
        );

        let report = provider(api, registry())
            .dependency_check("group/app", Some("package.json"), None)
            .await
            .unwrap();

        assert_eq!(report.total_dependencies, 4);
        assert_eq!(report.stale_dependencies, 0);
        for name in ["shared", "legacy-react", "forked"] {
            let skipped = finding(&report, name);
            assert_eq!(skipped.latest_version, None);
            assert_eq!(skipped.lookup_error, None);
        }
        assert_eq!(
            finding(&report, "react").latest_version.as_deref(),
            Some("18.3.1")
        );
    }

    #[tokio::test]
    async fn test_no_manifest_is_not_found() {
        let err = provider(MockGitLab::new(), registry())
            .dependency_check("group/app", None, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_unsupported_format() {
        let api = MockGitLab::new().with_file("Cargo.toml", "[dependencies\nserde = ");

        let err = provider(api, registry())
            .dependency_check("group/app", Some("Cargo.toml"), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "unsupported_format");
    }

    #[tokio::test]
    async fn test_unsupported_manifest_name() {
        let api = MockGitLab::new().with_file("go.mod", "module example.com/app\n");

        let err = provider(api, registry())
            .dependency_check("group/app", Some("go.mod"), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "unsupported_format");
    }
}
