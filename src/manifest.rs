mod cargo;
mod npm;
mod pip;
pub mod version;

use crate::error::{GlInsightsError, Result};
use crate::insights::{DependencyKind, ManifestFormat};

/// Manifests tried, in order, when the caller does not name one.
pub const DEFAULT_MANIFESTS: [&str; 3] = ["Cargo.toml", "package.json", "requirements.txt"];

/// A dependency as declared in a manifest, before any registry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub name: String,
    pub requirement: String,
    pub kind: DependencyKind,
}

impl DeclaredDependency {
    pub fn new(name: &str, requirement: &str, kind: DependencyKind) -> Self {
        Self {
            name: name.to_string(),
            requirement: requirement.to_string(),
            kind,
        }
    }
}

pub fn detect_format(path: &str) -> Result<ManifestFormat> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let lower = file_name.to_ascii_lowercase();

    match lower.as_str() {
        "cargo.toml" => Ok(ManifestFormat::Cargo),
        "package.json" => Ok(ManifestFormat::Npm),
        _ if lower.starts_with("requirements") && lower.ends_with(".txt") => Ok(ManifestFormat::Pip),
        _ => Err(GlInsightsError::UnsupportedFormat(format!(
            "'{file_name}' is not a supported manifest (expected Cargo.toml, package.json or requirements*.txt)"
        ))),
    }
}

pub fn parse(format: ManifestFormat, content: &str) -> Result<Vec<DeclaredDependency>> {
    match format {
        ManifestFormat::Cargo => cargo::parse(content),
        ManifestFormat::Npm => npm::parse(content),
        ManifestFormat::Pip => pip::parse(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format_by_file_name() {
        assert_eq!(detect_format("Cargo.toml").unwrap(), ManifestFormat::Cargo);
        assert_eq!(
            detect_format("web/frontend/package.json").unwrap(),
            ManifestFormat::Npm
        );
        assert_eq!(
            detect_format("requirements-dev.txt").unwrap(),
            ManifestFormat::Pip
        );
    }

    #[test]
    fn test_detect_format_rejects_unknown_manifest() {
        let err = detect_format("go.mod").unwrap_err();
        assert_eq!(err.kind(), "unsupported_format");

        let err = detect_format("pom.xml").unwrap_err();
        assert_eq!(err.kind(), "unsupported_format");
    }
}
