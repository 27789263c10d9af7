use semver::{Version, VersionReq};

use crate::insights::ManifestFormat;

const OPERATOR_CHARS: &[char] = &['^', '~', '=', '>', '<', '!'];

/// Parses versions that are not strict semver (`1`, `1.2`, `v2.0.1`, `2024.1.post2`),
/// keeping at most the first three numeric components.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let raw = raw.trim().trim_start_matches('v');
    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }

    let parts: Vec<u64> = raw
        .split('.')
        .map_while(|part| part.parse().ok())
        .take(3)
        .collect();

    match parts.as_slice() {
        [] => None,
        [major] => Some(Version::new(*major, 0, 0)),
        [major, minor] => Some(Version::new(*major, *minor, 0)),
        [major, minor, patch, ..] => Some(Version::new(*major, *minor, *patch)),
    }
}

/// Splits a requirement into comparators, re-attaching operators written apart
/// from their version (`>= 1.2` becomes `>=1.2`).
fn comparators(requirement: &str) -> Vec<String> {
    let first_alternative = requirement.split("||").next().unwrap_or_default();
    let mut result: Vec<String> = Vec::new();
    let mut pending_operator = String::new();

    for token in first_alternative
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        if token.chars().all(|c| OPERATOR_CHARS.contains(&c)) {
            pending_operator.push_str(token);
            continue;
        }
        result.push(format!("{pending_operator}{token}"));
        pending_operator.clear();
    }

    result
}

/// Lowest version a requirement admits, used as the "current" version of a
/// dependency. Upper-bound-only, wildcard and non-version requirements yield `None`.
pub fn lower_bound(requirement: &str) -> Option<Version> {
    comparators(requirement).iter().find_map(|comparator| {
        if comparator.starts_with('<') || comparator.starts_with("!=") {
            return None;
        }
        let version = comparator
            .trim_start_matches(OPERATOR_CHARS)
            .trim_end_matches(".*");
        parse_lenient(version)
    })
}

/// Interprets a manifest requirement as a semver range, where the ecosystem's
/// syntax allows it.
pub fn to_version_req(format: ManifestFormat, requirement: &str) -> Option<VersionReq> {
    let normalized = match format {
        ManifestFormat::Cargo => requirement.to_string(),
        ManifestFormat::Npm => comparators(requirement).join(", "),
        ManifestFormat::Pip => requirement
            .split(',')
            .map(str::trim)
            .filter(|c| !c.starts_with("!="))
            .map(|c| {
                if let Some(exact) = c.strip_prefix("===") {
                    format!("={exact}")
                } else if let Some(exact) = c.strip_prefix("==") {
                    format!("={}", exact.trim_end_matches(".*"))
                } else if let Some(compatible) = c.strip_prefix("~=") {
                    compatible_release(compatible.trim())
                } else {
                    c.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", "),
    };

    VersionReq::parse(&normalized).ok()
}

/// `~=X.Y` admits `>=X.Y, ==X.*`; `~=X.Y.Z` admits `>=X.Y.Z, ==X.Y.*`.
fn compatible_release(version: &str) -> String {
    let parts: Vec<u64> = version
        .split('.')
        .map_while(|part| part.parse().ok())
        .collect();

    match parts.as_slice() {
        [major, _] => format!(">={version}, <{}.0.0", major + 1),
        [major, minor, _, ..] => format!(">={version}, <{major}.{}.0", minor + 1),
        _ => format!(">={version}"),
    }
}

/// A dependency is stale when a newer version exists that its requirement
/// does not admit. Without a usable requirement, any newer version counts.
pub fn is_stale(req: Option<&VersionReq>, current: Option<&Version>, latest: &Version) -> bool {
    let Some(current) = current else {
        return false;
    };
    if latest <= current {
        return false;
    }
    req.map_or(true, |req| !req.matches(latest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: &str) -> Version {
        Version::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_lenient_pads_components() {
        assert_eq!(parse_lenient("1"), Some(v("1.0.0")));
        assert_eq!(parse_lenient("1.2"), Some(v("1.2.0")));
        assert_eq!(parse_lenient("v2.0.1"), Some(v("2.0.1")));
        assert_eq!(parse_lenient("2024.1.0.post2"), Some(v("2024.1.0")));
        assert_eq!(parse_lenient("1.0.0-beta.1"), Some(v("1.0.0-beta.1")));
        assert_eq!(parse_lenient("latest"), None);
    }

    #[test]
    fn test_lower_bound_across_syntaxes() {
        assert_eq!(lower_bound("^1.2.3"), Some(v("1.2.3")));
        assert_eq!(lower_bound("~1.4"), Some(v("1.4.0")));
        assert_eq!(lower_bound(">= 2.0, < 3"), Some(v("2.0.0")));
        assert_eq!(lower_bound("==2.31.0"), Some(v("2.31.0")));
        assert_eq!(lower_bound("==1.0.*"), Some(v("1.0.0")));
        assert_eq!(lower_bound("<2.0,>=1.5"), Some(v("1.5.0")));
        assert_eq!(lower_bound("^16.0.0 || ^17.0.0"), Some(v("16.0.0")));
    }

    #[test]
    fn test_lower_bound_without_minimum() {
        assert_eq!(lower_bound("*"), None);
        assert_eq!(lower_bound("<3"), None);
        assert_eq!(lower_bound("git"), None);
        assert_eq!(lower_bound("workspace"), None);
    }

    #[test]
    fn test_to_version_req_per_format() {
        let cargo = to_version_req(ManifestFormat::Cargo, "1.0").unwrap();
        assert!(cargo.matches(&v("1.9.3")));
        assert!(!cargo.matches(&v("2.0.0")));

        let npm = to_version_req(ManifestFormat::Npm, ">=1.2.0 <2").unwrap();
        assert!(npm.matches(&v("1.5.0")));
        assert!(!npm.matches(&v("2.1.0")));

        let pip = to_version_req(ManifestFormat::Pip, ">=2.0,<3.0").unwrap();
        assert!(pip.matches(&v("2.9.0")));
        assert!(!pip.matches(&v("3.0.0")));

        let pinned = to_version_req(ManifestFormat::Pip, "==2.31.0").unwrap();
        assert!(pinned.matches(&v("2.31.0")));
        assert!(!pinned.matches(&v("2.32.0")));
    }

    #[test]
    fn test_pip_compatible_release_keeps_upper_bound() {
        let minor = to_version_req(ManifestFormat::Pip, "~=1.4").unwrap();
        assert!(minor.matches(&v("1.9.0")));
        assert!(!minor.matches(&v("2.0.0")));
        assert!(is_stale(Some(&minor), lower_bound("~=1.4").as_ref(), &v("2.0.0")));

        let patch = to_version_req(ManifestFormat::Pip, "~=2.31.0").unwrap();
        assert!(patch.matches(&v("2.31.5")));
        assert!(!patch.matches(&v("2.32.0")));
    }

    #[test]
    fn test_to_version_req_rejects_non_ranges() {
        assert!(to_version_req(ManifestFormat::Npm, "latest").is_none());
        assert!(to_version_req(ManifestFormat::Cargo, "git").is_none());
    }

    #[test]
    fn test_stale_when_latest_is_outside_requirement() {
        let req = to_version_req(ManifestFormat::Cargo, "0.11").unwrap();
        assert!(is_stale(Some(&req), Some(&v("0.11.0")), &v("0.12.4")));
    }

    #[test]
    fn test_not_stale_when_requirement_admits_latest() {
        let req = to_version_req(ManifestFormat::Cargo, "1.0").unwrap();
        assert!(!is_stale(Some(&req), Some(&v("1.0.0")), &v("1.0.210")));
    }

    #[test]
    fn test_not_stale_without_current_or_when_ahead() {
        assert!(!is_stale(None, None, &v("1.0.0")));
        assert!(!is_stale(None, Some(&v("2.0.0")), &v("1.9.0")));
    }

    #[test]
    fn test_stale_without_requirement_when_newer_exists() {
        assert!(is_stale(None, Some(&v("1.0.0")), &v("1.0.1")));
    }
}
