use super::DeclaredDependency;
use crate::error::{GlInsightsError, Result};
use crate::insights::DependencyKind;

pub fn parse(content: &str) -> Result<Vec<DeclaredDependency>> {
    let mut dependencies = Vec::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line
            .split_once('#')
            .map_or(raw_line, |(before, _)| before)
            .trim();

        // Skip blank lines and pip options (-r, -e, --index-url ...)
        if line.is_empty() || line.starts_with('-') {
            continue;
        }

        dependencies.push(parse_line(line).ok_or_else(|| {
            GlInsightsError::UnsupportedFormat(format!(
                "requirements.txt line {}: cannot parse '{}'",
                index + 1,
                raw_line.trim()
            ))
        })?);
    }

    Ok(dependencies)
}

fn parse_line(line: &str) -> Option<DeclaredDependency> {
    // Environment markers do not affect the version
    let line = line.split_once(';').map_or(line, |(spec, _)| spec).trim();

    let name_end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(line.len());
    let name = &line[..name_end];
    if name.is_empty() {
        return None;
    }

    let mut rest = line[name_end..].trim_start();

    if let Some(after_extras) = rest.strip_prefix('[') {
        let (_, tail) = after_extras.split_once(']')?;
        rest = tail.trim_start();
    }

    if let Some(url) = rest.strip_prefix('@') {
        if url.trim().is_empty() {
            return None;
        }
        return Some(DeclaredDependency::new(name, "url", DependencyKind::Normal));
    }

    if !rest.is_empty() && !rest.starts_with(&['<', '>', '=', '!', '~'][..]) {
        return None;
    }

    let requirement = if rest.is_empty() { "*" } else { rest };

    Some(DeclaredDependency::new(
        name,
        requirement,
        DependencyKind::Normal,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(name: &str, requirement: &str) -> DeclaredDependency {
        DeclaredDependency::new(name, requirement, DependencyKind::Normal)
    }

    #[test]
    fn test_parses_common_requirement_lines() {
        let content = "\
# web stack
requests==2.31.0
flask>=2.0,<3.0  # pinned major
uvicorn[standard]~=0.23
numpy
pywin32>=306; sys_platform == 'win32'
";

        let deps = parse(content).unwrap();

        assert_eq!(
            deps,
            vec![
                dep("requests", "==2.31.0"),
                dep("flask", ">=2.0,<3.0"),
                dep("uvicorn", "~=0.23"),
                dep("numpy", "*"),
                dep("pywin32", ">=306"),
            ]
        );
    }

    #[test]
    fn test_skips_options_and_blank_lines() {
        let content = "-r base.txt\n\n--index-url https://pypi.example.com/simple\n-e .\ndjango==5.0\n";

        let deps = parse(content).unwrap();

        assert_eq!(deps, vec![dep("django", "==5.0")]);
    }

    #[test]
    fn test_direct_url_requirement() {
        let deps = parse("mypkg @ https://example.com/mypkg-1.0.tar.gz\n").unwrap();

        assert_eq!(deps, vec![dep("mypkg", "url")]);
    }

    #[test]
    fn test_malformed_line_is_unsupported_format() {
        let err = parse("requests==2.31.0\n<<<<<<< HEAD\n").unwrap_err();

        assert_eq!(err.kind(), "unsupported_format");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_unclosed_extras_is_unsupported_format() {
        let err = parse("uvicorn[standard==0.23\n").unwrap_err();
        assert_eq!(err.kind(), "unsupported_format");
    }
}
