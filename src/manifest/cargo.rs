use toml::{Table, Value};

use super::DeclaredDependency;
use crate::error::{GlInsightsError, Result};
use crate::insights::DependencyKind;

const SECTIONS: [(&str, DependencyKind); 3] = [
    ("dependencies", DependencyKind::Normal),
    ("dev-dependencies", DependencyKind::Dev),
    ("build-dependencies", DependencyKind::Build),
];

pub fn parse(content: &str) -> Result<Vec<DeclaredDependency>> {
    let manifest: Table = toml::from_str(content).map_err(|e| {
        GlInsightsError::UnsupportedFormat(format!("Cargo.toml is not valid TOML: {e}"))
    })?;

    let mut dependencies = Vec::new();

    for (section, kind) in SECTIONS {
        if let Some(table) = section_table(&manifest, section)? {
            collect(table, kind, &mut dependencies)?;
        }
    }

    // Workspace roots declare shared versions here
    if let Some(workspace) = manifest.get("workspace").and_then(Value::as_table) {
        if let Some(table) = section_table(workspace, "dependencies")? {
            collect(table, DependencyKind::Normal, &mut dependencies)?;
        }
    }

    Ok(dependencies)
}

fn section_table<'a>(parent: &'a Table, name: &str) -> Result<Option<&'a Table>> {
    match parent.get(name) {
        None => Ok(None),
        Some(Value::Table(table)) => Ok(Some(table)),
        Some(_) => Err(GlInsightsError::UnsupportedFormat(format!(
            "Cargo.toml: [{name}] must be a table"
        ))),
    }
}

fn collect(table: &Table, kind: DependencyKind, out: &mut Vec<DeclaredDependency>) -> Result<()> {
    for (key, value) in table {
        let dependency = match value {
            Value::String(requirement) => DeclaredDependency::new(key, requirement, kind),
            Value::Table(detail) => from_detail(key, detail, kind),
            _ => {
                return Err(GlInsightsError::UnsupportedFormat(format!(
                    "Cargo.toml: dependency '{key}' must be a string or a table"
                )))
            }
        };
        out.push(dependency);
    }
    Ok(())
}

fn from_detail(key: &str, detail: &Table, kind: DependencyKind) -> DeclaredDependency {
    // `foo = { package = "bar" }` publishes as `bar`
    let name = detail.get("package").and_then(Value::as_str).unwrap_or(key);

    let kind = if detail.get("optional").and_then(Value::as_bool) == Some(true) {
        DependencyKind::Optional
    } else {
        kind
    };

    let requirement = if let Some(version) = detail.get("version").and_then(Value::as_str) {
        version
    } else if detail.contains_key("git") {
        "git"
    } else if detail.contains_key("path") {
        "path"
    } else if detail.get("workspace").and_then(Value::as_bool) == Some(true) {
        "workspace"
    } else {
        "*"
    };

    DeclaredDependency::new(name, requirement, kind)
}
