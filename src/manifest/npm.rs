use serde_json::Value;

use super::DeclaredDependency;
use crate::error::{GlInsightsError, Result};
use crate::insights::DependencyKind;

const SECTIONS: [(&str, DependencyKind); 3] = [
    ("dependencies", DependencyKind::Normal),
    ("devDependencies", DependencyKind::Dev),
    ("optionalDependencies", DependencyKind::Optional),
];

pub fn parse(content: &str) -> Result<Vec<DeclaredDependency>> {
    let manifest: Value = serde_json::from_str(content).map_err(|e| {
        GlInsightsError::UnsupportedFormat(format!("package.json is not valid JSON: {e}"))
    })?;

    let Value::Object(manifest) = manifest else {
        return Err(GlInsightsError::UnsupportedFormat(
            "package.json must contain a JSON object".to_string(),
        ));
    };

    let mut dependencies = Vec::new();

    for (section, kind) in SECTIONS {
        let Some(entries) = manifest.get(section) else {
            continue;
        };
        let Value::Object(entries) = entries else {
            return Err(GlInsightsError::UnsupportedFormat(format!(
                "package.json: '{section}' must be an object"
            )));
        };

        for (name, requirement) in entries {
            let Value::String(requirement) = requirement else {
                return Err(GlInsightsError::UnsupportedFormat(format!(
                    "package.json: version of '{name}' must be a string"
                )));
            };
            dependencies.push(DeclaredDependency::new(name, requirement, kind));
        }
    }

    Ok(dependencies)
}
