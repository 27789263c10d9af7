use serde::Serialize;
use serde_json::{json, Value};

use super::params::{
    DEFAULT_ACTIVITY_DAYS, DEFAULT_PIPELINE_LIMIT, DEFAULT_README_CHARS, DEFAULT_WINDOW_DAYS,
    MAX_PIPELINE_LIMIT, MAX_README_CHARS, MAX_WINDOW_DAYS,
};

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn project_property() -> Value {
    json!({
        "type": "string",
        "description": "Project ID or full path (e.g. 'group/project'); defaults to the configured project"
    })
}

fn ref_property() -> Value {
    json!({
        "type": "string",
        "description": "Branch or tag name; defaults to the project's default branch"
    })
}

fn schema(properties: Value) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false
    })
}

fn schema_requiring(properties: Value, required: &[&str]) -> Value {
    let mut schema = schema(properties);
    schema["required"] = json!(required);
    schema
}

pub fn all() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "project_overview",
            description: "Project metadata: name, path, visibility, stars, forks and open issues",
            input_schema: schema(json!({ "project": project_property() })),
        },
        ToolDefinition {
            name: "pipeline_health",
            description: "Recent CI/CD pipelines with success rate, average duration and status breakdown",
            input_schema: schema(json!({
                "project": project_property(),
                "limit": {
                    "type": "integer",
                    "description": format!("Number of recent pipelines to analyze (default: {DEFAULT_PIPELINE_LIMIT})"),
                    "minimum": 1,
                    "maximum": MAX_PIPELINE_LIMIT,
                    "default": DEFAULT_PIPELINE_LIMIT
                },
                "ref": ref_property()
            })),
        },
        ToolDefinition {
            name: "contributor_insights",
            description: "Commits and merged merge requests per contributor over a time window",
            input_schema: schema(json!({
                "project": project_property(),
                "since": {
                    "type": "string",
                    "description": "Window start (RFC 3339 or YYYY-MM-DD); cannot be combined with 'days'"
                },
                "until": {
                    "type": "string",
                    "description": "Window end (RFC 3339 or YYYY-MM-DD); defaults to now"
                },
                "days": {
                    "type": "integer",
                    "description": format!("Window length in days before 'until' (default: {DEFAULT_WINDOW_DAYS})"),
                    "minimum": 1,
                    "maximum": MAX_WINDOW_DAYS
                },
                "ref": ref_property()
            })),
        },
        ToolDefinition {
            name: "dependency_check",
            description: "Compares declared dependencies (Cargo.toml, package.json, requirements.txt) with the latest published versions",
            input_schema: schema(json!({
                "project": project_property(),
                "manifest_path": {
                    "type": "string",
                    "description": "Manifest path in the repository; defaults to the first of Cargo.toml, package.json, requirements.txt"
                },
                "ref": ref_property()
            })),
        },
        ToolDefinition {
            name: "merge_request_analysis",
            description: "Merge request throughput, review time and top authors with recommendations",
            input_schema: schema(json!({
                "project": project_property(),
                "timeframe": {
                    "type": "string",
                    "enum": ["week", "month", "quarter"],
                    "default": "month"
                }
            })),
        },
        ToolDefinition {
            name: "issue_analysis",
            description: "Issue states, open issue age, top labels and assignees, critical issues",
            input_schema: schema(json!({
                "project": project_property(),
                "label": {
                    "type": "string",
                    "description": "Only analyze issues with this label (e.g. bug, incident)"
                }
            })),
        },
        ToolDefinition {
            name: "dora_metrics",
            description: "DORA metrics: deployment frequency, lead time, time to restore and change failure rate",
            input_schema: schema(json!({
                "project": project_property(),
                "start_date": {
                    "type": "string",
                    "description": "YYYY-MM-DD; defaults to 30 days before end_date"
                },
                "end_date": {
                    "type": "string",
                    "description": "YYYY-MM-DD; defaults to today"
                }
            })),
        },
        ToolDefinition {
            name: "project_health",
            description: "Health score from activity, open merge requests, open issues and the latest pipeline",
            input_schema: schema(json!({ "project": project_property() })),
        },
        ToolDefinition {
            name: "project_activity",
            description: "Project events over the last N days, broken down by action, with the latest key events",
            input_schema: schema(json!({
                "project": project_property(),
                "days": {
                    "type": "integer",
                    "description": format!("Days to look back (default: {DEFAULT_ACTIVITY_DAYS})"),
                    "minimum": 1,
                    "maximum": MAX_WINDOW_DAYS,
                    "default": DEFAULT_ACTIVITY_DAYS
                }
            })),
        },
        ToolDefinition {
            name: "group_projects",
            description: "Projects of a group with stars, forks and last activity, optionally with open merge requests, open issues and CI presence",
            input_schema: schema_requiring(
                json!({
                    "group": {
                        "type": "string",
                        "description": "Group ID or full path (e.g. 'platform/backend')"
                    },
                    "with_metrics": {
                        "type": "boolean",
                        "description": "Also fetch per-project metrics (one request per metric and project)",
                        "default": false
                    }
                }),
                &["group"],
            ),
        },
        ToolDefinition {
            name: "read_readme",
            description: "Content of the project's root README",
            input_schema: schema(json!({
                "project": project_property(),
                "ref": ref_property(),
                "max_chars": {
                    "type": "integer",
                    "description": format!("Truncate the content after this many characters (default: {DEFAULT_README_CHARS})"),
                    "minimum": 1,
                    "maximum": MAX_README_CHARS,
                    "default": DEFAULT_README_CHARS
                }
            })),
        },
        ToolDefinition {
            name: "readme_files",
            description: "Every README file in the repository, grouped by directory",
            input_schema: schema(json!({
                "project": project_property(),
                "ref": ref_property()
            })),
        },
        ToolDefinition {
            name: "readme_stats",
            description: "README counts and extensions across the repository, plus size, line and word counts of the root README",
            input_schema: schema(json!({
                "project": project_property(),
                "ref": ref_property()
            })),
        },
        ToolDefinition {
            name: "search_readme",
            description: "Lines of the root README containing a term, with surrounding context",
            input_schema: schema_requiring(
                json!({
                    "project": project_property(),
                    "term": {
                        "type": "string",
                        "description": "Text to search for",
                        "minLength": 1
                    },
                    "ref": ref_property(),
                    "case_sensitive": {
                        "type": "boolean",
                        "default": false
                    }
                }),
                &["term"],
            ),
        },
        ToolDefinition {
            name: "readme_quality",
            description: "Scores the root README on title, description, installation, usage, license, code samples, links, images and length",
            input_schema: schema(json!({
                "project": project_property(),
                "ref": ref_property()
            })),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tool_has_an_object_schema() {
        let tools = all();

        assert_eq!(tools.len(), 15);
        for tool in &tools {
            assert_eq!(tool.input_schema["type"], "object");
            assert_eq!(tool.input_schema["additionalProperties"], false);
        }
        assert!(tools
            .iter()
            .filter(|t| t.name != "group_projects")
            .all(|t| t.input_schema["properties"]["project"].is_object()));
    }

    #[test]
    fn test_required_fields() {
        let tools = all();
        let required = |name: &str| {
            tools
                .iter()
                .find(|t| t.name == name)
                .map(|t| t.input_schema["required"].clone())
                .unwrap()
        };

        assert_eq!(required("group_projects"), serde_json::json!(["group"]));
        assert_eq!(required("search_readme"), serde_json::json!(["term"]));
        assert!(required("project_overview").is_null());
    }

    #[test]
    fn test_schema_serializes_camel_case_key() {
        let value = serde_json::to_value(&all()[0]).unwrap();

        assert_eq!(value["name"], "project_overview");
        assert!(value.get("inputSchema").is_some());
    }
}
