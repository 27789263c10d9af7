/// REST path for a project-scoped resource, e.g. `projects/group%2Fapp/issues`.
pub fn project_endpoint(project: &str, suffix: &str) -> String {
    let encoded = urlencoding::encode(project);
    if suffix.is_empty() {
        format!("projects/{encoded}")
    } else {
        format!("projects/{encoded}/{}", suffix.trim_start_matches('/'))
    }
}

pub fn group_endpoint(group: &str, suffix: &str) -> String {
    format!(
        "groups/{}/{}",
        urlencoding::encode(group),
        suffix.trim_start_matches('/')
    )
}

pub fn pipeline_id_to_url(base_url: &str, project_path: &str, id: u64) -> String {
    format!("{base_url}/{project_path}/-/pipelines/{id}")
}

/// Numeric part of a GraphQL global id (`gid://gitlab/Ci::Pipeline/123`).
pub fn extract_numeric_id(gid: &str) -> Option<u64> {
    gid.rsplit('/').next().and_then(|id| id.parse().ok())
}

/// GraphQL needs a full path; numeric references must be resolved through REST.
pub fn is_numeric_reference(project: &str) -> bool {
    !project.is_empty() && project.bytes().all(|b| b.is_ascii_digit())
}
