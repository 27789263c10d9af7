use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use crate::error::{GlInsightsError, Result};
use crate::insights::RankedCount;
use crate::providers::gitlab::client::GitLabApi;
use crate::providers::registry::PackageRegistry;

/// Upper bound on items pulled for the supplementary analyses.
pub const MAX_ANALYZED_ITEMS: usize = 1000;

pub struct GitLabProvider {
    pub api: Arc<dyn GitLabApi>,
    pub registry: Arc<dyn PackageRegistry>,
}

impl GitLabProvider {
    pub fn new(api: Arc<dyn GitLabApi>, registry: Arc<dyn PackageRegistry>) -> Self {
        Self { api, registry }
    }
}

/// Rewrites a bare 404 into a message naming the project the caller asked for.
pub fn project_context(project: &str) -> impl Fn(GlInsightsError) -> GlInsightsError + '_ {
    move |err| match err {
        GlInsightsError::NotFound(_) => {
            GlInsightsError::NotFound(format!("Project '{project}' not found"))
        }
        other => other,
    }
}

/// Disabled project features answer 403 or 404; their collections count as empty.
pub fn unavailable_as_empty<T>(result: Result<Vec<T>>, feature: &str, project: &str) -> Result<Vec<T>> {
    match result {
        Err(GlInsightsError::Auth(message) | GlInsightsError::NotFound(message)) => {
            warn!("Skipping {feature} for project {project}: {message}");
            Ok(Vec::new())
        }
        other => other,
    }
}

pub fn percentage(part: usize, total: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let rate = (part as f64 / total.max(1) as f64) * 100.0;
    rate
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    avg
}

/// Highest counts first, ties broken by name.
pub fn rank_counts(counts: HashMap<String, usize>, top: usize) -> Vec<RankedCount> {
    let mut ranked: Vec<_> = counts
        .into_iter()
        .map(|(name, count)| RankedCount { name, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(top);
    ranked
}
