use std::collections::BTreeMap;

use indexmap::IndexMap;
use log::{debug, info};

use super::core::{percentage, project_context, GitLabProvider};
use crate::error::{GlInsightsError, Result};
use crate::insights::{
    QualityCheck, ReadmeDocument, ReadmeFilesReport, ReadmeMatch, ReadmeQualityReport,
    ReadmeRating, ReadmeSearchReport, ReadmeStatsReport, Share, TextStats,
};
use crate::providers::gitlab::client::fetch_all;
use crate::providers::gitlab::types::TreeEntryDto;
use crate::providers::gitlab::url_utils::project_endpoint;

const MAX_TREE_ENTRIES: usize = 5000;
const MAX_SEARCH_MATCHES: usize = 10;
/// Characters of context kept on each side of a search hit.
const SEARCH_CONTEXT_CHARS: usize = 30;
const ROOT_DIRECTORY: &str = ".";

impl GitLabProvider {
    pub async fn read_readme(
        &self,
        project: &str,
        ref_: Option<&str>,
        max_chars: Option<usize>,
    ) -> Result<ReadmeDocument> {
        info!("Reading README of project: {project}");

        let root = self.list_tree(project, ref_, false).await?;
        let (file_path, content) = self.fetch_main_readme(project, ref_, &root).await?;

        let size_chars = content.chars().count();
        let (content, truncated) = match max_chars {
            Some(limit) if size_chars > limit => (content.chars().take(limit).collect(), true),
            _ => (content, false),
        };

        Ok(ReadmeDocument {
            project: project.to_string(),
            file_path,
            ref_: ref_.map(ToString::to_string),
            size_chars,
            truncated,
            content,
        })
    }

    pub async fn readme_files(&self, project: &str, ref_: Option<&str>) -> Result<ReadmeFilesReport> {
        info!("Listing README files of project: {project}");

        let tree = self.list_tree(project, ref_, true).await?;
        let readmes: Vec<&TreeEntryDto> = tree.iter().filter(|e| mentions_readme(e)).collect();

        let mut by_directory: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in &readmes {
            by_directory
                .entry(directory_of(&entry.path).to_string())
                .or_default()
                .push(entry.name.clone());
        }

        let directories: IndexMap<String, Vec<String>> = by_directory
            .into_iter()
            .map(|(directory, mut files)| {
                files.sort();
                (directory, files)
            })
            .collect();

        Ok(ReadmeFilesReport {
            project: project.to_string(),
            ref_: ref_.map(ToString::to_string),
            total_files: readmes.len(),
            directories,
        })
    }

    pub async fn readme_stats(&self, project: &str, ref_: Option<&str>) -> Result<ReadmeStatsReport> {
        info!("Collecting README statistics for project: {project}");

        let tree = self.list_tree(project, ref_, true).await?;
        let root: Vec<TreeEntryDto> = tree
            .iter()
            .filter(|e| !e.path.contains('/'))
            .cloned()
            .collect();

        let main_readme = match self.fetch_main_readme(project, ref_, &root).await {
            Ok((file_path, content)) => Some(text_stats(file_path, &content)),
            Err(GlInsightsError::NotFound(message)) => {
                debug!("{message}");
                None
            }
            Err(other) => return Err(other),
        };

        let readmes: Vec<&TreeEntryDto> = tree.iter().filter(|e| mentions_readme(e)).collect();
        Ok(Self::summarize_readme_stats(project, ref_, &readmes, main_readme))
    }

    fn summarize_readme_stats(
        project: &str,
        ref_: Option<&str>,
        readmes: &[&TreeEntryDto],
        main_readme: Option<TextStats>,
    ) -> ReadmeStatsReport {
        let root_files = readmes.iter().filter(|e| !e.path.contains('/')).count();

        let mut extension_counts: BTreeMap<String, usize> = BTreeMap::new();
        for entry in readmes {
            *extension_counts.entry(extension_of(&entry.name)).or_insert(0) += 1;
        }
        let mut ranked: Vec<_> = extension_counts.into_iter().collect();
        // BTreeMap order breaks ties by name
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        let extensions: IndexMap<String, Share> = ranked
            .into_iter()
            .map(|(extension, count)| {
                let share = Share {
                    count,
                    percentage: percentage(count, readmes.len()),
                };
                (extension, share)
            })
            .collect();

        let mut recommendations = Vec::new();
        if readmes.is_empty() {
            recommendations.push("Add a README file to the repository".to_string());
        } else if main_readme.is_none() {
            recommendations.push("Add a README to the repository root".to_string());
        } else if readmes.len() == 1 && !extensions.contains_key("md") {
            recommendations.push("Consider README.md for richer formatting".to_string());
        }

        ReadmeStatsReport {
            project: project.to_string(),
            ref_: ref_.map(ToString::to_string),
            total_files: readmes.len(),
            root_files,
            nested_files: readmes.len() - root_files,
            extensions,
            main_readme,
            recommendations,
        }
    }

    pub async fn search_readme(
        &self,
        project: &str,
        term: &str,
        ref_: Option<&str>,
        case_sensitive: bool,
    ) -> Result<ReadmeSearchReport> {
        if term.is_empty() {
            return Err(GlInsightsError::InvalidParameter(
                "'term' must not be empty".to_string(),
            ));
        }

        info!("Searching README of project: {project}");

        let root = self.list_tree(project, ref_, false).await?;
        let (file_path, content) = self.fetch_main_readme(project, ref_, &root).await?;
        let all_matches = find_matches(&content, term, case_sensitive);

        Ok(ReadmeSearchReport {
            project: project.to_string(),
            file_path,
            term: term.to_string(),
            case_sensitive,
            total_matches: all_matches.len(),
            matches: all_matches.into_iter().take(MAX_SEARCH_MATCHES).collect(),
        })
    }

    pub async fn readme_quality(&self, project: &str, ref_: Option<&str>) -> Result<ReadmeQualityReport> {
        info!("Checking README quality for project: {project}");

        let root = self.list_tree(project, ref_, false).await?;
        let (file_path, content) = self.fetch_main_readme(project, ref_, &root).await?;

        Ok(assess_quality(project, file_path, &content))
    }

    async fn list_tree(
        &self,
        project: &str,
        ref_: Option<&str>,
        recursive: bool,
    ) -> Result<Vec<TreeEntryDto>> {
        let mut query = Vec::new();
        if let Some(ref_) = ref_ {
            query.push(("ref", ref_.to_string()));
        }
        if recursive {
            query.push(("recursive", "true".to_string()));
        }

        fetch_all(
            self.api.as_ref(),
            &project_endpoint(project, "repository/tree"),
            &query,
            Some(MAX_TREE_ENTRIES),
        )
        .await
        .map_err(project_context(project))
    }

    /// Picks `README` or `README.md` from the root listing, else the first `README*` blob.
    async fn fetch_main_readme(
        &self,
        project: &str,
        ref_: Option<&str>,
        root: &[TreeEntryDto],
    ) -> Result<(String, String)> {
        let candidates: Vec<&TreeEntryDto> = root
            .iter()
            .filter(|e| e.is_blob() && e.name.to_lowercase().starts_with("readme"))
            .collect();

        let entry = candidates
            .iter()
            .find(|e| matches!(e.name.to_lowercase().as_str(), "readme" | "readme.md"))
            .or_else(|| candidates.first())
            .ok_or_else(|| {
                GlInsightsError::NotFound(format!(
                    "No README found in the root of project '{project}'"
                ))
            })?;

        let content = self.api.get_file(project, &entry.path, ref_).await?;
        Ok((entry.path.clone(), content))
    }
}

fn mentions_readme(entry: &TreeEntryDto) -> bool {
    entry.is_blob() && entry.name.to_lowercase().contains("readme")
}

fn directory_of(path: &str) -> &str {
    path.rsplit_once('/')
        .map_or(ROOT_DIRECTORY, |(directory, _)| directory)
}

fn extension_of(name: &str) -> String {
    name.rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .map_or_else(|| "none".to_string(), |(_, ext)| ext.to_lowercase())
}

fn text_stats(file_path: String, content: &str) -> TextStats {
    let size_chars = content.chars().count();
    let lines = content.split('\n').count();

    #[allow(clippy::cast_precision_loss)]
    let avg_line_length = size_chars as f64 / lines.max(1) as f64;

    TextStats {
        file_path,
        size_chars,
        lines,
        words: content.split_whitespace().count(),
        avg_line_length,
    }
}

/// One match per line holding `term`, with surrounding context.
fn find_matches(content: &str, term: &str, case_sensitive: bool) -> Vec<ReadmeMatch> {
    let needle = if case_sensitive {
        term.to_string()
    } else {
        term.to_lowercase()
    };
    let term_chars = term.chars().count();

    content
        .split('\n')
        .enumerate()
        .filter_map(|(index, line)| {
            let haystack = if case_sensitive {
                line.to_string()
            } else {
                line.to_lowercase()
            };
            let byte_pos = haystack.find(&needle)?;
            let chars: Vec<char> = line.chars().collect();
            // Lowercasing may change lengths; clamp to the original line
            let pos = haystack[..byte_pos].chars().count().min(chars.len());

            let start = pos.saturating_sub(SEARCH_CONTEXT_CHARS);
            let end = (pos + term_chars + SEARCH_CONTEXT_CHARS).min(chars.len());
            let mut context: String = chars[start..end].iter().collect();
            if start > 0 {
                context.insert_str(0, "...");
            }
            if end < chars.len() {
                context.push_str("...");
            }

            Some(ReadmeMatch {
                line: index + 1,
                context,
            })
        })
        .collect()
}

fn assess_quality(project: &str, file_path: String, content: &str) -> ReadmeQualityReport {
    let lines: Vec<&str> = content.split('\n').collect();
    let lower = content.to_lowercase();
    let size_chars = content.chars().count();
    let contains_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    let checks = vec![
        QualityCheck {
            name: "title",
            passed: lines.iter().take(5).any(|l| l.trim().starts_with("# ")),
        },
        QualityCheck {
            name: "description",
            passed: lines.iter().filter(|l| !l.trim().is_empty()).count() > 5,
        },
        QualityCheck {
            name: "installation",
            passed: contains_any(&["install", "setup", "getting started"]),
        },
        QualityCheck {
            name: "usage",
            passed: contains_any(&["usage", "example", "how to use"]),
        },
        QualityCheck {
            name: "license",
            passed: lower.contains("license"),
        },
        QualityCheck {
            name: "code_examples",
            passed: content.contains('`'),
        },
        QualityCheck {
            name: "links",
            passed: contains_any(&["http://", "https://", "["]),
        },
        QualityCheck {
            name: "images",
            passed: content.contains("![") || contains_any(&[".png", ".jpg"]),
        },
        QualityCheck {
            name: "length",
            passed: (51..10_000).contains(&size_chars),
        },
    ];

    let score = checks.iter().filter(|c| c.passed).count();
    let max_score = checks.len();
    let score_percentage = percentage(score, max_score);
    let rating = match score_percentage {
        p if p >= 80.0 => ReadmeRating::Excellent,
        p if p >= 60.0 => ReadmeRating::Good,
        p if p >= 40.0 => ReadmeRating::Fair,
        _ => ReadmeRating::NeedsWork,
    };

    let advice = [
        ("title", "Start the file with a '# ' title"),
        ("installation", "Add an 'Installation' or 'Getting Started' section"),
        ("usage", "Add usage examples"),
        ("code_examples", "Add code samples in ``` blocks"),
        ("links", "Link to documentation and the issue tracker"),
    ];
    let recommendations = advice
        .iter()
        .filter(|(name, _)| checks.iter().any(|c| c.name == *name && !c.passed))
        .map(|(_, text)| (*text).to_string())
        .collect();

    ReadmeQualityReport {
        project: project.to_string(),
        file_path,
        score,
        max_score,
        percentage: score_percentage,
        rating,
        checks,
        recommendations,
        lines: lines.len(),
        words: content.split_whitespace().count(),
    }
}
