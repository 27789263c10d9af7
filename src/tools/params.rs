use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GlInsightsError, Result};
use crate::providers::gitlab::Timeframe;

pub const DEFAULT_PIPELINE_LIMIT: u32 = 20;
pub const MAX_PIPELINE_LIMIT: u32 = 100;
pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const MAX_WINDOW_DAYS: i64 = 365;
pub const DEFAULT_ACTIVITY_DAYS: i64 = 7;
pub const DEFAULT_README_CHARS: usize = 5000;
pub const MAX_README_CHARS: usize = 1_000_000;

/// Deserializes tool arguments, reporting any mismatch as an invalid parameter.
/// A missing argument object is treated as empty.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        args
    };

    serde_json::from_value(args).map_err(|e| GlInsightsError::InvalidParameter(e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectParams {
    pub project: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineHealthParams {
    pub project: Option<String>,
    pub limit: Option<u32>,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
}

impl PipelineHealthParams {
    pub fn limit(&self) -> Result<usize> {
        let limit = self.limit.unwrap_or(DEFAULT_PIPELINE_LIMIT);
        if !(1..=MAX_PIPELINE_LIMIT).contains(&limit) {
            return Err(GlInsightsError::InvalidParameter(format!(
                "'limit' must be between 1 and {MAX_PIPELINE_LIMIT}, got {limit}"
            )));
        }
        Ok(limit as usize)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContributorParams {
    pub project: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub days: Option<i64>,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
}

impl ContributorParams {
    /// Resolves the window: `until` defaults to now, `since` to `days` before `until`.
    pub fn window(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        if self.since.is_some() && self.days.is_some() {
            return Err(GlInsightsError::InvalidParameter(
                "'since' and 'days' cannot be combined".to_string(),
            ));
        }

        let until = match &self.until {
            Some(raw) => parse_timestamp("until", raw)?,
            None => now,
        };

        let since = match (&self.since, self.days) {
            (Some(raw), _) => parse_timestamp("since", raw)?,
            (None, days) => until - Duration::days(window_days(days, DEFAULT_WINDOW_DAYS)?),
        };

        Ok((since, until))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyParams {
    pub project: Option<String>,
    pub manifest_path: Option<String>,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeRequestParams {
    pub project: Option<String>,
    #[serde(default)]
    pub timeframe: Timeframe,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueParams {
    pub project: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoraParams {
    pub project: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DoraParams {
    /// `end_date` defaults to today and `start_date` to 30 days before it.
    pub fn range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let end = match &self.end_date {
            Some(raw) => parse_date("end_date", raw)?,
            None => today,
        };
        let start = match &self.start_date {
            Some(raw) => parse_date("start_date", raw)?,
            None => end - Duration::days(DEFAULT_WINDOW_DAYS),
        };
        Ok((start, end))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityParams {
    pub project: Option<String>,
    pub days: Option<i64>,
}

impl ActivityParams {
    pub fn days(&self) -> Result<i64> {
        window_days(self.days, DEFAULT_ACTIVITY_DAYS)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupParams {
    pub group: String,
    #[serde(default)]
    pub with_metrics: bool,
}

impl GroupParams {
    pub fn group(&self) -> Result<&str> {
        let group = self.group.trim();
        if group.is_empty() {
            return Err(GlInsightsError::InvalidParameter(
                "'group' must not be empty".to_string(),
            ));
        }
        Ok(group)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadmeParams {
    pub project: Option<String>,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadReadmeParams {
    pub project: Option<String>,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
    pub max_chars: Option<usize>,
}

impl ReadReadmeParams {
    pub fn max_chars(&self) -> Result<usize> {
        let max_chars = self.max_chars.unwrap_or(DEFAULT_README_CHARS);
        if !(1..=MAX_README_CHARS).contains(&max_chars) {
            return Err(GlInsightsError::InvalidParameter(format!(
                "'max_chars' must be between 1 and {MAX_README_CHARS}, got {max_chars}"
            )));
        }
        Ok(max_chars)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchReadmeParams {
    pub project: Option<String>,
    pub term: String,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
}

fn window_days(days: Option<i64>, default: i64) -> Result<i64> {
    let days = days.unwrap_or(default);
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(GlInsightsError::InvalidParameter(format!(
            "'days' must be between 1 and {MAX_WINDOW_DAYS}, got {days}"
        )));
    }
    Ok(days)
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
        GlInsightsError::InvalidParameter(format!("'{field}' must be a YYYY-MM-DD date: {e}"))
    })
}

/// Accepts RFC 3339 timestamps or plain dates (midnight UTC).
fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| {
            GlInsightsError::InvalidParameter(format!(
                "'{field}' must be an RFC 3339 timestamp or a YYYY-MM-DD date, got '{raw}'"
            ))
        })
}
