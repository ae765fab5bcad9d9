//! Run history query DTOs
//!
//! Filtering, pagination and aggregate statistics over pipeline runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::domain::run::{PipelineRun, RunStatus};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// Query string of `GET /pipeline/runs`
///
/// Empty values (`?status=&page=`) are treated as absent, as form
/// submissions send every field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRuns {
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<RunStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub page: Option<u32>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<u32>,
}

/// Parse a query value with `FromStr`, mapping a blank value to `None`
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(de::Error::custom),
    }
}

impl ListRuns {
    pub fn filter(&self) -> RunFilter {
        let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.is_empty());
        RunFilter {
            status: self.status,
            branch: non_empty(&self.branch),
            environment: non_empty(&self.environment),
        }
    }

    /// Resolve page and limit, applying defaults and bounds
    pub fn page_request(&self, max_limit: u32) -> Result<PageRequest, String> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT.min(max_limit));

        if page == 0 {
            return Err("page must be at least 1".to_string());
        }
        if limit == 0 || limit > max_limit {
            return Err(format!("limit must be between 1 and {}", max_limit));
        }

        Ok(PageRequest { page, limit })
    }
}

/// Run filters, combined with logical AND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub status: Option<RunStatus>,
    pub branch: Option<String>,
    pub environment: Option<String>,
}

impl RunFilter {
    pub fn matches(&self, run: &PipelineRun) -> bool {
        self.status.is_none_or(|status| run.status == status)
            && self.branch.as_deref().is_none_or(|b| run.branch == b)
            && self
                .environment
                .as_deref()
                .is_none_or(|e| run.environment == e)
    }
}

/// A validated, 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Cut one page out of an already sorted list
    pub fn paginate<T>(&self, items: Vec<T>) -> (Vec<T>, Pagination) {
        let total = items.len() as u64;
        let offset = (self.page as usize)
            .saturating_sub(1)
            .saturating_mul(self.limit as usize);
        let page = items
            .into_iter()
            .skip(offset)
            .take(self.limit as usize)
            .collect();

        (page, Pagination::new(self.page, self.limit, total))
    }
}

/// Pagination block of a run listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1) as u64),
        }
    }

    pub fn has_next(&self) -> bool {
        (self.page as u64) < self.total_pages
    }
}

/// Aggregates over every run matching a query, not just the returned page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: u64,
    pub pending: u64,
    pub running: u64,
    pub success: u64,
    pub failure: u64,
    pub cancelled: u64,
    /// `success / total`, 0 when there are no runs
    pub success_rate: f64,
    /// Mean duration of terminal runs, `None` when none has finished
    pub average_duration_ms: Option<f64>,
}

impl RunStats {
    pub fn collect<'a>(runs: impl IntoIterator<Item = &'a PipelineRun>) -> Self {
        let mut stats = RunStats::default();
        let mut finished = 0u64;
        let mut duration_sum = 0u64;

        for run in runs {
            stats.total += 1;
            match run.status {
                RunStatus::Pending => stats.pending += 1,
                RunStatus::Running => stats.running += 1,
                RunStatus::Success => stats.success += 1,
                RunStatus::Failure => stats.failure += 1,
                RunStatus::Cancelled => stats.cancelled += 1,
            }
            if let (true, Some(duration)) = (run.is_terminal(), run.duration_ms) {
                finished += 1;
                duration_sum += duration;
            }
        }

        if stats.total > 0 {
            stats.success_rate = stats.success as f64 / stats.total as f64;
        }
        if finished > 0 {
            stats.average_duration_ms = Some(duration_sum as f64 / finished as f64);
        }

        stats
    }

    pub fn count(&self, status: RunStatus) -> u64 {
        match status {
            RunStatus::Pending => self.pending,
            RunStatus::Running => self.running,
            RunStatus::Success => self.success,
            RunStatus::Failure => self.failure,
            RunStatus::Cancelled => self.cancelled,
        }
    }
}

/// Response of `GET /pipeline/runs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPage {
    pub runs: Vec<PipelineRun>,
    pub pagination: Pagination,
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::CommitInfo;
    use crate::domain::stage::StageOutcome;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    fn run_with(status: RunStatus, branch: &str, environment: &str, duration_s: i64) -> PipelineRun {
        let t0 = Utc::now();
        let mut run = PipelineRun::new(
            1,
            branch.to_string(),
            environment.to_string(),
            "ci".to_string(),
            CommitInfo {
                sha: "def456a".to_string(),
                message: "Add OAuth integration".to_string(),
                author: "jane".to_string(),
                timestamp: t0,
            },
            &["build".to_string()],
            t0,
        );
        let end = t0 + Duration::seconds(duration_s);
        match status {
            RunStatus::Pending => {}
            RunStatus::Running => {
                run.advance_stage("build", StageOutcome::Success, Vec::new(), t0)
                    .unwrap();
            }
            RunStatus::Success | RunStatus::Failure => {
                let outcome = if status == RunStatus::Success {
                    StageOutcome::Success
                } else {
                    StageOutcome::Failure
                };
                run.advance_stage("build", outcome, Vec::new(), t0).unwrap();
                run.advance_stage("build", outcome, Vec::new(), end).unwrap();
            }
            RunStatus::Cancelled => run.cancel(end).unwrap(),
        }
        assert_eq!(run.status, status);
        run
    }

    #[test]
    fn test_page_request_defaults() {
        let req = ListRuns::default().page_request(100).unwrap();
        assert_eq!(req, PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn test_page_request_bounds() {
        let zero_page = ListRuns {
            page: Some(0),
            ..Default::default()
        };
        assert!(zero_page.page_request(100).is_err());

        let zero_limit = ListRuns {
            limit: Some(0),
            ..Default::default()
        };
        assert!(zero_limit.page_request(100).is_err());

        let too_big = ListRuns {
            limit: Some(101),
            ..Default::default()
        };
        assert!(too_big.page_request(100).is_err());
    }

    #[test]
    fn test_empty_filter_values_are_ignored() {
        let query = ListRuns {
            branch: Some(String::new()),
            environment: Some("staging".to_string()),
            ..Default::default()
        };
        let filter = query.filter();
        assert!(filter.branch.is_none());
        assert_eq!(filter.environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_blank_query_values_are_absent() {
        let query: ListRuns = serde_json::from_str(
            r#"{"status":"","branch":"","environment":"","page":"","limit":" "}"#,
        )
        .unwrap();
        assert!(query.status.is_none());
        assert!(query.page.is_none());
        assert!(query.limit.is_none());
        assert_eq!(query.filter(), RunFilter::default());
        assert_eq!(
            query.page_request(100).unwrap(),
            PageRequest { page: 1, limit: 10 }
        );
    }

    #[test]
    fn test_query_values_parse_from_strings() {
        let query: ListRuns =
            serde_json::from_str(r#"{"status":"Failure","page":"2","limit":"5"}"#).unwrap();
        assert_eq!(query.status, Some(RunStatus::Failure));
        assert_eq!(query.page, Some(2));
        assert_eq!(query.limit, Some(5));

        assert!(serde_json::from_str::<ListRuns>(r#"{"status":"exploded"}"#).is_err());
        assert!(serde_json::from_str::<ListRuns>(r#"{"page":"-1"}"#).is_err());
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let filter = RunFilter {
            status: Some(RunStatus::Success),
            branch: Some("main".to_string()),
            environment: None,
        };
        assert!(filter.matches(&run_with(RunStatus::Success, "main", "staging", 1)));
        assert!(!filter.matches(&run_with(RunStatus::Failure, "main", "staging", 1)));
        assert!(!filter.matches(&run_with(RunStatus::Success, "develop", "staging", 1)));
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let req = PageRequest { page: 4, limit: 5 };
        let (page, pagination) = req.paginate((0..12).collect::<Vec<_>>());
        assert!(page.is_empty());
        assert_eq!(pagination.total, 12);
        assert_eq!(pagination.total_pages, 3);
        assert!(!pagination.has_next());
    }

    #[test]
    fn test_page_zero_does_not_underflow() {
        let (page, pagination) = PageRequest { page: 0, limit: 5 }.paginate(vec![1, 2, 3]);
        assert_eq!(page, vec![1, 2, 3]);
        assert_eq!(pagination.total, 3);
    }

    #[test]
    fn test_stats_over_empty_set() {
        let stats = RunStats::collect(Vec::<PipelineRun>::new().iter());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.average_duration_ms, None);
    }

    #[test]
    fn test_stats_average_uses_terminal_runs_only() {
        let runs = vec![
            run_with(RunStatus::Success, "main", "staging", 60),
            run_with(RunStatus::Failure, "main", "staging", 30),
            run_with(RunStatus::Cancelled, "main", "staging", 30),
            run_with(RunStatus::Running, "main", "staging", 0),
            run_with(RunStatus::Pending, "main", "staging", 0),
        ];
        let stats = RunStats::collect(&runs);

        assert_eq!(stats.total, 5);
        assert_eq!(stats.count(RunStatus::Success), 1);
        assert_eq!(stats.count(RunStatus::Running), 1);
        assert_eq!(stats.success_rate, 0.2);
        assert_eq!(stats.average_duration_ms, Some(40_000.0));
    }

    proptest! {
        #[test]
        fn pages_cover_every_item_once(n in 0usize..200, limit in 1u32..25) {
            let items: Vec<usize> = (0..n).collect();
            let expected_pages = n.div_ceil(limit as usize) as u64;

            let mut seen = Vec::new();
            let mut page = 1;
            loop {
                let (chunk, pagination) = PageRequest { page, limit }.paginate(items.clone());
                prop_assert_eq!(pagination.total_pages, expected_pages);
                if chunk.is_empty() {
                    break;
                }
                prop_assert!(chunk.len() <= limit as usize);
                seen.extend(chunk);
                page += 1;
            }

            prop_assert_eq!(page as u64 - 1, expected_pages);
            prop_assert_eq!(seen, items);
        }

        #[test]
        fn success_rate_is_exact_fraction(statuses in proptest::collection::vec(0usize..5, 0..60)) {
            let runs: Vec<PipelineRun> = statuses
                .iter()
                .map(|&i| run_with(RunStatus::ALL[i], "main", "staging", 5))
                .collect();
            let stats = RunStats::collect(&runs);

            let successes = runs.iter().filter(|r| r.status == RunStatus::Success).count();
            let expected = if runs.is_empty() { 0.0 } else { successes as f64 / runs.len() as f64 };
            prop_assert_eq!(stats.success_rate, expected);
            prop_assert_eq!(
                RunStatus::ALL.iter().map(|s| stats.count(*s)).sum::<u64>(),
                stats.total
            );
        }
    }
}
