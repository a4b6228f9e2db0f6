//! Aggregated diagnostic report for one run.

use crate::classify::{classify, Issue};
use crate::probe::{ProbeResult, ProbeStatus};
use crate::recommend::{recommend, Recommendation};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status counts over the whole battery.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Everything one diagnostic run produced. Immutable once built; the
/// next run builds a fresh one.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub generated_at: DateTime<Utc>,
    pub results: Vec<ProbeResult>,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<Recommendation>,
    pub summary: Summary,
}

impl DiagnosticReport {
    /// Classify the results and attach recommendations.
    pub fn from_results(results: Vec<ProbeResult>) -> Self {
        let issues = classify(&results);
        let recommendations = recommend(&issues);

        let mut summary = Summary::default();
        for result in &results {
            match result.status {
                ProbeStatus::Passed => summary.passed += 1,
                ProbeStatus::Warned => summary.warned += 1,
                ProbeStatus::Failed => summary.failed += 1,
                ProbeStatus::Skipped => summary.skipped += 1,
            }
        }

        Self {
            generated_at: Utc::now(),
            results,
            issues,
            recommendations,
            summary,
        }
    }

    /// Process exit code: failures beat warnings, warnings beat clean.
    pub fn exit_code(&self) -> i32 {
        if self.summary.failed > 0 {
            1
        } else if self.summary.warned > 0 {
            2
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ENV_FILE_MISSING;
    use crate::probe::ids;

    #[test]
    fn healthy_report_exits_zero_with_affirmative_recommendation() {
        let report = DiagnosticReport::from_results(vec![
            ProbeResult::passed(ids::ENGINE, "up"),
            ProbeResult::passed(ids::COMPOSE, "up"),
        ]);
        assert_eq!(report.exit_code(), 0);
        assert!(report.issues.is_empty());
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].issue.is_none());
    }

    #[test]
    fn warnings_without_failures_exit_two() {
        let report = DiagnosticReport::from_results(vec![
            ProbeResult::passed(ids::ENGINE, "up"),
            ProbeResult::warned(ids::CONFIG, "short cookie"),
        ]);
        assert_eq!(report.exit_code(), 2);
        assert_eq!(report.summary.warned, 1);
    }

    #[test]
    fn any_failure_exits_one() {
        let report = DiagnosticReport::from_results(vec![
            ProbeResult::warned(ids::CONFIG, "short cookie"),
            ProbeResult::failed(ids::ENGINE, "down"),
        ]);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn missing_config_flows_through_to_recommendations() {
        let report = DiagnosticReport::from_results(vec![ProbeResult::failed(
            ids::CONFIG,
            "env file not found",
        )
        .with_evidence(ENV_FILE_MISSING)]);
        assert_eq!(report.issues.len(), 1);
        let steps = &report.recommendations[0].steps;
        assert!(steps.iter().any(|s| s.contains("rotate")));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = DiagnosticReport::from_results(vec![ProbeResult::skipped(
            ids::COMPOSE,
            "dependency failed",
        )]);
        let json = serde_json::to_string_pretty(&report).unwrap();
        assert!(json.contains("\"skipped\": 1"));
        assert!(json.contains("dependency failed"));
    }
}
