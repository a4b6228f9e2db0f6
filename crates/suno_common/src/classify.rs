//! Maps probe evidence onto the known failure modes of the stack.
//!
//! The wrapper does not report errors in any structured way, so the log
//! rules are substring signatures over a bounded tail. The table is data;
//! extending it never touches pipeline control flow.

use crate::probe::{ids, ProbeResult, ProbeStatus};
use serde::Serialize;
use std::fmt;

/// Evidence marker the config probe records when the env file is absent.
pub const ENV_FILE_MISSING: &str = "env-file-missing";

/// Failure modes this tool knows how to talk about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ConfigMissing,
    CredentialExpired,
    UpstreamResponseMalformed,
    ServicesNotRunning,
}

impl IssueKind {
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::ConfigMissing => "configuration file missing",
            IssueKind::CredentialExpired => "session cookie expired",
            IssueKind::UpstreamResponseMalformed => "upstream returned a malformed response",
            IssueKind::ServicesNotRunning => "required services not running",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified failure mode and the probes that evidence it.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub evidence: Vec<String>,
}

/// Log lines that identify a failure mode in the wrapper's tail.
const LOG_SIGNATURES: &[(&str, IssueKind)] = &[
    ("status code 503", IssueKind::CredentialExpired),
    ("503 Service Unavailable", IssueKind::CredentialExpired),
    ("Service Unavailable", IssueKind::CredentialExpired),
    ("Cannot read properties of null", IssueKind::UpstreamResponseMalformed),
    ("returned an empty response", IssueKind::UpstreamResponseMalformed),
];

/// Derive the issue set for one run. Pure: the same results always
/// produce the same issues, in any order.
pub fn classify(results: &[ProbeResult]) -> Vec<Issue> {
    let mut issues: Vec<Issue> = Vec::new();

    for result in results {
        if result.probe == ids::CONFIG
            && result.status == ProbeStatus::Failed
            && result.evidence == ENV_FILE_MISSING
        {
            record(&mut issues, IssueKind::ConfigMissing, &result.probe);
        }

        if result.probe.starts_with(ids::SERVICE_PREFIX) && result.status == ProbeStatus::Failed {
            record(&mut issues, IssueKind::ServicesNotRunning, &result.probe);
        }

        if result.probe == ids::SUNO_API_LOGS && !result.evidence.is_empty() {
            for (needle, kind) in LOG_SIGNATURES {
                if result.evidence.contains(needle) {
                    record(&mut issues, *kind, &result.probe);
                }
            }
        }
    }

    issues
}

fn record(issues: &mut Vec<Issue>, kind: IssueKind, probe: &str) {
    if let Some(existing) = issues.iter_mut().find(|i| i.kind == kind) {
        if !existing.evidence.iter().any(|p| p == probe) {
            existing.evidence.push(probe.to_string());
        }
    } else {
        issues.push(Issue {
            kind,
            evidence: vec![probe.to_string()],
        });
    }
}
