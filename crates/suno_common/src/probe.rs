//! Probe identifiers, statuses, and results.

use serde::Serialize;
use std::fmt;

/// Stable probe identifiers, in report order.
pub mod ids {
    pub const ENGINE: &str = "docker.engine";
    pub const COMPOSE: &str = "docker.compose";
    pub const CONFIG: &str = "config.env";
    /// Parent id for the per-service liveness sub-probes.
    pub const SERVICES: &str = "service";
    /// Sub-probe ids are `service.<name>`.
    pub const SERVICE_PREFIX: &str = "service.";
    pub const BACKEND_HTTP: &str = "backend.http";
    pub const SUNO_API_HTTP: &str = "suno-api.http";
    pub const SUNO_API_LOGS: &str = "suno-api.logs";
}

/// Terminal status of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Passed,
    Warned,
    Failed,
    Skipped,
}

impl ProbeStatus {
    /// Short tag used in the rendered report.
    pub fn tag(&self) -> &'static str {
        match self {
            ProbeStatus::Passed => "ok",
            ProbeStatus::Warned => "warn",
            ProbeStatus::Failed => "fail",
            ProbeStatus::Skipped => "skip",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One probe's outcome. Exactly one of these exists per declared probe
/// per diagnostic run, and it never changes once produced.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub probe: String,
    pub status: ProbeStatus,
    pub message: String,
    /// Raw command or HTTP output retained for classification.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub evidence: String,
}

impl ProbeResult {
    fn new(probe: impl Into<String>, status: ProbeStatus, message: impl Into<String>) -> Self {
        Self {
            probe: probe.into(),
            status,
            message: message.into(),
            evidence: String::new(),
        }
    }

    pub fn passed(probe: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(probe, ProbeStatus::Passed, message)
    }

    pub fn warned(probe: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(probe, ProbeStatus::Warned, message)
    }

    pub fn failed(probe: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(probe, ProbeStatus::Failed, message)
    }

    pub fn skipped(probe: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(probe, ProbeStatus::Skipped, reason)
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tags() {
        assert_eq!(ProbeStatus::Passed.tag(), "ok");
        assert_eq!(ProbeStatus::Skipped.to_string(), "skip");
    }

    #[test]
    fn evidence_is_omitted_from_json_when_empty() {
        let result = ProbeResult::passed(ids::ENGINE, "fine");
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("evidence"));

        let result = result.with_evidence("raw output");
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("raw output"));
    }
}
