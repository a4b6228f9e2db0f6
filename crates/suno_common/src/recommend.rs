//! Remediation steps per issue kind.

use crate::classify::{Issue, IssueKind};
use serde::Serialize;

/// An ordered remediation script for one issue kind, or the affirmative
/// guidance emitted when nothing is wrong (`issue` is `None`).
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<IssueKind>,
    pub steps: Vec<String>,
}

fn steps_for(kind: IssueKind) -> &'static [&'static str] {
    match kind {
        IssueKind::ConfigMissing => &[
            "create the env file next to docker-compose.yml",
            "run `sunoctl rotate` to store a fresh SUNO_COOKIE",
        ],
        IssueKind::CredentialExpired => &[
            "rotate the session cookie: `sunoctl rotate`",
            "restart the wrapper afterwards: `docker compose restart suno-api`",
        ],
        IssueKind::UpstreamResponseMalformed => &[
            "pull a newer wrapper image: `docker compose pull suno-api`",
            "recreate the service: `docker compose up -d suno-api`",
        ],
        IssueKind::ServicesNotRunning => &[
            "start the stack: `docker compose up -d`",
            "inspect the failing service: `docker compose logs --tail 50 <service>`",
        ],
    }
}

/// Ordered recommendations for the detected issues, one per kind. With
/// no issues at all, a single affirmative recommendation comes back
/// instead.
pub fn recommend(issues: &[Issue]) -> Vec<Recommendation> {
    if issues.is_empty() {
        return vec![Recommendation {
            issue: None,
            steps: vec![
                "stack healthy - no action required".to_string(),
                "re-run `sunoctl doctor` after the next cookie rotation to confirm the credential took".to_string(),
            ],
        }];
    }

    let mut out: Vec<Recommendation> = Vec::new();
    for issue in issues {
        if out.iter().any(|r| r.issue == Some(issue.kind)) {
            continue;
        }
        out.push(Recommendation {
            issue: Some(issue.kind),
            steps: steps_for(issue.kind).iter().map(|s| s.to_string()).collect(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(kind: IssueKind) -> Issue {
        Issue {
            kind,
            evidence: vec!["some.probe".to_string()],
        }
    }

    #[test]
    fn no_issues_yields_the_affirmative_recommendation() {
        let recs = recommend(&[]);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].issue.is_none());
        assert!(recs[0].steps[0].contains("healthy"));
    }

    #[test]
    fn expired_credential_recommends_rotation_first() {
        let recs = recommend(&[issue(IssueKind::CredentialExpired)]);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].steps[0].contains("rotate"));
        assert!(recs[0].steps[1].contains("restart"));
    }

    #[test]
    fn duplicate_kinds_are_deduplicated() {
        let recs = recommend(&[
            issue(IssueKind::ServicesNotRunning),
            issue(IssueKind::ServicesNotRunning),
        ]);
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn detection_order_is_preserved() {
        let recs = recommend(&[
            issue(IssueKind::ConfigMissing),
            issue(IssueKind::CredentialExpired),
        ]);
        assert_eq!(recs[0].issue, Some(IssueKind::ConfigMissing));
        assert_eq!(recs[1].issue, Some(IssueKind::CredentialExpired));
    }

    #[test]
    fn every_kind_has_steps() {
        for kind in [
            IssueKind::ConfigMissing,
            IssueKind::CredentialExpired,
            IssueKind::UpstreamResponseMalformed,
            IssueKind::ServicesNotRunning,
        ] {
            assert!(!steps_for(kind).is_empty());
        }
    }
}
