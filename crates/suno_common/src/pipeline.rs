//! Diagnostic pipeline - the fixed probe battery and its execution order.
//!
//! The engine probe runs first and gates the compose probe; everything
//! else runs concurrently afterwards. A probe whose declared dependency
//! did not pass is recorded as skipped without executing. Faults and
//! timeouts are absorbed into the probe's own result, so a single broken
//! probe never aborts the run and every declared probe ends with exactly
//! one result.

use crate::classify::ENV_FILE_MISSING;
use crate::command::{run_bounded, CommandOutcome};
use crate::config::{StackConfig, CAPTCHA_KEY, COOKIE_KEY, MIN_COOKIE_LEN, REQUIRED_SERVICES};
use crate::env_file::EnvFile;
use crate::probe::{ids, ProbeResult, ProbeStatus};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Reason recorded on probes skipped because a dependency failed.
const DEP_FAILED: &str = "dependency failed";

/// One entry of the fixed battery.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSpec {
    pub id: &'static str,
    pub description: &'static str,
    pub deps: &'static [&'static str],
    pub timeout_secs: u64,
}

/// The battery, in report order. The `service` entry fans out into one
/// sub-probe per name in [`REQUIRED_SERVICES`], judged independently.
pub const BATTERY: &[ProbeSpec] = &[
    ProbeSpec {
        id: ids::ENGINE,
        description: "container engine reachable",
        deps: &[],
        timeout_secs: 10,
    },
    ProbeSpec {
        id: ids::COMPOSE,
        description: "compose plugin available",
        deps: &[ids::ENGINE],
        timeout_secs: 10,
    },
    ProbeSpec {
        id: ids::CONFIG,
        description: "env file present and sane",
        deps: &[],
        timeout_secs: 5,
    },
    ProbeSpec {
        id: ids::SERVICES,
        description: "required services running",
        deps: &[ids::ENGINE],
        timeout_secs: 15,
    },
    ProbeSpec {
        id: ids::BACKEND_HTTP,
        description: "backend models endpoint",
        deps: &[],
        timeout_secs: 5,
    },
    ProbeSpec {
        id: ids::SUNO_API_HTTP,
        description: "wrapper root endpoint",
        deps: &[],
        timeout_secs: 5,
    },
    ProbeSpec {
        id: ids::SUNO_API_LOGS,
        description: "wrapper log tail",
        deps: &[ids::ENGINE],
        timeout_secs: 15,
    },
];

fn spec(id: &str) -> &'static ProbeSpec {
    BATTERY
        .iter()
        .find(|s| s.id == id)
        .expect("probe id missing from battery")
}

fn timeout_of(id: &str) -> Duration {
    Duration::from_secs(spec(id).timeout_secs)
}

fn dep_ok(results: &[ProbeResult], id: &str) -> bool {
    results
        .iter()
        .find(|r| r.probe == id)
        .map(|r| matches!(r.status, ProbeStatus::Passed | ProbeStatus::Warned))
        .unwrap_or(false)
}

fn deps_met(spec: &ProbeSpec, results: &[ProbeResult]) -> bool {
    spec.deps.iter().all(|d| dep_ok(results, d))
}

/// Run the whole battery. Always returns one result per declared probe,
/// in declaration order, no matter how many of them fail.
pub async fn run_diagnostics(config: &StackConfig) -> Vec<ProbeResult> {
    for spec in BATTERY {
        debug!("declared probe {} - {}", spec.id, spec.description);
    }

    let mut results = Vec::new();

    results.push(check_engine(config).await);

    if deps_met(spec(ids::COMPOSE), &results) {
        results.push(check_compose(config).await);
    } else {
        results.push(ProbeResult::skipped(ids::COMPOSE, DEP_FAILED));
    }

    let services_gated = !deps_met(spec(ids::SERVICES), &results);
    let logs_gated = !deps_met(spec(ids::SUNO_API_LOGS), &results);

    let (env_shape, services, backend, wrapper, logs) = tokio::join!(
        check_env_shape(config),
        check_services(config, services_gated),
        check_backend_http(config),
        check_wrapper_http(config),
        check_wrapper_logs(config, logs_gated),
    );

    results.push(env_shape);
    results.extend(services);
    results.push(backend);
    results.push(wrapper);
    results.push(logs);

    debug!("pipeline produced {} probe results", results.len());
    results
}

async fn check_engine(config: &StackConfig) -> ProbeResult {
    let outcome = run_bounded(
        &config.docker_bin,
        &["info", "--format", "{{.ServerVersion}}"],
        &config.stack_dir,
        timeout_of(ids::ENGINE),
    )
    .await;

    match outcome {
        CommandOutcome::Completed {
            success: true,
            stdout,
            ..
        } => ProbeResult::passed(ids::ENGINE, format!("engine {} answering", stdout.trim())),
        CommandOutcome::Completed { stderr, .. } => {
            ProbeResult::failed(ids::ENGINE, "container engine not reachable")
                .with_evidence(stderr)
        }
        CommandOutcome::TimedOut => ProbeResult::failed(ids::ENGINE, "timed out"),
        CommandOutcome::Faulted(e) => {
            ProbeResult::failed(ids::ENGINE, "container engine not reachable").with_evidence(e)
        }
    }
}

async fn check_compose(config: &StackConfig) -> ProbeResult {
    let outcome = run_bounded(
        &config.docker_bin,
        &["compose", "version", "--short"],
        &config.stack_dir,
        timeout_of(ids::COMPOSE),
    )
    .await;

    match outcome {
        CommandOutcome::Completed {
            success: true,
            stdout,
            ..
        } => ProbeResult::passed(ids::COMPOSE, format!("compose {}", stdout.trim())),
        CommandOutcome::Completed { stderr, .. } => {
            ProbeResult::failed(ids::COMPOSE, "compose plugin not available").with_evidence(stderr)
        }
        CommandOutcome::TimedOut => ProbeResult::failed(ids::COMPOSE, "timed out"),
        CommandOutcome::Faulted(e) => {
            ProbeResult::failed(ids::COMPOSE, "compose plugin not available").with_evidence(e)
        }
    }
}

/// Configuration presence and shape. The credential key must exist; a
/// short cookie or a missing captcha key is worth a warning, not a
/// failure.
async fn check_env_shape(config: &StackConfig) -> ProbeResult {
    if !config.env_file.exists() {
        return ProbeResult::failed(
            ids::CONFIG,
            format!("env file not found at {}", config.env_file.display()),
        )
        .with_evidence(ENV_FILE_MISSING);
    }

    let file = match EnvFile::load(&config.env_file) {
        Ok(file) => file,
        Err(e) => {
            return ProbeResult::failed(
                ids::CONFIG,
                format!("env file unreadable: {}", config.env_file.display()),
            )
            .with_evidence(e.to_string())
        }
    };

    let Some(cookie) = file.get(COOKIE_KEY) else {
        return ProbeResult::failed(ids::CONFIG, format!("{} is not set", COOKIE_KEY));
    };

    let mut warnings = Vec::new();
    let cookie_len = cookie.chars().count();
    if cookie_len < MIN_COOKIE_LEN {
        warnings.push(format!(
            "{} is only {} chars, expected at least {}",
            COOKIE_KEY, cookie_len, MIN_COOKIE_LEN
        ));
    }
    if file.get(CAPTCHA_KEY).is_none() {
        warnings.push(format!("{} is not set", CAPTCHA_KEY));
    }

    if warnings.is_empty() {
        ProbeResult::passed(
            ids::CONFIG,
            format!("{} present ({} chars)", COOKIE_KEY, cookie_len),
        )
    } else {
        ProbeResult::warned(ids::CONFIG, warnings.join("; "))
    }
}

#[derive(Debug, Deserialize)]
struct ComposePsEntry {
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "State")]
    state: String,
}

/// `docker compose ps --format json` emits a JSON array on older compose
/// releases and newline-delimited objects on current ones.
fn parse_compose_ps(stdout: &str) -> Vec<ComposePsEntry> {
    if let Ok(list) = serde_json::from_str::<Vec<ComposePsEntry>>(stdout.trim()) {
        return list;
    }
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str(line.trim()).ok())
        .collect()
}

/// One sub-probe per required service, all judged from a single listing.
/// A missing or stopped service fails its own sub-probe only.
async fn check_services(config: &StackConfig, gated: bool) -> Vec<ProbeResult> {
    let probe_id = |name: &str| format!("{}{}", ids::SERVICE_PREFIX, name);

    if gated {
        return REQUIRED_SERVICES
            .iter()
            .map(|name| ProbeResult::skipped(probe_id(name), DEP_FAILED))
            .collect();
    }

    let outcome = run_bounded(
        &config.docker_bin,
        &["compose", "ps", "--format", "json"],
        &config.stack_dir,
        timeout_of(ids::SERVICES),
    )
    .await;

    match outcome {
        CommandOutcome::Completed {
            success: true,
            stdout,
            ..
        } => {
            let entries = parse_compose_ps(&stdout);
            REQUIRED_SERVICES
                .iter()
                .map(|name| match entries.iter().find(|e| e.service == *name) {
                    Some(e) if e.state == "running" => {
                        ProbeResult::passed(probe_id(name), format!("{} is running", name))
                    }
                    Some(e) => ProbeResult::failed(
                        probe_id(name),
                        format!("{} is {}", name, e.state),
                    ),
                    None => ProbeResult::failed(
                        probe_id(name),
                        format!("{} has no container", name),
                    ),
                })
                .collect()
        }
        CommandOutcome::Completed { stderr, .. } => REQUIRED_SERVICES
            .iter()
            .map(|name| {
                ProbeResult::failed(probe_id(name), "could not list services")
                    .with_evidence(stderr.clone())
            })
            .collect(),
        CommandOutcome::TimedOut => REQUIRED_SERVICES
            .iter()
            .map(|name| ProbeResult::failed(probe_id(name), "timed out"))
            .collect(),
        CommandOutcome::Faulted(e) => REQUIRED_SERVICES
            .iter()
            .map(|name| {
                ProbeResult::failed(probe_id(name), "could not list services")
                    .with_evidence(e.clone())
            })
            .collect(),
    }
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<String>,
}

/// Backend health plus its advertised model list. A reachable backend
/// whose body does not parse is degraded, not down.
async fn check_backend_http(config: &StackConfig) -> ProbeResult {
    let url = format!("{}/models", config.backend_url.trim_end_matches('/'));
    let client = match reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            return ProbeResult::failed(ids::BACKEND_HTTP, "http client unavailable")
                .with_evidence(e.to_string())
        }
    };

    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => match resp.json::<ModelsResponse>().await {
            Ok(body) => ProbeResult::passed(
                ids::BACKEND_HTTP,
                format!("models available: {}", body.models.join(", ")),
            ),
            Err(e) => ProbeResult::warned(
                ids::BACKEND_HTTP,
                "backend reachable but the models list did not parse",
            )
            .with_evidence(e.to_string()),
        },
        Ok(resp) => ProbeResult::failed(
            ids::BACKEND_HTTP,
            format!("backend answered HTTP {}", resp.status()),
        ),
        Err(e) if e.is_timeout() => ProbeResult::failed(ids::BACKEND_HTTP, "timed out"),
        Err(e) => ProbeResult::failed(ids::BACKEND_HTTP, "backend not reachable")
            .with_evidence(e.to_string()),
    }
}

async fn check_wrapper_http(config: &StackConfig) -> ProbeResult {
    let url = format!("{}/", config.suno_api_url.trim_end_matches('/'));
    let client = match reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            return ProbeResult::failed(ids::SUNO_API_HTTP, "http client unavailable")
                .with_evidence(e.to_string())
        }
    };

    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            ProbeResult::passed(ids::SUNO_API_HTTP, "wrapper answering")
        }
        Ok(resp) => ProbeResult::warned(
            ids::SUNO_API_HTTP,
            format!("wrapper reachable but answered HTTP {}", resp.status()),
        ),
        Err(e) if e.is_timeout() => ProbeResult::failed(ids::SUNO_API_HTTP, "timed out"),
        Err(e) => ProbeResult::failed(ids::SUNO_API_HTTP, "wrapper not reachable")
            .with_evidence(e.to_string()),
    }
}

/// Bounded tail of the wrapper's logs, kept as evidence for the
/// classifier. Capturing the tail is a pass even when the lines inside
/// it spell trouble; the classifier owns that judgment.
async fn check_wrapper_logs(config: &StackConfig, gated: bool) -> ProbeResult {
    if gated {
        return ProbeResult::skipped(ids::SUNO_API_LOGS, DEP_FAILED);
    }

    let tail = config.log_tail.to_string();
    let outcome = run_bounded(
        &config.docker_bin,
        &["compose", "logs", "--no-color", "--tail", &tail, "suno-api"],
        &config.stack_dir,
        timeout_of(ids::SUNO_API_LOGS),
    )
    .await;

    match outcome {
        CommandOutcome::Completed {
            success: true,
            stdout,
            ..
        } => {
            let lines = stdout.lines().count();
            ProbeResult::passed(
                ids::SUNO_API_LOGS,
                format!("captured {} log lines", lines),
            )
            .with_evidence(stdout)
        }
        CommandOutcome::Completed { stderr, .. } => {
            ProbeResult::failed(ids::SUNO_API_LOGS, "could not read wrapper logs")
                .with_evidence(stderr)
        }
        CommandOutcome::TimedOut => ProbeResult::failed(ids::SUNO_API_LOGS, "timed out"),
        CommandOutcome::Faulted(e) => {
            ProbeResult::failed(ids::SUNO_API_LOGS, "could not read wrapper logs").with_evidence(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn offline_config(dir: &Path) -> StackConfig {
        StackConfig {
            env_file: dir.join(".env"),
            stack_dir: dir.to_path_buf(),
            docker_bin: "definitely-not-docker".to_string(),
            backend_url: "http://127.0.0.1:9".to_string(),
            suno_api_url: "http://127.0.0.1:9".to_string(),
            http_timeout: Duration::from_secs(2),
            log_tail: 50,
        }
    }

    fn expected_ids() -> Vec<String> {
        let mut ids_list = vec![
            ids::ENGINE.to_string(),
            ids::COMPOSE.to_string(),
            ids::CONFIG.to_string(),
        ];
        for name in REQUIRED_SERVICES {
            ids_list.push(format!("{}{}", ids::SERVICE_PREFIX, name));
        }
        ids_list.push(ids::BACKEND_HTTP.to_string());
        ids_list.push(ids::SUNO_API_HTTP.to_string());
        ids_list.push(ids::SUNO_API_LOGS.to_string());
        ids_list
    }

    #[tokio::test]
    async fn one_result_per_probe_even_when_everything_is_down() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());

        let results = run_diagnostics(&config).await;

        let produced: Vec<String> = results.iter().map(|r| r.probe.clone()).collect();
        assert_eq!(produced, expected_ids());
    }

    #[tokio::test]
    async fn engine_failure_skips_dependents_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());

        let results = run_diagnostics(&config).await;
        let by_id = |id: &str| results.iter().find(|r| r.probe == id).unwrap();

        assert_eq!(by_id(ids::ENGINE).status, ProbeStatus::Failed);
        assert_eq!(by_id(ids::COMPOSE).status, ProbeStatus::Skipped);
        assert_eq!(by_id("service.backend").status, ProbeStatus::Skipped);
        assert_eq!(by_id(ids::SUNO_API_LOGS).status, ProbeStatus::Skipped);

        // HTTP and config probes have no engine dependency and still run.
        assert_ne!(by_id(ids::CONFIG).status, ProbeStatus::Skipped);
        assert_ne!(by_id(ids::BACKEND_HTTP).status, ProbeStatus::Skipped);
    }

    #[tokio::test]
    async fn missing_env_file_is_flagged_with_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());

        let results = run_diagnostics(&config).await;
        let config_result = results.iter().find(|r| r.probe == ids::CONFIG).unwrap();
        assert_eq!(config_result.status, ProbeStatus::Failed);
        assert_eq!(config_result.evidence, ENV_FILE_MISSING);
    }

    #[tokio::test]
    async fn short_cookie_and_missing_captcha_warn() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config(dir.path());
        config.env_file = dir.path().join(".env");
        std::fs::write(&config.env_file, "SUNO_COOKIE=\"tiny\"\n").unwrap();

        let result = check_env_shape(&config).await;
        assert_eq!(result.status, ProbeStatus::Warned);
        assert!(result.message.contains("SUNO_COOKIE"));
        assert!(result.message.contains("TWOCAPTCHA_KEY"));
    }

    #[tokio::test]
    async fn healthy_env_shape_passes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config(dir.path());
        config.env_file = dir.path().join(".env");
        let cookie = "c".repeat(150);
        std::fs::write(
            &config.env_file,
            format!("SUNO_COOKIE=\"{}\"\nTWOCAPTCHA_KEY=\"k\"\n", cookie),
        )
        .unwrap();

        let result = check_env_shape(&config).await;
        assert_eq!(result.status, ProbeStatus::Passed);
    }

    #[test]
    fn compose_ps_parses_array_output() {
        let out = r#"[{"Service":"backend","State":"running"},{"Service":"db","State":"exited"}]"#;
        let entries = parse_compose_ps(out);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].service, "backend");
        assert_eq!(entries[1].state, "exited");
    }

    #[test]
    fn compose_ps_parses_ndjson_output() {
        let out = "{\"Service\":\"backend\",\"State\":\"running\"}\n{\"Service\":\"redis\",\"State\":\"running\"}\n";
        let entries = parse_compose_ps(out);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].service, "redis");
    }

    #[test]
    fn battery_dependency_edges() {
        assert!(spec(ids::ENGINE).deps.is_empty());
        assert_eq!(spec(ids::COMPOSE).deps, &[ids::ENGINE]);
        assert_eq!(spec(ids::SERVICES).deps, &[ids::ENGINE]);
        assert!(spec(ids::BACKEND_HTTP).deps.is_empty());
    }

    #[test]
    fn deps_met_requires_a_recorded_pass() {
        let compose = spec(ids::COMPOSE);
        assert!(!deps_met(compose, &[]));
        assert!(!deps_met(
            compose,
            &[ProbeResult::failed(ids::ENGINE, "down")]
        ));
        assert!(deps_met(
            compose,
            &[ProbeResult::passed(ids::ENGINE, "up")]
        ));
    }
}
