//! Runtime configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Compose services the stack requires to be running.
pub const REQUIRED_SERVICES: &[&str] = &["backend", "suno-api", "db", "redis"];

/// Primary credential key in the env file.
pub const COOKIE_KEY: &str = "SUNO_COOKIE";

/// Optional captcha solver key.
pub const CAPTCHA_KEY: &str = "TWOCAPTCHA_KEY";

/// A session cookie shorter than this is almost certainly truncated.
pub const MIN_COOKIE_LEN: usize = 100;

/// Where the stack lives and how to reach it.
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// Env file consumed by compose.
    pub env_file: PathBuf,
    /// Directory holding docker-compose.yml; compose commands run here.
    pub stack_dir: PathBuf,
    /// Container engine binary.
    pub docker_bin: String,
    /// Web backend base URL.
    pub backend_url: String,
    /// Wrapped third-party API service base URL.
    pub suno_api_url: String,
    /// Deadline for each HTTP probe.
    pub http_timeout: Duration,
    /// Log lines fetched from the wrapper for classification.
    pub log_tail: usize,
}

impl StackConfig {
    /// Load from environment variables, with defaults matching the
    /// standard compose deployment.
    pub fn from_env() -> Self {
        let env_file = env::var("SUNO_ENV_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".env"));
        let stack_dir = env::var("SUNO_STACK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        let docker_bin = env::var("SUNO_DOCKER_BIN").unwrap_or_else(|_| "docker".to_string());
        let backend_url =
            env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        let suno_api_url =
            env::var("SUNO_API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self {
            env_file,
            stack_dir,
            docker_bin,
            backend_url,
            suno_api_url,
            http_timeout: Duration::from_secs(5),
            log_tail: 50,
        }
    }
}
