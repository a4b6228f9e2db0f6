//! Command handlers for sunoctl.
//!
//! Mutation-path errors are fatal and leave the env file untouched; the
//! doctor path absorbs every probe fault and always prints a report.

use anyhow::{bail, Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use suno_common::config::{StackConfig, CAPTCHA_KEY, COOKIE_KEY};
use suno_common::env_file::{self, EntryChange, EnvFile};
use suno_common::pipeline;
use suno_common::report::DiagnosticReport;
use suno_common::sanitize::{escape_interpolation, needs_escaping};

use crate::display;

/// What a rotation changed, for the confirmation lines.
pub struct RotationOutcome {
    pub cookie_change: EntryChange,
    pub captcha_change: Option<EntryChange>,
    pub backup: Option<PathBuf>,
}

/// Core of the rotation flow, separate from the interactive prompt so
/// the contract can be exercised directly.
///
/// Rejects an empty or whitespace-only cookie before anything touches
/// the env file. Both supplied values are escaped for compose
/// interpolation on this path.
pub fn apply_rotation(
    config: &StackConfig,
    cookie: &str,
    captcha: Option<&str>,
) -> Result<RotationOutcome> {
    let cookie = cookie.trim();
    if cookie.is_empty() {
        bail!("empty {} supplied - nothing was changed", COOKIE_KEY);
    }

    let mut file = EnvFile::load(&config.env_file)
        .with_context(|| format!("failed to read {}", config.env_file.display()))?;

    let cookie_change = file.upsert(COOKIE_KEY, &escape_interpolation(cookie));
    let captcha_change = captcha
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| file.upsert(CAPTCHA_KEY, &escape_interpolation(c)));

    let receipt = file.save().context("could not persist the env file")?;
    Ok(RotationOutcome {
        cookie_change,
        captcha_change,
        backup: receipt.backup,
    })
}

pub async fn rotate() -> Result<()> {
    let config = StackConfig::from_env();

    let cookie = prompt(&format!("paste the new {} value: ", COOKIE_KEY))?;
    let captcha = prompt(&format!("{} (optional, enter to skip): ", CAPTCHA_KEY))?;

    let outcome = apply_rotation(&config, &cookie, Some(&captcha))?;

    announce(COOKIE_KEY, outcome.cookie_change, &config);
    if let Some(change) = outcome.captcha_change {
        announce(CAPTCHA_KEY, change, &config);
    }
    if let Some(backup) = outcome.backup {
        println!("previous env file backed up to {}", backup.display());
    }
    Ok(())
}

/// Plain reconciliation: stores the value exactly as supplied, no
/// escaping. `fix` exists for repairing what this path writes.
pub async fn update(key: &str, value: &str) -> Result<()> {
    let config = StackConfig::from_env();
    if !env_file::is_valid_key(key) {
        bail!("invalid key name: {}", key);
    }

    let mut file = EnvFile::load(&config.env_file)
        .with_context(|| format!("failed to read {}", config.env_file.display()))?;
    let change = file.upsert(key, value);
    file.save().context("could not persist the env file")?;

    announce(key, change, &config);
    Ok(())
}

/// What the repair flow did.
pub enum FixOutcome {
    AlreadySafe,
    Escaped { backup: Option<PathBuf> },
}

/// Repair flow: re-escape the stored cookie. Escaping is idempotent, so
/// running this on an already-escaped value changes nothing.
pub fn apply_fix(config: &StackConfig) -> Result<FixOutcome> {
    let mut file = EnvFile::load(&config.env_file)
        .with_context(|| format!("failed to read {}", config.env_file.display()))?;

    let Some(current) = file.get(COOKIE_KEY).map(str::to_string) else {
        bail!(
            "{} is not set in {} - run `sunoctl rotate` first",
            COOKIE_KEY,
            config.env_file.display()
        );
    };

    if !needs_escaping(&current) {
        return Ok(FixOutcome::AlreadySafe);
    }

    file.upsert(COOKIE_KEY, &escape_interpolation(&current));
    let receipt = file.save().context("could not persist the env file")?;
    Ok(FixOutcome::Escaped {
        backup: receipt.backup,
    })
}

pub async fn fix() -> Result<()> {
    let config = StackConfig::from_env();
    match apply_fix(&config)? {
        FixOutcome::AlreadySafe => {
            println!("{} already safe for compose interpolation", COOKIE_KEY);
        }
        FixOutcome::Escaped { backup } => {
            println!("{} re-escaped for compose interpolation", COOKIE_KEY);
            if let Some(backup) = backup {
                println!("previous env file backed up to {}", backup.display());
            }
        }
    }
    Ok(())
}

pub async fn doctor(json: bool) -> Result<()> {
    let config = StackConfig::from_env();
    let results = pipeline::run_diagnostics(&config).await;
    let report = DiagnosticReport::from_results(results);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display::render_report(&report);
    }

    std::process::exit(report.exit_code());
}

pub async fn status() -> Result<()> {
    let config = StackConfig::from_env();
    let file = EnvFile::load(&config.env_file)
        .with_context(|| format!("failed to read {}", config.env_file.display()))?;
    display::render_status(&config, &file);
    Ok(())
}

fn announce(key: &str, change: EntryChange, config: &StackConfig) {
    match change {
        EntryChange::Added => println!("{} added to {}", key, config.env_file.display()),
        EntryChange::Updated => println!("{} updated in {}", key, config.env_file.display()),
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
