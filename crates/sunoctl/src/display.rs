//! Report rendering for the operator terminal.

use owo_colors::OwoColorize;
use suno_common::config::{StackConfig, CAPTCHA_KEY, COOKIE_KEY, MIN_COOKIE_LEN};
use suno_common::env_file::EnvFile;
use suno_common::probe::ProbeStatus;
use suno_common::report::DiagnosticReport;

const SEP: &str = "------------------------------------------------------------";

/// Render the full diagnostic report: every probe line in declaration
/// order, then issues, then recommendations. Empty sections say so
/// instead of disappearing.
pub fn render_report(report: &DiagnosticReport) {
    println!();
    println!("{}", "  Stack Diagnostics".bold());
    println!("{}", SEP);

    for result in &report.results {
        let tag = match result.status {
            ProbeStatus::Passed => " ok ".green().to_string(),
            ProbeStatus::Warned => "warn".yellow().to_string(),
            ProbeStatus::Failed => "fail".red().to_string(),
            ProbeStatus::Skipped => "skip".dimmed().to_string(),
        };
        println!("[{}] {:<18} {}", tag, result.probe, result.message);
    }

    println!();
    println!("{}", "  Detected Issues".bold());
    if report.issues.is_empty() {
        println!("  none");
    }
    for issue in &report.issues {
        println!(
            "  - {} (evidence: {})",
            issue.kind,
            issue.evidence.join(", ")
        );
    }

    println!();
    println!("{}", "  Recommendations".bold());
    if report.recommendations.is_empty() {
        println!("  recommendations engine found no outstanding issues");
    }
    for rec in &report.recommendations {
        if let Some(kind) = rec.issue {
            println!("  {}:", kind);
        }
        for (i, step) in rec.steps.iter().enumerate() {
            println!("    {}. {}", i + 1, step);
        }
    }

    println!();
    println!(
        "Summary: {} ok, {} warned, {} failed, {} skipped",
        report.summary.passed,
        report.summary.warned,
        report.summary.failed,
        report.summary.skipped
    );
}

/// Read-only credential overview for `sunoctl status`.
pub fn render_status(config: &StackConfig, file: &EnvFile) {
    println!();
    println!("{}", "  Stack Credentials".bold());
    println!("{}", SEP);
    println!("  env file        {}", config.env_file.display());

    match file.get(COOKIE_KEY) {
        Some(value) => {
            let len = value.chars().count();
            let state = if len >= MIN_COOKIE_LEN {
                "ok".green().to_string()
            } else {
                "short".yellow().to_string()
            };
            println!(
                "  {:<15} {} ({} chars) [{}]",
                COOKIE_KEY,
                mask(value),
                len,
                state
            );
        }
        None => println!("  {:<15} {}", COOKIE_KEY, "not set".red()),
    }

    match file.get(CAPTCHA_KEY) {
        Some(value) => println!("  {:<15} {}", CAPTCHA_KEY, mask(value)),
        None => println!("  {:<15} {}", CAPTCHA_KEY, "not set (optional)".dimmed()),
    }
}

/// Mask a credential for display, keeping just enough to recognize it.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_values_are_fully_masked() {
        assert_eq!(mask("abc"), "***");
        assert_eq!(mask(""), "");
    }

    #[test]
    fn long_values_keep_head_and_tail() {
        let masked = mask("session_token_abcdefgh1234");
        assert_eq!(masked, "sessio...1234");
        assert!(!masked.contains("token"));
    }

    #[test]
    fn mask_counts_chars_not_bytes() {
        let masked = mask("ééééééééééééééé");
        assert_eq!(masked, "éééééé...éééé");
    }
}
