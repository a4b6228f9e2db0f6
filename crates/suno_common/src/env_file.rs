//! Line-oriented env file store with backup-then-replace persistence.
//!
//! The compose file reads the stack's credentials from a flat `.env`.
//! Edits here must never disturb unrelated content: comments and blank
//! lines pass through byte-for-byte, and an upserted key keeps its
//! original position in the file.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that abort a mutation. The on-disk file is untouched whenever
/// one of these is returned.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to back up env file to {path}: {source}")]
    Backup {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to replace {path}: {source}")]
    Replace {
        path: String,
        source: std::io::Error,
    },
}

/// One line of the env file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvLine {
    /// `KEY=value` or `KEY="value"`.
    Entry {
        key: String,
        value: String,
        quoted: bool,
    },
    /// Comment, blank, or anything else; preserved verbatim.
    Verbatim(String),
}

/// What an upsert did, for the operator-facing confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryChange {
    Added,
    Updated,
}

/// Receipt of a successful save.
#[derive(Debug, Clone)]
pub struct SaveReceipt {
    /// Backup created for this save, if the file existed beforehand.
    pub backup: Option<PathBuf>,
}

/// In-memory env file. One writer per load-mutate-save cycle; nothing is
/// cached across invocations.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    lines: Vec<EnvLine>,
}

impl EnvFile {
    /// Load from `path`. A missing file yields an empty store bound to
    /// that path, not an error.
    pub fn load(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let lines = match fs::read_to_string(&path) {
            Ok(content) => content.lines().map(parse_line).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        Ok(Self { path, lines })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            EnvLine::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Replace `key` in place, or append it after all existing lines.
    /// No other line moves or changes.
    pub fn upsert(&mut self, key: &str, value: &str) -> EntryChange {
        for line in &mut self.lines {
            if let EnvLine::Entry { key: k, value: v, .. } = line {
                if k == key {
                    *v = value.to_string();
                    return EntryChange::Updated;
                }
            }
        }
        self.lines.push(EnvLine::Entry {
            key: key.to_string(),
            value: value.to_string(),
            quoted: true,
        });
        EntryChange::Added
    }

    /// Serialize back to the line-oriented format, trailing newline
    /// included.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                EnvLine::Entry { key, value, quoted } => {
                    if *quoted {
                        out.push_str(&format!("{}=\"{}\"\n", key, value));
                    } else {
                        out.push_str(&format!("{}={}\n", key, value));
                    }
                }
                EnvLine::Verbatim(raw) => {
                    out.push_str(raw);
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Back up the current on-disk file (if any), then atomically replace
    /// it with the serialized content. The backup happens on every save,
    /// whether or not the content changed.
    pub fn save(&self) -> Result<SaveReceipt, PersistenceError> {
        let backup = if self.path.exists() {
            let backup_path = self.backup_path();
            fs::copy(&self.path, &backup_path).map_err(|e| PersistenceError::Backup {
                path: backup_path.display().to_string(),
                source: e,
            })?;
            debug!("backed up {} to {}", self.path.display(), backup_path.display());
            Some(backup_path)
        } else {
            None
        };

        let tmp = PathBuf::from(format!("{}.tmp.{}", self.path.display(), std::process::id()));
        fs::write(&tmp, self.serialize()).map_err(|e| PersistenceError::Write {
            path: tmp.display().to_string(),
            source: e,
        })?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(PersistenceError::Replace {
                path: self.path.display().to_string(),
                source: e,
            });
        }
        debug!("wrote {}", self.path.display());

        Ok(SaveReceipt { backup })
    }

    /// Timestamped backup name. Subsecond precision plus a counter suffix
    /// keeps rapid consecutive saves from ever overwriting a backup.
    fn backup_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S%3f");
        let base = format!("{}.backup.{}", self.path.display(), stamp);
        let mut candidate = PathBuf::from(&base);
        let mut n = 1;
        while candidate.exists() {
            candidate = PathBuf::from(format!("{}-{}", base, n));
            n += 1;
        }
        candidate
    }
}

/// Keys are shell-style identifiers; anything else stays verbatim.
pub fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_line(line: &str) -> EnvLine {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return EnvLine::Verbatim(line.to_string());
    }
    if let Some((key, rest)) = line.split_once('=') {
        if is_valid_key(key) {
            let (value, quoted) = if rest.len() >= 2 && rest.starts_with('"') && rest.ends_with('"')
            {
                (rest[1..rest.len() - 1].to_string(), true)
            } else {
                (rest.to_string(), false)
            };
            return EnvLine::Entry {
                key: key.to_string(),
                value,
                quoted,
            };
        }
    }
    EnvLine::Verbatim(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_content(content: &str) -> EnvFile {
        EnvFile {
            path: PathBuf::from("/nonexistent/.env"),
            lines: content.lines().map(parse_line).collect(),
        }
    }

    #[test]
    fn parses_plain_and_quoted_entries() {
        let file = from_content("A=1\nB=\"two words\"\n");
        assert_eq!(file.get("A"), Some("1"));
        assert_eq!(file.get("B"), Some("two words"));
    }

    #[test]
    fn comments_and_blanks_survive_round_trip() {
        let content = "# stack credentials\n\nA=1\nnot a kv line\n";
        let file = from_content(content);
        assert_eq!(file.serialize(), content);
    }

    #[test]
    fn upsert_existing_key_keeps_position() {
        let mut file = from_content("A=1\nB=2\nC=3\n");
        assert_eq!(file.upsert("B", "changed"), EntryChange::Updated);
        assert_eq!(file.serialize(), "A=1\nB=changed\nC=3\n");
    }

    #[test]
    fn upsert_new_key_appends_quoted() {
        let mut file = from_content("A=1\n");
        assert_eq!(file.upsert("NEW", "v"), EntryChange::Added);
        assert_eq!(file.serialize(), "A=1\nNEW=\"v\"\n");
    }

    #[test]
    fn upsert_identical_value_is_still_an_update() {
        let mut file = from_content("A=1\n");
        assert_eq!(file.upsert("A", "1"), EntryChange::Updated);
        assert_eq!(file.serialize(), "A=1\n");
    }

    #[test]
    fn quoted_flag_preserved_on_update() {
        let mut file = from_content("COOKIE=\"old\"\n");
        file.upsert("COOKIE", "new");
        assert_eq!(file.serialize(), "COOKIE=\"new\"\n");
    }

    #[test]
    fn invalid_keys_are_verbatim() {
        let file = from_content("2BAD=x\nwith space=y\n");
        assert_eq!(file.get("2BAD"), None);
        assert_eq!(file.serialize(), "2BAD=x\nwith space=y\n");
    }

    #[test]
    fn valid_key_shapes() {
        assert!(is_valid_key("SUNO_COOKIE"));
        assert!(is_valid_key("_private"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("9KEY"));
        assert!(!is_valid_key("KEY-NAME"));
    }
}
