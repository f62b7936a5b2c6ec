//! Dotenv file migration: encrypt plaintext provider credentials in place.
//!
//! Works on file content only; reading, backing up, and writing the file is
//! left to the caller.

use std::collections::HashSet;

use crate::cipher::{self, CipherError};
use crate::model::{ENCRYPTED_SUFFIX, KNOWN_CREDENTIALS};
use crate::source::parse_env_line;

/// How encrypted values are written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationLayout {
    /// Replace `KEY=plain` with `KEY_ENCRYPTED=record`.
    #[default]
    Suffixed,
    /// Replace `KEY=plain` with `KEY=record`.
    Legacy,
}

/// What happened to one known credential line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// A plaintext value was encrypted. Carries the masked plaintext.
    Encrypted { key: String, masked: String },
    /// The value was already in encrypted form.
    AlreadyEncrypted { key: String },
    /// Left as plaintext because `KEY_ENCRYPTED` already exists in the file.
    Conflict { key: String },
}

/// Result of migrating one file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// The rewritten content.
    pub content: String,
    /// Per-credential outcomes in file order.
    pub outcomes: Vec<LineOutcome>,
}

impl Migration {
    /// Whether any value was encrypted.
    pub fn has_changes(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o, LineOutcome::Encrypted { .. }))
    }

    /// Number of values encrypted by this migration.
    pub fn encrypted_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, LineOutcome::Encrypted { .. }))
            .count()
    }
}

/// Encrypt every plaintext known credential in `content` under `password`.
///
/// Comments, blank lines, and unrelated keys are kept byte for byte. Rewritten
/// lines keep their indentation, `export ` keyword, and line ending.
pub fn encrypt_env_content(
    content: &str,
    password: &str,
    layout: MigrationLayout,
) -> Result<Migration, CipherError> {
    let existing_encrypted: HashSet<&str> = content
        .lines()
        .filter_map(parse_env_line)
        .filter_map(|(key, value)| {
            key.strip_suffix(ENCRYPTED_SUFFIX)
                .filter(|base| KNOWN_CREDENTIALS.contains(base) && cipher::is_encrypted(value))
        })
        .collect();

    let mut out = String::with_capacity(content.len());
    let mut outcomes = Vec::new();

    for raw in content.split_inclusive('\n') {
        let (line, ending) = split_line_ending(raw);
        let Some((key, value)) = parse_env_line(line) else {
            out.push_str(raw);
            continue;
        };

        let encrypted_base = key
            .strip_suffix(ENCRYPTED_SUFFIX)
            .filter(|base| KNOWN_CREDENTIALS.contains(base) && cipher::is_encrypted(value));
        if let Some(base) = encrypted_base {
            outcomes.push(LineOutcome::AlreadyEncrypted {
                key: base.to_string(),
            });
            out.push_str(raw);
            continue;
        }

        if !KNOWN_CREDENTIALS.contains(&key) || value.is_empty() {
            out.push_str(raw);
            continue;
        }

        if cipher::is_encrypted(value) {
            outcomes.push(LineOutcome::AlreadyEncrypted {
                key: key.to_string(),
            });
            out.push_str(raw);
            continue;
        }

        if layout == MigrationLayout::Suffixed && existing_encrypted.contains(key) {
            outcomes.push(LineOutcome::Conflict {
                key: key.to_string(),
            });
            out.push_str(raw);
            continue;
        }

        let record = cipher::encrypt(value, password)?;
        let written_key = match layout {
            MigrationLayout::Suffixed => format!("{}{}", key, ENCRYPTED_SUFFIX),
            MigrationLayout::Legacy => key.to_string(),
        };
        out.push_str(assignment_prefix(line));
        out.push_str(&written_key);
        out.push('=');
        out.push_str(&record);
        out.push_str(ending);
        outcomes.push(LineOutcome::Encrypted {
            key: key.to_string(),
            masked: cipher::mask_default(value),
        });
    }

    Ok(Migration {
        content: out,
        outcomes,
    })
}

/// Split a line from `split_inclusive` into its body and its `\n` or `\r\n` ending.
fn split_line_ending(raw: &str) -> (&str, &str) {
    let body = raw
        .strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(raw);
    (body, &raw[body.len()..])
}

/// Leading whitespace plus an `export ` keyword, if the line has one.
fn assignment_prefix(line: &str) -> &str {
    let body = line.trim_start();
    let indent = line.len() - body.len();
    if body.starts_with("export ") {
        &line[..indent + "export ".len()]
    } else {
        &line[..indent]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::CredentialSource;

    const PASSWORD: &str = "migration-password";

    #[test]
    fn test_suffixed_migration() {
        let content = "# provider keys\nOPENAI_API_KEY=sk-plaintext-value\nAPI_PRIORITY=groq,openai\n\nGROQ_API_KEY=\n";

        let migration = encrypt_env_content(content, PASSWORD, MigrationLayout::Suffixed).unwrap();

        assert!(migration.has_changes());
        assert_eq!(migration.encrypted_count(), 1);
        assert!(migration.content.starts_with("# provider keys\nOPENAI_API_KEY_ENCRYPTED="));
        assert!(migration.content.contains("\nAPI_PRIORITY=groq,openai\n\nGROQ_API_KEY=\n"));
        assert!(!migration.content.contains("sk-plaintext-value"));

        let source = MemorySource::from_env_str(&migration.content, "test").unwrap();
        let record = source.get("OPENAI_API_KEY_ENCRYPTED").unwrap();
        assert_eq!(cipher::decrypt(&record, PASSWORD).unwrap(), "sk-plaintext-value");
        assert!(source.get("OPENAI_API_KEY").is_none());
    }

    #[test]
    fn test_legacy_migration() {
        let content = "COHERE_API_KEY=\"co-plaintext-value\"";

        let migration = encrypt_env_content(content, PASSWORD, MigrationLayout::Legacy).unwrap();

        assert!(migration.content.starts_with("COHERE_API_KEY="));
        assert!(!migration.content.ends_with('\n'));
        let (_, record) = parse_env_line(&migration.content).unwrap();
        assert_eq!(cipher::decrypt(record, PASSWORD).unwrap(), "co-plaintext-value");
    }

    #[test]
    fn test_already_encrypted_is_kept() {
        let record = cipher::encrypt("sk", PASSWORD).unwrap();
        let content = format!("OPENAI_API_KEY_ENCRYPTED={}\nGROQ_API_KEY={}\n", record, record);

        let migration = encrypt_env_content(&content, PASSWORD, MigrationLayout::Suffixed).unwrap();

        assert!(!migration.has_changes());
        assert_eq!(migration.content, content);
        assert_eq!(
            migration.outcomes,
            vec![
                LineOutcome::AlreadyEncrypted {
                    key: "OPENAI_API_KEY".to_string()
                },
                LineOutcome::AlreadyEncrypted {
                    key: "GROQ_API_KEY".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_conflict_leaves_plaintext() {
        let record = cipher::encrypt("sk-old", PASSWORD).unwrap();
        let content = format!("OPENAI_API_KEY=sk-new\nOPENAI_API_KEY_ENCRYPTED={}\n", record);

        let migration = encrypt_env_content(&content, PASSWORD, MigrationLayout::Suffixed).unwrap();

        assert!(!migration.has_changes());
        assert_eq!(
            migration.outcomes[0],
            LineOutcome::Conflict {
                key: "OPENAI_API_KEY".to_string()
            }
        );
        assert_eq!(migration.content, content);
    }

    #[test]
    fn test_unknown_keys_untouched() {
        let content = "STRIPE_API_KEY=sk_live_123\nexport DATABASE_URL=postgres://x\n";
        let migration = encrypt_env_content(content, PASSWORD, MigrationLayout::Suffixed).unwrap();

        assert!(migration.outcomes.is_empty());
        assert_eq!(migration.content, content);
    }

    #[test]
    fn test_line_endings_and_export_prefix_are_kept() {
        let content = "# keys\r\nexport OPENAI_API_KEY=sk-plaintext-value\r\nDEBUG=1\r\n  GROQ_API_KEY=gsk-plaintext-value";

        let migration = encrypt_env_content(content, PASSWORD, MigrationLayout::Suffixed).unwrap();
        assert_eq!(migration.encrypted_count(), 2);

        let lines: Vec<&str> = migration.content.split_inclusive('\n').collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "# keys\r\n");
        assert!(lines[1].starts_with("export OPENAI_API_KEY_ENCRYPTED="));
        assert!(lines[1].ends_with("\r\n"));
        assert_eq!(lines[2], "DEBUG=1\r\n");
        assert!(lines[3].starts_with("  GROQ_API_KEY_ENCRYPTED="));
        assert!(!lines[3].ends_with('\n'));

        let (_, record) = parse_env_line(lines[1].trim_end()).unwrap();
        assert_eq!(cipher::decrypt(record, PASSWORD).unwrap(), "sk-plaintext-value");
    }

    #[test]
    fn test_split_line_ending() {
        assert_eq!(split_line_ending("A=1\r\n"), ("A=1", "\r\n"));
        assert_eq!(split_line_ending("A=1\n"), ("A=1", "\n"));
        assert_eq!(split_line_ending("A=1"), ("A=1", ""));
        assert_eq!(assignment_prefix("  export A=1"), "  export ");
        assert_eq!(assignment_prefix("A=1"), "");
    }
}
