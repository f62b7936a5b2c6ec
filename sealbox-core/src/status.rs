//! Credential security status report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::source::CredentialSource;
use crate::vault::{CredentialStatus, CredentialVault, PasswordOrigin, NOT_SET};

/// Protection level of one credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// Stored encrypted.
    Secure,
    /// Present but stored as plaintext.
    Warning,
    /// Not set.
    Missing,
}

impl SecurityLevel {
    /// Classify a status entry.
    pub fn classify(status: &CredentialStatus) -> Self {
        if status.masked == NOT_SET {
            Self::Missing
        } else if status.encrypted {
            Self::Secure
        } else {
            Self::Warning
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secure => write!(f, "secure"),
            Self::Warning => write!(f, "warning"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// Status of one credential with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyReport {
    pub encrypted: bool,
    pub masked: String,
    pub status: SecurityLevel,
}

/// Aggregate counts over all reported credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityMetrics {
    pub total: usize,
    /// Credentials classified [`SecurityLevel::Secure`].
    pub encrypted_count: usize,
    pub missing_count: usize,
    pub warning_count: usize,
}

impl SecurityMetrics {
    /// Percentage of present credentials that are encrypted, rounded.
    ///
    /// Zero when no credential is present.
    pub fn score(&self) -> u8 {
        let present = self.total.saturating_sub(self.missing_count);
        if present == 0 {
            return 0;
        }
        let ratio = self.encrypted_count as f64 / present as f64;
        (ratio * 100.0).round().min(100.0) as u8
    }
}

/// Point-in-time security report. Contains masked values only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub keys: BTreeMap<String, KeyReport>,
    pub metrics: SecurityMetrics,
    pub security_score: u8,
    pub timestamp: DateTime<Utc>,
    pub password_origin: PasswordOrigin,
}

impl StatusReport {
    /// Build a report from a vault's current state.
    pub fn from_vault<S: CredentialSource>(vault: &CredentialVault<S>) -> Self {
        Self::from_status(vault.status(), vault.password_origin())
    }

    /// Build a report from precomputed status entries.
    pub fn from_status(
        status: BTreeMap<String, CredentialStatus>,
        password_origin: PasswordOrigin,
    ) -> Self {
        let mut metrics = SecurityMetrics::default();

        let keys: BTreeMap<String, KeyReport> = status
            .into_iter()
            .map(|(name, entry)| {
                let level = SecurityLevel::classify(&entry);
                metrics.total += 1;
                match level {
                    SecurityLevel::Secure => metrics.encrypted_count += 1,
                    SecurityLevel::Warning => metrics.warning_count += 1,
                    SecurityLevel::Missing => metrics.missing_count += 1,
                }
                let report = KeyReport {
                    encrypted: entry.encrypted,
                    masked: entry.masked,
                    status: level,
                };
                (name, report)
            })
            .collect();

        Self {
            keys,
            security_score: metrics.score(),
            metrics,
            timestamp: Utc::now(),
            password_origin,
        }
    }

    /// Names classified at `level`, sorted.
    pub fn names_with(&self, level: SecurityLevel) -> Vec<&str> {
        self.keys
            .iter()
            .filter(|(_, report)| report.status == level)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(encrypted: bool, masked: &str) -> CredentialStatus {
        CredentialStatus {
            encrypted,
            masked: masked.to_string(),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(SecurityLevel::classify(&entry(true, "sk-a********abcd")), SecurityLevel::Secure);
        assert_eq!(SecurityLevel::classify(&entry(false, "sk-a********abcd")), SecurityLevel::Warning);
        assert_eq!(SecurityLevel::classify(&entry(false, NOT_SET)), SecurityLevel::Missing);
        // An encrypted entry that failed to resolve is reported as missing.
        assert_eq!(SecurityLevel::classify(&entry(true, NOT_SET)), SecurityLevel::Missing);
    }

    #[test]
    fn test_score_three_secure_one_warning_one_missing() {
        let mut status = BTreeMap::new();
        status.insert("A".to_string(), entry(true, "a***"));
        status.insert("B".to_string(), entry(true, "b***"));
        status.insert("C".to_string(), entry(true, "c***"));
        status.insert("D".to_string(), entry(false, "d***"));
        status.insert("E".to_string(), entry(false, NOT_SET));

        let report = StatusReport::from_status(status, PasswordOrigin::Configured);

        assert_eq!(
            report.metrics,
            SecurityMetrics {
                total: 5,
                encrypted_count: 3,
                missing_count: 1,
                warning_count: 1,
            }
        );
        assert_eq!(report.security_score, 75);
        assert_eq!(report.names_with(SecurityLevel::Warning), vec!["D"]);
    }

    #[test]
    fn test_score_all_missing_is_zero() {
        let mut status = BTreeMap::new();
        status.insert("A".to_string(), entry(false, NOT_SET));
        status.insert("B".to_string(), entry(false, NOT_SET));

        let report = StatusReport::from_status(status, PasswordOrigin::Ephemeral);
        assert_eq!(report.security_score, 0);
        assert_eq!(report.password_origin, PasswordOrigin::Ephemeral);
    }

    #[test]
    fn test_score_rounds() {
        let metrics = SecurityMetrics {
            total: 3,
            encrypted_count: 2,
            missing_count: 0,
            warning_count: 1,
        };
        assert_eq!(metrics.score(), 67);
    }

    #[test]
    fn test_report_serializes_levels_lowercase() {
        let mut status = BTreeMap::new();
        status.insert("A".to_string(), entry(false, "abcd********wxyz"));
        let report = StatusReport::from_status(status, PasswordOrigin::Configured);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["keys"]["A"]["status"], "warning");
        assert_eq!(json["password_origin"], "configured");
        assert!(json["timestamp"].is_string());
    }
}
