//! Human-readable rendering of the status report.

use sealbox_core::status::KeyReport;
use sealbox_core::{PasswordOrigin, SecurityLevel, StatusReport};
use std::fmt::Write;

/// Overall verdict shown at the end of the text report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Good,
    Partial,
    NeedsAttention,
}

impl Verdict {
    /// Judged on stored `_ENCRYPTED` entries, readable or not.
    pub fn of(report: &StatusReport) -> Self {
        let has_encrypted = report.keys.values().any(|k| k.encrypted);
        let configured = report.password_origin == PasswordOrigin::Configured;
        let readable = !has_unreadable(report);

        if has_encrypted && readable && configured && report.metrics.warning_count == 0 {
            Self::Good
        } else if has_encrypted {
            Self::Partial
        } else {
            Self::NeedsAttention
        }
    }

    fn headline(self) -> &'static str {
        match self {
            Self::Good => "GOOD",
            Self::Partial => "PARTIAL",
            Self::NeedsAttention => "NEEDS ATTENTION",
        }
    }

    fn advice(self, report: &StatusReport) -> &'static str {
        match self {
            Self::Good => "API keys are encrypted and the master password is configured.",
            Self::Partial if report.password_origin == PasswordOrigin::Ephemeral => {
                "Keys are encrypted but ENCRYPTION_MASTER_PASSWORD is not set."
            }
            Self::Partial if report.metrics.warning_count > 0 => {
                "Some keys are still stored as plain text. Run: sealbox encrypt-env"
            }
            Self::Partial => "Some encrypted keys cannot be decrypted; check ENCRYPTION_MASTER_PASSWORD.",
            Self::NeedsAttention => "No encrypted keys found. Run: sealbox encrypt-env",
        }
    }
}

fn has_unreadable(report: &StatusReport) -> bool {
    report
        .keys
        .values()
        .any(|k| k.encrypted && k.status == SecurityLevel::Missing)
}

fn label(key: &KeyReport) -> &'static str {
    match key.status {
        SecurityLevel::Secure => "encrypted",
        SecurityLevel::Warning => "plain text (not secure)",
        SecurityLevel::Missing if key.encrypted => "encrypted (unreadable)",
        SecurityLevel::Missing => "not set",
    }
}

/// Render `report` as text.
pub fn render_text(report: &StatusReport) -> String {
    let mut out = String::new();
    let width = report.keys.keys().map(|k| k.len()).max().unwrap_or(0);

    // Writing into a String cannot fail.
    let _ = writeln!(out, "Environment Security Status");
    let _ = writeln!(out, "===========================");
    let _ = writeln!(out);
    let _ = writeln!(out, "API Key Status:");
    for (name, key) in &report.keys {
        let _ = writeln!(
            out,
            "  {:<width$}  {:<23}  {}",
            name,
            label(key),
            key.masked,
            width = width
        );
    }

    let metrics = &report.metrics;
    let _ = writeln!(out);
    let _ = writeln!(out, "Security Summary:");
    let _ = writeln!(out, "  Encrypted keys:  {}", metrics.encrypted_count);
    let _ = writeln!(out, "  Plain text keys: {}", metrics.warning_count);
    let _ = writeln!(out, "  Missing keys:    {}", metrics.missing_count);
    let _ = writeln!(out, "  Master password: {}", report.password_origin);
    let _ = writeln!(out, "  Security score:  {}%", report.security_score);

    let verdict = Verdict::of(report);
    let _ = writeln!(out);
    let _ = writeln!(out, "Security Status: {}", verdict.headline());
    let _ = writeln!(out, "  {}", verdict.advice(report));

    out
}
