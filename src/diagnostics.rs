//! Diagnostics sink.
//!
//! Records `{rule, severity, range, message}` for abstained, deferred and
//! failed matches and for iteration-budget exhaustion. Every record is also
//! emitted as a `tracing` event at the matching level.

use crate::syntax::Span;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Rule the record is about; `None` for engine-level records.
    pub rule_id: Option<String>,
    pub severity: Severity,
    pub range: Option<Span>,
    pub message: String,
    /// Pass (1-based) during which the record was produced.
    pub pass: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(rule) = &self.rule_id {
            write!(f, "[{rule}]")?;
        }
        if let Some(range) = self.range {
            write!(f, " at {range}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered collection of diagnostics for one engine invocation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => tracing::debug!(
                rule = diagnostic.rule_id.as_deref().unwrap_or("-"),
                pass = diagnostic.pass,
                "{}",
                diagnostic.message
            ),
            Severity::Warning => tracing::warn!(
                rule = diagnostic.rule_id.as_deref().unwrap_or("-"),
                pass = diagnostic.pass,
                "{}",
                diagnostic.message
            ),
            Severity::Error => tracing::error!(
                rule = diagnostic.rule_id.as_deref().unwrap_or("-"),
                pass = diagnostic.pass,
                "{}",
                diagnostic.message
            ),
        }
        self.records.push(diagnostic);
    }

    pub fn report(
        &mut self,
        pass: usize,
        rule_id: Option<&str>,
        severity: Severity,
        range: Option<Span>,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic {
            rule_id: rule_id.map(str::to_string),
            severity,
            range,
            message: message.into(),
            pass,
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.records.extend(other.records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter().filter(move |d| d.severity >= severity)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_rule_and_range() {
        let diagnostic = Diagnostic {
            rule_id: Some("use_blocks".to_string()),
            severity: Severity::Warning,
            range: Some(Span::new(3, 9)),
            message: "matcher failed".to_string(),
            pass: 1,
        };
        assert_eq!(diagnostic.to_string(), "warning[use_blocks] at 3..9: matcher failed");
    }

    #[test]
    fn severity_filter() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(1, None, Severity::Info, None, "deferred");
        diagnostics.report(2, Some("x"), Severity::Warning, None, "budget");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.at_least(Severity::Warning).count(), 1);
    }

    #[test]
    fn serializes_as_array() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(1, Some("r"), Severity::Info, Some(Span::new(0, 1)), "m");
        let json = serde_json::to_value(&diagnostics).unwrap();
        assert_eq!(json[0]["severity"], "info");
        assert_eq!(json[0]["range"]["end"], 1);
    }
}
