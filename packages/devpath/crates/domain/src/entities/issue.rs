use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    Path,
    Env,
    Program,
    Security,
    Permission,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueKind::Path => "PATH",
            IssueKind::Env => "ENV",
            IssueKind::Program => "PROGRAM",
            IssueKind::Security => "SECURITY",
            IssueKind::Permission => "PERMISSION",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        };
        f.write_str(label)
    }
}

/// A finding from the configuration health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub description: String,
    /// The offending PATH entry, variable name or tool name.
    pub value: String,
    pub solution: String,
}

impl ConfigurationIssue {
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        description: impl Into<String>,
        value: impl Into<String>,
        solution: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            description: description.into(),
            value: value.into(),
            solution: solution.into(),
        }
    }
}
