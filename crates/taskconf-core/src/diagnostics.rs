//! Decode diagnostics
//!
//! Decoding never stops at the first problem: every diagnostic found during a
//! schema walk is collected, in walk order, so one decode call reports
//! everything wrong with a task's configuration block. The caller decides
//! through an [`EscalationPolicy`] whether the collection rejects the launch.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::expr::ExprError;

/// Diagnostic codes for categorizing issues
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Required attribute absent; zero value substituted
    MissingAttribute,
    /// Value present but not coercible to the declared type
    TypeMismatch,
    /// Interpolation referenced an unknown variable
    UnresolvedVariable,
    /// Interpolation span that does not parse
    InvalidExpression,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::MissingAttribute => "missing_attribute",
            DiagnosticCode::TypeMismatch => "type_mismatch",
            DiagnosticCode::UnresolvedVariable => "unresolved_variable",
            DiagnosticCode::InvalidExpression => "invalid_expression",
        }
    }
}

// =============================================================================
// ATTRIBUTE PATH
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a value inside the configuration block, e.g. `devices[1].host_path`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributePath {
    segments: Vec<PathSegment>,
}

impl AttributePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.segments.push(PathSegment::Key(key.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(PathSegment::Index(index));
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                PathSegment::Key(k) if i == 0 => f.write_str(k)?,
                PathSegment::Key(k) => write!(f, ".{}", k)?,
                PathSegment::Index(n) => write!(f, "[{}]", n)?,
            }
        }
        Ok(())
    }
}

impl Serialize for AttributePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// DIAGNOSTIC
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub path: AttributePath,
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, path: AttributePath, message: impl Into<String>) -> Self {
        Self {
            code,
            path,
            message: message.into(),
        }
    }

    pub fn missing_attribute(path: AttributePath) -> Self {
        let message = format!("missing required attribute '{}'", path);
        Self::new(DiagnosticCode::MissingAttribute, path, message)
    }

    pub fn type_mismatch(path: AttributePath, expected: impl fmt::Display, found: &str) -> Self {
        Self::new(
            DiagnosticCode::TypeMismatch,
            path,
            format!("expected {}, found {}", expected, found),
        )
    }

    /// Map an interpolation failure onto its diagnostic code
    pub fn from_expr(path: AttributePath, err: &ExprError) -> Self {
        let code = match err {
            ExprError::UnresolvedVariable(_) => DiagnosticCode::UnresolvedVariable,
            ExprError::TypeMismatch { .. } => DiagnosticCode::TypeMismatch,
            ExprError::InvalidExpression { .. } => DiagnosticCode::InvalidExpression,
        };
        Self::new(code, path, err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.path, self.code.as_str(), self.message)
    }
}

/// Ordered diagnostic collection
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.0.push(diag);
    }

    pub fn has_errors(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn by_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(move |d| d.code == code)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diag) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", diag)?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// ESCALATION
// =============================================================================

/// Whether diagnostics abort a task launch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationPolicy {
    /// Any diagnostic rejects the configuration before dispatch to the plugin
    #[default]
    #[serde(rename = "any")]
    AnyDiagnostic,
    /// Zero-filled values are dispatched; diagnostics are only reported
    #[serde(rename = "never")]
    Never,
}

impl FromStr for EscalationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "any_diagnostic" | "strict" => Ok(EscalationPolicy::AnyDiagnostic),
            "never" | "lenient" => Ok(EscalationPolicy::Never),
            other => Err(format!("unknown escalation policy '{}'", other)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
