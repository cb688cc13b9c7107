//! Diagnostics produced while translating a shader declaration.
//!
//! Expected failures are reported as data and accumulated per declaration.
//! The driver decides what to do with them; `Translation::is_dispatchable`
//! encodes the default policy.

use std::fmt;

use serde::Serialize;

use crate::syntax::Span;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Host syntax with no shading-language counterpart.
    UnsupportedConstruct,
    /// A type that cannot be expressed in the shading language.
    UnsupportedType,
    /// A member or method with no known mapping.
    UnsupportedMember,
    /// Dispatch-context members used where no invocation context exists.
    InvalidDispatchContextAccess,
    /// A captured field that is neither plain data nor a known resource shape.
    InvalidField,
    /// A matrix swizzle indexer with a non-constant operand.
    NonConstantMatrixIndex,
    /// Constants and resource bindings exceed the root signature budget.
    RootSignatureExceeded,
    /// No method has the required entry point shape.
    MissingEntryPoint,
    /// The optional embedded bytecode step failed.
    NativeCompilationFailure,
    /// A declared resource slot differs from the assigned one.
    IgnoredSlotHint,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::NativeCompilationFailure | DiagnosticKind::IgnoredSlotHint => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// Fatal kinds suppress program text entirely.
    pub fn is_fatal(self) -> bool {
        matches!(self, DiagnosticKind::MissingEntryPoint)
    }

    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::UnsupportedConstruct => "HF0001",
            DiagnosticKind::UnsupportedType => "HF0002",
            DiagnosticKind::UnsupportedMember => "HF0003",
            DiagnosticKind::InvalidDispatchContextAccess => "HF0004",
            DiagnosticKind::InvalidField => "HF0005",
            DiagnosticKind::NonConstantMatrixIndex => "HF0006",
            DiagnosticKind::RootSignatureExceeded => "HF0007",
            DiagnosticKind::MissingEntryPoint => "HF0008",
            DiagnosticKind::NativeCompilationFailure => "HF0009",
            DiagnosticKind::IgnoredSlotHint => "HF0010",
        }
    }
}

/// Where a diagnostic was raised: the enclosing member plus a line/column.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub member: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(member: impl Into<String>, span: Span) -> Self {
        Self {
            member: member.into(),
            line: span.line,
            column: span.column,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticPayload {
    Construct { name: String },
    RootSignatureCost { dwords: u32 },
    Native { code: i32, message: String },
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub location: SourceLocation,
    pub message: String,
    pub payload: Option<DiagnosticPayload>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            location,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: DiagnosticPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn unsupported_construct(location: SourceLocation, construct: &str) -> Self {
        Self::new(
            DiagnosticKind::UnsupportedConstruct,
            location,
            format!("{construct} is not supported in shader code"),
        )
        .with_payload(DiagnosticPayload::Construct {
            name: construct.to_string(),
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(
            f,
            "{severity} {}: {} ({}:{}:{})",
            self.kind.code(),
            self.message,
            self.location.member,
            self.location.line,
            self.location.column
        )
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

pub fn has_fatal(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.kind.is_fatal())
}
