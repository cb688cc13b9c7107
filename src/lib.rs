pub mod bytecode;
pub mod diagnostics;
pub mod driver;
pub mod fingerprint;
pub mod syntax;
pub mod translator;

pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use syntax::{load_source_from_path, parse_source, ShaderKind, ShaderSource};
pub use translator::{translate, TranslateOptions, Translation};
