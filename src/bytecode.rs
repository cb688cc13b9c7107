//! Optional embedded-bytecode step: hand the program to a native HLSL compiler.
//!
//! Failure here never fails the translation. It degrades to "no bytecode" plus
//! a warning diagnostic carrying the native error code and message.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticPayload, SourceLocation};
use crate::syntax::ShaderKind;
use crate::translator::discovery::ENTRY_POINT_NAME;
use crate::translator::Translation;

#[derive(Debug, Error)]
pub enum NativeCompileError {
    #[error("native compilation was cancelled")]
    Cancelled,
    #[error("failed to launch {}: {source}", .path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("native compiler exited with code {code}: {message}")]
    Rejected { code: i32, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NativeCompileError {
    /// Error code surfaced in diagnostics.
    pub fn code(&self) -> i32 {
        match self {
            NativeCompileError::Cancelled => -2,
            NativeCompileError::Launch { source, .. } => source.raw_os_error().unwrap_or(-1),
            NativeCompileError::Rejected { code, .. } => *code,
            NativeCompileError::Io(e) => e.raw_os_error().unwrap_or(-1),
        }
    }
}

/// Cooperative cancellation flag shared with the caller.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), NativeCompileError> {
        if self.is_cancelled() {
            Err(NativeCompileError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub struct NativeCompileRequest<'a> {
    pub program: &'a str,
    pub entry_point: &'a str,
    pub profile: &'a str,
    pub args: Vec<String>,
}

pub trait NativeCompiler: Send + Sync {
    fn compile(
        &self,
        request: &NativeCompileRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, NativeCompileError>;
}

/// Profile used when the declaration does not request one.
pub fn default_profile(_kind: ShaderKind) -> &'static str {
    // Pixel shaders are emitted as compute kernels writing the output texture.
    "cs_6_0"
}

/// Runs the `dxc` command line compiler on a scratch file.
pub struct DxcCommandCompiler {
    pub path: PathBuf,
    pub scratch_dir: PathBuf,
}

impl Default for DxcCommandCompiler {
    fn default() -> Self {
        Self {
            path: PathBuf::from("dxc"),
            scratch_dir: std::env::temp_dir(),
        }
    }
}

impl DxcCommandCompiler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Scratch files removed on every exit path.
struct ScratchFiles(Vec<PathBuf>);

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.0 {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn scratch_stem(dir: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("hlsl-forge-{}-{n}", std::process::id()))
}

impl NativeCompiler for DxcCommandCompiler {
    fn compile(
        &self,
        request: &NativeCompileRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, NativeCompileError> {
        cancel.check()?;

        let stem = scratch_stem(&self.scratch_dir);
        let input = stem.with_extension("hlsl");
        let output = stem.with_extension("cso");
        let _scratch = ScratchFiles(vec![input.clone(), output.clone()]);
        std::fs::write(&input, request.program)?;

        cancel.check()?;
        let result = Command::new(&self.path)
            .arg("-T")
            .arg(request.profile)
            .arg("-E")
            .arg(request.entry_point)
            .args(&request.args)
            .arg("-Fo")
            .arg(&output)
            .arg(&input)
            .output()
            .map_err(|source| NativeCompileError::Launch {
                path: self.path.clone(),
                source,
            })?;

        cancel.check()?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(NativeCompileError::Rejected {
                code: result.status.code().unwrap_or(-1),
                message: stderr,
            });
        }
        Ok(std::fs::read(&output)?)
    }
}

/// Compile `translation`'s program and attach the bytecode, or a warning
/// diagnostic when the native step fails. Cancellation leaves it unchanged.
pub fn embed_bytecode(
    translation: &mut Translation,
    profile: Option<&str>,
    args: Vec<String>,
    compiler: &dyn NativeCompiler,
    cancel: &CancellationToken,
) {
    let Some(program) = translation.program.as_deref() else {
        return;
    };
    if !translation.is_dispatchable() {
        tracing::debug!(shader = %translation.name, "skipping bytecode for a shader with errors");
        return;
    }
    let request = NativeCompileRequest {
        program,
        entry_point: ENTRY_POINT_NAME,
        profile: profile.unwrap_or_else(|| default_profile(translation.kind)),
        args,
    };
    match compiler.compile(&request, cancel) {
        Ok(blob) => {
            tracing::debug!(shader = %translation.name, bytes = blob.len(), "bytecode embedded");
            translation.bytecode = Some(blob);
        }
        Err(NativeCompileError::Cancelled) => {
            tracing::debug!(shader = %translation.name, "bytecode step cancelled");
        }
        Err(e) => {
            tracing::warn!(shader = %translation.name, error = %e, "bytecode step failed");
            let diagnostic = Diagnostic::new(
                DiagnosticKind::NativeCompilationFailure,
                SourceLocation {
                    member: translation.name.clone(),
                    line: 0,
                    column: 0,
                },
                format!("native compilation failed: {e}"),
            )
            .with_payload(DiagnosticPayload::Native {
                code: e.code(),
                message: e.to_string(),
            });
            translation.diagnostics.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::TranslateOptions;

    struct Scripted(Result<Vec<u8>, i32>);

    impl NativeCompiler for Scripted {
        fn compile(
            &self,
            _request: &NativeCompileRequest<'_>,
            cancel: &CancellationToken,
        ) -> Result<Vec<u8>, NativeCompileError> {
            cancel.check()?;
            match &self.0 {
                Ok(blob) => Ok(blob.clone()),
                Err(code) => Err(NativeCompileError::Rejected {
                    code: *code,
                    message: "error: undeclared identifier".to_string(),
                }),
            }
        }
    }

    fn translation() -> Translation {
        let source = crate::syntax::parse_source(
            r#"{
                "name": "Demo.Empty",
                "kind": "compute",
                "methods": [ { "id": "e", "owner": "Demo.Empty", "name": "Execute", "return_ty": { "kind": "Named", "name": "void" } } ]
            }"#,
        )
        .unwrap();
        crate::translator::translate(&source, &TranslateOptions::default())
    }

    #[test]
    fn successful_compile_attaches_blob() {
        let mut t = translation();
        embed_bytecode(&mut t, None, Vec::new(), &Scripted(Ok(vec![1, 2, 3])), &CancellationToken::new());
        assert_eq!(t.bytecode, Some(vec![1, 2, 3]));
        assert!(t.diagnostics.is_empty());
    }

    #[test]
    fn failure_degrades_to_warning() {
        let mut t = translation();
        embed_bytecode(&mut t, Some("cs_6_5"), Vec::new(), &Scripted(Err(3)), &CancellationToken::new());
        assert!(t.bytecode.is_none());
        assert_eq!(t.diagnostics.len(), 1);
        assert_eq!(t.diagnostics[0].kind, DiagnosticKind::NativeCompilationFailure);
        assert!(matches!(
            t.diagnostics[0].payload,
            Some(DiagnosticPayload::Native { code: 3, .. })
        ));
        assert!(t.is_dispatchable());
    }

    #[test]
    fn cancellation_leaves_translation_untouched() {
        let mut t = translation();
        let cancel = CancellationToken::new();
        cancel.cancel();
        embed_bytecode(&mut t, None, Vec::new(), &Scripted(Ok(vec![1])), &cancel);
        assert!(t.bytecode.is_none());
        assert!(t.diagnostics.is_empty());
    }

    #[test]
    fn missing_compiler_reports_launch_error() {
        let compiler = DxcCommandCompiler::new("/nonexistent/hlsl-forge-dxc");
        let request = NativeCompileRequest {
            program: "void Execute() {}",
            entry_point: "Execute",
            profile: "cs_6_0",
            args: Vec::new(),
        };
        let err = compiler.compile(&request, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, NativeCompileError::Launch { .. }));
    }
}
