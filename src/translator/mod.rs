//! Shader translation pipeline.
//!
//! `translate` runs discovery, layout, assembly and recipe generation in that
//! order for one declaration. It is a pure function of its inputs: no state is
//! shared between calls, so independent declarations can translate in parallel
//! and identical inputs always produce byte-identical output.

pub mod assembler;
pub mod discovery;
pub mod hlsl;
pub mod layout;
pub mod loader;
pub mod rewriter;
pub mod type_map;
pub mod types;
pub mod utils;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{has_errors, has_fatal, Diagnostic};
use crate::syntax::{ShaderKind, ShaderSource};

use layout::{ConstantBufferLayout, ResourceBinding};
use loader::{ConstantBufferMode, DispatchRecipe};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateOptions {
    /// Run the native compiler and embed its bytecode.
    #[serde(default)]
    pub emit_bytecode: bool,
    /// Native compiler executable; `dxc` on `PATH` when unset.
    #[serde(default)]
    pub compiler_path: Option<PathBuf>,
    #[serde(default)]
    pub buffer_mode: ConstantBufferMode,
}

/// Result of translating one declaration.
#[derive(Clone, Debug, Serialize)]
pub struct Translation {
    pub name: String,
    pub kind: ShaderKind,
    pub thread_group_size: [u32; 3],
    /// HLSL source; `None` after a fatal diagnostic.
    pub program: Option<String>,
    pub layout: Option<ConstantBufferLayout>,
    pub bindings: Vec<ResourceBinding>,
    pub recipe: Option<DispatchRecipe>,
    #[serde(skip)]
    pub bytecode: Option<Vec<u8>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Translation {
    /// Output exists and no error-severity diagnostic was reported.
    pub fn is_dispatchable(&self) -> bool {
        self.program.is_some() && !has_errors(&self.diagnostics)
    }

    pub fn has_fatal(&self) -> bool {
        has_fatal(&self.diagnostics)
    }
}

pub fn translate(source: &ShaderSource, options: &TranslateOptions) -> Translation {
    let span = tracing::debug_span!("translate", shader = %source.name);
    let _enter = span.enter();

    let discovery = discovery::discover(source);
    let mut diagnostics = discovery.diagnostics.clone();

    let Some(declaration) = discovery.declaration.as_ref() else {
        tracing::debug!("no entry point, skipping layout and assembly");
        return Translation {
            name: source.name.clone(),
            kind: source.kind,
            thread_group_size: source.thread_group_size(),
            program: None,
            layout: None,
            bindings: Vec::new(),
            recipe: None,
            bytecode: None,
            diagnostics,
        };
    };

    let values = declaration.value_fields();
    let resources = declaration.resource_fields();
    let layout = layout::compute_layout(declaration.kind, &values);
    let bindings = layout::assign_resource_slots(&resources);
    diagnostics.extend(layout::check_slot_hints(&declaration.name, &resources, &bindings));

    let bound = bindings.len() as u32 + u32::from(declaration.kind == ShaderKind::Pixel);
    if let Some(d) = layout::validate_root_signature(&declaration.name, &layout, bound) {
        diagnostics.push(d);
    }
    tracing::debug!(
        size = layout.size,
        placements = layout.placements.len(),
        resources = bindings.len(),
        "layout complete"
    );

    let program = assembler::assemble_program(declaration, &discovery, &bindings);
    let recipe = loader::build_recipe(
        declaration.kind,
        &values,
        &layout,
        &bindings,
        options.buffer_mode,
    );
    tracing::debug!(bytes = program.len(), "program assembled");

    Translation {
        name: declaration.name.clone(),
        kind: declaration.kind,
        thread_group_size: declaration.thread_group_size,
        program: Some(program),
        layout: Some(layout),
        bindings,
        recipe: Some(recipe),
        bytecode: None,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::syntax::parse_source;

    const SHADER: &str = r#"{
        "name": "Demo.Invert",
        "kind": "compute",
        "fields": [
            { "name": "buffer", "ty": { "kind": "Named", "name": "ReadWriteBuffer", "args": [ { "kind": "Named", "name": "float" } ] } },
            { "name": "factor", "ty": { "kind": "Named", "name": "float" } }
        ],
        "methods": [
            {
                "id": "Demo.Invert.Execute()",
                "owner": "Demo.Invert",
                "name": "Execute",
                "return_ty": { "kind": "Named", "name": "void" },
                "body": [
                    { "kind": "Expr", "expr": {
                        "kind": "Assign", "op": "assign",
                        "target": { "kind": "Index",
                            "target": { "kind": "Ident", "name": "buffer", "symbol": { "kind": "Field", "owner": "Demo.Invert", "is_static": false, "is_readonly": false } },
                            "target_ty": { "kind": "Named", "name": "ReadWriteBuffer", "args": [ { "kind": "Named", "name": "float" } ] },
                            "args": [ { "kind": "Member", "target": { "kind": "Ident", "name": "ThreadIds" }, "name": "X", "symbol": { "kind": "Property", "owner": "ComputeSharp.ThreadIds", "is_static": true } } ] },
                        "value": { "kind": "Binary", "op": "mul",
                            "lhs": { "kind": "Literal", "literal": "float", "text": "1f" },
                            "rhs": { "kind": "Ident", "name": "factor", "symbol": { "kind": "Field", "owner": "Demo.Invert", "is_static": false, "is_readonly": false } } }
                    } }
                ]
            }
        ]
    }"#;

    #[test]
    fn translates_a_minimal_compute_shader() {
        let source = parse_source(SHADER).unwrap();
        let t = translate(&source, &TranslateOptions::default());
        assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
        assert!(t.is_dispatchable());

        let program = t.program.unwrap();
        assert!(program.contains("RWStructuredBuffer<float> buffer : register(u0);"));
        assert!(program.contains("        buffer[ThreadIds.x] = 1.0 * factor;\n"));

        let layout = t.layout.unwrap();
        assert_eq!(layout.placements[0].offset, 12);
        assert_eq!(layout.size, 16);
        assert_eq!(t.bindings[0].index, 0);
        assert_eq!(t.recipe.unwrap().writes.len(), 1);
    }

    #[test]
    fn missing_entry_point_produces_no_program() {
        let mut source = parse_source(SHADER).unwrap();
        source.methods[0].name = "Run".to_string();
        let t = translate(&source, &TranslateOptions::default());
        assert!(t.program.is_none());
        assert!(t.layout.is_none());
        assert!(t.has_fatal());
        assert!(!t.is_dispatchable());
        assert_eq!(t.diagnostics[0].kind, DiagnosticKind::MissingEntryPoint);
    }
}
