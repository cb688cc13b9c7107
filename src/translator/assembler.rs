//! Program Assembler: concatenates the translated pieces into HLSL source.

use crate::syntax::{InputKind, ShaderKind};
use crate::translator::discovery::Discovery;
use crate::translator::hlsl::{self, print_block, print_expr, INDENT};
use crate::translator::layout::{output_texture_binding, ResourceBinding};
use crate::translator::types::{ShaderDeclaration, StaticFieldDefinition, StructDefinition};

const GROUP_SIZE_AXES: [&str; 3] = ["X", "Y", "Z"];
const EFFECT_HELPERS_INCLUDE: &str = "#include \"d2d1effecthelpers.hlsli\"";

/// Emit the complete program for a discovered declaration.
pub fn assemble_program(
    declaration: &ShaderDeclaration,
    discovery: &Discovery,
    bindings: &[ResourceBinding],
) -> String {
    let mut out = String::new();

    out.push_str("// ================================================\n");
    out.push_str("//                  AUTO GENERATED\n");
    out.push_str("// ================================================\n");
    out.push_str(&format!("// Shader: {}\n", declaration.name));
    out.push_str("// Generated by hlsl-forge. Do not edit.\n\n");
    out.push_str("#pragma pack_matrix(row_major)\n\n");

    push_effect_header(&mut out, declaration);

    for (axis, size) in GROUP_SIZE_AXES.iter().zip(declaration.thread_group_size) {
        out.push_str(&format!("#define __GroupSize__get_{axis} {size}\n"));
    }
    out.push('\n');

    if !discovery.constants.is_empty() {
        for c in discovery.constants.iter() {
            out.push_str(&format!("#define {} {}\n", c.hlsl_name, c.value));
        }
        out.push('\n');
    }

    // Structs go first: static fields may be declared with a struct type.
    for s in &discovery.structs {
        push_struct(&mut out, s);
    }

    if !discovery.static_fields.is_empty() {
        for f in &discovery.static_fields {
            out.push_str(&static_field_decl(f));
        }
        out.push('\n');
    }

    push_constant_buffer(&mut out, declaration);
    push_resources(&mut out, declaration, bindings, discovery.needs_sampler);

    if !discovery.methods.is_empty() {
        for m in &discovery.methods {
            out.push_str(&format!("{};\n", m.signature()));
        }
        out.push('\n');
        for m in &discovery.methods {
            out.push_str(&m.signature());
            out.push('\n');
            out.push_str(&print_block(&m.body, 0));
            out.push('\n');
        }
    }

    push_entry_point(&mut out, declaration);
    out
}

fn push_effect_header(out: &mut String, declaration: &ShaderDeclaration) {
    let attributes = &declaration.attributes;
    let Some(count) = attributes.input_count else {
        return;
    };
    out.push_str(&format!("#define D2D_INPUT_COUNT {count}\n"));
    for (i, input) in attributes.inputs.iter().enumerate().take(count as usize) {
        let class = match input {
            InputKind::Simple => "SIMPLE",
            InputKind::Complex => "COMPLEX",
        };
        out.push_str(&format!("#define D2D_INPUT{i}_{class}\n"));
    }
    if attributes.requires_scene_position {
        out.push_str("#define D2D_REQUIRES_SCENE_POSITION\n");
    }
    out.push('\n');
    out.push_str(EFFECT_HELPERS_INCLUDE);
    out.push_str("\n\n");
}

fn push_struct(out: &mut String, s: &StructDefinition) {
    out.push_str(&format!("struct {}\n{{\n", s.hlsl_name));
    for (ty, name) in &s.fields {
        out.push_str(&format!("{INDENT}{ty} {name};\n"));
    }
    out.push_str("};\n\n");
}

fn static_field_decl(f: &StaticFieldDefinition) -> String {
    let qualifier = if f.is_constant { "static const" } else { "static" };
    let initializer = match (&f.initializer, f.is_constant) {
        (Some(init), _) => Some(print_expr(init)),
        (None, true) => Some(print_expr(&hlsl::Expr::zero_of(f.hlsl_type.clone()))),
        (None, false) => None,
    };
    match initializer {
        Some(init) => format!("{qualifier} {} {} = {init};\n", f.hlsl_type, f.hlsl_name),
        None => format!("{qualifier} {} {};\n", f.hlsl_type, f.hlsl_name),
    }
}

fn push_constant_buffer(out: &mut String, declaration: &ShaderDeclaration) {
    out.push_str("cbuffer _ : register(b0)\n{\n");
    let reserved = ["__x", "__y", "__z"];
    for word in reserved
        .iter()
        .take(declaration.kind.reserved_dispatch_words() as usize)
    {
        out.push_str(&format!("{INDENT}uint {word};\n"));
    }
    for field in declaration.value_fields() {
        out.push_str(&format!("{INDENT}{} {};\n", field.hlsl_type, field.name));
    }
    out.push_str("}\n\n");
}

fn push_resources(
    out: &mut String,
    declaration: &ShaderDeclaration,
    bindings: &[ResourceBinding],
    needs_sampler: bool,
) {
    let mut any = false;
    for b in bindings {
        out.push_str(&format!(
            "{} {} : register({}{});\n",
            b.hlsl_type, b.name, b.register_class, b.index
        ));
        any = true;
    }
    if declaration.kind == ShaderKind::Pixel {
        let target = output_texture_binding(bindings.len() as u32);
        out.push_str(&format!(
            "{} {} : register({}{});\n",
            target.hlsl_type, target.name, target.register_class, target.index
        ));
        any = true;
    }
    if any {
        out.push('\n');
    }
    if needs_sampler {
        out.push_str("SamplerState __sampler : register(s0);\n\n");
    }
}

fn push_entry_point(out: &mut String, declaration: &ShaderDeclaration) {
    let entry = &declaration.entry;
    let (params, args) = if entry.uses_group_ids {
        (
            "uint3 ThreadIds : SV_DispatchThreadID, uint3 GroupThreadId : SV_GroupThreadID",
            "ThreadIds, GroupThreadId",
        )
    } else {
        ("uint3 ThreadIds : SV_DispatchThreadID", "ThreadIds")
    };
    let guard = match declaration.kind {
        ShaderKind::Compute => "ThreadIds.x < __x && ThreadIds.y < __y && ThreadIds.z < __z",
        ShaderKind::Pixel => "ThreadIds.x < __x && ThreadIds.y < __y",
    };

    let guarded_body = match declaration.kind {
        ShaderKind::Compute => entry.body.clone(),
        ShaderKind::Pixel => {
            let inner_params = if entry.uses_group_ids {
                "uint3 ThreadIds, uint3 GroupThreadId"
            } else {
                "uint3 ThreadIds"
            };
            out.push_str(&format!("{} __Execute({inner_params})\n", entry.return_type));
            out.push_str(&print_block(&entry.body, 0));
            out.push('\n');
            vec![hlsl::Stmt::Expr(hlsl::Expr::Assign(
                crate::syntax::AssignOp::Assign,
                Box::new(hlsl::Expr::raw("__outputTexture[ThreadIds.xy]")),
                Box::new(hlsl::Expr::raw(format!("__Execute({args})"))),
            ))]
        }
    };

    out.push_str(&format!(
        "[NumThreads({})]\n",
        GROUP_SIZE_AXES
            .iter()
            .map(|a| format!("__GroupSize__get_{a}"))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    out.push_str(&format!("void Execute({params})\n"));
    let wrapped = vec![hlsl::Stmt::If {
        condition: hlsl::Expr::raw(guard),
        then: Box::new(hlsl::Stmt::Block(guarded_body)),
        otherwise: None,
    }];
    out.push_str(&print_block(&wrapped, 0));
}
