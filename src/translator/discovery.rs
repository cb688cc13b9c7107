//! Discovery Engine: field classification and closure collection.
//!
//! Starting from the entry body, every custom struct, helper method and static
//! field referenced is rewritten exactly once. Each closure is an
//! [`OrderedSet`] walked by a cursor; rewriting an item may append new items
//! behind the cursor, and the loop runs until every cursor has caught up.

use std::collections::HashSet;

use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceLocation};
use crate::syntax::{FieldDecl, MethodDecl, ShaderKind, ShaderSource, TypeDeclKind, TypeRef};
use crate::translator::rewriter::{Discoveries, Rewriter, Scope};
use crate::translator::type_map::{builtin_value_type, escape_identifier, resource_shape, ScalarKind};
use crate::translator::types::{
    ConstantDefinitions, EntryPoint, FieldBinding, MethodDefinition, ResourceField,
    ShaderDeclaration, StaticFieldDefinition, StructDefinition, ValueField, ValueShape,
};
use crate::translator::utils::{method_ident, static_field_ident, type_ident};

pub const ENTRY_POINT_NAME: &str = "Execute";

/// Everything the layout and assembly stages need, plus collected diagnostics.
#[derive(Clone, Debug)]
pub struct Discovery {
    /// `None` when the entry point is missing; nothing downstream can run.
    pub declaration: Option<ShaderDeclaration>,
    /// Custom structs, leaves first.
    pub structs: Vec<StructDefinition>,
    pub static_fields: Vec<StaticFieldDefinition>,
    /// Helper methods in first-reference order.
    pub methods: Vec<MethodDefinition>,
    pub constants: ConstantDefinitions,
    pub needs_sampler: bool,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn discover(source: &ShaderSource) -> Discovery {
    let mut out = Discoveries::default();
    let fields = classify_fields(source, &mut out);

    let Some(entry_decl) = find_entry_point(source) else {
        out.report(Diagnostic::new(
            DiagnosticKind::MissingEntryPoint,
            SourceLocation {
                member: source.name.clone(),
                line: 0,
                column: 0,
            },
            format!(
                "{} has no entry point: expected an instance method `{ENTRY_POINT_NAME}()` returning {}",
                source.name,
                match source.kind {
                    ShaderKind::Compute => "void",
                    ShaderKind::Pixel => "a 4-component float vector",
                }
            ),
        ));
        return Discovery {
            declaration: None,
            structs: Vec::new(),
            static_fields: Vec::new(),
            methods: Vec::new(),
            constants: out.constants,
            needs_sampler: out.needs_sampler,
            diagnostics: out.diagnostics,
        };
    };

    let entry_member = format!("{}.{}", source.name, ENTRY_POINT_NAME);
    let entry_body = Rewriter::new(source, Scope::Entry, entry_member).rewrite_block(&entry_decl.body, &mut out);
    let entry = EntryPoint {
        return_type: match source.kind {
            ShaderKind::Compute => "void".to_string(),
            ShaderKind::Pixel => "float4".to_string(),
        },
        body: entry_body,
        uses_group_ids: false,
    };

    let (methods, static_fields, structs) = collect_closures(source, &mut out);

    let declaration = ShaderDeclaration {
        name: source.name.clone(),
        kind: source.kind,
        thread_group_size: source.thread_group_size(),
        fields,
        entry: EntryPoint {
            uses_group_ids: out.uses_group_ids,
            ..entry
        },
        attributes: source.attributes.clone(),
    };

    tracing::debug!(
        shader = %source.name,
        structs = structs.len(),
        methods = methods.len(),
        static_fields = static_fields.len(),
        constants = out.constants.len(),
        "discovery complete"
    );

    Discovery {
        declaration: Some(declaration),
        structs: order_structs(structs),
        static_fields,
        methods,
        constants: out.constants,
        needs_sampler: out.needs_sampler,
        diagnostics: out.diagnostics,
    }
}

/// The entry method: non-static `Execute()` on the shader type with the kind's return shape.
pub fn find_entry_point(source: &ShaderSource) -> Option<&MethodDecl> {
    source.methods.iter().find(|m| {
        m.owner == source.name
            && m.name == ENTRY_POINT_NAME
            && !m.is_static
            && m.params.is_empty()
            && match source.kind {
                ShaderKind::Compute => m.return_ty.is_void(),
                ShaderKind::Pixel => is_pixel_type(&m.return_ty),
            }
    })
}

fn is_pixel_type(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Named { name, args } if args.is_empty() => builtin_value_type(name).is_some_and(|s| {
            s.scalar == ScalarKind::Float && !s.matrix && s.columns == 4
        }),
        _ => false,
    }
}

fn classify_fields(source: &ShaderSource, out: &mut Discoveries) -> Vec<FieldBinding> {
    let mut fields = Vec::new();
    for field in source.fields.iter().filter(|f| !f.is_static && !f.is_const) {
        let member = format!("{}.{}", source.name, field.name);
        let rewriter = Rewriter::new(source, Scope::Method, member.clone());

        if let Some(shape) = resource_shape(&field.ty) {
            let element = rewriter.map_type(&shape.element, field.span, out);
            fields.push(FieldBinding::Resource(ResourceField {
                name: escape_identifier(&field.name),
                hlsl_type: shape.hlsl_type(&element),
                kind: shape.kind,
                slot_hint: field.slot,
                span: field.span,
            }));
            continue;
        }

        match value_field(source, field, &mut HashSet::new()) {
            Ok(value) => {
                // Registers the struct closure for nested custom types.
                rewriter.map_type(&field.ty, field.span, out);
                fields.push(FieldBinding::Value(value));
            }
            Err(reason) => out.report(Diagnostic::new(
                DiagnosticKind::InvalidField,
                SourceLocation::new(member, field.span),
                format!(
                    "field {} of type {} cannot be captured: {reason}",
                    field.name,
                    field.ty.display()
                ),
            )),
        }
    }
    fields
}

/// Build the value shape of a plain-data field, or explain why it is not one.
fn value_field(
    source: &ShaderSource,
    field: &FieldDecl,
    visiting: &mut HashSet<String>,
) -> Result<ValueField, String> {
    let TypeRef::Named { name, args } = &field.ty else {
        return Err("only numeric, vector, matrix and struct types can be captured".to_string());
    };

    if let Some(decl) = source.find_type(name) {
        if decl.kind == TypeDeclKind::Class {
            return Err(format!("{name} is a reference type"));
        }
        if !visiting.insert(name.clone()) {
            return Err(format!("{name} contains itself"));
        }
        let members = decl
            .instance_fields()
            .map(|f| {
                value_field(source, f, visiting)
                    .map_err(|reason| format!("member {name}.{}: {reason}", f.name))
            })
            .collect::<Result<Vec<_>, _>>()?;
        visiting.remove(name);
        return Ok(ValueField {
            name: escape_identifier(&field.name),
            hlsl_type: type_ident(name),
            shape: ValueShape::Struct {
                type_name: name.clone(),
                members,
            },
            span: field.span,
        });
    }

    if args.is_empty() {
        if let Some(shape) = builtin_value_type(name) {
            return Ok(ValueField {
                span: field.span,
                ..ValueField::primitive(escape_identifier(&field.name), shape)
            });
        }
    }

    if resource_shape(&field.ty).is_some() {
        return Err("resources cannot be nested in value types".to_string());
    }
    Err(format!("{} is not a plain-data type", field.ty.display()))
}

fn collect_closures(
    source: &ShaderSource,
    out: &mut Discoveries,
) -> (Vec<MethodDefinition>, Vec<StaticFieldDefinition>, Vec<StructDefinition>) {
    let mut methods = Vec::new();
    let mut static_fields = Vec::new();
    let mut structs = Vec::new();
    let (mut method_cursor, mut static_cursor, mut type_cursor) = (0, 0, 0);

    loop {
        if let Some(id) = out.methods.get(method_cursor).cloned() {
            method_cursor += 1;
            if let Some(decl) = source.find_method(&id) {
                methods.push(rewrite_method(source, decl, out));
            }
            continue;
        }
        if let Some((owner, name)) = out.static_fields.get(static_cursor).cloned() {
            static_cursor += 1;
            if let Some(def) = rewrite_static_field(source, &owner, &name, out) {
                static_fields.push(def);
            }
            continue;
        }
        if let Some(name) = out.types.get(type_cursor).cloned() {
            type_cursor += 1;
            if let Some(def) = rewrite_struct(source, &name, out) {
                structs.push(def);
            }
            continue;
        }
        break;
    }

    (methods, static_fields, structs)
}

fn rewrite_method(source: &ShaderSource, decl: &MethodDecl, out: &mut Discoveries) -> MethodDefinition {
    let rewriter = Rewriter::new(source, Scope::Method, format!("{}.{}", decl.owner, decl.name));
    let (return_type, params) = rewriter.rewrite_signature(decl, out);
    MethodDefinition {
        id: decl.id.clone(),
        hlsl_name: method_ident(&decl.owner, &decl.name),
        return_type,
        params,
        body: rewriter.rewrite_block(&decl.body, out),
    }
}

fn rewrite_static_field(
    source: &ShaderSource,
    owner: &str,
    name: &str,
    out: &mut Discoveries,
) -> Option<StaticFieldDefinition> {
    let member = format!("{owner}.{name}");
    let Some(decl) = source.find_field(owner, name) else {
        out.report(Diagnostic::new(
            DiagnosticKind::UnsupportedMember,
            SourceLocation {
                member: member.clone(),
                line: 0,
                column: 0,
            },
            format!("static field {member} is not visible to shader code"),
        ));
        return None;
    };

    let rewriter = Rewriter::new(source, Scope::StaticInitializer, member);
    let hlsl_type = rewriter.map_type(&decl.ty, decl.span, out);
    let initializer = decl
        .initializer
        .as_ref()
        .map(|e| rewriter.rewrite_expr(e, decl.span, out));

    Some(StaticFieldDefinition {
        owner: owner.to_string(),
        name: name.to_string(),
        hlsl_name: static_field_ident(owner, name),
        hlsl_type,
        is_constant: decl.is_readonly,
        initializer,
    })
}

fn rewrite_struct(source: &ShaderSource, name: &str, out: &mut Discoveries) -> Option<StructDefinition> {
    let decl = source.find_type(name)?;
    let rewriter = Rewriter::new(source, Scope::Method, name);
    let mut dependencies = Vec::new();
    let fields = decl
        .instance_fields()
        .map(|f| {
            if let TypeRef::Named { name: ty_name, .. } = &f.ty {
                if source
                    .find_type(ty_name)
                    .is_some_and(|t| t.kind == TypeDeclKind::Struct)
                    && !dependencies.contains(ty_name)
                {
                    dependencies.push(ty_name.clone());
                }
            }
            (rewriter.map_type(&f.ty, f.span, out), escape_identifier(&f.name))
        })
        .collect();

    Some(StructDefinition {
        name: name.to_string(),
        hlsl_name: type_ident(name),
        fields,
        dependencies,
    })
}

/// Topologically order structs so every dependency precedes its dependents.
///
/// Iterative post-order DFS, visiting roots in discovery order so the result
/// is deterministic.
pub fn order_structs(structs: Vec<StructDefinition>) -> Vec<StructDefinition> {
    let position = |name: &str| structs.iter().position(|s| s.name == name);
    let mut emitted = vec![false; structs.len()];
    let mut on_stack = vec![false; structs.len()];
    let mut order = Vec::with_capacity(structs.len());

    for root in 0..structs.len() {
        if emitted[root] {
            continue;
        }
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        on_stack[root] = true;
        while let Some((node, next_dep)) = stack.pop() {
            let deps = &structs[node].dependencies;
            if let Some(dep) = deps.get(next_dep) {
                stack.push((node, next_dep + 1));
                if let Some(child) = position(dep) {
                    assert!(!on_stack[child], "cyclic struct dependency through {dep}");
                    if !emitted[child] {
                        on_stack[child] = true;
                        stack.push((child, 0));
                    }
                }
                continue;
            }
            on_stack[node] = false;
            emitted[node] = true;
            order.push(node);
        }
    }

    let mut slots: Vec<Option<StructDefinition>> = structs.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Expr, MethodSymbol, Span, Stmt, StmtKind, Symbol, TypeDecl};

    fn field(name: &str, ty: TypeRef) -> FieldDecl {
        FieldDecl {
            name: name.to_string(),
            ty,
            is_static: false,
            is_const: false,
            is_readonly: false,
            initializer: None,
            slot: None,
            span: Span::default(),
        }
    }

    fn method(owner: &str, name: &str, is_static: bool, body: Vec<Stmt>) -> MethodDecl {
        MethodDecl {
            id: format!("{owner}.{name}()"),
            owner: owner.to_string(),
            name: name.to_string(),
            is_static,
            return_ty: TypeRef::named("void"),
            params: Vec::new(),
            body,
            span: Span::default(),
        }
    }

    fn call(owner: &str, name: &str) -> Stmt {
        Stmt::new(StmtKind::Expr {
            expr: Expr::Invoke {
                callee: Box::new(Expr::Ident {
                    name: name.to_string(),
                    symbol: None,
                }),
                args: Vec::new(),
                method: Some(MethodSymbol {
                    owner: owner.to_string(),
                    name: name.to_string(),
                    id: Some(format!("{owner}.{name}()")),
                    is_static: true,
                }),
            },
        })
    }

    fn shader(fields: Vec<FieldDecl>, methods: Vec<MethodDecl>, types: Vec<TypeDecl>) -> ShaderSource {
        ShaderSource {
            name: "Demo.Shader".to_string(),
            kind: ShaderKind::Compute,
            thread_group_size: None,
            fields,
            methods,
            types,
            attributes: Default::default(),
        }
    }

    fn struct_decl(name: &str, fields: Vec<FieldDecl>) -> TypeDecl {
        TypeDecl {
            name: name.to_string(),
            kind: TypeDeclKind::Struct,
            fields,
        }
    }

    #[test]
    fn missing_entry_point_is_fatal() {
        let src = shader(vec![], vec![method("Demo.Shader", "Run", false, vec![])], vec![]);
        let d = discover(&src);
        assert!(d.declaration.is_none());
        assert_eq!(d.diagnostics.len(), 1);
        assert!(d.diagnostics[0].kind.is_fatal());
    }

    #[test]
    fn static_execute_is_not_an_entry_point() {
        let src = shader(vec![], vec![method("Demo.Shader", "Execute", true, vec![])], vec![]);
        assert!(find_entry_point(&src).is_none());
    }

    #[test]
    fn fields_are_classified_in_declaration_order() {
        let src = shader(
            vec![
                field("scale", TypeRef::named("float")),
                field(
                    "buffer",
                    TypeRef::generic("ReadWriteBuffer", vec![TypeRef::named("float")]),
                ),
                field("node", TypeRef::named("Demo.Node")),
                field("offset", TypeRef::named("Int2")),
            ],
            vec![method("Demo.Shader", "Execute", false, vec![])],
            vec![TypeDecl {
                name: "Demo.Node".to_string(),
                kind: TypeDeclKind::Class,
                fields: Vec::new(),
            }],
        );
        let d = discover(&src);
        let decl = d.declaration.unwrap();
        let names: Vec<&str> = decl.fields.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["scale", "buffer", "offset"]);
        assert_eq!(d.diagnostics.len(), 1);
        assert_eq!(d.diagnostics[0].kind, DiagnosticKind::InvalidField);
    }

    #[test]
    fn struct_with_reference_member_is_rejected() {
        let src = shader(
            vec![field("light", TypeRef::named("Demo.Light"))],
            vec![method("Demo.Shader", "Execute", false, vec![])],
            vec![
                struct_decl("Demo.Light", vec![field("owner", TypeRef::named("Demo.Node"))]),
                TypeDecl {
                    name: "Demo.Node".to_string(),
                    kind: TypeDeclKind::Class,
                    fields: Vec::new(),
                },
            ],
        );
        let d = discover(&src);
        assert!(d.declaration.unwrap().fields.is_empty());
        assert_eq!(d.diagnostics[0].kind, DiagnosticKind::InvalidField);
        assert!(d.structs.is_empty());
    }

    #[test]
    fn methods_are_collected_once_even_when_mutually_recursive() {
        let src = shader(
            vec![],
            vec![
                method("Demo.Shader", "Execute", false, vec![call("Demo.Math", "Ping")]),
                method("Demo.Math", "Ping", true, vec![call("Demo.Math", "Pong")]),
                method("Demo.Math", "Pong", true, vec![call("Demo.Math", "Ping")]),
            ],
            vec![],
        );
        let d = discover(&src);
        let names: Vec<&str> = d.methods.iter().map(|m| m.hlsl_name.as_str()).collect();
        assert_eq!(names, vec!["Demo_Math__Ping", "Demo_Math__Pong"]);
        assert!(d.diagnostics.is_empty());
    }

    #[test]
    fn static_fields_are_discovered_from_methods() {
        let read_table = Stmt::new(StmtKind::Expr {
            expr: Expr::Ident {
                name: "Table".to_string(),
                symbol: Some(Symbol::Field {
                    owner: "Demo.Math".to_string(),
                    is_static: true,
                    is_readonly: true,
                }),
            },
        });
        let mut table = field("Table", TypeRef::named("Float2"));
        table.is_static = true;
        table.is_readonly = true;
        let src = shader(
            vec![],
            vec![
                method("Demo.Shader", "Execute", false, vec![call("Demo.Math", "Read")]),
                method("Demo.Math", "Read", true, vec![read_table]),
            ],
            vec![TypeDecl {
                name: "Demo.Math".to_string(),
                kind: TypeDeclKind::Class,
                fields: vec![table],
            }],
        );
        let d = discover(&src);
        assert_eq!(d.static_fields.len(), 1);
        assert_eq!(d.static_fields[0].hlsl_name, "__Demo_Math__Table");
        assert_eq!(d.static_fields[0].hlsl_type, "float2");
        assert!(d.static_fields[0].is_constant);
    }

    #[test]
    fn nested_structs_are_ordered_leaves_first() {
        let src = shader(
            vec![field("scene", TypeRef::named("Demo.Scene"))],
            vec![method("Demo.Shader", "Execute", false, vec![])],
            vec![
                struct_decl(
                    "Demo.Scene",
                    vec![
                        field("light", TypeRef::named("Demo.Light")),
                        field("tint", TypeRef::named("Demo.Color")),
                    ],
                ),
                struct_decl("Demo.Light", vec![field("color", TypeRef::named("Demo.Color"))]),
                struct_decl("Demo.Color", vec![field("rgb", TypeRef::named("Float3"))]),
            ],
        );
        let d = discover(&src);
        let names: Vec<&str> = d.structs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Demo.Color", "Demo.Light", "Demo.Scene"]);
    }
}
