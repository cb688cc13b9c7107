//! Syntax rewriter: host expressions and statements to HLSL trees.
//!
//! Each node kind is handled by one match arm that returns the rewritten node.
//! Disallowed constructs produce a diagnostic and an `Error` tombstone, but
//! their children are still visited so one pass reports every problem.
//! The only side effects are appends into the caller-owned [`Discoveries`].

mod expr;
mod stmt;

use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceLocation};
use crate::syntax::{
    Literal, LiteralKind, MethodDecl, ParamModifier, ShaderSource, Span, TypeDeclKind, TypeRef,
};
use crate::translator::hlsl;
use crate::translator::type_map::{builtin_value_type, escape_identifier, resource_shape};
use crate::translator::types::ConstantDefinitions;
use crate::translator::utils::{type_ident, OrderedSet};

/// What kind of code is being rewritten; restricts dispatch-context access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// The shader entry body.
    Entry,
    /// A helper method reachable from the entry body.
    Method,
    /// A static field initializer.
    StaticInitializer,
}

/// Closures and diagnostics accumulated while rewriting one declaration.
#[derive(Clone, Debug, Default)]
pub struct Discoveries {
    /// Custom struct types by qualified name, first-reference order.
    pub types: OrderedSet<String>,
    /// User method ids, first-reference order.
    pub methods: OrderedSet<String>,
    /// Static fields as `(owner, name)`.
    pub static_fields: OrderedSet<(String, String)>,
    pub constants: ConstantDefinitions,
    pub needs_sampler: bool,
    pub uses_group_ids: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl Discoveries {
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

pub struct Rewriter<'a> {
    source: &'a ShaderSource,
    scope: Scope,
    /// Member being rewritten, used for diagnostic locations.
    member: String,
}

impl<'a> Rewriter<'a> {
    pub fn new(source: &'a ShaderSource, scope: Scope, member: impl Into<String>) -> Self {
        Self {
            source,
            scope,
            member: member.into(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    fn at(&self, span: Span) -> SourceLocation {
        SourceLocation::new(self.member.clone(), span)
    }

    fn unsupported(&self, span: Span, construct: &str, out: &mut Discoveries) -> String {
        out.report(Diagnostic::unsupported_construct(self.at(span), construct));
        construct.to_string()
    }

    /// Map a host type to its HLSL spelling, registering custom structs.
    pub fn map_type(&self, ty: &TypeRef, span: Span, out: &mut Discoveries) -> String {
        match ty {
            TypeRef::Named { name, args } => {
                if ty.is_void() {
                    return "void".to_string();
                }
                if let Some(decl) = self.source.find_type(name) {
                    if decl.kind == TypeDeclKind::Class {
                        out.report(Diagnostic::new(
                            DiagnosticKind::UnsupportedType,
                            self.at(span),
                            format!("reference type {name} cannot be used in shader code"),
                        ));
                    } else {
                        out.types.insert(name.clone());
                    }
                    return type_ident(name);
                }
                if args.is_empty() {
                    if let Some(shape) = builtin_value_type(name) {
                        return shape.hlsl_name();
                    }
                }
                if let Some(resource) = resource_shape(ty) {
                    let element = self.map_type(&resource.element, span, out);
                    return resource.hlsl_type(&element);
                }
                out.report(Diagnostic::new(
                    DiagnosticKind::UnsupportedType,
                    self.at(span),
                    format!("type {} has no HLSL mapping", ty.display()),
                ));
                escape_identifier(&type_ident(name))
            }
            TypeRef::Array { .. } => {
                out.report(Diagnostic::new(
                    DiagnosticKind::UnsupportedType,
                    self.at(span),
                    format!("array type {} cannot be used in shader code", ty.display()),
                ));
                "__unsupported_array".to_string()
            }
            TypeRef::Pointer { .. } => self.unsupported(span, "pointer type", out),
            TypeRef::FunctionPointer => self.unsupported(span, "function pointer type", out),
            TypeRef::Tuple { .. } => self.unsupported(span, "tuple type", out),
            TypeRef::Dynamic => self.unsupported(span, "dynamic type", out),
        }
    }

    /// Rewrite a method's return type and parameter list.
    pub fn rewrite_signature(&self, decl: &MethodDecl, out: &mut Discoveries) -> (String, Vec<String>) {
        let return_type = self.map_type(&decl.return_ty, decl.span, out);
        let params = decl
            .params
            .iter()
            .map(|p| {
                let ty = self.map_type(&p.ty, decl.span, out);
                let modifier = match p.modifier {
                    ParamModifier::None => "",
                    ParamModifier::In => "in ",
                    ParamModifier::Ref => "inout ",
                    ParamModifier::Out => "out ",
                };
                format!("{modifier}{ty} {}", escape_identifier(&p.name))
            })
            .collect();
        (return_type, params)
    }

    /// Rewrite a constant's literal value for a `#define`.
    fn constant_value(&self, value: &Literal, span: Span, out: &mut Discoveries) -> Option<String> {
        match rewrite_literal(value) {
            Ok(text) => Some(text),
            Err(construct) => {
                self.unsupported(span, construct, out);
                None
            }
        }
    }

    fn constant_ref(
        &self,
        owner: &str,
        name: &str,
        value: &Literal,
        span: Span,
        out: &mut Discoveries,
    ) -> hlsl::Expr {
        match self.constant_value(value, span, out) {
            Some(text) => hlsl::Expr::Ident(out.constants.register(owner, name, text)),
            None => hlsl::Expr::Error(format!("constant {owner}.{name}")),
        }
    }
}

/// Rewrite a literal token, or name the construct when the literal has no HLSL form.
pub fn rewrite_literal(lit: &Literal) -> Result<String, &'static str> {
    let text: String = lit.text.chars().filter(|&c| c != '_').collect();
    let has_fraction = |t: &str| t.contains(['.', 'e', 'E']);
    match lit.literal {
        LiteralKind::Float => {
            let mut t = text.trim_end_matches(['f', 'F']).to_string();
            if !has_fraction(&t) {
                t.push_str(".0");
            }
            Ok(t)
        }
        LiteralKind::Double => {
            let mut t = text.trim_end_matches(['d', 'D']).to_string();
            if !has_fraction(&t) {
                t.push_str(".0");
            }
            t.push('L');
            Ok(t)
        }
        LiteralKind::Int | LiteralKind::UInt | LiteralKind::Long | LiteralKind::ULong => {
            Ok(rewrite_integer(&text, lit.literal))
        }
        LiteralKind::Bool => Ok(text.to_ascii_lowercase()),
        LiteralKind::Char => Err("character literal"),
        LiteralKind::String => Err("string literal"),
        LiteralKind::Null => Err("null literal"),
    }
}

/// Integer tokens in HLSL form: binary becomes decimal, leading zeros are
/// dropped so the value is not read as octal, and the suffix follows the kind.
fn rewrite_integer(text: &str, kind: LiteralKind) -> String {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    let suffix = match kind {
        LiteralKind::UInt => "u",
        LiteralKind::Long => "L",
        LiteralKind::ULong => "UL",
        _ => "",
    };
    let (radix, body) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        (2, bin)
    } else {
        (10, digits)
    };
    match u64::from_str_radix(body, radix) {
        Ok(value) if radix == 16 => format!("0x{value:X}{suffix}"),
        Ok(value) => format!("{value}{suffix}"),
        Err(_) => text.to_string(),
    }
}
