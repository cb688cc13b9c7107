use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::syntax::{Expr, MethodSymbol, Span, Symbol, TypeDeclKind, TypeRef};
use crate::translator::hlsl;
use crate::translator::type_map::{
    builtin_value_type, escape_identifier, map_instance_member, map_intrinsic, map_static_member,
    matrix_index, resource_shape, simple_name, DispatchContext, ResourceKind,
};
use crate::translator::utils::{method_ident, static_field_ident};

use super::{rewrite_literal, Discoveries, Rewriter, Scope};

impl Rewriter<'_> {
    pub fn rewrite_expr(&self, e: &Expr, span: Span, out: &mut Discoveries) -> hlsl::Expr {
        match e {
            Expr::Literal { value } => match rewrite_literal(value) {
                Ok(text) => hlsl::Expr::Raw(text),
                Err(construct) => hlsl::Expr::Error(self.unsupported(span, construct, out)),
            },
            Expr::Ident { name, symbol } => self.rewrite_ident(name, symbol.as_ref(), span, out),
            Expr::This => hlsl::Expr::Error(self.unsupported(span, "shader instance reference", out)),
            Expr::Member {
                target,
                name,
                symbol,
            } => self.rewrite_member(target, name, symbol.as_ref(), span, out),
            Expr::Invoke {
                callee,
                args,
                method,
            } => self.rewrite_invoke(callee, args, method.as_ref(), span, out),
            Expr::Index {
                target,
                target_ty,
                args,
            } => self.rewrite_index(target, target_ty.as_ref(), args, span, out),
            Expr::New { ty, args } => {
                if resource_shape(ty).is_some() {
                    self.rewrite_all(args, span, out);
                    return hlsl::Expr::Error(self.unsupported(span, "resource construction", out));
                }
                let ty = self.map_type(ty, span, out);
                if args.is_empty() {
                    hlsl::Expr::zero_of(ty)
                } else {
                    hlsl::Expr::Call(ty, self.rewrite_all(args, span, out))
                }
            }
            Expr::Default { ty } => hlsl::Expr::zero_of(self.map_type(ty, span, out)),
            Expr::Cast { ty, operand } => hlsl::Expr::Cast(
                self.map_type(ty, span, out),
                Box::new(self.rewrite_expr(operand, span, out)),
            ),
            Expr::Unary { op, operand } => {
                hlsl::Expr::Unary(*op, Box::new(self.rewrite_expr(operand, span, out)))
            }
            Expr::Postfix { op, operand } => {
                hlsl::Expr::Postfix(*op, Box::new(self.rewrite_expr(operand, span, out)))
            }
            Expr::Binary { op, lhs, rhs } => hlsl::Expr::Binary(
                *op,
                Box::new(self.rewrite_expr(lhs, span, out)),
                Box::new(self.rewrite_expr(rhs, span, out)),
            ),
            Expr::Assign { op, target, value } => hlsl::Expr::Assign(
                *op,
                Box::new(self.rewrite_expr(target, span, out)),
                Box::new(self.rewrite_expr(value, span, out)),
            ),
            Expr::Conditional {
                condition,
                when_true,
                when_false,
            } => hlsl::Expr::Conditional(
                Box::new(self.rewrite_expr(condition, span, out)),
                Box::new(self.rewrite_expr(when_true, span, out)),
                Box::new(self.rewrite_expr(when_false, span, out)),
            ),
            Expr::Paren { inner } => hlsl::Expr::Paren(Box::new(self.rewrite_expr(inner, span, out))),

            Expr::Await { operand } => self.reject(span, "await expression", [&**operand], out),
            Expr::Query { sources } => self.reject(span, "query expression", sources, out),
            Expr::Checked { operand, unchecked } => {
                let construct = if *unchecked {
                    "unchecked expression"
                } else {
                    "checked expression"
                };
                self.reject(span, construct, [&**operand], out)
            }
            Expr::Throw { operand } => self.reject(span, "throw expression", operand.as_deref(), out),
            Expr::StackAlloc { ty, size } => {
                self.map_type(ty, span, out);
                self.reject(span, "stackalloc expression", size.as_deref(), out)
            }
            Expr::Tuple { elements } => self.reject(span, "tuple literal", elements, out),
            Expr::Range { start, end } => self.reject(
                span,
                "range expression",
                start.as_deref().into_iter().chain(end.as_deref()),
                out,
            ),
            Expr::IsPattern { operand, .. } => {
                self.reject(span, "pattern matching", [&**operand], out)
            }
            Expr::SwitchExpr { operand, arms } => self.reject(
                span,
                "switch expression",
                std::iter::once(&**operand).chain(arms),
                out,
            ),
            Expr::SizeOf { ty } => {
                self.map_type(ty, span, out);
                hlsl::Expr::Error(self.unsupported(span, "sizeof expression", out))
            }
            Expr::AnonymousObject { members } => self.reject(span, "anonymous object", members, out),
        }
    }

    pub(super) fn rewrite_all(&self, args: &[Expr], span: Span, out: &mut Discoveries) -> Vec<hlsl::Expr> {
        args.iter().map(|a| self.rewrite_expr(a, span, out)).collect()
    }

    /// Diagnose a construct, then visit its children for further diagnostics.
    fn reject<'e>(
        &self,
        span: Span,
        construct: &str,
        children: impl IntoIterator<Item = &'e Expr>,
        out: &mut Discoveries,
    ) -> hlsl::Expr {
        let name = self.unsupported(span, construct, out);
        for child in children {
            self.rewrite_expr(child, span, out);
        }
        hlsl::Expr::Error(name)
    }

    fn rewrite_ident(&self, name: &str, symbol: Option<&Symbol>, span: Span, out: &mut Discoveries) -> hlsl::Expr {
        match symbol {
            Some(Symbol::Constant { owner, value }) => self.constant_ref(owner, name, value, span, out),
            Some(Symbol::Field {
                owner,
                is_static: true,
                ..
            }) => self.static_field_ref(owner, name, out),
            Some(Symbol::Property {
                owner,
                is_static: true,
            }) => self.static_member(owner, name, span, out),
            Some(Symbol::Type { name }) => {
                hlsl::Expr::Ident(self.map_type(&TypeRef::named(name.clone()), span, out))
            }
            _ => hlsl::Expr::Ident(escape_identifier(name)),
        }
    }

    fn rewrite_member(
        &self,
        target: &Expr,
        name: &str,
        symbol: Option<&Symbol>,
        span: Span,
        out: &mut Discoveries,
    ) -> hlsl::Expr {
        match symbol {
            Some(Symbol::Constant { owner, value }) => {
                return self.constant_ref(owner, name, value, span, out);
            }
            Some(Symbol::Field {
                owner,
                is_static: true,
                ..
            }) => return self.static_field_ref(owner, name, out),
            Some(Symbol::Property {
                owner,
                is_static: true,
            }) => return self.static_member(owner, name, span, out),
            _ => {}
        }

        // Captured fields are globals in HLSL, so `this.x` is just `x`.
        if matches!(target, Expr::This) {
            return hlsl::Expr::Ident(escape_identifier(name));
        }

        let target = self.rewrite_expr(target, span, out);
        match symbol {
            Some(Symbol::Property { owner, .. }) => match map_instance_member(owner, name) {
                Some(mapped) => hlsl::Expr::Member(Box::new(target), mapped),
                None => {
                    out.report(Diagnostic::new(
                        DiagnosticKind::UnsupportedMember,
                        self.at(span),
                        format!("property {owner}.{name} has no HLSL mapping"),
                    ));
                    hlsl::Expr::Error(format!("{owner}.{name}"))
                }
            },
            Some(Symbol::Field { owner, .. }) => {
                if self
                    .source
                    .find_type(owner)
                    .is_some_and(|t| t.kind == TypeDeclKind::Struct)
                {
                    out.types.insert(owner.clone());
                }
                hlsl::Expr::Member(Box::new(target), escape_identifier(name))
            }
            _ => hlsl::Expr::Member(Box::new(target), escape_identifier(name)),
        }
    }

    fn static_field_ref(&self, owner: &str, name: &str, out: &mut Discoveries) -> hlsl::Expr {
        out.static_fields.insert((owner.to_string(), name.to_string()));
        hlsl::Expr::Ident(static_field_ident(owner, name))
    }

    /// Static properties: dispatch context members and named vector constants.
    fn static_member(&self, owner: &str, name: &str, span: Span, out: &mut Discoveries) -> hlsl::Expr {
        let Some(mapped) = map_static_member(owner, name, self.source.kind) else {
            out.report(Diagnostic::new(
                DiagnosticKind::UnsupportedMember,
                self.at(span),
                format!("static member {owner}.{name} has no HLSL mapping"),
            ));
            return hlsl::Expr::Error(format!("{owner}.{name}"));
        };

        let invalid = match mapped.context {
            DispatchContext::Invocation => self.scope != Scope::Entry,
            DispatchContext::DispatchBounds => self.scope == Scope::StaticInitializer,
            DispatchContext::CompileTime => false,
        };
        if invalid {
            out.report(Diagnostic::new(
                DiagnosticKind::InvalidDispatchContextAccess,
                self.at(span),
                format!(
                    "{}.{name} is only available inside the shader entry point",
                    simple_name(owner)
                ),
            ));
        }
        if mapped.uses_group_ids {
            out.uses_group_ids = true;
        }
        hlsl::Expr::Raw(mapped.hlsl)
    }

    fn rewrite_invoke(
        &self,
        callee: &Expr,
        args: &[Expr],
        method: Option<&MethodSymbol>,
        span: Span,
        out: &mut Discoveries,
    ) -> hlsl::Expr {
        let Some(method) = method else {
            let args = self.rewrite_all(args, span, out);
            return match callee {
                Expr::Ident { name, .. } => hlsl::Expr::Call(escape_identifier(name), args),
                Expr::Member { target, name, .. } => {
                    let target = self.rewrite_expr(target, span, out);
                    hlsl::Expr::MethodCall(Box::new(target), name.clone(), args)
                }
                _ => hlsl::Expr::Error(self.unsupported(span, "indirect invocation", out)),
            };
        };

        if let Some(decl) = method.id.as_deref().and_then(|id| self.source.find_method(id)) {
            let args = self.rewrite_all(args, span, out);
            if !decl.is_static && decl.owner != self.source.name {
                out.report(Diagnostic::new(
                    DiagnosticKind::UnsupportedMember,
                    self.at(span),
                    format!(
                        "instance method {}.{} on a custom type cannot be called from shader code",
                        decl.owner, decl.name
                    ),
                ));
                return hlsl::Expr::Error(format!("{}.{}", decl.owner, decl.name));
            }
            out.methods.insert(decl.id.clone());
            return hlsl::Expr::Call(method_ident(&decl.owner, &decl.name), args);
        }

        let args = self.rewrite_all(args, span, out);
        match map_intrinsic(&method.owner, &method.name) {
            Some(intrinsic) => hlsl::Expr::Call(intrinsic, args),
            None => {
                out.report(Diagnostic::new(
                    DiagnosticKind::UnsupportedMember,
                    self.at(span),
                    format!("method {}.{} has no HLSL mapping", method.owner, method.name),
                ));
                hlsl::Expr::Error(format!("{}.{}", method.owner, method.name))
            }
        }
    }

    fn rewrite_index(
        &self,
        target: &Expr,
        target_ty: Option<&TypeRef>,
        args: &[Expr],
        span: Span,
        out: &mut Discoveries,
    ) -> hlsl::Expr {
        if let Some(resource) = target_ty.and_then(resource_shape) {
            let target = Box::new(self.rewrite_expr(target, span, out));
            let args = self.rewrite_all(args, span, out);
            return match resource.kind {
                ResourceKind::SampledTexture { .. } => {
                    out.needs_sampler = true;
                    let coords = pack_index(args, "float");
                    hlsl::Expr::MethodCall(
                        target,
                        "SampleLevel".to_string(),
                        vec![
                            hlsl::Expr::Ident("__sampler".to_string()),
                            coords,
                            hlsl::Expr::raw("0"),
                        ],
                    )
                }
                _ => hlsl::Expr::Index(target, vec![pack_index(args, "int")]),
            };
        }

        let matrix = target_ty
            .and_then(|t| match t {
                TypeRef::Named { name, args } if args.is_empty() => builtin_value_type(name),
                _ => None,
            })
            .filter(|shape| shape.matrix);

        if let Some(shape) = matrix {
            let mut elements = Vec::with_capacity(args.len());
            let mut out_of_range = None;
            let mut non_constant = false;
            for arg in args {
                match matrix_index_arg(arg) {
                    Some((_, (row, column))) if row < shape.rows && column < shape.columns => {
                        elements.push((row, column));
                    }
                    Some((name, _)) => {
                        out_of_range.get_or_insert(name);
                    }
                    None => non_constant = true,
                }
            }
            let target = Box::new(self.rewrite_expr(target, span, out));
            if let Some(name) = out_of_range {
                out.report(Diagnostic::new(
                    DiagnosticKind::NonConstantMatrixIndex,
                    self.at(span),
                    format!(
                        "MatrixIndex.{name} is out of range for a {}x{} matrix",
                        shape.rows, shape.columns
                    ),
                ));
                return hlsl::Expr::Index(target, self.rewrite_all(args, span, out));
            }
            if non_constant {
                if args.len() > 1 {
                    out.report(Diagnostic::new(
                        DiagnosticKind::NonConstantMatrixIndex,
                        self.at(span),
                        "matrix element indexers require constant MatrixIndex arguments",
                    ));
                }
                return hlsl::Expr::Index(target, self.rewrite_all(args, span, out));
            }
            if !elements.is_empty() {
                let swizzle: String = elements
                    .iter()
                    .map(|(r, c)| format!("_m{r}{c}"))
                    .collect();
                return hlsl::Expr::Member(target, swizzle);
            }
            return hlsl::Expr::Index(target, self.rewrite_all(args, span, out));
        }

        let target = Box::new(self.rewrite_expr(target, span, out));
        hlsl::Expr::Index(target, self.rewrite_all(args, span, out))
    }
}

/// Combine multi-argument indices into one vector argument.
fn pack_index(mut args: Vec<hlsl::Expr>, scalar: &str) -> hlsl::Expr {
    if args.len() == 1 {
        return args.remove(0);
    }
    hlsl::Expr::Call(format!("{scalar}{}", args.len()), args)
}

/// A `MatrixIndex.Mrc` constant argument: its member name and 0-based `(row, column)`.
fn matrix_index_arg(arg: &Expr) -> Option<(&str, (u32, u32))> {
    let (owner, name) = match arg {
        Expr::Member {
            target,
            name,
            symbol,
        } => {
            let owner = match symbol {
                Some(Symbol::Constant { owner, .. })
                | Some(Symbol::Field { owner, .. })
                | Some(Symbol::Property { owner, .. }) => owner.as_str(),
                _ => match &**target {
                    Expr::Ident { name, .. } => name.as_str(),
                    _ => return None,
                },
            };
            (owner, name.as_str())
        }
        Expr::Ident {
            name,
            symbol:
                Some(
                    Symbol::Constant { owner, .. }
                    | Symbol::Field { owner, .. }
                    | Symbol::Property { owner, .. },
                ),
        } => (owner.as_str(), name.as_str()),
        _ => return None,
    };
    if simple_name(owner) != "MatrixIndex" {
        return None;
    }
    Some((name, matrix_index(name)?))
}
