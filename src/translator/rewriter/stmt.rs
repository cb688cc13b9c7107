use crate::syntax::{Stmt, StmtKind, VarDecl};
use crate::translator::hlsl;
use crate::translator::type_map::escape_identifier;

use super::{Discoveries, Rewriter};

impl Rewriter<'_> {
    pub fn rewrite_block(&self, stmts: &[Stmt], out: &mut Discoveries) -> Vec<hlsl::Stmt> {
        stmts.iter().map(|s| self.rewrite_stmt(s, out)).collect()
    }

    pub fn rewrite_stmt(&self, stmt: &Stmt, out: &mut Discoveries) -> hlsl::Stmt {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Block { stmts } => hlsl::Stmt::Block(self.rewrite_block(stmts, out)),
            StmtKind::Local { ty, vars } => hlsl::Stmt::Local {
                ty: self.map_type(ty, span, out),
                vars: self.rewrite_vars(vars, stmt, out),
            },
            StmtKind::Expr { expr } => hlsl::Stmt::Expr(self.rewrite_expr(expr, span, out)),
            StmtKind::If {
                condition,
                then,
                otherwise,
            } => hlsl::Stmt::If {
                condition: self.rewrite_expr(condition, span, out),
                then: Box::new(self.rewrite_stmt(then, out)),
                otherwise: otherwise
                    .as_ref()
                    .map(|s| Box::new(self.rewrite_stmt(s, out))),
            },
            StmtKind::For {
                init,
                condition,
                step,
                body,
            } => hlsl::Stmt::For {
                init: self.rewrite_block(init, out),
                condition: condition.as_ref().map(|c| self.rewrite_expr(c, span, out)),
                step: self.rewrite_all(step, span, out),
                body: Box::new(self.rewrite_stmt(body, out)),
            },
            StmtKind::While { condition, body } => hlsl::Stmt::While {
                condition: self.rewrite_expr(condition, span, out),
                body: Box::new(self.rewrite_stmt(body, out)),
            },
            StmtKind::DoWhile { body, condition } => hlsl::Stmt::DoWhile {
                body: Box::new(self.rewrite_stmt(body, out)),
                condition: self.rewrite_expr(condition, span, out),
            },
            StmtKind::Switch { value, sections } => hlsl::Stmt::Switch {
                value: self.rewrite_expr(value, span, out),
                cases: sections
                    .iter()
                    .map(|section| hlsl::SwitchCase {
                        labels: section
                            .labels
                            .iter()
                            .map(|l| l.as_ref().map(|l| self.rewrite_expr(l, span, out)))
                            .collect(),
                        body: self.rewrite_block(&section.body, out),
                    })
                    .collect(),
            },
            StmtKind::Break => hlsl::Stmt::Break,
            StmtKind::Continue => hlsl::Stmt::Continue,
            StmtKind::Return { value } => {
                hlsl::Stmt::Return(value.as_ref().map(|v| self.rewrite_expr(v, span, out)))
            }
            StmtKind::Empty => hlsl::Stmt::Empty,

            StmtKind::Try {
                body,
                handlers,
                finally,
            } => {
                let what = self.unsupported(span, "try statement", out);
                self.rewrite_block(body, out);
                for handler in handlers {
                    self.rewrite_block(handler, out);
                }
                if let Some(finally) = finally {
                    self.rewrite_block(finally, out);
                }
                hlsl::Stmt::Error(what)
            }
            StmtKind::Throw { value } => {
                let what = self.unsupported(span, "throw statement", out);
                if let Some(value) = value {
                    self.rewrite_expr(value, span, out);
                }
                hlsl::Stmt::Error(what)
            }
            StmtKind::Checked { body, unchecked } => {
                let construct = if *unchecked {
                    "unchecked block"
                } else {
                    "checked block"
                };
                let what = self.unsupported(span, construct, out);
                self.rewrite_block(body, out);
                hlsl::Stmt::Error(what)
            }
            StmtKind::Fixed { ty, vars, body } => {
                let what = self.unsupported(span, "fixed statement", out);
                self.map_type(ty, span, out);
                self.rewrite_vars(vars, stmt, out);
                self.rewrite_stmt(body, out);
                hlsl::Stmt::Error(what)
            }
            StmtKind::Using { resource, body } => {
                let what = self.unsupported(span, "using statement", out);
                if let Some(resource) = resource {
                    self.rewrite_expr(resource, span, out);
                }
                self.rewrite_stmt(body, out);
                hlsl::Stmt::Error(what)
            }
            StmtKind::Lock { target, body } => {
                let what = self.unsupported(span, "lock statement", out);
                self.rewrite_expr(target, span, out);
                self.rewrite_stmt(body, out);
                hlsl::Stmt::Error(what)
            }
            StmtKind::Yield { value } => {
                let what = self.unsupported(span, "yield statement", out);
                if let Some(value) = value {
                    self.rewrite_expr(value, span, out);
                }
                hlsl::Stmt::Error(what)
            }
            StmtKind::Foreach {
                ty,
                collection,
                body,
                ..
            } => {
                let what = self.unsupported(span, "foreach statement", out);
                self.map_type(ty, span, out);
                self.rewrite_expr(collection, span, out);
                self.rewrite_stmt(body, out);
                hlsl::Stmt::Error(what)
            }
        }
    }

    fn rewrite_vars(
        &self,
        vars: &[VarDecl],
        stmt: &Stmt,
        out: &mut Discoveries,
    ) -> Vec<(String, Option<hlsl::Expr>)> {
        vars.iter()
            .map(|v| {
                (
                    escape_identifier(&v.name),
                    v.init.as_ref().map(|e| self.rewrite_expr(e, stmt.span, out)),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticKind, DiagnosticPayload};
    use crate::syntax::{
        BinaryOp, Expr, Literal, LiteralKind, ShaderKind, ShaderSource, Span, Symbol, TypeRef,
    };
    use crate::translator::hlsl::print_block;
    use crate::translator::rewriter::Scope;

    fn source() -> ShaderSource {
        ShaderSource {
            name: "Demo.Shader".to_string(),
            kind: ShaderKind::Compute,
            thread_group_size: None,
            fields: Vec::new(),
            methods: Vec::new(),
            types: Vec::new(),
            attributes: Default::default(),
        }
    }

    fn local(name: &str) -> Expr {
        Expr::Ident {
            name: name.to_string(),
            symbol: Some(Symbol::Local),
        }
    }

    fn int(text: &str) -> Expr {
        Expr::Literal {
            value: Literal {
                literal: LiteralKind::Int,
                text: text.to_string(),
            },
        }
    }

    #[test]
    fn control_flow_is_preserved() {
        let body = vec![
            Stmt::new(StmtKind::Local {
                ty: TypeRef::named("int"),
                vars: vec![VarDecl {
                    name: "n".to_string(),
                    init: Some(int("0")),
                }],
            }),
            Stmt::new(StmtKind::While {
                condition: Expr::Binary {
                    op: BinaryOp::Lt,
                    lhs: Box::new(local("n")),
                    rhs: Box::new(int("3")),
                },
                body: Box::new(Stmt::new(StmtKind::Expr {
                    expr: Expr::Postfix {
                        op: crate::syntax::PostfixOp::Increment,
                        operand: Box::new(local("n")),
                    },
                })),
            }),
        ];

        let src = source();
        let rw = Rewriter::new(&src, Scope::Entry, "Demo.Shader.Execute");
        let mut out = Discoveries::default();
        let rewritten = rw.rewrite_block(&body, &mut out);

        assert!(out.diagnostics.is_empty());
        assert_eq!(
            print_block(&rewritten, 0),
            "{\n    int n = 0;\n    while (n < 3)\n    {\n        n++;\n    }\n}\n"
        );
    }

    #[test]
    fn rejected_statements_report_nested_problems() {
        let stmt = Stmt {
            span: Span { line: 7, column: 5 },
            kind: StmtKind::Try {
                body: vec![Stmt::new(StmtKind::Foreach {
                    ty: TypeRef::named("float"),
                    name: "v".to_string(),
                    collection: local("values"),
                    body: Box::new(Stmt::new(StmtKind::Empty)),
                })],
                handlers: Vec::new(),
                finally: None,
            },
        };

        let src = source();
        let rw = Rewriter::new(&src, Scope::Method, "Demo.Shader.Helper");
        let mut out = Discoveries::default();
        let rewritten = rw.rewrite_stmt(&stmt, &mut out);

        assert_eq!(rewritten, hlsl::Stmt::Error("try statement".to_string()));
        assert_eq!(out.diagnostics.len(), 2);
        assert!(out
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::UnsupportedConstruct));
        assert_eq!(out.diagnostics[0].location.line, 7);
        assert_eq!(out.diagnostics[0].location.member, "Demo.Shader.Helper");
    }

    fn rejected_constructs(out: &Discoveries) -> Vec<String> {
        let mut names: Vec<String> = out
            .diagnostics
            .iter()
            .map(|d| {
                assert_eq!(d.kind, DiagnosticKind::UnsupportedConstruct, "{d}");
                match &d.payload {
                    Some(DiagnosticPayload::Construct { name }) => name.clone(),
                    other => panic!("unexpected payload {other:?}"),
                }
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn each_disallowed_statement_is_diagnosed_with_its_children() {
        let awaited = || Expr::Await {
            operand: Box::new(local("pending")),
        };
        let yield_break = || Stmt::new(StmtKind::Yield { value: None });
        let cases = vec![
            (
                "lock statement",
                StmtKind::Lock {
                    target: local("gate"),
                    body: Box::new(yield_break()),
                },
                "yield statement",
            ),
            (
                "using statement",
                StmtKind::Using {
                    resource: Some(awaited()),
                    body: Box::new(Stmt::new(StmtKind::Empty)),
                },
                "await expression",
            ),
            (
                "fixed statement",
                StmtKind::Fixed {
                    ty: TypeRef::Pointer {
                        pointee: Box::new(TypeRef::named("float")),
                    },
                    vars: vec![VarDecl {
                        name: "p".to_string(),
                        init: Some(local("data")),
                    }],
                    body: Box::new(Stmt::new(StmtKind::Empty)),
                },
                "pointer type",
            ),
            (
                "yield statement",
                StmtKind::Yield {
                    value: Some(awaited()),
                },
                "await expression",
            ),
            (
                "checked block",
                StmtKind::Checked {
                    body: vec![Stmt::new(StmtKind::Throw { value: None })],
                    unchecked: false,
                },
                "throw statement",
            ),
            (
                "unchecked block",
                StmtKind::Checked {
                    body: vec![yield_break()],
                    unchecked: true,
                },
                "yield statement",
            ),
            (
                "throw statement",
                StmtKind::Throw {
                    value: Some(awaited()),
                },
                "await expression",
            ),
        ];

        let src = source();
        let rw = Rewriter::new(&src, Scope::Method, "Demo.Shader.Helper");
        for (construct, kind, nested) in cases {
            let mut out = Discoveries::default();
            let rewritten = rw.rewrite_stmt(&Stmt::new(kind), &mut out);
            assert_eq!(rewritten, hlsl::Stmt::Error(construct.to_string()));
            let mut expected = vec![construct.to_string(), nested.to_string()];
            expected.sort();
            assert_eq!(rejected_constructs(&out), expected, "{construct}");
        }
    }

    #[test]
    fn unsupported_type_shapes_are_each_diagnosed() {
        let cases = vec![
            (
                "pointer type",
                TypeRef::Pointer {
                    pointee: Box::new(TypeRef::named("float")),
                },
            ),
            ("function pointer type", TypeRef::FunctionPointer),
            (
                "tuple type",
                TypeRef::Tuple {
                    elements: vec![TypeRef::named("float"), TypeRef::named("int")],
                },
            ),
        ];

        let src = source();
        let rw = Rewriter::new(&src, Scope::Method, "Demo.Shader.Helper");
        for (construct, ty) in cases {
            let local_decl = Stmt::new(StmtKind::Local {
                ty,
                vars: vec![VarDecl {
                    name: "v".to_string(),
                    init: None,
                }],
            });
            let mut out = Discoveries::default();
            rw.rewrite_stmt(&local_decl, &mut out);
            assert_eq!(rejected_constructs(&out), vec![construct.to_string()]);
        }
    }
}
