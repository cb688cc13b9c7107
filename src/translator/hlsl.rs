//! HLSL syntax tree produced by the rewriter, and its printer.

use std::fmt::Write as _;

use crate::syntax::{AssignOp, BinaryOp, PostfixOp, UnaryOp};

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Literal or pre-rendered expression text.
    Raw(String),
    Ident(String),
    Member(Box<Expr>, String),
    Call(String, Vec<Expr>),
    MethodCall(Box<Expr>, String, Vec<Expr>),
    Index(Box<Expr>, Vec<Expr>),
    Cast(String, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Postfix(PostfixOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Assign(AssignOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Paren(Box<Expr>),
    /// Tombstone for a construct that could not be rewritten.
    Error(String),
}

impl Expr {
    pub fn raw(text: impl Into<String>) -> Self {
        Expr::Raw(text.into())
    }

    /// `(T)0`, the zero value of any HLSL type.
    pub fn zero_of(ty: impl Into<String>) -> Self {
        Expr::Cast(ty.into(), Box::new(Expr::raw("0")))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    /// `None` is the `default` label.
    pub labels: Vec<Option<Expr>>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Local {
        ty: String,
        vars: Vec<(String, Option<Expr>)>,
    },
    Expr(Expr),
    If {
        condition: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    For {
        init: Vec<Stmt>,
        condition: Option<Expr>,
        step: Vec<Expr>,
        body: Box<Stmt>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },
    Switch {
        value: Expr,
        cases: Vec<SwitchCase>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Empty,
    Error(String),
}

fn unary_prefix(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Plus => "+",
        UnaryOp::Minus => "-",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
        UnaryOp::PreIncrement => "++",
        UnaryOp::PreDecrement => "--",
    }
}

fn binary_token(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
    }
}

fn assign_token(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "=",
        AssignOp::Add => "+=",
        AssignOp::Sub => "-=",
        AssignOp::Mul => "*=",
        AssignOp::Div => "/=",
        AssignOp::Rem => "%=",
        AssignOp::Shl => "<<=",
        AssignOp::Shr => ">>=",
        AssignOp::BitAnd => "&=",
        AssignOp::BitOr => "|=",
        AssignOp::BitXor => "^=",
    }
}

fn join_args(args: &[Expr]) -> String {
    args.iter().map(print_expr).collect::<Vec<_>>().join(", ")
}

/// Print an expression. Parenthesization follows the source tree, which keeps
/// explicit `Paren` nodes, so no precedence analysis happens here.
pub fn print_expr(e: &Expr) -> String {
    match e {
        Expr::Raw(s) | Expr::Ident(s) => s.clone(),
        Expr::Member(target, name) => format!("{}.{name}", print_expr(target)),
        Expr::Call(name, args) => format!("{name}({})", join_args(args)),
        Expr::MethodCall(target, name, args) => {
            format!("{}.{name}({})", print_expr(target), join_args(args))
        }
        Expr::Index(target, args) => format!("{}[{}]", print_expr(target), join_args(args)),
        Expr::Cast(ty, operand) => format!("({ty}){}", print_expr(operand)),
        Expr::Unary(op, operand) => format!("{}{}", unary_prefix(*op), print_expr(operand)),
        Expr::Postfix(op, operand) => {
            let token = match op {
                PostfixOp::Increment => "++",
                PostfixOp::Decrement => "--",
            };
            format!("{}{token}", print_expr(operand))
        }
        Expr::Binary(op, lhs, rhs) => {
            format!("{} {} {}", print_expr(lhs), binary_token(*op), print_expr(rhs))
        }
        Expr::Assign(op, target, value) => {
            format!("{} {} {}", print_expr(target), assign_token(*op), print_expr(value))
        }
        Expr::Conditional(c, t, f) => {
            format!("{} ? {} : {}", print_expr(c), print_expr(t), print_expr(f))
        }
        Expr::Paren(inner) => format!("({})", print_expr(inner)),
        Expr::Error(what) => format!("/* {what} */"),
    }
}

pub const INDENT: &str = "    ";

/// Append a statement at the given indentation depth.
pub fn print_stmt(out: &mut String, s: &Stmt, depth: usize) {
    let pad = INDENT.repeat(depth);
    match s {
        Stmt::Block(stmts) => {
            let _ = writeln!(out, "{pad}{{");
            for inner in stmts {
                print_stmt(out, inner, depth + 1);
            }
            let _ = writeln!(out, "{pad}}}");
        }
        Stmt::Local { .. } | Stmt::Expr(_) => {
            let _ = writeln!(out, "{pad}{};", print_simple(s));
        }
        Stmt::If {
            condition,
            then,
            otherwise,
        } => {
            let _ = writeln!(out, "{pad}if ({})", print_expr(condition));
            print_body(out, then, depth);
            if let Some(otherwise) = otherwise {
                let _ = writeln!(out, "{pad}else");
                print_body(out, otherwise, depth);
            }
        }
        Stmt::For {
            init,
            condition,
            step,
            body,
        } => {
            let init = init.iter().map(print_simple).collect::<Vec<_>>().join(", ");
            let condition = condition.as_ref().map(print_expr).unwrap_or_default();
            let _ = writeln!(out, "{pad}for ({init}; {condition}; {})", join_args(step));
            print_body(out, body, depth);
        }
        Stmt::While { condition, body } => {
            let _ = writeln!(out, "{pad}while ({})", print_expr(condition));
            print_body(out, body, depth);
        }
        Stmt::DoWhile { body, condition } => {
            let _ = writeln!(out, "{pad}do");
            print_body(out, body, depth);
            let _ = writeln!(out, "{pad}while ({});", print_expr(condition));
        }
        Stmt::Switch { value, cases } => {
            let _ = writeln!(out, "{pad}switch ({})", print_expr(value));
            let _ = writeln!(out, "{pad}{{");
            let case_pad = INDENT.repeat(depth + 1);
            for case in cases {
                for label in &case.labels {
                    match label {
                        Some(label) => {
                            let _ = writeln!(out, "{case_pad}case {}:", print_expr(label));
                        }
                        None => {
                            let _ = writeln!(out, "{case_pad}default:");
                        }
                    }
                }
                for inner in &case.body {
                    print_stmt(out, inner, depth + 2);
                }
            }
            let _ = writeln!(out, "{pad}}}");
        }
        Stmt::Break => {
            let _ = writeln!(out, "{pad}break;");
        }
        Stmt::Continue => {
            let _ = writeln!(out, "{pad}continue;");
        }
        Stmt::Return(value) => match value {
            Some(v) => {
                let _ = writeln!(out, "{pad}return {};", print_expr(v));
            }
            None => {
                let _ = writeln!(out, "{pad}return;");
            }
        },
        Stmt::Empty => {
            let _ = writeln!(out, "{pad};");
        }
        Stmt::Error(what) => {
            let _ = writeln!(out, "{pad}/* {what} */");
        }
    }
}

/// Loop and branch bodies always print as blocks.
fn print_body(out: &mut String, body: &Stmt, depth: usize) {
    match body {
        Stmt::Block(_) => print_stmt(out, body, depth),
        other => print_stmt(out, &Stmt::Block(vec![other.clone()]), depth),
    }
}

/// Statements that fit in a `for` header or end in a single `;`.
fn print_simple(s: &Stmt) -> String {
    match s {
        Stmt::Local { ty, vars } => {
            let vars: Vec<String> = vars
                .iter()
                .map(|(name, init)| match init {
                    Some(init) => format!("{name} = {}", print_expr(init)),
                    None => name.clone(),
                })
                .collect();
            format!("{ty} {}", vars.join(", "))
        }
        Stmt::Expr(e) => print_expr(e),
        Stmt::Error(what) => format!("/* {what} */"),
        _ => String::new(),
    }
}

pub fn print_block(stmts: &[Stmt], depth: usize) -> String {
    let mut out = String::new();
    print_stmt(&mut out, &Stmt::Block(stmts.to_vec()), depth);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_nested_control_flow() {
        let body = vec![
            Stmt::Local {
                ty: "float".to_string(),
                vars: vec![("x".to_string(), Some(Expr::raw("1.0")))],
            },
            Stmt::For {
                init: vec![Stmt::Local {
                    ty: "int".to_string(),
                    vars: vec![("i".to_string(), Some(Expr::raw("0")))],
                }],
                condition: Some(Expr::Binary(
                    BinaryOp::Lt,
                    Box::new(Expr::Ident("i".to_string())),
                    Box::new(Expr::raw("4")),
                )),
                step: vec![Expr::Postfix(
                    PostfixOp::Increment,
                    Box::new(Expr::Ident("i".to_string())),
                )],
                body: Box::new(Stmt::Expr(Expr::Assign(
                    AssignOp::Mul,
                    Box::new(Expr::Ident("x".to_string())),
                    Box::new(Expr::raw("2.0")),
                ))),
            },
            Stmt::Return(Some(Expr::zero_of("float"))),
        ];

        let text = print_block(&body, 0);
        assert_eq!(
            text,
            "{\n    float x = 1.0;\n    for (int i = 0; i < 4; i++)\n    {\n        x *= 2.0;\n    }\n    return (float)0;\n}\n"
        );
    }

    #[test]
    fn prints_switch_with_default() {
        let mut out = String::new();
        print_stmt(
            &mut out,
            &Stmt::Switch {
                value: Expr::Ident("v".to_string()),
                cases: vec![
                    SwitchCase {
                        labels: vec![Some(Expr::raw("1"))],
                        body: vec![Stmt::Break],
                    },
                    SwitchCase {
                        labels: vec![None],
                        body: vec![Stmt::Break],
                    },
                ],
            },
            0,
        );
        assert_eq!(
            out,
            "switch (v)\n{\n    case 1:\n        break;\n    default:\n        break;\n}\n"
        );
    }
}
