//! Host-language shader declarations as delivered by the build driver.
//!
//! A declaration is a JSON document describing one shader type: its captured
//! fields, every method the entry point may reach, the user types it can see,
//! and the attributes the driver collected. Expressions carry the symbol
//! information the driver resolved, so nothing here needs name lookup.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShaderKind {
    /// Dispatched over a 3D grid; three reserved dispatch-bound words.
    Compute,
    /// Dispatched over a 2D grid writing one pixel per invocation; two reserved words.
    Pixel,
}

impl ShaderKind {
    /// Number of leading 4-byte words carrying the per-axis dispatch bound.
    pub fn reserved_dispatch_words(self) -> u32 {
        match self {
            ShaderKind::Compute => 3,
            ShaderKind::Pixel => 2,
        }
    }

    pub fn default_thread_group_size(self) -> [u32; 3] {
        match self {
            ShaderKind::Compute => [64, 1, 1],
            ShaderKind::Pixel => [8, 8, 1],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

/// One shader declaration, as handed over by the driver.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ShaderSource {
    /// Fully qualified name of the shader type.
    pub name: String,
    pub kind: ShaderKind,
    #[serde(default)]
    pub thread_group_size: Option<[u32; 3]>,
    /// Fields of the shader type, instance and static, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    /// Methods reachable from shader code: the shader's own methods and user helpers.
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    /// User-defined types visible to the shader.
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub attributes: ShaderAttributes,
}

impl ShaderSource {
    pub fn thread_group_size(&self) -> [u32; 3] {
        self.thread_group_size
            .unwrap_or_else(|| self.kind.default_thread_group_size())
    }

    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn find_method(&self, id: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.id == id)
    }

    /// Look up a field declared on `owner`, which is either the shader itself or a user type.
    pub fn find_field(&self, owner: &str, name: &str) -> Option<&FieldDecl> {
        if owner == self.name {
            return self.fields.iter().find(|f| f.name == name);
        }
        self.find_type(owner)?.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ShaderAttributes {
    /// Requested shader profile, e.g. `cs_6_0`.
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub compile_options: CompileOptions,
    /// Effect-style input count; `None` for plain compute shaders.
    #[serde(default)]
    pub input_count: Option<u32>,
    #[serde(default)]
    pub inputs: Vec<InputKind>,
    #[serde(default)]
    pub requires_scene_position: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Simple,
    Complex,
}

/// Native compiler switches requested on the declaration.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CompileOptions {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub optimization_level: Option<u8>,
    #[serde(default)]
    pub warnings_as_errors: bool,
    #[serde(default)]
    pub ieee_strictness: bool,
}

impl CompileOptions {
    /// Command line switches understood by DXC.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.debug {
            args.push("-Zi".to_string());
            args.push("-Od".to_string());
        } else if let Some(level) = self.optimization_level {
            args.push(format!("-O{}", level.min(3)));
        }
        if self.warnings_as_errors {
            args.push("-WX".to_string());
        }
        if self.ieee_strictness {
            args.push("-Gis".to_string());
        }
        args
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TypeDeclKind {
    Struct,
    Class,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeDeclKind,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

impl TypeDecl {
    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.iter().filter(|f| !f.is_static && !f.is_const)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub is_readonly: bool,
    #[serde(default)]
    pub initializer: Option<Expr>,
    /// Explicit resource slot requested by an attribute, if any.
    #[serde(default)]
    pub slot: Option<u32>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MethodDecl {
    /// Unique symbol identity assigned by the driver.
    pub id: String,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub is_static: bool,
    pub return_ty: TypeRef,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub modifier: ParamModifier,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParamModifier {
    #[default]
    None,
    In,
    Ref,
    Out,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Hash)]
#[serde(tag = "kind")]
pub enum TypeRef {
    Named {
        name: String,
        #[serde(default)]
        args: Vec<TypeRef>,
    },
    Array {
        element: Box<TypeRef>,
        #[serde(default = "default_rank")]
        rank: u32,
    },
    Pointer {
        pointee: Box<TypeRef>,
    },
    FunctionPointer,
    Tuple {
        elements: Vec<TypeRef>,
    },
    Dynamic,
}

fn default_rank() -> u32 {
    1
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Named { name, args } if args.is_empty() && name == "void")
    }

    /// Display form used in diagnostics.
    pub fn display(&self) -> String {
        match self {
            TypeRef::Named { name, args } if args.is_empty() => name.clone(),
            TypeRef::Named { name, args } => {
                let args: Vec<String> = args.iter().map(TypeRef::display).collect();
                format!("{name}<{}>", args.join(", "))
            }
            TypeRef::Array { element, rank } => {
                format!("{}[{}]", element.display(), ",".repeat(rank.saturating_sub(1) as usize))
            }
            TypeRef::Pointer { pointee } => format!("{}*", pointee.display()),
            TypeRef::FunctionPointer => "delegate*".to_string(),
            TypeRef::Tuple { elements } => {
                let parts: Vec<String> = elements.iter().map(TypeRef::display).collect();
                format!("({})", parts.join(", "))
            }
            TypeRef::Dynamic => "dynamic".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LiteralKind {
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Bool,
    Char,
    String,
    Null,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub literal: LiteralKind,
    /// Source token text, e.g. `1f`, `0.5`, `42u`.
    pub text: String,
}

/// Resolved meaning of an identifier or member name.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind")]
pub enum Symbol {
    Local,
    Parameter,
    Field {
        owner: String,
        #[serde(default)]
        is_static: bool,
        #[serde(default)]
        is_readonly: bool,
    },
    Constant {
        owner: String,
        value: Literal,
    },
    Property {
        owner: String,
        #[serde(default)]
        is_static: bool,
    },
    Type {
        name: String,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MethodSymbol {
    pub owner: String,
    pub name: String,
    /// Present when the target is a user method declared in `ShaderSource::methods`.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    PreIncrement,
    PreDecrement,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PostfixOp {
    Increment,
    Decrement,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Constant,
    Type,
    Relational,
    Property,
    Positional,
    List,
    Logical,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind")]
pub enum Expr {
    Literal {
        #[serde(flatten)]
        value: Literal,
    },
    Ident {
        name: String,
        #[serde(default)]
        symbol: Option<Symbol>,
    },
    This,
    Member {
        target: Box<Expr>,
        name: String,
        #[serde(default)]
        symbol: Option<Symbol>,
    },
    Invoke {
        callee: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        method: Option<MethodSymbol>,
    },
    Index {
        target: Box<Expr>,
        #[serde(default)]
        target_ty: Option<TypeRef>,
        args: Vec<Expr>,
    },
    New {
        ty: TypeRef,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Default {
        ty: TypeRef,
    },
    Cast {
        ty: TypeRef,
        operand: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Postfix {
        op: PostfixOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    Paren {
        inner: Box<Expr>,
    },

    // Constructs with no shading-language counterpart.
    Await {
        operand: Box<Expr>,
    },
    Query {
        #[serde(default)]
        sources: Vec<Expr>,
    },
    Checked {
        operand: Box<Expr>,
        #[serde(default)]
        unchecked: bool,
    },
    Throw {
        #[serde(default)]
        operand: Option<Box<Expr>>,
    },
    StackAlloc {
        ty: TypeRef,
        #[serde(default)]
        size: Option<Box<Expr>>,
    },
    Tuple {
        elements: Vec<Expr>,
    },
    Range {
        #[serde(default)]
        start: Option<Box<Expr>>,
        #[serde(default)]
        end: Option<Box<Expr>>,
    },
    IsPattern {
        operand: Box<Expr>,
        pattern: PatternKind,
    },
    SwitchExpr {
        operand: Box<Expr>,
        #[serde(default)]
        arms: Vec<Expr>,
    },
    SizeOf {
        ty: TypeRef,
    },
    AnonymousObject {
        #[serde(default)]
        members: Vec<Expr>,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Stmt {
    #[serde(default)]
    pub span: Span,
    #[serde(flatten)]
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            span: Span::default(),
            kind,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    #[serde(default)]
    pub init: Option<Expr>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SwitchSection {
    /// Case labels; `None` is the `default` label.
    pub labels: Vec<Option<Expr>>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind")]
pub enum StmtKind {
    Block {
        #[serde(default)]
        stmts: Vec<Stmt>,
    },
    Local {
        ty: TypeRef,
        vars: Vec<VarDecl>,
    },
    Expr {
        expr: Expr,
    },
    If {
        condition: Expr,
        then: Box<Stmt>,
        #[serde(default)]
        otherwise: Option<Box<Stmt>>,
    },
    For {
        #[serde(default)]
        init: Vec<Stmt>,
        #[serde(default)]
        condition: Option<Expr>,
        #[serde(default)]
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
        #[serde(default)]
        sections: Vec<SwitchSection>,
    },
    Break,
    Continue,
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },
    Empty,

    // Statements with no shading-language counterpart.
    Try {
        #[serde(default)]
        body: Vec<Stmt>,
        #[serde(default)]
        handlers: Vec<Vec<Stmt>>,
        #[serde(default)]
        finally: Option<Vec<Stmt>>,
    },
    Throw {
        #[serde(default)]
        value: Option<Expr>,
    },
    Checked {
        #[serde(default)]
        body: Vec<Stmt>,
        #[serde(default)]
        unchecked: bool,
    },
    Fixed {
        ty: TypeRef,
        vars: Vec<VarDecl>,
        body: Box<Stmt>,
    },
    Using {
        #[serde(default)]
        resource: Option<Expr>,
        body: Box<Stmt>,
    },
    Lock {
        target: Expr,
        body: Box<Stmt>,
    },
    Yield {
        #[serde(default)]
        value: Option<Expr>,
    },
    Foreach {
        ty: TypeRef,
        name: String,
        collection: Expr,
        body: Box<Stmt>,
    },
}

pub fn load_source_from_path(path: impl AsRef<Path>) -> Result<ShaderSource> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read shader declaration {}", path.display()))?;
    parse_source(&text).with_context(|| format!("invalid shader declaration in {}", path.display()))
}

pub fn parse_source(text: &str) -> Result<ShaderSource> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_declaration() {
        let src = parse_source(
            r#"{
                "name": "Demo.Shader",
                "kind": "compute",
                "fields": [
                    { "name": "buffer", "ty": { "kind": "Named", "name": "ReadWriteBuffer", "args": [ { "kind": "Named", "name": "float" } ] } },
                    { "name": "scale", "ty": { "kind": "Named", "name": "float" } }
                ],
                "methods": [
                    {
                        "id": "Demo.Shader.Execute()",
                        "owner": "Demo.Shader",
                        "name": "Execute",
                        "return_ty": { "kind": "Named", "name": "void" },
                        "body": [ { "kind": "Return", "span": { "line": 3, "column": 9 } } ]
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(src.fields.len(), 2);
        assert_eq!(src.thread_group_size(), [64, 1, 1]);
        assert_eq!(src.methods[0].body[0].span.line, 3);
        assert!(src.methods[0].return_ty.is_void());
    }

    #[test]
    fn literal_expression_flattens_value() {
        let e: Expr = serde_json::from_str(r#"{ "kind": "Literal", "literal": "float", "text": "1f" }"#)
            .unwrap();
        assert_eq!(
            e,
            Expr::Literal {
                value: Literal {
                    literal: LiteralKind::Float,
                    text: "1f".to_string()
                }
            }
        );
    }

    #[test]
    fn compile_options_render_dxc_switches() {
        let opts = CompileOptions {
            debug: false,
            optimization_level: Some(7),
            warnings_as_errors: true,
            ieee_strictness: false,
        };
        assert_eq!(opts.to_args(), vec!["-O3", "-WX"]);
    }

    #[test]
    fn type_display_is_readable() {
        let t = TypeRef::generic("ReadWriteBuffer", vec![TypeRef::named("Float4")]);
        assert_eq!(t.display(), "ReadWriteBuffer<Float4>");
    }
}
