//! Core data model of a translated shader declaration.

use std::collections::HashMap;

use crate::syntax::{ShaderAttributes, ShaderKind, Span};
use crate::translator::hlsl;
use crate::translator::type_map::{PrimitiveShape, ResourceKind};

/// A captured plain-data field.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueField {
    pub name: String,
    /// HLSL type spelling used in the declaration.
    pub hlsl_type: String,
    pub shape: ValueShape,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueShape {
    Primitive(PrimitiveShape),
    /// A custom struct; members are laid out recursively.
    Struct {
        type_name: String,
        members: Vec<ValueField>,
    },
}

impl ValueField {
    pub fn primitive(name: impl Into<String>, shape: PrimitiveShape) -> Self {
        Self {
            name: name.into(),
            hlsl_type: shape.hlsl_name(),
            shape: ValueShape::Primitive(shape),
            span: Span::default(),
        }
    }

    pub fn element_size(&self) -> Option<u32> {
        match &self.shape {
            ValueShape::Primitive(p) => Some(p.element_size()),
            ValueShape::Struct { .. } => None,
        }
    }

    /// 1 for scalars, `rows * columns` otherwise.
    pub fn element_count(&self) -> Option<u32> {
        match &self.shape {
            ValueShape::Primitive(p) => Some(p.element_count()),
            ValueShape::Struct { .. } => None,
        }
    }

    pub fn is_matrix(&self) -> bool {
        matches!(&self.shape, ValueShape::Primitive(p) if p.matrix)
    }
}

/// A captured GPU resource handle.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceField {
    pub name: String,
    pub hlsl_type: String,
    pub kind: ResourceKind,
    /// Slot requested by the declaration, informational only.
    pub slot_hint: Option<u32>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldBinding {
    Value(ValueField),
    Resource(ResourceField),
}

impl FieldBinding {
    pub fn name(&self) -> &str {
        match self {
            FieldBinding::Value(v) => &v.name,
            FieldBinding::Resource(r) => &r.name,
        }
    }
}

/// A custom struct emitted into the program.
#[derive(Clone, Debug, PartialEq)]
pub struct StructDefinition {
    pub name: String,
    pub hlsl_name: String,
    /// `(hlsl_type, field_name)` pairs in declaration order.
    pub fields: Vec<(String, String)>,
    /// Custom types referenced by the fields, for dependency ordering.
    pub dependencies: Vec<String>,
}

/// A discovered helper method, already rewritten.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodDefinition {
    pub id: String,
    pub hlsl_name: String,
    pub return_type: String,
    /// Parameter declarations, e.g. `inout float x`.
    pub params: Vec<String>,
    pub body: Vec<hlsl::Stmt>,
}

impl MethodDefinition {
    pub fn signature(&self) -> String {
        format!(
            "{} {}({})",
            self.return_type,
            self.hlsl_name,
            self.params.join(", ")
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StaticFieldDefinition {
    pub owner: String,
    pub name: String,
    pub hlsl_name: String,
    pub hlsl_type: String,
    /// Readonly fields become `static const`, others mutable `static` globals.
    pub is_constant: bool,
    pub initializer: Option<hlsl::Expr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstantDefinition {
    pub owner: String,
    pub name: String,
    pub hlsl_name: String,
    /// Rewritten literal text.
    pub value: String,
}

/// Compile-time constants keyed by `(owner, name)`, in first-reference order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstantDefinitions {
    entries: Vec<ConstantDefinition>,
    index: HashMap<(String, String), usize>,
}

impl ConstantDefinitions {
    /// Register a constant and return its macro name. Re-registering the same
    /// `(owner, name)` keeps the first value.
    pub fn register(&mut self, owner: &str, name: &str, value: String) -> String {
        let key = (owner.to_string(), name.to_string());
        if let Some(&i) = self.index.get(&key) {
            return self.entries[i].hlsl_name.clone();
        }
        let hlsl_name = crate::translator::utils::constant_ident(owner, name);
        self.index.insert(key, self.entries.len());
        self.entries.push(ConstantDefinition {
            owner: owner.to_string(),
            name: name.to_string(),
            hlsl_name: hlsl_name.clone(),
            value,
        });
        hlsl_name
    }

    pub fn get(&self, owner: &str, name: &str) -> Option<&ConstantDefinition> {
        let i = self.index.get(&(owner.to_string(), name.to_string()))?;
        self.entries.get(*i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConstantDefinition> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The rewritten entry method.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryPoint {
    /// `void` for compute shaders, the pixel type for pixel shaders.
    pub return_type: String,
    pub body: Vec<hlsl::Stmt>,
    pub uses_group_ids: bool,
}

/// A shader declaration after discovery: immutable input to layout and assembly.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderDeclaration {
    pub name: String,
    pub kind: ShaderKind,
    pub thread_group_size: [u32; 3],
    /// Valid fields in declaration order; invalid ones were dropped with a diagnostic.
    pub fields: Vec<FieldBinding>,
    pub entry: EntryPoint,
    pub attributes: ShaderAttributes,
}

impl ShaderDeclaration {
    pub fn value_fields(&self) -> Vec<&ValueField> {
        self.fields
            .iter()
            .filter_map(|f| match f {
                FieldBinding::Value(v) => Some(v),
                FieldBinding::Resource(_) => None,
            })
            .collect()
    }

    pub fn resource_fields(&self) -> Vec<&ResourceField> {
        self.fields
            .iter()
            .filter_map(|f| match f {
                FieldBinding::Resource(r) => Some(r),
                FieldBinding::Value(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::type_map::ScalarKind;

    #[test]
    fn constants_are_unique_per_owner_and_name() {
        let mut defs = ConstantDefinitions::default();
        let a = defs.register("Demo.A", "Size", "4".to_string());
        let b = defs.register("Demo.B", "Size", "4".to_string());
        let again = defs.register("Demo.A", "Size", "8".to_string());
        assert_ne!(a, b);
        assert_eq!(a, again);
        assert_eq!(defs.len(), 2);
        assert_eq!(defs.get("Demo.A", "Size").unwrap().value, "4");
    }

    #[test]
    fn value_field_reports_matrix_shape() {
        let m = ValueField::primitive("m", PrimitiveShape::matrix(ScalarKind::Float, 2, 3));
        assert!(m.is_matrix());
        assert_eq!(m.element_size(), Some(4));
        assert_eq!(m.element_count(), Some(6));
        assert_eq!(m.hlsl_type, "float2x3");
    }
}
