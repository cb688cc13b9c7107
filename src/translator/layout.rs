//! Layout Engine: constant buffer packing and resource slot assignment.
//!
//! Packing mirrors the HLSL constant buffer rules the GPU runtime expects:
//! a value may not straddle a 16-byte register unless it is at least 16 bytes
//! itself, matrices are packed row by row, and the buffer begins with the
//! reserved dispatch-bound words.

use serde::Serialize;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticPayload, SourceLocation};
use crate::syntax::ShaderKind;
use crate::translator::type_map::ResourceKind;
use crate::translator::types::{ResourceField, ValueField, ValueShape};

/// Size of one constant buffer register.
pub const REGISTER_SIZE: u32 = 16;

/// Maximum root signature cost, in DWORDs.
pub const MAX_ROOT_SIGNATURE_DWORDS: u32 = 64;

/// Smallest multiple of `alignment` that is `>= size`. `alignment` must be a power of two.
pub fn pad(size: u32, alignment: u32) -> u32 {
    debug_assert!(alignment.is_power_of_two());
    (size + alignment - 1) & !(alignment - 1)
}

/// Whether `[offset, offset + size)` spans an `alignment` boundary.
pub fn crosses_boundary(offset: u32, size: u32, alignment: u32) -> bool {
    size > 0 && offset / alignment != (offset + size - 1) / alignment
}

/// Offset at which a value of `size` bytes is placed, given the cursor `offset`.
pub fn align_to_boundary(offset: u32, size: u32, alignment: u32) -> u32 {
    if crosses_boundary(offset, size, alignment) {
        pad(offset, alignment)
    } else {
        offset
    }
}

/// One contiguous write into the constant buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldPlacement {
    /// Index of the top-level value field this placement belongs to.
    pub field_index: usize,
    /// Dotted path for struct members, e.g. `light.color`.
    pub path: String,
    pub hlsl_type: String,
    /// Matrix row, for row-decomposed matrices.
    pub row: Option<u32>,
    pub offset: u32,
    pub size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConstantBufferLayout {
    /// Bytes taken by the dispatch-bound words.
    pub reserved_bytes: u32,
    pub placements: Vec<FieldPlacement>,
    /// Final cursor after the last field.
    pub size: u32,
}

impl ConstantBufferLayout {
    /// Size as pushed through root constants.
    pub fn dword_size(&self) -> u32 {
        pad(self.size, 4)
    }

    /// Size when materialized as a real constant buffer resource.
    pub fn buffer_size(&self) -> u32 {
        pad(self.size, REGISTER_SIZE)
    }

    pub fn dword_count(&self) -> u32 {
        self.dword_size() / 4
    }

    pub fn placements_for(&self, field_index: usize) -> impl Iterator<Item = &FieldPlacement> {
        self.placements
            .iter()
            .filter(move |p| p.field_index == field_index)
    }
}

struct Packer {
    cursor: u32,
    placements: Vec<FieldPlacement>,
}

impl Packer {
    fn place(&mut self, field_index: usize, path: String, hlsl_type: String, row: Option<u32>, size: u32) {
        let offset = align_to_boundary(self.cursor, size, REGISTER_SIZE);
        self.placements.push(FieldPlacement {
            field_index,
            path,
            hlsl_type,
            row,
            offset,
            size,
        });
        self.cursor = offset + size;
    }

    fn place_field(&mut self, field_index: usize, path: String, field: &ValueField) {
        match &field.shape {
            ValueShape::Primitive(shape) if shape.matrix => {
                let row_type = format!("{}{}", shape.scalar.hlsl(), shape.columns);
                for row in 0..shape.rows {
                    self.place(field_index, path.clone(), row_type.clone(), Some(row), shape.row_size());
                }
            }
            ValueShape::Primitive(shape) => {
                self.place(field_index, path, field.hlsl_type.clone(), None, shape.byte_size());
            }
            ValueShape::Struct { members, .. } => {
                self.cursor = pad(self.cursor, REGISTER_SIZE);
                for member in members {
                    self.place_field(field_index, format!("{path}.{}", member.name), member);
                }
                self.cursor = pad(self.cursor, REGISTER_SIZE);
            }
        }
    }
}

/// Pack value fields after the reserved dispatch words of `kind`.
pub fn compute_layout(kind: ShaderKind, fields: &[&ValueField]) -> ConstantBufferLayout {
    let reserved_bytes = kind.reserved_dispatch_words() * 4;
    let mut packer = Packer {
        cursor: reserved_bytes,
        placements: Vec::new(),
    };
    for (index, field) in fields.iter().enumerate() {
        packer.place_field(index, field.name.clone(), field);
    }
    ConstantBufferLayout {
        reserved_bytes,
        placements: packer.placements,
        size: packer.cursor,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceBinding {
    pub name: String,
    pub index: u32,
    /// `t` or `u`.
    pub register_class: char,
    pub hlsl_type: String,
}

/// Resource indices are the 0-based declaration positions.
pub fn assign_resource_slots(resources: &[&ResourceField]) -> Vec<ResourceBinding> {
    resources
        .iter()
        .enumerate()
        .map(|(index, r)| ResourceBinding {
            name: r.name.clone(),
            index: index as u32,
            register_class: r.kind.register_class(),
            hlsl_type: r.hlsl_type.clone(),
        })
        .collect()
}

/// Warn about slot hints the assigned index does not honor.
pub fn check_slot_hints(shader: &str, resources: &[&ResourceField], bindings: &[ResourceBinding]) -> Vec<Diagnostic> {
    resources
        .iter()
        .zip(bindings)
        .filter_map(|(field, binding)| {
            let hint = field.slot_hint?;
            (hint != binding.index).then(|| {
                Diagnostic::new(
                    DiagnosticKind::IgnoredSlotHint,
                    SourceLocation::new(format!("{shader}.{}", field.name), field.span),
                    format!(
                        "resource {} requested slot {hint} but is bound at index {}",
                        field.name, binding.index
                    ),
                )
            })
        })
        .collect()
}

/// Implicit render target of pixel shaders, bound after the declared resources.
pub fn output_texture_binding(resource_count: u32) -> ResourceBinding {
    ResourceBinding {
        name: "__outputTexture".to_string(),
        index: resource_count,
        register_class: ResourceKind::ReadWriteTexture { dims: 2 }.register_class(),
        hlsl_type: "RWTexture2D<unorm float4>".to_string(),
    }
}

/// Root signature cost in DWORDs: constants plus one per bound resource.
pub fn root_signature_cost(layout: &ConstantBufferLayout, resource_count: u32) -> u32 {
    layout.size.div_ceil(4) + resource_count
}

pub fn validate_root_signature(
    shader: &str,
    layout: &ConstantBufferLayout,
    resource_count: u32,
) -> Option<Diagnostic> {
    let dwords = root_signature_cost(layout, resource_count);
    if dwords <= MAX_ROOT_SIGNATURE_DWORDS {
        return None;
    }
    Some(
        Diagnostic::new(
            DiagnosticKind::RootSignatureExceeded,
            SourceLocation {
                member: shader.to_string(),
                line: 0,
                column: 0,
            },
            format!(
                "{shader} needs {dwords} root signature DWORDs, the limit is {MAX_ROOT_SIGNATURE_DWORDS}"
            ),
        )
        .with_payload(DiagnosticPayload::RootSignatureCost { dwords }),
    )
}
