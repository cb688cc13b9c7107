//! Dispatch-Data Loader: the recipe an external dispatcher follows to fill the
//! constant buffer and bind resources right before execution.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use crate::syntax::ShaderKind;
use crate::translator::layout::{output_texture_binding, pad, ConstantBufferLayout, ResourceBinding};
use crate::translator::types::{ValueField, ValueShape};

/// How the constant buffer reaches the GPU; decides the final padding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantBufferMode {
    /// Root constants, DWORD granular.
    #[default]
    RootConstants,
    /// A real constant buffer resource, 16-byte granular.
    Buffer,
}

/// Copy `size` bytes from the host value of a field into the buffer at `offset`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WriteStep {
    pub field_index: usize,
    pub path: String,
    pub row: Option<u32>,
    /// Offset inside the host value of the top-level field.
    pub source_offset: u32,
    pub offset: u32,
    pub size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BindStep {
    pub name: String,
    pub index: u32,
    pub register_class: char,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecipeField {
    pub name: String,
    /// Byte size of the host value (sequential layout, natural alignment).
    pub host_size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DispatchRecipe {
    pub kind: ShaderKind,
    pub reserved_words: u32,
    pub buffer_size: u32,
    pub fields: Vec<RecipeField>,
    pub writes: Vec<WriteStep>,
    pub binds: Vec<BindStep>,
    /// Index of the implicit pixel shader render target.
    pub output_texture: Option<u32>,
}

/// Host layout of a value: alignment, size and the source offset of every
/// leaf (one per matrix row), in the order the packer places them.
fn host_layout(field: &ValueField) -> (u32, u32, Vec<u32>) {
    match &field.shape {
        ValueShape::Primitive(shape) if shape.matrix => (
            shape.element_size(),
            shape.byte_size(),
            (0..shape.rows).map(|r| r * shape.row_size()).collect(),
        ),
        ValueShape::Primitive(shape) => (shape.element_size(), shape.byte_size(), vec![0]),
        ValueShape::Struct { members, .. } => {
            let mut cursor = 0;
            let mut align = 1;
            let mut offsets = Vec::new();
            for member in members {
                let (a, size, leaves) = host_layout(member);
                cursor = pad(cursor, a);
                offsets.extend(leaves.into_iter().map(|o| o + cursor));
                cursor += size;
                align = align.max(a);
            }
            (align, pad(cursor, align), offsets)
        }
    }
}

pub fn build_recipe(
    kind: ShaderKind,
    fields: &[&ValueField],
    layout: &ConstantBufferLayout,
    bindings: &[ResourceBinding],
    mode: ConstantBufferMode,
) -> DispatchRecipe {
    let mut writes = Vec::with_capacity(layout.placements.len());
    let mut recipe_fields = Vec::with_capacity(fields.len());

    for (index, field) in fields.iter().enumerate() {
        let (_, host_size, sources) = host_layout(field);
        let placements: Vec<_> = layout.placements_for(index).collect();
        assert_eq!(
            sources.len(),
            placements.len(),
            "host and buffer layouts disagree for field {}",
            field.name
        );
        for (placement, source_offset) in placements.into_iter().zip(sources) {
            writes.push(WriteStep {
                field_index: index,
                path: placement.path.clone(),
                row: placement.row,
                source_offset,
                offset: placement.offset,
                size: placement.size,
            });
        }
        recipe_fields.push(RecipeField {
            name: field.name.clone(),
            host_size,
        });
    }

    let binds = bindings
        .iter()
        .map(|b| BindStep {
            name: b.name.clone(),
            index: b.index,
            register_class: b.register_class,
        })
        .collect();

    DispatchRecipe {
        kind,
        reserved_words: kind.reserved_dispatch_words(),
        buffer_size: match mode {
            ConstantBufferMode::RootConstants => layout.dword_size(),
            ConstantBufferMode::Buffer => layout.buffer_size(),
        },
        fields: recipe_fields,
        writes,
        binds,
        output_texture: (kind == ShaderKind::Pixel)
            .then(|| output_texture_binding(bindings.len() as u32).index),
    }
}

impl DispatchRecipe {
    /// Fill a constant buffer: dispatch bounds first, then every write step.
    /// `values` holds the host bytes of each value field in declaration order.
    pub fn build_constant_buffer(&self, dispatch: [u32; 3], values: &[&[u8]]) -> Result<Vec<u8>> {
        if values.len() != self.fields.len() {
            bail!(
                "expected {} field values, got {}",
                self.fields.len(),
                values.len()
            );
        }
        let mut buffer = vec![0u8; self.buffer_size as usize];
        let words = &dispatch[..self.reserved_words as usize];
        let reserved: &[u8] = bytemuck::cast_slice(words);
        buffer[..reserved.len()].copy_from_slice(reserved);

        for step in &self.writes {
            let source = values[step.field_index];
            let start = step.source_offset as usize;
            let end = start + step.size as usize;
            let bytes = source.get(start..end).ok_or_else(|| {
                anyhow!(
                    "value for {} is {} bytes, step needs bytes {start}..{end}",
                    step.path,
                    source.len()
                )
            })?;
            let offset = step.offset as usize;
            buffer[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        Ok(buffer)
    }

    /// Bind resources in declaration order through `bind(step, resource)`.
    pub fn bind_resources<R>(
        &self,
        resources: &[R],
        mut bind: impl FnMut(&BindStep, &R) -> Result<()>,
    ) -> Result<()> {
        if resources.len() != self.binds.len() {
            bail!(
                "expected {} resources, got {}",
                self.binds.len(),
                resources.len()
            );
        }
        for (step, resource) in self.binds.iter().zip(resources) {
            bind(step, resource)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Span;
    use crate::translator::layout::compute_layout;
    use crate::translator::type_map::{PrimitiveShape, ScalarKind};

    #[test]
    fn matrix_rows_become_separate_writes() {
        let m = ValueField::primitive("m", PrimitiveShape::matrix(ScalarKind::Float, 2, 3));
        let layout = compute_layout(ShaderKind::Compute, &[&m]);
        let recipe = build_recipe(ShaderKind::Compute, &[&m], &layout, &[], ConstantBufferMode::RootConstants);

        let steps: Vec<(u32, u32, u32)> = recipe
            .writes
            .iter()
            .map(|w| (w.source_offset, w.offset, w.size))
            .collect();
        assert_eq!(steps, vec![(0, 16, 12), (12, 32, 12)]);
        assert_eq!(recipe.fields[0].host_size, 24);

        let rows: [f32; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let buffer = recipe
            .build_constant_buffer([8, 4, 1], &[bytemuck::cast_slice(&rows)])
            .unwrap();
        let words: Vec<u32> = buffer
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(&words[..3], &[8, 4, 1]);
        let floats: Vec<f32> = words.iter().map(|w| f32::from_bits(*w)).collect();
        assert_eq!(&floats[4..7], &[1.0, 2.0, 3.0]);
        assert_eq!(floats[7], 0.0);
        assert_eq!(&floats[8..11], &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn struct_members_read_host_offsets() {
        let light = ValueField {
            name: "light".to_string(),
            hlsl_type: "Demo_Light".to_string(),
            shape: ValueShape::Struct {
                type_name: "Demo.Light".to_string(),
                members: vec![
                    ValueField::primitive("intensity", PrimitiveShape::scalar(ScalarKind::Float)),
                    ValueField::primitive("weight", PrimitiveShape::scalar(ScalarKind::Double)),
                ],
            },
            span: Span::default(),
        };
        let layout = compute_layout(ShaderKind::Compute, &[&light]);
        let recipe = build_recipe(ShaderKind::Compute, &[&light], &layout, &[], ConstantBufferMode::Buffer);
        let sources: Vec<u32> = recipe.writes.iter().map(|w| w.source_offset).collect();
        assert_eq!(sources, vec![0, 8]);
        assert_eq!(recipe.fields[0].host_size, 16);
        assert_eq!(recipe.buffer_size, 32);
    }

    #[test]
    fn short_values_are_rejected() {
        let a = ValueField::primitive("a", PrimitiveShape::vector(ScalarKind::Float, 4));
        let layout = compute_layout(ShaderKind::Pixel, &[&a]);
        let recipe = build_recipe(ShaderKind::Pixel, &[&a], &layout, &[], ConstantBufferMode::RootConstants);
        assert_eq!(recipe.output_texture, Some(0));
        let short: &[u8] = &[0u8; 8];
        let err = recipe.build_constant_buffer([1, 1, 1], &[short]).unwrap_err();
        assert!(err.to_string().contains("needs bytes 0..16"));
        assert!(recipe.build_constant_buffer([1, 1, 1], &[]).is_err());
    }

    #[test]
    fn resources_bind_in_declaration_order() {
        let bindings = vec![
            ResourceBinding {
                name: "input".to_string(),
                index: 0,
                register_class: 't',
                hlsl_type: "StructuredBuffer<float>".to_string(),
            },
            ResourceBinding {
                name: "output".to_string(),
                index: 1,
                register_class: 'u',
                hlsl_type: "RWStructuredBuffer<float>".to_string(),
            },
        ];
        let layout = compute_layout(ShaderKind::Compute, &[]);
        let recipe = build_recipe(ShaderKind::Compute, &[], &layout, &bindings, ConstantBufferMode::RootConstants);
        let mut seen = Vec::new();
        recipe
            .bind_resources(&["a", "b"], |step, r| {
                seen.push((step.index, *r));
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![(0, "a"), (1, "b")]);
        assert!(recipe.bind_resources(&["a"], |_, _| Ok(())).is_err());
    }
}
