//! Static mapping tables from host-language names to HLSL.
//!
//! Pure lookups. Anything that needs to remember what it saw (custom types,
//! constants, samplers) lives in the rewriter's discovery state instead.

use crate::syntax::{ShaderKind, TypeRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
    Double,
    Long,
    ULong,
}

impl ScalarKind {
    pub fn hlsl(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::UInt => "uint",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::Long => "int64_t",
            ScalarKind::ULong => "uint64_t",
        }
    }

    /// Size in bytes of one element, both on the host and in a constant buffer.
    pub fn size(self) -> u32 {
        match self {
            ScalarKind::Bool | ScalarKind::Int | ScalarKind::UInt | ScalarKind::Float => 4,
            ScalarKind::Double | ScalarKind::Long | ScalarKind::ULong => 8,
        }
    }

    fn from_scalar_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" | "Boolean" => ScalarKind::Bool,
            "int" | "Int32" => ScalarKind::Int,
            "uint" | "UInt32" => ScalarKind::UInt,
            "float" | "Single" => ScalarKind::Float,
            "double" | "Double" => ScalarKind::Double,
            "long" | "Int64" => ScalarKind::Long,
            "ulong" | "UInt64" => ScalarKind::ULong,
            _ => return None,
        })
    }

    fn from_vector_prefix(prefix: &str) -> Option<Self> {
        Some(match prefix {
            "Bool" => ScalarKind::Bool,
            "Int" => ScalarKind::Int,
            "UInt" => ScalarKind::UInt,
            "Float" => ScalarKind::Float,
            "Double" => ScalarKind::Double,
            _ => return None,
        })
    }
}

/// Shape of a built-in numeric value type: scalar, vector or matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct PrimitiveShape {
    pub scalar: ScalarKind,
    pub rows: u32,
    pub columns: u32,
    pub matrix: bool,
}

impl PrimitiveShape {
    pub fn scalar(scalar: ScalarKind) -> Self {
        Self {
            scalar,
            rows: 1,
            columns: 1,
            matrix: false,
        }
    }

    pub fn vector(scalar: ScalarKind, len: u32) -> Self {
        Self {
            scalar,
            rows: 1,
            columns: len,
            matrix: false,
        }
    }

    pub fn matrix(scalar: ScalarKind, rows: u32, columns: u32) -> Self {
        Self {
            scalar,
            rows,
            columns,
            matrix: true,
        }
    }

    pub fn hlsl_name(&self) -> String {
        let base = self.scalar.hlsl();
        if self.matrix {
            format!("{base}{}x{}", self.rows, self.columns)
        } else if self.columns > 1 {
            format!("{base}{}", self.columns)
        } else {
            base.to_string()
        }
    }

    pub fn element_size(&self) -> u32 {
        self.scalar.size()
    }

    pub fn element_count(&self) -> u32 {
        self.rows * self.columns
    }

    pub fn byte_size(&self) -> u32 {
        self.element_size() * self.element_count()
    }

    /// Bytes in one row; equals `byte_size` for scalars and vectors.
    pub fn row_size(&self) -> u32 {
        self.element_size() * self.columns
    }

    pub fn is_vector(&self) -> bool {
        !self.matrix && self.columns > 1
    }
}

/// Last segment of a qualified name.
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Resolve a built-in numeric/vector/matrix type by name.
pub fn builtin_value_type(name: &str) -> Option<PrimitiveShape> {
    let name = simple_name(name);
    if let Some(scalar) = ScalarKind::from_scalar_name(name) {
        return Some(PrimitiveShape::scalar(scalar));
    }

    let digits_at = name.find(|c: char| c.is_ascii_digit())?;
    let (prefix, dims) = name.split_at(digits_at);
    let scalar = ScalarKind::from_vector_prefix(prefix)?;
    let in_range = |n: u32| (1..=4).contains(&n);

    if let Some((r, c)) = dims.split_once('x') {
        let rows: u32 = r.parse().ok()?;
        let columns: u32 = c.parse().ok()?;
        if in_range(rows) && in_range(columns) {
            return Some(PrimitiveShape::matrix(scalar, rows, columns));
        }
        return None;
    }

    let len: u32 = dims.parse().ok()?;
    if (2..=4).contains(&len) {
        Some(PrimitiveShape::vector(scalar, len))
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ResourceKind {
    ReadOnlyBuffer,
    ReadWriteBuffer,
    ReadOnlyTexture { dims: u32 },
    ReadWriteTexture { dims: u32 },
    /// Texture read through an implicit linear sampler.
    SampledTexture { dims: u32 },
}

impl ResourceKind {
    /// Register class letter for this resource.
    pub fn register_class(self) -> char {
        match self {
            ResourceKind::ReadWriteBuffer | ResourceKind::ReadWriteTexture { .. } => 'u',
            _ => 't',
        }
    }

    pub fn texture_dims(self) -> Option<u32> {
        match self {
            ResourceKind::ReadOnlyTexture { dims }
            | ResourceKind::ReadWriteTexture { dims }
            | ResourceKind::SampledTexture { dims } => Some(dims),
            _ => None,
        }
    }

    fn hlsl_template(self) -> String {
        match self {
            ResourceKind::ReadOnlyBuffer => "StructuredBuffer".to_string(),
            ResourceKind::ReadWriteBuffer => "RWStructuredBuffer".to_string(),
            ResourceKind::ReadOnlyTexture { dims } | ResourceKind::SampledTexture { dims } => {
                format!("Texture{dims}D")
            }
            ResourceKind::ReadWriteTexture { dims } => format!("RWTexture{dims}D"),
        }
    }
}

/// A typed GPU resource shape recognized from a host type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceShape {
    pub kind: ResourceKind,
    /// Shader-visible element type.
    pub element: TypeRef,
    /// Element is stored in a normalized pixel format (`unorm`).
    pub normalized: bool,
}

impl ResourceShape {
    /// HLSL declaration type, given the already-mapped element type name.
    pub fn hlsl_type(&self, element_hlsl: &str) -> String {
        let element = if self.normalized {
            format!("unorm {element_hlsl}")
        } else {
            element_hlsl.to_string()
        };
        format!("{}<{element}>", self.kind.hlsl_template())
    }
}

/// Recognize one of the typed GPU resource shapes.
pub fn resource_shape(ty: &TypeRef) -> Option<ResourceShape> {
    let TypeRef::Named { name, args } = ty else {
        return None;
    };
    let name = simple_name(name);

    let kind = match name {
        "ReadOnlyBuffer" => ResourceKind::ReadOnlyBuffer,
        "ReadWriteBuffer" => ResourceKind::ReadWriteBuffer,
        "ReadOnlyTexture1D" => ResourceKind::ReadOnlyTexture { dims: 1 },
        "ReadOnlyTexture2D" => ResourceKind::ReadOnlyTexture { dims: 2 },
        "ReadOnlyTexture3D" => ResourceKind::ReadOnlyTexture { dims: 3 },
        "ReadWriteTexture1D" => ResourceKind::ReadWriteTexture { dims: 1 },
        "ReadWriteTexture2D" => ResourceKind::ReadWriteTexture { dims: 2 },
        "ReadWriteTexture3D" => ResourceKind::ReadWriteTexture { dims: 3 },
        "IReadOnlyNormalizedTexture2D" => ResourceKind::SampledTexture { dims: 2 },
        "IReadOnlyNormalizedTexture3D" => ResourceKind::SampledTexture { dims: 3 },
        _ => return None,
    };

    match args.as_slice() {
        [element] => Some(ResourceShape {
            kind,
            element: element.clone(),
            normalized: matches!(kind, ResourceKind::SampledTexture { .. }),
        }),
        // `<TPixel, T>`: a packed pixel format read and written as `T`.
        [_pixel, element] if kind.texture_dims().is_some() => Some(ResourceShape {
            kind,
            element: element.clone(),
            normalized: true,
        }),
        _ => None,
    }
}

/// Which invocation context a dispatch member needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchContext {
    /// Only meaningful inside the entry body (per-invocation system values).
    Invocation,
    /// Readable anywhere except constant initializers (reserved dispatch words).
    DispatchBounds,
    /// Compile-time values, valid everywhere.
    CompileTime,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappedMember {
    pub hlsl: String,
    pub context: DispatchContext,
    /// Needs the group thread id system value on the entry point.
    pub uses_group_ids: bool,
}

impl MappedMember {
    fn compile_time(hlsl: impl Into<String>) -> Self {
        Self {
            hlsl: hlsl.into(),
            context: DispatchContext::CompileTime,
            uses_group_ids: false,
        }
    }
}

fn is_swizzle(name: &str, alphabet: &str, max_len: usize) -> bool {
    !name.is_empty() && name.len() <= max_len && name.chars().all(|c| alphabet.contains(c))
}

fn is_vector_swizzle(name: &str, len: u32) -> bool {
    let (xyzw, rgba) = match len {
        2 => ("XY", "RG"),
        3 => ("XYZ", "RGB"),
        _ => ("XYZW", "RGBA"),
    };
    is_swizzle(name, xyzw, 4) || is_swizzle(name, rgba, 4)
}

const GROUP_SIZE_MACROS: [&str; 3] = [
    "__GroupSize__get_X",
    "__GroupSize__get_Y",
    "__GroupSize__get_Z",
];

/// Map a static member access (`Owner.Member`) to an HLSL expression.
pub fn map_static_member(owner: &str, member: &str, kind: ShaderKind) -> Option<MappedMember> {
    let owner = simple_name(owner);
    match owner {
        "ThreadIds" | "GroupIds" if is_swizzle(member, "XYZ", 3) => {
            let base = if owner == "ThreadIds" {
                "ThreadIds"
            } else {
                "GroupThreadId"
            };
            Some(MappedMember {
                hlsl: format!("{base}.{}", member.to_ascii_lowercase()),
                context: DispatchContext::Invocation,
                uses_group_ids: owner == "GroupIds",
            })
        }
        "GroupSize" => {
            let hlsl = match member {
                "X" => GROUP_SIZE_MACROS[0].to_string(),
                "Y" => GROUP_SIZE_MACROS[1].to_string(),
                "Z" => GROUP_SIZE_MACROS[2].to_string(),
                "Count" => format!("({})", GROUP_SIZE_MACROS.join(" * ")),
                _ => return None,
            };
            Some(MappedMember::compile_time(hlsl))
        }
        "DispatchSize" => {
            let hlsl = match (member, kind) {
                ("X", _) => "__x".to_string(),
                ("Y", _) => "__y".to_string(),
                ("Z", ShaderKind::Compute) => "__z".to_string(),
                ("Z", ShaderKind::Pixel) => "1u".to_string(),
                ("Count", ShaderKind::Compute) => "(__x * __y * __z)".to_string(),
                ("Count", ShaderKind::Pixel) => "(__x * __y)".to_string(),
                _ => return None,
            };
            Some(MappedMember {
                hlsl,
                context: DispatchContext::DispatchBounds,
                uses_group_ids: false,
            })
        }
        _ => {
            let shape = builtin_value_type(owner).filter(PrimitiveShape::is_vector)?;
            vector_constant(&shape, member).map(MappedMember::compile_time)
        }
    }
}

/// Named vector constants: `Zero`, `One`, `UnitX`..`UnitW`.
fn vector_constant(shape: &PrimitiveShape, member: &str) -> Option<String> {
    let ty = shape.hlsl_name();
    let len = shape.columns as usize;
    let (one, zero) = match shape.scalar {
        ScalarKind::Bool => ("true", "false"),
        ScalarKind::Float | ScalarKind::Double => ("1.0", "0.0"),
        _ => ("1", "0"),
    };
    match member {
        "Zero" => Some(format!("({ty})0")),
        "One" => Some(format!("({ty})1")),
        unit if unit.starts_with("Unit") => {
            let axis = "XYZW".find(&unit["Unit".len()..]).filter(|&i| i < len)?;
            if unit.len() != "Unit".len() + 1 {
                return None;
            }
            let parts: Vec<&str> = (0..len).map(|i| if i == axis { one } else { zero }).collect();
            Some(format!("{ty}({})", parts.join(", ")))
        }
        _ => None,
    }
}

/// Map an instance member of a built-in value type (swizzles, matrix elements).
pub fn map_instance_member(owner: &str, member: &str) -> Option<String> {
    let shape = builtin_value_type(owner)?;
    if shape.matrix {
        return matrix_element_name(member, &shape);
    }
    if shape.is_vector() && is_vector_swizzle(member, shape.columns) {
        return Some(member.to_ascii_lowercase());
    }
    None
}

/// `M{r}{c}` (1-based) to the row-major `_m{r-1}{c-1}` element accessor.
pub fn matrix_element_name(member: &str, shape: &PrimitiveShape) -> Option<String> {
    let (row, column) = matrix_index(member)?;
    if row >= shape.rows || column >= shape.columns {
        return None;
    }
    Some(format!("_m{row}{column}"))
}

/// Parse a 1-based `M{r}{c}` identifier into 0-based row and column.
pub fn matrix_index(member: &str) -> Option<(u32, u32)> {
    let rest = member.strip_prefix('M')?;
    let mut digits = rest.chars();
    let r = digits.next()?.to_digit(10)?;
    let c = digits.next()?.to_digit(10)?;
    if digits.next().is_some() || !(1..=4).contains(&r) || !(1..=4).contains(&c) {
        return None;
    }
    Some((r - 1, c - 1))
}

const PASCAL_CASE_INTRINSICS: &[&str] = &[
    "AllMemoryBarrier",
    "AllMemoryBarrierWithGroupSync",
    "DeviceMemoryBarrier",
    "DeviceMemoryBarrierWithGroupSync",
    "GroupMemoryBarrier",
    "GroupMemoryBarrierWithGroupSync",
    "InterlockedAdd",
    "InterlockedAnd",
    "InterlockedCompareExchange",
    "InterlockedCompareStore",
    "InterlockedExchange",
    "InterlockedMax",
    "InterlockedMin",
    "InterlockedOr",
    "InterlockedXor",
];

const LOWER_CASE_INTRINSICS: &[&str] = &[
    "Abs", "Acos", "All", "Any", "AsDouble", "AsFloat", "AsInt", "AsUInt", "Asin", "Atan",
    "Atan2", "Ceil", "Clamp", "Cos", "Cosh", "CountBits", "Cross", "Ddx", "Ddy", "Degrees",
    "Determinant", "Distance", "Dot", "Exp", "Exp2", "FirstBitHigh", "FirstBitLow", "Floor",
    "Fmod", "Frac", "IsFinite", "IsInfinite", "IsNaN", "Ldexp", "Length", "Lerp", "Log",
    "Log10", "Log2", "Mad", "Max", "Min", "Mul", "Normalize", "Pow", "Radians", "Rcp",
    "Reflect", "Refract", "ReverseBits", "Round", "Rsqrt", "Saturate", "Sign", "Sin", "Sinh",
    "SmoothStep", "Sqrt", "Step", "Tan", "Tanh", "Transpose", "Trunc",
];

/// Map a static method call to the HLSL intrinsic it stands for.
pub fn map_intrinsic(owner: &str, name: &str) -> Option<String> {
    match simple_name(owner) {
        "Hlsl" => {
            if PASCAL_CASE_INTRINSICS.contains(&name) {
                Some(name.to_string())
            } else if LOWER_CASE_INTRINSICS.contains(&name) {
                Some(name.to_ascii_lowercase())
            } else {
                None
            }
        }
        "Math" | "MathF" => {
            let mapped = match name {
                "Ceiling" => "ceil",
                "Truncate" => "trunc",
                "FusedMultiplyAdd" => "mad",
                "Abs" | "Acos" | "Asin" | "Atan" | "Atan2" | "Clamp" | "Cos" | "Cosh" | "Exp"
                | "Floor" | "Log" | "Log10" | "Log2" | "Max" | "Min" | "Pow" | "Round"
                | "Sign" | "Sin" | "Sinh" | "Sqrt" | "Tan" | "Tanh" => {
                    return Some(name.to_ascii_lowercase());
                }
                _ => return None,
            };
            Some(mapped.to_string())
        }
        _ => None,
    }
}

const HLSL_KEYWORDS: &[&str] = &[
    "AppendStructuredBuffer", "BlendState", "Buffer", "ByteAddressBuffer", "CompileShader",
    "ComputeShader", "ConsumeStructuredBuffer", "DepthStencilState", "DepthStencilView",
    "DomainShader", "GeometryShader", "Hullshader", "InputPatch", "LineStream", "NULL",
    "OutputPatch", "PixelShader", "PointStream", "RWBuffer", "RWByteAddressBuffer",
    "RWStructuredBuffer", "RWTexture1D", "RWTexture1DArray", "RWTexture2D", "RWTexture2DArray",
    "RWTexture3D", "RasterizerState", "RenderTargetView", "SamplerComparisonState",
    "SamplerState", "StructuredBuffer", "Texture1D", "Texture1DArray", "Texture2D",
    "Texture2DArray", "Texture2DMS", "Texture2DMSArray", "Texture3D", "TextureCube",
    "TextureCubeArray", "TriangleStream", "VertexShader", "asm", "asm_fragment", "bool",
    "break", "case", "cbuffer", "centroid", "class", "column_major", "compile",
    "compile_fragment", "const", "continue", "default", "discard", "do", "double", "dword",
    "else", "export", "extern", "false", "float", "for", "fxgroup", "groupshared", "half",
    "if", "in", "inline", "inout", "int", "interface", "line", "lineadj", "linear", "matrix",
    "min10float", "min12int", "min16float", "min16int", "min16uint", "namespace",
    "nointerpolation", "noperspective", "out", "packoffset", "pass", "pixelfragment", "point",
    "precise", "register", "return", "row_major", "sample", "sampler", "shared", "snorm",
    "stateblock", "stateblock_state", "static", "string", "struct", "switch", "tbuffer",
    "technique", "technique10", "technique11", "texture", "triangle", "triangleadj", "true",
    "typedef", "uint", "uniform", "unorm", "unsigned", "vector", "vertexfragment", "void",
    "volatile", "while",
];

/// HLSL numeric type spellings such as `float3`, `int2x2`, `uint4`.
fn is_hlsl_numeric_type_name(name: &str) -> bool {
    const BASES: [&str; 7] = ["bool", "int", "uint", "float", "double", "half", "dword"];
    BASES.iter().any(|base| {
        let Some(rest) = name.strip_prefix(base) else {
            return false;
        };
        let bytes = rest.as_bytes();
        match bytes {
            [n] => (b'1'..=b'4').contains(n),
            [r, b'x', c] => (b'1'..=b'4').contains(r) && (b'1'..=b'4').contains(c),
            _ => false,
        }
    })
}

/// Names the emitted program declares for itself.
const GENERATED_IDENTIFIERS: &[&str] = &[
    "Execute",
    "ThreadIds",
    "GroupThreadId",
    "__x",
    "__y",
    "__z",
    "__sampler",
    "__outputTexture",
    "__Execute",
];

pub fn is_reserved_identifier(name: &str) -> bool {
    HLSL_KEYWORDS.contains(&name)
        || GENERATED_IDENTIFIERS.contains(&name)
        || name.starts_with("__GroupSize__get_")
        || is_hlsl_numeric_type_name(name)
        || LOWER_CASE_INTRINSICS
            .iter()
            .any(|i| i.eq_ignore_ascii_case(name) && i.to_ascii_lowercase() == name)
}

/// Substitute identifiers that collide with HLSL keywords or generated names.
pub fn escape_identifier(name: &str) -> String {
    if is_reserved_identifier(name) {
        format!("__reserved__{name}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_types_resolve_scalars_vectors_and_matrices() {
        assert_eq!(builtin_value_type("float"), Some(PrimitiveShape::scalar(ScalarKind::Float)));
        assert_eq!(
            builtin_value_type("ComputeSharp.Float3"),
            Some(PrimitiveShape::vector(ScalarKind::Float, 3))
        );
        let m = builtin_value_type("Float2x3").unwrap();
        assert!(m.matrix);
        assert_eq!((m.rows, m.columns), (2, 3));
        assert_eq!(m.hlsl_name(), "float2x3");
        assert_eq!(m.row_size(), 12);
        assert_eq!(builtin_value_type("Double2").unwrap().byte_size(), 16);
        assert_eq!(builtin_value_type("Float5"), None);
        assert_eq!(builtin_value_type("Point"), None);
    }

    #[test]
    fn resource_shapes_map_to_hlsl_templates() {
        let buf = resource_shape(&TypeRef::generic("ReadWriteBuffer", vec![TypeRef::named("float")]))
            .unwrap();
        assert_eq!(buf.kind, ResourceKind::ReadWriteBuffer);
        assert_eq!(buf.hlsl_type("float"), "RWStructuredBuffer<float>");
        assert_eq!(buf.kind.register_class(), 'u');

        let tex = resource_shape(&TypeRef::generic(
            "ReadWriteTexture2D",
            vec![TypeRef::named("Rgba32"), TypeRef::named("Float4")],
        ))
        .unwrap();
        assert_eq!(tex.hlsl_type("float4"), "RWTexture2D<unorm float4>");

        let sampled = resource_shape(&TypeRef::generic(
            "IReadOnlyNormalizedTexture2D",
            vec![TypeRef::named("Float4")],
        ))
        .unwrap();
        assert_eq!(sampled.kind, ResourceKind::SampledTexture { dims: 2 });
        assert_eq!(sampled.kind.register_class(), 't');

        assert!(resource_shape(&TypeRef::named("Float4")).is_none());
    }

    #[test]
    fn static_members_cover_dispatch_context_and_constants() {
        let ids = map_static_member("ThreadIds", "XY", ShaderKind::Compute).unwrap();
        assert_eq!(ids.hlsl, "ThreadIds.xy");
        assert_eq!(ids.context, DispatchContext::Invocation);

        let count = map_static_member("DispatchSize", "Count", ShaderKind::Pixel).unwrap();
        assert_eq!(count.hlsl, "(__x * __y)");
        assert_eq!(count.context, DispatchContext::DispatchBounds);

        let unit = map_static_member("Float4", "UnitY", ShaderKind::Compute).unwrap();
        assert_eq!(unit.hlsl, "float4(0.0, 1.0, 0.0, 0.0)");
        assert_eq!(
            map_static_member("Int2", "Zero", ShaderKind::Compute).unwrap().hlsl,
            "(int2)0"
        );
        assert!(map_static_member("Float2", "UnitZ", ShaderKind::Compute).is_none());
    }

    #[test]
    fn instance_members_swizzle_and_flatten_matrix_elements() {
        assert_eq!(map_instance_member("Float4", "XYZ").as_deref(), Some("xyz"));
        assert_eq!(map_instance_member("Float3", "RGB").as_deref(), Some("rgb"));
        assert_eq!(map_instance_member("Float2", "Z"), None);
        assert_eq!(map_instance_member("Float4x4", "M23").as_deref(), Some("_m12"));
        assert_eq!(map_instance_member("Float2x2", "M33"), None);
    }

    #[test]
    fn intrinsics_keep_hlsl_casing() {
        assert_eq!(map_intrinsic("Hlsl", "Lerp").as_deref(), Some("lerp"));
        assert_eq!(map_intrinsic("Hlsl", "InterlockedAdd").as_deref(), Some("InterlockedAdd"));
        assert_eq!(map_intrinsic("System.MathF", "Ceiling").as_deref(), Some("ceil"));
        assert_eq!(map_intrinsic("Hlsl", "Nope"), None);
    }

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(escape_identifier("sample"), "__reserved__sample");
        assert_eq!(escape_identifier("float3"), "__reserved__float3");
        assert_eq!(escape_identifier("lerp"), "__reserved__lerp");
        assert_eq!(escape_identifier("Lerp"), "Lerp");
        assert_eq!(escape_identifier("value"), "value");
    }

    #[test]
    fn generated_names_are_escaped() {
        assert_eq!(escape_identifier("ThreadIds"), "__reserved__ThreadIds");
        assert_eq!(escape_identifier("GroupThreadId"), "__reserved__GroupThreadId");
        assert_eq!(escape_identifier("__x"), "__reserved____x");
        assert_eq!(escape_identifier("__sampler"), "__reserved____sampler");
        assert_eq!(escape_identifier("__outputTexture"), "__reserved____outputTexture");
        assert_eq!(escape_identifier("__Execute"), "__reserved____Execute");
        assert_eq!(escape_identifier("Execute"), "__reserved__Execute");
        assert_eq!(escape_identifier("__GroupSize__get_X"), "__reserved____GroupSize__get_X");
        assert_eq!(escape_identifier("threadIds"), "threadIds");
    }
}
