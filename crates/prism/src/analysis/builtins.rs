//! Built-in functions and variables of the core language.
//!
//! The semantic pass resolves names against these tables, the flow pass asks
//! which arguments a built-in writes, and the quality pass prices calls and
//! counts texture lookups.

use std::{collections::HashMap, sync::LazyLock};

use prism_core::ast::{ScalarKind, Type};

/// How a built-in's result type follows from its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Returns {
    /// The type of the argument at this position.
    Arg(usize),
    /// A fixed type.
    Fixed(Type),
    /// The shape of an argument with a different component kind.
    KindOf(usize, ScalarKind),
    /// `length`: a float, or an int for the `array.length()` method form.
    Length,
    /// `transpose`: the matrix with rows and columns swapped.
    Transpose,
    /// `outerProduct(c, r)`: a matrix with `c`'s size as rows.
    OuterProduct,
    /// Returns nothing.
    Void,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinFunction {
    pub name: &'static str,
    /// Every accepted argument count.
    pub arities: &'static [usize],
    pub returns: Returns,
    /// Relative cost used by the instruction estimate.
    pub cost: u32,
    /// Argument positions the function writes to (`out` parameters).
    pub outputs: &'static [usize],
}

impl BuiltinFunction {
    const fn new(name: &'static str, arities: &'static [usize], returns: Returns) -> Self {
        Self {
            name,
            arities,
            returns,
            cost: 1,
            outputs: &[],
        }
    }

    const fn cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    const fn writes(mut self, outputs: &'static [usize]) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn accepts(&self, arity: usize) -> bool {
        self.arities.contains(&arity)
    }

    /// The result type for the given argument types, when it can be told.
    pub fn result(&self, args: &[Option<Type>]) -> Option<Type> {
        let arg = |index: usize| args.get(index).cloned().flatten();
        match &self.returns {
            Returns::Arg(index) => arg(*index),
            Returns::Fixed(ty) => Some(ty.clone()),
            Returns::KindOf(index, kind) => arg(*index).map(|ty| ty.with_kind(*kind)),
            Returns::Length => match arg(0) {
                Some(Type::Array(..)) => Some(Type::INT),
                _ => Some(Type::FLOAT),
            },
            Returns::Transpose => match arg(0)? {
                Type::Matrix { columns, rows } => Some(Type::Matrix {
                    columns: rows,
                    rows: columns,
                }),
                _ => None,
            },
            Returns::OuterProduct => match (arg(0)?, arg(1)?) {
                (Type::Vector(_, rows), Type::Vector(_, columns)) => Some(Type::Matrix { columns, rows }),
                _ => None,
            },
            Returns::Void => Some(Type::Void),
        }
    }

    /// Whether a call samples a texture.
    pub fn samples_texture(&self) -> bool {
        let name = self.name;
        (name.starts_with("texture")
            && !matches!(
                name,
                "textureSize" | "textureQueryLod" | "textureQueryLevels" | "textureSamples"
            ))
            || name.starts_with("texelFetch")
            || name.starts_with("shadow")
    }
}

const VEC2: Type = Type::Vector(ScalarKind::Float, 2);
const VEC3: Type = Type::Vector(ScalarKind::Float, 3);
const VEC4: Type = Type::Vector(ScalarKind::Float, 4);
const IVEC2: Type = Type::Vector(ScalarKind::Int, 2);
const BOOL: Type = Type::Scalar(ScalarKind::Bool);
const BVEC: Returns = Returns::KindOf(0, ScalarKind::Bool);
const GEN: Returns = Returns::Arg(0);

const fn sample(name: &'static str, arities: &'static [usize]) -> BuiltinFunction {
    BuiltinFunction::new(name, arities, Returns::Fixed(VEC4)).cost(4)
}

static FUNCTIONS: &[BuiltinFunction] = &[
    // Angle and trigonometry
    BuiltinFunction::new("radians", &[1], GEN),
    BuiltinFunction::new("degrees", &[1], GEN),
    BuiltinFunction::new("sin", &[1], GEN).cost(4),
    BuiltinFunction::new("cos", &[1], GEN).cost(4),
    BuiltinFunction::new("tan", &[1], GEN).cost(5),
    BuiltinFunction::new("asin", &[1], GEN).cost(5),
    BuiltinFunction::new("acos", &[1], GEN).cost(5),
    BuiltinFunction::new("atan", &[1, 2], GEN).cost(5),
    BuiltinFunction::new("sinh", &[1], GEN).cost(6),
    BuiltinFunction::new("cosh", &[1], GEN).cost(6),
    BuiltinFunction::new("tanh", &[1], GEN).cost(6),
    BuiltinFunction::new("asinh", &[1], GEN).cost(6),
    BuiltinFunction::new("acosh", &[1], GEN).cost(6),
    BuiltinFunction::new("atanh", &[1], GEN).cost(6),
    // Exponential
    BuiltinFunction::new("pow", &[2], GEN).cost(4),
    BuiltinFunction::new("exp", &[1], GEN).cost(4),
    BuiltinFunction::new("log", &[1], GEN).cost(4),
    BuiltinFunction::new("exp2", &[1], GEN).cost(4),
    BuiltinFunction::new("log2", &[1], GEN).cost(4),
    BuiltinFunction::new("sqrt", &[1], GEN).cost(2),
    BuiltinFunction::new("inversesqrt", &[1], GEN).cost(2),
    // Common
    BuiltinFunction::new("abs", &[1], GEN),
    BuiltinFunction::new("sign", &[1], GEN),
    BuiltinFunction::new("floor", &[1], GEN),
    BuiltinFunction::new("trunc", &[1], GEN),
    BuiltinFunction::new("round", &[1], GEN),
    BuiltinFunction::new("roundEven", &[1], GEN),
    BuiltinFunction::new("ceil", &[1], GEN),
    BuiltinFunction::new("fract", &[1], GEN),
    BuiltinFunction::new("mod", &[2], GEN).cost(2),
    BuiltinFunction::new("modf", &[2], GEN).cost(2).writes(&[1]),
    BuiltinFunction::new("min", &[2], GEN),
    BuiltinFunction::new("max", &[2], GEN),
    BuiltinFunction::new("clamp", &[3], GEN).cost(2),
    BuiltinFunction::new("mix", &[3], GEN).cost(2),
    BuiltinFunction::new("step", &[2], Returns::Arg(1)),
    BuiltinFunction::new("smoothstep", &[3], Returns::Arg(2)).cost(4),
    BuiltinFunction::new("isnan", &[1], BVEC),
    BuiltinFunction::new("isinf", &[1], BVEC),
    BuiltinFunction::new("floatBitsToInt", &[1], Returns::KindOf(0, ScalarKind::Int)),
    BuiltinFunction::new("floatBitsToUint", &[1], Returns::KindOf(0, ScalarKind::Uint)),
    BuiltinFunction::new("intBitsToFloat", &[1], Returns::KindOf(0, ScalarKind::Float)),
    BuiltinFunction::new("uintBitsToFloat", &[1], Returns::KindOf(0, ScalarKind::Float)),
    BuiltinFunction::new("fma", &[3], GEN),
    BuiltinFunction::new("frexp", &[2], GEN).cost(2).writes(&[1]),
    BuiltinFunction::new("ldexp", &[2], GEN).cost(2),
    // Packing
    BuiltinFunction::new("packUnorm2x16", &[1], Returns::Fixed(Type::UINT)),
    BuiltinFunction::new("packSnorm2x16", &[1], Returns::Fixed(Type::UINT)),
    BuiltinFunction::new("packUnorm4x8", &[1], Returns::Fixed(Type::UINT)),
    BuiltinFunction::new("packSnorm4x8", &[1], Returns::Fixed(Type::UINT)),
    BuiltinFunction::new("packHalf2x16", &[1], Returns::Fixed(Type::UINT)),
    BuiltinFunction::new("unpackUnorm2x16", &[1], Returns::Fixed(VEC2)),
    BuiltinFunction::new("unpackSnorm2x16", &[1], Returns::Fixed(VEC2)),
    BuiltinFunction::new("unpackUnorm4x8", &[1], Returns::Fixed(VEC4)),
    BuiltinFunction::new("unpackSnorm4x8", &[1], Returns::Fixed(VEC4)),
    BuiltinFunction::new("unpackHalf2x16", &[1], Returns::Fixed(VEC2)),
    // Geometric
    BuiltinFunction::new("length", &[1], Returns::Length).cost(3),
    BuiltinFunction::new("distance", &[2], Returns::Fixed(Type::FLOAT)).cost(4),
    BuiltinFunction::new("dot", &[2], Returns::Fixed(Type::FLOAT)).cost(2),
    BuiltinFunction::new("cross", &[2], Returns::Fixed(VEC3)).cost(3),
    BuiltinFunction::new("normalize", &[1], GEN).cost(4),
    BuiltinFunction::new("faceforward", &[3], GEN).cost(3),
    BuiltinFunction::new("reflect", &[2], GEN).cost(3),
    BuiltinFunction::new("refract", &[3], GEN).cost(6),
    BuiltinFunction::new("ftransform", &[0], Returns::Fixed(VEC4)).cost(4),
    // Matrix
    BuiltinFunction::new("matrixCompMult", &[2], GEN).cost(4),
    BuiltinFunction::new("outerProduct", &[2], Returns::OuterProduct).cost(4),
    BuiltinFunction::new("transpose", &[1], Returns::Transpose).cost(2),
    BuiltinFunction::new("determinant", &[1], Returns::Fixed(Type::FLOAT)).cost(8),
    BuiltinFunction::new("inverse", &[1], GEN).cost(16),
    // Vector relational
    BuiltinFunction::new("lessThan", &[2], BVEC),
    BuiltinFunction::new("lessThanEqual", &[2], BVEC),
    BuiltinFunction::new("greaterThan", &[2], BVEC),
    BuiltinFunction::new("greaterThanEqual", &[2], BVEC),
    BuiltinFunction::new("equal", &[2], BVEC),
    BuiltinFunction::new("notEqual", &[2], BVEC),
    BuiltinFunction::new("any", &[1], Returns::Fixed(BOOL)),
    BuiltinFunction::new("all", &[1], Returns::Fixed(BOOL)),
    BuiltinFunction::new("not", &[1], GEN),
    // Integer
    BuiltinFunction::new("uaddCarry", &[3], GEN).writes(&[2]),
    BuiltinFunction::new("usubBorrow", &[3], GEN).writes(&[2]),
    BuiltinFunction::new("umulExtended", &[4], Returns::Void).writes(&[2, 3]),
    BuiltinFunction::new("imulExtended", &[4], Returns::Void).writes(&[2, 3]),
    BuiltinFunction::new("bitfieldExtract", &[3], GEN),
    BuiltinFunction::new("bitfieldInsert", &[4], GEN),
    BuiltinFunction::new("bitfieldReverse", &[1], GEN),
    BuiltinFunction::new("bitCount", &[1], Returns::KindOf(0, ScalarKind::Int)),
    BuiltinFunction::new("findLSB", &[1], Returns::KindOf(0, ScalarKind::Int)),
    BuiltinFunction::new("findMSB", &[1], Returns::KindOf(0, ScalarKind::Int)),
    // Texture lookup
    sample("texture", &[2, 3]),
    sample("textureProj", &[2, 3]),
    sample("textureLod", &[3]),
    sample("textureOffset", &[3, 4]),
    sample("texelFetch", &[2, 3]),
    sample("texelFetchOffset", &[4]),
    sample("textureProjOffset", &[3, 4]),
    sample("textureLodOffset", &[4]),
    sample("textureProjLod", &[3]),
    sample("textureProjLodOffset", &[4]),
    sample("textureGrad", &[4]),
    sample("textureGradOffset", &[5]),
    sample("textureProjGrad", &[4]),
    sample("textureProjGradOffset", &[5]),
    sample("textureGather", &[2, 3]),
    sample("textureGatherOffset", &[3, 4]),
    sample("textureGatherOffsets", &[3, 4]),
    sample("texture1D", &[2, 3]),
    sample("texture1DProj", &[2, 3]),
    sample("texture1DLod", &[3]),
    sample("texture2D", &[2, 3]),
    sample("texture2DProj", &[2, 3]),
    sample("texture2DLod", &[3]),
    sample("texture2DProjLod", &[3]),
    sample("texture2DRect", &[2]),
    sample("texture2DRectProj", &[2]),
    sample("texture2DLodEXT", &[3]),
    sample("texture2DGradEXT", &[4]),
    sample("texture3D", &[2, 3]),
    sample("texture3DProj", &[2, 3]),
    sample("texture3DLod", &[3]),
    sample("textureCube", &[2, 3]),
    sample("textureCubeLod", &[3]),
    sample("textureCubeLodEXT", &[3]),
    sample("shadow2D", &[2, 3]),
    sample("shadow2DProj", &[2, 3]),
    BuiltinFunction::new("textureSize", &[1, 2], Returns::Fixed(IVEC2)),
    BuiltinFunction::new("textureQueryLod", &[2], Returns::Fixed(VEC2)),
    BuiltinFunction::new("textureQueryLevels", &[1], Returns::Fixed(Type::INT)),
    BuiltinFunction::new("textureSamples", &[1], Returns::Fixed(Type::INT)),
    // Fragment processing
    BuiltinFunction::new("dFdx", &[1], GEN).cost(2),
    BuiltinFunction::new("dFdy", &[1], GEN).cost(2),
    BuiltinFunction::new("fwidth", &[1], GEN).cost(2),
    BuiltinFunction::new("dFdxFine", &[1], GEN).cost(2),
    BuiltinFunction::new("dFdyFine", &[1], GEN).cost(2),
    BuiltinFunction::new("dFdxCoarse", &[1], GEN).cost(2),
    BuiltinFunction::new("dFdyCoarse", &[1], GEN).cost(2),
    BuiltinFunction::new("fwidthFine", &[1], GEN).cost(2),
    BuiltinFunction::new("fwidthCoarse", &[1], GEN).cost(2),
    BuiltinFunction::new("interpolateAtCentroid", &[1], GEN).cost(2),
    BuiltinFunction::new("interpolateAtSample", &[2], GEN).cost(2),
    BuiltinFunction::new("interpolateAtOffset", &[2], GEN).cost(2),
    // Images and atomics
    BuiltinFunction::new("imageLoad", &[2, 3], Returns::Fixed(VEC4)).cost(4),
    BuiltinFunction::new("imageStore", &[3, 4], Returns::Void).cost(4),
    BuiltinFunction::new("imageSize", &[1], Returns::Fixed(IVEC2)),
    BuiltinFunction::new("imageAtomicAdd", &[3], Returns::Arg(2)).cost(4),
    BuiltinFunction::new("imageAtomicExchange", &[3], Returns::Arg(2)).cost(4),
    BuiltinFunction::new("atomicAdd", &[2], GEN).cost(4),
    BuiltinFunction::new("atomicMin", &[2], GEN).cost(4),
    BuiltinFunction::new("atomicMax", &[2], GEN).cost(4),
    BuiltinFunction::new("atomicAnd", &[2], GEN).cost(4),
    BuiltinFunction::new("atomicOr", &[2], GEN).cost(4),
    BuiltinFunction::new("atomicXor", &[2], GEN).cost(4),
    BuiltinFunction::new("atomicExchange", &[2], GEN).cost(4),
    BuiltinFunction::new("atomicCompSwap", &[3], GEN).cost(4),
    BuiltinFunction::new("atomicCounter", &[1], Returns::Fixed(Type::UINT)),
    BuiltinFunction::new("atomicCounterIncrement", &[1], Returns::Fixed(Type::UINT)).cost(4),
    BuiltinFunction::new("atomicCounterDecrement", &[1], Returns::Fixed(Type::UINT)).cost(4),
    // Synchronization and geometry
    BuiltinFunction::new("barrier", &[0], Returns::Void),
    BuiltinFunction::new("memoryBarrier", &[0], Returns::Void),
    BuiltinFunction::new("memoryBarrierShared", &[0], Returns::Void),
    BuiltinFunction::new("memoryBarrierImage", &[0], Returns::Void),
    BuiltinFunction::new("memoryBarrierBuffer", &[0], Returns::Void),
    BuiltinFunction::new("groupMemoryBarrier", &[0], Returns::Void),
    BuiltinFunction::new("EmitVertex", &[0], Returns::Void),
    BuiltinFunction::new("EndPrimitive", &[0], Returns::Void),
    BuiltinFunction::new("EmitStreamVertex", &[1], Returns::Void),
];

static FUNCTION_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinFunction>> =
    LazyLock::new(|| FUNCTIONS.iter().map(|function| (function.name, function)).collect());

pub fn function(name: &str) -> Option<&'static BuiltinFunction> {
    FUNCTION_INDEX.get(name).copied()
}

/// A built-in variable: its type when it has a plain one, and whether a shader may write it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinVariable {
    pub ty: Option<Type>,
    pub writable: bool,
}

pub fn variable(name: &str) -> Option<BuiltinVariable> {
    let input = |ty: Type| (Some(ty), false);
    let output = |ty: Type| (Some(ty), true);
    let vec4_array = || Type::Array(Box::new(VEC4), None);
    let uvec3 = Type::Vector(ScalarKind::Uint, 3);

    let (ty, writable) = match name {
        // Fragment
        "gl_FragCoord" => input(VEC4),
        "gl_FrontFacing" => input(BOOL),
        "gl_PointCoord" => input(VEC2),
        "gl_FragColor" => output(VEC4),
        "gl_FragData" => output(vec4_array()),
        "gl_FragDepth" => output(Type::FLOAT),
        "gl_SampleID" => input(Type::INT),
        "gl_SamplePosition" => input(VEC2),
        "gl_HelperInvocation" => input(BOOL),
        // Vertex
        "gl_Position" => output(VEC4),
        "gl_PointSize" => output(Type::FLOAT),
        "gl_ClipDistance" => output(Type::Array(Box::new(Type::FLOAT), None)),
        "gl_VertexID" | "gl_InstanceID" | "gl_VertexIndex" | "gl_InstanceIndex" => input(Type::INT),
        // Geometry
        "gl_PrimitiveID" | "gl_PrimitiveIDIn" | "gl_InvocationID" => input(Type::INT),
        "gl_Layer" | "gl_ViewportIndex" => output(Type::INT),
        "gl_in" => (None, false),
        // Compute
        "gl_NumWorkGroups" | "gl_WorkGroupSize" | "gl_WorkGroupID" | "gl_LocalInvocationID"
        | "gl_GlobalInvocationID" => input(uvec3),
        "gl_LocalInvocationIndex" => input(Type::UINT),
        // Implementation constants
        "gl_MaxDrawBuffers" | "gl_MaxTextureUnits" | "gl_MaxTextureImageUnits"
        | "gl_MaxVertexAttribs" => input(Type::INT),
        // Compatibility profile
        "gl_ModelViewMatrix" | "gl_ProjectionMatrix" | "gl_ModelViewProjectionMatrix"
        | "gl_TextureMatrix" => input(Type::mat(4)),
        "gl_NormalMatrix" => input(Type::mat(3)),
        "gl_Vertex" | "gl_Color" | "gl_SecondaryColor" | "gl_MultiTexCoord0"
        | "gl_MultiTexCoord1" | "gl_MultiTexCoord2" | "gl_MultiTexCoord3" => input(VEC4),
        "gl_Normal" => input(VEC3),
        "gl_FrontColor" | "gl_BackColor" => output(VEC4),
        "gl_TexCoord" => output(vec4_array()),
        _ => return None,
    };
    Some(BuiltinVariable { ty, writable })
}

/// Whether the host dialect's sampling helpers or a built-in sample a texture.
pub fn is_texture_lookup(name: &str) -> bool {
    matches!(
        name,
        "IMG_PIXEL" | "IMG_NORM_PIXEL" | "IMG_THIS_PIXEL" | "IMG_THIS_NORM_PIXEL"
    ) || function(name).is_some_and(BuiltinFunction::samples_texture)
}
