//! Shading-language types and qualifiers.

use std::fmt;

use serde::Serialize;

/// Scalar component kind of a scalar, vector or matrix type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Bool,
    Int,
    Uint,
    Float,
    Double,
}

impl ScalarKind {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ScalarKind::Bool)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::Uint)
    }

    fn vector_prefix(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "b",
            ScalarKind::Int => "i",
            ScalarKind::Uint => "u",
            ScalarKind::Float => "",
            ScalarKind::Double => "d",
        }
    }
}

/// A type as written in source or inferred by analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Type {
    Void,
    Scalar(ScalarKind),
    Vector(ScalarKind, u8),
    /// Floating-point matrix with `columns` columns of `rows` components.
    Matrix { columns: u8, rows: u8 },
    /// Samplers, images and other opaque handles, by keyword.
    Opaque(String),
    Struct(String),
    /// An array; the length is known only when written as an integer literal.
    Array(Box<Type>, Option<usize>),
}

impl Type {
    pub const BOOL: Type = Type::Scalar(ScalarKind::Bool);
    pub const INT: Type = Type::Scalar(ScalarKind::Int);
    pub const UINT: Type = Type::Scalar(ScalarKind::Uint);
    pub const FLOAT: Type = Type::Scalar(ScalarKind::Float);

    pub fn vec(size: u8) -> Type {
        Type::Vector(ScalarKind::Float, size)
    }

    pub fn mat(size: u8) -> Type {
        Type::Matrix {
            columns: size,
            rows: size,
        }
    }

    /// Resolve a type keyword such as `vec3`, `mat2x4` or `sampler2D`.
    pub fn from_keyword(keyword: &str) -> Option<Type> {
        let ty = match keyword {
            "void" => Type::Void,
            "bool" => Type::BOOL,
            "int" => Type::INT,
            "uint" => Type::UINT,
            "float" => Type::FLOAT,
            "double" => Type::Scalar(ScalarKind::Double),
            _ => return Self::composite_from_keyword(keyword),
        };
        Some(ty)
    }

    fn composite_from_keyword(keyword: &str) -> Option<Type> {
        if is_opaque_keyword(keyword) {
            return Some(Type::Opaque(keyword.to_string()));
        }

        let (kind, rest) = match keyword.as_bytes().first()? {
            b'b' => (ScalarKind::Bool, &keyword[1..]),
            b'i' => (ScalarKind::Int, &keyword[1..]),
            b'u' => (ScalarKind::Uint, &keyword[1..]),
            b'd' => (ScalarKind::Double, &keyword[1..]),
            _ => (ScalarKind::Float, keyword),
        };

        if let Some(size) = rest.strip_prefix("vec") {
            let size = parse_dimension(size)?;
            return Some(Type::Vector(kind, size));
        }

        if let Some(dims) = rest.strip_prefix("mat") {
            if !matches!(kind, ScalarKind::Float | ScalarKind::Double) {
                return None;
            }
            return match dims.split_once('x') {
                Some((columns, rows)) => Some(Type::Matrix {
                    columns: parse_dimension(columns)?,
                    rows: parse_dimension(rows)?,
                }),
                None => Some(Type::mat(parse_dimension(dims)?)),
            };
        }

        None
    }

    /// The scalar kind of scalars, vectors and matrices.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Type::Scalar(kind) | Type::Vector(kind, _) => Some(*kind),
            Type::Matrix { .. } => Some(ScalarKind::Float),
            _ => None,
        }
    }

    /// Number of components: 1 for scalars, N for vectors, columns*rows for matrices.
    pub fn component_count(&self) -> Option<u8> {
        match self {
            Type::Scalar(_) => Some(1),
            Type::Vector(_, size) => Some(*size),
            Type::Matrix { columns, rows } => Some(columns * rows),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector(..))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Type::Matrix { .. })
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Scalar(ScalarKind::Bool))
    }

    /// Scalars, vectors and matrices of a numeric kind.
    pub fn is_numeric(&self) -> bool {
        self.scalar_kind().is_some_and(|kind| kind.is_numeric())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, Type::Opaque(name) if name.contains("sampler"))
    }

    /// The element type of an array, or the component type of a vector.
    pub fn element(&self) -> Option<Type> {
        match self {
            Type::Array(inner, _) => Some((**inner).clone()),
            Type::Vector(kind, _) => Some(Type::Scalar(*kind)),
            Type::Matrix { rows, .. } => Some(Type::vec(*rows)),
            _ => None,
        }
    }

    /// The same shape with a different scalar kind, used for comparisons
    /// producing `bvecN` and for integer/float promotion.
    pub fn with_kind(&self, kind: ScalarKind) -> Type {
        match self {
            Type::Scalar(_) => Type::Scalar(kind),
            Type::Vector(_, size) => Type::Vector(kind, *size),
            other => other.clone(),
        }
    }
}

fn parse_dimension(text: &str) -> Option<u8> {
    match text {
        "2" => Some(2),
        "3" => Some(3),
        "4" => Some(4),
        _ => None,
    }
}

fn is_opaque_keyword(keyword: &str) -> bool {
    let base = keyword
        .strip_prefix('i')
        .or_else(|| keyword.strip_prefix('u'))
        .unwrap_or(keyword);
    let known_suffix = |rest: &str| {
        matches!(
            rest,
            "1D" | "2D"
                | "3D"
                | "Cube"
                | "2DRect"
                | "1DArray"
                | "2DArray"
                | "CubeArray"
                | "Buffer"
                | "2DMS"
                | "2DMSArray"
                | "1DShadow"
                | "2DShadow"
                | "CubeShadow"
                | "2DRectShadow"
                | "1DArrayShadow"
                | "2DArrayShadow"
                | "CubeArrayShadow"
                | "External"
                | "ExternalOES"
        )
    };
    base.strip_prefix("sampler").is_some_and(known_suffix)
        || base.strip_prefix("image").is_some_and(known_suffix)
        || keyword == "atomic_uint"
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Scalar(ScalarKind::Bool) => write!(f, "bool"),
            Type::Scalar(ScalarKind::Int) => write!(f, "int"),
            Type::Scalar(ScalarKind::Uint) => write!(f, "uint"),
            Type::Scalar(ScalarKind::Float) => write!(f, "float"),
            Type::Scalar(ScalarKind::Double) => write!(f, "double"),
            Type::Vector(kind, size) => write!(f, "{}vec{size}", kind.vector_prefix()),
            Type::Matrix { columns, rows } if columns == rows => write!(f, "mat{columns}"),
            Type::Matrix { columns, rows } => write!(f, "mat{columns}x{rows}"),
            Type::Opaque(name) | Type::Struct(name) => write!(f, "{name}"),
            Type::Array(inner, Some(len)) => write!(f, "{inner}[{len}]"),
            Type::Array(inner, None) => write!(f, "{inner}[]"),
        }
    }
}

/// Storage qualifier of a variable declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageQualifier {
    /// No storage qualifier: a global or local variable.
    #[default]
    None,
    Const,
    Uniform,
    Attribute,
    Varying,
    In,
    Out,
    Buffer,
    Shared,
}

impl StorageQualifier {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "const" => Self::Const,
            "uniform" => Self::Uniform,
            "attribute" => Self::Attribute,
            "varying" => Self::Varying,
            "in" => Self::In,
            "out" => Self::Out,
            "buffer" => Self::Buffer,
            "shared" => Self::Shared,
            _ => return None,
        })
    }

    /// Values the shader may not assign to.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Const | Self::Uniform | Self::Attribute | Self::In)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Const => "const",
            Self::Uniform => "uniform",
            Self::Attribute => "attribute",
            Self::Varying => "varying",
            Self::In => "in",
            Self::Out => "out",
            Self::Buffer => "buffer",
            Self::Shared => "shared",
        }
    }
}

/// Direction qualifier of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamQualifier {
    #[default]
    In,
    Out,
    InOut,
}

impl ParamQualifier {
    /// Whether the callee writes through this parameter.
    pub fn writes(&self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Low,
    Medium,
    High,
}

impl Precision {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "lowp" => Some(Self::Low),
            "mediump" => Some(Self::Medium),
            "highp" => Some(Self::High),
            _ => None,
        }
    }
}

/// Qualifiers preceding a variable declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Qualifiers {
    pub storage: StorageQualifier,
    pub precision: Option<Precision>,
    /// Identifiers listed in a `layout(...)` qualifier.
    pub layout: Vec<String>,
    pub interpolation: Option<String>,
    pub invariant: bool,
}
