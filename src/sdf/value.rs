use std::fmt;

use half::f16;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use super::{Dictionary, Path, Payload, Reference};

/// Closed set of value type names known to the text format.
///
/// `FromStr` maps canonical names (`"float3"`, `"texCoord2f"`, ...) to a type id.
/// Unknown names fail, which serves as the "invalid" id.
///
/// Role types (`point3f`, `color3f`, ...) share their storage with the plain
/// tuple types but keep their own tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, IntoStaticStr, EnumIter)]
pub enum ValueType {
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "uchar")]
    Uchar,

    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "int2")]
    Int2,
    #[strum(serialize = "int3")]
    Int3,
    #[strum(serialize = "int4")]
    Int4,
    #[strum(serialize = "uint")]
    Uint,
    #[strum(serialize = "uint2")]
    Uint2,
    #[strum(serialize = "uint3")]
    Uint3,
    #[strum(serialize = "uint4")]
    Uint4,
    #[strum(serialize = "int64")]
    Int64,
    #[strum(serialize = "uint64")]
    Uint64,

    #[strum(serialize = "half")]
    Half,
    #[strum(serialize = "half2")]
    Half2,
    #[strum(serialize = "half3")]
    Half3,
    #[strum(serialize = "half4")]
    Half4,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "float2")]
    Float2,
    #[strum(serialize = "float3")]
    Float3,
    #[strum(serialize = "float4")]
    Float4,
    #[strum(serialize = "double")]
    Double,
    #[strum(serialize = "double2")]
    Double2,
    #[strum(serialize = "double3")]
    Double3,
    #[strum(serialize = "double4")]
    Double4,

    #[strum(serialize = "quath")]
    Quath,
    #[strum(serialize = "quatf")]
    Quatf,
    #[strum(serialize = "quatd")]
    Quatd,

    #[strum(serialize = "matrix2f")]
    Matrix2f,
    #[strum(serialize = "matrix3f")]
    Matrix3f,
    #[strum(serialize = "matrix4f")]
    Matrix4f,
    #[strum(serialize = "matrix2d")]
    Matrix2d,
    #[strum(serialize = "matrix3d")]
    Matrix3d,
    #[strum(serialize = "matrix4d")]
    Matrix4d,

    #[strum(serialize = "point3h")]
    Point3h,
    #[strum(serialize = "point3f")]
    Point3f,
    #[strum(serialize = "point3d")]
    Point3d,
    #[strum(serialize = "normal3h")]
    Normal3h,
    #[strum(serialize = "normal3f")]
    Normal3f,
    #[strum(serialize = "normal3d")]
    Normal3d,
    #[strum(serialize = "vector3h")]
    Vector3h,
    #[strum(serialize = "vector3f")]
    Vector3f,
    #[strum(serialize = "vector3d")]
    Vector3d,
    #[strum(serialize = "vector4f")]
    Vector4f,
    #[strum(serialize = "vector4d")]
    Vector4d,
    #[strum(serialize = "color3h")]
    Color3h,
    #[strum(serialize = "color3f")]
    Color3f,
    #[strum(serialize = "color3d")]
    Color3d,
    #[strum(serialize = "color4h")]
    Color4h,
    #[strum(serialize = "color4f")]
    Color4f,
    #[strum(serialize = "color4d")]
    Color4d,
    #[strum(serialize = "texCoord2h")]
    TexCoord2h,
    #[strum(serialize = "texCoord2f")]
    TexCoord2f,
    #[strum(serialize = "texCoord2d")]
    TexCoord2d,
    #[strum(serialize = "texCoord3h")]
    TexCoord3h,
    #[strum(serialize = "texCoord3f")]
    TexCoord3f,
    #[strum(serialize = "texCoord3d")]
    TexCoord3d,
    #[strum(serialize = "texCoord4h")]
    TexCoord4h,
    #[strum(serialize = "texCoord4f")]
    TexCoord4f,
    #[strum(serialize = "texCoord4d")]
    TexCoord4d,

    #[strum(serialize = "timecode")]
    TimeCode,
    #[strum(serialize = "token")]
    Token,
    #[strum(serialize = "string")]
    String,
    #[strum(serialize = "asset")]
    Asset,
    #[strum(serialize = "dictionary")]
    Dictionary,

    // Metadata only types.
    #[strum(serialize = "path")]
    Path,
    #[strum(serialize = "Reference")]
    Reference,
    #[strum(serialize = "Payload")]
    Payload,
}

impl ValueType {
    /// Types allowed for attributes and dictionary elements.
    pub fn is_attribute_type(self) -> bool {
        !matches!(self, ValueType::Path | ValueType::Reference | ValueType::Payload)
    }

    /// Scalar component type and count, for numeric types.
    pub fn components(self) -> Option<(ScalarKind, usize)> {
        use ScalarKind::*;
        use ValueType as T;

        let pair = match self {
            T::Bool => (Bool, 1),
            T::Uchar => (Uchar, 1),
            T::Int => (Int, 1),
            T::Int2 => (Int, 2),
            T::Int3 => (Int, 3),
            T::Int4 => (Int, 4),
            T::Uint => (Uint, 1),
            T::Uint2 => (Uint, 2),
            T::Uint3 => (Uint, 3),
            T::Uint4 => (Uint, 4),
            T::Int64 => (Int64, 1),
            T::Uint64 => (Uint64, 1),
            T::Half => (Half, 1),
            T::Half2 | T::TexCoord2h => (Half, 2),
            T::Half3 | T::Point3h | T::Normal3h | T::Vector3h | T::Color3h | T::TexCoord3h => (Half, 3),
            T::Half4 | T::Quath | T::Color4h | T::TexCoord4h => (Half, 4),
            T::Float => (Float, 1),
            T::Float2 | T::TexCoord2f => (Float, 2),
            T::Float3 | T::Point3f | T::Normal3f | T::Vector3f | T::Color3f | T::TexCoord3f => (Float, 3),
            T::Float4 | T::Quatf | T::Color4f | T::Vector4f | T::TexCoord4f => (Float, 4),
            T::Double | T::TimeCode => (Double, 1),
            T::Double2 | T::TexCoord2d => (Double, 2),
            T::Double3 | T::Point3d | T::Normal3d | T::Vector3d | T::Color3d | T::TexCoord3d => (Double, 3),
            T::Double4 | T::Quatd | T::Color4d | T::Vector4d | T::TexCoord4d => (Double, 4),
            _ => return None,
        };

        Some(pair)
    }

    /// Matrix dimension for matrix types.
    pub fn matrix_dim(self) -> Option<(ScalarKind, usize)> {
        match self {
            ValueType::Matrix2f => Some((ScalarKind::Float, 2)),
            ValueType::Matrix3f => Some((ScalarKind::Float, 3)),
            ValueType::Matrix4f => Some((ScalarKind::Float, 4)),
            ValueType::Matrix2d => Some((ScalarKind::Double, 2)),
            ValueType::Matrix3d => Some((ScalarKind::Double, 3)),
            ValueType::Matrix4d => Some((ScalarKind::Double, 4)),
            _ => None,
        }
    }
}

/// Numeric component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Uchar,
    Int,
    Uint,
    Int64,
    Uint64,
    Half,
    Float,
    Double,
}

/// Value is a type that can hold any of the supported USDA types.
///
/// Suffixes:
/// - d: double
/// - f: float
/// - h: half
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Uchar(u8),
    Int(i32),
    Int2([i32; 2]),
    Int3([i32; 3]),
    Int4([i32; 4]),
    Uint(u32),
    Uint2([u32; 2]),
    Uint3([u32; 3]),
    Uint4([u32; 4]),
    Int64(i64),
    Uint64(u64),

    Half(f16),
    Half2([f16; 2]),
    Half3([f16; 3]),
    Half4([f16; 4]),
    Float(f32),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Double(f64),
    Double2([f64; 2]),
    Double3([f64; 3]),
    Double4([f64; 4]),

    Quath([f16; 4]),
    Quatf([f32; 4]),
    Quatd([f64; 4]),

    Matrix2f([[f32; 2]; 2]),
    Matrix3f([[f32; 3]; 3]),
    Matrix4f([[f32; 4]; 4]),
    Matrix2d([[f64; 2]; 2]),
    Matrix3d([[f64; 3]; 3]),
    Matrix4d([[f64; 4]; 4]),

    Point3h([f16; 3]),
    Point3f([f32; 3]),
    Point3d([f64; 3]),
    Normal3h([f16; 3]),
    Normal3f([f32; 3]),
    Normal3d([f64; 3]),
    Vector3h([f16; 3]),
    Vector3f([f32; 3]),
    Vector3d([f64; 3]),
    Vector4f([f32; 4]),
    Vector4d([f64; 4]),
    Color3h([f16; 3]),
    Color3f([f32; 3]),
    Color3d([f64; 3]),
    Color4h([f16; 4]),
    Color4f([f32; 4]),
    Color4d([f64; 4]),
    TexCoord2h([f16; 2]),
    TexCoord2f([f32; 2]),
    TexCoord2d([f64; 2]),
    TexCoord3h([f16; 3]),
    TexCoord3f([f32; 3]),
    TexCoord3d([f64; 3]),
    TexCoord4h([f16; 4]),
    TexCoord4f([f32; 4]),
    TexCoord4d([f64; 4]),

    TimeCode(f64),
    Token(String),
    String(String),
    AssetPath(String),
    Dictionary(Dictionary),

    Path(Path),
    Reference(Reference),
    Payload(Payload),

    /// Homogeneous array of the given element type.
    ///
    /// Elements are either of the element type or [`Value::ValueBlock`].
    Array(ValueType, Vec<Value>),

    /// `None`
    ValueBlock,
}

impl Value {
    /// Element type of this value. `None` for value blocks.
    pub fn ty(&self) -> Option<ValueType> {
        use ValueType as T;

        let ty = match self {
            Value::Bool(_) => T::Bool,
            Value::Uchar(_) => T::Uchar,
            Value::Int(_) => T::Int,
            Value::Int2(_) => T::Int2,
            Value::Int3(_) => T::Int3,
            Value::Int4(_) => T::Int4,
            Value::Uint(_) => T::Uint,
            Value::Uint2(_) => T::Uint2,
            Value::Uint3(_) => T::Uint3,
            Value::Uint4(_) => T::Uint4,
            Value::Int64(_) => T::Int64,
            Value::Uint64(_) => T::Uint64,
            Value::Half(_) => T::Half,
            Value::Half2(_) => T::Half2,
            Value::Half3(_) => T::Half3,
            Value::Half4(_) => T::Half4,
            Value::Float(_) => T::Float,
            Value::Float2(_) => T::Float2,
            Value::Float3(_) => T::Float3,
            Value::Float4(_) => T::Float4,
            Value::Double(_) => T::Double,
            Value::Double2(_) => T::Double2,
            Value::Double3(_) => T::Double3,
            Value::Double4(_) => T::Double4,
            Value::Quath(_) => T::Quath,
            Value::Quatf(_) => T::Quatf,
            Value::Quatd(_) => T::Quatd,
            Value::Matrix2f(_) => T::Matrix2f,
            Value::Matrix3f(_) => T::Matrix3f,
            Value::Matrix4f(_) => T::Matrix4f,
            Value::Matrix2d(_) => T::Matrix2d,
            Value::Matrix3d(_) => T::Matrix3d,
            Value::Matrix4d(_) => T::Matrix4d,
            Value::Point3h(_) => T::Point3h,
            Value::Point3f(_) => T::Point3f,
            Value::Point3d(_) => T::Point3d,
            Value::Normal3h(_) => T::Normal3h,
            Value::Normal3f(_) => T::Normal3f,
            Value::Normal3d(_) => T::Normal3d,
            Value::Vector3h(_) => T::Vector3h,
            Value::Vector3f(_) => T::Vector3f,
            Value::Vector3d(_) => T::Vector3d,
            Value::Vector4f(_) => T::Vector4f,
            Value::Vector4d(_) => T::Vector4d,
            Value::Color3h(_) => T::Color3h,
            Value::Color3f(_) => T::Color3f,
            Value::Color3d(_) => T::Color3d,
            Value::Color4h(_) => T::Color4h,
            Value::Color4f(_) => T::Color4f,
            Value::Color4d(_) => T::Color4d,
            Value::TexCoord2h(_) => T::TexCoord2h,
            Value::TexCoord2f(_) => T::TexCoord2f,
            Value::TexCoord2d(_) => T::TexCoord2d,
            Value::TexCoord3h(_) => T::TexCoord3h,
            Value::TexCoord3f(_) => T::TexCoord3f,
            Value::TexCoord3d(_) => T::TexCoord3d,
            Value::TexCoord4h(_) => T::TexCoord4h,
            Value::TexCoord4f(_) => T::TexCoord4f,
            Value::TexCoord4d(_) => T::TexCoord4d,
            Value::TimeCode(_) => T::TimeCode,
            Value::Token(_) => T::Token,
            Value::String(_) => T::String,
            Value::AssetPath(_) => T::Asset,
            Value::Dictionary(_) => T::Dictionary,
            Value::Path(_) => T::Path,
            Value::Reference(_) => T::Reference,
            Value::Payload(_) => T::Payload,
            Value::Array(ty, _) => *ty,
            Value::ValueBlock => return None,
        };

        Some(ty)
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(..))
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Value::ValueBlock)
    }

    /// Full type name, including the `[]` suffix for arrays.
    pub fn type_name(&self) -> String {
        match self {
            Value::Array(ty, _) => format!("{ty}[]"),
            Value::ValueBlock => "None".to_string(),
            other => other.ty().map(|ty| ty.to_string()).unwrap_or_default(),
        }
    }

    /// Tag-checked extraction. No implicit conversion is performed.
    #[inline]
    pub fn get<T: TypedValue>(&self) -> Option<T> {
        T::from_value(self)
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(_, items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Value::Token(token) => Some(token.as_str()),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(string) => Some(string.as_str()),
            _ => None,
        }
    }

    /// Text of a string, token or asset path.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Token(s) | Value::AssetPath(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Flat view over double precision tuples and matrices.
    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        let slice: &[f64] = match self {
            Value::Double(v) | Value::TimeCode(v) => std::slice::from_ref(v),
            Value::Double2(v) | Value::TexCoord2d(v) => v,
            Value::Double3(v) | Value::Point3d(v) | Value::Normal3d(v) | Value::Vector3d(v) => v,
            Value::Color3d(v) | Value::TexCoord3d(v) => v,
            Value::Double4(v) | Value::Quatd(v) | Value::Color4d(v) => v,
            Value::Vector4d(v) | Value::TexCoord4d(v) => v,
            Value::Matrix2d(m) => bytemuck::cast_slice(&m[..]),
            Value::Matrix3d(m) => bytemuck::cast_slice(&m[..]),
            Value::Matrix4d(m) => bytemuck::cast_slice(&m[..]),
            _ => return None,
        };

        Some(slice)
    }

    /// Flat view over single precision tuples and matrices.
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        let slice: &[f32] = match self {
            Value::Float(v) => std::slice::from_ref(v),
            Value::Float2(v) | Value::TexCoord2f(v) => v,
            Value::Float3(v) | Value::Point3f(v) | Value::Normal3f(v) | Value::Vector3f(v) => v,
            Value::Color3f(v) | Value::TexCoord3f(v) => v,
            Value::Float4(v) | Value::Quatf(v) | Value::Color4f(v) => v,
            Value::Vector4f(v) | Value::TexCoord4f(v) => v,
            Value::Matrix2f(m) => bytemuck::cast_slice(&m[..]),
            Value::Matrix3f(m) => bytemuck::cast_slice(&m[..]),
            Value::Matrix4f(m) => bytemuck::cast_slice(&m[..]),
            _ => return None,
        };

        Some(slice)
    }

    /// Numeric scalar widened to `f64`.
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            Value::Uchar(v) => *v as f64,
            Value::Int(v) => *v as f64,
            Value::Uint(v) => *v as f64,
            Value::Int64(v) => *v as f64,
            Value::Uint64(v) => *v as f64,
            Value::Half(v) => v.to_f64(),
            Value::Float(v) => *v as f64,
            Value::Double(v) | Value::TimeCode(v) => *v,
            _ => return None,
        };

        Some(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn tuple<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            write!(f, "(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, ")")
        }

        fn matrix<T: fmt::Display, const N: usize>(f: &mut fmt::Formatter<'_>, rows: &[[T; N]]) -> fmt::Result {
            write!(f, "(")?;
            for (i, row) in rows.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                tuple(f, row)?;
            }
            write!(f, ")")
        }

        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Uchar(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Uint64(v) => write!(f, "{v}"),
            Value::Half(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) | Value::TimeCode(v) => write!(f, "{v}"),

            Value::Int2(v) => tuple(f, v),
            Value::Int3(v) => tuple(f, v),
            Value::Int4(v) => tuple(f, v),
            Value::Uint2(v) => tuple(f, v),
            Value::Uint3(v) => tuple(f, v),
            Value::Uint4(v) => tuple(f, v),

            Value::Half2(v) | Value::TexCoord2h(v) => tuple(f, v),
            Value::Half3(v)
            | Value::Point3h(v)
            | Value::Normal3h(v)
            | Value::Vector3h(v)
            | Value::Color3h(v)
            | Value::TexCoord3h(v) => tuple(f, v),
            Value::Half4(v) | Value::Quath(v) | Value::Color4h(v) | Value::TexCoord4h(v) => tuple(f, v),

            Value::Float2(v) | Value::TexCoord2f(v) => tuple(f, v),
            Value::Float3(v)
            | Value::Point3f(v)
            | Value::Normal3f(v)
            | Value::Vector3f(v)
            | Value::Color3f(v)
            | Value::TexCoord3f(v) => tuple(f, v),
            Value::Float4(v) | Value::Quatf(v) | Value::Color4f(v) => tuple(f, v),
            Value::Vector4f(v) | Value::TexCoord4f(v) => tuple(f, v),

            Value::Double2(v) | Value::TexCoord2d(v) => tuple(f, v),
            Value::Double3(v)
            | Value::Point3d(v)
            | Value::Normal3d(v)
            | Value::Vector3d(v)
            | Value::Color3d(v)
            | Value::TexCoord3d(v) => tuple(f, v),
            Value::Double4(v) | Value::Quatd(v) | Value::Color4d(v) => tuple(f, v),
            Value::Vector4d(v) | Value::TexCoord4d(v) => tuple(f, v),

            Value::Matrix2f(m) => matrix(f, m),
            Value::Matrix3f(m) => matrix(f, m),
            Value::Matrix4f(m) => matrix(f, m),
            Value::Matrix2d(m) => matrix(f, m),
            Value::Matrix3d(m) => matrix(f, m),
            Value::Matrix4d(m) => matrix(f, m),

            Value::Token(s) | Value::String(s) => write!(f, "{s:?}"),
            Value::AssetPath(s) => write!(f, "@{s}@"),
            Value::Path(p) => write!(f, "<{p}>"),
            Value::Dictionary(dict) => write!(f, "{{{} entries}}", dict.len()),
            Value::Reference(r) => write!(f, "{r}"),
            Value::Payload(p) => write!(f, "{p}"),

            Value::Array(_, items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }

            Value::ValueBlock => write!(f, "None"),
        }
    }
}

/// Rust types with a one-to-one mapping to a [`Value`] tag.
///
/// Role types (`point3f`, `color3f`, ...) have no Rust counterpart and are
/// not reachable through this trait: `[f32; 3]` maps to `float3` only.
pub trait TypedValue: Sized {
    fn value_type() -> ValueType;
    fn into_value(self) -> Value;
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! typed_value {
    ($ty:ty, $variant:ident) => {
        impl TypedValue for $ty {
            #[inline]
            fn value_type() -> ValueType {
                ValueType::$variant
            }

            #[inline]
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            #[inline]
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

typed_value!(bool, Bool);
typed_value!(u8, Uchar);
typed_value!(i32, Int);
typed_value!([i32; 2], Int2);
typed_value!([i32; 3], Int3);
typed_value!([i32; 4], Int4);
typed_value!(u32, Uint);
typed_value!([u32; 2], Uint2);
typed_value!([u32; 3], Uint3);
typed_value!([u32; 4], Uint4);
typed_value!(i64, Int64);
typed_value!(u64, Uint64);
typed_value!(f16, Half);
typed_value!([f16; 2], Half2);
typed_value!([f16; 3], Half3);
typed_value!([f16; 4], Half4);
typed_value!(f32, Float);
typed_value!([f32; 2], Float2);
typed_value!([f32; 3], Float3);
typed_value!([f32; 4], Float4);
typed_value!(f64, Double);
typed_value!([f64; 2], Double2);
typed_value!([f64; 3], Double3);
typed_value!([f64; 4], Double4);
typed_value!([[f32; 2]; 2], Matrix2f);
typed_value!([[f32; 3]; 3], Matrix3f);
typed_value!([[f32; 4]; 4], Matrix4f);
typed_value!([[f64; 2]; 2], Matrix2d);
typed_value!([[f64; 3]; 3], Matrix3d);
typed_value!([[f64; 4]; 4], Matrix4d);
typed_value!(String, String);
typed_value!(Dictionary, Dictionary);
typed_value!(Path, Path);
typed_value!(Reference, Reference);
typed_value!(Payload, Payload);

impl<T: TypedValue> TypedValue for Vec<T> {
    fn value_type() -> ValueType {
        T::value_type()
    }

    fn into_value(self) -> Value {
        Value::Array(T::value_type(), self.into_iter().map(T::into_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(ty, items) if *ty == T::value_type() => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

/// Time sampled values, ordered by time.
///
/// A blocked sample (`time: None`) is stored as [`Value::ValueBlock`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TimeSamples {
    samples: Vec<(f64, Value)>,
}

impl TimeSamples {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sample, replacing an existing one at the same time.
    pub fn add(&mut self, time: f64, value: Value) {
        match self.samples.binary_search_by(|(t, _)| t.total_cmp(&time)) {
            Ok(index) => self.samples[index].1 = value,
            Err(index) => self.samples.insert(index, (time, value)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &Value)> {
        self.samples.iter().map(|(t, v)| (*t, v))
    }

    /// Sample authored exactly at `time`.
    pub fn get(&self, time: f64) -> Option<&Value> {
        self.samples
            .binary_search_by(|(t, _)| t.total_cmp(&time))
            .ok()
            .map(|index| &self.samples[index].1)
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|(t, _)| *t).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use anyhow::Result;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn type_names_round_trip() -> Result<()> {
        for ty in ValueType::iter() {
            let name = ty.to_string();
            assert_eq!(ValueType::from_str(&name)?, ty, "{}", name);
        }

        Ok(())
    }

    #[test]
    fn unknown_type_name() {
        assert!(ValueType::from_str("float5").is_err());
        assert!(ValueType::from_str("Float3").is_err());
        assert!(ValueType::from_str("").is_err());
    }

    #[test]
    fn role_types_keep_their_tag() {
        let point = Value::Point3f([1.0, 2.0, 3.0]);
        assert_eq!(point.ty(), Some(ValueType::Point3f));
        assert_eq!(point.type_name(), "point3f");

        // Same storage, different tag.
        assert_eq!(point.get::<[f32; 3]>(), None);
        assert_eq!(point.as_f32_slice(), Some(&[1.0_f32, 2.0, 3.0][..]));

        let st = Value::TexCoord4d([0.0, 0.5, 1.0, 1.0]);
        assert_eq!(st.type_name(), "texCoord4d");
        assert_eq!(st.get::<[f64; 4]>(), None);
        assert_eq!(st.as_f64_slice().map(<[f64]>::len), Some(4));

        assert_eq!(Value::Vector4f([0.0; 4]).ty(), Some(ValueType::Vector4f));
        assert_eq!(ValueType::TexCoord4h.components(), Some((ScalarKind::Half, 4)));
        assert_eq!(ValueType::Vector4d.components(), Some((ScalarKind::Double, 4)));
    }

    #[test]
    fn tag_checked_get() {
        let value = Value::Float(1.5);
        assert_eq!(value.get::<f32>(), Some(1.5));
        assert_eq!(value.get::<f64>(), None);

        let array = vec![1_i32, 2, 3].into_value();
        assert_eq!(array.type_name(), "int[]");
        assert_eq!(array.get::<Vec<i32>>(), Some(vec![1, 2, 3]));
        assert_eq!(array.get::<Vec<u32>>(), None);
    }

    #[test]
    fn matrix_flat_view() {
        let value = Value::Matrix2d([[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(value.as_f64_slice(), Some(&[1.0, 2.0, 3.0, 4.0][..]));
        assert_eq!(value.to_string(), "((1, 2), (3, 4))");
    }

    #[test]
    fn time_samples_sorted() {
        let mut ts = TimeSamples::new();
        ts.add(10.0, Value::Float(2.0));
        ts.add(0.0, Value::Float(1.0));
        ts.add(5.0, Value::ValueBlock);
        ts.add(10.0, Value::Float(3.0));

        assert_eq!(ts.times(), vec![0.0, 5.0, 10.0]);
        assert_eq!(ts.get(10.0), Some(&Value::Float(3.0)));
        assert!(ts.get(5.0).is_some_and(Value::is_blocked));
        assert_eq!(ts.get(1.0), None);
    }
}
