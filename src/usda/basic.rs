//! Readers for scalar, tuple, matrix and array values.

use std::{any::type_name, str::FromStr};

use anyhow::{anyhow, bail, ensure, Context, Result};
use half::f16;
use num_traits::NumCast;

use crate::sdf::{self, Value, ValueType};

use super::parser::Parser;

/// Scalar types that can be read as a single literal.
pub trait Scalar: Copy + Default {
    fn read(parser: &mut Parser<'_>) -> Result<Self>;
}

macro_rules! int_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                #[inline]
                fn read(parser: &mut Parser<'_>) -> Result<Self> {
                    parser.read_int()
                }
            }
        )*
    };
}

int_scalar!(u8, i32, u32, i64, u64);

impl Scalar for f32 {
    #[inline]
    fn read(parser: &mut Parser<'_>) -> Result<Self> {
        parser.read_float()
    }
}

impl Scalar for f64 {
    #[inline]
    fn read(parser: &mut Parser<'_>) -> Result<Self> {
        parser.read_float()
    }
}

impl Scalar for f16 {
    #[inline]
    fn read(parser: &mut Parser<'_>) -> Result<Self> {
        parser.read_float::<f32>().map(f16::from_f32)
    }
}

impl Scalar for bool {
    fn read(parser: &mut Parser<'_>) -> Result<Self> {
        let cur = &mut parser.cur;
        if cur.maybe_keyword("true") || cur.maybe_keyword("1") {
            Ok(true)
        } else if cur.maybe_keyword("false") || cur.maybe_keyword("0") {
            Ok(false)
        } else {
            bail!("Expected `true`, `false`, `1` or `0` for bool")
        }
    }
}

impl Parser<'_> {
    #[inline]
    pub fn read_basic<T: Scalar>(&mut self) -> Result<T> {
        T::read(self)
    }

    /// Integers also accept floating point text that fits into `T`.
    fn read_int<T>(&mut self) -> Result<T>
    where
        T: FromStr + NumCast,
    {
        let text = self.cur.lex_float()?;

        if !text.contains(['.', 'e', 'E']) {
            let digits = text.trim_start_matches(['+', '-']);
            ensure!(
                !(digits.len() > 1 && digits.starts_with('0')),
                "Zero padded integer literal: {text}"
            );

            return T::from_str(&text).map_err(|_| anyhow!("Failed to parse {} from '{}'", type_name::<T>(), text));
        }

        let value = f64::from_str(&text).with_context(|| format!("Invalid number literal: {text}"))?;
        <T as NumCast>::from(value).with_context(|| format!("{text} is out of range for {}", type_name::<T>()))
    }

    fn read_float<T>(&mut self) -> Result<T>
    where
        T: FromStr,
        <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    {
        let text = self.cur.lex_float()?;
        T::from_str(&text).with_context(|| format!("Failed to parse {} from '{}'", type_name::<T>(), text))
    }

    /// `[a, b, None, ...]` of scalars. `None` elements come back as `None`.
    pub fn read_basic_array<T: Scalar>(&mut self) -> Result<Vec<Option<T>>> {
        self.cur.expect('[').context("Array must start with [")?;

        let mut result = Vec::new();
        loop {
            self.skip();
            if self.cur.maybe_char(']') {
                break;
            }

            if self.cur.maybe_keyword("None") {
                result.push(None);
            } else {
                result.push(Some(self.read_basic::<T>()?));
            }

            self.skip();
            if !self.cur.maybe_char(',') {
                self.cur
                    .expect(']')
                    .context("Either comma or closing bracket expected after value")?;
                break;
            }
        }

        Ok(result)
    }

    /// `(a, b, ...)` with exactly `N` components.
    pub(super) fn read_tuple<T: Scalar, const N: usize>(&mut self) -> Result<[T; N]> {
        self.cur.expect('(').context("Tuples must start with (")?;

        let mut result = [T::default(); N];
        for (i, item) in result.iter_mut().enumerate() {
            self.skip();
            if i > 0 {
                self.cur
                    .expect(',')
                    .with_context(|| format!("Comma is expected between tuple values, {N} values total"))?;
                self.skip();
            }

            *item = self.read_basic()?;
        }

        self.skip();
        // Tolerate a trailing comma.
        if self.cur.maybe_char(',') {
            self.skip();
        }
        self.cur.expect(')').context("Tuples must be closed with )")?;

        Ok(result)
    }

    /// `((..), (..), ...)` with `N` rows of `N` columns.
    pub(super) fn read_matrix<T: Scalar, const N: usize>(&mut self) -> Result<[[T; N]; N]> {
        self.cur.expect('(').context("Matrix must start with (")?;

        let mut result = [[T::default(); N]; N];
        for (i, row) in result.iter_mut().enumerate() {
            self.skip();
            if i > 0 {
                self.cur.expect(',').context("Comma is expected between matrix rows")?;
                self.skip();
            }

            *row = self.read_tuple()?;
        }

        self.skip();
        self.cur.expect(')').context("Matrix must be closed with )")?;

        Ok(result)
    }

    /// `[elem, elem, ...]`. Elements may be `None`, and a trailing comma is accepted.
    pub(super) fn read_array<F>(&mut self, mut elem: F) -> Result<Vec<Value>>
    where
        F: FnMut(&mut Self) -> Result<Value>,
    {
        self.cur.expect('[').context("Array must start with [")?;

        let mut result = Vec::new();
        loop {
            self.skip();
            if self.cur.maybe_char(']') {
                break;
            }

            let value = if self.cur.maybe_keyword("None") {
                Value::ValueBlock
            } else {
                elem(self)?
            };
            result.push(value);

            self.skip();
            if self.cur.maybe_char(',') {
                continue;
            }

            self.cur
                .expect(']')
                .context("Either comma or closing bracket expected after value")?;
            break;
        }

        Ok(result)
    }

    /// Type name with an optional `[]` suffix.
    pub(super) fn read_type_name(&mut self) -> Result<(ValueType, bool)> {
        let name = self.cur.read_identifier().context("Type name expected")?;
        let ty = ValueType::from_str(&name).map_err(|_| anyhow!("Unknown type name: {name}"))?;
        let array = self.cur.starts_with("[]");
        if array {
            self.cur.consume_n(2)?;
        }

        Ok((ty, array))
    }

    /// Read a value of a declared type. `None` is not handled here.
    pub(super) fn parse_value(&mut self, ty: ValueType, array: bool) -> Result<Value> {
        if array {
            let items = self.read_array(|p| p.parse_scalar_value(ty))?;
            return Ok(Value::Array(ty, items));
        }

        self.parse_scalar_value(ty)
    }

    fn parse_scalar_value(&mut self, ty: ValueType) -> Result<Value> {
        use ValueType as T;

        let value = match ty {
            T::Bool => Value::Bool(self.read_basic()?),
            T::Uchar => Value::Uchar(self.read_basic()?),

            T::Int => Value::Int(self.read_basic()?),
            T::Int2 => Value::Int2(self.read_tuple()?),
            T::Int3 => Value::Int3(self.read_tuple()?),
            T::Int4 => Value::Int4(self.read_tuple()?),
            T::Uint => Value::Uint(self.read_basic()?),
            T::Uint2 => Value::Uint2(self.read_tuple()?),
            T::Uint3 => Value::Uint3(self.read_tuple()?),
            T::Uint4 => Value::Uint4(self.read_tuple()?),
            T::Int64 => Value::Int64(self.read_basic()?),
            T::Uint64 => Value::Uint64(self.read_basic()?),

            T::Half => Value::Half(self.read_basic()?),
            T::Half2 => Value::Half2(self.read_tuple()?),
            T::Half3 => Value::Half3(self.read_tuple()?),
            T::Half4 => Value::Half4(self.read_tuple()?),
            T::Float => Value::Float(self.read_basic()?),
            T::Float2 => Value::Float2(self.read_tuple()?),
            T::Float3 => Value::Float3(self.read_tuple()?),
            T::Float4 => Value::Float4(self.read_tuple()?),
            T::Double => Value::Double(self.read_basic()?),
            T::Double2 => Value::Double2(self.read_tuple()?),
            T::Double3 => Value::Double3(self.read_tuple()?),
            T::Double4 => Value::Double4(self.read_tuple()?),

            T::Quath => Value::Quath(self.read_tuple()?),
            T::Quatf => Value::Quatf(self.read_tuple()?),
            T::Quatd => Value::Quatd(self.read_tuple()?),

            T::Matrix2f => Value::Matrix2f(self.read_matrix()?),
            T::Matrix3f => Value::Matrix3f(self.read_matrix()?),
            T::Matrix4f => Value::Matrix4f(self.read_matrix()?),
            T::Matrix2d => Value::Matrix2d(self.read_matrix()?),
            T::Matrix3d => Value::Matrix3d(self.read_matrix()?),
            T::Matrix4d => Value::Matrix4d(self.read_matrix()?),

            T::Point3h => Value::Point3h(self.read_tuple()?),
            T::Point3f => Value::Point3f(self.read_tuple()?),
            T::Point3d => Value::Point3d(self.read_tuple()?),
            T::Normal3h => Value::Normal3h(self.read_tuple()?),
            T::Normal3f => Value::Normal3f(self.read_tuple()?),
            T::Normal3d => Value::Normal3d(self.read_tuple()?),
            T::Vector3h => Value::Vector3h(self.read_tuple()?),
            T::Vector3f => Value::Vector3f(self.read_tuple()?),
            T::Vector3d => Value::Vector3d(self.read_tuple()?),
            T::Vector4f => Value::Vector4f(self.read_tuple()?),
            T::Vector4d => Value::Vector4d(self.read_tuple()?),
            T::Color3h => Value::Color3h(self.read_tuple()?),
            T::Color3f => Value::Color3f(self.read_tuple()?),
            T::Color3d => Value::Color3d(self.read_tuple()?),
            T::Color4h => Value::Color4h(self.read_tuple()?),
            T::Color4f => Value::Color4f(self.read_tuple()?),
            T::Color4d => Value::Color4d(self.read_tuple()?),
            T::TexCoord2h => Value::TexCoord2h(self.read_tuple()?),
            T::TexCoord2f => Value::TexCoord2f(self.read_tuple()?),
            T::TexCoord2d => Value::TexCoord2d(self.read_tuple()?),
            T::TexCoord3h => Value::TexCoord3h(self.read_tuple()?),
            T::TexCoord3f => Value::TexCoord3f(self.read_tuple()?),
            T::TexCoord3d => Value::TexCoord3d(self.read_tuple()?),
            T::TexCoord4h => Value::TexCoord4h(self.read_tuple()?),
            T::TexCoord4f => Value::TexCoord4f(self.read_tuple()?),
            T::TexCoord4d => Value::TexCoord4d(self.read_tuple()?),

            T::TimeCode => Value::TimeCode(self.read_basic()?),
            T::Token => Value::Token(self.cur.read_string()?),
            T::String => Value::String(self.cur.read_string()?),
            T::Asset => Value::AssetPath(self.cur.parse_asset_identifier()?),
            T::Dictionary => Value::Dictionary(self.parse_dict()?),

            T::Path => {
                let raw = self.cur.read_path_identifier()?;
                Value::Path(sdf::path(&raw).with_context(|| format!("Invalid path <{raw}>"))?)
            }
            T::Reference => Value::Reference(self.parse_reference()?),
            T::Payload => Value::Payload(self.parse_payload()?),
        };

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usda::ParserConfig;

    fn parser(text: &str) -> Parser<'_> {
        Parser::new(text, ParserConfig::default())
    }

    #[test]
    fn parse_empty_array() -> Result<()> {
        let array = parser("[]").parse_value(ValueType::Uint, true)?;
        assert_eq!(array, Value::Array(ValueType::Uint, vec![]));
        Ok(())
    }

    #[test]
    fn parse_tuple() -> Result<()> {
        let result = parser("(1, 2, 3)").read_tuple::<u32, 3>()?;
        assert_eq!(result, [1_u32, 2, 3]);

        assert!(parser("(1, 2)").read_tuple::<u32, 3>().is_err());
        assert!(parser("(1, 2, 3, 4)").read_tuple::<u32, 3>().is_err());
        Ok(())
    }

    #[test]
    fn parse_array() -> Result<()> {
        let value = parser("[1, 2, 3]").parse_value(ValueType::Int, true)?;
        assert_eq!(value.get::<Vec<i32>>(), Some(vec![1, 2, 3]));

        // Trailing comma and newlines.
        let value = parser("[\n  1,\n  2,\n]").parse_value(ValueType::Int, true)?;
        assert_eq!(value.get::<Vec<i32>>(), Some(vec![1, 2]));

        let value = parser("[1, None, 3]").parse_value(ValueType::Int, true)?;
        assert_eq!(value.as_array().map(|items| items[1].is_blocked()), Some(true));

        assert!(parser("[1 2]").parse_value(ValueType::Int, true).is_err());
        assert!(parser("[1,, 2]").parse_value(ValueType::Int, true).is_err());
        Ok(())
    }

    #[test]
    fn parse_basic_array() -> Result<()> {
        assert_eq!(parser("[0.5, None, 2]").read_basic_array::<f64>()?, vec![Some(0.5), None, Some(2.0)]);
        assert_eq!(parser("[ ]").read_basic_array::<u8>()?, Vec::<Option<u8>>::new());
        assert_eq!(parser("[true, 0,]").read_basic_array::<bool>()?, vec![Some(true), Some(false)]);

        assert!(parser("[1.5x]").read_basic_array::<f32>().is_err());
        assert!(parser("1, 2").read_basic_array::<i32>().is_err());
        Ok(())
    }

    #[test]
    fn parse_array_of_tuples() -> Result<()> {
        let value = parser("[(1, 2), (3, 4)]").parse_value(ValueType::Float2, true)?;
        assert_eq!(value.get::<Vec<[f32; 2]>>(), Some(vec![[1.0, 2.0], [3.0, 4.0]]));

        let value = parser("[(0, 0, 0), (1, 1, 1)]").parse_value(ValueType::Point3f, true)?;
        assert_eq!(value.type_name(), "point3f[]");
        Ok(())
    }

    #[test]
    fn parse_matrix() -> Result<()> {
        let value = parser("( (1, 0, 0, 0), (0, 1, 0, 0), (0, 0, 1, 0), (0, 0, 0, 1) )")
            .parse_value(ValueType::Matrix4d, false)?;

        let Value::Matrix4d(m) = value else {
            panic!("unexpected value {value:?}");
        };
        assert_eq!(m[3], [0.0, 0.0, 0.0, 1.0]);
        Ok(())
    }

    #[test]
    fn scalar_round_trip() -> Result<()> {
        #[rustfmt::skip]
        let cases = [
            Value::Int(i32::MIN),
            Value::Int(i32::MAX),
            Value::Uint(u32::MAX),
            Value::Int64(i64::MIN),
            Value::Uint64(u64::MAX),
            Value::Uchar(255),
            Value::Float(-1.5e-7),
            Value::Float(f32::MAX),
            Value::Double(std::f64::consts::PI),
            Value::Double(-0.0),
            Value::Half(f16::from_f32(0.5)),
            Value::Bool(true),
            Value::Bool(false),
        ];

        for value in cases {
            let text = value.to_string();
            let ty = value.ty().context("typed value")?;
            assert_eq!(parser(&text).parse_value(ty, false)?, value, "{text}");
        }

        Ok(())
    }

    #[test]
    fn int_literals() -> Result<()> {
        assert_eq!(parser("1.0").read_basic::<i32>()?, 1);
        assert_eq!(parser("+7").read_basic::<i32>()?, 7);
        assert_eq!(parser("0").read_basic::<u32>()?, 0);
        assert_eq!(parser("1").read_basic::<bool>()?, true);

        assert!(parser("007").read_basic::<i32>().is_err());
        assert!(parser("-1").read_basic::<u32>().is_err());
        assert!(parser("256").read_basic::<u8>().is_err());
        assert!(parser("1e20").read_basic::<i32>().is_err());
        assert!(parser("-").read_basic::<i32>().is_err());
        assert!(parser("12abc").read_basic::<i32>().is_err());
        assert!(parser("yes").read_basic::<bool>().is_err());

        Ok(())
    }

    #[test]
    fn strings_and_paths() -> Result<()> {
        assert_eq!(
            parser("\"text\"").parse_value(ValueType::Token, false)?,
            Value::Token("text".into())
        );
        assert_eq!(
            parser("@./tex.png@").parse_value(ValueType::Asset, false)?,
            Value::AssetPath("./tex.png".into())
        );
        assert_eq!(
            parser("</World/Mesh>").parse_value(ValueType::Path, false)?,
            Value::Path(sdf::path("/World/Mesh")?)
        );
        Ok(())
    }

    #[test]
    fn type_names() -> Result<()> {
        assert_eq!(parser("float3[]").read_type_name()?, (ValueType::Float3, true));
        assert_eq!(parser("texCoord2f").read_type_name()?, (ValueType::TexCoord2f, false));
        assert_eq!(parser("texCoord4h[]").read_type_name()?, (ValueType::TexCoord4h, true));
        assert_eq!(parser("vector4d").read_type_name()?, (ValueType::Vector4d, false));

        assert_eq!(
            parser("(1, 2, 3, 4)").parse_value(ValueType::TexCoord4f, false)?,
            Value::TexCoord4f([1.0, 2.0, 3.0, 4.0])
        );
        assert_eq!(
            parser("(0, 0, 1, 0)").parse_value(ValueType::Vector4f, false)?,
            Value::Vector4f([0.0, 0.0, 1.0, 0.0])
        );
        assert!(parser("(1, 2, 3)").parse_value(ValueType::TexCoord4d, false).is_err());
        assert!(parser("float5").read_type_name().is_err());
        Ok(())
    }
}
