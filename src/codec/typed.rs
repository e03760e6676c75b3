//! Descriptor-driven typed reads.
//!
//! A [`TypeDescriptor`] names the shape the caller expects. Reading walks
//! the wire value and converts scalars to the requested simple type where a
//! lossless or conventional conversion exists (an integer read as a
//! string, a numeric string read as a long, and so on).

use super::format::ValueType;
use super::{PackReader, Payload, ReadMode};
use crate::core::error::{DattyError, DattyResult};
use crate::value::{PackableNumber, PackableValue};

/// Scalar target types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleType {
    Bool,
    Long,
    Double,
    String,
    Binary,
    /// Any value, decoded as a [`PackableValue`].
    Value,
}

/// Expected shape of a wire value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Simple(SimpleType),
    /// Positional array; NIL elements are kept as `None`.
    Array(Box<TypeDescriptor>),
    /// List; NIL elements are dropped.
    List(Box<TypeDescriptor>),
    /// Map; entries with a NIL key are dropped.
    Map {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    pub fn array(element: TypeDescriptor) -> Self {
        Self::Array(Box::new(element))
    }

    pub fn list(element: TypeDescriptor) -> Self {
        Self::List(Box::new(element))
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }
}

impl From<SimpleType> for TypeDescriptor {
    fn from(t: SimpleType) -> Self {
        Self::Simple(t)
    }
}

/// Value produced by [`read_typed`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
    Binary(Payload),
    Value(PackableValue),
    Array(Vec<Option<TypedValue>>),
    List(Vec<TypedValue>),
    Map(Vec<(TypedValue, Option<TypedValue>)>),
}

/// Read the next value as `descriptor`. NIL is absent.
pub fn read_typed(
    descriptor: &TypeDescriptor,
    reader: &mut PackReader,
    mode: ReadMode,
) -> DattyResult<Option<TypedValue>> {
    read_at_depth(descriptor, reader, mode, 0)
}

fn read_at_depth(
    descriptor: &TypeDescriptor,
    reader: &mut PackReader,
    mode: ReadMode,
    depth: usize,
) -> DattyResult<Option<TypedValue>> {
    if reader.try_read_nil()? {
        return Ok(None);
    }
    let value = match descriptor {
        TypeDescriptor::Simple(simple) => return read_simple(*simple, reader, mode),
        TypeDescriptor::Array(element) => {
            reader.check_depth(depth)?;
            let size = reader.read_array_header()?;
            let mut items = Vec::with_capacity(size);
            for _ in 0..size {
                items.push(read_at_depth(element, reader, mode, depth + 1)?);
            }
            TypedValue::Array(items)
        }
        TypeDescriptor::List(element) => {
            reader.check_depth(depth)?;
            let size = reader.read_array_header()?;
            let mut items = Vec::with_capacity(size);
            for _ in 0..size {
                if let Some(item) = read_at_depth(element, reader, mode, depth + 1)? {
                    items.push(item);
                }
            }
            TypedValue::List(items)
        }
        TypeDescriptor::Map { key, value } => {
            reader.check_depth(depth)?;
            let size = reader.read_map_header()?;
            let mut entries = Vec::with_capacity(size);
            for _ in 0..size {
                let k = read_at_depth(key, reader, mode, depth + 1)?;
                let v = read_at_depth(value, reader, mode, depth + 1)?;
                if let Some(k) = k {
                    entries.push((k, v));
                }
            }
            TypedValue::Map(entries)
        }
    };
    Ok(Some(value))
}

fn read_simple(
    simple: SimpleType,
    reader: &mut PackReader,
    mode: ReadMode,
) -> DattyResult<Option<TypedValue>> {
    if simple == SimpleType::Value {
        return Ok(PackableValue::read(reader, mode)?.map(TypedValue::Value));
    }

    let format = reader.peek_format()?;
    let value = match (simple, format.value_type()) {
        (SimpleType::Bool, ValueType::Boolean) => TypedValue::Bool(reader.read_bool()?),
        (SimpleType::Bool, ValueType::Integer) => TypedValue::Bool(reader.read_i64()? != 0),
        (SimpleType::Bool, ValueType::String) => {
            let s = reader.read_str()?;
            if s.eq_ignore_ascii_case("true") {
                TypedValue::Bool(true)
            } else if s.eq_ignore_ascii_case("false") {
                TypedValue::Bool(false)
            } else {
                return Err(DattyError::parse(format!("not a boolean: {:?}", s)));
            }
        }

        (SimpleType::Long, ValueType::Integer) => TypedValue::Long(reader.read_i64()?),
        (SimpleType::Long, ValueType::Float) => TypedValue::Long(reader.read_f64()? as i64),
        (SimpleType::Long, ValueType::Boolean) => TypedValue::Long(reader.read_bool()? as i64),
        (SimpleType::Long, ValueType::String) => {
            TypedValue::Long(PackableNumber::parse(&reader.read_str()?)?.as_long())
        }

        (SimpleType::Double, ValueType::Float) => TypedValue::Double(reader.read_f64()?),
        (SimpleType::Double, ValueType::Integer) => TypedValue::Double(reader.read_i64()? as f64),
        (SimpleType::Double, ValueType::String) => {
            TypedValue::Double(PackableNumber::parse(&reader.read_str()?)?.as_double())
        }

        (SimpleType::String, ValueType::String) => TypedValue::String(reader.read_str()?),
        (SimpleType::String, ValueType::Integer) => {
            TypedValue::String(reader.read_i64()?.to_string())
        }
        (SimpleType::String, ValueType::Float) => {
            TypedValue::String(PackableNumber::Double(reader.read_f64()?).as_string())
        }
        (SimpleType::String, ValueType::Boolean) => {
            TypedValue::String(reader.read_bool()?.to_string())
        }
        (SimpleType::String, ValueType::Binary) => {
            TypedValue::String(reader.read_bin(ReadMode::Slice)?.to_utf8_lossy())
        }

        (SimpleType::Binary, ValueType::Binary) => TypedValue::Binary(reader.read_bin(mode)?),
        (SimpleType::Binary, ValueType::String) => {
            TypedValue::Binary(reader.read_str_bytes(mode)?)
        }

        (wanted, _) => {
            return Err(DattyError::parse(format!(
                "cannot read {} as {:?}",
                format, wanted
            )));
        }
    };
    Ok(Some(value))
}
