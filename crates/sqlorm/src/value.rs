//! SQL values and the Rust types that map onto them.
//!
//! [`Value`] is what travels between the builders and the driver: every bound
//! argument is a `Value`, and every result row is a list of them. [`SqlType`]
//! ties a supported Rust field type to its [`FieldType`], which is the shape
//! recorded in a [`Model`](crate::Model) and used by the offset-based valuer.

use crate::error::{OrmError, OrmResult};
use chrono::NaiveDateTime;
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A single SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

macro_rules! value_from {
    ($variant:ident: $($ty:ty),+ => $conv:expr) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    #[allow(clippy::redundant_closure_call)]
                    Value::$variant(($conv)(v))
                }
            }
        )+
    };
}

value_from!(Bool: bool => |v| v);
value_from!(Int: i8, i16, i32, i64 => i64::from);
value_from!(UInt: u8, u16, u32, u64 => u64::from);
value_from!(Float: f32, f64 => f64::from);
value_from!(Text: String => |v| v);
value_from!(Text: &str => str::to_string);
value_from!(Bytes: Vec<u8> => |v| v);
value_from!(Bytes: &[u8] => <[u8]>::to_vec);
value_from!(Timestamp: NaiveDateTime => |v| v);
value_from!(Uuid: Uuid => |v| v);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion from a [`Value`] into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> OrmResult<Self>;
}

fn mismatch<T>(expected: &'static str, found: &Value) -> OrmResult<T> {
    Err(OrmError::TypeMismatch {
        expected,
        found: found.kind_name(),
    })
}

macro_rules! from_value_int {
    ($($ty:ty),+) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> OrmResult<Self> {
                    let converted = match &value {
                        Value::Int(v) => <$ty>::try_from(*v).ok(),
                        Value::UInt(v) => <$ty>::try_from(*v).ok(),
                        _ => return mismatch(stringify!($ty), &value),
                    };
                    converted.ok_or_else(|| {
                        OrmError::validation(format!(
                            "value {value:?} out of range for {}",
                            stringify!($ty)
                        ))
                    })
                }
            }
        )+
    };
}

from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for bool {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            // MySQL reports BOOL columns as TINYINT
            Value::Int(v) => Ok(v != 0),
            Value::UInt(v) => Ok(v != 0),
            other => mismatch("bool", &other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            Value::UInt(v) => Ok(v as f64),
            other => mismatch("f64", &other),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> OrmResult<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Bytes(v) => String::from_utf8(v)
                .map_err(|e| OrmError::validation(format!("invalid utf-8 text: {e}"))),
            other => mismatch("String", &other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            other => mismatch("Vec<u8>", &other),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::Text(raw) => NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
                .map_err(|_e| {
                    OrmError::validation(format!(
                        "unsupported timestamp: {raw}; expected \"{TIMESTAMP_FORMAT}\""
                    ))
                }),
            other => mismatch("NaiveDateTime", &other),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Uuid(v) => Ok(v),
            Value::Text(raw) => Uuid::parse_str(&raw)
                .map_err(|e| OrmError::validation(format!("invalid uuid {raw}: {e}"))),
            Value::Bytes(raw) => Uuid::from_slice(&raw)
                .map_err(|e| OrmError::validation(format!("invalid uuid bytes: {e}"))),
            other => mismatch("Uuid", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> OrmResult<Self> {
        Ok(value)
    }
}

/// Scalar shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
    Timestamp,
    Uuid,
}

/// Semantic type of a field: a scalar, optionally wrapped in `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub kind: ScalarKind,
    pub nullable: bool,
}

impl FieldType {
    pub const fn new(kind: ScalarKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            kind: self.kind,
            nullable: true,
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A Rust type that can be stored in an entity field.
///
/// `TYPE` must describe `Self` exactly: the offset-based valuer reinterprets
/// field memory as the type named by `TYPE`. The trait is sealed, so the set
/// of field types is the one listed below and cannot be extended:
///
/// ```compile_fail
/// use sqlorm::{FieldType, FromValue, OrmResult, ScalarKind, SqlType, Value};
///
/// #[derive(Clone)]
/// struct Wide([u64; 4]);
///
/// impl FromValue for Wide {
///     fn from_value(_: Value) -> OrmResult<Self> {
///         Ok(Wide([0; 4]))
///     }
/// }
///
/// impl From<Wide> for Value {
///     fn from(w: Wide) -> Value {
///         Value::UInt(w.0[0])
///     }
/// }
///
/// impl SqlType for Wide {
///     const TYPE: FieldType = FieldType::new(ScalarKind::String);
/// }
/// ```
pub trait SqlType:
    sealed::Sealed + FromValue + Into<Value> + Clone + Send + Sync + 'static
{
    const TYPE: FieldType;
}

macro_rules! sql_type {
    ($($ty:ty => $kind:ident),+ $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl SqlType for $ty {
                const TYPE: FieldType = FieldType::new(ScalarKind::$kind);
            }

            impl sealed::Sealed for Option<$ty> {}

            impl SqlType for Option<$ty> {
                const TYPE: FieldType = FieldType::new(ScalarKind::$kind).nullable();
            }
        )+
    };
}

sql_type! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Bytes,
    NaiveDateTime => Timestamp,
    Uuid => Uuid,
}

/// Run `$func::<T>($args)` with `T` being the Rust type described by a
/// [`FieldType`].
macro_rules! dispatch_field_type {
    ($field_type:expr, $func:ident($($arg:expr),* $(,)?)) => {{
        use $crate::value::{FieldType, ScalarKind};
        use ::chrono::NaiveDateTime;
        use ::uuid::Uuid;
        let FieldType { kind, nullable } = $field_type;
        match (kind, nullable) {
            (ScalarKind::Bool, false) => $func::<bool>($($arg),*),
            (ScalarKind::Bool, true) => $func::<Option<bool>>($($arg),*),
            (ScalarKind::I8, false) => $func::<i8>($($arg),*),
            (ScalarKind::I8, true) => $func::<Option<i8>>($($arg),*),
            (ScalarKind::I16, false) => $func::<i16>($($arg),*),
            (ScalarKind::I16, true) => $func::<Option<i16>>($($arg),*),
            (ScalarKind::I32, false) => $func::<i32>($($arg),*),
            (ScalarKind::I32, true) => $func::<Option<i32>>($($arg),*),
            (ScalarKind::I64, false) => $func::<i64>($($arg),*),
            (ScalarKind::I64, true) => $func::<Option<i64>>($($arg),*),
            (ScalarKind::U8, false) => $func::<u8>($($arg),*),
            (ScalarKind::U8, true) => $func::<Option<u8>>($($arg),*),
            (ScalarKind::U16, false) => $func::<u16>($($arg),*),
            (ScalarKind::U16, true) => $func::<Option<u16>>($($arg),*),
            (ScalarKind::U32, false) => $func::<u32>($($arg),*),
            (ScalarKind::U32, true) => $func::<Option<u32>>($($arg),*),
            (ScalarKind::U64, false) => $func::<u64>($($arg),*),
            (ScalarKind::U64, true) => $func::<Option<u64>>($($arg),*),
            (ScalarKind::F32, false) => $func::<f32>($($arg),*),
            (ScalarKind::F32, true) => $func::<Option<f32>>($($arg),*),
            (ScalarKind::F64, false) => $func::<f64>($($arg),*),
            (ScalarKind::F64, true) => $func::<Option<f64>>($($arg),*),
            (ScalarKind::String, false) => $func::<String>($($arg),*),
            (ScalarKind::String, true) => $func::<Option<String>>($($arg),*),
            (ScalarKind::Bytes, false) => $func::<Vec<u8>>($($arg),*),
            (ScalarKind::Bytes, true) => $func::<Option<Vec<u8>>>($($arg),*),
            (ScalarKind::Timestamp, false) => $func::<NaiveDateTime>($($arg),*),
            (ScalarKind::Timestamp, true) => $func::<Option<NaiveDateTime>>($($arg),*),
            (ScalarKind::Uuid, false) => $func::<Uuid>($($arg),*),
            (ScalarKind::Uuid, true) => $func::<Option<Uuid>>($($arg),*),
        }
    }};
}

pub(crate) use dispatch_field_type;
