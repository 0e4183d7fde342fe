//! Column values bound to generated statements

use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;

/// A single column value of a [`Record`](super::Record).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Bind as the next positional parameter of `query`.
    pub fn bind_to<'q>(
        self,
        query: Query<'q, MySql, MySqlArguments>,
    ) -> Query<'q, MySql, MySqlArguments> {
        match self {
            Self::Null => query.bind(None::<String>),
            Self::Bool(v) => query.bind(v),
            Self::Int(v) => query.bind(v),
            Self::UInt(v) => query.bind(v),
            Self::Float(v) => query.bind(v),
            Self::Text(v) => query.bind(v),
            Self::Bytes(v) => query.bind(v),
        }
    }
}

macro_rules! impl_from {
    ($variant:ident: $($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )+
    };
}

impl_from!(Bool: bool);
impl_from!(Int: i8, i16, i32, i64);
impl_from!(UInt: u8, u16, u32, u64);
impl_from!(Float: f32, f64);
impl_from!(Text: String, &str);
impl_from!(Bytes: Vec<u8>, &[u8]);

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_integers() {
        assert_eq!(Value::from(7_i32), Value::Int(7));
        assert_eq!(Value::from(7_u16), Value::UInt(7));
        assert_eq!(Value::from(-1_i64), Value::Int(-1));
    }

    #[test]
    fn test_from_text_and_bytes() {
        assert_eq!(Value::from("ada"), Value::Text("ada".to_string()));
        assert_eq!(Value::from(vec![1_u8, 2]), Value::Bytes(vec![1, 2]));
        assert_eq!(Value::from(&[3_u8][..]), Value::Bytes(vec![3]));
    }

    #[test]
    fn test_from_option() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Some(true)), Value::Bool(true));
    }

    #[test]
    fn test_from_float() {
        assert_eq!(Value::from(1.5_f32), Value::Float(1.5));
    }
}
