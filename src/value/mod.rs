//! The runtime value type produced by completion and consumed by coercion.

mod object;
mod scalar;

use std::fmt;

pub use self::object::Object;
pub use self::scalar::Scalar;

/// A completed GraphQL value, ready to be serialized into a response.
///
/// Mirrors the shape of `InputValue` but never carries a variable reference
/// or location information: by the time a `Value` exists, coercion and
/// completion have already resolved it down to plain data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Scalar(Scalar),
    List(Vec<Value>),
    Object(Object),
}

impl Value {
    pub fn null() -> Self {
        Self::Null
    }

    pub fn boolean(b: bool) -> Self {
        Self::Scalar(Scalar::Boolean(b))
    }

    pub fn int(i: i64) -> Self {
        Self::Scalar(Scalar::Int(i))
    }

    pub fn float(f: f64) -> Self {
        Self::Scalar(Scalar::Float(f))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(s.into()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Self::List(items)
    }

    pub fn object(o: Object) -> Self {
        Self::Object(o)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Converts this value to a `serde_json::Value`, for transports that
    /// need one. The execution core itself never depends on this path.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Scalar(s) => s.to_json(),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Self::Object(o) => {
                serde_json::Value::Object(o.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}
