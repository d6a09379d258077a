use std::fmt::{Display, Formatter};

/// An extra argument passed along with an enablement check.
///
/// Extra arguments are handed untouched to every consulted [`crate::StrategyHandler`],
/// so custom strategies can decide on values that are not part of the [`crate::Context`].
///
/// # Examples
///
/// ```rust
/// use unleash_client::Value;
///
/// let args = [Value::from("tenant-1"), Value::from(42)];
/// assert_eq!(args[1].as_int(), Some(42));
/// ```
#[derive(PartialEq, Debug, Clone)]
pub enum Value {
    /// A bool argument.
    Bool(bool),
    /// A whole number argument.
    Int(i64),
    /// A decimal number argument.
    Float(f64),
    /// A text argument.
    String(String),
}

impl Value {
    /// Reads the value as `bool`. Returns [`None`] if it's not a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(val) = self {
            return Some(*val);
        }
        None
    }

    /// Reads the value as `i64`. Returns [`None`] if it's not a [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        if let Value::Int(val) = self {
            return Some(*val);
        }
        None
    }

    /// Reads the value as `f64`. Returns [`None`] if it's not a [`Value::Float`].
    pub fn as_float(&self) -> Option<f64> {
        if let Value::Float(val) = self {
            return Some(*val);
        }
        None
    }

    /// Reads the value as `&str`. Returns [`None`] if it's not a [`Value::String`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::Value;
    ///
    /// let value = Value::String("foo".to_owned());
    /// assert_eq!(value.as_str(), Some("foo"));
    /// ```
    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(val) = self {
            return Some(val.as_str());
        }
        None
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(val) => write!(f, "{val}"),
            Value::Int(val) => write!(f, "{val}"),
            Value::Float(val) => write!(f, "{val}"),
            Value::String(val) => f.write_str(val),
        }
    }
}

from_val_to_enum!(Value Bool bool);
from_val_to_enum!(Value String String);
from_val_to_enum_into!(Value String &str);
from_val_to_enum_into!(Value Float f64 f32);
from_val_to_enum_into!(Value Int i8 i16 i32 i64 u8 u16 u32);
