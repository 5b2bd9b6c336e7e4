use std::{cmp::Ordering, fmt, str::FromStr};

use ordered_float::OrderedFloat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{error::EvaluationError, types::DataType};

/// A runtime value held in a buffer slot, passed as an operand or produced by
/// an expression.
///
/// Doubles are wrapped in [`OrderedFloat`] so values are totally ordered
/// (NaN sorts above every other double and equals itself) and hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Long(i64),
    Double(OrderedFloat<f64>),
    Boolean(bool),
    Decimal(Decimal),
}

impl Value {
    pub fn double(f: f64) -> Self {
        Value::Double(OrderedFloat(f))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type of a non-null value; `None` for `Null`.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Long(_) => Some(DataType::Long),
            Value::Double(_) => Some(DataType::Double),
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Decimal(_) => Some(DataType::Decimal),
        }
    }

    /// Null conforms to every type; any other value only to its own.
    pub fn conforms_to(&self, ty: DataType) -> bool {
        self.data_type().is_none_or(|t| t == ty)
    }

    /// Additive identity of a numeric type.
    pub fn zero_of(ty: DataType) -> Option<Value> {
        match ty {
            DataType::Long => Some(Value::Long(0)),
            DataType::Double => Some(Value::double(0.0)),
            DataType::Decimal => Some(Value::Decimal(Decimal::ZERO)),
            DataType::Boolean => None,
        }
    }

    /// Three-way comparison of two values of the same type.
    ///
    /// Returns `None` if either side is null or the types differ.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Read a JSON value as `ty`.
    ///
    /// Decimals are accepted either as JSON numbers or as strings, so callers
    /// can carry exact decimals through JSON without float rounding.
    pub fn from_json(json: &serde_json::Value, ty: DataType) -> Result<Value, EvaluationError> {
        use serde_json::Value as Json;

        let mismatch = || EvaluationError::Json { expected: ty, got: json.to_string() };
        match (ty, json) {
            (_, Json::Null) => Ok(Value::Null),
            (DataType::Long, Json::Number(n)) => n.as_i64().map(Value::Long).ok_or_else(mismatch),
            (DataType::Double, Json::Number(n)) => n.as_f64().map(Value::double).ok_or_else(mismatch),
            (DataType::Boolean, Json::Bool(b)) => Ok(Value::Boolean(*b)),
            (DataType::Decimal, Json::Number(n)) => {
                Decimal::from_str(&n.to_string()).map(Value::Decimal).map_err(|_| mismatch())
            }
            (DataType::Decimal, Json::String(s)) => {
                Decimal::from_str(s.trim()).map(Value::Decimal).map_err(|_| mismatch())
            }
            _ => Err(mismatch()),
        }
    }

    /// Render as JSON. Non-finite doubles become `null`; decimals become
    /// strings to keep their exact scale.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Long(i) => Json::Number(serde_json::Number::from(*i)),
            Value::Double(f) => serde_json::Number::from_f64(f.into_inner()).map(Json::Number).unwrap_or(Json::Null),
            Value::Boolean(b) => Json::Bool(*b),
            Value::Decimal(d) => Json::String(d.to_string()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Long(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::double(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Long(i) => write!(f, "{}L", i),
            Value::Double(d) => write!(f, "{:?}", d.into_inner()),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Decimal(d) => write!(f, "{}BD", d),
        }
    }
}
