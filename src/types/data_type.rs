use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of value types an aggregate buffer slot, operand or literal can have.
///
/// Nullability is not part of the type: it is tracked per slot
/// (see [`SlotInfo`](crate::types::SlotInfo)) and per descriptor result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer
    Long,
    /// 64-bit float; NaN orders above every other double
    Double,
    /// Boolean
    Boolean,
    /// 96-bit fixed-point decimal
    Decimal,
}

impl DataType {
    /// All types, in declaration order. Used to register per-type built-ins.
    pub const ALL: [DataType; 4] = [DataType::Long, DataType::Double, DataType::Boolean, DataType::Decimal];

    /// Numeric types, in declaration order.
    pub const NUMERIC: [DataType; 3] = [DataType::Long, DataType::Double, DataType::Decimal];

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Long | DataType::Double | DataType::Decimal)
    }

    /// Whether an explicit cast from `self` to `to` is allowed.
    ///
    /// Identity casts are always allowed; otherwise both sides must be numeric.
    pub fn can_cast_to(&self, to: DataType) -> bool {
        *self == to || (self.is_numeric() && to.is_numeric())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Long => write!(f, "LONG"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Decimal => write!(f, "DECIMAL"),
        }
    }
}
