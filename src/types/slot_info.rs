use serde::{Deserialize, Serialize};

use crate::types::{DataType, Value};

/// Type and nullability of one named buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub ty: DataType,
    pub nullable: bool,
}

impl SlotInfo {
    pub fn new(ty: DataType, nullable: bool) -> Self {
        Self { ty, nullable }
    }

    pub fn non_null(ty: DataType) -> Self {
        Self { ty, nullable: false }
    }

    pub fn nullable(ty: DataType) -> Self {
        Self { ty, nullable: true }
    }

    /// Whether `value` may be stored in a slot described by `self`.
    pub fn admits(&self, value: &Value) -> bool {
        match value.data_type() {
            None => self.nullable,
            Some(ty) => ty == self.ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_checks_type_and_nullability() {
        let count = SlotInfo::non_null(DataType::Long);
        assert!(count.admits(&Value::Long(3)));
        assert!(!count.admits(&Value::Null));
        assert!(!count.admits(&Value::double(3.0)));

        let min = SlotInfo::nullable(DataType::Double);
        assert!(min.admits(&Value::Null));
        assert!(min.admits(&Value::double(1.5)));
        assert!(!min.admits(&Value::Boolean(true)));
    }
}
