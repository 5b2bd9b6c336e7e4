use std::fmt;

use crate::types::DataType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    UnknownFunction(String),
    /// The name exists, but no registered signature takes `got`.
    TypeMismatch { name: String, got: Vec<DataType>, candidates: Vec<Vec<DataType>> },
    DuplicateSignature { name: String, operand_types: Vec<DataType> },
}

fn signature(types: &[DataType]) -> String {
    types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownFunction(name) => write!(f, "unknown aggregate function `{}`", name),
            RegistryError::TypeMismatch { name, got, candidates } => {
                let candidates = candidates.iter()
                    .map(|c| format!("{}({})", name, signature(c)))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "no signature {}({}); candidates: {}", name, signature(got), candidates)
            }
            RegistryError::DuplicateSignature { name, operand_types } =>
                write!(f, "{}({}) is already registered", name, signature(operand_types)),
        }
    }
}

impl std::error::Error for RegistryError {}
