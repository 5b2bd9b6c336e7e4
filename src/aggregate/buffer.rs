use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::types::{BufferLayout, Value};

/// Per-group running state: one value per slot of the descriptor's layout.
///
/// A buffer starts uninitialized and becomes active on the `Init` event.
/// It is owned by exactly one group key; the core never locks it, callers
/// hand out `&mut` to a single writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateBuffer {
    values: Option<Vec<Value>>,
}

impl AggregateBuffer {
    pub fn uninitialized() -> Self {
        Self { values: None }
    }

    /// Active buffer with the given slot values, e.g. restored from a checkpoint.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values: Some(values) }
    }

    pub fn is_initialized(&self) -> bool {
        self.values.is_some()
    }

    /// Slot values; empty while uninitialized.
    pub fn values(&self) -> &[Value] {
        self.values.as_deref().unwrap_or(&[])
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values().get(index)
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    pub fn into_values(self) -> Option<Vec<Value>> {
        self.values
    }

    /// Replace every slot at once.
    pub(crate) fn commit(&mut self, values: Vec<Value>) {
        self.values = Some(values);
    }

    /// Slot name -> JSON value, in layout order. `null` while uninitialized.
    pub fn to_json(&self, layout: &BufferLayout) -> Json {
        let Some(values) = &self.values else { return Json::Null };
        let mut m = Map::new();
        for ((name, _), v) in layout.iter().zip(values.iter()) {
            m.insert(name.to_string(), v.to_json());
        }
        Json::Object(m)
    }
}
