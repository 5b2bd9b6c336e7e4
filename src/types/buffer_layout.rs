use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{DataType, SlotInfo};

/// Ordered, named slots of an aggregate buffer.
///
/// Declaration order fixes the physical position of each slot: slot `i` of
/// every expression set computes the new value of the `i`-th entry here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferLayout {
    /// Map of slot name -> slot metadata
    pub slots: IndexMap<String, SlotInfo>,
}

impl BufferLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slot. Returns `false` (and leaves the layout untouched) when
    /// the name is already taken.
    pub fn push(&mut self, name: &str, info: SlotInfo) -> bool {
        if self.slots.contains_key(name) {
            return false;
        }
        self.slots.insert(name.to_string(), info);
        true
    }

    pub fn get(&self, name: &str) -> Option<&SlotInfo> {
        self.slots.get(name)
    }

    /// Position and metadata of a slot by name.
    pub fn resolve(&self, name: &str) -> Option<(usize, &SlotInfo)> {
        self.slots.get_full(name).map(|(idx, _, info)| (idx, info))
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.slots.get_index(index).map(|(name, _)| name.as_str())
    }

    pub fn info_at(&self, index: usize) -> Option<&SlotInfo> {
        self.slots.get_index(index).map(|(_, info)| info)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SlotInfo)> {
        self.slots.iter().map(|(name, info)| (name.as_str(), info))
    }

    pub fn types(&self) -> Vec<DataType> {
        self.slots.values().map(|info| info.ty).collect()
    }
}
