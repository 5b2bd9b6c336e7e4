use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{aggregate::AggregateBuffer, types::Value};

/// One step of a buffer's lifecycle, selecting which expression set runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggEvent<'a> {
    /// Reset the buffer to the descriptor's initial values.
    Init,
    /// Fold one row's operands into the buffer.
    Accumulate(&'a [Value]),
    /// Take one previously accumulated row back out.
    Retract(&'a [Value]),
    /// Combine another partial buffer of the same descriptor into this one.
    Merge(&'a AggregateBuffer),
}

impl<'a> AggEvent<'a> {
    /// Event for a changelog row: inserts and update-afters accumulate,
    /// deletes and update-befores retract.
    pub fn from_row_kind(kind: RowKind, operands: &'a [Value]) -> Self {
        if kind.is_retraction() {
            AggEvent::Retract(operands)
        } else {
            AggEvent::Accumulate(operands)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AggEvent::Init => "init",
            AggEvent::Accumulate(_) => "accumulate",
            AggEvent::Retract(_) => "retract",
            AggEvent::Merge(_) => "merge",
        }
    }
}

/// Change tag carried by a streaming row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowKind {
    Insert,
    Delete,
    UpdateBefore,
    UpdateAfter,
}

impl RowKind {
    pub fn is_retraction(&self) -> bool {
        matches!(self, RowKind::Delete | RowKind::UpdateBefore)
    }

    pub fn short_string(&self) -> &'static str {
        match self {
            RowKind::Insert => "+I",
            RowKind::Delete => "-D",
            RowKind::UpdateBefore => "-U",
            RowKind::UpdateAfter => "+U",
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_string())
    }
}
