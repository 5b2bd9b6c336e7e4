use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    config::OverflowPolicy,
    error::DescriptorError,
    expression::{BindContext, BoundExpr, ExprSet, Expression, Frame},
    types::{BufferLayout, DataType, SlotInfo, Value},
};

/// How faithfully `retract` undoes `accumulate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetractMode {
    /// `retract(accumulate(b, r), r) == b` for every buffer and row.
    Exact,
    /// Exact except when the retracted row holds the current extreme and
    /// other rows remain; the fixed-size buffer cannot recover the runner-up.
    /// Such retractions are refused through the descriptor's retract guard,
    /// and planners must recompute the group instead.
    ExtremaOnly,
}

/// Bound forms of every expression set, resolved once at build time.
#[derive(Debug, Clone)]
struct CompiledSets {
    accumulate: Vec<BoundExpr>,
    retract: Vec<BoundExpr>,
    retract_guard: Option<BoundExpr>,
    merge: Vec<BoundExpr>,
    finalize: BoundExpr,
}

/// Immutable, validated definition of one aggregate function's state algebra.
///
/// A descriptor is a template: it holds no per-group state and is shared
/// read-only (usually behind an `Arc`) by every buffer created from it.
/// It can only be obtained through [`DescriptorBuilder::build`], so every
/// reference, type and set length in it has already been checked.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateDescriptor {
    name: String,
    operand_types: Vec<DataType>,
    layout: BufferLayout,
    result_type: DataType,
    result_nullable: bool,
    retract_mode: RetractMode,
    init: Vec<Expression>,
    accumulate: Vec<Expression>,
    retract: Vec<Expression>,
    retract_guard: Option<Expression>,
    merge: Vec<Expression>,
    finalize: Expression,
    #[serde(skip)]
    initial_values: Vec<Value>,
    #[serde(skip)]
    compiled: CompiledSets,
}

impl AggregateDescriptor {
    pub fn builder(name: &str, result_type: DataType) -> DescriptorBuilder {
        DescriptorBuilder::new(name, result_type)
    }

    /// Canonical lowercase name.
    pub fn name(&self) -> &str { &self.name }
    pub fn operand_count(&self) -> usize { self.operand_types.len() }
    pub fn operand_types(&self) -> &[DataType] { &self.operand_types }
    pub fn buffer_slots(&self) -> &BufferLayout { &self.layout }
    pub fn result_type(&self) -> DataType { self.result_type }
    pub fn result_nullable(&self) -> bool { self.result_nullable }
    pub fn retract_mode(&self) -> RetractMode { self.retract_mode }
    pub fn init_expressions(&self) -> &[Expression] { &self.init }
    pub fn accumulate_expressions(&self) -> &[Expression] { &self.accumulate }
    pub fn retract_expressions(&self) -> &[Expression] { &self.retract }
    pub fn merge_expressions(&self) -> &[Expression] { &self.merge }
    /// Boolean over buffer and operands; a retraction it holds for is refused.
    pub fn retract_guard(&self) -> Option<&Expression> { self.retract_guard.as_ref() }
    pub fn finalize_expression(&self) -> &Expression { &self.finalize }

    /// Values of a freshly initialized buffer (the folded `init` set).
    pub fn initial_values(&self) -> &[Value] { &self.initial_values }

    pub(crate) fn compiled(&self, set: ExprSet) -> &[BoundExpr] {
        match set {
            ExprSet::Accumulate => &self.compiled.accumulate,
            ExprSet::Retract => &self.compiled.retract,
            ExprSet::Merge => &self.compiled.merge,
            ExprSet::Finalize => std::slice::from_ref(&self.compiled.finalize),
            ExprSet::Init | ExprSet::Adhoc => &[],
        }
    }

    pub(crate) fn compiled_finalize(&self) -> &BoundExpr { &self.compiled.finalize }
    pub(crate) fn compiled_retract_guard(&self) -> Option<&BoundExpr> { self.compiled.retract_guard.as_ref() }

    /// Signature used for registry lookups, e.g. `sum(LONG)`.
    pub fn signature(&self) -> String {
        let args = self.operand_types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ");
        format!("{}({})", self.name, args)
    }
}

impl fmt::Display for AggregateDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} -> {}{}", self.signature(), self.result_type, if self.result_nullable { "" } else { " NOT NULL" })?;
        for (name, info) in self.layout.iter() {
            writeln!(f, "  slot {}: {}{}", name, info.ty, if info.nullable { "" } else { " NOT NULL" })?;
        }
        let sets = [
            (ExprSet::Init, &self.init),
            (ExprSet::Accumulate, &self.accumulate),
            (ExprSet::Retract, &self.retract),
            (ExprSet::Merge, &self.merge),
        ];
        for (set, exprs) in sets {
            for ((name, _), expr) in self.layout.iter().zip(exprs.iter()) {
                writeln!(f, "  {} {} = {}", set, name, expr)?;
            }
        }
        if let Some(guard) = &self.retract_guard {
            writeln!(f, "  retract refused when {}", guard)?;
        }
        write!(f, "  finalize = {}", self.finalize)
    }
}

/// Collects the parts of a descriptor; [`build`](Self::build) validates them.
///
/// Deserializable, so user-defined aggregates can be declared in
/// configuration and still go through the same validation as built-ins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorBuilder {
    pub name: String,
    #[serde(default)]
    pub operand_types: Vec<DataType>,
    #[serde(default)]
    pub slots: Vec<(String, SlotInfo)>,
    pub result_type: DataType,
    #[serde(default = "default_nullable")]
    pub result_nullable: bool,
    #[serde(default = "default_retract_mode")]
    pub retract_mode: RetractMode,
    #[serde(default)]
    pub init: Vec<Expression>,
    #[serde(default)]
    pub accumulate: Vec<Expression>,
    #[serde(default)]
    pub retract: Vec<Expression>,
    #[serde(default)]
    pub retract_guard: Option<Expression>,
    #[serde(default)]
    pub merge: Vec<Expression>,
    #[serde(default)]
    pub finalize: Option<Expression>,
}

fn default_nullable() -> bool { true }
fn default_retract_mode() -> RetractMode { RetractMode::Exact }

impl DescriptorBuilder {
    pub fn new(name: &str, result_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            operand_types: Vec::new(),
            slots: Vec::new(),
            result_type,
            result_nullable: true,
            retract_mode: RetractMode::Exact,
            init: Vec::new(),
            accumulate: Vec::new(),
            retract: Vec::new(),
            retract_guard: None,
            merge: Vec::new(),
            finalize: None,
        }
    }

    pub fn operands(mut self, types: &[DataType]) -> Self {
        self.operand_types = types.to_vec();
        self
    }

    pub fn slot(mut self, name: &str, info: SlotInfo) -> Self {
        self.slots.push((name.to_string(), info));
        self
    }

    pub fn non_null_result(mut self) -> Self {
        self.result_nullable = false;
        self
    }

    pub fn retract_mode(mut self, mode: RetractMode) -> Self {
        self.retract_mode = mode;
        self
    }

    pub fn init(mut self, exprs: Vec<Expression>) -> Self {
        self.init = exprs;
        self
    }

    pub fn accumulate(mut self, exprs: Vec<Expression>) -> Self {
        self.accumulate = exprs;
        self
    }

    pub fn retract(mut self, exprs: Vec<Expression>) -> Self {
        self.retract = exprs;
        self
    }

    /// Refuse a retraction whenever `guard` evaluates to true.
    pub fn retract_guard(mut self, guard: Expression) -> Self {
        self.retract_guard = Some(guard);
        self
    }

    pub fn merge(mut self, exprs: Vec<Expression>) -> Self {
        self.merge = exprs;
        self
    }

    pub fn finalize(mut self, expr: Expression) -> Self {
        self.finalize = Some(expr);
        self
    }

    /// Validate every part and produce the immutable descriptor.
    pub fn build(self) -> Result<AggregateDescriptor, DescriptorError> {
        let name = self.name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(DescriptorError::EmptyName);
        }

        let mut layout = BufferLayout::new();
        for (slot, info) in &self.slots {
            if !layout.push(slot, *info) {
                return Err(DescriptorError::DuplicateSlot(slot.clone()));
            }
        }

        let finalize = self.finalize.ok_or(DescriptorError::MissingFinalize)?;

        let init = bind_set(&layout, &self.operand_types, ExprSet::Init, &self.init)?;
        let accumulate = bind_set(&layout, &self.operand_types, ExprSet::Accumulate, &self.accumulate)?;
        let retract = bind_set(&layout, &self.operand_types, ExprSet::Retract, &self.retract)?;
        let merge = bind_set(&layout, &self.operand_types, ExprSet::Merge, &self.merge)?;

        let retract_guard = match &self.retract_guard {
            Some(guard) => {
                let ctx = BindContext::new(&layout, &self.operand_types, ExprSet::Retract);
                let (bound, ty) = guard.bind(&ctx)?;
                if ty != DataType::Boolean {
                    return Err(DescriptorError::ConditionNotBoolean(ty));
                }
                Some(bound)
            }
            None => None,
        };

        let ctx = BindContext::new(&layout, &self.operand_types, ExprSet::Finalize);
        let (bound_finalize, finalize_ty) = finalize.bind(&ctx)?;
        if finalize_ty != self.result_type {
            return Err(DescriptorError::ResultTypeMismatch { declared: self.result_type, got: finalize_ty });
        }

        // init only sees literals, so it folds to constants once here
        let initial_values = fold_init(&layout, &init)?;

        Ok(AggregateDescriptor {
            name,
            operand_types: self.operand_types,
            layout,
            result_type: self.result_type,
            result_nullable: self.result_nullable,
            retract_mode: self.retract_mode,
            init: self.init,
            accumulate: self.accumulate,
            retract: self.retract,
            retract_guard: self.retract_guard,
            merge: self.merge,
            finalize,
            initial_values,
            compiled: CompiledSets { accumulate, retract, retract_guard, merge, finalize: bound_finalize },
        })
    }
}

fn bind_set(
    layout: &BufferLayout,
    operand_types: &[DataType],
    set: ExprSet,
    exprs: &[Expression],
) -> Result<Vec<BoundExpr>, DescriptorError> {
    if exprs.len() != layout.len() {
        return Err(DescriptorError::ExpressionSetLength { set, expected: layout.len(), got: exprs.len() });
    }
    let ctx = BindContext::new(layout, operand_types, set);
    exprs.iter()
        .zip(layout.iter())
        .map(|(expr, (slot, info))| {
            let (bound, ty) = expr.bind(&ctx)?;
            if ty != info.ty {
                return Err(DescriptorError::SlotTypeMismatch { set, slot: slot.to_string(), declared: info.ty, got: ty });
            }
            Ok(bound)
        })
        .collect()
}

fn fold_init(layout: &BufferLayout, init: &[BoundExpr]) -> Result<Vec<Value>, DescriptorError> {
    let frame = Frame::empty(OverflowPolicy::Error);
    init.iter()
        .zip(layout.iter())
        .map(|(expr, (slot, info))| {
            let value = expr.evaluate(&frame)
                .map_err(|e| DescriptorError::InitValue { slot: slot.to_string(), reason: e.to_string() })?;
            if !info.admits(&value) {
                return Err(DescriptorError::InitValue {
                    slot: slot.to_string(),
                    reason: format!("{} does not fit {}", value, info.ty),
                });
            }
            Ok(value)
        })
        .collect()
}
