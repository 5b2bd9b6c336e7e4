use crate::{
    aggregate::{AggregateBuffer, AggregateDescriptor},
    config::EvalConfig,
    error::EvaluationError,
    executor::{AggEvent, RowKind},
    expression::{ExprSet, Frame},
    types::Value,
};

/// Applies descriptor expression sets to buffers.
///
/// Holds nothing but its configuration, so one instance can be copied into
/// every worker. Buffers are borrowed mutably per call: a buffer has a single
/// writer, while descriptors are only ever read.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    config: EvalConfig,
}

impl Evaluator {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Fresh buffer for `descriptor`, already initialized.
    pub fn create_buffer(&self, descriptor: &AggregateDescriptor) -> Result<AggregateBuffer, EvaluationError> {
        let mut buffer = AggregateBuffer::uninitialized();
        self.apply(descriptor, &mut buffer, AggEvent::Init)?;
        Ok(buffer)
    }

    /// Run the expression set selected by `event` against `buffer`.
    ///
    /// Every slot is computed from the buffer as it was before the event and
    /// checked against the layout before anything is written. On error the
    /// buffer is left exactly as it was.
    pub fn apply(
        &self,
        descriptor: &AggregateDescriptor,
        buffer: &mut AggregateBuffer,
        event: AggEvent,
    ) -> Result<(), EvaluationError> {
        match self.next_values(descriptor, buffer, event) {
            Ok(values) => {
                tracing::trace!(aggregate = %descriptor.signature(), event = event.kind(), ?values, "applied");
                buffer.commit(values);
                Ok(())
            }
            Err(e) => {
                tracing::debug!(aggregate = %descriptor.signature(), event = event.kind(), error = %e, "event rejected");
                Err(e)
            }
        }
    }

    /// Apply one changelog row: inserts and update-afters accumulate,
    /// deletes and update-befores retract.
    pub fn apply_changelog(
        &self,
        descriptor: &AggregateDescriptor,
        buffer: &mut AggregateBuffer,
        kind: RowKind,
        operands: &[Value],
    ) -> Result<(), EvaluationError> {
        self.apply(descriptor, buffer, AggEvent::from_row_kind(kind, operands))
    }

    /// Final result of `buffer`. Never mutates it, so it may be called any
    /// number of times between events.
    pub fn project(&self, descriptor: &AggregateDescriptor, buffer: &AggregateBuffer) -> Result<Value, EvaluationError> {
        check_buffer(descriptor, buffer)?;
        let frame = Frame::buffer_only(buffer.values(), self.config.overflow);
        let value = descriptor.compiled_finalize().evaluate(&frame)?;
        if value.is_null() && !descriptor.result_nullable() {
            return Err(EvaluationError::NullResult(descriptor.name().to_string()));
        }
        Ok(value)
    }

    fn next_values(
        &self,
        descriptor: &AggregateDescriptor,
        buffer: &AggregateBuffer,
        event: AggEvent,
    ) -> Result<Vec<Value>, EvaluationError> {
        let overflow = self.config.overflow;
        let (set, frame) = match event {
            AggEvent::Init => return Ok(descriptor.initial_values().to_vec()),
            AggEvent::Accumulate(operands) | AggEvent::Retract(operands) => {
                check_buffer(descriptor, buffer)?;
                check_operands(descriptor, operands)?;
                let frame = Frame::row(buffer.values(), operands, overflow);
                if matches!(event, AggEvent::Accumulate(_)) {
                    (ExprSet::Accumulate, frame)
                } else {
                    check_retract_guard(descriptor, &frame, operands)?;
                    (ExprSet::Retract, frame)
                }
            }
            AggEvent::Merge(other) => {
                check_buffer(descriptor, buffer)?;
                check_buffer(descriptor, other)?;
                (ExprSet::Merge, Frame::merge(buffer.values(), other.values(), overflow))
            }
        };

        let values = descriptor.compiled(set)
            .iter()
            .map(|expr| expr.evaluate(&frame))
            .collect::<Result<Vec<_>, _>>()?;

        for (value, (slot, info)) in values.iter().zip(descriptor.buffer_slots().iter()) {
            if info.admits(value) {
                continue;
            }
            return Err(if value.is_null() {
                EvaluationError::NullInNonNullableSlot(slot.to_string())
            } else {
                EvaluationError::TypeMismatch { expected: info.ty, got: value.clone() }
            });
        }
        Ok(values)
    }
}

fn check_buffer(descriptor: &AggregateDescriptor, buffer: &AggregateBuffer) -> Result<(), EvaluationError> {
    if !buffer.is_initialized() {
        return Err(EvaluationError::UninitializedBuffer);
    }
    let expected = descriptor.buffer_slots().len();
    if buffer.len() != expected {
        return Err(EvaluationError::BufferShape { expected, got: buffer.len() });
    }
    Ok(())
}

fn check_retract_guard(descriptor: &AggregateDescriptor, frame: &Frame, operands: &[Value]) -> Result<(), EvaluationError> {
    let Some(guard) = descriptor.compiled_retract_guard() else { return Ok(()) };
    if guard.evaluate(frame)? == Value::Boolean(true) {
        return Err(EvaluationError::InexactRetraction {
            aggregate: descriptor.name().to_string(),
            row: operands.to_vec(),
        });
    }
    Ok(())
}

fn check_operands(descriptor: &AggregateDescriptor, operands: &[Value]) -> Result<(), EvaluationError> {
    let types = descriptor.operand_types();
    if operands.len() != types.len() {
        return Err(EvaluationError::OperandCount { expected: types.len(), got: operands.len() });
    }
    for (value, ty) in operands.iter().zip(types) {
        if !value.conforms_to(*ty) {
            return Err(EvaluationError::TypeMismatch { expected: *ty, got: value.clone() });
        }
    }
    Ok(())
}
