use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::{
    aggregate::{AggregateBuffer, AggregateDescriptor, AggregateRegistry},
    config::EvalConfig,
    error::EvaluationError,
    executor::{AggEvent, Evaluator, RowKind},
    expression::{lit_long, null_of, operand, plus, slot},
    types::{DataType, SlotInfo, Value},
};

fn descriptor(name: &str, types: &[DataType]) -> Arc<AggregateDescriptor> {
    AggregateRegistry::builtins().resolve(name, types).unwrap()
}

fn fold(ev: &Evaluator, d: &AggregateDescriptor, rows: &[Value]) -> AggregateBuffer {
    let mut b = ev.create_buffer(d).unwrap();
    for r in rows {
        let operands = [r.clone()];
        ev.apply(d, &mut b, AggEvent::Accumulate(&operands)).unwrap();
    }
    b
}

fn long(i: i64) -> Value { Value::Long(i) }

#[test]
fn count_scenario() {
    let ev = Evaluator::default();
    let d = descriptor("count", &[DataType::Long]);
    let mut b = ev.create_buffer(&d).unwrap();
    assert_eq!(b.values(), &[long(0)]);

    ev.apply(&d, &mut b, AggEvent::Accumulate(&[long(5)])).unwrap();
    assert_eq!(b.values(), &[long(1)]);

    ev.apply(&d, &mut b, AggEvent::Accumulate(&[Value::Null])).unwrap();
    assert_eq!(b.values(), &[long(1)]);

    ev.apply(&d, &mut b, AggEvent::Retract(&[long(5)])).unwrap();
    assert_eq!(b.values(), &[long(0)]);
    assert_eq!(ev.project(&d, &b).unwrap(), long(0));
}

#[test]
fn count_star_counts_every_row() {
    let ev = Evaluator::default();
    let d = descriptor("count", &[]);
    let mut b = ev.create_buffer(&d).unwrap();
    for _ in 0..3 {
        ev.apply(&d, &mut b, AggEvent::Accumulate(&[])).unwrap();
    }
    assert_eq!(ev.project(&d, &b).unwrap(), long(3));
}

#[test]
fn avg_scenario() {
    let ev = Evaluator::default();
    let d = descriptor("avg", &[DataType::Long]);
    let mut b = fold(&ev, &d, &[long(2), long(4), long(6)]);
    assert_eq!(b.to_json(d.buffer_slots()), serde_json::json!({ "sum": 12, "count": 3 }));
    assert_eq!(ev.project(&d, &b).unwrap(), Value::double(4.0));

    ev.apply(&d, &mut b, AggEvent::Retract(&[long(2)])).unwrap();
    assert_eq!(b.values(), &[long(10), long(2)]);
    assert_eq!(ev.project(&d, &b).unwrap(), Value::double(5.0));

    ev.apply(&d, &mut b, AggEvent::Retract(&[long(4)])).unwrap();
    ev.apply(&d, &mut b, AggEvent::Retract(&[long(6)])).unwrap();
    assert_eq!(ev.project(&d, &b).unwrap(), Value::Null);
}

#[test]
fn decimal_avg_stays_decimal() {
    let ev = Evaluator::default();
    let d = descriptor("avg", &[DataType::Decimal]);
    let b = fold(&ev, &d, &[Value::Decimal(Decimal::new(1050, 2)), Value::Decimal(Decimal::new(1450, 2))]);
    assert_eq!(ev.project(&d, &b).unwrap(), Value::Decimal(Decimal::new(1250, 2)));
}

#[test]
fn sum_and_sum0_on_empty_and_all_null_groups() {
    let ev = Evaluator::default();
    let sum = descriptor("sum", &[DataType::Long]);
    let sum0 = descriptor("sum0", &[DataType::Long]);

    let b = fold(&ev, &sum, &[Value::Null, Value::Null]);
    assert_eq!(ev.project(&sum, &b).unwrap(), Value::Null);
    let b = fold(&ev, &sum0, &[Value::Null]);
    assert_eq!(ev.project(&sum0, &b).unwrap(), long(0));

    let b = fold(&ev, &sum, &[long(3), Value::Null, long(-1)]);
    assert_eq!(ev.project(&sum, &b).unwrap(), long(2));
}

#[test]
fn min_max_track_extremes() {
    let ev = Evaluator::default();
    let min = descriptor("min", &[DataType::Double]);
    let max = descriptor("max", &[DataType::Double]);
    let rows = [Value::double(3.5), Value::Null, Value::double(-1.0), Value::double(f64::NAN), Value::double(2.0)];

    assert_eq!(ev.project(&min, &fold(&ev, &min, &rows)).unwrap(), Value::double(-1.0));
    // NaN orders above every other double
    assert_eq!(ev.project(&max, &fold(&ev, &max, &rows)).unwrap(), Value::double(f64::NAN));

    let booleans = descriptor("min", &[DataType::Boolean]);
    let b = fold(&ev, &booleans, &[Value::Boolean(true), Value::Boolean(false)]);
    assert_eq!(ev.project(&booleans, &b).unwrap(), Value::Boolean(false));
}

#[test]
fn min_retracting_the_last_row_empties_the_group() {
    let ev = Evaluator::default();
    let d = descriptor("min", &[DataType::Long]);
    let mut b = fold(&ev, &d, &[long(7), long(3)]);
    ev.apply(&d, &mut b, AggEvent::Retract(&[long(7)])).unwrap();
    assert_eq!(ev.project(&d, &b).unwrap(), long(3));
    ev.apply(&d, &mut b, AggEvent::Retract(&[long(3)])).unwrap();
    assert_eq!(b.values(), d.initial_values());
    assert_eq!(ev.project(&d, &b).unwrap(), Value::Null);
}

#[test]
fn max_refuses_to_retract_its_extreme_while_rows_remain() {
    let ev = Evaluator::default();
    let d = descriptor("max", &[DataType::Long]);
    let mut b = fold(&ev, &d, &[long(3), long(7)]);
    let before = b.clone();

    assert_eq!(
        ev.apply(&d, &mut b, AggEvent::Retract(&[long(7)])).unwrap_err(),
        EvaluationError::InexactRetraction { aggregate: "max".into(), row: vec![long(7)] }
    );
    assert_eq!(b, before);
    assert_eq!(ev.project(&d, &b).unwrap(), long(7));

    // rows below the extreme and null rows still retract
    ev.apply(&d, &mut b, AggEvent::Retract(&[long(3)])).unwrap();
    ev.apply(&d, &mut b, AggEvent::Retract(&[Value::Null])).unwrap();
    assert_eq!(b.values(), &[long(7), long(1)]);
    ev.apply(&d, &mut b, AggEvent::Retract(&[long(7)])).unwrap();
    assert_eq!(b.values(), d.initial_values());
}

#[test]
fn non_finite_doubles_retract_exactly() {
    let ev = Evaluator::default();
    for name in ["sum", "sum0", "avg", "var_pop", "stddev_samp"] {
        let d = descriptor(name, &[DataType::Double]);
        for special in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let init = ev.create_buffer(&d).unwrap();
            let mut b = fold(&ev, &d, &[Value::double(special)]);
            ev.apply(&d, &mut b, AggEvent::Retract(&[Value::double(special)])).unwrap();
            assert_eq!(b, init, "{name}({special})");
        }
    }

    let sum0 = descriptor("sum0", &[DataType::Double]);
    let mut b = fold(&ev, &sum0, &[Value::double(f64::NEG_INFINITY)]);
    ev.apply(&sum0, &mut b, AggEvent::Retract(&[Value::double(f64::NEG_INFINITY)])).unwrap();
    assert_eq!(ev.project(&sum0, &b).unwrap(), Value::double(0.0));
}

#[test]
fn non_finite_doubles_shape_the_result() {
    let ev = Evaluator::default();
    let sum = descriptor("sum", &[DataType::Double]);
    let avg = descriptor("avg", &[DataType::Double]);
    let var = descriptor("var_pop", &[DataType::Double]);
    let (inf, neg_inf, nan) = (Value::double(f64::INFINITY), Value::double(f64::NEG_INFINITY), Value::double(f64::NAN));
    let one = Value::double(1.0);

    assert_eq!(ev.project(&sum, &fold(&ev, &sum, &[one.clone(), inf.clone()])).unwrap(), inf);
    assert_eq!(ev.project(&sum, &fold(&ev, &sum, &[neg_inf.clone(), one.clone()])).unwrap(), neg_inf);
    assert_eq!(ev.project(&sum, &fold(&ev, &sum, &[inf.clone(), neg_inf.clone()])).unwrap(), nan);
    assert_eq!(ev.project(&avg, &fold(&ev, &avg, &[one.clone(), inf.clone()])).unwrap(), inf);
    assert_eq!(ev.project(&var, &fold(&ev, &var, &[one.clone(), inf.clone()])).unwrap(), nan);

    // once the infinity is retracted the group is finite again
    let mut b = fold(&ev, &avg, &[Value::double(2.0), inf.clone(), Value::double(4.0)]);
    ev.apply(&avg, &mut b, AggEvent::Retract(&[inf])).unwrap();
    assert_eq!(ev.project(&avg, &b).unwrap(), Value::double(3.0));

    let mut b = fold(&ev, &sum, &[nan.clone(), Value::double(2.5)]);
    ev.apply(&sum, &mut b, AggEvent::Retract(&[nan])).unwrap();
    assert_eq!(ev.project(&sum, &b).unwrap(), Value::double(2.5));
}

#[test]
fn variance_family() {
    let ev = Evaluator::default();
    let rows: Vec<Value> = [2, 4, 4, 4, 5, 5, 7, 9].into_iter().map(long).collect();

    let project = |name: &str| {
        let d = descriptor(name, &[DataType::Long]);
        ev.project(&d, &fold(&ev, &d, &rows)).unwrap()
    };
    assert_eq!(project("var_pop"), Value::double(4.0));
    assert_eq!(project("stddev_pop"), Value::double(2.0));
    assert_eq!(project("var_samp"), Value::double(32.0 / 7.0));
    assert_eq!(project("stddev_samp"), Value::double((32.0f64 / 7.0).sqrt()));

    let samp = descriptor("var_samp", &[DataType::Long]);
    assert_eq!(ev.project(&samp, &fold(&ev, &samp, &[long(1)])).unwrap(), Value::Null);
    let pop = descriptor("var_pop", &[DataType::Long]);
    assert_eq!(ev.project(&pop, &fold(&ev, &pop, &[long(1)])).unwrap(), Value::double(0.0));
    assert_eq!(ev.project(&pop, &ev.create_buffer(&pop).unwrap()).unwrap(), Value::Null);
}

#[test]
fn overflow_leaves_the_buffer_untouched() {
    let ev = Evaluator::default();
    let d = descriptor("sum", &[DataType::Long]);
    let mut b = fold(&ev, &d, &[long(i64::MAX)]);
    let before = b.clone();

    let err = ev.apply(&d, &mut b, AggEvent::Accumulate(&[long(1)])).unwrap_err();
    assert!(matches!(err, EvaluationError::Overflow { ty: DataType::Long, .. }));
    // the count slot alone would have succeeded
    assert_eq!(b, before);
}

#[test]
fn wrapping_policy_stays_invertible() {
    let ev = Evaluator::new(EvalConfig::wrapping());
    let d = descriptor("sum", &[DataType::Long]);
    let mut b = fold(&ev, &d, &[long(i64::MAX), long(1)]);
    assert_eq!(b.values(), &[long(i64::MIN), long(2)]);
    ev.apply(&d, &mut b, AggEvent::Retract(&[long(1)])).unwrap();
    assert_eq!(ev.project(&d, &b).unwrap(), long(i64::MAX));
}

#[test]
fn rejected_events() {
    let ev = Evaluator::default();
    let d = descriptor("sum", &[DataType::Long]);

    let mut fresh = AggregateBuffer::uninitialized();
    assert_eq!(
        ev.apply(&d, &mut fresh, AggEvent::Accumulate(&[long(1)])).unwrap_err(),
        EvaluationError::UninitializedBuffer
    );
    assert_eq!(ev.project(&d, &fresh).unwrap_err(), EvaluationError::UninitializedBuffer);

    let mut b = ev.create_buffer(&d).unwrap();
    assert_eq!(
        ev.apply(&d, &mut b, AggEvent::Accumulate(&[])).unwrap_err(),
        EvaluationError::OperandCount { expected: 1, got: 0 }
    );
    assert_eq!(
        ev.apply(&d, &mut b, AggEvent::Accumulate(&[Value::double(1.0)])).unwrap_err(),
        EvaluationError::TypeMismatch { expected: DataType::Long, got: Value::double(1.0) }
    );

    let count = descriptor("count", &[DataType::Long]);
    let other = ev.create_buffer(&count).unwrap();
    assert_eq!(
        ev.apply(&d, &mut b, AggEvent::Merge(&other)).unwrap_err(),
        EvaluationError::BufferShape { expected: 2, got: 1 }
    );
    assert_eq!(
        ev.apply(&d, &mut b, AggEvent::Merge(&AggregateBuffer::uninitialized())).unwrap_err(),
        EvaluationError::UninitializedBuffer
    );
    assert_eq!(b.values(), d.initial_values());
}

#[test]
fn slot_and_result_nullability_are_enforced() {
    let ev = Evaluator::default();
    // writes the operand straight into a non-nullable slot
    let d = AggregateDescriptor::builder("last", DataType::Long)
        .operands(&[DataType::Long])
        .slot("last", SlotInfo::non_null(DataType::Long))
        .non_null_result()
        .init(vec![lit_long(0)])
        .accumulate(vec![operand(0)])
        .retract(vec![slot("last")])
        .merge(vec![plus(slot("last"), lit_long(0))])
        .finalize(slot("last"))
        .build()
        .unwrap();
    let mut b = ev.create_buffer(&d).unwrap();
    assert_eq!(
        ev.apply(&d, &mut b, AggEvent::Accumulate(&[Value::Null])).unwrap_err(),
        EvaluationError::NullInNonNullableSlot("last".into())
    );

    let never = AggregateDescriptor::builder("never", DataType::Long)
        .non_null_result()
        .finalize(null_of(DataType::Long))
        .build()
        .unwrap();
    let b = ev.create_buffer(&never).unwrap();
    assert_eq!(ev.project(&never, &b).unwrap_err(), EvaluationError::NullResult("never".into()));
}

#[test]
fn changelog_rows() {
    let ev = Evaluator::default();
    let d = descriptor("sum", &[DataType::Long]);
    let mut b = ev.create_buffer(&d).unwrap();
    let log = [
        (RowKind::Insert, 10),
        (RowKind::Insert, 5),
        (RowKind::UpdateBefore, 5),
        (RowKind::UpdateAfter, 7),
        (RowKind::Delete, 10),
    ];
    for (kind, v) in log {
        ev.apply_changelog(&d, &mut b, kind, &[long(v)]).unwrap();
    }
    assert_eq!(ev.project(&d, &b).unwrap(), long(7));
}

#[test]
fn init_resets_an_active_buffer() {
    let ev = Evaluator::default();
    let d = descriptor("count", &[]);
    let mut b = ev.create_buffer(&d).unwrap();
    ev.apply(&d, &mut b, AggEvent::Accumulate(&[])).unwrap();
    ev.apply(&d, &mut b, AggEvent::Init).unwrap();
    assert_eq!(ev.project(&d, &b).unwrap(), long(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn partitions_merge_on_worker_tasks() {
    let ev = Evaluator::default();
    let rows: Vec<i64> = (1..=1000).collect();

    for name in ["count", "sum", "avg", "max", "var_pop"] {
        let d = descriptor(name, &[DataType::Long]);
        let handles: Vec<_> = rows
            .chunks(137)
            .map(|chunk| {
                let d = Arc::clone(&d);
                let chunk: Vec<Value> = chunk.iter().copied().map(long).collect();
                tokio::spawn(async move { fold(&ev, &d, &chunk) })
            })
            .collect();

        let mut total = ev.create_buffer(&d).unwrap();
        for h in handles {
            let partial = h.await.unwrap();
            ev.apply(&d, &mut total, AggEvent::Merge(&partial)).unwrap();
        }

        let all: Vec<Value> = rows.iter().copied().map(long).collect();
        let sequential = fold(&ev, &d, &all);
        assert_eq!(ev.project(&d, &total).unwrap(), ev.project(&d, &sequential).unwrap(), "{name}");
    }
}

fn arb_value(ty: DataType) -> BoxedStrategy<Value> {
    let non_null = match ty {
        DataType::Long => (-1_000_000i64..1_000_000).prop_map(Value::Long).boxed(),
        DataType::Double => prop_oneof![
            8 => (-1.0e6f64..1.0e6).prop_map(Value::double),
            1 => Just(Value::double(f64::NAN)),
            1 => Just(Value::double(f64::INFINITY)),
            1 => Just(Value::double(f64::NEG_INFINITY)),
        ]
        .boxed(),
        DataType::Boolean => any::<bool>().prop_map(Value::Boolean).boxed(),
        DataType::Decimal => (-1_000_000i64..1_000_000, 0u32..4)
            .prop_map(|(m, s)| Value::Decimal(Decimal::new(m, s)))
            .boxed(),
    };
    prop_oneof![1 => Just(Value::Null), 4 => non_null].boxed()
}

/// Every built-in descriptor together with two rows of its operand types.
fn arb_case() -> impl Strategy<Value = (Arc<AggregateDescriptor>, Vec<Value>, Vec<Value>)> {
    let registry = AggregateRegistry::builtins();
    let all: Vec<_> = registry
        .list()
        .iter()
        .flat_map(|n| registry.get(n).unwrap_or(&[]).to_vec())
        .collect();
    prop::sample::select(all).prop_flat_map(|d| {
        let row = d.operand_types().iter().map(|t| arb_value(*t)).collect::<Vec<_>>();
        (Just(d), row.clone(), row)
    })
}

fn acc(ev: &Evaluator, d: &AggregateDescriptor, mut b: AggregateBuffer, row: &[Value]) -> AggregateBuffer {
    ev.apply(d, &mut b, AggEvent::Accumulate(row)).unwrap();
    b
}

fn merged(ev: &Evaluator, d: &AggregateDescriptor, mut b: AggregateBuffer, other: &AggregateBuffer) -> AggregateBuffer {
    ev.apply(d, &mut b, AggEvent::Merge(other)).unwrap();
    b
}

proptest! {
    #[test]
    fn retract_undoes_accumulate((d, r, _) in arb_case()) {
        let ev = Evaluator::default();
        let init = ev.create_buffer(&d).unwrap();
        let mut b = acc(&ev, &d, init.clone(), &r);
        ev.apply(&d, &mut b, AggEvent::Retract(&r)).unwrap();
        prop_assert_eq!(b, init);
    }

    #[test]
    fn merge_matches_sequential_accumulation((d, r1, r2) in arb_case()) {
        let ev = Evaluator::default();
        let init = ev.create_buffer(&d).unwrap();
        let b1 = acc(&ev, &d, init.clone(), &r1);
        let b2 = acc(&ev, &d, init.clone(), &r2);
        let sequential = acc(&ev, &d, b1.clone(), &r2);

        let m12 = merged(&ev, &d, b1.clone(), &b2);
        let m21 = merged(&ev, &d, b2.clone(), &b1);
        prop_assert_eq!(ev.project(&d, &m12).unwrap(), ev.project(&d, &sequential).unwrap());
        prop_assert_eq!(ev.project(&d, &m12).unwrap(), ev.project(&d, &m21).unwrap());
    }

    #[test]
    fn merging_an_empty_buffer_is_identity((d, r, _) in arb_case()) {
        let ev = Evaluator::default();
        let init = ev.create_buffer(&d).unwrap();
        let b = acc(&ev, &d, init.clone(), &r);
        prop_assert_eq!(merged(&ev, &d, b.clone(), &init), b);
    }

    #[test]
    fn null_rows_are_skipped(
        name in prop::sample::select(vec!["count", "sum", "min", "max", "avg"]),
        v in -1_000_000i64..1_000_000,
    ) {
        let ev = Evaluator::default();
        let d = descriptor(name, &[DataType::Long]);
        let b = fold(&ev, &d, &[long(v)]);
        prop_assert_eq!(acc(&ev, &d, b.clone(), &[Value::Null]), b);
    }

    #[test]
    fn count_is_never_null(rows in prop::collection::vec(arb_value(DataType::Boolean), 0..8)) {
        let ev = Evaluator::default();
        let d = descriptor("count", &[DataType::Boolean]);
        let expected = rows.iter().filter(|v| !v.is_null()).count() as i64;
        prop_assert_eq!(ev.project(&d, &fold(&ev, &d, &rows)).unwrap(), long(expected));
    }
}
