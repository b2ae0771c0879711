//! End-to-end document tests: construction, validation, calculation

use mathsheet::core::{
    run_batch, CancelToken, Document, Equation, OperatorKind, ResultShape, ResultSlot, TermNode,
};
use mathsheet::{CalcValue, InvalidKind};

fn constant(header: &str, text: &str) -> Equation {
    Equation::new(header, TermNode::from_text(text).expect("term should build"))
        .expect("header should parse")
}

fn equation(header: &str, term: TermNode) -> Equation {
    Equation::new(header, term).expect("header should parse")
}

fn op(kind: OperatorKind, left: TermNode, right: TermNode) -> TermNode {
    TermNode::operator(kind, left, right)
}

fn leaf(text: &str) -> TermNode {
    TermNode::leaf(text).expect("leaf should build")
}

fn eval(doc: &Document, name: &str) -> CalcValue {
    doc.evaluate_by_name(name, &[], &CancelToken::new())
        .expect("evaluation should succeed")
}

// ═══════════════════════════════════════════════════════════════════════════
// SCALAR FLOW
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_constants_chain_and_render() {
    let mut doc = Document::new();
    doc.push(constant("a", "2"));
    doc.push(equation(
        "b",
        op(
            OperatorKind::Plus,
            op(OperatorKind::Mult, leaf("a"), leaf("3")),
            leaf("1"),
        ),
    ));
    assert!(doc.validate().is_empty());
    assert_eq!(eval(&doc, "b"), CalcValue::Real(7.0));

    let summary = run_batch(&mut doc, &CancelToken::new(), |_| {});
    assert_eq!(summary.computed.len(), 2);
    assert_eq!(summary.computed[0].text, "2");
    assert_eq!(summary.computed[1].text, "7");
    println!("✓ Constant chain calculated");
}

#[test]
fn test_function_calls_bind_arguments() {
    let mut doc = Document::new();
    doc.push(constant("k", "3"));
    doc.push(equation("f(x)", op(OperatorKind::Mult, leaf("x"), leaf("k"))));
    assert!(doc.validate().is_empty());

    let cancel = CancelToken::new();
    let six = doc
        .evaluate_by_name("f", &[CalcValue::Real(2.0)], &cancel)
        .expect("call should succeed");
    assert_eq!(six, CalcValue::Real(6.0));

    let scaled = doc
        .evaluate_by_name("f", &[CalcValue::Real(0.5)], &cancel)
        .expect("call should succeed");
    assert_eq!(scaled, CalcValue::Real(1.5));

    // arity mismatch is not an error, just an unready value
    let wrong = doc
        .evaluate_by_name("f", &[], &cancel)
        .expect("call should succeed");
    assert_eq!(wrong, CalcValue::NOT_READY);
}

#[test]
fn test_complex_results_render() {
    let mut doc = Document::new();
    doc.push(constant("c", "sqrt(-4)"));
    doc.push(equation("c2", op(OperatorKind::Mult, leaf("c"), leaf("c"))));
    doc.push(constant("c_im", "im(c)"));
    doc.push(constant("c_abs", "abs(c)"));
    assert!(doc.validate().is_empty());

    assert_eq!(eval(&doc, "c"), CalcValue::complex(0.0, 2.0));
    assert_eq!(eval(&doc, "c_im"), CalcValue::Real(2.0));
    assert_eq!(eval(&doc, "c_abs"), CalcValue::Real(2.0));

    let summary = run_batch(&mut doc, &CancelToken::new(), |_| {});
    assert_eq!(summary.computed[0].text, "2i");
    // the square lands back on the real line
    assert_eq!(summary.computed[1].text, "-4");
}

#[test]
fn test_invalid_values_spread_without_stopping_the_batch() {
    let mut doc = Document::new();
    doc.push(equation("z", op(OperatorKind::DivideSlash, leaf("1"), leaf("0"))));
    doc.push(equation("w", op(OperatorKind::Plus, leaf("z"), leaf("5"))));
    doc.push(constant("ok", "10"));
    assert!(doc.validate().is_empty());

    assert_eq!(eval(&doc, "z"), CalcValue::NOT_A_NUMBER);
    assert_eq!(eval(&doc, "w"), CalcValue::NOT_A_NUMBER);
    assert_eq!(eval(&doc, "w").invalid_kind(), Some(InvalidKind::NotANumber));

    // the batch still computes everything, rendering NaN where needed
    let summary = run_batch(&mut doc, &CancelToken::new(), |_| {});
    assert!(!summary.cancelled);
    assert_eq!(summary.computed.len(), 3);
    assert_eq!(summary.computed[0].text, "NaN");
    assert_eq!(summary.computed[1].text, "NaN");
    assert_eq!(summary.computed[2].text, "10");
}

#[test]
fn test_if_evaluates_only_the_taken_branch() {
    let divide_by_zero = || op(OperatorKind::DivideSlash, leaf("1"), leaf("0"));

    let mut doc = Document::new();
    doc.push(equation(
        "taken",
        TermNode::call("if", vec![leaf("1"), leaf("2"), divide_by_zero()]).expect("if should build"),
    ));
    doc.push(equation(
        "poisoned",
        TermNode::call("if", vec![leaf("0"), leaf("2"), divide_by_zero()]).expect("if should build"),
    ));
    doc.push(equation(
        "complex_cond",
        TermNode::call(
            "if",
            vec![TermNode::from_text("sqrt(-9)").expect("term should build"), leaf("1"), leaf("2")],
        )
        .expect("if should build"),
    ));
    assert!(doc.validate().is_empty());

    assert_eq!(eval(&doc, "taken"), CalcValue::Real(2.0));
    assert_eq!(eval(&doc, "poisoned"), CalcValue::NOT_A_NUMBER);
    assert_eq!(eval(&doc, "complex_cond"), CalcValue::PASSED_COMPLEX);
}

// ═══════════════════════════════════════════════════════════════════════════
// UNIT LITERALS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_unit_literals_rescale_into_the_declared_unit() {
    let mut doc = Document::new();
    // no declared unit: scale to the category's base unit
    doc.push(constant("dist", "5 km"));
    // declared unit: convert into it
    doc.push(constant("pace", "500 m").with_unit("km"));
    assert!(doc.validate().is_empty());

    assert_eq!(eval(&doc, "dist"), CalcValue::Real(5000.0));
    assert_eq!(eval(&doc, "pace"), CalcValue::Real(0.5));
}

#[test]
fn test_unit_mismatches_are_validation_findings() {
    let mut doc = Document::new();
    doc.push(constant("weight", "5 kg").with_unit("m"));
    doc.push(constant("strange", "3 furlong"));

    let issues = doc.validate();
    assert_eq!(issues.len(), 2);
    assert!(issues[0].message.contains("cannot convert 'kg' to 'm'"));
    assert!(issues[1].message.contains("unknown unit 'furlong'"));
    assert_eq!(eval(&doc, "weight"), CalcValue::NOT_READY);
}

// ═══════════════════════════════════════════════════════════════════════════
// INTERVALS AND ARRAYS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_interval_points_and_selection() {
    let mut doc = Document::new();
    doc.push(equation(
        "t",
        TermNode::interval(leaf("0"), leaf("1"), leaf("10")),
    ));
    doc.push(constant("third", "t[3]"));
    assert!(doc.validate().is_empty());
    assert_eq!(doc.entity(0).shape(), ResultShape::Interval);

    // a point sequence has no scalar reading
    assert_eq!(eval(&doc, "t"), CalcValue::NOT_A_NUMBER);
    assert_eq!(eval(&doc, "third"), CalcValue::Real(3.0));

    let summary = run_batch(&mut doc, &CancelToken::new(), |_| {});
    assert_eq!(summary.computed[0].text, "[0 .. 10] (11 points)");
    match doc.entity(0).result() {
        ResultSlot::Points(points) => assert_eq!(points.len(), 11),
        other => panic!("expected points, got {other:?}"),
    }
}

#[test]
fn test_selectors_floor_and_clamp() {
    let mut doc = Document::new();
    doc.push(equation(
        "t",
        TermNode::interval(leaf("0"), leaf("1"), leaf("4")),
    ));
    doc.push(constant("fractional", "t[2.9]"));
    doc.push(constant("below", "t[-7]"));
    doc.push(constant("beyond", "t[99]"));
    assert!(doc.validate().is_empty());

    assert_eq!(eval(&doc, "fractional"), CalcValue::Real(2.0));
    assert_eq!(eval(&doc, "below"), CalcValue::Real(0.0));
    assert_eq!(eval(&doc, "beyond"), CalcValue::Real(4.0));
}

#[test]
fn test_arrays_materialize_over_their_index_intervals() {
    let mut doc = Document::new();
    doc.push(equation(
        "xs",
        TermNode::interval(leaf("0"), leaf("1"), leaf("3")),
    ));
    doc.push(equation("g[xs]", op(OperatorKind::Mult, leaf("xs"), leaf("xs"))));
    doc.push(constant("pick", "g[2]"));
    doc.push(constant("bare", "g"));
    assert!(doc.validate().is_empty());

    let summary = run_batch(&mut doc, &CancelToken::new(), |_| {});
    assert_eq!(summary.computed[1].text, "4 array");

    match doc.entity(1).result() {
        ResultSlot::Table(table) => {
            assert_eq!(table.dims, vec![4]);
            assert_eq!(table.values[3], CalcValue::Real(9.0));
        }
        other => panic!("expected a table, got {other:?}"),
    }
    assert_eq!(eval(&doc, "pick"), CalcValue::Real(4.0));
    // an array has no scalar reading without selectors
    assert_eq!(eval(&doc, "bare"), CalcValue::NOT_A_NUMBER);
    println!("✓ Array materialized and indexed");
}

#[test]
fn test_two_dimensional_arrays_index_row_major() {
    let mut doc = Document::new();
    doc.push(equation(
        "rows",
        TermNode::interval(leaf("0"), leaf("1"), leaf("1")),
    ));
    doc.push(equation(
        "cols",
        TermNode::interval(leaf("0"), leaf("1"), leaf("2")),
    ));
    doc.push(equation(
        "m[rows, cols]",
        op(
            OperatorKind::Plus,
            op(OperatorKind::Mult, leaf("rows"), leaf("10")),
            leaf("cols"),
        ),
    ));
    doc.push(constant("corner", "m[1, 2]"));
    assert!(doc.validate().is_empty());

    let summary = run_batch(&mut doc, &CancelToken::new(), |_| {});
    assert_eq!(summary.computed[2].text, "2×3 array");
    assert_eq!(eval(&doc, "corner"), CalcValue::Real(12.0));
}

// ═══════════════════════════════════════════════════════════════════════════
// EDITS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_edits_drop_dependent_results() {
    let mut doc = Document::new();
    let a = doc.push(constant("a", "2"));
    let b = doc.push(equation("b", op(OperatorKind::Plus, leaf("a"), leaf("1"))));
    assert!(doc.validate().is_empty());
    run_batch(&mut doc, &CancelToken::new(), |_| {});
    assert_eq!(doc.entity(b).result(), &ResultSlot::Scalar(CalcValue::Real(3.0)));

    doc.replace_term(a, leaf("5"));
    assert_eq!(doc.entity(b).result(), &ResultSlot::Empty);
    assert!(!doc.is_validated());

    run_batch(&mut doc, &CancelToken::new(), |_| {});
    assert_eq!(doc.entity(b).result(), &ResultSlot::Scalar(CalcValue::Real(6.0)));
}

#[test]
fn test_disabling_an_equation_unreadies_its_readers() {
    let mut doc = Document::new();
    let a = doc.push(constant("a", "2"));
    doc.push(equation("b", op(OperatorKind::Plus, leaf("a"), leaf("1"))));
    assert!(doc.validate().is_empty());
    run_batch(&mut doc, &CancelToken::new(), |_| {});

    doc.set_disabled(a, true);
    assert!(doc.validate().is_empty());
    assert_eq!(eval(&doc, "b"), CalcValue::NOT_READY);

    let summary = run_batch(&mut doc, &CancelToken::new(), |_| {});
    // a is skipped entirely, b renders as NaN
    assert_eq!(summary.computed.len(), 1);
    assert_eq!(summary.computed[0].name, "b");
    assert_eq!(summary.computed[0].text, "NaN");

    doc.set_disabled(a, false);
    assert!(doc.validate().is_empty());
    assert_eq!(eval(&doc, "b"), CalcValue::Real(3.0));
}

#[test]
fn test_redefinition_binds_readers_by_document_position() {
    let mut doc = Document::new();
    doc.settings.allow_redefinition = true;
    doc.push(constant("x", "1"));
    let early = doc.push(equation("y", op(OperatorKind::Plus, leaf("x"), leaf("1"))));
    assert!(doc.validate().is_empty());
    run_batch(&mut doc, &CancelToken::new(), |_| {});
    assert_eq!(doc.entity(early).result(), &ResultSlot::Scalar(CalcValue::Real(2.0)));

    // a new definition conservatively drops results of the name's readers
    doc.push(constant("x", "10"));
    assert_eq!(doc.entity(early).result(), &ResultSlot::Empty);
    doc.push(equation("z", op(OperatorKind::Plus, leaf("x"), leaf("1"))));
    assert!(doc.validate().is_empty());

    // each reader sees the definition nearest above it
    assert_eq!(eval(&doc, "y"), CalcValue::Real(2.0));
    assert_eq!(eval(&doc, "z"), CalcValue::Real(11.0));
}
