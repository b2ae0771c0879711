//! Batch scheduling: event flow, cancellation, background workers

use pretty_assertions::assert_eq;

use mathsheet::core::{
    run_batch, spawn_batch, CalcEvent, CancelToken, Document, Equation, OperatorKind, ResultSlot,
    SeriesBounds, TermNode,
};
use mathsheet::CalcValue;

fn leaf(text: &str) -> TermNode {
    TermNode::leaf(text).expect("leaf should build")
}

fn constant(header: &str, text: &str) -> Equation {
    Equation::new(header, TermNode::from_text(text).expect("term should build"))
        .expect("header should parse")
}

fn label(event: &CalcEvent) -> String {
    match event {
        CalcEvent::BatchStarted { .. } => "started".to_string(),
        CalcEvent::ResultInvalidated { name } => format!("invalidated {name}"),
        CalcEvent::ResultReady { name, text } => format!("ready {name} = {text}"),
        CalcEvent::BatchFinished { cancelled, .. } => format!("finished cancelled={cancelled}"),
    }
}

#[test]
fn test_batches_emit_events_in_document_order() {
    let mut doc = Document::new();
    doc.push(constant("a", "1"));
    doc.push(
        Equation::new(
            "b",
            TermNode::operator(OperatorKind::Plus, leaf("a"), leaf("1")),
        )
        .expect("header should parse"),
    );

    let mut labels = Vec::new();
    let summary = run_batch(&mut doc, &CancelToken::new(), |event| {
        labels.push(label(&event));
    });

    assert_eq!(
        labels,
        vec![
            "started".to_string(),
            "invalidated a".to_string(),
            "ready a = 1".to_string(),
            "invalidated b".to_string(),
            "ready b = 2".to_string(),
            "finished cancelled=false".to_string(),
        ]
    );
    assert!(!summary.cancelled);
    assert_eq!(summary.computed.len(), 2);
}

#[test]
fn test_pass_through_equations_are_not_batched() {
    let mut doc = Document::new();
    doc.push(constant("a", "1"));
    doc.push(
        Equation::new(
            "f(x)",
            TermNode::operator(OperatorKind::Plus, leaf("x"), leaf("a")),
        )
        .expect("header should parse"),
    );

    let summary = run_batch(&mut doc, &CancelToken::new(), |_| {});
    let names: Vec<&str> = summary.computed.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a"]);
}

#[test]
fn test_disabled_equations_are_invalidated_but_not_computed() {
    let mut doc = Document::new();
    let a = doc.push(constant("a", "1"));
    doc.push(constant("b", "2"));
    doc.validate();
    doc.set_disabled(a, true);

    let mut labels = Vec::new();
    let summary = run_batch(&mut doc, &CancelToken::new(), |event| {
        labels.push(label(&event));
    });

    assert_eq!(
        labels,
        vec![
            "started".to_string(),
            "invalidated a".to_string(),
            "invalidated b".to_string(),
            "ready b = 2".to_string(),
            "finished cancelled=false".to_string(),
        ]
    );
    assert_eq!(summary.computed.len(), 1);
    assert_eq!(doc.entity(a).result(), &ResultSlot::Empty);
}

#[test]
fn test_flagged_equations_are_skipped() {
    let mut doc = Document::new();
    doc.push(constant("broken", "no_such_name"));
    doc.push(constant("fine", "5"));

    let summary = run_batch(&mut doc, &CancelToken::new(), |_| {});
    let names: Vec<&str> = summary.computed.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["fine"]);
    assert_eq!(doc.entity(0).result(), &ResultSlot::Empty);
}

#[test]
fn test_cancellation_keeps_the_finished_prefix() {
    let mut doc = Document::new();
    doc.push(constant("a", "1"));
    doc.push(constant("b", "2"));
    doc.push(constant("c", "3"));
    doc.push(constant("d", "4"));

    let token = CancelToken::new();
    let trigger = token.clone();
    let mut labels = Vec::new();
    let summary = run_batch(&mut doc, &token, |event| {
        if matches!(&event, CalcEvent::ResultReady { name, .. } if name == "b") {
            trigger.cancel();
        }
        labels.push(label(&event));
    });

    assert!(summary.cancelled);
    assert_eq!(summary.computed.len(), 2);
    assert_eq!(
        labels,
        vec![
            "started".to_string(),
            "invalidated a".to_string(),
            "ready a = 1".to_string(),
            "invalidated b".to_string(),
            "ready b = 2".to_string(),
            "finished cancelled=true".to_string(),
        ]
    );

    // finished results stay, the rest were never touched
    assert_eq!(doc.entity(0).result(), &ResultSlot::Scalar(CalcValue::Real(1.0)));
    assert_eq!(doc.entity(1).result(), &ResultSlot::Scalar(CalcValue::Real(2.0)));
    assert_eq!(doc.entity(2).result(), &ResultSlot::Empty);
    assert_eq!(doc.entity(3).result(), &ResultSlot::Empty);
    println!("✓ Cancellation kept the finished prefix");
}

#[test]
fn test_a_cancelled_token_stops_the_batch_before_any_work() {
    let mut doc = Document::new();
    doc.push(constant("a", "1"));
    let token = CancelToken::new();
    token.cancel();

    let summary = run_batch(&mut doc, &token, |_| {});
    assert!(summary.cancelled);
    assert!(summary.computed.is_empty());

    // the same token drives the next batch after a reset
    token.reset();
    let summary = run_batch(&mut doc, &token, |_| {});
    assert!(!summary.cancelled);
    assert_eq!(summary.computed.len(), 1);
}

#[test]
fn test_cancellation_unwinds_ad_hoc_evaluation() {
    let mut doc = Document::new();
    doc.push(
        Equation::new(
            "s",
            TermNode::summation("k", SeriesBounds::range(leaf("1"), leaf("100000")), leaf("k")),
        )
        .expect("header should parse"),
    );
    assert!(doc.validate().is_empty());

    let token = CancelToken::new();
    token.cancel();
    let result = doc.evaluate_by_name("s", &[], &token);
    assert!(result.is_err(), "expected cancellation, got {result:?}");
}

#[test]
fn test_spawn_batch_moves_the_document_and_returns_it() {
    let mut doc = Document::new();
    doc.push(constant("a", "2"));
    doc.push(
        Equation::new(
            "b",
            TermNode::operator(OperatorKind::Mult, leaf("a"), leaf("3")),
        )
        .expect("header should parse"),
    );
    assert!(doc.validate().is_empty());

    let (handle, events) = spawn_batch(doc, CancelToken::new());
    let received: Vec<CalcEvent> = events.iter().collect();
    let (doc, summary) = handle.join().expect("worker should finish");

    assert_eq!(summary.computed.len(), 2);
    assert_eq!(summary.computed[1].text, "6");
    assert_eq!(doc.entity(1).result(), &ResultSlot::Scalar(CalcValue::Real(6.0)));

    // the stream and the summary describe the same batch
    match &received[0] {
        CalcEvent::BatchStarted { batch } => assert_eq!(batch.to_string(), summary.batch),
        other => panic!("expected BatchStarted first, got {other:?}"),
    }
    assert_eq!(received.len(), 6);
}

#[test]
fn test_summaries_serialize_for_frontends() {
    let mut doc = Document::new();
    doc.push(constant("speed", "42"));
    let summary = run_batch(&mut doc, &CancelToken::new(), |_| {});

    let json = summary.to_json().expect("summary should serialize");
    assert!(json.contains("\"speed\""));
    assert!(json.contains("\"cancelled\": false"));
    assert!(!summary.batch.is_empty());
}

#[test]
fn test_batches_are_deterministic_without_random() {
    let mut doc = Document::new();
    doc.push(
        Equation::new("t", TermNode::interval(leaf("0"), leaf("1"), leaf("6"))).expect("header"),
    );
    doc.push(
        Equation::new(
            "s",
            TermNode::summation(
                "k",
                SeriesBounds::source(leaf("t")),
                TermNode::operator(OperatorKind::Mult, leaf("k"), leaf("k")),
            ),
        )
        .expect("header should parse"),
    );
    doc.push(constant("x", "1.5"));
    doc.push(
        Equation::new(
            "slope",
            TermNode::derivative_of(
                "x",
                TermNode::call("sin", vec![leaf("x")]).expect("call should build"),
            ),
        )
        .expect("header should parse"),
    );

    let first = run_batch(&mut doc, &CancelToken::new(), |_| {});
    let second = run_batch(&mut doc, &CancelToken::new(), |_| {});

    let texts = |s: &mathsheet::report::BatchSummary| {
        s.computed
            .iter()
            .map(|r| format!("{} = {}", r.name, r.text))
            .collect::<Vec<_>>()
    };
    assert_eq!(texts(&first), texts(&second));
    assert_eq!(first.computed.len(), 4);
}
