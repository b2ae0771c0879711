//! Batch scheduling
//!
//! A batch walks the document in order and refreshes every stored
//! result: each result-bearing equation is invalidated, skipped if
//! disabled or flagged, and recalculated, with an event emitted at each
//! step so a frontend can repaint as values land. Cancellation stops the
//! batch between samples; results computed before the stop are kept.

use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::core::document::{Document, EntityId};
use crate::core::equation::ResultShape;
use crate::core::scope::CancelToken;
use crate::error::Cancelled;
use crate::report::{BatchSummary, EntityResult};

/// Progress notifications emitted while a batch runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalcEvent {
    BatchStarted { batch: Uuid },
    ResultInvalidated { name: String },
    ResultReady { name: String, text: String },
    BatchFinished { batch: Uuid, cancelled: bool },
}

/// Run one batch over `doc`, calling `on_event` as results are
/// invalidated and refreshed. Validates first when needed. Returns a
/// summary of what was computed; on cancellation the summary says so and
/// the document keeps every result finished before the stop.
pub fn run_batch(
    doc: &mut Document,
    cancel: &CancelToken,
    mut on_event: impl FnMut(CalcEvent),
) -> BatchSummary {
    let batch = Uuid::new_v4();
    let started_at = Utc::now();
    let clock = Instant::now();

    if !doc.is_validated() {
        doc.validate();
    }
    on_event(CalcEvent::BatchStarted { batch });
    tracing::info!(%batch, entities = doc.len(), "batch started");

    let targets: Vec<EntityId> = doc
        .entities()
        .filter(|(_, eq)| {
            matches!(
                eq.shape(),
                ResultShape::Constant | ResultShape::Interval | ResultShape::Array
            )
        })
        .map(|(id, _)| id)
        .collect();

    let mut computed = Vec::new();
    let mut cancelled = false;
    for id in targets {
        if cancel.is_cancelled() {
            tracing::warn!(%batch, "batch cancelled");
            cancelled = true;
            break;
        }
        let name = doc.entity(id).name().to_string();
        on_event(CalcEvent::ResultInvalidated { name: name.clone() });
        doc.invalidate_result(id);

        if doc.entity(id).is_disabled() {
            tracing::debug!(equation = %name, "skipping disabled equation");
            continue;
        }
        if !doc.entity(id).issues().is_empty() {
            tracing::debug!(equation = %name, "skipping flagged equation");
            continue;
        }

        match doc.calculate_entity(id, cancel) {
            Ok(()) => {
                if let Some(text) = doc.entity(id).result_text(&doc.settings) {
                    on_event(CalcEvent::ResultReady {
                        name: name.clone(),
                        text: text.clone(),
                    });
                    computed.push(EntityResult { name, text });
                }
            }
            Err(Cancelled) => {
                tracing::warn!(%batch, equation = %name, "batch cancelled");
                cancelled = true;
                break;
            }
        }
    }

    on_event(CalcEvent::BatchFinished { batch, cancelled });
    let summary = BatchSummary {
        batch: batch.to_string(),
        started_at,
        elapsed_ms: clock.elapsed().as_millis() as u64,
        cancelled,
        computed,
    };
    tracing::info!(
        %batch,
        computed = summary.computed.len(),
        cancelled,
        "batch finished"
    );
    summary
}

/// Run a batch on a background thread. The document moves into the
/// worker and comes back through the join handle with the summary;
/// events arrive on the returned channel as the batch progresses.
pub fn spawn_batch(
    mut doc: Document,
    cancel: CancelToken,
) -> (
    thread::JoinHandle<(Document, BatchSummary)>,
    mpsc::Receiver<CalcEvent>,
) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let summary = run_batch(&mut doc, &cancel, |event| {
            // a dropped receiver only means nobody is watching
            let _ = tx.send(event);
        });
        (doc, summary)
    });
    (handle, rx)
}
