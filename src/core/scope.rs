//! Evaluation context: cancel token, lexical scope chain, document access
//!
//! Argument bindings (equation formals, loop indices) live on an explicit
//! frame stack owned by the context and passed down the term tree. A leaf
//! reference binds to the nearest enclosing frame that declares its name.
//! Entering a linked equation raises the scope base so the callee never
//! sees the caller's frames.

use crate::core::document::Document;
use crate::error::Cancelled;
use crate::settings::CalcSettings;
use crate::value::CalcValue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cooperative-cancellation flag.
///
/// Cloning hands the same flag to another thread; the calculation side
/// polls it between evaluation steps and unwinds with [`Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe from any thread; idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Reset the flag so the token can drive another batch
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One argument holder's bindings: a loop contributes a single index
/// binding, an equation one binding per formal argument.
#[derive(Debug, Clone)]
pub struct Frame {
    bindings: Vec<(String, CalcValue)>,
}

impl Frame {
    pub fn single(name: impl Into<String>, value: CalcValue) -> Self {
        Frame {
            bindings: vec![(name.into(), value)],
        }
    }

    pub fn bind(names: &[String], values: &[CalcValue]) -> Self {
        Frame {
            bindings: names
                .iter()
                .cloned()
                .zip(values.iter().copied())
                .collect(),
        }
    }
}

/// Mutable evaluation state threaded through `TermNode::value` and
/// `TermNode::derivative`
pub struct EvalContext<'a> {
    doc: &'a Document,
    cancel: &'a CancelToken,
    frames: Vec<Frame>,
    scope_base: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(doc: &'a Document, cancel: &'a CancelToken) -> Self {
        EvalContext {
            doc,
            cancel,
            frames: Vec::new(),
            scope_base: 0,
        }
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn settings(&self) -> &'a CalcSettings {
        &self.doc.settings
    }

    pub fn check_cancel(&self) -> Result<(), Cancelled> {
        self.cancel.check()
    }

    /// Nearest visible binding for `name`, innermost frame first
    pub fn lookup_argument(&self, name: &str) -> Option<CalcValue> {
        self.visible_frames()
            .rev()
            .flat_map(|frame| frame.bindings.iter().rev())
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| *value)
    }

    /// Overwrite the nearest visible binding for `name`. Returns false when
    /// no enclosing holder declares it.
    pub fn assign_argument(&mut self, name: &str, value: CalcValue) -> bool {
        let base = self.scope_base;
        for frame in self.frames[base..].iter_mut().rev() {
            for (bound, slot) in frame.bindings.iter_mut().rev() {
                if bound == name {
                    *slot = value;
                    return true;
                }
            }
        }
        false
    }

    /// Run `body` with one extra frame on the chain
    pub fn with_frame<R>(&mut self, frame: Frame, body: impl FnOnce(&mut Self) -> R) -> R {
        self.frames.push(frame);
        let result = body(self);
        self.frames.pop();
        result
    }

    /// Run `body` inside a fresh lexical scope holding only `frame`.
    /// This is the hand-off into a linked equation: its formals are bound,
    /// the caller's frames become invisible, and everything is restored on
    /// the way out.
    pub fn with_scope<R>(&mut self, frame: Frame, body: impl FnOnce(&mut Self) -> R) -> R {
        let saved_base = self.scope_base;
        self.scope_base = self.frames.len();
        self.frames.push(frame);
        let result = body(self);
        self.frames.pop();
        self.scope_base = saved_base;
        result
    }

    fn visible_frames(&self) -> impl DoubleEndedIterator<Item = &Frame> {
        self.frames[self.scope_base..].iter()
    }
}
