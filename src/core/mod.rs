//! Core formula engine: terms, equations, documents, and batch runs

pub mod document;
pub mod equation;
pub mod scheduler;
pub mod scope;
pub mod syntax;
pub mod term;

pub use document::{Document, EntityId, IssueKind, ValidationIssue};
pub use equation::{ArrayTable, Equation, ResultShape, ResultSlot};
pub use scheduler::{run_batch, spawn_batch, CalcEvent};
pub use scope::{CancelToken, EvalContext, Frame};
pub use term::{
    Builtin, ComparatorKind, DerivativeNode, DiffGrade, IntervalNode, Leaf, LinkNode,
    OperatorKind, SeriesBounds, SeriesKind, SeriesNode, TermNode,
};
