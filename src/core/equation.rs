//! Named equations
//!
//! An equation pairs a header such as `f`, `f(x, y)`, or `g[i]` with a
//! term tree. The header decides how the equation can be referenced:
//! zero-arity constants cache a scalar, interval equations materialize a
//! point sequence, square-bracket declarations materialize an array over
//! their index intervals, and anything with formals is evaluated fresh
//! per call.

use serde::{Deserialize, Serialize};

use crate::core::document::{EntityId, ValidationIssue};
use crate::core::scope::{EvalContext, Frame};
use crate::core::syntax;
use crate::core::term::{select_point, TermNode};
use crate::error::{BuildError, Cancelled};
use crate::settings::CalcSettings;
use crate::value::CalcValue;

/// What kind of result an equation produces, decided by validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultShape {
    /// Not yet validated
    Pending,
    /// Zero formals: one cacheable scalar
    Constant,
    /// The term is an interval description (directly or through aliases)
    Interval,
    /// Declared with square brackets: a table over index intervals
    Array,
    /// Has formals: evaluated per call, no stored result
    PassThrough,
}

/// A materialized array in row-major order, last index fastest
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayTable {
    pub dims: Vec<usize>,
    pub values: Vec<CalcValue>,
}

impl ArrayTable {
    pub fn get(&self, indices: &[usize]) -> Option<CalcValue> {
        if indices.len() != self.dims.len() {
            return None;
        }
        let mut flat = 0usize;
        for (i, &dim) in indices.iter().zip(&self.dims) {
            if *i >= dim {
                return None;
            }
            flat = flat * dim + i;
        }
        self.values.get(flat).copied()
    }
}

/// Stored calculation output
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResultSlot {
    #[default]
    Empty,
    Scalar(CalcValue),
    Points(Vec<f64>),
    Table(ArrayTable),
}

#[derive(Debug, Clone)]
pub struct Equation {
    pub(crate) name: String,
    pub(crate) formals: Vec<String>,
    pub(crate) array_declared: bool,
    pub(crate) unit: Option<String>,
    pub(crate) term: TermNode,
    pub(crate) disabled: bool,
    pub(crate) shape: ResultShape,
    pub(crate) result: ResultSlot,
    pub(crate) issues: Vec<ValidationIssue>,
    /// For arrays: the interval equation backing each formal, in order
    pub(crate) formal_intervals: Vec<EntityId>,
}

impl Equation {
    /// Build an equation from a header and a term tree. The header names
    /// the equation and its formals; square brackets declare an array.
    pub fn new(header: &str, term: TermNode) -> Result<Equation, BuildError> {
        let parsed = syntax::parse_header(header)?;
        Ok(Equation {
            name: parsed.name,
            formals: parsed.args,
            array_declared: parsed.array,
            unit: None,
            term,
            disabled: false,
            shape: ResultShape::Pending,
            result: ResultSlot::Empty,
            issues: Vec::new(),
            formal_intervals: Vec::new(),
        })
    }

    pub fn with_unit(mut self, symbol: impl Into<String>) -> Equation {
        self.unit = Some(symbol.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formals(&self) -> &[String] {
        &self.formals
    }

    pub fn arity(&self) -> usize {
        self.formals.len()
    }

    pub fn is_array_declared(&self) -> bool {
        self.array_declared
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn term(&self) -> &TermNode {
        &self.term
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn shape(&self) -> ResultShape {
        self.shape
    }

    pub fn result(&self) -> &ResultSlot {
        &self.result
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Evaluate a reference with forwarded bindings. Constants answer
    /// from their cached scalar when one is stored; everything else runs
    /// the term inside a fresh scope so caller bindings stay invisible.
    pub(crate) fn call(
        &self,
        values: &[CalcValue],
        ctx: &mut EvalContext<'_>,
    ) -> Result<CalcValue, Cancelled> {
        ctx.check_cancel()?;
        if self.disabled || !self.issues.is_empty() {
            return Ok(CalcValue::NOT_READY);
        }
        // a point sequence has no scalar value
        if self.shape == ResultShape::Interval {
            return Ok(CalcValue::NOT_A_NUMBER);
        }
        if self.shape == ResultShape::Array && values.is_empty() {
            return Ok(CalcValue::NOT_A_NUMBER);
        }
        if values.len() != self.formals.len() {
            return Ok(CalcValue::NOT_READY);
        }
        if self.shape == ResultShape::Constant {
            if let ResultSlot::Scalar(v) = self.result {
                return Ok(v);
            }
        }
        ctx.with_scope(Frame::bind(&self.formals, values), |ctx| {
            self.term.value(ctx)
        })
    }

    /// Evaluate an indexed reference `name[...]`: one selector into an
    /// interval's points, or one selector per dimension into an array
    /// table. Selectors are floored and clamped.
    pub(crate) fn select(
        &self,
        indices: &[f64],
        ctx: &mut EvalContext<'_>,
    ) -> Result<CalcValue, Cancelled> {
        ctx.check_cancel()?;
        if self.disabled || !self.issues.is_empty() {
            return Ok(CalcValue::NOT_READY);
        }
        match self.shape {
            ResultShape::Interval => {
                if indices.len() != 1 {
                    return Ok(CalcValue::NOT_A_NUMBER);
                }
                match self.interval_points(ctx)? {
                    Some(points) => Ok(select_point(&points, indices[0])),
                    None => Ok(CalcValue::NOT_A_NUMBER),
                }
            }
            ResultShape::Array => {
                let ResultSlot::Table(table) = &self.result else {
                    // not materialized yet in this batch
                    return Ok(CalcValue::NOT_READY);
                };
                if indices.len() != table.dims.len() {
                    return Ok(CalcValue::NOT_A_NUMBER);
                }
                let mut fixed = Vec::with_capacity(indices.len());
                for (&sel, &dim) in indices.iter().zip(&table.dims) {
                    if !sel.is_finite() || dim == 0 {
                        return Ok(CalcValue::NOT_A_NUMBER);
                    }
                    fixed.push((sel.floor().max(0.0) as usize).min(dim - 1));
                }
                Ok(table.get(&fixed).unwrap_or(CalcValue::NOT_A_NUMBER))
            }
            _ => Ok(CalcValue::NOT_A_NUMBER),
        }
    }

    /// The point sequence this equation stands for, if any: a cached
    /// batch result, a direct interval term, or an alias chain ending in
    /// one. Bounds run in a fresh scope.
    pub(crate) fn interval_points(
        &self,
        ctx: &mut EvalContext<'_>,
    ) -> Result<Option<Vec<f64>>, Cancelled> {
        if self.disabled || !self.issues.is_empty() {
            return Ok(None);
        }
        if let ResultSlot::Points(points) = &self.result {
            return Ok(Some(points.clone()));
        }
        ctx.with_scope(Frame::bind(&[], &[]), |ctx| match &self.term {
            TermNode::Interval(node) => node.points(ctx),
            other => other.interval_points(ctx),
        })
    }

    /// Produce this equation's stored result for a batch run
    pub(crate) fn compute_slot(
        &self,
        ctx: &mut EvalContext<'_>,
    ) -> Result<ResultSlot, Cancelled> {
        if !self.issues.is_empty() {
            return Ok(ResultSlot::Empty);
        }
        match self.shape {
            ResultShape::Constant => {
                let v = ctx.with_scope(Frame::bind(&[], &[]), |ctx| self.term.value(ctx))?;
                Ok(ResultSlot::Scalar(v))
            }
            ResultShape::Interval => Ok(match self.interval_points(ctx)? {
                Some(points) => ResultSlot::Points(points),
                None => ResultSlot::Empty,
            }),
            ResultShape::Array => self.materialize(ctx),
            _ => Ok(ResultSlot::Empty),
        }
    }

    /// Walk the cartesian product of the index intervals and evaluate
    /// the body once per grid point, last index fastest
    fn materialize(&self, ctx: &mut EvalContext<'_>) -> Result<ResultSlot, Cancelled> {
        let mut axes: Vec<Vec<f64>> = Vec::with_capacity(self.formal_intervals.len());
        for &interval_id in &self.formal_intervals {
            match ctx.document().entity(interval_id).interval_points(ctx)? {
                Some(points) if !points.is_empty() => axes.push(points),
                _ => return Ok(ResultSlot::Empty),
            }
        }
        if axes.is_empty() {
            return Ok(ResultSlot::Empty);
        }
        let dims: Vec<usize> = axes.iter().map(|a| a.len()).collect();
        let total = match dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d)) {
            Some(n) => n,
            None => return Ok(ResultSlot::Empty),
        };
        if total > ctx.settings().max_array_points {
            tracing::warn!(
                name = %self.name,
                points = total,
                limit = ctx.settings().max_array_points,
                "array too large to materialize"
            );
            return Ok(ResultSlot::Empty);
        }

        let mut values = Vec::with_capacity(total);
        let mut odometer = vec![0usize; dims.len()];
        'grid: loop {
            ctx.check_cancel()?;
            let sample: Vec<CalcValue> = odometer
                .iter()
                .zip(&axes)
                .map(|(&i, axis)| CalcValue::Real(axis[i]))
                .collect();
            let v = ctx.with_scope(Frame::bind(&self.formals, &sample), |ctx| {
                self.term.value(ctx)
            })?;
            values.push(v);

            let mut axis = dims.len();
            loop {
                if axis == 0 {
                    break 'grid;
                }
                axis -= 1;
                odometer[axis] += 1;
                if odometer[axis] < dims[axis] {
                    continue 'grid;
                }
                odometer[axis] = 0;
            }
        }
        Ok(ResultSlot::Table(ArrayTable { dims, values }))
    }

    /// Human-readable form of the stored result, if there is one
    pub fn result_text(&self, settings: &CalcSettings) -> Option<String> {
        match &self.result {
            ResultSlot::Empty => None,
            ResultSlot::Scalar(v) => Some(v.format_result(settings)),
            ResultSlot::Points(points) => {
                let first = CalcValue::Real(*points.first()?).format_result(settings);
                let last = CalcValue::Real(*points.last()?).format_result(settings);
                Some(format!("[{first} .. {last}] ({} points)", points.len()))
            }
            ResultSlot::Table(table) => {
                let dims = table
                    .dims
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("×");
                Some(format!("{dims} array"))
            }
        }
    }
}
