//! Interval point sequences
//!
//! An interval is described by three terms: the first point, the second
//! point, and an upper bound. The step is `next - min`; points run from
//! `min` in equal steps and the sequence always ends exactly on `max`,
//! with the point count corrected so a step landing just past the bound
//! still closes the sequence instead of dropping the endpoint.

use crate::core::scope::EvalContext;
use crate::core::term::{IntervalNode, TermNode};
use crate::error::Cancelled;
use crate::value::CalcValue;

/// Materialize the points for resolved bounds. Returns `None` when the
/// description is unusable: non-finite bounds, a step that is zero or
/// negative, a second point past the bound, or more points than `cap`.
pub(crate) fn build_points(min: f64, next: f64, max: f64, cap: usize) -> Option<Vec<f64>> {
    if !min.is_finite() || !next.is_finite() || !max.is_finite() {
        return None;
    }
    let delta = next - min;
    if delta <= 0.0 || next > max {
        return None;
    }
    let mut count = ((max - min) / delta).ceil() as i64;
    // a rounded-up count may overshoot by almost a full step; pull the
    // last inner point back in when it lands past max + delta/2
    if count > 0 && min + delta * count as f64 > max + delta / 2.0 {
        count -= 1;
    }
    let count = count.max(0) as usize;
    if count + 1 > cap {
        return None;
    }
    let mut points = Vec::with_capacity(count + 1);
    for i in 0..=count {
        let point = if i == 0 {
            min
        } else if i == count {
            max
        } else {
            min + delta * i as f64
        };
        points.push(point);
    }
    Some(points)
}

impl IntervalNode {
    /// Evaluate the three bounds and build the point sequence. `None`
    /// means one of the bounds is invalid or the description is unusable.
    pub fn points(&self, ctx: &mut EvalContext<'_>) -> Result<Option<Vec<f64>>, Cancelled> {
        let Some(min) = self.min.value(ctx)?.as_real() else {
            return Ok(None);
        };
        let Some(next) = self.next.value(ctx)?.as_real() else {
            return Ok(None);
        };
        let Some(max) = self.max.value(ctx)?.as_real() else {
            return Ok(None);
        };
        let cap = ctx.settings().max_array_points;
        Ok(build_points(min, next, max, cap))
    }
}

/// Select from a materialized point sequence: the selector is floored
/// and clamped into range, so any real selects some point.
pub(crate) fn select_point(points: &[f64], selector: f64) -> CalcValue {
    if points.is_empty() || !selector.is_finite() {
        return CalcValue::NOT_A_NUMBER;
    }
    let last = points.len() - 1;
    let idx = (selector.floor().max(0.0) as usize).min(last);
    CalcValue::Real(points[idx])
}

impl TermNode {
    /// Materialize this term as an interval if it describes one: an
    /// inline interval node, or a reference to an interval equation.
    pub(crate) fn interval_points(
        &self,
        ctx: &mut EvalContext<'_>,
    ) -> Result<Option<Vec<f64>>, Cancelled> {
        use crate::core::term::{Leaf, LeafBinding, LinkNode};
        match self {
            TermNode::Interval(node) => node.points(ctx),
            TermNode::Leaf(Leaf {
                binding: LeafBinding::Equation { target: Some(id) },
                negated: false,
                ..
            }) => ctx.document().entity(*id).interval_points(ctx),
            TermNode::Link(LinkNode {
                target: Some(id),
                indexed: false,
                args,
                ..
            }) if args.is_empty() => ctx.document().entity(*id).interval_points(ctx),
            _ => Ok(None),
        }
    }
}
