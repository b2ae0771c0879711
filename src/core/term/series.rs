//! Series folds
//!
//! Summation, product, and integral nodes iterate the points of an
//! interval, binding their index name for each sample. The index is an
//! argument holder: body references to it bind here, shadowing anything
//! further out. Derivative nodes live here too since they share the
//! holder mechanics.

use crate::core::scope::{EvalContext, Frame};
use crate::core::term::interval::build_points;
use crate::core::term::{
    DerivativeNode, DiffGrade, PointSource, SeriesBounds, SeriesKind, SeriesNode,
};
use crate::error::Cancelled;
use crate::value::CalcValue;

impl SeriesNode {
    /// Materialize the iteration points. Explicit bounds step by one for
    /// sums and products and by the configured integration step for
    /// integrals; an interval source contributes its own points.
    fn points(&self, ctx: &mut EvalContext<'_>) -> Result<Option<Vec<f64>>, Cancelled> {
        match &self.bounds {
            SeriesBounds::Range { min, max } => {
                let Some(a) = min.value(ctx)?.as_real() else {
                    return Ok(None);
                };
                let Some(b) = max.value(ctx)?.as_real() else {
                    return Ok(None);
                };
                if !a.is_finite() || !b.is_finite() {
                    return Ok(None);
                }
                if b == a {
                    return Ok(Some(vec![a]));
                }
                let cap = ctx.settings().max_array_points;
                let step = match self.kind {
                    SeriesKind::Integral => ctx.settings().integral_step.min(b - a),
                    _ => 1.0,
                };
                Ok(build_points(a, a + step, b, cap))
            }
            SeriesBounds::Source(source) => source.interval_points(ctx),
        }
    }

    pub(crate) fn value(&self, ctx: &mut EvalContext<'_>) -> Result<CalcValue, Cancelled> {
        ctx.check_cancel()?;
        let Some(points) = self.points(ctx)? else {
            return Ok(CalcValue::NOT_A_NUMBER);
        };
        match self.kind {
            SeriesKind::Summation => {
                self.fold(&points, CalcValue::Real(0.0), CalcValue::add, ctx)
            }
            SeriesKind::Product => {
                self.fold(&points, CalcValue::Real(1.0), CalcValue::multiply, ctx)
            }
            SeriesKind::Integral => self.integrate(&points, ctx),
        }
    }

    fn fold(
        &self,
        points: &[f64],
        init: CalcValue,
        combine: fn(CalcValue, CalcValue) -> CalcValue,
        ctx: &mut EvalContext<'_>,
    ) -> Result<CalcValue, Cancelled> {
        ctx.with_frame(Frame::single(self.index.clone(), CalcValue::Real(0.0)), |ctx| {
            let mut acc = init;
            for &x in points {
                ctx.check_cancel()?;
                ctx.assign_argument(&self.index, CalcValue::Real(x));
                acc = combine(acc, self.body.value(ctx)?);
                // an invalid sample decides the fold; stop early
                if acc.is_invalid() {
                    break;
                }
            }
            Ok(acc)
        })
    }

    /// Trapezoid rule over consecutive points. The spacing is taken from
    /// the points themselves, so the snapped final step keeps its true
    /// width. A single point integrates to zero.
    fn integrate(
        &self,
        points: &[f64],
        ctx: &mut EvalContext<'_>,
    ) -> Result<CalcValue, Cancelled> {
        ctx.with_frame(Frame::single(self.index.clone(), CalcValue::Real(0.0)), |ctx| {
            let mut samples = Vec::with_capacity(points.len());
            for &x in points {
                ctx.check_cancel()?;
                ctx.assign_argument(&self.index, CalcValue::Real(x));
                let v = self.body.value(ctx)?;
                if v.is_invalid() {
                    return Ok(v);
                }
                samples.push(v);
            }
            let mut acc = CalcValue::Real(0.0);
            for i in 1..points.len() {
                let width = CalcValue::Real(points[i] - points[i - 1]);
                let pair = samples[i - 1].add(samples[i]);
                acc = acc.add(pair.divide(CalcValue::Real(2.0)).multiply(width));
            }
            Ok(acc)
        })
    }
}

impl DerivativeNode {
    /// The value of d(body)/d(var) at the variable's current value. The
    /// point comes from the nearest enclosing holder for `var`, or from
    /// a zero-arity equation of that name when no holder is in scope.
    pub(crate) fn value(&self, ctx: &mut EvalContext<'_>) -> Result<CalcValue, Cancelled> {
        ctx.check_cancel()?;
        let point = match self.point {
            PointSource::Argument => ctx
                .lookup_argument(&self.var)
                .unwrap_or(CalcValue::NOT_READY),
            PointSource::Equation(id) => ctx.document().entity(id).call(&[], ctx)?,
            PointSource::Pending | PointSource::Unresolved => CalcValue::NOT_READY,
        };
        if point.is_invalid() {
            return Ok(point);
        }
        let Some(x0) = point.as_real() else {
            return Ok(CalcValue::PASSED_COMPLEX);
        };
        ctx.with_frame(Frame::single(self.var.clone(), CalcValue::Real(x0)), |ctx| {
            match self.body.diff_grade(&self.var) {
                DiffGrade::Independent => Ok(CalcValue::Real(0.0)),
                DiffGrade::Analytical => self.body.derivative(&self.var, ctx),
                DiffGrade::Numerical => {
                    let h = ctx.settings().derivative_step;
                    ctx.assign_argument(&self.var, CalcValue::Real(x0 + h));
                    let plus = self.body.value(ctx)?;
                    ctx.assign_argument(&self.var, CalcValue::Real(x0 - h));
                    let minus = self.body.value(ctx)?;
                    Ok(plus.subtract(minus).divide(CalcValue::Real(2.0 * h)))
                }
                DiffGrade::None => Ok(CalcValue::NOT_A_NUMBER),
            }
        })
    }
}
