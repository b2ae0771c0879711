//! Differentiation
//!
//! Every node grades how it can be differentiated with respect to a
//! variable. The grade of a composite is the weakest grade among its
//! parts, so one numeric link degrades a whole subtree to probing and
//! one step function kills it entirely. `derivative` then dispatches on
//! the grade: independent subtrees contribute zero, analytic ones use
//! chain rules, numeric ones are probed by central difference.

use crate::core::scope::EvalContext;
use crate::core::term::{
    Builtin, LeafBinding, OperatorKind, SeriesBounds, TermNode,
};
use crate::error::Cancelled;
use crate::value::CalcValue;

/// How a term can be differentiated, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiffGrade {
    /// No usable slope: steps, corners, random draws
    None,
    /// Value depends on the variable but only probing works
    Numerical,
    /// A chain rule exists all the way down
    Analytical,
    /// The value does not depend on the variable at all
    Independent,
}

fn independent_or_none(grades: &[DiffGrade]) -> DiffGrade {
    if grades.iter().all(|g| *g == DiffGrade::Independent) {
        DiffGrade::Independent
    } else {
        DiffGrade::None
    }
}

fn function_grade(func: Builtin, args: &[TermNode], var: &str) -> DiffGrade {
    let grades: Vec<DiffGrade> = args.iter().map(|a| a.diff_grade(var)).collect();
    match func {
        Builtin::Sin
        | Builtin::Cos
        | Builtin::Tan
        | Builtin::Asin
        | Builtin::Acos
        | Builtin::Atan
        | Builtin::Sinh
        | Builtin::Cosh
        | Builtin::Tanh
        | Builtin::Exp
        | Builtin::Ln
        | Builtin::Log10
        | Builtin::Sqrt
        | Builtin::Abs
        | Builtin::Re
        | Builtin::Im => grades[0],
        Builtin::Hypot => grades[0].min(grades[1]),
        // the root degree must be a constant for the chain rule to apply
        Builtin::NthRoot => {
            if grades[1] == DiffGrade::Independent {
                grades[0]
            } else {
                DiffGrade::None
            }
        }
        Builtin::Ceil
        | Builtin::Floor
        | Builtin::Signum
        | Builtin::Factorial
        | Builtin::Random
        | Builtin::Max
        | Builtin::Min
        | Builtin::Atan2
        | Builtin::Conj
        | Builtin::If => independent_or_none(&grades),
    }
}

impl TermNode {
    pub fn diff_grade(&self, var: &str) -> DiffGrade {
        match self {
            TermNode::Leaf(leaf) => match &leaf.binding {
                LeafBinding::Argument(name) if name == var => DiffGrade::Analytical,
                LeafBinding::Pending | LeafBinding::Unresolved => DiffGrade::None,
                _ => DiffGrade::Independent,
            },
            TermNode::Operator { left, right, .. } => {
                left.diff_grade(var).min(right.diff_grade(var))
            }
            TermNode::Comparator { left, right, .. } => {
                independent_or_none(&[left.diff_grade(var), right.diff_grade(var)])
            }
            TermNode::Function { func, args } => function_grade(*func, args, var),
            TermNode::Link(link) => {
                let grades: Vec<DiffGrade> =
                    link.args.iter().map(|a| a.diff_grade(var)).collect();
                if link.indexed {
                    independent_or_none(&grades)
                } else if grades.iter().all(|g| *g == DiffGrade::Independent) {
                    DiffGrade::Independent
                } else {
                    // the linked body is opaque here; probing still works
                    DiffGrade::Numerical
                }
            }
            TermNode::Interval(node) => independent_or_none(&[
                node.min.diff_grade(var),
                node.next.diff_grade(var),
                node.max.diff_grade(var),
            ]),
            TermNode::Series(node) => {
                let mut grades = match &node.bounds {
                    SeriesBounds::Range { min, max } => {
                        vec![min.diff_grade(var), max.diff_grade(var)]
                    }
                    SeriesBounds::Source(source) => vec![source.diff_grade(var)],
                };
                // the index shadows an outer variable of the same name
                grades.push(if node.index == var {
                    DiffGrade::Independent
                } else {
                    node.body.diff_grade(var)
                });
                independent_or_none(&grades)
            }
            TermNode::Derivative(node) => {
                if node.var == var {
                    // its point tracks the variable through the holder chain
                    return DiffGrade::Numerical;
                }
                match node.body.diff_grade(var) {
                    DiffGrade::Independent => DiffGrade::Independent,
                    _ => DiffGrade::Numerical,
                }
            }
        }
    }

    /// d(self)/d(var) at the variable's current value in `ctx`
    pub fn derivative(
        &self,
        var: &str,
        ctx: &mut EvalContext<'_>,
    ) -> Result<CalcValue, Cancelled> {
        ctx.check_cancel()?;
        match self.diff_grade(var) {
            DiffGrade::Independent => return Ok(CalcValue::Real(0.0)),
            DiffGrade::None => return Ok(CalcValue::NOT_A_NUMBER),
            _ => {}
        }
        match self {
            // an analytic leaf is the variable itself
            TermNode::Leaf(leaf) => Ok(CalcValue::Real(if leaf.negated { -1.0 } else { 1.0 })),
            TermNode::Operator {
                op, left, right, ..
            } => derive_operator(*op, left, right, var, ctx),
            TermNode::Function { func, args } => derive_function(*func, args, var, ctx),
            TermNode::Link(_) | TermNode::Derivative(_) => self.probe(var, ctx),
            _ => Ok(CalcValue::NOT_A_NUMBER),
        }
    }

    /// Central difference f(x+h) − f(x−h) over 2h against the nearest
    /// binding for `var`, restored afterwards
    fn probe(&self, var: &str, ctx: &mut EvalContext<'_>) -> Result<CalcValue, Cancelled> {
        let Some(current) = ctx.lookup_argument(var) else {
            return Ok(CalcValue::NOT_A_NUMBER);
        };
        let Some(x0) = current.as_real() else {
            return Ok(CalcValue::PASSED_COMPLEX);
        };
        let h = ctx.settings().derivative_step;
        ctx.assign_argument(var, CalcValue::Real(x0 + h));
        let plus = self.value(ctx);
        ctx.assign_argument(var, CalcValue::Real(x0 - h));
        let minus = self.value(ctx);
        ctx.assign_argument(var, current);
        Ok(plus?.subtract(minus?).divide(CalcValue::Real(2.0 * h)))
    }
}

fn derive_operator(
    op: OperatorKind,
    left: &TermNode,
    right: &TermNode,
    var: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<CalcValue, Cancelled> {
    match op {
        OperatorKind::Plus => {
            Ok(left.derivative(var, ctx)?.add(right.derivative(var, ctx)?))
        }
        OperatorKind::Minus => {
            Ok(left.derivative(var, ctx)?.subtract(right.derivative(var, ctx)?))
        }
        OperatorKind::Mult => {
            let f = left.value(ctx)?;
            let g = right.value(ctx)?;
            let fp = left.derivative(var, ctx)?;
            let gp = right.derivative(var, ctx)?;
            Ok(fp.multiply(g).add(f.multiply(gp)))
        }
        OperatorKind::Divide | OperatorKind::DivideSlash => {
            let f = left.value(ctx)?;
            let g = right.value(ctx)?;
            let fp = left.derivative(var, ctx)?;
            let gp = right.derivative(var, ctx)?;
            let num = fp.multiply(g).subtract(f.multiply(gp));
            Ok(num.divide(g.multiply(g)))
        }
        OperatorKind::Power => {
            let f_independent = left.diff_grade(var) == DiffGrade::Independent;
            let g_independent = right.diff_grade(var) == DiffGrade::Independent;
            let f = left.value(ctx)?;
            let g = right.value(ctx)?;
            if g_independent {
                // g · f^(g−1) · f′
                let fp = left.derivative(var, ctx)?;
                let lowered = f.pow(g.subtract(CalcValue::Real(1.0)));
                Ok(g.multiply(lowered).multiply(fp))
            } else if f_independent {
                // f^g · ln f · g′
                let gp = right.derivative(var, ctx)?;
                Ok(f.pow(g).multiply(f.ln()).multiply(gp))
            } else {
                // f^g · (g′ ln f + g f′ / f)
                let fp = left.derivative(var, ctx)?;
                let gp = right.derivative(var, ctx)?;
                let inner = gp.multiply(f.ln()).add(g.multiply(fp).divide(f));
                Ok(f.pow(g).multiply(inner))
            }
        }
    }
}

fn derive_function(
    func: Builtin,
    args: &[TermNode],
    var: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<CalcValue, Cancelled> {
    let a = args[0].value(ctx)?;
    let ap = args[0].derivative(var, ctx)?;
    let one = CalcValue::Real(1.0);
    Ok(match func {
        Builtin::Sin => a.cos().multiply(ap),
        Builtin::Cos => a.sin().negate().multiply(ap),
        Builtin::Tan => {
            let c = a.cos();
            ap.divide(c.multiply(c))
        }
        Builtin::Asin => ap.divide(one.subtract(a.multiply(a)).sqrt()),
        Builtin::Acos => ap.negate().divide(one.subtract(a.multiply(a)).sqrt()),
        Builtin::Atan => ap.divide(one.add(a.multiply(a))),
        Builtin::Sinh => a.cosh().multiply(ap),
        Builtin::Cosh => a.sinh().multiply(ap),
        Builtin::Tanh => {
            let c = a.cosh();
            ap.divide(c.multiply(c))
        }
        Builtin::Exp => a.exp().multiply(ap),
        Builtin::Ln => ap.divide(a),
        Builtin::Log10 => ap.divide(a.multiply(CalcValue::Real(std::f64::consts::LN_10))),
        Builtin::Sqrt => ap.divide(a.sqrt().multiply(CalcValue::Real(2.0))),
        Builtin::Abs => a.signum().multiply(ap),
        Builtin::Re => ap.re_part(),
        Builtin::Im => ap.im_part(),
        Builtin::Hypot => {
            let b = args[1].value(ctx)?;
            let bp = args[1].derivative(var, ctx)?;
            let num = a.multiply(ap).add(b.multiply(bp));
            num.divide(a.hypot(b))
        }
        // f′ / (n · f^((n−1)/n)); the degree is constant by grade
        Builtin::NthRoot => {
            let n = args[1].value(ctx)?;
            let exponent = n.subtract(one).divide(n);
            ap.divide(n.multiply(a.pow(exponent)))
        }
        _ => CalcValue::NOT_A_NUMBER,
    })
}
