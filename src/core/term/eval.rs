//! Term evaluation
//!
//! `value` walks the tree and folds it into a single `CalcValue`. The
//! only error is cancellation; every arithmetic failure travels as an
//! invalid value so a formula always produces something displayable.

use crate::core::scope::EvalContext;
use crate::core::term::{
    Builtin, ComparatorKind, LeafBinding, LinkNode, OperatorKind, TermNode,
};
use crate::error::Cancelled;
use crate::value::CalcValue;

impl TermNode {
    pub fn value(&self, ctx: &mut EvalContext<'_>) -> Result<CalcValue, Cancelled> {
        ctx.check_cancel()?;
        match self {
            TermNode::Leaf(leaf) => {
                let v = match &leaf.binding {
                    LeafBinding::Literal(value) => *value,
                    LeafBinding::Argument(name) => ctx
                        .lookup_argument(name)
                        .unwrap_or(CalcValue::NOT_READY),
                    LeafBinding::Equation { target: Some(id) } => {
                        ctx.document().entity(*id).call(&[], ctx)?
                    }
                    LeafBinding::Equation { target: None }
                    | LeafBinding::Pending
                    | LeafBinding::Unresolved => CalcValue::NOT_READY,
                };
                Ok(if leaf.negated { v.negate() } else { v })
            }
            TermNode::Operator {
                op, left, right, ..
            } => {
                let l = left.value(ctx)?;
                let r = right.value(ctx)?;
                Ok(apply_operator(*op, l, r))
            }
            TermNode::Comparator { op, left, right } => {
                let l = left.value(ctx)?;
                let r = right.value(ctx)?;
                Ok(apply_comparator(*op, l, r))
            }
            TermNode::Function { func, args } => apply_function(*func, args, ctx),
            TermNode::Link(link) => link_value(link, ctx),
            // a bare interval has no scalar value
            TermNode::Interval(_) => Ok(CalcValue::NOT_A_NUMBER),
            TermNode::Series(node) => node.value(ctx),
            TermNode::Derivative(node) => node.value(ctx),
        }
    }
}

pub(crate) fn apply_operator(op: OperatorKind, l: CalcValue, r: CalcValue) -> CalcValue {
    match op {
        OperatorKind::Plus => l.add(r),
        OperatorKind::Minus => l.subtract(r),
        OperatorKind::Mult => l.multiply(r),
        OperatorKind::Divide | OperatorKind::DivideSlash => l.divide(r),
        OperatorKind::Power => l.pow(r),
    }
}

fn apply_comparator(op: ComparatorKind, l: CalcValue, r: CalcValue) -> CalcValue {
    match op {
        ComparatorKind::Equal => l.compare_eq(r),
        ComparatorKind::NotEqual => l.compare_ne(r),
        ComparatorKind::Greater => l.compare_gt(r),
        ComparatorKind::GreaterEqual => l.compare_ge(r),
        ComparatorKind::Less => l.compare_lt(r),
        ComparatorKind::LessEqual => l.compare_le(r),
        ComparatorKind::And => l.logical_and(r),
        ComparatorKind::Or => l.logical_or(r),
    }
}

fn apply_function(
    func: Builtin,
    args: &[TermNode],
    ctx: &mut EvalContext<'_>,
) -> Result<CalcValue, Cancelled> {
    // `if` evaluates the condition and then only the branch it selects
    if func == Builtin::If {
        let cond = args[0].value(ctx)?;
        if cond.is_invalid() {
            return Ok(cond);
        }
        let Some(c) = cond.as_real() else {
            return Ok(CalcValue::PASSED_COMPLEX);
        };
        return if c != 0.0 {
            args[1].value(ctx)
        } else {
            args[2].value(ctx)
        };
    }

    let a = args[0].value(ctx)?;
    Ok(match func {
        Builtin::Sin => a.sin(),
        Builtin::Cos => a.cos(),
        Builtin::Tan => a.tan(),
        Builtin::Asin => a.asin(),
        Builtin::Acos => a.acos(),
        Builtin::Atan => a.atan(),
        Builtin::Sinh => a.sinh(),
        Builtin::Cosh => a.cosh(),
        Builtin::Tanh => a.tanh(),
        Builtin::Exp => a.exp(),
        Builtin::Ln => a.ln(),
        Builtin::Log10 => a.log10(),
        Builtin::Sqrt => a.sqrt(),
        Builtin::Abs => a.abs(),
        Builtin::Conj => a.conjugate(),
        Builtin::Re => a.re_part(),
        Builtin::Im => a.im_part(),
        Builtin::Ceil => a.ceil(),
        Builtin::Floor => a.floor(),
        Builtin::Signum => a.signum(),
        Builtin::Factorial => a.factorial(),
        Builtin::Random => a.random(),
        Builtin::NthRoot => a.nth_root(args[1].value(ctx)?),
        Builtin::Max => a.max(args[1].value(ctx)?),
        Builtin::Min => a.min(args[1].value(ctx)?),
        Builtin::Atan2 => a.atan2(args[1].value(ctx)?),
        Builtin::Hypot => a.hypot(args[1].value(ctx)?),
        Builtin::If => unreachable!("handled above"),
    })
}

fn link_value(link: &LinkNode, ctx: &mut EvalContext<'_>) -> Result<CalcValue, Cancelled> {
    let Some(target) = link.target else {
        return Ok(CalcValue::NOT_READY);
    };
    let eq = ctx.document().entity(target);

    if link.indexed {
        let mut indices = Vec::with_capacity(link.args.len());
        for arg in &link.args {
            let v = arg.value(ctx)?;
            if v.is_invalid() {
                return Ok(v);
            }
            let Some(i) = v.as_real() else {
                return Ok(CalcValue::PASSED_COMPLEX);
            };
            indices.push(i);
        }
        return eq.select(&indices, ctx);
    }

    let mut values = Vec::with_capacity(link.args.len());
    for arg in &link.args {
        let v = arg.value(ctx)?;
        if v.is_invalid() {
            return Ok(v);
        }
        values.push(v);
    }
    eq.call(&values, ctx)
}
