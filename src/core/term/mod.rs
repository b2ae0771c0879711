//! Term trees
//!
//! A formula is a strict tree of `TermNode`s: leaves, operators,
//! comparators, built-in functions, links to named equations, intervals,
//! and series. Nodes are built from construction requests (pre-built
//! children or raw call text), then resolved against the document by the
//! validation passes before evaluation.

mod diff;
mod eval;
mod interval;
mod leaf;
mod series;

pub use diff::DiffGrade;
pub(crate) use interval::select_point;
pub(crate) use leaf::LeafResolver;

use crate::core::document::EntityId;
use crate::core::syntax;
use crate::error::BuildError;
use crate::value::CalcValue;

/// Binary arithmetic operators. `DivideSlash` is the inline `/` form;
/// it evaluates exactly like `Divide` and differs only in presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Plus,
    Minus,
    Mult,
    Divide,
    DivideSlash,
    Power,
}

impl OperatorKind {
    pub fn parse(token: &str) -> Option<OperatorKind> {
        match token {
            "+" => Some(OperatorKind::Plus),
            "-" | "−" => Some(OperatorKind::Minus),
            "*" | "·" | "×" => Some(OperatorKind::Mult),
            "÷" => Some(OperatorKind::Divide),
            "/" => Some(OperatorKind::DivideSlash),
            "^" => Some(OperatorKind::Power),
            _ => None,
        }
    }
}

/// Comparison and logical operators. All real-only: a complex operand
/// makes the comparison invalid rather than silently false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparatorKind {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
}

impl ComparatorKind {
    pub fn parse(token: &str) -> Option<ComparatorKind> {
        match token {
            "=" | "==" => Some(ComparatorKind::Equal),
            "≠" | "!=" => Some(ComparatorKind::NotEqual),
            ">" => Some(ComparatorKind::Greater),
            "≥" | ">=" => Some(ComparatorKind::GreaterEqual),
            "<" => Some(ComparatorKind::Less),
            "≤" | "<=" => Some(ComparatorKind::LessEqual),
            "&" | "&&" => Some(ComparatorKind::And),
            "|" | "||" => Some(ComparatorKind::Or),
            _ => None,
        }
    }
}

/// The closed built-in function set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Log10,
    Sqrt,
    NthRoot,
    Abs,
    Conj,
    Re,
    Im,
    Ceil,
    Floor,
    Signum,
    Factorial,
    Random,
    Max,
    Min,
    Atan2,
    Hypot,
    If,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "sin" => Some(Builtin::Sin),
            "cos" => Some(Builtin::Cos),
            "tan" => Some(Builtin::Tan),
            "asin" => Some(Builtin::Asin),
            "acos" => Some(Builtin::Acos),
            "atan" => Some(Builtin::Atan),
            "sinh" => Some(Builtin::Sinh),
            "cosh" => Some(Builtin::Cosh),
            "tanh" => Some(Builtin::Tanh),
            "exp" => Some(Builtin::Exp),
            "ln" => Some(Builtin::Ln),
            "log10" => Some(Builtin::Log10),
            "sqrt" => Some(Builtin::Sqrt),
            "nthroot" => Some(Builtin::NthRoot),
            "abs" => Some(Builtin::Abs),
            "conj" => Some(Builtin::Conj),
            "re" => Some(Builtin::Re),
            "im" => Some(Builtin::Im),
            "ceil" => Some(Builtin::Ceil),
            "floor" => Some(Builtin::Floor),
            "signum" | "sign" => Some(Builtin::Signum),
            "factorial" => Some(Builtin::Factorial),
            "random" => Some(Builtin::Random),
            "max" => Some(Builtin::Max),
            "min" => Some(Builtin::Min),
            "atan2" => Some(Builtin::Atan2),
            "hypot" => Some(Builtin::Hypot),
            "if" => Some(Builtin::If),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
            Builtin::Tan => "tan",
            Builtin::Asin => "asin",
            Builtin::Acos => "acos",
            Builtin::Atan => "atan",
            Builtin::Sinh => "sinh",
            Builtin::Cosh => "cosh",
            Builtin::Tanh => "tanh",
            Builtin::Exp => "exp",
            Builtin::Ln => "ln",
            Builtin::Log10 => "log10",
            Builtin::Sqrt => "sqrt",
            Builtin::NthRoot => "nthroot",
            Builtin::Abs => "abs",
            Builtin::Conj => "conj",
            Builtin::Re => "re",
            Builtin::Im => "im",
            Builtin::Ceil => "ceil",
            Builtin::Floor => "floor",
            Builtin::Signum => "signum",
            Builtin::Factorial => "factorial",
            Builtin::Random => "random",
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::Atan2 => "atan2",
            Builtin::Hypot => "hypot",
            Builtin::If => "if",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Builtin::NthRoot | Builtin::Max | Builtin::Min | Builtin::Atan2 | Builtin::Hypot => 2,
            Builtin::If => 3,
            _ => 1,
        }
    }
}

/// Series folds over an interval's point sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Summation,
    Product,
    Integral,
}

/// A leaf token. The raw text is kept with one leading minus stripped
/// into `negated`; validation fills `binding`.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub text: String,
    pub negated: bool,
    pub(crate) binding: LeafBinding,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LeafBinding {
    /// Unclassified; link resolution may still claim it
    Pending,
    /// A literal, named constant, or unit-scaled literal
    Literal(CalcValue),
    /// Bound to the nearest enclosing argument holder with this name
    Argument(String),
    /// Zero-arity reference to a named equation
    Equation { target: Option<EntityId> },
    /// Flagged by validation; evaluates as not-ready
    Unresolved,
}

/// A bracketed reference to a named equation: `f(x)` forwards bindings,
/// `g[i]` selects from a materialized array or interval.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkNode {
    pub name: String,
    pub args: Vec<TermNode>,
    pub indexed: bool,
    pub(crate) target: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalNode {
    pub min: Box<TermNode>,
    pub next: Box<TermNode>,
    pub max: Box<TermNode>,
}

/// Bounds driving a series fold: either explicit min/max terms or an
/// interval-valued term whose materialized points are iterated directly
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesBounds {
    Range {
        min: Box<TermNode>,
        max: Box<TermNode>,
    },
    Source(Box<TermNode>),
}

impl SeriesBounds {
    pub fn range(min: TermNode, max: TermNode) -> SeriesBounds {
        SeriesBounds::Range {
            min: Box::new(min),
            max: Box::new(max),
        }
    }

    pub fn source(term: TermNode) -> SeriesBounds {
        SeriesBounds::Source(Box::new(term))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesNode {
    pub kind: SeriesKind,
    pub index: String,
    pub bounds: SeriesBounds,
    pub body: Box<TermNode>,
}

/// Where a derivative node finds the value of its variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PointSource {
    Pending,
    Argument,
    Equation(EntityId),
    Unresolved,
}

/// Derivative of `body` with respect to `var` at the variable's current
/// value. The node is itself an argument holder for `var`, so references
/// inside the body bind here first.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeNode {
    pub var: String,
    pub body: Box<TermNode>,
    pub(crate) point: PointSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermNode {
    Leaf(Leaf),
    Operator {
        op: OperatorKind,
        /// Presentation-only flag recording whether the operand pair was
        /// bracketed in the source document
        brackets: bool,
        left: Box<TermNode>,
        right: Box<TermNode>,
    },
    Comparator {
        op: ComparatorKind,
        left: Box<TermNode>,
        right: Box<TermNode>,
    },
    Function {
        func: Builtin,
        args: Vec<TermNode>,
    },
    Link(LinkNode),
    Interval(IntervalNode),
    Series(SeriesNode),
    Derivative(DerivativeNode),
}

impl TermNode {
    /// Build a leaf from a raw token, stripping one leading minus.
    /// Sign-only or empty text is rejected; classification of what is
    /// left happens during validation.
    pub fn leaf(text: &str) -> Result<TermNode, BuildError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(BuildError::EmptyTerm);
        }
        let (negated, body) = match trimmed.strip_prefix(['-', '−']) {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        if body.is_empty() {
            return Err(BuildError::EmptyTerm);
        }
        Ok(TermNode::Leaf(Leaf {
            text: body.to_string(),
            negated,
            binding: LeafBinding::Pending,
        }))
    }

    pub fn operator(op: OperatorKind, left: TermNode, right: TermNode) -> TermNode {
        TermNode::Operator {
            op,
            brackets: false,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Mark an operator node as bracketed in the source document
    pub fn with_brackets(self) -> TermNode {
        match self {
            TermNode::Operator {
                op, left, right, ..
            } => TermNode::Operator {
                op,
                brackets: true,
                left,
                right,
            },
            other => other,
        }
    }

    pub fn comparator(op: ComparatorKind, left: TermNode, right: TermNode) -> TermNode {
        TermNode::Comparator {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Build a built-in function call, enforcing arity
    pub fn function(func: Builtin, args: Vec<TermNode>) -> Result<TermNode, BuildError> {
        if args.len() != func.arity() {
            return Err(BuildError::WrongArgCount {
                name: func.name().to_string(),
                expected: func.arity(),
                got: args.len(),
            });
        }
        Ok(TermNode::Function { func, args })
    }

    /// Build a bracketed call: a built-in when the name is in the closed
    /// set (arity checked), otherwise a link to a named equation
    pub fn call(name: &str, args: Vec<TermNode>) -> Result<TermNode, BuildError> {
        if !syntax::is_identifier(name) {
            return Err(BuildError::InvalidIdentifier(name.to_string()));
        }
        match Builtin::from_name(name) {
            Some(func) => TermNode::function(func, args),
            None => Ok(TermNode::Link(LinkNode {
                name: name.to_string(),
                args,
                indexed: false,
                target: None,
            })),
        }
    }

    /// Build an indexed reference `name[args...]`
    pub fn index(name: &str, args: Vec<TermNode>) -> Result<TermNode, BuildError> {
        if !syntax::is_identifier(name) {
            return Err(BuildError::InvalidIdentifier(name.to_string()));
        }
        if args.is_empty() {
            return Err(BuildError::EmptyArgument(name.to_string()));
        }
        Ok(TermNode::Link(LinkNode {
            name: name.to_string(),
            args,
            indexed: true,
            target: None,
        }))
    }

    /// Build a node from raw construction text: `name(a, b)`, `g[i]`, or
    /// a plain leaf token. Arguments recurse, so nested calls work.
    /// Signs belong to leaves and explicit minus operators, not to calls.
    pub fn from_text(text: &str) -> Result<TermNode, BuildError> {
        match syntax::split_call(text)? {
            None => TermNode::leaf(text),
            Some(parts) => {
                let args = parts
                    .args
                    .iter()
                    .map(|arg| TermNode::from_text(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                if parts.indexed {
                    TermNode::index(&parts.name, args)
                } else {
                    TermNode::call(&parts.name, args)
                }
            }
        }
    }

    pub fn interval(min: TermNode, next: TermNode, max: TermNode) -> TermNode {
        TermNode::Interval(IntervalNode {
            min: Box::new(min),
            next: Box::new(next),
            max: Box::new(max),
        })
    }

    pub fn series(kind: SeriesKind, index: &str, bounds: SeriesBounds, body: TermNode) -> TermNode {
        TermNode::Series(SeriesNode {
            kind,
            index: index.to_string(),
            bounds,
            body: Box::new(body),
        })
    }

    pub fn summation(index: &str, bounds: SeriesBounds, body: TermNode) -> TermNode {
        TermNode::series(SeriesKind::Summation, index, bounds, body)
    }

    pub fn product(index: &str, bounds: SeriesBounds, body: TermNode) -> TermNode {
        TermNode::series(SeriesKind::Product, index, bounds, body)
    }

    pub fn integral(index: &str, bounds: SeriesBounds, body: TermNode) -> TermNode {
        TermNode::series(SeriesKind::Integral, index, bounds, body)
    }

    pub fn derivative_of(var: &str, body: TermNode) -> TermNode {
        TermNode::Derivative(DerivativeNode {
            var: var.to_string(),
            body: Box::new(body),
            point: PointSource::Pending,
        })
    }

    /// Visit every node in the tree, parents before children
    pub(crate) fn walk(&self, f: &mut impl FnMut(&TermNode)) {
        f(self);
        match self {
            TermNode::Leaf(_) => {}
            TermNode::Operator { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            TermNode::Comparator { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            TermNode::Function { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            TermNode::Link(link) => {
                for arg in &link.args {
                    arg.walk(f);
                }
            }
            TermNode::Interval(node) => {
                node.min.walk(f);
                node.next.walk(f);
                node.max.walk(f);
            }
            TermNode::Series(node) => {
                match &node.bounds {
                    SeriesBounds::Range { min, max } => {
                        min.walk(f);
                        max.walk(f);
                    }
                    SeriesBounds::Source(source) => source.walk(f),
                }
                node.body.walk(f);
            }
            TermNode::Derivative(node) => node.body.walk(f),
        }
    }

    /// Mutable pre-order visit; used by the link-resolution pass
    pub(crate) fn walk_mut(&mut self, f: &mut impl FnMut(&mut TermNode)) {
        f(self);
        match self {
            TermNode::Leaf(_) => {}
            TermNode::Operator { left, right, .. } => {
                left.walk_mut(f);
                right.walk_mut(f);
            }
            TermNode::Comparator { left, right, .. } => {
                left.walk_mut(f);
                right.walk_mut(f);
            }
            TermNode::Function { args, .. } => {
                for arg in args {
                    arg.walk_mut(f);
                }
            }
            TermNode::Link(link) => {
                for arg in &mut link.args {
                    arg.walk_mut(f);
                }
            }
            TermNode::Interval(node) => {
                node.min.walk_mut(f);
                node.next.walk_mut(f);
                node.max.walk_mut(f);
            }
            TermNode::Series(node) => {
                match &mut node.bounds {
                    SeriesBounds::Range { min, max } => {
                        min.walk_mut(f);
                        max.walk_mut(f);
                    }
                    SeriesBounds::Source(source) => source.walk_mut(f),
                }
                node.body.walk_mut(f);
            }
            TermNode::Derivative(node) => node.body.walk_mut(f),
        }
    }

    /// Entity ids this tree reads through links, leaf references, and
    /// derivative point sources
    pub(crate) fn collect_targets(&self, out: &mut Vec<EntityId>) {
        self.walk(&mut |node| match node {
            TermNode::Link(LinkNode {
                target: Some(id), ..
            }) => out.push(*id),
            TermNode::Leaf(Leaf {
                binding: LeafBinding::Equation { target: Some(id) },
                ..
            }) => out.push(*id),
            TermNode::Derivative(DerivativeNode {
                point: PointSource::Equation(id),
                ..
            }) => out.push(*id),
            _ => {}
        });
    }

    /// Drop every resolved binding so validation can start over
    pub(crate) fn clear_resolution(&mut self) {
        self.walk_mut(&mut |node| match node {
            TermNode::Leaf(leaf) => leaf.binding = LeafBinding::Pending,
            TermNode::Link(link) => link.target = None,
            TermNode::Derivative(node) => node.point = PointSource::Pending,
            _ => {}
        });
    }
}
