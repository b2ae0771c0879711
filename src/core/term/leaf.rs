//! Leaf classification
//!
//! The first validation pass walks every tree and decides what each leaf
//! token is: a reserved literal (rejected), a real or complex number, a
//! named constant, a reference to an enclosing argument holder, a
//! unit-suffixed number, or a candidate equation name left for the link
//! pass. Priority is fixed; the first classification that matches wins.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::document::{IssueKind, ValidationIssue};
use crate::core::syntax;
use crate::core::term::{Leaf, LeafBinding, PointSource, SeriesBounds, TermNode};
use crate::units::{Unit, UnitProvider};
use crate::value::CalcValue;

const NUMBER: &str = r"(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?";

fn complex_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            "^(?:(?P<re>[+-]?{n})(?P<im>[+-]{n})|(?P<only>[+-]?{n}))i$",
            n = NUMBER
        ))
        .unwrap()
    })
}

fn unit_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^(?P<num>[+-]?{n})\s+(?P<unit>\S+)$", n = NUMBER)).unwrap()
    })
}

fn is_reserved_invalid(token: &str) -> bool {
    token == "∞"
        || token.eq_ignore_ascii_case("nan")
        || token.eq_ignore_ascii_case("inf")
        || token.eq_ignore_ascii_case("infinity")
}

/// Parse a complex literal such as `2i`, `1+2i`, or `3.5-1e2i`. Digits
/// are required before the `i`, so a bare `i` stays an ordinary name.
pub(crate) fn parse_complex(token: &str) -> Option<CalcValue> {
    let caps = complex_pattern().captures(token)?;
    if let Some(only) = caps.name("only") {
        let im = only.as_str().parse::<f64>().ok()?;
        return Some(CalcValue::complex(0.0, im));
    }
    let re = caps.name("re")?.as_str().parse::<f64>().ok()?;
    let im = caps.name("im")?.as_str().parse::<f64>().ok()?;
    Some(CalcValue::complex(re, im))
}

/// Context for the classification pass: the unit table plus the owning
/// equation's declared unit, when it has one
pub(crate) struct LeafResolver<'a> {
    pub units: &'a dyn UnitProvider,
    pub target_unit: Option<Unit>,
}

impl LeafResolver<'_> {
    fn classify(&self, leaf: &mut Leaf, binders: &[String], issues: &mut Vec<ValidationIssue>) {
        let token = leaf.text.as_str();

        if is_reserved_invalid(token) {
            issues.push(ValidationIssue::new(
                IssueKind::UnknownIdentifier,
                format!("'{token}' is reserved and cannot be used as a value"),
            ));
            leaf.binding = LeafBinding::Unresolved;
            return;
        }
        if let Ok(value) = token.parse::<f64>() {
            leaf.binding = LeafBinding::Literal(CalcValue::Real(value));
            return;
        }
        if let Some(value) = parse_complex(token) {
            leaf.binding = LeafBinding::Literal(value);
            return;
        }
        match token {
            "e" => {
                leaf.binding = LeafBinding::Literal(CalcValue::Real(std::f64::consts::E));
                return;
            }
            "π" | "pi" => {
                leaf.binding = LeafBinding::Literal(CalcValue::Real(std::f64::consts::PI));
                return;
            }
            _ => {}
        }
        if binders.iter().rev().any(|name| name == token) {
            leaf.binding = LeafBinding::Argument(token.to_string());
            return;
        }
        if let Some(caps) = unit_pattern().captures(token) {
            let number = caps["num"].to_string();
            let unit_text = caps["unit"].to_string();
            self.classify_unit_literal(leaf, &number, &unit_text, issues);
            return;
        }
        if syntax::is_identifier(token) {
            // candidate equation name; the link pass settles it
            leaf.binding = LeafBinding::Pending;
        } else {
            issues.push(ValidationIssue::new(
                IssueKind::UnknownIdentifier,
                format!("cannot make sense of '{token}'"),
            ));
            leaf.binding = LeafBinding::Unresolved;
        }
    }

    fn classify_unit_literal(
        &self,
        leaf: &mut Leaf,
        number: &str,
        unit_text: &str,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let value = match number.parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                issues.push(ValidationIssue::new(
                    IssueKind::UnknownIdentifier,
                    format!("cannot make sense of '{}'", leaf.text),
                ));
                leaf.binding = LeafBinding::Unresolved;
                return;
            }
        };
        let Some(unit) = self.units.parse_unit(unit_text) else {
            issues.push(ValidationIssue::new(
                IssueKind::UnitMismatch,
                format!("unknown unit '{unit_text}'"),
            ));
            leaf.binding = LeafBinding::Unresolved;
            return;
        };
        let scaled = match &self.target_unit {
            Some(target) => match self.units.convert(value, &unit, target) {
                Some(v) => v,
                None => {
                    issues.push(ValidationIssue::new(
                        IssueKind::UnitMismatch,
                        format!(
                            "cannot convert '{}' to '{}'",
                            unit.symbol, target.symbol
                        ),
                    ));
                    leaf.binding = LeafBinding::Unresolved;
                    return;
                }
            },
            None => value * unit.scale,
        };
        leaf.binding = LeafBinding::Literal(CalcValue::Real(scaled));
    }
}

impl TermNode {
    /// First validation pass. `binders` is the stack of argument names
    /// visible at this point in the tree; equation formals are pushed by
    /// the caller, series indices and derivative variables by the walk.
    pub(crate) fn resolve_leaves(
        &mut self,
        resolver: &LeafResolver<'_>,
        binders: &mut Vec<String>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        match self {
            TermNode::Leaf(leaf) => resolver.classify(leaf, binders, issues),
            TermNode::Operator { left, right, .. } => {
                left.resolve_leaves(resolver, binders, issues);
                right.resolve_leaves(resolver, binders, issues);
            }
            TermNode::Comparator { left, right, .. } => {
                left.resolve_leaves(resolver, binders, issues);
                right.resolve_leaves(resolver, binders, issues);
            }
            TermNode::Function { args, .. } => {
                for arg in args {
                    arg.resolve_leaves(resolver, binders, issues);
                }
            }
            TermNode::Link(link) => {
                for arg in &mut link.args {
                    arg.resolve_leaves(resolver, binders, issues);
                }
            }
            TermNode::Interval(node) => {
                node.min.resolve_leaves(resolver, binders, issues);
                node.next.resolve_leaves(resolver, binders, issues);
                node.max.resolve_leaves(resolver, binders, issues);
            }
            TermNode::Series(node) => {
                // bounds run outside the loop and cannot see the index
                match &mut node.bounds {
                    SeriesBounds::Range { min, max } => {
                        min.resolve_leaves(resolver, binders, issues);
                        max.resolve_leaves(resolver, binders, issues);
                    }
                    SeriesBounds::Source(source) => {
                        source.resolve_leaves(resolver, binders, issues);
                    }
                }
                binders.push(node.index.clone());
                node.body.resolve_leaves(resolver, binders, issues);
                binders.pop();
            }
            TermNode::Derivative(node) => {
                node.point = if binders.iter().any(|name| *name == node.var) {
                    PointSource::Argument
                } else {
                    PointSource::Pending
                };
                binders.push(node.var.clone());
                node.body.resolve_leaves(resolver, binders, issues);
                binders.pop();
            }
        }
    }
}
