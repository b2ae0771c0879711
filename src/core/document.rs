//! Documents
//!
//! A document is an ordered list of equations plus the settings and unit
//! table they share. Equations reference each other by name; nothing
//! holds pointers. Validation resolves every name to an entity handle in
//! two passes (leaves first, then links), assigns result shapes, flags
//! recursion, and rebuilds the dependency graph used for invalidation
//! and audits. Evaluation never runs against an unvalidated document.

use std::collections::HashSet;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::core::equation::{Equation, ResultShape, ResultSlot};
use crate::core::scope::{CancelToken, EvalContext};
use crate::core::term::{LeafBinding, LeafResolver, PointSource, TermNode};
use crate::error::{Cancelled, SheetError, SheetResult};
use crate::settings::CalcSettings;
use crate::units::{StandardUnits, UnitProvider};
use crate::value::CalcValue;

/// Position of an equation in its document. Handles are assigned by
/// validation and go stale on structural edits; names are the durable
/// way to refer to an equation from outside.
pub type EntityId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    UnknownIdentifier,
    NotAFunction,
    NotAnArray,
    RecursiveCall,
    DuplicateIdentifier,
    InvalidInterval,
    InvalidDimension,
    UnitMismatch,
}

/// A validation finding. Issues are data, not errors: the document stays
/// usable and the affected equation reports not-ready until fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub entity: String,
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    pub(crate) fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        ValidationIssue {
            entity: String::new(),
            kind,
            message: message.into(),
        }
    }
}

struct NameEntry {
    name: String,
    arity: usize,
    array: bool,
}

/// Reverse-document-order name lookup over a snapshot of headers. With
/// redefinition allowed only entities before `from` are visible, so a
/// later definition can build on an earlier one of the same name;
/// otherwise the whole document is searched.
fn resolve_name(
    table: &[NameEntry],
    allow_redefinition: bool,
    name: &str,
    arity: Option<usize>,
    from: EntityId,
) -> Option<EntityId> {
    let limit = if allow_redefinition {
        from.min(table.len())
    } else {
        table.len()
    };
    table[..limit]
        .iter()
        .enumerate()
        .rev()
        .find(|(_, entry)| {
            entry.name == name && arity.map_or(true, |a| entry.arity == a)
        })
        .map(|(id, _)| id)
}

pub struct Document {
    entities: Vec<Equation>,
    pub settings: CalcSettings,
    units: Box<dyn UnitProvider>,
    graph: DiGraph<EntityId, ()>,
    nodes: Vec<NodeIndex>,
    validated: bool,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    pub fn new() -> Document {
        Document::with_settings(CalcSettings::default())
    }

    pub fn with_settings(settings: CalcSettings) -> Document {
        Document {
            entities: Vec::new(),
            settings,
            units: Box::new(StandardUnits),
            graph: DiGraph::new(),
            nodes: Vec::new(),
            validated: false,
        }
    }

    pub fn set_unit_provider(&mut self, units: Box<dyn UnitProvider>) {
        self.units = units;
        self.validated = false;
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity(&self, id: EntityId) -> &Equation {
        &self.entities[id]
    }

    pub fn get(&self, id: EntityId) -> Option<&Equation> {
        self.entities.get(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Equation)> {
        self.entities.iter().enumerate()
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// All findings from the last validation, document order
    pub fn issues(&self) -> Vec<ValidationIssue> {
        self.entities
            .iter()
            .flat_map(|eq| eq.issues.iter().cloned())
            .collect()
    }

    pub fn is_content_valid(&self) -> bool {
        self.validated && self.entities.iter().all(|eq| eq.issues.is_empty())
    }

    // ═══════════════════════════════════════════════════════════════
    // Edits
    // ═══════════════════════════════════════════════════════════════

    pub fn push(&mut self, eq: Equation) -> EntityId {
        self.drop_results_reading_name(&eq.name);
        self.entities.push(eq);
        self.validated = false;
        self.entities.len() - 1
    }

    pub fn insert(&mut self, at: usize, eq: Equation) {
        self.drop_results_reading_name(&eq.name);
        self.entities.insert(at, eq);
        self.validated = false;
    }

    pub fn remove(&mut self, id: EntityId) -> Equation {
        self.drop_dependent_results(id);
        self.validated = false;
        self.entities.remove(id)
    }

    pub fn replace_term(&mut self, id: EntityId, term: TermNode) {
        self.drop_dependent_results(id);
        self.entities[id].term = term;
        self.entities[id].result = ResultSlot::Empty;
        self.validated = false;
    }

    pub fn set_disabled(&mut self, id: EntityId, disabled: bool) {
        if self.entities[id].disabled == disabled {
            return;
        }
        self.drop_dependent_results(id);
        self.entities[id].disabled = disabled;
        self.entities[id].result = ResultSlot::Empty;
        self.validated = false;
    }

    /// Clear stored results of everything that transitively reads `id`,
    /// using the graph from the last validation
    fn drop_dependent_results(&mut self, id: EntityId) {
        if !self.validated {
            return;
        }
        let affected = self.dependents_closure(id);
        for e in affected {
            self.entities[e].result = ResultSlot::Empty;
        }
        self.entities[id].result = ResultSlot::Empty;
    }

    /// A new definition of `name` may capture references currently bound
    /// to an older definition; their readers go stale too
    fn drop_results_reading_name(&mut self, name: &str) {
        if !self.validated {
            return;
        }
        let same_name: Vec<EntityId> = self
            .entities
            .iter()
            .enumerate()
            .filter(|(_, eq)| eq.name == name)
            .map(|(id, _)| id)
            .collect();
        for id in same_name {
            self.drop_dependent_results(id);
        }
    }

    fn dependents_closure(&self, root: EntityId) -> HashSet<EntityId> {
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for neighbor in self
                .graph
                .neighbors_directed(self.nodes[id], Direction::Incoming)
            {
                let dependent = self.graph[neighbor];
                if seen.insert(dependent) {
                    stack.push(dependent);
                }
            }
        }
        seen
    }

    // ═══════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════

    /// Find an equation by name, newest definition first. `arity` of
    /// `None` matches any header. With redefinition allowed, `before`
    /// bounds the search to earlier entities.
    pub fn find_equation(
        &self,
        name: &str,
        arity: Option<usize>,
        before: Option<EntityId>,
    ) -> Option<EntityId> {
        let limit = if self.settings.allow_redefinition {
            before.unwrap_or(self.entities.len())
        } else {
            self.entities.len()
        };
        let limit = limit.min(self.entities.len());
        self.entities[..limit]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, eq)| {
                eq.name == name && arity.map_or(true, |a| eq.formals.len() == a)
            })
            .map(|(id, _)| id)
    }

    // ═══════════════════════════════════════════════════════════════
    // Validation
    // ═══════════════════════════════════════════════════════════════

    /// Re-resolve the whole document and return every finding. Runs the
    /// leaf pass, the link pass, shape assignment, shape-dependent
    /// checks, the recursion walk, and rebuilds the dependency graph.
    pub fn validate(&mut self) -> Vec<ValidationIssue> {
        let count = self.entities.len();
        for eq in &mut self.entities {
            eq.issues.clear();
            eq.shape = ResultShape::Pending;
            eq.formal_intervals.clear();
            eq.term.clear_resolution();
        }

        self.check_duplicates();
        self.resolve_all_leaves();
        self.resolve_all_links();
        self.assign_shapes();
        self.check_shapes();
        self.check_recursion();
        self.rebuild_graph(count);

        self.validated = true;
        let issues = self.issues();
        if issues.is_empty() {
            tracing::debug!(entities = count, "document validated");
        } else {
            tracing::debug!(
                entities = count,
                findings = issues.len(),
                "document validated with findings"
            );
        }
        issues
    }

    fn check_duplicates(&mut self) {
        if self.settings.allow_redefinition {
            return;
        }
        for id in 0..self.entities.len() {
            let name = self.entities[id].name.clone();
            let arity = self.entities[id].formals.len();
            let clash = self.entities[..id]
                .iter()
                .any(|eq| eq.name == name && eq.formals.len() == arity);
            if clash {
                let mut issue = ValidationIssue::new(
                    IssueKind::DuplicateIdentifier,
                    format!("'{name}' is declared more than once"),
                );
                issue.entity = name;
                self.entities[id].issues.push(issue);
            }
        }
    }

    fn resolve_all_leaves(&mut self) {
        let units = self.units.as_ref();
        for eq in &mut self.entities {
            let mut issues = Vec::new();
            let target_unit = match &eq.unit {
                Some(symbol) => match units.parse_unit(symbol) {
                    Some(unit) => Some(unit),
                    None => {
                        issues.push(ValidationIssue::new(
                            IssueKind::UnitMismatch,
                            format!("unknown unit '{symbol}'"),
                        ));
                        None
                    }
                },
                None => None,
            };
            let resolver = LeafResolver { units, target_unit };
            let mut binders = eq.formals.clone();
            eq.term.resolve_leaves(&resolver, &mut binders, &mut issues);
            for mut issue in issues {
                issue.entity = eq.name.clone();
                eq.issues.push(issue);
            }
        }
    }

    fn resolve_all_links(&mut self) {
        let table: Vec<NameEntry> = self
            .entities
            .iter()
            .map(|eq| NameEntry {
                name: eq.name.clone(),
                arity: eq.formals.len(),
                array: eq.array_declared,
            })
            .collect();
        let allow_redefinition = self.settings.allow_redefinition;

        for id in 0..self.entities.len() {
            let mut issues = Vec::new();
            let eq = &mut self.entities[id];
            eq.term.walk_mut(&mut |node| match node {
                TermNode::Leaf(leaf) => {
                    if leaf.binding != LeafBinding::Pending {
                        return;
                    }
                    match resolve_name(&table, allow_redefinition, &leaf.text, None, id) {
                        Some(target) => {
                            let entry = &table[target];
                            if entry.arity > 0 && !entry.array {
                                issues.push(ValidationIssue::new(
                                    IssueKind::NotAFunction,
                                    format!(
                                        "'{}' needs {} argument(s)",
                                        leaf.text, entry.arity
                                    ),
                                ));
                                leaf.binding = LeafBinding::Unresolved;
                            } else {
                                leaf.binding = LeafBinding::Equation {
                                    target: Some(target),
                                };
                            }
                        }
                        None => {
                            issues.push(ValidationIssue::new(
                                IssueKind::UnknownIdentifier,
                                format!("unknown identifier '{}'", leaf.text),
                            ));
                            leaf.binding = LeafBinding::Unresolved;
                        }
                    }
                }
                TermNode::Link(link) => {
                    let arity = if link.indexed {
                        // selector counts are checked against the shape later
                        None
                    } else {
                        Some(link.args.len())
                    };
                    match resolve_name(&table, allow_redefinition, &link.name, arity, id) {
                        Some(target) => link.target = Some(target),
                        None => {
                            let by_name =
                                resolve_name(&table, allow_redefinition, &link.name, None, id);
                            match by_name {
                                Some(target) => {
                                    issues.push(ValidationIssue::new(
                                        IssueKind::NotAFunction,
                                        format!(
                                            "'{}' takes {} argument(s), not {}",
                                            link.name,
                                            table[target].arity,
                                            link.args.len()
                                        ),
                                    ));
                                }
                                None => {
                                    issues.push(ValidationIssue::new(
                                        IssueKind::UnknownIdentifier,
                                        format!("unknown identifier '{}'", link.name),
                                    ));
                                }
                            }
                        }
                    }
                }
                TermNode::Derivative(der) => {
                    if der.point != PointSource::Pending {
                        return;
                    }
                    match resolve_name(&table, allow_redefinition, &der.var, Some(0), id) {
                        Some(target) => der.point = PointSource::Equation(target),
                        None => {
                            issues.push(ValidationIssue::new(
                                IssueKind::UnknownIdentifier,
                                format!(
                                    "no value for differentiation variable '{}'",
                                    der.var
                                ),
                            ));
                            der.point = PointSource::Unresolved;
                        }
                    }
                }
                _ => {}
            });
            for mut issue in issues {
                issue.entity = eq.name.clone();
                eq.issues.push(issue);
            }
        }
    }

    fn assign_shapes(&mut self) {
        for eq in &mut self.entities {
            eq.shape = if eq.array_declared {
                ResultShape::Array
            } else if matches!(eq.term, TermNode::Interval(_)) {
                ResultShape::Interval
            } else if eq.formals.is_empty() {
                ResultShape::Constant
            } else {
                ResultShape::PassThrough
            };
        }
        // a zero-arity alias of an interval is itself an interval; chase
        // chains until nothing changes
        loop {
            let shapes: Vec<ResultShape> = self.entities.iter().map(|eq| eq.shape).collect();
            let mut changed = false;
            for eq in &mut self.entities {
                if eq.shape != ResultShape::Constant {
                    continue;
                }
                if let Some(target) = alias_target(&eq.term) {
                    if shapes[target] == ResultShape::Interval {
                        eq.shape = ResultShape::Interval;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn check_shapes(&mut self) {
        let shapes: Vec<ResultShape> = self.entities.iter().map(|eq| eq.shape).collect();
        let arities: Vec<usize> = self.entities.iter().map(|eq| eq.formals.len()).collect();
        let names: Vec<String> = self.entities.iter().map(|eq| eq.name.clone()).collect();
        let allow_redefinition = self.settings.allow_redefinition;
        let max_dims = self.settings.max_array_dimension;

        let table: Vec<NameEntry> = self
            .entities
            .iter()
            .map(|eq| NameEntry {
                name: eq.name.clone(),
                arity: eq.formals.len(),
                array: eq.array_declared,
            })
            .collect();

        for id in 0..self.entities.len() {
            let mut issues = Vec::new();
            let eq = &mut self.entities[id];

            if eq.shape == ResultShape::Array {
                if eq.formals.len() > max_dims {
                    issues.push(ValidationIssue::new(
                        IssueKind::InvalidDimension,
                        format!(
                            "'{}' has {} dimensions, at most {} allowed",
                            eq.name,
                            eq.formals.len(),
                            max_dims
                        ),
                    ));
                }
                for formal in eq.formals.clone() {
                    match resolve_name(&table, allow_redefinition, &formal, Some(0), id) {
                        Some(target) if shapes[target] == ResultShape::Interval => {
                            eq.formal_intervals.push(target);
                        }
                        _ => {
                            issues.push(ValidationIssue::new(
                                IssueKind::InvalidInterval,
                                format!("array index '{formal}' must name an interval"),
                            ));
                        }
                    }
                }
            }

            // shape-dependent reference checks over the whole tree
            let formal_intervals = eq.formal_intervals.clone();
            let is_array = eq.shape == ResultShape::Array;
            eq.term.walk(&mut |node| match node {
                TermNode::Link(link) => {
                    let Some(target) = link.target else { return };
                    if link.indexed {
                        match shapes[target] {
                            ResultShape::Interval => {
                                if link.args.len() != 1 {
                                    issues.push(ValidationIssue::new(
                                        IssueKind::NotAnArray,
                                        format!(
                                            "interval '{}' takes one selector",
                                            link.name
                                        ),
                                    ));
                                }
                            }
                            ResultShape::Array => {
                                if link.args.len() != arities[target] {
                                    issues.push(ValidationIssue::new(
                                        IssueKind::NotAnArray,
                                        format!(
                                            "array '{}' takes {} selector(s), not {}",
                                            link.name,
                                            arities[target],
                                            link.args.len()
                                        ),
                                    ));
                                }
                            }
                            _ => {
                                issues.push(ValidationIssue::new(
                                    IssueKind::NotAnArray,
                                    format!("'{}' cannot be indexed", link.name),
                                ));
                            }
                        }
                    }
                    if is_array
                        && shapes[target] == ResultShape::Interval
                        && !formal_intervals.contains(&target)
                    {
                        issues.push(ValidationIssue::new(
                            IssueKind::InvalidInterval,
                            format!(
                                "interval '{}' is not an index of this array",
                                names[target]
                            ),
                        ));
                    }
                }
                TermNode::Leaf(leaf) => {
                    if let LeafBinding::Equation {
                        target: Some(target),
                    } = leaf.binding
                    {
                        if is_array
                            && shapes[target] == ResultShape::Interval
                            && !formal_intervals.contains(&target)
                        {
                            issues.push(ValidationIssue::new(
                                IssueKind::InvalidInterval,
                                format!(
                                    "interval '{}' is not an index of this array",
                                    names[target]
                                ),
                            ));
                        }
                    }
                }
                _ => {}
            });

            for mut issue in issues {
                issue.entity = eq.name.clone();
                eq.issues.push(issue);
            }
        }
    }

    /// Depth-first walk over resolved references; an entity that can
    /// reach itself is recursive. The visited set keeps the walk finite
    /// whatever the tangle looks like.
    fn check_recursion(&mut self) {
        let targets: Vec<Vec<EntityId>> = self
            .entities
            .iter()
            .map(|eq| {
                let mut out = Vec::new();
                eq.term.collect_targets(&mut out);
                out.extend(&eq.formal_intervals);
                out
            })
            .collect();

        for id in 0..self.entities.len() {
            let mut seen = HashSet::new();
            let mut stack: Vec<EntityId> = targets[id].clone();
            let mut recursive = false;
            while let Some(next) = stack.pop() {
                if next == id {
                    recursive = true;
                    break;
                }
                if seen.insert(next) {
                    stack.extend(&targets[next]);
                }
            }
            if recursive {
                let name = self.entities[id].name.clone();
                let mut issue = ValidationIssue::new(
                    IssueKind::RecursiveCall,
                    format!("'{name}' calls itself"),
                );
                issue.entity = name;
                self.entities[id].issues.push(issue);
            }
        }
    }

    fn rebuild_graph(&mut self, count: usize) {
        self.graph = DiGraph::new();
        self.nodes = (0..count).map(|id| self.graph.add_node(id)).collect();
        for id in 0..count {
            let mut targets = Vec::new();
            self.entities[id].term.collect_targets(&mut targets);
            targets.extend(&self.entities[id].formal_intervals);
            targets.sort_unstable();
            targets.dedup();
            for target in targets {
                self.graph.add_edge(self.nodes[id], self.nodes[target], ());
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Evaluation
    // ═══════════════════════════════════════════════════════════════

    /// Ad-hoc evaluation of one equation with the given argument values
    pub fn evaluate(
        &self,
        id: EntityId,
        values: &[CalcValue],
        cancel: &CancelToken,
    ) -> Result<CalcValue, Cancelled> {
        let mut ctx = EvalContext::new(self, cancel);
        self.entities[id].call(values, &mut ctx)
    }

    pub fn evaluate_by_name(
        &self,
        name: &str,
        values: &[CalcValue],
        cancel: &CancelToken,
    ) -> SheetResult<CalcValue> {
        let id = self
            .find_equation(name, Some(values.len()), None)
            .or_else(|| self.find_equation(name, None, None))
            .ok_or_else(|| SheetError::UnknownEquation(name.to_string()))?;
        Ok(self.evaluate(id, values, cancel)?)
    }

    /// Clear one stored result without touching anything else
    pub(crate) fn invalidate_result(&mut self, id: EntityId) {
        self.entities[id].result = ResultSlot::Empty;
    }

    /// Compute and store the result slot for one entity
    pub(crate) fn calculate_entity(
        &mut self,
        id: EntityId,
        cancel: &CancelToken,
    ) -> Result<(), Cancelled> {
        let slot = {
            let mut ctx = EvalContext::new(&*self, cancel);
            self.entities[id].compute_slot(&mut ctx)?
        };
        self.entities[id].result = slot;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════
    // Audits
    // ═══════════════════════════════════════════════════════════════

    /// Names of everything `name` transitively reads, sorted
    pub fn dependency_audit(&self, name: &str) -> SheetResult<Vec<String>> {
        if !self.validated {
            return Err(SheetError::Validation(
                "document must be validated before auditing".to_string(),
            ));
        }
        let id = self
            .find_equation(name, None, None)
            .ok_or_else(|| SheetError::UnknownEquation(name.to_string()))?;
        let mut seen = HashSet::new();
        let mut stack = vec![self.nodes[id]];
        let mut found = HashSet::new();
        while let Some(node) = stack.pop() {
            for neighbor in self.graph.neighbors_directed(node, Direction::Outgoing) {
                let dep = self.graph[neighbor];
                if seen.insert(dep) {
                    found.insert(self.entities[dep].name.clone());
                    stack.push(neighbor);
                }
            }
        }
        let mut names: Vec<String> = found.into_iter().collect();
        names.sort();
        Ok(names)
    }

    /// Error out if the last validation flagged recursion anywhere
    pub fn check_cycles(&self) -> SheetResult<()> {
        for eq in &self.entities {
            if let Some(issue) = eq
                .issues
                .iter()
                .find(|i| i.kind == IssueKind::RecursiveCall)
            {
                return Err(SheetError::CircularDependency(issue.entity.clone()));
            }
        }
        Ok(())
    }
}

/// A bare zero-arity reference: a single leaf naming an equation, or an
/// argumentless non-indexed link
fn alias_target(term: &TermNode) -> Option<EntityId> {
    match term {
        TermNode::Leaf(leaf) if !leaf.negated => match leaf.binding {
            LeafBinding::Equation { target } => target,
            _ => None,
        },
        TermNode::Link(link) if !link.indexed && link.args.is_empty() => link.target,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::OperatorKind;

    fn constant(header: &str, text: &str) -> Equation {
        Equation::new(header, TermNode::leaf(text).unwrap()).unwrap()
    }

    fn eval(doc: &Document, name: &str) -> CalcValue {
        let cancel = CancelToken::new();
        doc.evaluate_by_name(name, &[], &cancel).unwrap()
    }

    #[test]
    fn constants_chain_through_links() {
        let mut doc = Document::new();
        doc.push(constant("a", "2"));
        let body = TermNode::operator(
            OperatorKind::Plus,
            TermNode::operator(
                OperatorKind::Mult,
                TermNode::leaf("a").unwrap(),
                TermNode::leaf("3").unwrap(),
            ),
            TermNode::leaf("1").unwrap(),
        );
        doc.push(Equation::new("b", body).unwrap());
        assert!(doc.validate().is_empty());
        assert_eq!(eval(&doc, "b"), CalcValue::Real(7.0));
    }

    #[test]
    fn unknown_names_are_flagged_and_read_as_not_ready() {
        let mut doc = Document::new();
        doc.push(constant("a", "nosuch"));
        let issues = doc.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::UnknownIdentifier);
        assert_eq!(issues[0].entity, "a");
        assert_eq!(eval(&doc, "a"), CalcValue::NOT_READY);
    }

    #[test]
    fn self_recursion_is_flagged_without_overflowing() {
        let mut doc = Document::new();
        let body = TermNode::operator(
            OperatorKind::Plus,
            TermNode::from_text("f(x)").unwrap(),
            TermNode::leaf("1").unwrap(),
        );
        doc.push(Equation::new("f(x)", body).unwrap());
        let issues = doc.validate();
        assert!(issues.iter().any(|i| i.kind == IssueKind::RecursiveCall));
        let cancel = CancelToken::new();
        let v = doc
            .evaluate_by_name("f", &[CalcValue::Real(1.0)], &cancel)
            .unwrap();
        assert_eq!(v, CalcValue::NOT_READY);
    }

    #[test]
    fn mutual_recursion_is_flagged_on_both() {
        let mut doc = Document::new();
        doc.push(constant("a", "b"));
        doc.push(constant("b", "a"));
        let issues = doc.validate();
        assert_eq!(
            issues
                .iter()
                .filter(|i| i.kind == IssueKind::RecursiveCall)
                .count(),
            2
        );
    }

    #[test]
    fn duplicates_depend_on_the_redefinition_setting() {
        let mut doc = Document::new();
        doc.push(constant("x", "1"));
        doc.push(constant("x", "2"));
        doc.push(constant("y", "x"));
        let issues = doc.validate();
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::DuplicateIdentifier));

        let mut doc = Document::with_settings(CalcSettings {
            allow_redefinition: true,
            ..CalcSettings::default()
        });
        doc.push(constant("x", "1"));
        doc.push(constant("x", "2"));
        doc.push(constant("y", "x"));
        assert!(doc.validate().is_empty());
        // the reference binds to the nearest preceding definition
        assert_eq!(eval(&doc, "y"), CalcValue::Real(2.0));
    }

    #[test]
    fn redefinition_lets_a_name_build_on_itself() {
        let mut doc = Document::with_settings(CalcSettings {
            allow_redefinition: true,
            ..CalcSettings::default()
        });
        doc.push(constant("x", "3"));
        let body = TermNode::operator(
            OperatorKind::Mult,
            TermNode::leaf("x").unwrap(),
            TermNode::leaf("2").unwrap(),
        );
        doc.push(Equation::new("x", body).unwrap());
        assert!(doc.validate().is_empty());
        let id = doc.find_equation("x", None, None).unwrap();
        assert_eq!(id, 1);
        let cancel = CancelToken::new();
        assert_eq!(
            doc.evaluate(id, &[], &cancel).unwrap(),
            CalcValue::Real(6.0)
        );
    }

    #[test]
    fn array_indices_must_name_intervals() {
        let mut doc = Document::new();
        doc.push(constant("i", "5"));
        doc.push(Equation::new("g[i]", TermNode::leaf("i").unwrap()).unwrap());
        let issues = doc.validate();
        assert!(issues.iter().any(|i| i.kind == IssueKind::InvalidInterval));

        let mut doc = Document::new();
        doc.push(Equation::new(
            "i",
            TermNode::interval(
                TermNode::leaf("0").unwrap(),
                TermNode::leaf("1").unwrap(),
                TermNode::leaf("4").unwrap(),
            ),
        )
        .unwrap());
        doc.push(Equation::new("g[i]", TermNode::leaf("i").unwrap()).unwrap());
        assert!(doc.validate().is_empty());
        let gid = doc.find_equation("g", None, None).unwrap();
        assert_eq!(doc.entity(gid).shape(), ResultShape::Array);
    }

    #[test]
    fn foreign_intervals_are_rejected_in_array_bodies() {
        let mut doc = Document::new();
        doc.push(Equation::new(
            "i",
            TermNode::interval(
                TermNode::leaf("0").unwrap(),
                TermNode::leaf("1").unwrap(),
                TermNode::leaf("4").unwrap(),
            ),
        )
        .unwrap());
        doc.push(Equation::new(
            "t",
            TermNode::interval(
                TermNode::leaf("0").unwrap(),
                TermNode::leaf("1").unwrap(),
                TermNode::leaf("9").unwrap(),
            ),
        )
        .unwrap());
        let body = TermNode::from_text("t[0]").unwrap();
        doc.push(Equation::new("g[i]", body).unwrap());
        let issues = doc.validate();
        assert!(issues.iter().any(|i| i.kind == IssueKind::InvalidInterval));
    }

    #[test]
    fn interval_aliases_take_the_interval_shape() {
        let mut doc = Document::new();
        doc.push(Equation::new(
            "t",
            TermNode::interval(
                TermNode::leaf("0").unwrap(),
                TermNode::leaf("1").unwrap(),
                TermNode::leaf("4").unwrap(),
            ),
        )
        .unwrap());
        doc.push(constant("u", "t"));
        doc.push(constant("v", "u"));
        assert!(doc.validate().is_empty());
        for name in ["t", "u", "v"] {
            let id = doc.find_equation(name, None, None).unwrap();
            assert_eq!(doc.entity(id).shape(), ResultShape::Interval, "{name}");
        }
    }

    #[test]
    fn audit_lists_transitive_reads() {
        let mut doc = Document::new();
        doc.push(constant("a", "2"));
        doc.push(constant("b", "a"));
        doc.push(constant("c", "b"));
        doc.validate();
        assert_eq!(doc.dependency_audit("c").unwrap(), vec!["a", "b"]);
        assert!(doc.dependency_audit("zzz").is_err());
    }

    #[test]
    fn disabled_equations_read_as_not_ready() {
        let mut doc = Document::new();
        doc.push(constant("a", "2"));
        doc.push(constant("b", "a"));
        doc.validate();
        let aid = doc.find_equation("a", None, None).unwrap();
        doc.set_disabled(aid, true);
        doc.validate();
        assert_eq!(eval(&doc, "b"), CalcValue::NOT_READY);
    }
}
