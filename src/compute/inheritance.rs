//! Impact inheritance along impact-inheriting links.
//!
//! Each link of a configured type makes its target inherit the highest effective
//! impact of all its sources, per category ("high watermark"). The calculator
//! first loads an id-only flyweight graph to find roots and components, then
//! hydrates only the components it walks. Cycles are never computed: every
//! element of a cycle gets its calculated impacts cleared.

use crate::display::trace;
use crate::error::RiskError;
use crate::graph::{ElementGraph, FlyweightComponent, FlyweightGraph};
use crate::store::{
    CategoryRef, Client, Domain, Element, ElementId, ElementRepository, FlyweightRepository, ImpactRef,
    ImpactValues, RiskDefinitionRef, Unit,
};
use petgraph::stable_graph::NodeIndex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, instrument, trace, warn};

/// The (domain, risk definition) a calculation runs for, once inheritance is known to be active.
struct Scope<'d> {
    domain: &'d Domain,
    rd: RiskDefinitionRef,
    categories: BTreeSet<CategoryRef>,
    link_types: BTreeSet<String>,
}

/// Ids of changed elements in order of their first change.
#[derive(Default)]
struct ChangeLog {
    order: Vec<ElementId>,
    seen: HashSet<ElementId>,
}

impl ChangeLog {
    fn record(&mut self, id: &ElementId) {
        if self.seen.insert(id.clone()) {
            self.order.push(id.clone());
        }
    }
}

pub struct ImpactInheritanceCalculator<'a> {
    flyweights: &'a dyn FlyweightRepository,
    elements: &'a dyn ElementRepository,
}

impl<'a> ImpactInheritanceCalculator<'a> {
    pub fn new(flyweights: &'a dyn FlyweightRepository, elements: &'a dyn ElementRepository) -> Self {
        Self { flyweights, elements }
    }

    /// Recomputes every root of the unit's inheritance graph for one risk definition.
    #[instrument(skip_all, fields(unit = %unit.id, domain = %domain.id, rd = risk_definition_id))]
    pub fn update_all_root_nodes(
        &self,
        unit: &Unit,
        domain: &Domain,
        risk_definition_id: &str,
    ) -> Result<Vec<Element>, RiskError> {
        let Some(scope) = self.scope(unit, domain, risk_definition_id) else {
            return Ok(Vec::new());
        };
        let started = Instant::now();
        let Some(fg) = self.load_flyweights(unit, &scope)? else {
            return Ok(Vec::new());
        };

        let mut changed = ChangeLog::default();
        let mut finished: HashMap<ElementId, Element> = HashMap::new();
        let mut graphs: Vec<ElementGraph> = Vec::new();
        let mut roots: Vec<(String, ElementId, usize)> = Vec::new();

        for component in fg.components() {
            if component.is_rootless() {
                for element in self.clear_rootless(unit, &scope, component, &mut changed)? {
                    finished.insert(element.id.clone(), element);
                }
                continue;
            }
            let graph = self.hydrate(unit, &scope, component)?;
            for id in &component.roots {
                if let Some(v) = graph.node(id) {
                    let e = graph.element(v);
                    roots.push((e.name.clone(), e.id.clone(), graphs.len()));
                }
            }
            graphs.push(graph);
        }

        // Components are walked once each, in the order of their first root by name.
        roots.sort();
        debug!(roots = roots.len(), components = fg.components().len(), "walking roots");
        let mut starts: Vec<Vec<NodeIndex>> = vec![Vec::new(); graphs.len()];
        let mut order: Vec<usize> = Vec::new();
        for (_, id, slot) in &roots {
            if let Some(v) = graphs[*slot].node(id) {
                if starts[*slot].is_empty() {
                    order.push(*slot);
                }
                starts[*slot].push(v);
            }
        }
        for slot in order {
            Walk::new(&scope, &mut graphs[slot], &mut changed).run(&starts[slot]);
        }

        for graph in graphs {
            trace_graph(&graph, &scope);
            for element in graph.into_elements() {
                finished.entry(element.id.clone()).or_insert(element);
            }
        }

        let saved = self.save_changed(changed, finished)?;
        info!(changed = saved.len(), elapsed = ?started.elapsed(), "impact inheritance updated");
        Ok(saved)
    }

    /// Recomputes the connected component of `affected`, starting the walk at `affected`.
    #[instrument(skip_all, fields(unit = %unit.id, domain = %domain.id, rd = risk_definition_id, element = %affected))]
    pub fn calculate_impact_inheritance(
        &self,
        unit: &Unit,
        domain: &Domain,
        risk_definition_id: &str,
        affected: &ElementId,
    ) -> Result<Vec<Element>, RiskError> {
        let Some(scope) = self.scope(unit, domain, risk_definition_id) else {
            return Ok(Vec::new());
        };
        let Some(fg) = self.load_flyweights(unit, &scope)? else {
            return Ok(Vec::new());
        };
        let Some(component) = fg.component_of(affected) else {
            debug!("element has no inheriting links");
            return Ok(Vec::new());
        };

        let mut graph = self.hydrate(unit, &scope, component)?;
        let Some(start) = graph.node(affected) else {
            debug!("element is not risk affected");
            return Ok(Vec::new());
        };

        let mut changed = ChangeLog::default();
        Walk::new(&scope, &mut graph, &mut changed).run(&[start]);
        trace_graph(&graph, &scope);

        let finished = graph.into_elements().into_iter().map(|e| (e.id.clone(), e)).collect();
        self.save_changed(changed, finished)
    }

    /// Runs `calculate_impact_inheritance` for every risk definition of the domain that has inheriting links.
    pub fn update_impact_inheritance(
        &self,
        unit: &Unit,
        domain: &Domain,
        affected: &ElementId,
    ) -> Result<Vec<Element>, RiskError> {
        self.for_each_risk_definition(domain, |_| true, |rd| {
            self.calculate_impact_inheritance(unit, domain, rd, affected)
        })
    }

    /// Like `update_impact_inheritance`, limited to risk definitions for which `link_type` inherits impacts.
    pub fn update_impact_inheritance_for_link_type(
        &self,
        unit: &Unit,
        domain: &Domain,
        affected: &ElementId,
        link_type: &str,
    ) -> Result<Vec<Element>, RiskError> {
        self.for_each_risk_definition(
            domain,
            |rd| domain.risk_definition(rd).map_or(false, |d| d.is_inheriting_link_type(link_type)),
            |rd| self.calculate_impact_inheritance(unit, domain, rd, affected),
        )
    }

    /// Recomputes all roots of the unit for every domain it is associated with.
    #[instrument(skip_all, fields(unit = %unit.id))]
    pub fn update_all_root_nodes_for_unit(&self, unit: &Unit, client: &Client) -> Result<Vec<Element>, RiskError> {
        let mut merged = Merged::default();
        for domain_id in &unit.domains {
            let domain = client.domain(domain_id).ok_or_else(|| RiskError::UnknownDomain(domain_id.clone()))?;
            for rd in domain.inheriting_risk_definitions() {
                merged.extend(self.update_all_root_nodes(unit, domain, &rd.id)?);
            }
        }
        Ok(merged.into_vec())
    }

    fn for_each_risk_definition(
        &self,
        domain: &Domain,
        filter: impl Fn(&str) -> bool,
        mut run: impl FnMut(&str) -> Result<Vec<Element>, RiskError>,
    ) -> Result<Vec<Element>, RiskError> {
        let mut merged = Merged::default();
        for rd in domain.inheriting_risk_definitions().filter(|rd| filter(&rd.id)) {
            merged.extend(run(&rd.id)?);
        }
        Ok(merged.into_vec())
    }

    // --- Steps ---

    fn scope<'d>(&self, unit: &Unit, domain: &'d Domain, risk_definition_id: &str) -> Option<Scope<'d>> {
        if !unit.is_associated_with(&domain.id) {
            debug!("unit is not associated with the domain, inheritance inactive");
            return None;
        }
        let Some(rd) = domain.risk_definition(risk_definition_id) else {
            debug!("unknown risk definition, inheritance inactive");
            return None;
        };
        let link_types = rd.inheriting_link_types();
        if link_types.is_empty() {
            debug!("no impact inheriting links defined, inheritance inactive");
            return None;
        }
        if rd.categories.is_empty() {
            debug!("no categories defined, inheritance inactive");
            return None;
        }
        Some(Scope { domain, rd: rd.to_ref(), categories: rd.category_refs().into_iter().collect(), link_types })
    }

    fn load_flyweights(&self, unit: &Unit, scope: &Scope<'_>) -> Result<Option<FlyweightGraph>, RiskError> {
        let flyweights = self.flyweights.find_all_links_grouped_by_element(
            &scope.link_types,
            &scope.domain.id,
            &unit.id,
            &unit.client,
        )?;
        let fg = FlyweightGraph::build(&flyweights);
        if fg.is_empty() {
            debug!("no linked elements, nothing to inherit");
            return Ok(None);
        }
        debug!(vertices = fg.vertex_count(), edges = fg.edge_count(), "flyweight graph loaded");
        Ok(Some(fg))
    }

    fn hydrate(&self, unit: &Unit, scope: &Scope<'_>, component: &FlyweightComponent) -> Result<ElementGraph, RiskError> {
        let elements = self.elements.find_risk_affected(&unit.id, &scope.domain.id, Some(&component.members))?;
        Ok(ElementGraph::build(elements, &scope.domain.id, &scope.link_types))
    }

    fn clear_rootless(
        &self,
        unit: &Unit,
        scope: &Scope<'_>,
        component: &FlyweightComponent,
        changed: &mut ChangeLog,
    ) -> Result<Vec<Element>, RiskError> {
        warn!(members = component.members.len(), "component without roots, clearing inherited impacts");
        let mut elements = self.elements.find_risk_affected(&unit.id, &scope.domain.id, Some(&component.members))?;
        elements.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        for element in &mut elements {
            if clear_calculated(element, scope) {
                changed.record(&element.id);
            }
        }
        Ok(elements)
    }

    fn save_changed(&self, changed: ChangeLog, mut finished: HashMap<ElementId, Element>) -> Result<Vec<Element>, RiskError> {
        let mut saved = Vec::with_capacity(changed.order.len());
        for id in changed.order {
            if let Some(element) = finished.remove(&id) {
                saved.push(self.elements.save(element)?);
            }
        }
        Ok(saved)
    }
}

fn trace_graph(graph: &ElementGraph, scope: &Scope<'_>) {
    trace!("hydrated graph:\n{}", trace::to_dot(graph));
    trace!("{}", trace::format_impacts(graph, &scope.domain.id, &scope.rd));
}

/// Returns `false` if the element holds no impact values for the scope.
fn clear_calculated(element: &mut Element, scope: &Scope<'_>) -> bool {
    match element.impact_values_mut(&scope.domain.id, &scope.rd) {
        Some(values) => {
            values.calculated.clear();
            true
        }
        None => false,
    }
}

/// Highest effective impact per category over `sources`. Categories without any value stay absent.
pub fn high_watermark<'e>(
    sources: impl IntoIterator<Item = &'e ImpactValues>,
    categories: &BTreeSet<CategoryRef>,
) -> BTreeMap<CategoryRef, ImpactRef> {
    let mut max: BTreeMap<CategoryRef, ImpactRef> = BTreeMap::new();
    for values in sources {
        for (category, impact) in values.effective() {
            if !categories.contains(&category) {
                continue;
            }
            max.entry(category)
                .and_modify(|m| {
                    if impact > *m {
                        *m = impact
                    }
                })
                .or_insert(impact);
        }
    }
    max
}

// --- Walk ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Step {
    Compute(NodeIndex),
    /// Clears the whole cycle containing the vertex.
    ClearCycle(NodeIndex),
}

/// Orders the walk below `starts`.
///
/// Every vertex reachable from `starts` without passing through a cycle is
/// computed exactly once, after all of its predecessors in that region. Ready
/// vertices are taken by (name, id). A cycle is cleared when it is first
/// reached and nothing below it is visited.
fn plan(graph: &ElementGraph, starts: &[NodeIndex]) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut cleared: HashSet<NodeIndex> = HashSet::new();
    for &v in starts.iter().filter(|&&v| graph.is_in_cycle(v)) {
        push_clear(graph, v, &mut cleared, &mut steps);
    }

    let mut region: HashSet<NodeIndex> = HashSet::new();
    let mut stack: Vec<NodeIndex> = starts.to_vec();
    while let Some(v) = stack.pop() {
        if !graph.is_in_cycle(v) && region.insert(v) {
            stack.extend(graph.successors_by_name(v));
        }
    }

    let key = move |v: NodeIndex| {
        let e = graph.element(v);
        (e.name.as_str(), e.id.as_str(), v)
    };
    let mut pending: HashMap<NodeIndex, usize> = region
        .iter()
        .map(|&v| (v, graph.predecessors(v).iter().filter(|&&p| region.contains(&p)).count()))
        .collect();
    let mut ready: BTreeSet<(&str, &str, NodeIndex)> =
        pending.iter().filter(|(_, &n)| n == 0).map(|(&v, _)| key(v)).collect();

    while let Some((_, _, v)) = ready.pop_first() {
        steps.push(Step::Compute(v));
        for target in graph.successors_by_name(v) {
            if graph.is_in_cycle(target) {
                push_clear(graph, target, &mut cleared, &mut steps);
                continue;
            }
            if let Some(n) = pending.get_mut(&target) {
                *n -= 1;
                if *n == 0 {
                    ready.insert(key(target));
                }
            }
        }
    }
    steps
}

fn push_clear(graph: &ElementGraph, v: NodeIndex, cleared: &mut HashSet<NodeIndex>, steps: &mut Vec<Step>) {
    if cleared.contains(&v) {
        return;
    }
    cleared.extend(graph.cycle_containing(v));
    steps.push(Step::ClearCycle(v));
}

struct Walk<'s, 'g> {
    scope: &'s Scope<'s>,
    graph: &'g mut ElementGraph,
    changed: &'g mut ChangeLog,
}

impl<'s, 'g> Walk<'s, 'g> {
    fn new(scope: &'s Scope<'s>, graph: &'g mut ElementGraph, changed: &'g mut ChangeLog) -> Self {
        Self { scope, graph, changed }
    }

    fn run(&mut self, starts: &[NodeIndex]) {
        for step in plan(self.graph, starts) {
            match step {
                Step::Compute(v) => self.compute(v),
                Step::ClearCycle(v) => self.clear_cycle(v),
            }
        }
    }

    fn compute(&mut self, v: NodeIndex) {
        let calculated = {
            let (domain, rd) = (&self.scope.domain.id, &self.scope.rd);
            let preds = self.graph.predecessors(v);
            let sources = preds.iter().filter_map(|&p| self.graph.element(p).impact_values(domain, rd));
            high_watermark(sources, &self.scope.categories)
        };

        let element = self.graph.element_mut(v);
        match element.impact_values_mut(&self.scope.domain.id, &self.scope.rd) {
            Some(values) => values.calculated = calculated,
            None => element.set_impact_values(&self.scope.domain.id, &self.scope.rd, ImpactValues::with_calculated(calculated)),
        }
        self.changed.record(&element.id);
    }

    fn clear_cycle(&mut self, v: NodeIndex) {
        let members = self.graph.cycle_containing(v);
        debug!(size = members.len(), element = %self.graph.element(v).id, "cycle detected, clearing inherited impacts");
        for member in members {
            let element = self.graph.element_mut(member);
            if clear_calculated(element, self.scope) {
                self.changed.record(&element.id);
            }
        }
    }
}

/// Results of several calculations, one entry per element, latest version winning.
#[derive(Default)]
struct Merged {
    order: Vec<ElementId>,
    latest: HashMap<ElementId, Element>,
}

impl Merged {
    fn extend(&mut self, elements: Vec<Element>) {
        for element in elements {
            if !self.latest.contains_key(&element.id) {
                self.order.push(element.id.clone());
            }
            self.latest.insert(element.id.clone(), element);
        }
    }

    fn into_vec(mut self) -> Vec<Element> {
        self.order.into_iter().filter_map(|id| self.latest.remove(&id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::model::RiskDefinition;
    use crate::store::{ElementType, Registry};
    use crate::testing::*;

    fn run_all(reg: &Registry, rd: RiskDefinition) -> Vec<Element> {
        let domain = domain(rd);
        ImpactInheritanceCalculator::new(reg, reg).update_all_root_nodes(&unit(), &domain, "rd").unwrap()
    }

    fn asset(id: &str) -> Element { element(id, &id.to_uppercase(), ElementType::Asset) }

    fn linked(id: &str, targets: &[&str]) -> Element {
        let mut e = asset(id);
        for t in targets {
            link_to(&mut e, t);
        }
        e
    }

    fn ids(elements: &[Element]) -> Vec<&str> { elements.iter().map(|e| e.id.as_str()).collect() }

    #[test]
    fn test_end_to_end_inheritance_then_cycle() {
        let rd = risk_definition("rd", &["C1", "C2"]);
        let a = with_explicit(linked("a", &["b"]), &[("C1", 2), ("C2", 1)]);
        let reg = registry(vec![a, asset("b")]);

        run_all(&reg, rd.clone());
        assert_eq!(calculated(&reg, "b"), impacts(&[("C1", 2), ("C2", 1)]));

        // Close the loop B -> A
        let mut b = reg.get(&ElementId::from("b")).unwrap();
        link_to(&mut b, "a");
        reg.insert(b).unwrap();

        let changed = run_all(&reg, rd);
        assert_eq!(ids(&changed), vec!["a", "b"]);
        assert!(calculated(&reg, "a").is_empty());
        assert!(calculated(&reg, "b").is_empty());
        // Explicit values survive
        let a = reg.get(&ElementId::from("a")).unwrap();
        assert_eq!(a.impact_values(&domain_id(), &rd_ref()).unwrap().explicit, impacts(&[("C1", 2), ("C2", 1)]));
    }

    #[test]
    fn test_max_aggregation_over_predecessors() {
        // a{C1:1,C2:2} -> c, b{C1:2} -> c
        let rd = risk_definition("rd", &["C1", "C2"]);
        let a = with_explicit(linked("a", &["c"]), &[("C1", 1), ("C2", 2)]);
        let b = with_explicit(linked("b", &["c"]), &[("C1", 2)]);
        let reg = registry(vec![a, b, asset("c")]);

        run_all(&reg, rd);

        assert_eq!(calculated(&reg, "c"), impacts(&[("C1", 2), ("C2", 2)]));
        assert!(calculated(&reg, "a").is_empty());
    }

    #[test]
    fn test_missing_predecessor_values_leave_category_absent() {
        let rd = risk_definition("rd", &["C1", "C2"]);
        let a = with_explicit(linked("a", &["b"]), &[("C1", 1)]);
        let reg = registry(vec![a, asset("b")]);

        run_all(&reg, rd);

        let b = calculated(&reg, "b");
        assert_eq!(b.get(&CategoryRef::from("C1")), Some(&ImpactRef(1)));
        assert!(!b.contains_key(&CategoryRef::from("C2")));
    }

    #[test]
    fn test_inheritance_chains_through_calculated_values() {
        // a{C1:2} -> b -> c, b has an explicit lower value that wins for its own effective impact
        let rd = risk_definition("rd", &["C1"]);
        let a = with_explicit(linked("a", &["b"]), &[("C1", 2)]);
        let b = with_explicit(linked("b", &["c"]), &[("C1", 0)]);
        let reg = registry(vec![a, b, asset("c")]);

        run_all(&reg, rd);

        assert_eq!(calculated(&reg, "b"), impacts(&[("C1", 2)]));
        assert_eq!(calculated(&reg, "c"), impacts(&[("C1", 0)]));
    }

    #[test]
    fn test_rootless_component_is_cleared_while_others_compute() {
        let rd = risk_definition("rd", &["C1"]);
        let x = ImpactValues::with_calculated(impacts(&[("C1", 2)]));
        let mut cyc_x = linked("x", &["y"]);
        cyc_x.set_impact_values(&domain_id(), &rd_ref(), x.clone());
        let mut cyc_y = linked("y", &["x"]);
        cyc_y.set_impact_values(&domain_id(), &rd_ref(), x);
        let a = with_explicit(linked("a", &["b"]), &[("C1", 1)]);
        let reg = registry(vec![a, asset("b"), cyc_x, cyc_y]);

        let changed = run_all(&reg, rd);

        assert!(calculated(&reg, "x").is_empty());
        assert!(calculated(&reg, "y").is_empty());
        assert_eq!(calculated(&reg, "b"), impacts(&[("C1", 1)]));
        let mut all = ids(&changed);
        all.sort();
        assert_eq!(all, vec!["a", "b", "x", "y"]);
    }

    #[test]
    fn test_cycle_below_root_stops_descent() {
        // r -> a <-> b -> c
        let rd = risk_definition("rd", &["C1"]);
        let r = with_explicit(linked("r", &["a"]), &[("C1", 2)]);
        let stale = ImpactValues::with_calculated(impacts(&[("C1", 1)]));
        let mut a = linked("a", &["b"]);
        a.set_impact_values(&domain_id(), &rd_ref(), stale.clone());
        let mut b = linked("b", &["a", "c"]);
        b.set_impact_values(&domain_id(), &rd_ref(), stale.clone());
        let mut c = asset("c");
        c.set_impact_values(&domain_id(), &rd_ref(), stale);
        let reg = registry(vec![r, a, b, c]);

        let changed = run_all(&reg, rd);

        assert_eq!(ids(&changed), vec!["r", "a", "b"]);
        assert!(calculated(&reg, "a").is_empty());
        assert!(calculated(&reg, "b").is_empty());
        assert_eq!(calculated(&reg, "c"), impacts(&[("C1", 1)]));
    }

    #[test]
    fn test_roots_and_targets_walk_in_name_order() {
        let rd = risk_definition("rd", &["C1"]);
        let mut z = element("z", "Alpha", ElementType::Asset);
        link_to(&mut z, "m");
        link_to(&mut z, "k");
        let reg = registry(vec![
            z,
            element("m", "Beta", ElementType::Asset),
            element("k", "Gamma", ElementType::Asset),
            linked("q", &["n"]),
            element("n", "Delta", ElementType::Asset),
        ]);

        let changed = run_all(&reg, rd);
        assert_eq!(ids(&changed), vec!["z", "m", "k", "q", "n"]);
    }

    #[test]
    fn test_update_is_idempotent() {
        let rd = risk_definition("rd", &["C1", "C2"]);
        let a = with_explicit(linked("a", &["b", "c"]), &[("C1", 2), ("C2", 1)]);
        let reg = registry(vec![a, linked("b", &["c"]), asset("c")]);

        let first = run_all(&reg, rd.clone());
        let snapshot: Vec<_> = ["a", "b", "c"].iter().map(|id| calculated(&reg, id)).collect();
        let second = run_all(&reg, rd);
        let again: Vec<_> = ["a", "b", "c"].iter().map(|id| calculated(&reg, id)).collect();

        assert_eq!(snapshot, again);
        assert_eq!(first, second);
    }

    #[test]
    fn test_inactive_inheritance_returns_empty() {
        let reg = registry(vec![with_explicit(linked("a", &["b"]), &[("C1", 2)]), asset("b")]);
        let calc = ImpactInheritanceCalculator::new(&reg, &reg);

        let mut no_links = risk_definition("rd", &["C1"]);
        no_links.impact_inheriting_links.clear();
        assert!(calc.update_all_root_nodes(&unit(), &domain(no_links), "rd").unwrap().is_empty());

        let no_categories = risk_definition("rd", &[]);
        assert!(calc.update_all_root_nodes(&unit(), &domain(no_categories), "rd").unwrap().is_empty());

        let rd = risk_definition("rd", &["C1"]);
        assert!(calc.update_all_root_nodes(&unit(), &domain(rd.clone()), "unknown").unwrap().is_empty());

        let mut detached = unit();
        detached.domains.clear();
        assert!(calc.update_all_root_nodes(&detached, &domain(rd), "rd").unwrap().is_empty());
        assert!(calculated(&reg, "b").is_empty());
    }

    #[test]
    fn test_incremental_walk_starts_at_affected() {
        let rd = risk_definition("rd", &["C1"]);
        let a = with_explicit(linked("a", &["b"]), &[("C1", 2)]);
        let reg = registry(vec![a, linked("b", &["c"]), asset("c"), asset("lonely")]);
        let domain = domain(rd);
        let calc = ImpactInheritanceCalculator::new(&reg, &reg);

        let changed = calc.calculate_impact_inheritance(&unit(), &domain, "rd", &ElementId::from("b")).unwrap();
        assert_eq!(ids(&changed), vec!["b", "c"]);
        assert_eq!(calculated(&reg, "c"), impacts(&[("C1", 2)]));

        let none = calc.calculate_impact_inheritance(&unit(), &domain, "rd", &ElementId::from("lonely")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_incremental_walk_clears_cycle_of_affected() {
        let rd = risk_definition("rd", &["C1"]);
        let mut a = linked("a", &["b"]);
        a.set_impact_values(&domain_id(), &rd_ref(), ImpactValues::with_calculated(impacts(&[("C1", 1)])));
        let reg = registry(vec![a, linked("b", &["a"])]);
        let calc = ImpactInheritanceCalculator::new(&reg, &reg);

        let changed = calc.calculate_impact_inheritance(&unit(), &domain(rd), "rd", &ElementId::from("b")).unwrap();

        // b holds no values for the risk definition, so there is nothing to clear or save
        assert_eq!(ids(&changed), vec!["a"]);
        assert!(calculated(&reg, "a").is_empty());
        assert!(reg.get(&ElementId::from("b")).unwrap().impact_values(&domain_id(), &rd_ref()).is_none());
    }

    #[test]
    fn test_rootless_members_without_values_are_not_saved() {
        let rd = risk_definition("rd", &["C1"]);
        let mut x = linked("x", &["y"]);
        x.set_impact_values(&domain_id(), &rd_ref(), ImpactValues::with_calculated(impacts(&[("C1", 2)])));
        let reg = registry(vec![x, linked("y", &["x"])]);

        let changed = run_all(&reg, rd);

        assert_eq!(ids(&changed), vec!["x"]);
        assert!(calculated(&reg, "x").is_empty());
    }

    #[test]
    fn test_long_chain_is_walked_without_recursion() {
        const LEN: usize = 20_000;
        let rd = risk_definition("rd", &["C1"]);
        let mut chain: Vec<Element> = (0..LEN)
            .map(|i| {
                let mut e = element(&format!("e{}", i), &format!("E{:05}", i), ElementType::Asset);
                if i + 1 < LEN {
                    link_to(&mut e, &format!("e{}", i + 1));
                }
                e
            })
            .collect();
        chain[0] = with_explicit(chain[0].clone(), &[("C1", 2)]);
        let reg = registry(chain);

        let changed = run_all(&reg, rd);

        assert_eq!(changed.len(), LEN);
        assert_eq!(changed[1].id.as_str(), "e1");
        assert_eq!(calculated(&reg, &format!("e{}", LEN - 1)), impacts(&[("C1", 2)]));
    }

    /// `top` over `depth` layers of two vertices, each linked to both vertices of the next layer.
    fn diamond_ladder(depth: usize) -> Vec<Element> {
        let layer = |i: usize| [format!("l{:02}a", i), format!("l{:02}b", i)];
        let mut top = with_explicit(asset("top"), &[("C1", 2)]);
        for id in layer(0) {
            link_to(&mut top, &id);
        }
        let mut out = vec![top];
        for i in 0..depth {
            for id in layer(i) {
                let mut e = asset(&id);
                if i + 1 < depth {
                    for next in layer(i + 1) {
                        link_to(&mut e, &next);
                    }
                }
                out.push(e);
            }
        }
        out
    }

    #[test]
    fn test_diamond_ladder_computes_each_vertex_once() {
        let types: BTreeSet<String> = [LINK.to_string()].into_iter().collect();
        let graph = ElementGraph::build(diamond_ladder(40), &domain_id(), &types);
        let top = graph.node(&ElementId::from("top")).unwrap();

        let steps = plan(&graph, &[top]);

        assert_eq!(steps.len(), graph.len());
        let unique: HashSet<_> = steps.iter().collect();
        assert_eq!(unique.len(), steps.len());
        assert_eq!(steps[0], Step::Compute(top));
        // Layer by layer, name order inside a layer
        let second = graph.node(&ElementId::from("l00b")).unwrap();
        assert_eq!(steps[2], Step::Compute(second));
    }

    #[test]
    fn test_diamond_ladder_propagates_to_the_bottom() {
        let rd = risk_definition("rd", &["C1"]);
        let reg = registry(diamond_ladder(40));

        let changed = run_all(&reg, rd);

        assert_eq!(changed.len(), 81);
        assert_eq!(calculated(&reg, "l39a"), impacts(&[("C1", 2)]));
        assert_eq!(calculated(&reg, "l39b"), impacts(&[("C1", 2)]));
    }

    #[test]
    fn test_link_type_filter_selects_risk_definitions() {
        let rd = risk_definition("rd", &["C1"]);
        let a = with_explicit(linked("a", &["b"]), &[("C1", 2)]);
        let reg = registry(vec![a, asset("b")]);
        let domain = domain(rd);
        let calc = ImpactInheritanceCalculator::new(&reg, &reg);

        let skipped = calc
            .update_impact_inheritance_for_link_type(&unit(), &domain, &ElementId::from("a"), "unrelated")
            .unwrap();
        assert!(skipped.is_empty());

        let changed = calc
            .update_impact_inheritance_for_link_type(&unit(), &domain, &ElementId::from("a"), LINK)
            .unwrap();
        assert_eq!(ids(&changed), vec!["a", "b"]);
    }

    #[test]
    fn test_unit_update_covers_all_domains() {
        let rd = risk_definition("rd", &["C1"]);
        let a = with_explicit(linked("a", &["b"]), &[("C1", 2)]);
        let reg = registry(vec![a, asset("b")]);
        let calc = ImpactInheritanceCalculator::new(&reg, &reg);

        let changed = calc.update_all_root_nodes_for_unit(&unit(), &client(rd)).unwrap();
        assert_eq!(ids(&changed), vec!["a", "b"]);

        let mut foreign = unit();
        foreign.domains.insert(crate::store::DomainId::from("missing"));
        let err = calc.update_all_root_nodes_for_unit(&foreign, &client(risk_definition("rd", &["C1"]))).unwrap_err();
        assert!(matches!(err, RiskError::UnknownDomain(_)));
    }

    #[test]
    fn test_high_watermark_ignores_foreign_categories() {
        let categories: BTreeSet<CategoryRef> = [CategoryRef::from("C1")].into_iter().collect();
        let a = ImpactValues { explicit: impacts(&[("C1", 1), ("X", 3)]), calculated: impacts(&[("C1", 2)]) };
        let b = ImpactValues::with_calculated(impacts(&[("C1", 0)]));
        assert_eq!(high_watermark([&a, &b], &categories), impacts(&[("C1", 1)]));
    }
}
