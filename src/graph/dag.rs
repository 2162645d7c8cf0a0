//! dag.rs
//! Hydrated element graph of one connected component.
//! Vertices own the elements, edges are the impact-inheriting links between them.

use crate::analysis::topology::CycleDetector;
use crate::store::{DomainId, Element, ElementId};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use smallvec::SmallVec;
use std::cell::OnceCell;
use std::collections::{BTreeSet, HashMap};

pub type Predecessors = SmallVec<[NodeIndex; 4]>;

#[derive(Debug, Clone, Default)]
pub struct ElementGraph {
    pub(crate) graph: StableDiGraph<Element, String>,
    index: HashMap<ElementId, NodeIndex>,
    // Cycle detection runs on first use only.
    cycles: OnceCell<CycleDetector>,
}

impl ElementGraph {
    /// Builds the graph from `elements`, keeping links of `link_types` in `domain`
    /// whose target is also part of `elements`.
    pub fn build(elements: Vec<Element>, domain: &DomainId, link_types: &BTreeSet<String>) -> Self {
        let mut eg = Self::default();
        for element in elements {
            let id = element.id.clone();
            let v = eg.graph.add_node(element);
            eg.index.insert(id, v);
        }

        let mut edges = Vec::new();
        for source in eg.graph.node_indices() {
            for link in eg.graph[source].links_in(domain).filter(|l| link_types.contains(&l.link_type)) {
                if let Some(&target) = eg.index.get(&link.target) {
                    edges.push((source, target, link.link_type.clone()));
                }
            }
        }
        for (source, target, link_type) in edges {
            eg.graph.add_edge(source, target, link_type);
        }
        eg
    }

    pub fn len(&self) -> usize { self.graph.node_count() }
    pub fn is_empty(&self) -> bool { self.graph.node_count() == 0 }
    pub fn edge_count(&self) -> usize { self.graph.edge_count() }

    pub fn node(&self, id: &ElementId) -> Option<NodeIndex> { self.index.get(id).copied() }
    pub fn element(&self, v: NodeIndex) -> &Element { &self.graph[v] }
    pub fn element_mut(&mut self, v: NodeIndex) -> &mut Element { &mut self.graph[v] }

    /// Direct sources of incoming links, each listed once.
    pub fn predecessors(&self, v: NodeIndex) -> Predecessors {
        let mut out: Predecessors = SmallVec::new();
        for p in self.graph.neighbors_directed(v, Direction::Incoming) {
            if !out.contains(&p) {
                out.push(p);
            }
        }
        out
    }

    /// Direct link targets ordered by element name, id breaking ties.
    pub fn successors_by_name(&self, v: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(v, Direction::Outgoing).collect();
        self.sort_by_name(&mut out);
        out.dedup();
        out
    }

    /// Vertices without incoming links, ordered by element name.
    pub fn roots_by_name(&self) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&v| self.graph.neighbors_directed(v, Direction::Incoming).next().is_none())
            .collect();
        self.sort_by_name(&mut out);
        out
    }

    pub fn sort_by_name(&self, vertices: &mut [NodeIndex]) {
        vertices.sort_by(|&a, &b| {
            let (ea, eb) = (&self.graph[a], &self.graph[b]);
            ea.name.cmp(&eb.name).then_with(|| ea.id.cmp(&eb.id))
        });
    }

    fn cycles(&self) -> &CycleDetector { self.cycles.get_or_init(|| CycleDetector::new(&self.graph)) }

    pub fn has_cycles(&self) -> bool { self.cycles().has_cycles() }
    pub fn is_in_cycle(&self, v: NodeIndex) -> bool { self.cycles().is_in_cycle(v) }

    /// Members of the cycle through `v`, ordered by name. Empty if `v` is acyclic.
    pub fn cycle_containing(&self, v: NodeIndex) -> Vec<NodeIndex> {
        let mut members = self.cycles().cycle_containing(v).map(<[_]>::to_vec).unwrap_or_default();
        self.sort_by_name(&mut members);
        members
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> { self.graph.node_weights() }

    pub fn into_elements(self) -> Vec<Element> {
        let mut graph = self.graph;
        let vertices: Vec<NodeIndex> = graph.node_indices().collect();
        vertices.into_iter().filter_map(|v| graph.remove_node(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ElementType;
    use crate::testing::{domain_id, element, link_to, LINK};

    fn types() -> BTreeSet<String> { [LINK.to_string()].into_iter().collect() }

    fn names(g: &ElementGraph, vs: &[NodeIndex]) -> Vec<String> {
        vs.iter().map(|&v| g.element(v).name.clone()).collect()
    }

    #[test]
    fn test_successors_sorted_by_name() {
        let mut root = element("r", "Root", ElementType::Asset);
        link_to(&mut root, "z");
        link_to(&mut root, "y");
        let g = ElementGraph::build(
            vec![root, element("z", "Alpha", ElementType::Asset), element("y", "Beta", ElementType::Asset)],
            &domain_id(),
            &types(),
        );

        let r = g.node(&ElementId::from("r")).unwrap();
        assert_eq!(names(&g, &g.successors_by_name(r)), vec!["Alpha", "Beta"]);
        assert_eq!(names(&g, &g.roots_by_name()), vec!["Root"]);
    }

    #[test]
    fn test_links_to_missing_or_foreign_types_are_dropped() {
        let mut a = element("a", "A", ElementType::Asset);
        link_to(&mut a, "ghost");
        a.links.push(crate::store::CustomLink {
            link_type: "other".into(),
            target: ElementId::from("b"),
            domain: domain_id(),
        });
        let g = ElementGraph::build(vec![a, element("b", "B", ElementType::Asset)], &domain_id(), &types());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_cycle_is_detected_lazily() {
        let mut a = element("a", "A", ElementType::Asset);
        let mut b = element("b", "B", ElementType::Asset);
        link_to(&mut a, "b");
        link_to(&mut b, "a");
        let g = ElementGraph::build(vec![a, b, element("c", "C", ElementType::Asset)], &domain_id(), &types());

        let va = g.node(&ElementId::from("a")).unwrap();
        let vc = g.node(&ElementId::from("c")).unwrap();
        assert!(g.has_cycles());
        assert_eq!(names(&g, &g.cycle_containing(va)), vec!["A", "B"]);
        assert!(!g.is_in_cycle(vc));
        assert!(g.cycle_containing(vc).is_empty());
    }

    #[test]
    fn test_predecessors_are_unique() {
        let mut a = element("a", "A", ElementType::Asset);
        link_to(&mut a, "b");
        link_to(&mut a, "b");
        let g = ElementGraph::build(vec![a, element("b", "B", ElementType::Asset)], &domain_id(), &types());
        let vb = g.node(&ElementId::from("b")).unwrap();
        assert_eq!(g.predecessors(vb).len(), 1);
        assert_eq!(g.successors_by_name(g.node(&ElementId::from("a")).unwrap()).len(), 1);
    }

    #[test]
    fn test_into_elements_returns_every_vertex() {
        let g = ElementGraph::build(
            vec![element("a", "A", ElementType::Asset), element("b", "B", ElementType::Process)],
            &domain_id(),
            &types(),
        );
        assert_eq!(g.into_elements().len(), 2);
    }
}
