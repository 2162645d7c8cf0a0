use petgraph::algo::kosaraju_scc;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};
use std::collections::HashMap;

/// Strongly connected components of a graph, reduced to the ones that form cycles.
///
/// A vertex is in a cycle when its component has more than one member or the
/// vertex links to itself.
#[derive(Debug, Clone, Default)]
pub struct CycleDetector {
    cycles: Vec<Vec<NodeIndex>>,
    membership: HashMap<NodeIndex, usize>,
}

impl CycleDetector {
    pub fn new<N, E>(graph: &StableDiGraph<N, E>) -> Self {
        let mut detector = Self::default();
        for scc in kosaraju_scc(graph) {
            let cyclic = scc.len() > 1 || scc.first().map_or(false, |&v| graph.find_edge(v, v).is_some());
            if !cyclic {
                continue;
            }
            let slot = detector.cycles.len();
            for &v in &scc {
                detector.membership.insert(v, slot);
            }
            detector.cycles.push(scc);
        }
        detector
    }

    pub fn has_cycles(&self) -> bool { !self.cycles.is_empty() }

    pub fn is_in_cycle(&self, v: NodeIndex) -> bool { self.membership.contains_key(&v) }

    /// Every vertex of the cycle `v` belongs to.
    pub fn cycle_containing(&self, v: NodeIndex) -> Option<&[NodeIndex]> {
        self.membership.get(&v).map(|&slot| self.cycles[slot].as_slice())
    }

    pub fn cycles(&self) -> &[Vec<NodeIndex>] { &self.cycles }
}

/// Groups the vertices of a directed graph into weakly connected components.
///
/// Returns the components in order of their smallest vertex index; vertices
/// inside a component keep index order.
pub fn weak_components<N, E>(graph: &StableDiGraph<N, E>) -> Vec<Vec<NodeIndex>> {
    let bound = graph.node_bound();
    let mut sets = UnionFind::<usize>::new(bound);
    for edge in graph.edge_references() {
        sets.union(edge.source().index(), edge.target().index());
    }

    let mut slots: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Vec<NodeIndex>> = Vec::new();
    for v in graph.node_indices() {
        let root = sets.find(v.index());
        let slot = *slots.entry(root).or_insert_with(|| {
            components.push(Vec::new());
            components.len() - 1
        });
        components[slot].push(v);
    }
    components
}
