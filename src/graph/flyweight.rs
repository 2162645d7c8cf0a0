//! flyweight.rs
//! Id-only graph of a unit's impact-inheriting links. Cheap to build, used to find
//! roots and connected components before anything is hydrated.

use crate::analysis::topology::weak_components;
use crate::store::{ElementId, FlyweightElement};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A weakly connected component of the flyweight graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlyweightComponent {
    pub members: HashSet<ElementId>,
    /// Members without incoming links.
    pub roots: Vec<ElementId>,
}

impl FlyweightComponent {
    pub fn is_rootless(&self) -> bool { self.roots.is_empty() }
}

#[derive(Debug, Clone, Default)]
pub struct FlyweightGraph {
    graph: StableDiGraph<ElementId, String>,
    index: HashMap<ElementId, NodeIndex>,
    components: Vec<FlyweightComponent>,
    component_of: HashMap<ElementId, usize>,
}

impl FlyweightGraph {
    pub fn build(flyweights: &[FlyweightElement]) -> Self {
        let mut fg = Self::default();
        for fw in flyweights {
            fg.vertex(&fw.source_id);
            for link in &fw.links {
                let source = fg.vertex(&link.source_id);
                let target = fg.vertex(&link.target_id);
                fg.graph.add_edge(source, target, link.link_type.clone());
            }
        }

        for (slot, vertices) in weak_components(&fg.graph).into_iter().enumerate() {
            let mut component = FlyweightComponent::default();
            for v in vertices {
                let id = fg.graph[v].clone();
                if fg.in_degree(v) == 0 {
                    component.roots.push(id.clone());
                }
                fg.component_of.insert(id.clone(), slot);
                component.members.insert(id);
            }
            fg.components.push(component);
        }
        fg
    }

    fn vertex(&mut self, id: &ElementId) -> NodeIndex {
        if let Some(&v) = self.index.get(id) {
            return v;
        }
        let v = self.graph.add_node(id.clone());
        self.index.insert(id.clone(), v);
        v
    }

    fn in_degree(&self, v: NodeIndex) -> usize {
        self.graph.neighbors_directed(v, Direction::Incoming).count()
    }

    pub fn is_empty(&self) -> bool { self.graph.node_count() == 0 }
    pub fn vertex_count(&self) -> usize { self.graph.node_count() }
    pub fn edge_count(&self) -> usize { self.graph.edge_count() }
    pub fn contains(&self, id: &ElementId) -> bool { self.index.contains_key(id) }

    /// Vertex ids grouped by their number of incoming links.
    pub fn by_in_degree(&self) -> BTreeMap<usize, Vec<ElementId>> {
        let mut groups: BTreeMap<usize, Vec<ElementId>> = BTreeMap::new();
        for v in self.graph.node_indices() {
            groups.entry(self.in_degree(v)).or_default().push(self.graph[v].clone());
        }
        groups
    }

    pub fn roots(&self) -> Vec<ElementId> { self.by_in_degree().remove(&0).unwrap_or_default() }

    pub fn components(&self) -> &[FlyweightComponent] { &self.components }

    pub fn component_of(&self, id: &ElementId) -> Option<&FlyweightComponent> {
        self.component_of.get(id).map(|&slot| &self.components[slot])
    }
}
