use crate::graph::ElementGraph;
use crate::store::{CategoryRef, DomainId, ImpactRef, RiskDefinitionRef};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Renders the hydrated graph in Graphviz DOT form, vertices labelled by name.
pub fn to_dot(graph: &ElementGraph) -> String {
    let g = &graph.graph;
    let mut out = String::new();
    let _ = writeln!(out, "digraph impact_inheritance {{");
    for v in g.node_indices() {
        let e = &g[v];
        let shape = if graph.is_in_cycle(v) { ", color=red" } else { "" };
        let _ = writeln!(out, "  \"{}\" [label=\"{}\"{}];", e.id, escape(&e.name), shape);
    }
    for edge in g.edge_references() {
        let (s, t) = (&g[edge.source()], &g[edge.target()]);
        let _ = writeln!(out, "  \"{}\" -> \"{}\" [label=\"{}\"];", s.id, t.id, escape(edge.weight()));
    }
    let _ = writeln!(out, "}}");
    out
}

fn escape(s: &str) -> String { s.replace('"', "\\\"") }

/// Audit table listing, per element in name order, the explicit, calculated and
/// effective impacts for one (domain, risk definition).
pub fn format_impacts(graph: &ElementGraph, domain: &DomainId, rd: &RiskDefinitionRef) -> String {
    let mut vertices: Vec<_> = graph.graph.node_indices().collect();
    graph.sort_by_name(&mut vertices);

    let mut out = String::new();
    let _ = writeln!(out, "IMPACT TRACE for '{}' in domain '{}':", rd, domain);
    let _ = writeln!(out, "--------------------------------------------------");
    for v in vertices {
        let e = graph.element(v);
        let marker = if graph.is_in_cycle(v) { " (cycle)" } else { "" };
        match e.impact_values(domain, rd) {
            Some(values) => {
                let _ = writeln!(
                    out,
                    "{}{}: explicit {} | calculated {} | effective {}",
                    e.name,
                    marker,
                    format_map(&values.explicit),
                    format_map(&values.calculated),
                    format_map(&values.effective())
                );
            }
            None => {
                let _ = writeln!(out, "{}{}: -", e.name, marker);
            }
        }
    }
    out
}

fn format_map(map: &BTreeMap<CategoryRef, ImpactRef>) -> String {
    let items: Vec<String> = map.iter().map(|(c, i)| format!("{}={}", c, i.ordinal())).collect();
    format!("{{{}}}", items.join(", "))
}
