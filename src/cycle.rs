use alloc::{collections::BTreeSet, string::String, vec, vec::Vec};
use tracing::debug;

use crate::{
    diagnostic::{write_trace, NameLegend},
    graph::{BindingGraph, EdgeIndex, Node, NodeIndex},
};

/// How much of the path to a cycle is printed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// Cycle followed by the path from the entry point that first reached it
    EntryPoint,
    /// Cycle alone, followed by the full classname legend
    FullValidation,
}

/// Cycle of synchronous dependency edges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// Edges of the cycle, starting with the edge leaving the participant discovered first
    pub cycle: Vec<EdgeIndex>,
    /// First path from an entry point to the participant discovered first
    pub approach: Vec<EdgeIndex>,
    /// Participants in the order of [`CycleReport::cycle`]
    pub participants: Vec<NodeIndex>,
}

impl CycleReport {
    /// Renders the report in dependency-trace format: each request of the cycle, most dependent first,
    /// then the requests leading from the cycle back to its entry point
    #[must_use]
    pub fn render(&self, graph: &BindingGraph, mode: RenderMode) -> String {
        let mut printed: Vec<EdgeIndex> = self.cycle.iter().rev().copied().collect();
        if mode == RenderMode::EntryPoint {
            printed.extend(self.approach.iter().rev());
        }

        let mut legend = NameLegend::default();
        for edge in &printed {
            if let Some(request) = graph.edge(*edge).request() {
                legend.add_request(request);
            }
        }
        let ambiguous = legend.ambiguous();

        let mut out = String::from("Found a dependency cycle:");
        write_trace(&mut out, graph, printed, &ambiguous);
        if mode == RenderMode::FullValidation {
            out.push_str(&legend.render());
        }
        out
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnStack,
    Done,
}

struct Frame {
    node: NodeIndex,
    incoming: Option<EdgeIndex>,
    next: usize,
}

/// Finds the cycles formed by synchronous dependency edges.
///
/// Deferred requests (providers, lazies, producers) break cycles. Each cycle is reported once,
/// whatever participant the traversal reached it from.
#[must_use]
pub fn find_cycles(graph: &BindingGraph) -> Vec<CycleReport> {
    let mut visits = vec![Visit::New; graph.nodes().len()];
    let mut seen: BTreeSet<Vec<NodeIndex>> = BTreeSet::new();
    let mut reports = Vec::new();

    let components = graph
        .node_indices()
        .filter(|node| matches!(graph.node(*node), Node::Component(_)));
    let roots: Vec<NodeIndex> = components.chain(graph.node_indices()).collect();

    for root in roots {
        if visits[root.get()] != Visit::New {
            continue;
        }
        visits[root.get()] = Visit::OnStack;
        let mut stack = vec![Frame {
            node: root,
            incoming: None,
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(&edge) = graph.outgoing(frame.node).get(frame.next) else {
                visits[frame.node.get()] = Visit::Done;
                stack.pop();
                continue;
            };
            frame.next += 1;

            if !graph.edge(edge).is_synchronous() {
                continue;
            }
            let target = graph.edge(edge).target;
            match visits[target.get()] {
                Visit::New => {
                    visits[target.get()] = Visit::OnStack;
                    stack.push(Frame {
                        node: target,
                        incoming: Some(edge),
                        next: 0,
                    });
                }
                Visit::OnStack => {
                    let Some(start) = stack.iter().position(|frame| frame.node == target) else {
                        continue;
                    };
                    let mut cycle: Vec<EdgeIndex> = stack[start + 1..].iter().filter_map(|frame| frame.incoming).collect();
                    cycle.push(edge);
                    if let Some(report) = report(graph, cycle, &mut seen) {
                        debug!(participants = report.participants.len(), "Cycle found");
                        reports.push(report);
                    }
                }
                Visit::Done => {}
            }
        }
    }
    reports
}

/// Rotates the cycle to start at the participant discovered first, `None` if it was reported already
fn report(graph: &BindingGraph, mut cycle: Vec<EdgeIndex>, seen: &mut BTreeSet<Vec<NodeIndex>>) -> Option<CycleReport> {
    let participants: Vec<NodeIndex> = cycle.iter().map(|edge| graph.edge(*edge).source).collect();
    let mut sorted = participants.clone();
    sorted.sort_unstable();
    if !seen.insert(sorted) {
        return None;
    }

    let first = participants
        .iter()
        .enumerate()
        .min_by_key(|(_, node)| (graph.discovery_depth(**node), **node))
        .map_or(0, |(position, _)| position);
    cycle.rotate_left(first);
    let mut participants = participants;
    participants.rotate_left(first);

    Some(CycleReport {
        approach: graph.first_path(participants[0]),
        cycle,
        participants,
    })
}
