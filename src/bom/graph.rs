//! In-memory BOM graph with DAG enforcement
//!
//! # Edge Direction
//!
//! Edges point from the part being built to the part it consumes
//! (`parent → component`). Adding `parent → component` would create a cycle
//! if `parent` is already reachable from `component`.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

use crate::bom::BomError;
use crate::core::identity::PartId;
use crate::entities::BomItem;

/// Weight of a BOM edge
#[derive(Debug, Clone, PartialEq)]
pub struct BomEdge {
    /// Quantity of the component per parent unit
    pub quantity: f64,

    /// Unit of measure for the quantity
    pub unit: String,

    /// Insertion sequence; an upsert keeps the original value
    seq: u64,
}

/// Snapshot of a BOM edge set
///
/// Mutations through [`BomGraph::add_or_update_edge`] keep the graph acyclic.
/// Snapshots loaded with [`BomGraph::from_items`] are taken as-is, so the
/// traversals still guard against cycles on their own.
#[derive(Debug, Clone)]
pub struct BomGraph {
    graph: DiGraphMap<PartId, BomEdge>,
    next_seq: u64,
}

impl Default for BomGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl BomGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraphMap::new(),
            next_seq: 0,
        }
    }

    /// Build a snapshot from stored edges, in the order given
    ///
    /// No validation happens here: the rows come from a store that already
    /// enforced the per-edge rules, and cycles written by other tools are
    /// reported by [`BomGraph::find_cycles`] or rejected during traversal.
    pub fn from_items(items: impl IntoIterator<Item = BomItem>) -> Self {
        let mut graph = Self::new();
        for item in items {
            graph.insert_edge(item.parent, item.component, item.quantity, item.unit);
        }
        tracing::debug!(
            parts = graph.part_count(),
            edges = graph.edge_count(),
            "loaded BOM snapshot"
        );
        graph
    }

    /// Register a part that may not have any edges yet
    pub fn add_part(&mut self, part: PartId) {
        self.graph.add_node(part);
    }

    pub fn contains_part(&self, part: PartId) -> bool {
        self.graph.contains_node(part)
    }

    pub fn part_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Insert or update the `parent → component` edge
    ///
    /// Fails with [`BomError::Validation`] for a self-reference, a
    /// non-positive quantity or a blank unit, and with [`BomError::Cycle`]
    /// if `parent` is reachable from `component`. The graph is unchanged on
    /// every error path. Returns the previous edge when this was an update.
    pub fn add_or_update_edge(
        &mut self,
        parent: PartId,
        component: PartId,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Result<Option<BomEdge>, BomError> {
        let item = BomItem::new(parent, component, quantity, unit)?;

        if let Some(edge) = self.graph.edge_weight_mut(parent, component) {
            let previous = edge.clone();
            edge.quantity = item.quantity;
            edge.unit = item.unit;
            return Ok(Some(previous));
        }

        if let Some(cycle) = self.would_create_cycle(parent, component) {
            let path: Vec<String> = cycle.iter().map(ToString::to_string).collect();
            tracing::warn!(cycle = %path.join(" -> "), "rejected BOM edge");
            return Err(BomError::Cycle { path });
        }

        self.insert_edge(parent, component, item.quantity, item.unit);
        Ok(None)
    }

    fn insert_edge(&mut self, parent: PartId, component: PartId, quantity: f64, unit: String) {
        if let Some(edge) = self.graph.edge_weight_mut(parent, component) {
            edge.quantity = quantity;
            edge.unit = unit;
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.graph
            .add_edge(parent, component, BomEdge { quantity, unit, seq });
    }

    /// Remove the `parent → component` edge; absent edges are not an error
    pub fn remove_edge(&mut self, parent: PartId, component: PartId) -> Option<BomEdge> {
        self.graph.remove_edge(parent, component)
    }

    pub fn edge(&self, parent: PartId, component: PartId) -> Option<&BomEdge> {
        self.graph.edge_weight(parent, component)
    }

    /// Direct components of `part`, in insertion order
    pub fn children(&self, part: PartId) -> Vec<BomItem> {
        self.adjacent(part, Direction::Outgoing)
    }

    /// Direct parents of `part` (where-used), in insertion order
    pub fn where_used(&self, part: PartId) -> Vec<BomItem> {
        self.adjacent(part, Direction::Incoming)
    }

    fn adjacent(&self, part: PartId, direction: Direction) -> Vec<BomItem> {
        if !self.graph.contains_node(part) {
            return Vec::new();
        }
        let mut edges: Vec<(u64, BomItem)> = self
            .graph
            .neighbors_directed(part, direction)
            .filter_map(|other| {
                let (parent, component) = match direction {
                    Direction::Outgoing => (part, other),
                    Direction::Incoming => (other, part),
                };
                self.graph.edge_weight(parent, component).map(|edge| {
                    (
                        edge.seq,
                        BomItem {
                            parent,
                            component,
                            quantity: edge.quantity,
                            unit: edge.unit.clone(),
                        },
                    )
                })
            })
            .collect();
        edges.sort_by_key(|(seq, _)| *seq);
        edges.into_iter().map(|(_, item)| item).collect()
    }

    /// Direct component IDs of `part`, in insertion order
    pub(crate) fn child_ids(&self, part: PartId) -> Vec<PartId> {
        self.children(part).into_iter().map(|item| item.component).collect()
    }

    /// All edges in insertion order
    pub fn items(&self) -> Vec<BomItem> {
        let mut edges: Vec<(u64, BomItem)> = self
            .graph
            .all_edges()
            .map(|(parent, component, edge)| {
                (
                    edge.seq,
                    BomItem {
                        parent,
                        component,
                        quantity: edge.quantity,
                        unit: edge.unit.clone(),
                    },
                )
            })
            .collect();
        edges.sort_by_key(|(seq, _)| *seq);
        edges.into_iter().map(|(_, item)| item).collect()
    }

    /// A part with no components is a leaf (raw material or bought part)
    pub fn is_leaf(&self, part: PartId) -> bool {
        self.graph
            .neighbors_directed(part, Direction::Outgoing)
            .next()
            .is_none()
    }

    /// Check whether adding `parent → component` would introduce a cycle
    ///
    /// Returns the cycle the edge would close, formatted as
    /// `parent → component → … → parent`. An existing edge creates no new
    /// cycle and yields `None`.
    pub fn would_create_cycle(&self, parent: PartId, component: PartId) -> Option<Vec<PartId>> {
        if parent == component {
            return Some(vec![parent, parent]);
        }
        if !self.graph.contains_node(component) || self.graph.contains_edge(parent, component) {
            return None;
        }

        // BFS from `component` looking for `parent`
        let mut queue: VecDeque<PartId> = VecDeque::from([component]);
        let mut visited: HashSet<PartId> = HashSet::from([component]);
        let mut came_from: HashMap<PartId, PartId> = HashMap::new();

        while let Some(current) = queue.pop_front() {
            if current == parent {
                return Some(reconstruct_cycle_path(parent, component, &came_from));
            }
            for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if visited.insert(next) {
                    came_from.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        None
    }

    /// Every strongly connected component that forms a cycle
    ///
    /// Empty for any graph built only through `add_or_update_edge`. Each
    /// cycle is sorted, and the list of cycles is sorted.
    pub fn find_cycles(&self) -> Vec<Vec<PartId>> {
        let mut cycles: Vec<Vec<PartId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1
                    || scc
                        .first()
                        .is_some_and(|part| self.graph.contains_edge(*part, *part))
            })
            .map(|mut scc| {
                scc.sort_unstable();
                scc
            })
            .collect();
        cycles.sort_unstable();
        cycles
    }
}

fn reconstruct_cycle_path(
    parent: PartId,
    component: PartId,
    came_from: &HashMap<PartId, PartId>,
) -> Vec<PartId> {
    // came_from links describe component -> ... -> parent; walk it backwards
    let mut back: Vec<PartId> = vec![parent];
    let mut cursor = parent;
    while cursor != component {
        match came_from.get(&cursor) {
            Some(prev) => {
                cursor = *prev;
                back.push(cursor);
            }
            None => break,
        }
    }
    back.reverse();

    let mut cycle = Vec::with_capacity(back.len() + 1);
    cycle.push(parent);
    cycle.extend(back);
    cycle
}
