//! Multi-level BOM traversals: explosion, cost rollup and indented trees
//!
//! Quantities multiply along each path (a wheel needing 36 spokes inside a
//! bike needing 2 wheels needs 72 spokes per bike) and are summed when the
//! same leaf is reached through several paths.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::bom::{BomError, BomGraph};
use crate::core::identity::PartId;

/// One lowest-level requirement of an explosion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplodedLine {
    pub part: PartId,
    /// Total quantity for the exploded root quantity
    pub quantity: f64,
    pub unit: String,
    /// Shallowest level the part appears at (root = 0)
    pub level: usize,
}

/// Flat list of leaf requirements for `root_quantity` units of `root`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explosion {
    pub root: PartId,
    pub root_quantity: f64,
    /// Ordered by part, then unit
    pub lines: Vec<ExplodedLine>,
}

impl Explosion {
    /// Total requirement for a part across all units it appears in
    pub fn quantity_of(&self, part: PartId) -> f64 {
        self.lines
            .iter()
            .filter(|line| line.part == part)
            .map(|line| line.quantity)
            .sum()
    }
}

/// Extended cost of one leaf requirement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostLine {
    pub part: PartId,
    pub quantity: f64,
    pub unit: String,
    pub unit_cost: Option<f64>,
    pub extended_cost: f64,
}

/// Cost of `root_quantity` units of `root`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRollup {
    pub root: PartId,
    pub root_quantity: f64,
    pub lines: Vec<CostLine>,
    pub total: f64,
    /// Leaves without a unit cost; they contribute zero to the total
    pub unpriced: Vec<PartId>,
}

/// One row of an indented BOM
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeLine {
    /// Depth below the root (direct components are level 1)
    pub level: usize,
    pub parent: PartId,
    pub component: PartId,
    /// Quantity per parent unit
    pub quantity: f64,
    /// Quantity for the requested root quantity
    pub extended_quantity: f64,
    pub unit: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

impl BomGraph {
    /// Expand `root` into its aggregated lowest-level requirements
    ///
    /// A root without components is its own requirement, with an empty unit
    /// since the snapshot holds no part records. Fails with
    /// [`BomError::Cycle`] if a cycle is reachable from `root` and with
    /// [`BomError::DepthExceeded`] if a path is longer than `max_depth`.
    pub fn explode(
        &self,
        root: PartId,
        root_quantity: f64,
        max_depth: usize,
    ) -> Result<Explosion, BomError> {
        crate::entities::bom_item::validate_quantity(root_quantity)?;

        if self.is_leaf(root) {
            return Ok(Explosion {
                root,
                root_quantity,
                lines: vec![ExplodedLine {
                    part: root,
                    quantity: root_quantity,
                    unit: String::new(),
                    level: 0,
                }],
            });
        }

        let order = self.topological_from(root, max_depth)?;

        let mut required: HashMap<PartId, f64> = HashMap::from([(root, root_quantity)]);
        let mut levels: HashMap<PartId, usize> = HashMap::from([(root, 0)]);
        let mut leaves: BTreeMap<(PartId, String), f64> = BTreeMap::new();

        // Parents precede their components in `order`, so a part's total is
        // final by the time its own components are visited
        for part in order {
            let part_quantity = required.get(&part).copied().unwrap_or(0.0);
            let part_level = levels.get(&part).copied().unwrap_or(0);
            for item in self.children(part) {
                let contribution = item.extended(part_quantity);
                *required.entry(item.component).or_insert(0.0) += contribution;
                levels
                    .entry(item.component)
                    .and_modify(|level| *level = (*level).min(part_level + 1))
                    .or_insert(part_level + 1);
                if self.is_leaf(item.component) {
                    *leaves.entry((item.component, item.unit)).or_insert(0.0) += contribution;
                }
            }
        }

        let lines: Vec<ExplodedLine> = leaves
            .into_iter()
            .map(|((part, unit), quantity)| ExplodedLine {
                part,
                quantity,
                unit,
                level: levels.get(&part).copied().unwrap_or(0),
            })
            .collect();

        tracing::debug!(root = %root, leaves = lines.len(), "exploded BOM");
        Ok(Explosion {
            root,
            root_quantity,
            lines,
        })
    }

    /// Sum quantity × unit cost over the exploded leaves of `root`
    ///
    /// Leaves missing from `unit_costs` are priced at zero and listed in
    /// [`CostRollup::unpriced`].
    pub fn rollup_cost(
        &self,
        root: PartId,
        root_quantity: f64,
        unit_costs: &HashMap<PartId, f64>,
        max_depth: usize,
    ) -> Result<CostRollup, BomError> {
        let explosion = self.explode(root, root_quantity, max_depth)?;

        let mut total = 0.0;
        let mut unpriced = Vec::new();
        let lines: Vec<CostLine> = explosion
            .lines
            .into_iter()
            .map(|line| {
                let unit_cost = unit_costs.get(&line.part).copied();
                let extended_cost = unit_cost.map_or(0.0, |cost| cost * line.quantity);
                if unit_cost.is_none() && !unpriced.contains(&line.part) {
                    unpriced.push(line.part);
                }
                total += extended_cost;
                CostLine {
                    part: line.part,
                    quantity: line.quantity,
                    unit: line.unit,
                    unit_cost,
                    extended_cost,
                }
            })
            .collect();

        Ok(CostRollup {
            root,
            root_quantity,
            lines,
            total,
            unpriced,
        })
    }

    /// Depth-first indented view of `root`, expanding shared sub-assemblies
    /// every time they appear
    pub fn tree(
        &self,
        root: PartId,
        root_quantity: f64,
        max_depth: usize,
    ) -> Result<Vec<TreeLine>, BomError> {
        crate::entities::bom_item::validate_quantity(root_quantity)?;

        let mut lines = Vec::new();
        let mut path = vec![root];
        self.walk_tree(root, root_quantity, root, max_depth, &mut path, &mut lines)?;
        Ok(lines)
    }

    fn walk_tree(
        &self,
        part: PartId,
        part_quantity: f64,
        root: PartId,
        max_depth: usize,
        path: &mut Vec<PartId>,
        lines: &mut Vec<TreeLine>,
    ) -> Result<(), BomError> {
        for item in self.children(part) {
            if let Some(pos) = path.iter().position(|p| *p == item.component) {
                let mut cycle: Vec<String> = path[pos..].iter().map(ToString::to_string).collect();
                cycle.push(item.component.to_string());
                return Err(BomError::Cycle { path: cycle });
            }
            let level = path.len();
            if level > max_depth {
                return Err(BomError::DepthExceeded {
                    root: root.to_string(),
                    limit: max_depth,
                });
            }

            let extended_quantity = item.extended(part_quantity);
            lines.push(TreeLine {
                level,
                parent: part,
                component: item.component,
                quantity: item.quantity,
                extended_quantity,
                unit: item.unit.clone(),
            });

            path.push(item.component);
            self.walk_tree(item.component, extended_quantity, root, max_depth, path, lines)?;
            path.pop();
        }
        Ok(())
    }

    /// Parts reachable from `root` (root included), parents before components
    fn topological_from(&self, root: PartId, max_depth: usize) -> Result<Vec<PartId>, BomError> {
        let mut marks: HashMap<PartId, Mark> = HashMap::new();
        let mut path: Vec<PartId> = Vec::new();
        let mut postorder: Vec<PartId> = Vec::new();
        self.visit(root, root, max_depth, &mut marks, &mut path, &mut postorder)?;
        postorder.reverse();
        Ok(postorder)
    }

    fn visit(
        &self,
        part: PartId,
        root: PartId,
        max_depth: usize,
        marks: &mut HashMap<PartId, Mark>,
        path: &mut Vec<PartId>,
        postorder: &mut Vec<PartId>,
    ) -> Result<(), BomError> {
        match marks.get(&part) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Active) => {
                let start = path.iter().position(|p| *p == part).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
                cycle.push(part.to_string());
                return Err(BomError::Cycle { path: cycle });
            }
            None => {}
        }
        if path.len() > max_depth {
            return Err(BomError::DepthExceeded {
                root: root.to_string(),
                limit: max_depth,
            });
        }

        marks.insert(part, Mark::Active);
        path.push(part);
        for child in self.child_ids(part) {
            self.visit(child, root, max_depth, marks, path, postorder)?;
        }
        path.pop();
        marks.insert(part, Mark::Done);
        postorder.push(part);
        Ok(())
    }

    /// Distinct parts appearing anywhere below `root`
    pub fn descendants(&self, root: PartId, max_depth: usize) -> Result<HashSet<PartId>, BomError> {
        let mut parts: HashSet<PartId> = self.topological_from(root, max_depth)?.into_iter().collect();
        parts.remove(&root);
        Ok(parts)
    }
}
