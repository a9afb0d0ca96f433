//! Barnes-Hut spatial index.
//!
//! Cells live in a flat arena and refer to each other by index. The tree is built in two passes:
//! a top-down partition that assigns every node to exactly one leaf, then a bottom-up pass that
//! aggregates mass, charge and mass center. Children are always allocated after their parent, so
//! walking the arena in reverse visits every child before its parent.

use crate::geometry::{BoundingBox, Point};

pub type CellId = usize;

#[derive(Debug, Clone)]
pub struct Cell {
    pub bounds: BoundingBox,
    pub parent: Option<CellId>,
    /// Indexed by [`BoundingBox::quadrant_of`]. Empty quadrants are not allocated.
    pub children: [Option<CellId>; 4],
    /// Node indices, populated on leaves only.
    pub members: Vec<usize>,
    pub member_count: usize,
    pub total_mass: f64,
    pub total_charge: f64,
    pub mass_center: Point,
    pub depth: u32,
}

impl Cell {
    fn new(bounds: BoundingBox, parent: Option<CellId>, depth: u32) -> Self {
        Self {
            bounds,
            parent,
            children: [None; 4],
            members: Vec::new(),
            member_count: 0,
            total_mass: 0.0,
            total_charge: 0.0,
            mass_center: bounds.center(),
            depth,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub fn child_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.children.iter().flatten().copied()
    }
}

#[derive(Debug, Clone)]
pub struct QuadTree {
    cells: Vec<Cell>,
    leaf_of: Vec<CellId>,
}

impl QuadTree {
    pub const ROOT: CellId = 0;

    /// Partitioning also stops at this depth, so coincident points terminate even when the
    /// radius threshold is zero.
    pub const MAX_DEPTH: u32 = 64;

    /// Builds the index over `positions`; node `i` is `positions[i]`.
    ///
    /// A cell becomes a leaf when it holds fewer than two nodes or its radius is below
    /// `area_radius_threshold`.
    pub fn build(positions: &[Point], mass: f64, charge: f64, area_radius_threshold: f64) -> Self {
        let bounds = BoundingBox::covering(positions).unwrap_or(BoundingBox {
            center_x: 0.0,
            center_y: 0.0,
            radius: 0.0,
        });
        let mut cells = vec![Cell::new(bounds, None, 0)];
        let mut leaf_of = vec![Self::ROOT; positions.len()];

        let mut pending: Vec<(CellId, Vec<usize>)> =
            vec![(Self::ROOT, (0..positions.len()).collect())];
        while let Some((id, members)) = pending.pop() {
            let bounds = cells[id].bounds;
            let depth = cells[id].depth;
            if members.len() < 2
                || bounds.radius < area_radius_threshold
                || depth >= Self::MAX_DEPTH
            {
                for &m in &members {
                    leaf_of[m] = id;
                }
                cells[id].members = members;
                continue;
            }

            let mut quadrants: [Vec<usize>; 4] = Default::default();
            for m in members {
                quadrants[bounds.quadrant_of(positions[m])].push(m);
            }
            for (q, quadrant_members) in quadrants.into_iter().enumerate() {
                if quadrant_members.is_empty() {
                    continue;
                }
                let child = cells.len();
                cells.push(Cell::new(bounds.quadrant(q), Some(id), depth + 1));
                cells[id].children[q] = Some(child);
                pending.push((child, quadrant_members));
            }
        }

        let mut tree = Self { cells, leaf_of };
        tree.aggregate(positions, mass, charge);
        tree
    }

    fn aggregate(&mut self, positions: &[Point], mass: f64, charge: f64) {
        for id in (0..self.cells.len()).rev() {
            let cell = &self.cells[id];
            let (count, total_mass, total_charge, center) = if cell.is_leaf() {
                let count = cell.members.len();
                let center = if count == 0 {
                    cell.bounds.center()
                } else {
                    let (sx, sy) = cell.members.iter().fold((0.0, 0.0), |(sx, sy), &m| {
                        (sx + positions[m].x, sy + positions[m].y)
                    });
                    Point::new(sx / count as f64, sy / count as f64)
                };
                (
                    count,
                    mass * count as f64,
                    charge * count as f64,
                    center,
                )
            } else {
                let mut count = 0usize;
                let mut total_mass = 0.0;
                let mut total_charge = 0.0;
                for child in cell.child_ids() {
                    let c = &self.cells[child];
                    count += c.member_count;
                    total_mass += c.total_mass;
                    total_charge += c.total_charge;
                }
                // Weight by mass when there is any, by node count otherwise.
                let weight = |c: &Cell| {
                    if total_mass != 0.0 {
                        c.total_mass
                    } else {
                        c.member_count as f64
                    }
                };
                let mut wx = 0.0;
                let mut wy = 0.0;
                let mut w = 0.0;
                for child in cell.child_ids() {
                    let c = &self.cells[child];
                    let cw = weight(c);
                    wx += cw * c.mass_center.x;
                    wy += cw * c.mass_center.y;
                    w += cw;
                }
                let center = if w != 0.0 {
                    Point::new(wx / w, wy / w)
                } else {
                    cell.bounds.center()
                };
                (count, total_mass, total_charge, center)
            };

            let cell = &mut self.cells[id];
            cell.member_count = count;
            cell.total_mass = total_mass;
            cell.total_charge = total_charge;
            cell.mass_center = center;
        }
    }

    pub fn root(&self) -> &Cell {
        &self.cells[Self::ROOT]
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id]
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Leaf holding node `node`.
    pub fn leaf_of(&self, node: usize) -> CellId {
        self.leaf_of[node]
    }

    pub fn leaves(&self) -> impl Iterator<Item = (CellId, &Cell)> + '_ {
        self.cells.iter().enumerate().filter(|(_, c)| c.is_leaf())
    }
}
