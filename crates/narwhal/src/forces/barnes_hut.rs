use super::{NodeForceStrategy, Repulsion};
use crate::geometry::{DistanceVector, Point, Vector};
use crate::quadtree::{Cell, CellId, QuadTree};
use crate::random::RandomSource;
use crate::simulation::SimulationParameters;
use rustc_hash::FxHashMap;

/// Barnes-Hut repulsion over a [`QuadTree`] rebuilt on every call.
///
/// For each node the walk starts at its leaf and climbs towards the root. At every ancestor, each
/// sibling subtree that does not contain the node is either summarised as a single pseudo-node
/// (when `2 * radius < theta * distance`) or expanded until exact members are reached. `theta == 0`
/// never summarises, which reproduces [`super::DirectSum`].
///
/// Coincident nodes always share a leaf. Their fallback direction is drawn once per pair and per
/// call, in the same pair order as [`super::DirectSum`], and both nodes see it with opposite signs.
#[derive(Debug, Clone, PartialEq)]
pub struct BarnesHutApproximation {
    repulsion: Repulsion,
    mass: f64,
    charge: f64,
    theta: f64,
    area_radius_threshold: f64,
}

impl BarnesHutApproximation {
    pub fn from_parameters(params: &SimulationParameters) -> Self {
        Self {
            repulsion: Repulsion::from_parameters(params),
            mass: params.node_mass,
            charge: params.node_charge,
            theta: params.theta,
            area_radius_threshold: params.area_radius_threshold,
        }
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    fn is_far(&self, cell: &Cell, target: Point) -> bool {
        cell.bounds.radius * 2.0 < self.theta * cell.mass_center.distance_to(target)
    }

    /// Force on a node at `target` exerted by a source of charge `source_charge` at `source`.
    fn force_from(
        &self,
        target: Point,
        source: Point,
        source_charge: f64,
        rng: &mut dyn RandomSource,
    ) -> Vector {
        let dv = DistanceVector::between(target, source, rng);
        let f = self.repulsion.magnitude(self.charge, source_charge, dv.d2);
        -dv.direction() * f
    }

    fn members_force(
        &self,
        walk: &Walk<'_>,
        node: usize,
        members: &[usize],
        rng: &mut dyn RandomSource,
    ) -> Vector {
        let target = walk.positions[node];
        let mut total = Vector::zeros();
        for &m in members {
            if m == node {
                continue;
            }
            total += match walk.shared_direction(node, m) {
                Some(low_to_high) => {
                    let f = self.repulsion.magnitude(self.charge, self.charge, 0.0);
                    let sign = if node < m { -1.0 } else { 1.0 };
                    low_to_high * (sign * f)
                }
                None => self.force_from(target, walk.positions[m], self.charge, rng),
            };
        }
        total
    }

    fn subtree_force(
        &self,
        walk: &Walk<'_>,
        subtree: CellId,
        node: usize,
        stack: &mut Vec<CellId>,
        rng: &mut dyn RandomSource,
    ) -> Vector {
        let target = walk.positions[node];
        let mut total = Vector::zeros();
        stack.clear();
        stack.push(subtree);
        while let Some(id) = stack.pop() {
            let cell = walk.tree.cell(id);
            if self.is_far(cell, target) {
                total += self.force_from(target, cell.mass_center, cell.total_charge, rng);
            } else if cell.is_leaf() {
                total += self.members_force(walk, node, &cell.members, rng);
            } else {
                stack.extend(cell.child_ids());
            }
        }
        total
    }
}

/// Per-call state shared by every node's walk.
struct Walk<'a> {
    tree: &'a QuadTree,
    positions: &'a [Point],
    /// Unit directions of coincident member pairs, keyed `(low, high)` and pointing from `low`
    /// to `high`.
    coincident: FxHashMap<(usize, usize), Vector>,
}

impl<'a> Walk<'a> {
    fn new(tree: &'a QuadTree, positions: &'a [Point], rng: &mut dyn RandomSource) -> Self {
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (_, leaf) in tree.leaves() {
            for (k, &a) in leaf.members.iter().enumerate() {
                for &b in &leaf.members[k + 1..] {
                    if coincident(positions[a], positions[b]) {
                        pairs.push((a.min(b), a.max(b)));
                    }
                }
            }
        }
        // Draw in (low, high) order so a seeded source yields the directions exact summation would.
        pairs.sort_unstable();
        let directions = pairs
            .into_iter()
            .map(|(low, high)| {
                let dv = DistanceVector::between(positions[low], positions[high], rng);
                ((low, high), dv.direction())
            })
            .collect();
        Self {
            tree,
            positions,
            coincident: directions,
        }
    }

    fn shared_direction(&self, a: usize, b: usize) -> Option<Vector> {
        if self.coincident.is_empty() {
            return None;
        }
        self.coincident.get(&(a.min(b), a.max(b))).copied()
    }
}

impl NodeForceStrategy for BarnesHutApproximation {
    fn apply(&self, positions: &[Point], forces: &mut [Vector], rng: &mut dyn RandomSource) {
        let n = positions.len().min(forces.len());
        if n < 2 {
            return;
        }
        let positions = &positions[..n];
        let tree = QuadTree::build(positions, self.mass, self.charge, self.area_radius_threshold);
        let walk = Walk::new(&tree, positions, rng);

        let mut stack: Vec<CellId> = Vec::new();
        for (node, force) in forces.iter_mut().enumerate().take(n) {
            let leaf = tree.leaf_of(node);
            let mut total = self.members_force(&walk, node, &tree.cell(leaf).members, rng);

            let mut current = leaf;
            while let Some(parent) = tree.cell(current).parent {
                for sibling in tree.cell(parent).child_ids() {
                    if sibling != current {
                        total += self.subtree_force(&walk, sibling, node, &mut stack, rng);
                    }
                }
                current = parent;
            }

            *force += total;
        }
    }
}

/// Same test [`DistanceVector::between`] uses for its random fallback.
fn coincident(a: Point, b: Point) -> bool {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dx * dx + dy * dy <= 0.0
}

#[cfg(test)]
mod tests {
    use super::BarnesHutApproximation;
    use crate::forces::{DirectSum, NodeForceStrategy};
    use crate::geometry::{Point, Vector};
    use crate::random::XorShift64Star;
    use crate::simulation::SimulationParameters;

    fn params(theta: f64) -> SimulationParameters {
        SimulationParameters {
            node_charge: 30.0,
            max_force: 1e9,
            theta,
            area_radius_threshold: 1e-3,
            ..Default::default()
        }
    }

    fn cloud(n: usize, seed: u64) -> Vec<Point> {
        let mut rng = XorShift64Star::new(seed);
        (0..n)
            .map(|_| Point::new(rng.next_f64_signed() * 500.0, rng.next_f64_signed() * 500.0))
            .collect()
    }

    fn forces_with(strategy: &dyn NodeForceStrategy, positions: &[Point]) -> Vec<Vector> {
        let mut forces = vec![Vector::zeros(); positions.len()];
        let mut rng = XorShift64Star::new(9);
        strategy.apply(positions, &mut forces, &mut rng);
        forces
    }

    #[test]
    fn small_theta_matches_direct_sum() {
        let positions = cloud(60, 5);
        let exact = forces_with(&DirectSum::from_parameters(&params(0.0)), &positions);
        for theta in [0.0, 1e-4, 1e-3] {
            let approx = forces_with(
                &BarnesHutApproximation::from_parameters(&params(theta)),
                &positions,
            );
            for (i, (a, e)) in approx.iter().zip(&exact).enumerate() {
                let err = (a - e).norm() / e.norm().max(1e-12);
                assert!(err < 1e-6, "theta={theta} node={i} rel err={err}");
            }
        }
    }

    #[test]
    fn coincident_nodes_share_one_direction_like_direct_sum() {
        let positions = [Point::new(0.0, 0.0), Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        let exact = forces_with(&DirectSum::from_parameters(&params(0.0)), &positions);
        let approx = forces_with(
            &BarnesHutApproximation::from_parameters(&params(1e-3)),
            &positions,
        );
        for (i, (a, e)) in approx.iter().zip(&exact).enumerate() {
            let err = (a - e).norm() / e.norm().max(1e-12);
            assert!(err < 1e-6, "node={i} rel err={err}: {a:?} vs {e:?}");
        }

        // The coincident pair is pushed apart, not dragged the same way.
        assert!((approx[0] + approx[1] + approx[2]).norm() < 1e-3);
        assert!(approx[0].dot(&approx[1]) < 0.0);
    }

    #[test]
    fn small_theta_matches_direct_sum_on_clusters() {
        let mut positions = cloud(30, 21);
        for k in 0..6 {
            let k = k as f64;
            positions.push(Point::new(123.0 + 1e-4 * k * k, -45.0 + 7e-5 * k));
        }
        let shared = positions[3];
        positions.extend([shared; 3]);

        let exact = forces_with(&DirectSum::from_parameters(&params(0.0)), &positions);
        let scale = exact.iter().map(|e| e.norm()).fold(0.0, f64::max);
        for theta in [1e-4, 1e-3] {
            let approx = forces_with(
                &BarnesHutApproximation::from_parameters(&params(theta)),
                &positions,
            );
            for (i, (a, e)) in approx.iter().zip(&exact).enumerate() {
                let err = (a - e).norm() / scale;
                assert!(err < 1e-6, "theta={theta} node={i} err={err}");
            }
        }
    }

    #[test]
    fn large_theta_stays_close_to_direct_sum() {
        let positions = cloud(200, 17);
        let exact = forces_with(&DirectSum::from_parameters(&params(0.0)), &positions);
        let approx = forces_with(
            &BarnesHutApproximation::from_parameters(&params(0.5)),
            &positions,
        );
        let err: f64 = approx.iter().zip(&exact).map(|(a, e)| (a - e).norm()).sum();
        let scale: f64 = exact.iter().map(|e| e.norm()).sum();
        assert!(err / scale < 0.05, "aggregate rel err={}", err / scale);
    }

    #[test]
    fn two_nodes_repel_like_direct_sum() {
        let positions = [Point::new(10.0, 0.0), Point::new(20.0, 0.0)];
        let forces = forces_with(
            &BarnesHutApproximation::from_parameters(&params(1.0)),
            &positions,
        );
        assert!(forces[0].x < 0.0 && forces[1].x > 0.0);
        assert!((forces[0].x + forces[1].x).abs() < 1e-9);
    }

    #[test]
    fn zero_and_one_node_are_no_ops() {
        let strategy = BarnesHutApproximation::from_parameters(&params(0.8));
        assert!(forces_with(&strategy, &[]).is_empty());
        assert_eq!(
            forces_with(&strategy, &[Point::new(4.0, 2.0)]),
            vec![Vector::zeros()]
        );
    }

    #[test]
    fn nodes_sharing_a_coarse_leaf_still_repel() {
        let p = SimulationParameters {
            area_radius_threshold: 1e6,
            ..params(0.8)
        };
        let positions = [Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(0.0, 5.0)];
        let forces = forces_with(&BarnesHutApproximation::from_parameters(&p), &positions);
        assert!(forces[0].x < 0.0 && forces[0].y < 0.0);
        assert!(forces[1].x > 0.0);
        assert!(forces[2].y > 0.0);
    }
}
