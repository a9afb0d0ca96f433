//! One discrete step of the force simulation.

use crate::forces::{EdgeForceAccumulator, EdgeSpan, NodeForceStrategy, RepulsionStrategy};
use crate::geometry::{Point, Vector};
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};

/// Physical constants of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationParameters {
    pub node_mass: f64,
    pub node_charge: f64,
    /// Scales every repulsive pair force.
    pub repulsion_coefficient: f64,
    /// Edge length at which the spring force vanishes.
    pub equilibrium_length: f64,
    pub stiffness: f64,
    /// Barnes-Hut opening threshold. `0` selects exact pairwise summation.
    pub theta: f64,
    /// Quad-tree cells smaller than this radius are not subdivided further.
    pub area_radius_threshold: f64,
    /// Upper bound of a single repulsive pair force.
    pub max_force: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            node_mass: 1.0,
            node_charge: 100.0,
            repulsion_coefficient: 1.0,
            equilibrium_length: 100.0,
            stiffness: 0.1,
            theta: 0.5,
            area_radius_threshold: 1.0,
            max_force: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepReport {
    /// Largest distance a node travelled during the step.
    pub max_displacement: f64,
    /// Largest speed reached by a node during the step.
    pub max_velocity: f64,
    /// Per-node travelled distance, index-aligned with the positions. Pinned nodes report `0`.
    pub displacements: Vec<f64>,
}

/// Repulsion + springs + a first-order integrator.
///
/// Velocity is recomputed from the current force on every step (`v = F / m * dt`) rather than
/// accumulated, so the model carries no momentum between steps.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationIteration {
    strategy: RepulsionStrategy,
    springs: EdgeForceAccumulator,
    mass: f64,
}

impl SimulationIteration {
    pub fn new(params: &SimulationParameters) -> Self {
        Self::with_strategy(params, RepulsionStrategy::from_parameters(params))
    }

    pub fn with_strategy(params: &SimulationParameters, strategy: RepulsionStrategy) -> Self {
        Self {
            strategy,
            springs: EdgeForceAccumulator::from_parameters(params),
            mass: params.node_mass,
        }
    }

    pub fn strategy(&self) -> &RepulsionStrategy {
        &self.strategy
    }

    /// Advances `positions` by one step of length `dt`.
    ///
    /// `forces` is reset and refilled; it must be as long as `positions`. Nodes flagged in
    /// `pinned` still exert forces but are not moved; a shorter (or empty) `pinned` slice leaves
    /// the remaining nodes free.
    pub fn step(
        &self,
        positions: &mut [Point],
        forces: &mut [Vector],
        edges: &[EdgeSpan],
        pinned: &[bool],
        dt: f64,
        rng: &mut dyn RandomSource,
    ) -> StepReport {
        forces.fill(Vector::zeros());
        self.strategy.apply(positions, forces, rng);
        self.springs.apply(edges, positions, forces, rng);

        let mut report = StepReport {
            displacements: vec![0.0; positions.len()],
            ..Default::default()
        };
        for (idx, (p, f)) in positions.iter_mut().zip(forces.iter()).enumerate() {
            if pinned.get(idx).copied().unwrap_or(false) {
                continue;
            }
            let velocity = (*f / self.mass) * dt;
            let step = velocity * dt;
            *p = p.translate(step);

            let speed = velocity.norm();
            let travelled = step.norm();
            report.max_velocity = report.max_velocity.max(speed);
            report.max_displacement = report.max_displacement.max(travelled);
            report.displacements[idx] = travelled;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::{SimulationIteration, SimulationParameters};
    use crate::forces::EdgeSpan;
    use crate::geometry::{Point, Vector};
    use crate::random::XorShift64Star;

    fn exact(charge: f64) -> SimulationParameters {
        SimulationParameters {
            node_charge: charge,
            theta: 0.0,
            max_force: 1e9,
            ..Default::default()
        }
    }

    fn run(
        params: &SimulationParameters,
        positions: &mut [Point],
        edges: &[EdgeSpan],
        pinned: &[bool],
        dt: f64,
    ) -> super::StepReport {
        let mut forces = vec![Vector::new(123.0, -4.0); positions.len()];
        let mut rng = XorShift64Star::new(1);
        SimulationIteration::new(params).step(positions, &mut forces, edges, pinned, dt, &mut rng)
    }

    #[test]
    fn unconnected_pair_moves_apart() {
        let mut positions = [Point::new(10.0, 0.0), Point::new(20.0, 0.0)];
        let report = run(&exact(100.0), &mut positions, &[], &[], 1.0);
        assert!(positions[0].x < 10.0);
        assert!(positions[1].x > 20.0);
        assert_eq!(positions[0].y, 0.0);
        // F = 100^2 / 10^2, m = 1, dt = 1.
        assert!((report.max_displacement - 100.0).abs() < 1e-9);
        assert!((report.max_velocity - 100.0).abs() < 1e-9);
    }

    #[test]
    fn stale_forces_are_discarded() {
        let mut positions = [Point::new(0.0, 0.0)];
        let report = run(&exact(1.0), &mut positions, &[], &[], 1.0);
        assert_eq!(positions[0], Point::new(0.0, 0.0));
        assert_eq!(report.max_displacement, 0.0);
    }

    #[test]
    fn long_edge_contracts() {
        let params = SimulationParameters {
            node_charge: 1.0,
            equilibrium_length: 50.0,
            stiffness: 0.1,
            ..exact(1.0)
        };
        let mut positions = [Point::new(0.0, 0.0), Point::new(300.0, 0.0)];
        let edges = [EdgeSpan {
            source: 0,
            target: 1,
        }];
        run(&params, &mut positions, &edges, &[], 1.0);
        assert!(positions[0].distance_to(positions[1]) < 300.0);
    }

    #[test]
    fn pinned_nodes_push_but_do_not_move() {
        let mut positions = [Point::new(10.0, 0.0), Point::new(20.0, 0.0)];
        let report = run(&exact(100.0), &mut positions, &[], &[true, false], 1.0);
        assert_eq!(positions[0], Point::new(10.0, 0.0));
        assert!(positions[1].x > 20.0);
        assert_eq!(report.displacements[0], 0.0);
        assert!(report.displacements[1] > 0.0);
    }

    #[test]
    fn displacement_scales_with_dt_squared_and_inverse_mass() {
        let params = SimulationParameters {
            node_mass: 4.0,
            ..exact(100.0)
        };
        let mut positions = [Point::new(10.0, 0.0), Point::new(20.0, 0.0)];
        let report = run(&params, &mut positions, &[], &[], 0.5);
        // 100 / 4 * 0.5 = 12.5 velocity, 6.25 displacement.
        assert!((report.max_velocity - 12.5).abs() < 1e-9);
        assert!((report.max_displacement - 6.25).abs() < 1e-9);
    }
}
