//! Per-node force accumulation.
//!
//! Forces are index-aligned with the position slice handed to each strategy: `forces[i]` is the
//! accumulator of the node at `positions[i]`. Strategies only add to accumulators; zeroing them is
//! the caller's job.

mod barnes_hut;
mod direct_sum;
mod edges;

pub use barnes_hut::BarnesHutApproximation;
pub use direct_sum::DirectSum;
pub use edges::{EdgeForceAccumulator, EdgeSpan};

use crate::geometry::{Point, Vector};
use crate::random::RandomSource;
use crate::simulation::SimulationParameters;

/// Repulsion between nodes.
pub trait NodeForceStrategy {
    /// Adds the repulsive force acting on every node to its accumulator.
    ///
    /// `positions` and `forces` have the same length. Zero or one node is a no-op.
    fn apply(&self, positions: &[Point], forces: &mut [Vector], rng: &mut dyn RandomSource);
}

/// Coulomb-like pair force, shared by both strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Repulsion {
    pub coefficient: f64,
    pub max_force: f64,
}

impl Repulsion {
    pub(crate) fn from_parameters(params: &SimulationParameters) -> Self {
        Self {
            coefficient: params.repulsion_coefficient,
            max_force: params.max_force,
        }
    }

    /// `coefficient * qa * qb / d2`, with the magnitude clamped to `max_force`.
    ///
    /// Coincident points (`d2 == 0`) get the clamped maximum.
    pub(crate) fn magnitude(&self, qa: f64, qb: f64, d2: f64) -> f64 {
        let numerator = self.coefficient * qa * qb;
        if d2 > 0.0 {
            (numerator / d2).clamp(-self.max_force, self.max_force)
        } else if numerator == 0.0 {
            0.0
        } else {
            numerator.signum() * self.max_force
        }
    }
}

/// The configured repulsion strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum RepulsionStrategy {
    DirectSum(DirectSum),
    BarnesHut(BarnesHutApproximation),
}

impl RepulsionStrategy {
    /// `theta == 0` selects exact summation, anything else the Barnes-Hut approximation.
    pub fn from_parameters(params: &SimulationParameters) -> Self {
        if params.theta == 0.0 {
            Self::DirectSum(DirectSum::from_parameters(params))
        } else {
            Self::BarnesHut(BarnesHutApproximation::from_parameters(params))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectSum(_) => "direct-sum",
            Self::BarnesHut(_) => "barnes-hut",
        }
    }
}

impl NodeForceStrategy for RepulsionStrategy {
    fn apply(&self, positions: &[Point], forces: &mut [Vector], rng: &mut dyn RandomSource) {
        match self {
            Self::DirectSum(s) => s.apply(positions, forces, rng),
            Self::BarnesHut(s) => s.apply(positions, forces, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Repulsion, RepulsionStrategy};
    use crate::simulation::SimulationParameters;

    #[test]
    fn magnitude_follows_inverse_square() {
        let r = Repulsion {
            coefficient: 2.0,
            max_force: 1e9,
        };
        assert_eq!(r.magnitude(3.0, 4.0, 4.0), 6.0);
    }

    #[test]
    fn magnitude_is_clamped_near_zero_distance() {
        let r = Repulsion {
            coefficient: 1.0,
            max_force: 50.0,
        };
        assert_eq!(r.magnitude(100.0, 100.0, 1e-6), 50.0);
        assert_eq!(r.magnitude(100.0, 100.0, 0.0), 50.0);
        assert_eq!(r.magnitude(-100.0, 100.0, 0.0), -50.0);
        assert_eq!(r.magnitude(0.0, 100.0, 0.0), 0.0);
    }

    #[test]
    fn zero_theta_routes_to_direct_sum() {
        let mut params = SimulationParameters {
            theta: 0.0,
            ..Default::default()
        };
        assert_eq!(RepulsionStrategy::from_parameters(&params).name(), "direct-sum");
        params.theta = 0.7;
        assert_eq!(RepulsionStrategy::from_parameters(&params).name(), "barnes-hut");
    }
}
