use super::{NodeForceStrategy, Repulsion};
use crate::geometry::{DistanceVector, Point, Vector};
use crate::random::RandomSource;
use crate::simulation::SimulationParameters;

/// Exact O(n²) repulsion over every unordered pair.
///
/// Each pair force is evaluated once and applied with opposite signs to both nodes, so the
/// accumulated forces sum to zero. Both ends receive the full clamped `f`; edge springs, by
/// contrast, give each end `f / 2` (see [`super::EdgeForceAccumulator`]).
#[derive(Debug, Clone, PartialEq)]
pub struct DirectSum {
    repulsion: Repulsion,
    charge: f64,
}

impl DirectSum {
    pub fn from_parameters(params: &SimulationParameters) -> Self {
        Self {
            repulsion: Repulsion::from_parameters(params),
            charge: params.node_charge,
        }
    }
}

impl NodeForceStrategy for DirectSum {
    fn apply(&self, positions: &[Point], forces: &mut [Vector], rng: &mut dyn RandomSource) {
        let n = positions.len().min(forces.len());
        for i in 0..n {
            for j in (i + 1)..n {
                let dv = DistanceVector::between(positions[i], positions[j], rng);
                let f = self.repulsion.magnitude(self.charge, self.charge, dv.d2);
                let push = dv.direction() * f;
                forces[i] -= push;
                forces[j] += push;
            }
        }
    }
}
