use crate::geometry::{DistanceVector, Point, Vector};
use crate::random::RandomSource;
use crate::simulation::SimulationParameters;

/// An edge resolved to the indices of its endpoint nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSpan {
    pub source: usize,
    pub target: usize,
}

/// Hooke's-law springs along edges.
///
/// Each endpoint receives half of `stiffness * (d - equilibrium_length)`, directed towards the
/// other endpoint when the edge is stretched and away from it when compressed.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeForceAccumulator {
    equilibrium_length: f64,
    stiffness: f64,
}

impl EdgeForceAccumulator {
    pub fn new(equilibrium_length: f64, stiffness: f64) -> Self {
        Self {
            equilibrium_length,
            stiffness,
        }
    }

    pub fn from_parameters(params: &SimulationParameters) -> Self {
        Self::new(params.equilibrium_length, params.stiffness)
    }

    pub fn apply(
        &self,
        edges: &[EdgeSpan],
        positions: &[Point],
        forces: &mut [Vector],
        rng: &mut dyn RandomSource,
    ) {
        for e in edges {
            if e.source == e.target {
                continue;
            }
            let (Some(&a), Some(&b)) = (positions.get(e.source), positions.get(e.target)) else {
                continue;
            };
            let dv = DistanceVector::between(a, b, rng);
            let f = self.stiffness * (dv.d - self.equilibrium_length);
            let pull = dv.direction() * (f / 2.0);
            if let Some(fa) = forces.get_mut(e.source) {
                *fa += pull;
            }
            if let Some(fb) = forces.get_mut(e.target) {
                *fb -= pull;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EdgeForceAccumulator, EdgeSpan};
    use crate::geometry::{Point, Vector};
    use crate::random::XorShift64Star;

    const EDGE: [EdgeSpan; 1] = [EdgeSpan {
        source: 0,
        target: 1,
    }];

    fn spring_forces(a: Point, b: Point) -> Vec<Vector> {
        let mut forces = vec![Vector::zeros(); 2];
        let mut rng = XorShift64Star::new(1);
        EdgeForceAccumulator::new(10.0, 2.0).apply(&EDGE, &[a, b], &mut forces, &mut rng);
        forces
    }

    #[test]
    fn stretched_edge_pulls_endpoints_together() {
        let forces = spring_forces(Point::new(0.0, 0.0), Point::new(20.0, 0.0));
        // 2 * (20 - 10) / 2
        assert_eq!(forces[0], Vector::new(10.0, 0.0));
        assert_eq!(forces[1], Vector::new(-10.0, 0.0));
    }

    #[test]
    fn compressed_edge_pushes_endpoints_apart() {
        let forces = spring_forces(Point::new(0.0, 0.0), Point::new(0.0, 4.0));
        assert_eq!(forces[0], Vector::new(0.0, -6.0));
        assert_eq!(forces[1], Vector::new(0.0, 6.0));
    }

    #[test]
    fn edge_at_equilibrium_is_force_free() {
        let forces = spring_forces(Point::new(1.0, 1.0), Point::new(7.0, 9.0));
        assert!(forces[0].norm() < 1e-12);
        assert!(forces[1].norm() < 1e-12);
    }

    #[test]
    fn coincident_endpoints_are_separated() {
        let p = Point::new(3.0, 3.0);
        let forces = spring_forces(p, p);
        assert!((forces[0].norm() - 10.0).abs() < 1e-9);
        assert!((forces[0] + forces[1]).norm() < 1e-12);
    }

    #[test]
    fn self_loops_are_ignored() {
        let mut forces = vec![Vector::zeros(); 1];
        let mut rng = XorShift64Star::new(1);
        EdgeForceAccumulator::new(10.0, 2.0).apply(
            &[EdgeSpan {
                source: 0,
                target: 0,
            }],
            &[Point::new(0.0, 0.0)],
            &mut forces,
            &mut rng,
        );
        assert_eq!(forces[0], Vector::zeros());
    }
}
