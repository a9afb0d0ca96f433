use crate::geometry::Point;
use crate::graph::Viewport;
use crate::random::RandomSource;

/// Seeds nodes that have no coordinates yet.
///
/// Unset nodes are scattered uniformly over a square of side `sqrt(unset) * sparsity`, centered on
/// the middle of the viewport (in content coordinates). Nodes that already have a position keep it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomFillerPlacement {
    pub sparsity: f64,
}

impl RandomFillerPlacement {
    pub fn new(sparsity: f64) -> Self {
        Self { sparsity }
    }

    /// Returns one point per entry of `existing`, drawing two values from `rng` per unset entry
    /// in slice order.
    pub fn place(
        &self,
        existing: &[Option<Point>],
        viewport: &dyn Viewport,
        rng: &mut dyn RandomSource,
    ) -> Vec<Point> {
        let unset = existing.iter().filter(|p| p.is_none()).count();
        if unset == 0 {
            return existing.iter().flatten().copied().collect();
        }

        let center = viewport.visual_center();
        let side = (unset as f64).sqrt() * self.sparsity;
        existing
            .iter()
            .map(|p| match p {
                Some(p) => *p,
                None => {
                    let x = center.x + (rng.next_f64() - 0.5) * side;
                    let y = center.y + (rng.next_f64() - 0.5) * side;
                    Point::new(x, y)
                }
            })
            .collect()
    }
}
