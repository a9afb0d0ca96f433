use crate::random::RandomSource;
use serde::{Deserialize, Serialize};

/// Force / velocity vector.
pub type Vector = nalgebra::Vector2<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn translate(self, v: Vector) -> Self {
        Self {
            x: self.x + v.x,
            y: self.y + v.y,
        }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned square cell, described by its center and half side length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
}

impl BoundingBox {
    /// Smallest square covering every point. `None` for an empty set or non-finite input.
    pub fn covering(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return None;
        }
        Some(Self {
            center_x: (min_x + max_x) / 2.0,
            center_y: (min_y + max_y) / 2.0,
            radius: ((max_x - min_x).max(max_y - min_y)) / 2.0,
        })
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }

    /// Quadrant index of `p`: bit 0 set for the right half, bit 1 set for the top half.
    pub fn quadrant_of(&self, p: Point) -> usize {
        let right = usize::from(p.x >= self.center_x);
        let top = usize::from(p.y >= self.center_y);
        right | (top << 1)
    }

    pub fn quadrant(&self, index: usize) -> Self {
        let half = self.radius / 2.0;
        let dx = if index & 1 == 0 { -half } else { half };
        let dy = if index & 2 == 0 { -half } else { half };
        Self {
            center_x: self.center_x + dx,
            center_y: self.center_y + dy,
            radius: half,
        }
    }
}

/// Direction and distance from one point towards another.
///
/// `(ex, ey)` is a unit vector unless the points coincide; in that case it is a random unit vector
/// and `d == d2 == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceVector {
    pub ex: f64,
    pub ey: f64,
    pub d: f64,
    pub d2: f64,
}

impl DistanceVector {
    pub fn between(a: Point, b: Point, rng: &mut dyn RandomSource) -> Self {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let d2 = dx * dx + dy * dy;
        if d2 > 0.0 {
            let d = d2.sqrt();
            return Self {
                ex: dx / d,
                ey: dy / d,
                d,
                d2,
            };
        }

        let (ex, ey) = random_unit(rng);
        Self {
            ex,
            ey,
            d: 0.0,
            d2: 0.0,
        }
    }

    pub fn direction(&self) -> Vector {
        Vector::new(self.ex, self.ey)
    }
}

fn random_unit(rng: &mut dyn RandomSource) -> (f64, f64) {
    let rx = rng.next_f64() * 2.0 - 1.0;
    let ry = rng.next_f64() * 2.0 - 1.0;
    let len = rx.hypot(ry);
    if len > 0.0 && len.is_finite() {
        (rx / len, ry / len)
    } else {
        // Both draws hit the exact center of the range.
        (1.0, 0.0)
    }
}
