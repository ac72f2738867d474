use nalgebra::{Point2, Vector2, Vector3};

/// A texture-space triangle, with the terms of its barycentric solve precomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    a: Point2<f32>,
    v0: Vector2<f32>,
    v1: Vector2<f32>,
    d00: f32,
    d01: f32,
    d11: f32,
    denom: f32,
}

impl Triangle {
    pub fn new(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> Self {
        let v0 = b - a;
        let v1 = c - a;
        let d00 = v0.dot(&v0);
        let d01 = v0.dot(&v1);
        let d11 = v1.dot(&v1);
        Self {
            a,
            v0,
            v1,
            d00,
            d01,
            d11,
            denom: d00 * d11 - d01 * d01,
        }
    }

    #[inline]
    pub fn vertices(&self) -> [Point2<f32>; 3] {
        [self.a, self.a + self.v0, self.a + self.v1]
    }

    /// Weights `(u, v, w)` of `p` relative to the vertices `(a, b, c)`; `p = u·a + v·b + w·c`.
    ///
    /// Degenerate triangles yield non-finite weights.
    pub fn barycentric(&self, p: &Point2<f32>) -> Vector3<f32> {
        let v2 = p - self.a;
        let d20 = v2.dot(&self.v0);
        let d21 = v2.dot(&self.v1);
        let v = (self.d11 * d20 - self.d01 * d21) / self.denom;
        let w = (self.d00 * d21 - self.d01 * d20) / self.denom;
        Vector3::new(1.0 - v - w, v, w)
    }

    /// Whether every weight of `weights` lies in `0..=1`.
    #[inline]
    pub fn is_inside(weights: &Vector3<f32>) -> bool {
        weights.iter().all(|w| (0.0..=1.0).contains(w))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn unit() -> Triangle {
        Triangle::new(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        )
    }

    #[test]
    fn corners_and_center() {
        let t = unit();
        for (i, corner) in t.vertices().iter().enumerate() {
            let w = t.barycentric(corner);
            assert_eq!(w[i], 1.0, "{w:?}");
        }
        let w = t.barycentric(&Point2::new(1.0 / 3.0, 1.0 / 3.0));
        assert!((w - Vector3::repeat(1.0 / 3.0)).norm() < 1e-6);
        assert!(Triangle::is_inside(&w));
    }

    #[test]
    fn outside() {
        let w = unit().barycentric(&Point2::new(1.0, 1.0));
        assert!(!Triangle::is_inside(&w));
        assert!((w.sum() - 1.0).abs() < 1e-6);
    }
}
