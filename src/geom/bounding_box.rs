use nalgebra::Point2;

/// Axis-Aligned Bounding Box in texture space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub mins: Point2<f32>,
    pub maxs: Point2<f32>,
}

impl Aabb {
    /// Inflation applied by [Aabb::around], so that points on shared edges hit every neighbor.
    pub const DEFAULT_MARGIN: f32 = 0.0003;

    #[inline]
    pub fn new(mins: Point2<f32>, maxs: Point2<f32>) -> Self {
        Self { mins, maxs }
    }

    /// The smallest box containing every point in `points`, grown by `margin` on each side.
    ///
    /// If `points` is empty, the result contains nothing.
    pub fn with_margin<'p>(points: impl IntoIterator<Item = &'p Point2<f32>>, margin: f32) -> Self {
        let mut res = Self::new(
            Point2::new(f32::INFINITY, f32::INFINITY),
            Point2::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
        );
        for p in points {
            res.mins = res.mins.inf(p);
            res.maxs = res.maxs.sup(p);
        }
        res.mins.apply(|c| *c -= margin);
        res.maxs.apply(|c| *c += margin);
        res
    }

    /// [Aabb::with_margin] using [Aabb::DEFAULT_MARGIN].
    #[inline]
    pub fn around<'p>(points: impl IntoIterator<Item = &'p Point2<f32>>) -> Self {
        Self::with_margin(points, Self::DEFAULT_MARGIN)
    }

    /// Inclusive on every edge.
    #[inline]
    pub fn contains(&self, p: &Point2<f32>) -> bool {
        let Self { mins: i, maxs: a } = self;
        (p.x >= i.x && p.y >= i.y) && (p.x <= a.x && p.y <= a.y)
    }

    /// Whether `self` and `other` share any point, edges included.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.mins.x <= other.maxs.x
            && other.mins.x <= self.maxs.x
            && self.mins.y <= other.maxs.y
            && other.mins.y <= self.maxs.y
    }

    /// Euclidean distance from `p` to the nearest point of `self`; 0 if `p` ∈ `self`.
    pub fn distance(&self, p: &Point2<f32>) -> f32 {
        let nearest = p.sup(&self.mins).inf(&self.maxs);
        (p - nearest).norm()
    }

    /// Determine the center of `self`.
    #[inline]
    pub fn center(&self) -> Point2<f32> {
        nalgebra::center(&self.mins, &self.maxs)
    }
}
