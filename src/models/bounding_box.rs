/// Axis-aligned bounding box in `D` dimensions.
///
/// An empty box has `min = +∞` and `max = -∞` on every axis, so that including a point or
/// taking the union with another box needs no special case.
///
/// # Examples
///
/// ```
/// use rs_sph_tree::models::BoundingBox;
///
/// let mut bbox = BoundingBox::<2>::empty();
/// assert!(bbox.is_empty());
///
/// bbox.include(&[0.0, 1.0]);
/// bbox.include(&[2.0, -1.0]);
/// assert_eq!(bbox.min, [0.0, -1.0]);
/// assert_eq!(bbox.max, [2.0, 1.0]);
/// assert_eq!(bbox.extent_squared(), 8.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox<const D: usize> {
    pub min: [f64; D],
    pub max: [f64; D],
}

impl<const D: usize> Default for BoundingBox<D> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const D: usize> BoundingBox<D> {
    pub fn empty() -> Self {
        Self {
            min: [f64::INFINITY; D],
            max: [f64::NEG_INFINITY; D],
        }
    }

    pub fn new(min: [f64; D], max: [f64; D]) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all `points`; empty for an empty iterator.
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a [f64; D]>,
    {
        let mut bbox = Self::empty();
        for p in points {
            bbox.include(p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        (0..D).any(|k| self.min[k] > self.max[k])
    }

    /// Grows the box to contain `point`.
    #[inline]
    pub fn include(&mut self, point: &[f64; D]) {
        for k in 0..D {
            if point[k] < self.min[k] { self.min[k] = point[k]; }
            if point[k] > self.max[k] { self.max[k] = point[k]; }
        }
    }

    /// Component-wise min/max union.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: std::array::from_fn(|k| self.min[k].min(other.min[k])),
            max: std::array::from_fn(|k| self.max[k].max(other.max[k])),
        }
    }

    /// `‖max - min‖²`, zero for an empty box.
    pub fn extent_squared(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (0..D).map(|k| (self.max[k] - self.min[k]).powi(2)).sum()
    }

    pub fn center(&self) -> [f64; D] {
        std::array::from_fn(|k| 0.5 * (self.min[k] + self.max[k]))
    }

    pub fn contains(&self, point: &[f64; D]) -> bool {
        (0..D).all(|k| point[k] >= self.min[k] && point[k] <= self.max[k])
    }

    /// Squared distance from `point` to the closest point of the box (0 inside).
    /// An empty box is infinitely far away.
    pub fn distance_squared_to(&self, point: &[f64; D]) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        let mut sum = 0.0;
        for k in 0..D {
            let d = if point[k] < self.min[k] {
                self.min[k] - point[k]
            } else if point[k] > self.max[k] {
                point[k] - self.max[k]
            } else {
                0.0
            };
            sum += d * d;
        }
        sum
    }

    /// True if the closed sphere of `radius` around `center` touches the box.
    #[inline]
    pub fn intersects_sphere(&self, center: &[f64; D], radius: f64) -> bool {
        self.distance_squared_to(center) <= radius * radius
    }

    /// True if the two closed boxes overlap.
    pub fn intersects(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        (0..D).all(|k| self.min[k] <= other.max[k] && other.min[k] <= self.max[k])
    }

    /// Box grown by `margin` on every side. An empty box stays empty.
    pub fn padded(&self, margin: f64) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self {
            min: std::array::from_fn(|k| self.min[k] - margin),
            max: std::array::from_fn(|k| self.max[k] + margin),
        }
    }
}
