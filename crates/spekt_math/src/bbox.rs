use crate::{Ray, Transformation, Vec3};

/// Axis-aligned bounding box given by its minimum and maximum corner.
///
/// For a non-empty box `min[i] <= max[i]` holds on every axis. `BBox::EMPTY`
/// is inverted (min = +inf, max = -inf) so that surrounding it with any box
/// yields that box.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BBox {
    pub const EMPTY: BBox = BBox {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Create a box from two corner points (in any order).
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest box containing every point.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut bbox = Self::EMPTY;
        for p in points {
            bbox.grow(p);
        }
        bbox
    }

    /// True if the box contains nothing.
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Extend the box to contain `p`.
    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Smallest box containing both `self` and `other`.
    pub fn surround(&self, other: &BBox) -> BBox {
        BBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// True if `other` lies completely inside this box.
    pub fn contains(&self, other: &BBox) -> bool {
        other.is_empty() || (self.contains_point(other.min) && self.contains_point(other.max))
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    /// Axis (0=X, 1=Y, 2=Z) of greatest extent. Ties resolve towards Z.
    pub fn longest_axis(&self) -> usize {
        let d = self.extent();
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    /// Corner 0 is `min`, corner 1 is `max`.
    #[inline]
    fn corner(&self, i: usize) -> Vec3 {
        if i == 0 {
            self.min
        } else {
            self.max
        }
    }

    /// Slab test against the ray within `[tmin, tmax]`.
    ///
    /// The ray's sign flags pick which corner is entered first on each axis,
    /// so no swap is needed.
    pub fn intersect_ray(&self, ray: &Ray, tmin: f32, tmax: f32) -> bool {
        let origin = ray.origin();
        let inv = ray.inv_direction();
        let sign = ray.sign();

        let mut interval_min = tmin;
        let mut interval_max = tmax;

        for axis in 0..3 {
            let near = self.corner(sign[axis])[axis];
            let far = self.corner(1 - sign[axis])[axis];
            let t0 = (near - origin[axis]) * inv[axis];
            let t1 = (far - origin[axis]) * inv[axis];

            if t0 > interval_min {
                interval_min = t0;
            }
            if t1 < interval_max {
                interval_max = t1;
            }
            if interval_min > interval_max {
                return false;
            }
        }

        true
    }

    /// Box around the eight transformed corners.
    pub fn transformed(&self, transformation: &Transformation) -> BBox {
        if self.is_empty() {
            return *self;
        }
        BBox::from_points((0..8).map(|i| {
            let corner = Vec3::new(
                self.corner(i & 1).x,
                self.corner((i >> 1) & 1).y,
                self.corner((i >> 2) & 1).z,
            );
            transformation.point_to_world(corner)
        }))
    }
}
