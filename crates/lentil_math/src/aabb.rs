use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box used by the spatial index.
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    /// Create an AABB from two corner points (in any order).
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let x = Interval::new(a.x.min(b.x), a.x.max(b.x));
        let y = Interval::new(a.y.min(b.y), a.y.max(b.y));
        let z = Interval::new(a.z.min(b.z), a.z.max(b.z));

        Self::new(x, y, z)
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    fn axis_interval_mut(&mut self, n: usize) -> &mut Interval {
        match n {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }

    /// Minimum corner.
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    /// Maximum corner.
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// All eight corners of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min(), self.max());
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Split the box with a plane perpendicular to `axis` at `value`.
    ///
    /// Returns the (lower, upper) halves. The plane is not clamped to the box,
    /// so callers should only pass values strictly inside the extent.
    pub fn split(&self, axis: usize, value: f32) -> (Aabb, Aabb) {
        let mut lower = *self;
        let mut upper = *self;
        lower.axis_interval_mut(axis).max = value;
        upper.axis_interval_mut(axis).min = value;
        (lower, upper)
    }

    /// Test if a ray starting at `ray.origin` can reach this box.
    ///
    /// Uses the slab method: the running `[t_min, t_max]` interval is narrowed
    /// axis by axis, starting from all non-negative parameters. Returns false
    /// when the interval becomes empty, which also covers boxes lying entirely
    /// behind the origin. A zero direction component yields infinite slab
    /// bounds; the NaN produced when the origin sits exactly on that slab plane
    /// is discarded by `f32::max`/`f32::min`.
    pub fn intersects_ray(&self, ray: &Ray) -> bool {
        let mut ray_t = Interval::FORWARD;

        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let adinv = 1.0 / ray.direction[axis];
            let mut t0 = (slab.min - ray.origin[axis]) * adinv;
            let mut t1 = (slab.max - ray.origin[axis]) * adinv;
            if adinv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.is_empty() {
                return false;
            }
        }

        true
    }

    /// True if the two boxes share volume on every axis.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.x.overlaps(&other.x) && self.y.overlaps(&other.y) && self.z.overlaps(&other.z)
    }

    /// True if `other` lies entirely inside this box.
    pub fn contains(&self, other: &Aabb) -> bool {
        self.x.covers(&other.x) && self.y.covers(&other.y) && self.z.covers(&other.z)
    }

    /// Total area of the six faces.
    pub fn surface_area(&self) -> f32 {
        let dx = self.x.size().abs();
        let dy = self.y.size().abs();
        let dz = self.z.size().abs();
        2.0 * (dx * dy + dy * dz + dz * dx)
    }

    /// Pad intervals to avoid zero-width AABBs (degenerate cases).
    fn pad_to_minimums(&mut self) {
        let delta = 0.0001;
        if self.x.size() < delta {
            self.x = self.x.expand(delta);
        }
        if self.y.size() < delta {
            self.y = self.y.expand(delta);
        }
        if self.z.size() < delta {
            self.z = self.z.expand(delta);
        }
    }

    /// Translate (move) the AABB by an offset vector.
    pub fn translate(&self, offset: Vec3) -> Aabb {
        Aabb::from_points(self.min() + offset, self.max() + offset)
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}
