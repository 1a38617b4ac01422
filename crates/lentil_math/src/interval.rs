/// A closed range of scalars `[min, max]`, used for box extents along one axis
/// and for ray parameter ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns the size of the interval (max - min).
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    /// Returns true if the interval contains no values.
    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }

    /// Returns true if x is within the interval [min, max] (inclusive).
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    /// Returns true if the open intervals share any value.
    ///
    /// Touching endpoints do not count as overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.min < other.max && other.min < self.max
    }

    /// Returns true if `other` lies entirely within this interval.
    pub fn covers(&self, other: &Interval) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// Expands the interval by delta/2 on each side.
    pub fn expand(&self, delta: f32) -> Interval {
        let padding = delta / 2.0;
        Interval::new(self.min - padding, self.max + padding)
    }

    /// Creates an interval that surrounds two other intervals.
    pub fn surrounding(a: &Interval, b: &Interval) -> Interval {
        Interval::new(a.min.min(b.min), a.max.max(b.max))
    }

    /// An empty interval (min > max, contains nothing).
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    /// All non-negative ray parameters.
    pub const FORWARD: Interval = Interval {
        min: 0.0,
        max: f32::INFINITY,
    };
}
