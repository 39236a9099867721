use nalgebra::Point3;

/// Axis-aligned bounding box.
///
/// A freshly created box is empty (`min = +inf`, `max = -inf`) and grows as points
/// are included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3D {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Default for Box3D {
    fn default() -> Self {
        Self::empty()
    }
}

impl Box3D {
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|d| self.min[d] > self.max[d])
    }

    pub fn include(&mut self, p: &Point3<f64>) {
        for d in 0..3 {
            self.min[d] = self.min[d].min(p[d]);
            self.max[d] = self.max[d].max(p[d]);
        }
    }

    /// Inclusive containment test on all three axes.
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|d| p[d] >= self.min[d] && p[d] <= self.max[d])
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Distance from the center to a corner; a sphere of this radius covers the box.
    pub fn half_diagonal(&self) -> f64 {
        (self.max - self.min).norm() / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_contains_nothing() {
        let b = Box3D::empty();
        assert!(b.is_empty());
        assert!(!b.contains(&Point3::origin()));
    }

    #[test]
    fn include_grows_bounds() {
        let mut b = Box3D::empty();
        b.include(&Point3::new(1.0, -2.0, 3.0));
        b.include(&Point3::new(-1.0, 2.0, 0.0));
        assert!(!b.is_empty());
        assert_eq!(b.min, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(b.center(), Point3::new(0.0, 0.0, 1.5));
    }

    #[test]
    fn contains_is_inclusive_on_faces() {
        let b = Box3D::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(b.contains(&Point3::new(1.0, 0.0, 0.5)));
        assert!(!b.contains(&Point3::new(1.0001, 0.0, 0.5)));
    }

    #[test]
    fn half_diagonal_covers_corners() {
        let b = Box3D::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 1.0));
        assert!((b.half_diagonal() - 1.5).abs() < 1e-12);
    }
}
