//! Normalization of mesh coordinates into a unit box.
//!
//! The denoising threshold compares unit normals, so the result depends on the
//! aspect of the surface but not on its absolute size. Vertices are moved into
//! a box centred on the origin whose largest half-extent is 1 before smoothing
//! and moved back before rasterization.

use nalgebra::{Point3, Vector3};

/// A uniform scale about a bounding-box centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingTransform {
    /// Centre of the bounding box in world coordinates.
    pub centre: Point3<f64>,
    /// Half of the largest bounding-box extent.
    pub scale: f64,
}

impl Default for ScalingTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ScalingTransform {
    /// The transform that leaves every point unchanged.
    pub fn identity() -> Self {
        Self {
            centre: Point3::origin(),
            scale: 1.0,
        }
    }

    /// Fit the transform to the bounding box of `points`.
    ///
    /// An empty set yields the identity. A set without extent (a single
    /// point, or coincident points) keeps its centre and uses a scale of 1.
    pub fn fit(points: &[Point3<f64>]) -> Self {
        let Some((min, max)) = bounds(points) else {
            return Self::identity();
        };

        let centre = nalgebra::center(&min, &max);
        let extent: Vector3<f64> = max - min;
        let half = extent.max() / 2.0;

        Self {
            centre,
            scale: if half > 0.0 { half } else { 1.0 },
        }
    }

    /// Map a world point into the normalized frame.
    #[inline]
    pub fn apply(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from((p - self.centre) / self.scale)
    }

    /// Map a normalized point back to world coordinates.
    #[inline]
    pub fn invert(&self, p: &Point3<f64>) -> Point3<f64> {
        self.centre + p.coords * self.scale
    }

    /// Normalize all points in place.
    pub fn apply_all(&self, points: &mut [Point3<f64>]) {
        for p in points.iter_mut() {
            *p = self.apply(p);
        }
    }
}

/// Componentwise minimum and maximum of `points`, or `None` if empty.
pub(crate) fn bounds(points: &[Point3<f64>]) -> Option<(Point3<f64>, Point3<f64>)> {
    let first = *points.first()?;
    let mut min = first;
    let mut max = first;

    for p in points {
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }

    Some((min, max))
}
