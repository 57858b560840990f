use serde::{Deserialize, Serialize};

use crate::pointcloud::header::PcdHeader;

/// Flat, point-major position buffer: `[x0, y0, z0, x1, y1, z1, ...]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Positions(Vec<f32>);

impl Positions {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// `None` if `points * 3` overflows `usize`.
    pub fn zeroed(points: usize) -> Option<Self> {
        points.checked_mul(3).map(|len| Self(vec![0.0; len]))
    }

    pub fn set(&mut self, index: usize, x: f32, y: f32, z: f32) {
        self.0[index * 3] = x;
        self.0[index * 3 + 1] = y;
        self.0[index * 3 + 2] = z;
    }

    pub fn get(&self, index: usize) -> Option<[f32; 3]> {
        let start = index.checked_mul(3)?;
        self.0
            .get(start..start.checked_add(3)?)
            .map(|xyz| [xyz[0], xyz[1], xyz[2]])
    }

    /// Number of points (not floats).
    pub fn len(&self) -> usize {
        self.0.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (f32, f32, f32)> + '_ {
        self.0.chunks_exact(3).map(|xyz| (xyz[0], xyz[1], xyz[2]))
    }

    /// Axis-aligned bounds of all points. Points with a NaN coordinate are skipped;
    /// `None` when no point is finite.
    pub fn bounding_volume(&self) -> Option<BoundingVolume> {
        let mut bounding_volume = BoundingVolume {
            min: [f64::MAX, f64::MAX, f64::MAX],
            max: [f64::MIN, f64::MIN, f64::MIN],
        };
        let mut seen = false;

        for (x, y, z) in self.iter() {
            if x.is_nan() || y.is_nan() || z.is_nan() {
                continue;
            }
            let (x, y, z) = (x as f64, y as f64, z as f64);
            bounding_volume.max[0] = bounding_volume.max[0].max(x);
            bounding_volume.max[1] = bounding_volume.max[1].max(y);
            bounding_volume.max[2] = bounding_volume.max[2].max(z);
            bounding_volume.min[0] = bounding_volume.min[0].min(x);
            bounding_volume.min[1] = bounding_volume.min[1].min(y);
            bounding_volume.min[2] = bounding_volume.min[2].min(z);
            seen = true;
        }

        seen.then_some(bounding_volume)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingVolume {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

/// Result of decoding one PCD buffer.
///
/// `positions` is `None` when the header does not declare all of x, y and z.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub header: PcdHeader,
    pub positions: Option<Positions>,
}

impl PointCloud {
    pub fn new(header: PcdHeader, positions: Option<Positions>) -> Self {
        PointCloud { header, positions }
    }

    pub fn point_count(&self) -> usize {
        self.header.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut positions = Positions::zeroed(2).unwrap();
        positions.set(1, 4.0, 5.0, 6.0);
        assert_eq!(positions.len(), 2);
        assert_eq!(positions.get(0), Some([0.0, 0.0, 0.0]));
        assert_eq!(positions.get(1), Some([4.0, 5.0, 6.0]));
        assert_eq!(positions.get(2), None);
        assert_eq!(positions.as_slice(), &[0.0, 0.0, 0.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_zeroed_overflow() {
        assert!(Positions::zeroed(usize::MAX / 3 + 1).is_none());
        assert_eq!(Positions::zeroed(0).unwrap().len(), 0);
    }

    #[test]
    fn test_bounding_volume_skips_nan() {
        let positions = Positions::new(vec![
            1.0,
            -2.0,
            3.0,
            f32::NAN,
            100.0,
            100.0,
            -1.0,
            2.0,
            0.5,
        ]);
        let bounds = positions.bounding_volume().unwrap();
        assert_eq!(bounds.min, [-1.0, -2.0, 0.5]);
        assert_eq!(bounds.max, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_bounding_volume_empty() {
        assert!(Positions::default().bounding_volume().is_none());
        assert!(Positions::new(vec![f32::NAN; 3]).bounding_volume().is_none());
    }
}
