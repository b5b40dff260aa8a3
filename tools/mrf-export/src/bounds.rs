//! Pivot and bounding radius

use glam::Vec3;
use serde::Serialize;

/// Pivot and bounding sphere radius, in export units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bounds {
    pub pivot: [f32; 3],
    pub radius: f32,
}

/// Centroid of the scaled rest positions and the largest distance from it
///
/// An empty vertex list yields the zero pivot and radius.
pub fn compute_bounds(positions: &[[f32; 3]], scale: f32) -> Bounds {
    if positions.is_empty() {
        return Bounds::default();
    }

    let scaled = || positions.iter().map(|&p| Vec3::from(p) * scale);
    let pivot = scaled().sum::<Vec3>() / positions.len() as f32;
    let radius = scaled().map(|p| p.distance(pivot)).fold(0.0f32, f32::max);

    Bounds {
        pivot: pivot.to_array(),
        radius,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]];

    #[test]
    fn test_triangle_pivot_and_radius() {
        let bounds = compute_bounds(&TRIANGLE, 1.0);
        assert!((bounds.pivot[0] - 0.667).abs() < 1e-3);
        assert!((bounds.pivot[1] - 0.667).abs() < 1e-3);
        assert_eq!(bounds.pivot[2], 0.0);
        // (2, 0) is sqrt((4/3)^2 + (2/3)^2) = 1.4907 away
        assert!((bounds.radius - 1.4907).abs() < 1e-3);
    }

    #[test]
    fn test_scale_applies_to_both() {
        let bounds = compute_bounds(&TRIANGLE, 50.0);
        assert!((bounds.pivot[0] - 33.333).abs() < 1e-2);
        assert!((bounds.radius - 74.536).abs() < 1e-2);
    }

    #[test]
    fn test_empty() {
        assert_eq!(compute_bounds(&[], 50.0), Bounds::default());
    }
}
