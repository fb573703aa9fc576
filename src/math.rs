use nalgebra::SVector;

/// PI, f32
pub const PI: f32 = core::f32::consts::PI;

/// PI / 180, for conversion to radians
pub const PI_180: f32 = PI / 180.0;

/// 180 / PI, for conversion to degrees
pub const RAD_TO_DEG: f32 = 180.0 / PI;

/// Scales `v` to unit length in place.
///
/// Returns `false` and leaves `v` untouched when its norm is not strictly
/// positive, which also covers NaN components.
pub fn normalize<const N: usize>(v: &mut SVector<f32, N>) -> bool {
    let norm = v.norm();

    if !(norm > 0.0) {
        return false;
    }

    *v *= 1.0 / norm;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Vector3, Vector4};

    #[test]
    fn normalizes_three_components() {
        let mut v = Vector3::new(3.0, 0.0, 4.0);
        assert!(normalize(&mut v));
        assert!((v - Vector3::new(0.6, 0.0, 0.8)).norm() < 1e-6);
    }

    #[test]
    fn normalizes_four_components() {
        let mut v = Vector4::new(2.0, 2.0, 2.0, 2.0);
        assert!(normalize(&mut v));
        assert!((v.norm() - 1.0).abs() < 1e-6);
        assert!((v.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_degenerate() {
        let mut v = Vector3::<f32>::zeros();
        assert!(!normalize(&mut v));
        assert_eq!(v, Vector3::zeros());

        let mut q = Vector4::<f32>::zeros();
        assert!(!normalize(&mut q));
        assert_eq!(q, Vector4::zeros());
    }

    #[test]
    fn nan_is_degenerate_and_untouched() {
        let mut v = Vector3::new(f32::NAN, 1.0, 2.0);
        assert!(!normalize(&mut v));
        assert!(v.x.is_nan());
        assert_eq!(v.y, 1.0);
        assert_eq!(v.z, 2.0);
    }
}
