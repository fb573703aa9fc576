use crate::math::PI_180;

/// sqrt(3/4), the factor between the gyro error bound and the filter gain
const SQRT_3_4: f32 = 0.866_025_4;

/// Build-time tuning of the fusion filter.
///
/// No `Default`: declination depends on the site and the error bound on the
/// gyroscope in use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionConfig {
    /// Gyroscope measurement error bound, rad/s
    pub gyro_meas_error: f32,
    /// Magnetic declination, degrees, subtracted from yaw
    pub declination: f32,
}

impl FusionConfig {
    pub const fn new(gyro_meas_error_deg: f32, declination_deg: f32) -> Self {
        Self {
            gyro_meas_error: gyro_meas_error_deg * PI_180,
            declination: declination_deg,
        }
    }

    /// Madgwick gain. Larger converges faster and follows noise more.
    pub const fn beta(&self) -> f32 {
        SQRT_3_4 * self.gyro_meas_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beta_from_error_bound() {
        // 2.7 deg/s gives the 0.041 gain of the Madgwick paper
        let config = FusionConfig::new(2.7, 0.0);
        assert!((config.beta() - 0.0408).abs() < 1e-4);

        let config = FusionConfig::new(40.0, 10.0);
        assert!((config.gyro_meas_error - 0.698_131_7).abs() < 1e-6);
        assert!((config.beta() - 0.604_599_8).abs() < 1e-5);
        assert_eq!(config.declination, 10.0);
    }
}
