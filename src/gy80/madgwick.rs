use log::trace;
use nalgebra::{Vector3, Vector4};
#[cfg_attr(test, allow(unused_imports))]
use num_traits::Float;

use crate::{
    config::FusionConfig,
    math::{normalize, RAD_TO_DEG},
};

/// One synchronized set of readings and the time since the previous set
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    /// Specific force, any unit (direction only)
    pub accel: Vector3<f32>,
    /// Angular rate, rad/s
    pub gyro: Vector3<f32>,
    /// Magnetic field, any unit (direction only)
    pub mag: Vector3<f32>,
    /// Seconds since the previous sample
    pub delta_t: f32,
}

/// Tait-Bryan angles in degrees, z axis down, applied yaw then pitch then roll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Rotation {
    /// `declination` (degrees) is subtracted from the magnetic heading.
    /// Pitch of +-90 degrees is the usual gimbal lock and is not handled.
    pub fn from_quaternion(q: &Vector4<f32>, declination: f32) -> Self {
        let [q1, q2, q3, q4] = (*q).into();

        let yaw = (2.0 * (q2 * q3 + q1 * q4)).atan2(q1 * q1 + q2 * q2 - q3 * q3 - q4 * q4);
        let pitch = -(2.0 * (q2 * q4 - q1 * q3)).asin();
        let roll = (2.0 * (q1 * q2 + q3 * q4)).atan2(q1 * q1 - q2 * q2 - q3 * q3 + q4 * q4);

        Self {
            yaw: yaw * RAD_TO_DEG - declination,
            pitch: pitch * RAD_TO_DEG,
            roll: roll * RAD_TO_DEG,
        }
    }
}

/// Madgwick gradient-descent AHRS over accelerometer, gyroscope and
/// magnetometer.
///
/// The quaternion is only ever written by [`MadgwickFilter::update`]. An update
/// that meets a degenerate accelerometer or magnetometer reading, or a
/// degenerate integrated quaternion, leaves the state as it was. Callers cannot
/// tell such a frozen step from one that converged to no change.
pub struct MadgwickFilter {
    q: Vector4<f32>, // Quaternion [w, x, y, z]
    beta: f32,       // Algorithm gain
    declination: f32,
}

impl MadgwickFilter {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            q: Vector4::new(1.0, 0.0, 0.0, 0.0), // Initial quaternion (no rotation)
            beta: config.beta(),
            declination: config.declination,
        }
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn update(&mut self, sample: &Sample) {
        let mut accel = sample.accel;
        if !normalize(&mut accel) {
            trace!("degenerate accelerometer reading, attitude held");
            return;
        }

        let mut mag = sample.mag;
        if !normalize(&mut mag) {
            trace!("degenerate magnetometer reading, attitude held");
            return;
        }

        let [ax, ay, az] = accel.into();
        let [mx, my, mz] = mag.into();
        let [gx, gy, gz] = sample.gyro.into();

        let [q1, q2, q3, q4] = self.q.into();

        // Auxiliary variables to avoid repeated arithmetic
        let two_q1 = 2.0 * q1;
        let two_q2 = 2.0 * q2;
        let two_q3 = 2.0 * q3;
        let two_q4 = 2.0 * q4;
        let two_q1q3 = two_q1 * q3;
        let two_q3q4 = two_q3 * q4;

        let q1q1 = q1 * q1;
        let q1q2 = q1 * q2;
        let q1q3 = q1 * q3;
        let q1q4 = q1 * q4;
        let q2q2 = q2 * q2;
        let q2q3 = q2 * q3;
        let q2q4 = q2 * q4;
        let q3q3 = q3 * q3;
        let q3q4 = q3 * q4;
        let q4q4 = q4 * q4;

        // Reference direction of Earth's magnetic field
        let two_q1mx = two_q1 * mx;
        let two_q1my = two_q1 * my;
        let two_q1mz = two_q1 * mz;
        let two_q2mx = two_q2 * mx;

        let hx = mx * q1q1 - two_q1my * q4
            + two_q1mz * q3
            + mx * q2q2
            + two_q2 * my * q3
            + two_q2 * mz * q4
            - mx * q3q3
            - mx * q4q4;

        let hy = two_q1mx * q4 + my * q1q1 - two_q1mz * q2 + two_q2mx * q3 - my * q2q2
            + my * q3q3
            + two_q3 * mz * q4
            - my * q4q4;

        let two_bx = (hx * hx + hy * hy).sqrt();
        let two_bz = -two_q1mx * q3 + two_q1my * q2 + mz * q1q1 + two_q2mx * q4 - mz * q2q2
            + two_q3 * my * q4
            - mz * q3q3
            + mz * q4q4;

        let four_bx = 2.0 * two_bx;
        let four_bz = 2.0 * two_bz;

        // Objective function residuals: predicted minus measured directions
        let f_ax = 2.0 * q2q4 - two_q1q3 - ax;
        let f_ay = 2.0 * q1q2 + two_q3q4 - ay;
        let f_az = 1.0 - 2.0 * q2q2 - 2.0 * q3q3 - az;
        let f_mx = two_bx * (0.5 - q3q3 - q4q4) + two_bz * (q2q4 - q1q3) - mx;
        let f_my = two_bx * (q2q3 - q1q4) + two_bz * (q1q2 + q3q4) - my;
        let f_mz = two_bx * (q1q3 + q2q4) + two_bz * (0.5 - q2q2 - q3q3) - mz;

        // Gradient descent algorithm corrective step
        let s1 = -two_q3 * f_ax + two_q2 * f_ay - two_bz * q3 * f_mx
            + (-two_bx * q4 + two_bz * q2) * f_my
            + two_bx * q3 * f_mz;

        let s2 = two_q4 * f_ax + two_q1 * f_ay - 4.0 * q2 * f_az
            + two_bz * q4 * f_mx
            + (two_bx * q3 + two_bz * q1) * f_my
            + (two_bx * q4 - four_bz * q2) * f_mz;

        let s3 = -two_q1 * f_ax + two_q4 * f_ay - 4.0 * q3 * f_az
            + (-four_bx * q3 - two_bz * q1) * f_mx
            + (two_bx * q2 + two_bz * q4) * f_my
            + (two_bx * q1 - four_bz * q3) * f_mz;

        let s4 = two_q2 * f_ax
            + two_q3 * f_ay
            + (-four_bx * q4 + two_bz * q2) * f_mx
            + (-two_bx * q1 + two_bz * q3) * f_my
            + two_bx * q2 * f_mz;

        // A degenerate step only switches the correction off, the gyro still integrates
        let mut step = Vector4::new(s1, s2, s3, s4);
        if !normalize(&mut step) {
            step = Vector4::zeros();
        }
        let [s1, s2, s3, s4] = step.into();

        // Compute rate of change of quaternion
        let q_dot = Vector4::new(
            0.5 * (-q2 * gx - q3 * gy - q4 * gz) - self.beta * s1,
            0.5 * (q1 * gx + q3 * gz - q4 * gy) - self.beta * s2,
            0.5 * (q1 * gy - q2 * gz + q4 * gx) - self.beta * s3,
            0.5 * (q1 * gz + q2 * gy - q3 * gx) - self.beta * s4,
        );

        // Integrate to yield quaternion
        let mut q = self.q + q_dot * sample.delta_t;

        if !normalize(&mut q) {
            trace!("degenerate quaternion after integration, attitude held");
            return;
        }

        self.q = q;
    }

    pub fn quaternion(&self) -> &Vector4<f32> {
        &self.q
    }

    pub fn rotation(&self) -> Rotation {
        Rotation::from_quaternion(&self.q, self.declination)
    }

    /// Back to the identity rotation
    pub fn reset(&mut self) {
        self.q = Vector4::new(1.0, 0.0, 0.0, 0.0);
    }
}
