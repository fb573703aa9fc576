//! Attitude estimation for the GY-80 10-DOF board.
//!
//! [`gy80::Gy80`] polls the accelerometer, gyroscope and magnetometer over a
//! shared I2C bus and fuses them with a Madgwick filter into yaw, pitch and
//! roll in degrees.

#![cfg_attr(not(test), no_std)]
#![deny(unused_must_use)]

pub mod clock;
pub mod config;
pub mod gy80;
pub mod math;

pub use clock::{Clock, EmbassyClock};
pub use config::FusionConfig;
pub use gy80::{
    madgwick::{MadgwickFilter, Rotation, Sample},
    sensor::ImuSensor,
    Error, Gy80, InitError, SenseError, Sensor,
};
