use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use nalgebra::Vector3;

/// What the fusion loop needs from any tri-axis sensor on the board
pub trait ImuSensor {
    type Error: Debug;

    /// Verify the device identity and configure it for continuous measurement
    fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error>;

    /// Latest calibrated sample, or `nb::Error::WouldBlock` when the device has
    /// nothing new since the previous call
    fn measure(&mut self) -> nb::Result<Vector3<f32>, Self::Error>;
}
