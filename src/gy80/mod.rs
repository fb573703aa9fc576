//! GY-80 10-DOF board: ADXL345, L3G4200D, HMC5883L and BMP085 on one I2C bus,
//! fused into an attitude estimate.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};
use nalgebra::Vector3;

use crate::{
    clock::{elapsed_secs, Clock},
    config::FusionConfig,
};
use madgwick::{MadgwickFilter, Rotation, Sample};
use sensor::ImuSensor;

pub mod adxl345;
pub mod bits;
pub mod bmp085;
pub mod bus;
pub mod hmc5883l;
pub mod l3g4200d;
pub mod madgwick;
pub mod sensor;

#[cfg(test)]
pub(crate) mod mock;

/// Errors of the register-level drivers
#[derive(Debug)]
pub enum Error<E> {
    I2c(E),
    InvalidChipId { expected: u8, found: u8 },
    InvalidHmc5883lId([u8; 3]),
    /// A register field read back a value outside its enumeration
    InvalidField(u8),
    /// Factory calibration that would divide by zero
    InvalidCalibration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    Accelerometer,
    Gyroscope,
    Magnetometer,
    Barometer,
}

/// Startup failure of one collaborator. Initialization stops at the first
/// failing sensor and is not retried.
#[derive(Debug)]
pub enum InitError<A, G, M, P> {
    Accelerometer(A),
    Gyroscope(G),
    Magnetometer(M),
    Barometer(P),
}

impl<A, G, M, P> InitError<A, G, M, P> {
    pub fn sensor(&self) -> Sensor {
        match self {
            Self::Accelerometer(_) => Sensor::Accelerometer,
            Self::Gyroscope(_) => Sensor::Gyroscope,
            Self::Magnetometer(_) => Sensor::Magnetometer,
            Self::Barometer(_) => Sensor::Barometer,
        }
    }

    /// Numeric startup code for operator displays, -1 to -4 in init order
    pub fn code(&self) -> i8 {
        match self.sensor() {
            Sensor::Accelerometer => -1,
            Sensor::Gyroscope => -2,
            Sensor::Magnetometer => -3,
            Sensor::Barometer => -4,
        }
    }
}

/// Which sensor groups had no fresh sample on a failed tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SenseError {
    pub accel: bool,
    pub gyro: bool,
    pub mag: bool,
}

/// The attitude loop of the board.
///
/// Owns the four sensors, the clock and the filter state. Call [`Gy80::sense`]
/// once per control cycle.
pub struct Gy80<A, G, M, P, C> {
    accel: A,
    gyro: G,
    mag: M,
    baro: P,
    clock: C,
    filter: MadgwickFilter,
    last_update: u32,
}

impl<A, G, M, P, C> Gy80<A, G, M, P, C>
where
    A: ImuSensor,
    G: ImuSensor,
    M: ImuSensor,
    P: ImuSensor,
    C: Clock,
{
    /// Side effect free constructor, sensors are configured by [`Gy80::init`]
    pub fn new(accel: A, gyro: G, mag: M, baro: P, mut clock: C, config: FusionConfig) -> Self {
        let last_update = clock.now_micros();
        Self {
            accel,
            gyro,
            mag,
            baro,
            clock,
            filter: MadgwickFilter::new(config),
            last_update,
        }
    }

    /// Resets the attitude to identity and brings up every sensor
    pub fn init<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<(), InitError<A::Error, G::Error, M::Error, P::Error>> {
        self.filter.reset();
        self.last_update = self.clock.now_micros();

        self.accel.init(delay).map_err(InitError::Accelerometer)?;
        self.gyro.init(delay).map_err(InitError::Gyroscope)?;
        self.mag.init(delay).map_err(InitError::Magnetometer)?;
        self.baro.init(delay).map_err(InitError::Barometer)?;

        info!("GY-80 initialized");
        Ok(())
    }

    /// One fusion tick.
    ///
    /// Fails when the accelerometer or the gyroscope had nothing new. A missing
    /// magnetometer sample alone is not an error: the filter holds its attitude
    /// for this tick and the held attitude is returned.
    pub fn sense(&mut self) -> Result<Rotation, SenseError> {
        // The interval is consumed even if this tick fails
        let now = self.clock.now_micros();
        let delta_t = elapsed_secs(self.last_update, now);
        self.last_update = now;

        let accel = read(&mut self.accel, Sensor::Accelerometer);
        let gyro = read(&mut self.gyro, Sensor::Gyroscope);
        let mag = read(&mut self.mag, Sensor::Magnetometer);

        let error = SenseError {
            accel: accel.is_none(),
            gyro: gyro.is_none(),
            mag: mag.is_none(),
        };

        let (Some(accel), Some(gyro)) = (accel, gyro) else {
            return Err(error);
        };

        // NaN never normalizes, so the update is skipped as a whole
        let mag = mag.unwrap_or_else(|| Vector3::repeat(f32::NAN));

        self.filter.update(&Sample {
            accel,
            gyro,
            mag,
            delta_t,
        });

        Ok(self.filter.rotation())
    }

    pub fn filter(&self) -> &MadgwickFilter {
        &self.filter
    }

    /// The barometer is brought up with the rest but not fused
    pub fn barometer(&mut self) -> &mut P {
        &mut self.baro
    }

    pub fn release(self) -> (A, G, M, P, C) {
        (self.accel, self.gyro, self.mag, self.baro, self.clock)
    }
}

fn read<S: ImuSensor>(sensor: &mut S, which: Sensor) -> Option<Vector3<f32>> {
    match sensor.measure() {
        Ok(sample) => Some(sample),
        Err(nb::Error::WouldBlock) => {
            debug!("{which:?} not ready");
            None
        }
        Err(nb::Error::Other(err)) => {
            warn!("{which:?} read failed: {err:?}");
            None
        }
    }
}
