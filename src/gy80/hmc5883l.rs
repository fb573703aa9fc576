use core::ops::RangeInclusive;

use embedded_hal::{delay::DelayNs, i2c::I2c};
use log::debug;
use nalgebra::Vector3;

use super::{bus::RegisterBus, sensor::ImuSensor, Error};

pub const DEFAULT_HMC5883L_ADDR: u8 = 0x1E;

pub const REG_CRA: u8 = 0x00;
pub const REG_CRB: u8 = 0x01;
pub const REG_MODE: u8 = 0x02;
/// Output block is X, Z, Y, each MSB first
pub const REG_OUTXM: u8 = 0x03;
pub const REG_STATUS: u8 = 0x09;
pub const REG_ID: RangeInclusive<u8> = 0x0A..=0x0C;

pub const ID_EXPECTED: [u8; 3] = *b"H43";
pub const STATUS_RDY: u8 = 0;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvgSample {
    SAMPLE_1 = 0x00,
    SAMPLE_2 = 0x01,
    SAMPLE_4 = 0x02,
    SAMPLE_8 = 0x03,
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOutputRate {
    RATE_0P75 = 0x00,
    RATE_1P5 = 0x01,
    RATE_3 = 0x02,
    RATE_7P5 = 0x03,
    RATE_15 = 0x04,
    RATE_30 = 0x05,
    RATE_75 = 0x06,
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    CONTINUOUS = 0x00,
    SINGLE = 0x01,
    IDLE = 0x02,
}

/// Named by LSB per gauss
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    GAIN_1370 = 0x00,
    GAIN_1090 = 0x01,
    GAIN_820 = 0x02,
    GAIN_660 = 0x03,
    GAIN_440 = 0x04,
    GAIN_390 = 0x05,
    GAIN_330 = 0x06,
    GAIN_230 = 0x07,
}

impl Gain {
    /// Milligauss per LSB
    pub fn resolution(&self) -> f32 {
        match self {
            Gain::GAIN_1370 => 0.73,
            Gain::GAIN_1090 => 0.92,
            Gain::GAIN_820 => 1.22,
            Gain::GAIN_660 => 1.52,
            Gain::GAIN_440 => 2.27,
            Gain::GAIN_390 => 2.56,
            Gain::GAIN_330 => 3.03,
            Gain::GAIN_230 => 4.35,
        }
    }
}

/// Magnetometer, samples in milligauss
pub struct Hmc5883l<I2C> {
    bus: RegisterBus<I2C>,
    gain: Gain,
    rate: DataOutputRate,
    averaging: AvgSample,
}

impl<I2C, E> Hmc5883l<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Side effect free constructor, +-0.88 Ga at 75Hz
    pub fn new(i2c: I2C) -> Self {
        Self {
            bus: RegisterBus::new(i2c, DEFAULT_HMC5883L_ADDR),
            gain: Gain::GAIN_1370,
            rate: DataOutputRate::RATE_75,
            averaging: AvgSample::SAMPLE_1,
        }
    }

    pub fn with_gain(mut self, gain: Gain) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_rate(mut self, rate: DataOutputRate) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_averaging(mut self, averaging: AvgSample) -> Self {
        self.averaging = averaging;
        self
    }

    pub fn release(self) -> I2C {
        self.bus.release()
    }
}

impl<I2C, E> ImuSensor for Hmc5883l<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = Error<E>;

    fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        let mut id = [0u8; 3];
        self.bus.read_bytes(*REG_ID.start(), &mut id)?;
        if id != ID_EXPECTED {
            return Err(Error::InvalidHmc5883lId(id));
        }

        // Normal measurement, no bias
        self.bus.write_byte(
            REG_CRA,
            (self.averaging as u8) << 5 | (self.rate as u8) << 2,
        )?;
        self.bus.write_byte(REG_CRB, (self.gain as u8) << 5)?;
        self.bus.write_byte(REG_MODE, Mode::CONTINUOUS as u8)?;

        // First conversion lands after 1/rate, 6 ms covers 75Hz
        delay.delay_ms(6);

        debug!("HMC5883L up, {:?} at {:?}", self.gain, self.rate);
        Ok(())
    }

    fn measure(&mut self) -> nb::Result<Vector3<f32>, Self::Error> {
        if !self.bus.read_bit(REG_STATUS, STATUS_RDY)? {
            return Err(nb::Error::WouldBlock);
        }

        let mut buf = [0u8; 6];
        self.bus.read_bytes(REG_OUTXM, &mut buf)?;

        let x = i16::from_be_bytes([buf[0], buf[1]]);
        let z = i16::from_be_bytes([buf[2], buf[3]]);
        let y = i16::from_be_bytes([buf[4], buf[5]]);

        Ok(Vector3::new(x as f32, y as f32, z as f32) * self.gain.resolution())
    }
}
