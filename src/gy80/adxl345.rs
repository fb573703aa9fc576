use embedded_hal::{delay::DelayNs, i2c::I2c};
use log::debug;
use nalgebra::Vector3;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::{bus::RegisterBus, sensor::ImuSensor, Error};

/// Address with SDO/ALT ADDRESS tied low
pub const DEFAULT_ADXL345_ADDR: u8 = 0x53;

/// Full scale range, DATA_FORMAT bits 1:0
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum AccelRange {
    G2 = 0b00,
    G4 = 0b01,
    G8 = 0b10,
    G16 = 0b11,
}

impl AccelRange {
    /// g per LSB with left-justified samples
    pub fn resolution(&self) -> f32 {
        match self {
            AccelRange::G2 => 2.0 / 32768.0,
            AccelRange::G4 => 4.0 / 32768.0,
            AccelRange::G8 => 8.0 / 32768.0,
            AccelRange::G16 => 16.0 / 32768.0,
        }
    }
}

/// Output data rate in normal power mode, BW_RATE bits 3:0.
/// Bandwidth is half the rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataRate {
    Hz6_25 = 0b0110,
    Hz12_5 = 0b0111,
    Hz25 = 0b1000,
    Hz50 = 0b1001,
    Hz100 = 0b1010,
    Hz200 = 0b1011,
    Hz400 = 0b1100,
    Hz800 = 0b1101,
    Hz1600 = 0b1110,
    Hz3200 = 0b1111,
}

pub mod reg {
    use crate::gy80::bits::BitBlock;

    pub const DEVID: u8 = 0x00;
    pub const DEVID_EXPECTED: u8 = 0xE5;
    pub const BW_RATE: u8 = 0x2C;
    pub const DATAX0: u8 = 0x32;
    pub const FIFO_CTL: u8 = 0x38;

    pub struct PowerCtl;
    impl PowerCtl {
        pub const ADDR: u8 = 0x2D;
        pub const MEASURE: u8 = 3;
    }

    pub struct IntSource;
    impl IntSource {
        pub const ADDR: u8 = 0x30;
        pub const DATA_READY: u8 = 7;
    }

    pub struct DataFormat;
    impl DataFormat {
        pub const ADDR: u8 = 0x31;
        pub const JUSTIFY: u8 = 2;
        pub const RANGE: BitBlock = BitBlock { bit: 1, length: 2 };
    }
}

/// Accelerometer, samples in g
pub struct Adxl345<I2C> {
    bus: RegisterBus<I2C>,
    range: AccelRange,
    rate: DataRate,
}

impl<I2C, E> Adxl345<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Side effect free constructor, +-4g at 100Hz
    pub fn new(i2c: I2C) -> Self {
        Self {
            bus: RegisterBus::new(i2c, DEFAULT_ADXL345_ADDR),
            range: AccelRange::G4,
            rate: DataRate::Hz100,
        }
    }

    pub fn with_addr(mut self, addr: u8) -> Self {
        self.bus.set_addr(addr);
        self
    }

    pub fn with_range(mut self, range: AccelRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_rate(mut self, rate: DataRate) -> Self {
        self.rate = rate;
        self
    }

    /// Range currently programmed into the device
    pub fn range(&mut self) -> Result<AccelRange, Error<E>> {
        let bits = self
            .bus
            .read_bits(reg::DataFormat::ADDR, reg::DataFormat::RANGE)?;
        AccelRange::from_u8(bits).ok_or(Error::InvalidField(bits))
    }

    pub fn release(self) -> I2C {
        self.bus.release()
    }
}

impl<I2C, E> ImuSensor for Adxl345<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = Error<E>;

    fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        let id = self.bus.read_byte(reg::DEVID)?;
        if id != reg::DEVID_EXPECTED {
            return Err(Error::InvalidChipId {
                expected: reg::DEVID_EXPECTED,
                found: id,
            });
        }

        // Standby while configuring, worst case 11.1 ms to settle
        self.bus.write_byte(reg::PowerCtl::ADDR, 0x00)?;
        delay.delay_ms(12);

        self.bus.write_byte(reg::BW_RATE, self.rate as u8)?;
        self.bus.write_byte(
            reg::DataFormat::ADDR,
            1 << reg::DataFormat::JUSTIFY | self.range as u8,
        )?;
        // FIFO bypass
        self.bus.write_byte(reg::FIFO_CTL, 0x00)?;

        self.bus
            .write_bit(reg::PowerCtl::ADDR, reg::PowerCtl::MEASURE, true)?;
        delay.delay_ms(12);

        debug!("ADXL345 up, {:?} at {:?}", self.range, self.rate);
        Ok(())
    }

    fn measure(&mut self) -> nb::Result<Vector3<f32>, Self::Error> {
        if !self
            .bus
            .read_bit(reg::IntSource::ADDR, reg::IntSource::DATA_READY)?
        {
            return Err(nb::Error::WouldBlock);
        }

        let mut buf = [0u8; 6];
        self.bus.read_bytes(reg::DATAX0, &mut buf)?;

        let raw = Vector3::new(
            i16::from_le_bytes([buf[0], buf[1]]) as f32,
            i16::from_le_bytes([buf[2], buf[3]]) as f32,
            i16::from_le_bytes([buf[4], buf[5]]) as f32,
        );

        Ok(raw * self.range.resolution())
    }
}
