use embedded_hal::{delay::DelayNs, i2c::I2c};
use log::debug;
use nalgebra::Vector3;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::{bus::RegisterBus, sensor::ImuSensor, Error};
use crate::math::PI_180;

/// Address with SDO tied high
pub const DEFAULT_L3G4200D_ADDR: u8 = 0x69;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum FullScale {
    Dps250 = 0b00,
    Dps500 = 0b01,
    Dps2000 = 0b10,
}

impl FullScale {
    /// Sensitivity in degrees per second per LSB
    pub fn dps_per_lsb(&self) -> f32 {
        match self {
            FullScale::Dps250 => 0.008_75,
            FullScale::Dps500 => 0.017_5,
            FullScale::Dps2000 => 0.070,
        }
    }
}

/// Output data rate and low-pass cutoff, CTRL_REG1 bits 7:4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataRate {
    Hz100Cut12_5 = 0b0000,
    Hz100Cut25 = 0b0001,
    Hz200Cut12_5 = 0b0100,
    Hz200Cut25 = 0b0101,
    Hz200Cut50 = 0b0110,
    Hz200Cut70 = 0b0111,
    Hz400Cut20 = 0b1000,
    Hz400Cut25 = 0b1001,
    Hz400Cut50 = 0b1010,
    Hz400Cut110 = 0b1011,
    Hz800Cut30 = 0b1100,
    Hz800Cut35 = 0b1101,
    Hz800Cut50 = 0b1110,
    Hz800Cut110 = 0b1111,
}

pub mod reg {
    use crate::gy80::bits::BitBlock;

    pub const WHO_AM_I: u8 = 0x0F;
    pub const WHO_AM_I_EXPECTED: u8 = 0xD3;

    pub const CTRL_REG1: u8 = 0x20;
    /// Normal mode, X Y Z enabled
    pub const CTRL_REG1_POWER: u8 = 0x0F;
    pub const CTRL_REG4: u8 = 0x23;
    pub const CTRL_REG4_FS: BitBlock = BitBlock { bit: 5, length: 2 };
    pub const CTRL_REG5: u8 = 0x24;

    pub const STATUS: u8 = 0x27;
    pub const STATUS_ZYXDA: u8 = 3;

    pub const OUT_X_L: u8 = 0x28;
    /// MSB of the sub-address enables auto-increment
    pub const AUTO_INCREMENT: u8 = 0x80;
}

/// Gyroscope, samples in rad/s
pub struct L3G4200D<I2C> {
    bus: RegisterBus<I2C>,
    scale: FullScale,
    rate: DataRate,
}

impl<I2C, E> L3G4200D<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Side effect free constructor, 500 dps at 100Hz
    pub fn new(i2c: I2C) -> Self {
        Self {
            bus: RegisterBus::new(i2c, DEFAULT_L3G4200D_ADDR),
            scale: FullScale::Dps500,
            rate: DataRate::Hz100Cut25,
        }
    }

    pub fn with_addr(mut self, addr: u8) -> Self {
        self.bus.set_addr(addr);
        self
    }

    pub fn with_scale(mut self, scale: FullScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rate(mut self, rate: DataRate) -> Self {
        self.rate = rate;
        self
    }

    /// Full scale currently programmed into the device
    pub fn scale(&mut self) -> Result<FullScale, Error<E>> {
        match self.bus.read_bits(reg::CTRL_REG4, reg::CTRL_REG4_FS)? {
            // 0b11 is a second encoding of 2000 dps
            0b11 => Ok(FullScale::Dps2000),
            bits => FullScale::from_u8(bits).ok_or(Error::InvalidField(bits)),
        }
    }

    pub fn release(self) -> I2C {
        self.bus.release()
    }
}

impl<I2C, E> ImuSensor for L3G4200D<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = Error<E>;

    fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        let id = self.bus.read_byte(reg::WHO_AM_I)?;
        if id != reg::WHO_AM_I_EXPECTED {
            return Err(Error::InvalidChipId {
                expected: reg::WHO_AM_I_EXPECTED,
                found: id,
            });
        }

        self.bus.write_byte(
            reg::CTRL_REG1,
            (self.rate as u8) << 4 | reg::CTRL_REG1_POWER,
        )?;
        self.bus.write_byte(reg::CTRL_REG4, (self.scale as u8) << 4)?;
        // No FIFO, no high-pass
        self.bus.write_byte(reg::CTRL_REG5, 0x00)?;

        // Turn-on time at the slowest rate
        delay.delay_ms(250);

        debug!("L3G4200D up, {:?} at {:?}", self.scale, self.rate);
        Ok(())
    }

    fn measure(&mut self) -> nb::Result<Vector3<f32>, Self::Error> {
        if !self.bus.read_bit(reg::STATUS, reg::STATUS_ZYXDA)? {
            return Err(nb::Error::WouldBlock);
        }

        let mut buf = [0u8; 6];
        self.bus
            .read_bytes(reg::OUT_X_L | reg::AUTO_INCREMENT, &mut buf)?;

        let raw = Vector3::new(
            i16::from_le_bytes([buf[0], buf[1]]) as f32,
            i16::from_le_bytes([buf[2], buf[3]]) as f32,
            i16::from_le_bytes([buf[4], buf[5]]) as f32,
        );

        Ok(raw * (self.scale.dps_per_lsb() * PI_180))
    }
}
