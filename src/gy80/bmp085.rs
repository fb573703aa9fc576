//! BMP085 barometer.
//!
//! A reading is two conversions, temperature then pressure, each started by a
//! command and finished when the device clears the start-of-conversion bit.
//! [`ImuSensor::measure`] steps through them without blocking.

use embedded_hal::{delay::DelayNs, i2c::I2c};
use log::{debug, trace};
use nalgebra::Vector3;
#[cfg_attr(test, allow(unused_imports))]
use num_traits::Float;

use super::{bus::RegisterBus, sensor::ImuSensor, Error};

pub const DEFAULT_BMP085_ADDR: u8 = 0x77;

/// Standard atmosphere at sea level, Pa
pub const SEA_LEVEL_PA: f32 = 101_325.0;

pub mod reg {
    pub const CALIBRATION: u8 = 0xAA;
    pub const CALIBRATION_LEN: usize = 22;

    pub const CHIP_ID: u8 = 0xD0;
    pub const CHIP_ID_EXPECTED: u8 = 0x55;

    pub struct Control;
    impl Control {
        pub const ADDR: u8 = 0xF4;
        /// Start of conversion, set while converting
        pub const SCO: u8 = 5;
        pub const TEMPERATURE: u8 = 0x2E;
        pub const PRESSURE: u8 = 0x34;
    }

    pub const OUT_MSB: u8 = 0xF6;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Oversampling {
    UltraLowPower = 0,
    Standard = 1,
    HighResolution = 2,
    UltraHighResolution = 3,
}

/// Factory calibration words, EEPROM 0xAA..=0xBF
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

impl Calibration {
    pub fn from_bytes(buf: &[u8; reg::CALIBRATION_LEN]) -> Self {
        let word = |i: usize| [buf[2 * i], buf[2 * i + 1]];
        Self {
            ac1: i16::from_be_bytes(word(0)),
            ac2: i16::from_be_bytes(word(1)),
            ac3: i16::from_be_bytes(word(2)),
            ac4: u16::from_be_bytes(word(3)),
            ac5: u16::from_be_bytes(word(4)),
            ac6: u16::from_be_bytes(word(5)),
            b1: i16::from_be_bytes(word(6)),
            b2: i16::from_be_bytes(word(7)),
            mb: i16::from_be_bytes(word(8)),
            mc: i16::from_be_bytes(word(9)),
            md: i16::from_be_bytes(word(10)),
        }
    }

    /// Integer compensation of raw readings into (0.1 °C, Pa).
    ///
    /// `None` when the calibration is garbage: a division by zero, or an
    /// intermediate or result outside its integer range.
    pub fn compensate(&self, ut: i32, up: i32, oss: Oversampling) -> Option<(i32, i32)> {
        let oss = oss as u32;
        let (ac1, ac2, ac3) = (self.ac1 as i64, self.ac2 as i64, self.ac3 as i64);
        let (ac4, ac5, ac6) = (self.ac4 as i64, self.ac5 as i64, self.ac6 as i64);
        let (b1, b2) = (self.b1 as i64, self.b2 as i64);
        let (mc, md) = (self.mc as i64, self.md as i64);

        let x1 = (ut as i64 - ac6).checked_mul(ac5)? >> 15;
        let x2 = (mc << 11).checked_div(x1.checked_add(md)?)?;
        let b5 = x1.checked_add(x2)?;
        let temperature = b5.checked_add(8)? >> 4;

        let b6 = b5.checked_sub(4000)?;
        let b6_sq = b6.checked_mul(b6)? >> 12;
        let x1 = b2.checked_mul(b6_sq)? >> 11;
        let x2 = ac2.checked_mul(b6)? >> 11;
        let x3 = x1.checked_add(x2)?;
        let b3 = (ac1 * 4)
            .checked_add(x3)?
            .checked_mul(1 << oss)?
            .checked_add(2)?
            / 4;

        let x1 = ac3.checked_mul(b6)? >> 13;
        let x2 = b1.checked_mul(b6_sq)? >> 16;
        let x3 = x1.checked_add(x2)?.checked_add(2)? >> 2;
        let b4 = ac4.checked_mul(x3.checked_add(32768)?)? >> 15;
        let b7 = (up as i64).checked_sub(b3)?.checked_mul(50_000 >> oss)?;

        let p = b7.checked_mul(2)?.checked_div(b4)?;
        let p8 = p >> 8;
        let x1 = p8.checked_mul(p8)?.checked_mul(3038)? >> 16;
        let x2 = p.checked_mul(-7357)? >> 16;
        let pressure = p.checked_add(x1.checked_add(x2)?.checked_add(3791)? >> 4)?;

        Some((
            i32::try_from(temperature).ok()?,
            i32::try_from(pressure).ok()?,
        ))
    }
}

/// Barometric altitude in meters for pressure `pa`
pub fn altitude(pa: f32, sea_level_pa: f32) -> f32 {
    44_330.0 * (1.0 - (pa / sea_level_pa).powf(1.0 / 5.255))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Temperature,
    Pressure { ut: i32 },
}

/// Barometer; a sample is (temperature °C, pressure Pa, altitude m)
pub struct Bmp085<I2C> {
    bus: RegisterBus<I2C>,
    oversampling: Oversampling,
    sea_level_pa: f32,
    calibration: Calibration,
    state: State,
}

impl<I2C, E> Bmp085<I2C>
where
    I2C: I2c<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        Self {
            bus: RegisterBus::new(i2c, DEFAULT_BMP085_ADDR),
            oversampling: Oversampling::Standard,
            sea_level_pa: SEA_LEVEL_PA,
            calibration: Calibration::default(),
            state: State::Idle,
        }
    }

    pub fn with_oversampling(mut self, oversampling: Oversampling) -> Self {
        self.oversampling = oversampling;
        self
    }

    /// Reference pressure for altitude, Pa
    pub fn with_sea_level(mut self, sea_level_pa: f32) -> Self {
        self.sea_level_pa = sea_level_pa;
        self
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn release(self) -> I2C {
        self.bus.release()
    }

    fn converting(&mut self) -> Result<bool, Error<E>> {
        self.bus.read_bit(reg::Control::ADDR, reg::Control::SCO)
    }
}

impl<I2C, E> ImuSensor for Bmp085<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = Error<E>;

    fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        let id = self.bus.read_byte(reg::CHIP_ID)?;
        if id != reg::CHIP_ID_EXPECTED {
            return Err(Error::InvalidChipId {
                expected: reg::CHIP_ID_EXPECTED,
                found: id,
            });
        }

        // Startup time after power on
        delay.delay_ms(10);

        let mut buf = [0u8; reg::CALIBRATION_LEN];
        self.bus.read_bytes(reg::CALIBRATION, &mut buf)?;
        self.calibration = Calibration::from_bytes(&buf);
        self.state = State::Idle;

        debug!("BMP085 up, {:?}", self.calibration);
        Ok(())
    }

    fn measure(&mut self) -> nb::Result<Vector3<f32>, Self::Error> {
        match self.state {
            State::Idle => {
                self.bus
                    .write_byte(reg::Control::ADDR, reg::Control::TEMPERATURE)?;
                self.state = State::Temperature;
                Err(nb::Error::WouldBlock)
            }
            State::Temperature => {
                if self.converting()? {
                    return Err(nb::Error::WouldBlock);
                }

                let mut buf = [0u8; 2];
                self.bus.read_bytes(reg::OUT_MSB, &mut buf)?;
                let ut = u16::from_be_bytes(buf) as i32;

                self.bus.write_byte(
                    reg::Control::ADDR,
                    reg::Control::PRESSURE | (self.oversampling as u8) << 6,
                )?;
                self.state = State::Pressure { ut };
                Err(nb::Error::WouldBlock)
            }
            State::Pressure { ut } => {
                if self.converting()? {
                    return Err(nb::Error::WouldBlock);
                }

                let mut buf = [0u8; 3];
                self.bus.read_bytes(reg::OUT_MSB, &mut buf)?;
                let raw = (buf[0] as i32) << 16 | (buf[1] as i32) << 8 | buf[2] as i32;
                let up = raw >> (8 - self.oversampling as u32);
                self.state = State::Idle;

                let (temperature, pressure) = self
                    .calibration
                    .compensate(ut, up, self.oversampling)
                    .ok_or(Error::InvalidCalibration)?;
                trace!("BMP085 ut {ut} up {up} -> {temperature} dC {pressure} Pa");

                let pressure = pressure as f32;
                Ok(Vector3::new(
                    temperature as f32 / 10.0,
                    pressure,
                    altitude(pressure, self.sea_level_pa),
                ))
            }
        }
    }
}
