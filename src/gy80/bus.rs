use embedded_hal::i2c::I2c;

use super::{
    bits::{self, BitBlock},
    Error,
};

/// One device on an I2C bus: the bus handle plus the device's 7-bit address.
///
/// Drivers never reach for a global bus. Several devices share one physical
/// bus by each owning a bus proxy such as
/// `embedded_hal_bus::i2c::RefCellDevice`.
pub struct RegisterBus<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C, E> RegisterBus<I2C>
where
    I2C: I2c<Error = E>,
{
    pub fn new(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    pub fn set_addr(&mut self, addr: u8) {
        self.addr = addr;
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Writes byte to register
    pub fn write_byte(&mut self, reg: u8, byte: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.addr, &[reg, byte])
            .map_err(Error::I2c)
    }

    /// Reads byte from register
    pub fn read_byte(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut byte: [u8; 1] = [0; 1];
        self.i2c
            .write_read(self.addr, &[reg], &mut byte)
            .map_err(Error::I2c)?;
        Ok(byte[0])
    }

    /// Reads series of bytes into buf starting at reg
    pub fn read_bytes(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error<E>> {
        self.i2c
            .write_read(self.addr, &[reg], buf)
            .map_err(Error::I2c)
    }

    /// Read-modify-write of a single bit
    pub fn write_bit(&mut self, reg: u8, bit_n: u8, enable: bool) -> Result<(), Error<E>> {
        let mut byte = self.read_byte(reg)?;
        bits::set_bit(&mut byte, bit_n, enable);
        self.write_byte(reg, byte)
    }

    pub fn read_bit(&mut self, reg: u8, bit_n: u8) -> Result<bool, Error<E>> {
        Ok(bits::get_bit(self.read_byte(reg)?, bit_n) != 0)
    }

    /// Read-modify-write of a register field
    pub fn write_bits(&mut self, reg: u8, block: BitBlock, data: u8) -> Result<(), Error<E>> {
        let mut byte = self.read_byte(reg)?;
        bits::set_bits(&mut byte, block, data);
        self.write_byte(reg, byte)
    }

    pub fn read_bits(&mut self, reg: u8, block: BitBlock) -> Result<u8, Error<E>> {
        Ok(bits::get_bits(self.read_byte(reg)?, block))
    }
}
