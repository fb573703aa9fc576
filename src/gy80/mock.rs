//! Register-map I2C bus for driver tests

use core::cell::RefCell;
use embedded_hal::i2c::{self, ErrorKind, ErrorType, Operation, SevenBitAddress};
use embedded_hal_bus::i2c::RefCellDevice;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Write { addr: u8, reg: u8, data: Vec<u8> },
    WriteRead { addr: u8, reg: u8, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

impl i2c::Error for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Every device on the bus is a flat 256-byte register file. A write sets the
/// register pointer with its first byte and stores the rest with auto-increment;
/// a read continues from the pointer.
#[derive(Default)]
pub struct MockI2c {
    registers: HashMap<(u8, u8), u8>,
    transactions: Vec<Transaction>,
    fail_next: bool,
}

impl ErrorType for MockI2c {
    type Error = MockError;
}

impl i2c::I2c<SevenBitAddress> for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail_next {
            self.fail_next = false;
            return Err(MockError);
        }

        let mut pointer = 0u8;
        let mut written: Option<(u8, Vec<u8>)> = None;

        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let Some((reg, data)) = bytes.split_first() else {
                        continue;
                    };
                    pointer = *reg;
                    for (i, byte) in data.iter().enumerate() {
                        self.registers
                            .insert((address, reg.wrapping_add(i as u8)), *byte);
                    }
                    written = Some((*reg, data.to_vec()));
                }
                Operation::Read(buf) => {
                    for (i, byte) in buf.iter_mut().enumerate() {
                        *byte = self
                            .registers
                            .get(&(address, pointer.wrapping_add(i as u8)))
                            .copied()
                            .unwrap_or(0);
                    }
                    self.transactions.push(Transaction::WriteRead {
                        addr: address,
                        reg: pointer,
                        len: buf.len(),
                    });
                    written = None;
                }
            }
        }

        if let Some((reg, data)) = written {
            self.transactions.push(Transaction::Write {
                addr: address,
                reg,
                data,
            });
        }

        Ok(())
    }
}

/// Shared bus handed out to drivers as `RefCellDevice`s
#[derive(Default)]
pub struct MockBus {
    bus: RefCell<MockI2c>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(&self) -> RefCellDevice<'_, MockI2c> {
        RefCellDevice::new(&self.bus)
    }

    pub fn set_register(&self, addr: u8, reg: u8, value: u8) {
        self.bus.borrow_mut().registers.insert((addr, reg), value);
    }

    pub fn set_registers(&self, addr: u8, start: u8, values: &[u8]) {
        for (i, value) in values.iter().enumerate() {
            self.set_register(addr, start.wrapping_add(i as u8), *value);
        }
    }

    pub fn register(&self, addr: u8, reg: u8) -> u8 {
        self.bus
            .borrow()
            .registers
            .get(&(addr, reg))
            .copied()
            .unwrap_or(0)
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.bus.borrow().transactions.clone()
    }

    pub fn clear_transactions(&self) {
        self.bus.borrow_mut().transactions.clear();
    }

    /// Make the next transaction on any device fail
    pub fn fail_next(&self) {
        self.bus.borrow_mut().fail_next = true;
    }
}

/// Delay that returns immediately
pub struct NoDelay;

impl embedded_hal::delay::DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
