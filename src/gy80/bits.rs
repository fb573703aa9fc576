/// A contiguous field inside an 8-bit register.
/// `bit` is the most significant bit of the field, `length` its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitBlock {
    pub bit: u8,
    pub length: u8,
}

impl BitBlock {
    fn mask(&self) -> u8 {
        (((1u16 << self.length) - 1) as u8) << self.shift()
    }

    fn shift(&self) -> u8 {
        self.bit + 1 - self.length
    }
}

pub fn get_bit(byte: u8, n: u8) -> u8 {
    (byte >> n) & 1
}

pub fn set_bit(byte: &mut u8, n: u8, enable: bool) {
    if enable {
        *byte |= 1 << n;
    } else {
        *byte &= !(1 << n);
    }
}

/// Extract `block` from `byte`, shifted down to bit 0
pub fn get_bits(byte: u8, block: BitBlock) -> u8 {
    (byte & block.mask()) >> block.shift()
}

/// Replace `block` in `byte` with the low bits of `data`
pub fn set_bits(byte: &mut u8, block: BitBlock, data: u8) {
    let mask = block.mask();
    *byte = (*byte & !mask) | ((data << block.shift()) & mask);
}
