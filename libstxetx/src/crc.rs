//! CRC-16 checksum usable as frame checksum.
//!
//! Polynomial `0x8005`, processed MSB-first without reflection or final XOR,
//! seeded with `0xFFFF`. This parameter set is also known as CRC-16/CMS.

pub mod crc16 {
    pub const POLY: u16 = 0x8005;
    pub const INIT: u16 = 0xFFFF;

    /// Fold one byte into the running CRC value.
    pub fn update(crc: u16, byte: u8) -> u16 {
        let mut crc = crc ^ ((byte as u16) << 8);

        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
        }

        crc
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    value: u16,
}

impl Crc16 {
    pub fn new() -> Self {
        Self { value: crc16::INIT }
    }

    pub fn put_u8(&mut self, byte: u8) -> &mut Self {
        self.value = crc16::update(self.value, byte);
        self
    }

    pub fn put_bytes<'a, T: IntoIterator<Item = &'a u8>>(&mut self, bytes: T) -> &mut Self {
        for b in bytes.into_iter() {
            self.put_u8(*b);
        }
        self
    }

    pub fn value(&self) -> u16 {
        self.value
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

pub fn crc16(data: &[u8]) -> u16 {
    Crc16::new().put_bytes(data).value()
}
