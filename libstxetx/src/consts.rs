//! Marker bytes used in the STX/ETX encoding.

pub mod flags {
    /// Start of text, opens a frame.
    pub const START: u8 = 0x02;

    /// End of text, closes the frame body.
    pub const END: u8 = 0x03;

    /// Data link escape, precedes a payload byte equal to any flag.
    pub const ESCAPE: u8 = 0x10;
}

/// Size of the trailing checksum, if enabled.
pub const CHECKSUM_SIZE: usize = 2;


pub fn is_flag(byte: u8) -> bool {
    matches!(byte, flags::START | flags::END | flags::ESCAPE)
}
