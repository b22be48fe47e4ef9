//! Resumable STX/ETX framing for serial links.
//!
//! Frames are delimited by `START` and `END` flags, payload bytes colliding
//! with a flag are preceded by an `ESCAPE` byte, and an optional 16-bit
//! checksum over the frame body is appended (low byte first):
//!
//! ```text
//! START | payload (byte-stuffed) | END | [checksum lo | checksum hi]
//! ```
//!
//! The [`Framer`] state machine encodes and decodes incrementally between
//! caller-supplied slices of any size and never allocates. [`Codec`] adapts
//! it to `tokio_util::codec` for use on async byte streams.

pub mod codec;
pub mod consts;
pub mod crc;

mod decoder;
mod encoder;

pub use codec::Codec;


/// Outcome of a single [`Framer::encode`] or [`Framer::decode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Frame complete.
    Done,
    /// More input required.
    Continue,
    /// Output buffer exhausted, call again with more space.
    Overflow,
    /// Byte not allowed in the current decoder state.
    InvalidChar,
    /// Trailing checksum does not match the frame body.
    InvalidChecksum,
}

impl Status {
    pub fn is_error(self) -> bool {
        matches!(self, Status::InvalidChar | Status::InvalidChecksum)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Status::Done => "Frame complete",
            Status::Continue => "Frame incomplete, waiting for input",
            Status::Overflow => "Frame incomplete, output buffer exhausted",
            Status::InvalidChar => "Invalid character",
            Status::InvalidChecksum => "Invalid checksum",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}


/// Byte counts and status reported by one encode/decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Number of bytes read from the input slice.
    pub consumed: usize,
    /// Number of bytes written to the output slice.
    pub produced: usize,
    pub status: Status,
}


/// Checksum update function: `(accumulator, byte) -> accumulator`.
pub type UpdateFn = fn(u16, u8) -> u16;

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Value the checksum accumulator is seeded with at the start of a frame.
    pub initial_checksum: u16,

    /// Checksum update function. No checksum is sent or expected if `None`.
    pub update_checksum: Option<UpdateFn>,
}

impl Config {
    pub const fn new(initial_checksum: u16, update_checksum: UpdateFn) -> Self {
        Self {
            initial_checksum,
            update_checksum: Some(update_checksum),
        }
    }

    pub const fn none() -> Self {
        Self {
            initial_checksum: 0,
            update_checksum: None,
        }
    }

    /// CRC-16 (polynomial `0x8005`, seed `0xFFFF`), see [`crc::crc16`].
    pub const fn crc16() -> Self {
        Self::new(crc::crc16::INIT, crc::crc16::update)
    }

    pub const fn has_checksum(&self) -> bool {
        self.update_checksum.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::crc16()
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Idle,
    Started,
    EscapeLatched,
    ChecksumByte0,
    ChecksumByte1,
}


/// Encoder/decoder state for one logical byte stream.
///
/// A frame in progress is only ever driven in one direction. The instance
/// returns to [`State::Idle`] on its own whenever a frame is completed or a
/// decoding error is detected.
#[derive(Debug, Clone)]
pub struct Framer {
    state: State,
    computed_checksum: u16,
    received_checksum: u16,
    config: Config,
}

impl Framer {
    pub fn new(config: Config) -> Self {
        Self {
            state: State::Idle,
            computed_checksum: config.initial_checksum,
            received_checksum: 0,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Abandon the current frame, if any.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.computed_checksum = self.config.initial_checksum;
        self.received_checksum = 0;
    }

    fn update_checksum(&mut self, byte: u8) {
        if let Some(update) = self.config.update_checksum {
            self.computed_checksum = update(self.computed_checksum, byte);
        }
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(Config::default())
    }
}


/// Upper bound for the encoded size of a payload of `payload_len` bytes.
pub const fn max_encoded_len(payload_len: usize, config: &Config) -> usize {
    let checksum = if config.has_checksum() { consts::CHECKSUM_SIZE } else { 0 };
    2 + 2 * payload_len + checksum
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Overflow;

impl From<Overflow> for Status {
    fn from(_: Overflow) -> Self {
        Status::Overflow
    }
}

/// Bounded writer over a caller-supplied output slice.
struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put_u8(&mut self, byte: u8) -> Result<(), Overflow> {
        let slot = self.buf.get_mut(self.pos).ok_or(Overflow)?;
        *slot = byte;
        self.pos += 1;
        Ok(())
    }

    fn written(&self) -> usize {
        self.pos
    }
}
