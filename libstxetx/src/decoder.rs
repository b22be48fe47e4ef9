use super::consts::flags::{END, ESCAPE, START};
use super::{Framer, Overflow, Progress, State, Status, Writer};


impl Framer {
    /// Decode framed bytes from `src` into payload bytes in `dst`.
    ///
    /// Processing stops at the end of a frame, on the first error, or when a
    /// payload byte does not fit into `dst`. In the latter case the byte is
    /// left unconsumed and the call returns [`Status::Overflow`]: pass the
    /// remaining input again with fresh output space to continue. The framer
    /// is reset after [`Status::Done`] and after any error.
    pub fn decode(&mut self, src: &[u8], dst: &mut [u8]) -> Progress {
        let mut out = Writer::new(dst);
        let mut consumed = 0;
        let mut status = Status::Continue;

        for &byte in src {
            let state = self.state;

            match self.decode_byte(byte, &mut out) {
                Ok(s) => status = s,
                Err(overflow) => {
                    status = overflow.into();
                    break;
                },
            }

            consumed += 1;

            // the trailing checksum is not part of the checksummed data
            if !matches!(state, State::ChecksumByte0 | State::ChecksumByte1) {
                self.update_checksum(byte);
            }

            match status {
                Status::Continue => {},
                Status::InvalidChar => {
                    tracing::debug!("invalid character {byte:#04x} in state {state:?}");
                    break;
                },
                Status::InvalidChecksum => {
                    tracing::debug!(
                        "checksum mismatch: received {:#06x}, computed {:#06x}",
                        self.received_checksum, self.computed_checksum,
                    );
                    break;
                },
                _ => break,
            }
        }

        if status == Status::Done || status.is_error() {
            self.reset();
        }

        Progress {
            consumed,
            produced: out.written(),
            status,
        }
    }

    fn decode_byte(&mut self, byte: u8, out: &mut Writer<'_>) -> Result<Status, Overflow> {
        let status = match (self.state, byte) {
            (State::Idle, START) => {
                tracing::trace!("start of frame");
                self.state = State::Started;
                Status::Continue
            },
            (State::Idle, _) => Status::InvalidChar,

            (State::Started, START) => Status::InvalidChar,
            (State::Started, END) => {
                if self.config.has_checksum() {
                    self.state = State::ChecksumByte0;
                    Status::Continue
                } else {
                    self.state = State::Idle;
                    Status::Done
                }
            },
            (State::Started, ESCAPE) => {
                self.state = State::EscapeLatched;
                Status::Continue
            },
            (State::Started, b) => {
                out.put_u8(b)?;
                Status::Continue
            },

            (State::EscapeLatched, START | END | ESCAPE) => {
                out.put_u8(byte)?;
                self.state = State::Started;
                Status::Continue
            },
            (State::EscapeLatched, _) => Status::InvalidChar,

            (State::ChecksumByte0, b) => {
                self.received_checksum = b as u16;
                self.state = State::ChecksumByte1;
                Status::Continue
            },
            (State::ChecksumByte1, b) => {
                self.received_checksum |= (b as u16) << 8;
                self.state = State::Idle;

                if self.received_checksum == self.computed_checksum {
                    Status::Done
                } else {
                    Status::InvalidChecksum
                }
            },
        };

        Ok(status)
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::Config;

    fn decode(framer: &mut Framer, src: &[u8], cap: usize) -> (Progress, Vec<u8>) {
        let mut dst = vec![0; cap];
        let p = framer.decode(src, &mut dst);
        dst.truncate(p.produced);
        (p, dst)
    }

    fn progress(consumed: usize, produced: usize, status: Status) -> Progress {
        Progress { consumed, produced, status }
    }

    #[test]
    fn test_decode_no_checksum() {
        let mut dec = Framer::new(Config::none());

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x03], 1);
        assert_eq!(p, progress(3, 1, Status::Done));
        assert_eq!(out, [0x00]);

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x01, 0x03], 2);
        assert_eq!(p, progress(4, 2, Status::Done));
        assert_eq!(out, [0x00, 0x01]);

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x01, 0x10, 0x10, 0x03], 3);
        assert_eq!(p, progress(6, 3, Status::Done));
        assert_eq!(out, [0x00, 0x01, 0x10]);

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x01, 0x10, 0x02, 0x03], 3);
        assert_eq!(p, progress(6, 3, Status::Done));
        assert_eq!(out, [0x00, 0x01, 0x02]);

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x01, 0x10, 0x03, 0x03], 3);
        assert_eq!(p, progress(6, 3, Status::Done));
        assert_eq!(out, [0x00, 0x01, 0x03]);

        // empty frame
        let (p, out) = decode(&mut dec, &[0x02, 0x03], 0);
        assert_eq!(p, progress(2, 0, Status::Done));
        assert!(out.is_empty());
    }

    #[test]
    fn test_decode_checksum() {
        let mut dec = Framer::new(Config::crc16());

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x03, 0x22, 0x0E], 1);
        assert_eq!(p, progress(5, 1, Status::Done));
        assert_eq!(out, [0x00]);

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x01, 0x03, 0x2E, 0x2E], 2);
        assert_eq!(p, progress(6, 2, Status::Done));
        assert_eq!(out, [0x00, 0x01]);

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x01, 0x10, 0x10, 0x03, 0x92, 0x85], 3);
        assert_eq!(p, progress(8, 3, Status::Done));
        assert_eq!(out, [0x00, 0x01, 0x10]);

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x01, 0x10, 0x02, 0x03, 0x92, 0xE9], 3);
        assert_eq!(p, progress(8, 3, Status::Done));
        assert_eq!(out, [0x00, 0x01, 0x02]);

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x01, 0x10, 0x03, 0x03, 0x91, 0x6F], 3);
        assert_eq!(p, progress(8, 3, Status::Done));
        assert_eq!(out, [0x00, 0x01, 0x03]);
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut dec = Framer::new(Config::crc16());

        let (p, _) = decode(&mut dec, &[0x02, 0x00, 0x03, 0x22, 0x0F], 4);
        assert_eq!(p, progress(5, 1, Status::InvalidChecksum));
        assert_eq!(dec.state(), State::Idle);

        // checksum bytes with flag values are taken verbatim
        let (p, _) = decode(&mut dec, &[0x02, 0x00, 0x03, 0x02, 0x10], 4);
        assert_eq!(p, progress(5, 1, Status::InvalidChecksum));

        // the accumulator starts over for the next frame
        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x03, 0x22, 0x0E], 4);
        assert_eq!(p, progress(5, 1, Status::Done));
        assert_eq!(out, [0x00]);
    }

    #[test]
    fn test_decode_invalid_char() {
        let mut dec = Framer::new(Config::none());

        // no start flag
        let (p, _) = decode(&mut dec, &[0xFF, 0x02, 0x00, 0x03], 4);
        assert_eq!(p, progress(1, 0, Status::InvalidChar));
        assert_eq!(dec.state(), State::Idle);

        // end/escape flag outside of frame
        assert_eq!(decode(&mut dec, &[0x03], 4).0, progress(1, 0, Status::InvalidChar));
        assert_eq!(decode(&mut dec, &[0x10], 4).0, progress(1, 0, Status::InvalidChar));

        // unescaped start flag inside frame
        let (p, _) = decode(&mut dec, &[0x02, 0x02, 0x00, 0x03], 4);
        assert_eq!(p, progress(2, 0, Status::InvalidChar));
        assert_eq!(dec.state(), State::Idle);

        // escape followed by a regular byte
        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x10, 0x12, 0x03], 5);
        assert_eq!(p, progress(4, 1, Status::InvalidChar));
        assert_eq!(out, [0x00]);
        assert_eq!(dec.state(), State::Idle);
    }

    #[test]
    fn test_decode_resync() {
        let mut dec = Framer::new(Config::none());
        let data = [0x02, 0x00, 0x10, 0x12, 0x03, 0x02, 0x05, 0x03];

        let (p, _) = decode(&mut dec, &data, 8);
        assert_eq!(p.status, Status::InvalidChar);

        // the stray end flag of the broken frame is rejected as well
        let (q, _) = decode(&mut dec, &data[p.consumed..], 8);
        assert_eq!(q, progress(1, 0, Status::InvalidChar));

        let (r, out) = decode(&mut dec, &data[p.consumed + q.consumed..], 8);
        assert_eq!(r, progress(3, 1, Status::Done));
        assert_eq!(out, [0x05]);
    }

    #[test]
    fn test_decode_split_input() {
        let mut dec = Framer::new(Config::none());

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x01], 2);
        assert_eq!(p, progress(3, 2, Status::Continue));
        assert_eq!(out, [0x00, 0x01]);

        let (p, out) = decode(&mut dec, &[0x10, 0x10, 0x03], 1);
        assert_eq!(p, progress(3, 1, Status::Done));
        assert_eq!(out, [0x10]);

        // split right after the escape byte
        let (p, _) = decode(&mut dec, &[0x02, 0x10], 0);
        assert_eq!(p, progress(2, 0, Status::Continue));
        assert_eq!(dec.state(), State::EscapeLatched);

        let (p, out) = decode(&mut dec, &[0x03, 0x03], 1);
        assert_eq!(p, progress(2, 1, Status::Done));
        assert_eq!(out, [0x03]);
    }

    #[test]
    fn test_decode_split_checksum() {
        let mut dec = Framer::new(Config::crc16());

        let (p, _) = decode(&mut dec, &[0x02, 0x00, 0x03, 0x22], 1);
        assert_eq!(p, progress(4, 1, Status::Continue));
        assert_eq!(dec.state(), State::ChecksumByte1);

        let (p, _) = decode(&mut dec, &[0x0E], 0);
        assert_eq!(p, progress(1, 0, Status::Done));
        assert_eq!(dec.state(), State::Idle);
    }

    #[test]
    fn test_decode_overflow() {
        let mut dec = Framer::new(Config::none());

        let (p, out) = decode(&mut dec, &[0x02, 0x00, 0x01, 0x10, 0x10, 0x03], 2);
        assert_eq!(p, progress(4, 2, Status::Overflow));
        assert_eq!(out, [0x00, 0x01]);
        assert_eq!(dec.state(), State::EscapeLatched);

        let (p, out) = decode(&mut dec, &[0x10, 0x03], 2);
        assert_eq!(p, progress(2, 1, Status::Done));
        assert_eq!(out, [0x10]);

        // plain byte into zero-sized output
        let (p, _) = decode(&mut dec, &[0x02, 0x00, 0x03], 0);
        assert_eq!(p, progress(1, 0, Status::Overflow));
        assert_eq!(dec.state(), State::Started);

        let (p, out) = decode(&mut dec, &[0x00, 0x03], 1);
        assert_eq!(p, progress(2, 1, Status::Done));
        assert_eq!(out, [0x00]);
    }

    #[test]
    fn test_decode_overflow_keeps_checksum() {
        let mut dec = Framer::new(Config::crc16());
        let data = [0x02, 0x00, 0x01, 0x10, 0x10, 0x03, 0x92, 0x85];

        // a byte rejected for lack of space must not enter the checksum
        let (p, _) = decode(&mut dec, &data, 1);
        assert_eq!(p, progress(2, 1, Status::Overflow));

        let (q, _) = decode(&mut dec, &data[2..], 1);
        assert_eq!(q, progress(2, 1, Status::Overflow));

        let (r, out) = decode(&mut dec, &data[4..], 1);
        assert_eq!(r, progress(4, 1, Status::Done));
        assert_eq!(out, [0x10]);
    }

    #[test]
    fn test_decode_empty_input() {
        let mut dec = Framer::new(Config::none());

        let (p, _) = decode(&mut dec, &[], 4);
        assert_eq!(p, progress(0, 0, Status::Continue));
        assert_eq!(dec.state(), State::Idle);
    }

    #[test]
    fn test_decode_stops_after_frame() {
        let mut dec = Framer::new(Config::none());
        let data = [0x02, 0x07, 0x03, 0x02, 0x08, 0x03];

        let (p, out) = decode(&mut dec, &data, 4);
        assert_eq!(p, progress(3, 1, Status::Done));
        assert_eq!(out, [0x07]);

        let (p, out) = decode(&mut dec, &data[3..], 4);
        assert_eq!(p, progress(3, 1, Status::Done));
        assert_eq!(out, [0x08]);
    }
}
