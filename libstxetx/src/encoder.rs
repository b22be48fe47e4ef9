use super::consts::{self, flags::{END, ESCAPE, START}};
use super::{Framer, Overflow, Progress, State, Status, Writer};


impl Framer {
    /// Encode the payload `src` as one frame into `dst`.
    ///
    /// All of `src` is treated as the remainder of the current frame's
    /// payload: once it has been consumed, the end flag and checksum follow.
    /// If `dst` runs out of space the call returns [`Status::Overflow`] with
    /// the unwritten payload byte left unconsumed. Call again with the
    /// remaining input and fresh output space until [`Status::Done`] is
    /// returned.
    pub fn encode(&mut self, src: &[u8], dst: &mut [u8]) -> Progress {
        let mut out = Writer::new(dst);
        let mut consumed = 0;

        let status = match self.encode_frame(src, &mut out, &mut consumed) {
            Ok(status) => status,
            Err(overflow) => overflow.into(),
        };

        if status == Status::Done {
            tracing::trace!("end of frame");
            self.reset();
        }

        Progress {
            consumed,
            produced: out.written(),
            status,
        }
    }

    fn encode_frame(&mut self, src: &[u8], out: &mut Writer<'_>, consumed: &mut usize)
        -> Result<Status, Overflow>
    {
        if self.state == State::Idle {
            self.put_body(out, START)?;
            self.state = State::Started;
        }

        // parked on the checksum: the payload has been consumed already
        if matches!(self.state, State::Started | State::EscapeLatched) {
            for &byte in src {
                if consts::is_flag(byte) {
                    // if latched, the escape byte went out on a previous attempt
                    if self.state == State::Started {
                        self.put_body(out, ESCAPE)?;
                        self.state = State::EscapeLatched;
                    }

                    self.put_body(out, byte)?;
                    self.state = State::Started;
                } else {
                    self.put_body(out, byte)?;
                }

                *consumed += 1;
            }
        }

        if self.state == State::Started {
            self.put_body(out, END)?;

            if !self.config.has_checksum() {
                self.state = State::Idle;
                return Ok(Status::Done);
            }

            self.state = State::ChecksumByte0;
        }

        let [lo, hi] = self.computed_checksum.to_le_bytes();

        if self.state == State::ChecksumByte0 {
            out.put_u8(lo)?;
            self.state = State::ChecksumByte1;
        }

        if self.state == State::ChecksumByte1 {
            out.put_u8(hi)?;
            self.state = State::Idle;
            return Ok(Status::Done);
        }

        // escape latched without the pending byte being passed in
        Ok(Status::Continue)
    }

    fn put_body(&mut self, out: &mut Writer<'_>, byte: u8) -> Result<(), Overflow> {
        out.put_u8(byte)?;
        self.update_checksum(byte);
        Ok(())
    }
}
