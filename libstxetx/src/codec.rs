//! Adapter for `tokio_util::codec`, turning byte streams into payload frames.

use bytes::{Buf, Bytes, BytesMut};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};

use super::{max_encoded_len, Config, Framer, Status};


/// Default upper limit for decoded and encoded payloads.
pub const MAX_FRAME_SIZE: usize = 4096;


#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    FrameTooLarge { size: usize, max: usize },
    Incomplete(Status),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::FrameTooLarge { size, max } => {
                write!(f, "frame of length {size} is too large (max: {max})")
            },
            Error::Incomplete(status) => write!(f, "failed to encode frame: {status}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}


/// Frame codec for async byte streams.
///
/// Decoding is lenient: frames with invalid characters or checksums are
/// logged and dropped, and decoding resumes with the next start flag. Only
/// I/O errors are passed on.
#[derive(Debug)]
pub struct Codec {
    dec: Framer,
    enc: Framer,
    payload: BytesMut,
    max_frame_size: usize,
    discard: bool,
}

impl Codec {
    pub fn new(config: Config) -> Self {
        Self::with_max_frame_size(config, MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(config: Config, max_frame_size: usize) -> Self {
        Self {
            dec: Framer::new(config),
            enc: Framer::new(config),
            payload: BytesMut::new(),
            max_frame_size,
            discard: false,
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    pub fn wrap<T>(self, io: T) -> Framed<T, Codec>
    where
        T: AsyncRead + AsyncWrite,
    {
        Framed::with_capacity(io, self, MAX_FRAME_SIZE)
    }

    fn drop_frame(&mut self) {
        self.payload.clear();
        self.discard = false;
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Decoder for Codec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while !src.is_empty() {
            let idle = self.dec.is_idle();

            // every payload byte takes up at least one byte on the wire
            let start = self.payload.len();
            self.payload.resize(start + src.len(), 0);

            let p = self.dec.decode(&src[..], &mut self.payload[start..]);

            self.payload.truncate(start + p.produced);
            src.advance(p.consumed);

            match p.status {
                Status::Done if self.discard || self.payload.len() > self.max_frame_size => {
                    tracing::warn!("dropping frame exceeding {} bytes", self.max_frame_size);
                    self.drop_frame();
                },
                Status::Done => {
                    self.discard = false;
                    return Ok(Some(self.payload.split().freeze()));
                },
                Status::InvalidChar if idle && p.consumed == 1 => {
                    tracing::debug!("discarding data outside of frame");
                    self.drop_frame();
                },
                Status::InvalidChar | Status::InvalidChecksum => {
                    tracing::warn!("error decoding data: {}", p.status);
                    self.drop_frame();
                },
                Status::Continue | Status::Overflow => {
                    if self.payload.len() > self.max_frame_size {
                        self.discard = true;
                    }

                    if self.discard {
                        self.payload.clear();
                    }
                },
            }
        }

        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        if !self.dec.is_idle() {
            tracing::warn!("stream ended within frame, dropping {} bytes", self.payload.len());

            self.dec.reset();
            self.drop_frame();
        }

        Ok(None)
    }
}

impl Encoder<&[u8]> for Codec {
    type Error = Error;

    fn encode(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        if payload.len() > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                size: payload.len(),
                max: self.max_frame_size,
            });
        }

        let start = dst.len();
        let size = max_encoded_len(payload.len(), self.enc.config());
        dst.resize(start + size, 0);

        let p = self.enc.encode(payload, &mut dst[start..]);
        dst.truncate(start + p.produced);

        if p.status != Status::Done {
            self.enc.reset();
            dst.truncate(start);
            return Err(Error::Incomplete(p.status));
        }

        Ok(())
    }
}

impl Encoder<Bytes> for Codec {
    type Error = Error;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(&payload[..], dst)
    }
}
