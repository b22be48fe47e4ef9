use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};


/// Encode and decode STX/ETX framed data
#[derive(Debug, Parser)]
#[command(name = "stxetx", author, version, about, long_about = None)]
pub struct Args {
    /// Do not append or expect a CRC-16 checksum after each frame
    #[arg(long, global=true)]
    pub no_checksum: bool,

    /// Initial value of the CRC-16 checksum (decimal or 0x-prefixed hex)
    #[arg(long, global=true, default_value="0xFFFF", value_parser=parse_u16)]
    pub seed: u16,

    /// Increase logging verbosity (may be repeated)
    #[arg(short, long, global=true, action=clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Wrap the input into a single frame
    Encode {
        /// File to read the payload from (stdin if unspecified)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// File to write the frame to (stdout if unspecified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Size of the buffer the frame is written through
        #[arg(long, default_value="64")]
        chunk_size: NonZeroUsize,
    },

    /// Extract the payloads of all frames in the input
    ///
    /// Invalid frames are reported and skipped.
    Decode {
        /// File to read frames from (stdin if unspecified)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// File to write payloads to (stdout if unspecified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format for decoded payloads
        #[arg(short, long, value_enum, default_value_t=Format::Raw)]
        format: Format,

        /// Drop frames with payloads larger than this
        #[arg(long, default_value_t=4096)]
        max_frame_size: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Payload bytes, concatenated
    Raw,

    /// Hex dump per frame
    Hex,
}


pub fn parse_u16(value: &str) -> Result<u16, std::num::ParseIntError> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    }
}
