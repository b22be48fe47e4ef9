mod cli;

use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;
use tracing::Level;

use stxetx::{Codec, Config, Framer, Status};

use cli::*;


#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = if args.no_checksum {
        Config::none()
    } else {
        Config::new(args.seed, stxetx::crc::crc16::update)
    };

    let task = async move {
        match args.command {
            Command::Encode { input, output, chunk_size } => {
                let input = open_input(input.as_deref()).await?;
                let output = open_output(output.as_deref()).await?;

                cmd_encode(config, input, output, chunk_size).await
            },
            Command::Decode { input, output, format, max_frame_size } => {
                let input = open_input(input.as_deref()).await?;
                let output = open_output(output.as_deref()).await?;
                let codec = Codec::with_max_frame_size(config, max_frame_size);

                cmd_decode(codec, input, output, format).await
            },
        }
    };

    tokio::select! {
        res = task => res,
        sig = tokio::signal::ctrl_c() => {
            sig?;
            tracing::trace!("termination requested");
            Ok(())
        },
    }
}

async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncRead + Unpin>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path).await
                .with_context(|| format!("failed to open input file '{}'", path.display()))?;

            Ok(Box::new(file))
        },
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

async fn open_output(path: Option<&Path>) -> Result<Box<dyn AsyncWrite + Unpin>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::create(path).await
                .with_context(|| format!("failed to create output file '{}'", path.display()))?;

            Ok(Box::new(file))
        },
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

async fn cmd_encode<R, W>(config: Config, mut input: R, mut output: W, chunk_size: NonZeroUsize)
    -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut payload = Vec::new();
    input.read_to_end(&mut payload).await
        .context("failed to read payload")?;

    let mut framer = Framer::new(config);
    let mut buf = vec![0; chunk_size.get()];
    let mut src = &payload[..];
    let mut written = 0;

    loop {
        let p = framer.encode(src, &mut buf);

        output.write_all(&buf[..p.produced]).await?;
        src = &src[p.consumed..];
        written += p.produced;

        match p.status {
            Status::Done => break,
            Status::Overflow => continue,
            status => anyhow::bail!("unexpected encoder status: {status}"),
        }
    }

    output.flush().await?;

    tracing::debug!("encoded {} payload bytes into {} bytes", payload.len(), written);
    Ok(())
}

async fn cmd_decode<R, W>(codec: Codec, input: R, mut output: W, format: Format) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frames = FramedRead::new(input, codec);
    let mut count = 0;

    while let Some(frame) = frames.next().await {
        let frame = frame.context("failed to read frames")?;
        count += 1;

        match format {
            Format::Raw => {
                output.write_all(&frame).await?;
            },
            Format::Hex => {
                let dump = pretty_hex::config_hex(&frame, pretty_hex::HexConfig {
                    title: false,
                    ..Default::default()
                });

                let text = format!("frame {count}: {} bytes\n{dump}\n", frame.len());
                output.write_all(text.as_bytes()).await?;
            },
        }

        output.flush().await?;
    }

    tracing::debug!("decoded {count} frames");
    Ok(())
}
