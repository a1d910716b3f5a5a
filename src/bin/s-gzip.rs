use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use s_gzip::{GzipReader, GzipWriter, BEST_COMPRESSION, BEST_SPEED, DEFAULT_LEVEL};

const BLOCK_SIZE: usize = 64 * 1024;

#[derive(Parser)]
#[command(name = "s-gzip")]
#[command(about = "Compress FILE to FILE.gz, or decompress FILE.gz back to FILE")]
struct Cli {
    /// Input file
    file: PathBuf,

    /// Use the fastest compression level
    #[arg(long, conflicts_with_all = ["best", "level", "decompress"])]
    fast: bool,

    /// Use the best compression level
    #[arg(long, conflicts_with_all = ["level", "decompress"])]
    best: bool,

    /// Compression level (0-9)
    #[arg(short, long, conflicts_with = "decompress")]
    level: Option<u32>,

    /// Decompress the file instead of compressing it
    #[arg(short, long)]
    decompress: bool,
}

impl Cli {
    fn compression_level(&self) -> u32 {
        if self.fast {
            BEST_SPEED
        } else if self.best {
            BEST_COMPRESSION
        } else {
            self.level.unwrap_or(DEFAULT_LEVEL)
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.decompress {
        decompress_file(&cli.file)
    } else {
        compress_file(&cli.file, cli.compression_level())
    }
}

fn compress_file(input: &Path, level: u32) -> Result<()> {
    let mut out_name = input.as_os_str().to_owned();
    out_name.push(".gz");
    let output = PathBuf::from(out_name);

    let mut source =
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let mut writer = GzipWriter::create_with_level(&output, level)
        .with_context(|| format!("failed to create {}", output.display()))?;
    copy_blocks(&mut source, &mut writer)?;
    writer
        .close()
        .with_context(|| format!("failed to finish {}", output.display()))?;

    log::info!("compressed {} -> {}", input.display(), output.display());
    Ok(())
}

fn decompress_file(input: &Path) -> Result<()> {
    if input.extension().and_then(|e| e.to_str()) != Some("gz") {
        bail!("Can only decompress files with a .gz extension");
    }
    let output = input.with_extension("");

    let mut reader =
        GzipReader::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let mut sink =
        File::create(&output).with_context(|| format!("failed to create {}", output.display()))?;
    copy_blocks(&mut reader, &mut sink)
        .with_context(|| format!("failed to decompress {}", input.display()))?;
    sink.flush()?;

    log::info!("decompressed {} -> {}", input.display(), output.display());
    Ok(())
}

fn copy_blocks<R: Read, W: Write>(input: &mut R, output: &mut W) -> Result<u64> {
    let mut buf = vec![0u8; BLOCK_SIZE];
    let mut total = 0u64;
    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            return Ok(total);
        }
        output.write_all(&buf[..n])?;
        total += n as u64;
    }
}
