//! Streaming gzip for snapshot files.

use crate::error::{Result, VaultError};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Gzip everything from `reader` into `writer`. Returns uncompressed bytes read.
pub fn compress<R: Read, W: Write>(mut reader: R, writer: W) -> Result<u64> {
    let mut encoder = GzEncoder::new(writer, Compression::default());
    let n = std::io::copy(&mut reader, &mut encoder)
        .map_err(|e| VaultError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| VaultError::Compression(e.to_string()))?;
    Ok(n)
}

/// Gunzip everything from `reader` into `writer`. Returns decompressed bytes written.
pub fn decompress<R: Read, W: Write>(reader: R, mut writer: W) -> Result<u64> {
    let mut decoder = GzDecoder::new(reader);
    let n = std::io::copy(&mut decoder, &mut writer)
        .map_err(|e| VaultError::Compression(format!("decompress: {e}")))?;
    writer.flush()?;
    Ok(n)
}

/// True if `path` starts with the gzip magic bytes.
pub fn is_gzip(path: &Path) -> Result<bool> {
    let mut head = [0u8; 2];
    let mut f = File::open(path)?;
    let mut filled = 0;
    while filled < head.len() {
        match f.read(&mut head[filled..])? {
            0 => return Ok(false),
            n => filled += n,
        }
    }
    Ok(head == GZIP_MAGIC)
}

/// Write `src` into `dst`, decompressing when `src` is gzip and copying otherwise.
pub fn expand_into<W: Write>(src: &Path, mut dst: W) -> Result<u64> {
    let compressed = is_gzip(src)?;
    let mut reader = File::open(src)?;
    if compressed {
        decompress(reader, dst)
    } else {
        let n = std::io::copy(&mut reader, &mut dst)?;
        dst.flush()?;
        Ok(n)
    }
}
