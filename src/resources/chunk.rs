//! Tagged binary chunks.
//!
//! Asset files are a sequence of chunks. Each chunk starts with a four byte
//! magic tag and a little-endian `u32` byte size, followed by that many bytes of
//! tightly packed fixed-size records.

use std::io::{Read, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("i/o error while reading chunk: {0}")]
    Io(#[from] std::io::Error),
    #[error("expected chunk '{expected}', found '{found}'")]
    Magic { expected: String, found: String },
    #[error("chunk '{magic}' is {size} bytes, not a multiple of its {record} byte records")]
    Size {
        magic: String,
        size: u32,
        record: usize,
    },
}

fn tag(magic: &[u8; 4]) -> String {
    String::from_utf8_lossy(magic).into_owned()
}

/// Reads one chunk tagged `magic` and decodes its records.
pub fn read_chunk<T: bytemuck::Pod, R: Read>(
    reader: &mut R,
    magic: &[u8; 4],
) -> Result<Vec<T>, ChunkError> {
    let mut header = [0u8; 8];
    reader.read_exact(&mut header)?;
    let found: [u8; 4] = [header[0], header[1], header[2], header[3]];
    if &found != magic {
        return Err(ChunkError::Magic {
            expected: tag(magic),
            found: tag(&found),
        });
    }
    let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    let record = std::mem::size_of::<T>();
    if size as usize % record != 0 {
        return Err(ChunkError::Size {
            magic: tag(magic),
            size,
            record,
        });
    }
    let mut bytes = vec![0u8; size as usize];
    reader.read_exact(&mut bytes)?;
    Ok(bytes
        .chunks_exact(record)
        .map(bytemuck::pod_read_unaligned::<T>)
        .collect())
}

pub fn write_chunk<T: bytemuck::Pod, W: Write>(
    writer: &mut W,
    magic: &[u8; 4],
    records: &[T],
) -> std::io::Result<()> {
    let bytes: &[u8] = bytemuck::cast_slice(records);
    writer.write_all(magic)?;
    writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
    writer.write_all(bytes)
}

/// Logs a warning if `reader` still has data after the last expected chunk.
pub fn warn_on_trailing<R: Read>(reader: &mut R, label: &str) {
    let mut probe = [0u8; 1];
    match reader.read(&mut probe) {
        Ok(0) => (),
        Ok(_) => log::warn!("'{}' has trailing data after its last chunk; ignoring it.", label),
        Err(e) => log::warn!("Could not check '{}' for trailing data: {}", label, e),
    }
}
