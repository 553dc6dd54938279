use std::io::Read;

use crate::classify::{ClassifyError, Result};

const MAX_DECOMPRESSED_BYTES: usize = 512 * 1024 * 1024;
const DEFAULT_ZSTD_LEVEL: i32 = 3;
/// zstd frame magic. Its first byte has the reserved tag bit set, so it never starts a document.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compression applied to a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
	/// Raw node stream.
	None,
	/// zstd-compressed node stream.
	Zstd,
}

impl Compression {
	/// Render compression mode as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Zstd => "zstd",
		}
	}
}

/// How documents are written to disk.
#[derive(Debug, Clone)]
pub struct FileOptions {
	/// Compression applied on save.
	pub compression: Compression,
	/// zstd level when compressing.
	pub level: i32,
}

impl Default for FileOptions {
	fn default() -> Self {
		Self {
			compression: Compression::None,
			level: DEFAULT_ZSTD_LEVEL,
		}
	}
}

impl FileOptions {
	/// zstd at the default level.
	pub fn zstd() -> Self {
		Self {
			compression: Compression::Zstd,
			..Self::default()
		}
	}
}

/// Apply the configured compression.
pub fn encode_bytes(raw: Vec<u8>, opt: &FileOptions) -> Result<Vec<u8>> {
	match opt.compression {
		Compression::None => Ok(raw),
		Compression::Zstd => Ok(zstd::stream::encode_all(raw.as_slice(), opt.level)?),
	}
}

/// Detect and decode compression, returning `(mode, decoded_bytes)`.
pub fn decode_bytes(raw: Vec<u8>) -> Result<(Compression, Vec<u8>)> {
	if raw.is_empty() {
		return Err(ClassifyError::UnknownMagic { magic: [0; 4] });
	}

	if raw.starts_with(&ZSTD_MAGIC) {
		let out = decode_zstd(&raw)?;
		return Ok((Compression::Zstd, out));
	}

	Ok((Compression::None, raw))
}

fn decode_zstd(raw: &[u8]) -> Result<Vec<u8>> {
	let decoder = zstd::stream::read::Decoder::new(raw)?;
	let mut out = Vec::new();
	decoder.take(MAX_DECOMPRESSED_BYTES as u64 + 1).read_to_end(&mut out)?;
	if out.len() > MAX_DECOMPRESSED_BYTES {
		return Err(ClassifyError::DecompressedTooLarge { limit: MAX_DECOMPRESSED_BYTES });
	}
	Ok(out)
}
