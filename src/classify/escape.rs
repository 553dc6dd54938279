use std::io::Write;

use crate::classify::bytes::{Cursor, Sink};
use crate::classify::{ClassifyError, Result};

/// Escape marker; never followed by anything but a terminator or continuation byte in raw mode.
pub const ESCAPE: u8 = 0xFF;
/// Byte after [`ESCAPE`] that ends a raw buffer.
pub const TERMINATOR: u8 = 0x00;
/// Byte after [`ESCAPE`] that stands for a literal `0xFF`.
pub const ESCAPED_FF: u8 = 0x01;

/// Write an arbitrary byte buffer without a length prefix.
pub fn write_raw<W: Write>(sink: &mut Sink<W>, bytes: &[u8]) -> Result<()> {
	let mut start = 0;
	for (idx, byte) in bytes.iter().enumerate() {
		if *byte == ESCAPE {
			sink.write_all(&bytes[start..=idx])?;
			sink.write_u8(ESCAPED_FF)?;
			start = idx + 1;
		}
	}
	sink.write_all(&bytes[start..])?;
	sink.write_all(&[ESCAPE, TERMINATOR])
}

/// Write a UTF-8 string closed by a bare `0xFF`.
pub fn write_str<W: Write>(sink: &mut Sink<W>, value: &str) -> Result<()> {
	sink.write_all(value.as_bytes())?;
	sink.write_u8(ESCAPE)
}

/// Read a raw buffer written by [`write_raw`].
pub fn read_raw(cursor: &mut Cursor<'_>) -> Result<Vec<u8>> {
	let mut out = Vec::new();
	loop {
		let byte = cursor.read_u8()?;
		if byte != ESCAPE {
			out.push(byte);
			continue;
		}

		let at = cursor.pos();
		match cursor.read_u8()? {
			TERMINATOR => return Ok(out),
			ESCAPED_FF => out.push(ESCAPE),
			got => return Err(ClassifyError::BadEscape { at, got }),
		}
	}
}

/// Read a UTF-8 string written by [`write_str`].
pub fn read_str(cursor: &mut Cursor<'_>) -> Result<String> {
	let at = cursor.pos();
	let mut out = Vec::new();
	loop {
		let byte = cursor.read_u8()?;
		if byte == ESCAPE {
			break;
		}
		out.push(byte);
	}
	String::from_utf8(out).map_err(|_| ClassifyError::InvalidUtf8 { at })
}

#[cfg(test)]
mod tests {
	use super::{read_raw, read_str, write_raw, write_str};
	use crate::classify::ClassifyError;
	use crate::classify::bytes::{Cursor, Sink};

	#[test]
	fn raw_buffer_with_literal_ff_round_trips() {
		let payload = [0x00, 0xFF, 0xFF, 0x01];
		let mut sink = Sink::new(Vec::new());
		write_raw(&mut sink, &payload).expect("write");
		let bytes = sink.into_inner();
		assert_eq!(bytes, vec![0x00, 0xFF, 0x01, 0xFF, 0x01, 0x01, 0xFF, 0x00]);

		let mut cursor = Cursor::new(&bytes);
		assert_eq!(read_raw(&mut cursor).expect("read"), payload);
		assert_eq!(cursor.remaining(), 0);
	}

	#[test]
	fn empty_raw_buffer_is_only_the_terminator() {
		let mut sink = Sink::new(Vec::new());
		write_raw(&mut sink, &[]).expect("write");
		assert_eq!(sink.into_inner(), vec![0xFF, 0x00]);
	}

	#[test]
	fn string_mode_uses_bare_terminator() {
		let mut sink = Sink::new(Vec::new());
		write_str(&mut sink, "héllo").expect("write");
		write_str(&mut sink, "").expect("write");
		let bytes = sink.into_inner();
		assert_eq!(bytes.last().copied(), Some(0xFF));

		let mut cursor = Cursor::new(&bytes);
		assert_eq!(read_str(&mut cursor).expect("read"), "héllo");
		assert_eq!(read_str(&mut cursor).expect("read"), "");
		assert_eq!(cursor.remaining(), 0);
	}

	#[test]
	fn bad_escape_is_corruption() {
		let err = read_raw(&mut Cursor::new(&[0x41, 0xFF, 0x07])).expect_err("bad escape fails");
		assert!(matches!(err, ClassifyError::BadEscape { at: 2, got: 0x07 }));
	}

	#[test]
	fn unterminated_buffer_is_eof() {
		let err = read_raw(&mut Cursor::new(&[0x41, 0x42])).expect_err("missing terminator fails");
		assert!(matches!(err, ClassifyError::UnexpectedEof { .. }));
	}

	#[test]
	fn invalid_utf8_string_is_corruption() {
		let err = read_str(&mut Cursor::new(&[0xC3, 0x28, 0xFF])).expect_err("invalid utf-8 fails");
		assert!(matches!(err, ClassifyError::InvalidUtf8 { at: 0 }));
	}
}
