use std::io::Write;

use chrono::{DateTime, Utc};

use crate::classify::{ClassifyError, Result};

/// Tick count of `1970-01-01T00:00:00Z` measured from `0001-01-01T00:00:00Z`.
const UNIX_EPOCH_TICKS: i128 = 621_355_968_000_000_000;
/// Ticks per second (one tick is 100 ns).
const TICKS_PER_SECOND: i128 = 10_000_000;
/// Largest tick count, `9999-12-31T23:59:59.9999999Z`.
pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

/// Simple bounded cursor over an immutable byte slice.
pub struct Cursor<'a> {
	bytes: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	/// Create a cursor at position 0.
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, pos: 0 }
	}

	/// Return current byte offset.
	pub fn pos(&self) -> usize {
		self.pos
	}

	/// Return remaining unread bytes.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.pos)
	}

	/// Read exactly `n` bytes and advance cursor.
	pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(ClassifyError::UnexpectedEof {
				at: self.pos,
				need: n,
				rem: self.remaining(),
			});
		}

		let start = self.pos;
		self.pos += n;
		Ok(&self.bytes[start..self.pos])
	}

	/// Read one byte.
	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(self.read_exact(1)?[0])
	}

	/// Read a fixed-size little-endian chunk.
	pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let raw = self.read_exact(N)?;
		let mut buf = [0_u8; N];
		buf.copy_from_slice(raw);
		Ok(buf)
	}

	/// Read a little-endian `u16`.
	pub fn read_u16_le(&mut self) -> Result<u16> {
		Ok(u16::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `i16`.
	pub fn read_i16_le(&mut self) -> Result<i16> {
		Ok(i16::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `u32`.
	pub fn read_u32_le(&mut self) -> Result<u32> {
		Ok(u32::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `i32`.
	pub fn read_i32_le(&mut self) -> Result<i32> {
		Ok(i32::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `u64`.
	pub fn read_u64_le(&mut self) -> Result<u64> {
		Ok(u64::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `i64`.
	pub fn read_i64_le(&mut self) -> Result<i64> {
		Ok(i64::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `f32`.
	pub fn read_f32_le(&mut self) -> Result<f32> {
		Ok(f32::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `f64`.
	pub fn read_f64_le(&mut self) -> Result<f64> {
		Ok(f64::from_le_bytes(self.read_array()?))
	}

	/// Read an 8-byte tick count and convert it to a UTC timestamp.
	pub fn read_datetime(&mut self) -> Result<DateTime<Utc>> {
		let ticks = self.read_i64_le()?;
		datetime_from_ticks(ticks)
	}
}

/// Fixed-width little-endian writer over any byte sink.
pub struct Sink<W: Write> {
	out: W,
	written: usize,
}

impl<W: Write> Sink<W> {
	/// Wrap a writer.
	pub fn new(out: W) -> Self {
		Self { out, written: 0 }
	}

	/// Number of bytes written so far.
	pub fn written(&self) -> usize {
		self.written
	}

	/// Return the wrapped writer.
	pub fn into_inner(self) -> W {
		self.out
	}

	/// Write raw bytes.
	pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
		self.out.write_all(bytes)?;
		self.written += bytes.len();
		Ok(())
	}

	/// Write one byte.
	pub fn write_u8(&mut self, value: u8) -> Result<()> {
		self.write_all(&[value])
	}

	/// Write a little-endian `u16`.
	pub fn write_u16_le(&mut self, value: u16) -> Result<()> {
		self.write_all(&value.to_le_bytes())
	}

	/// Write a little-endian `i16`.
	pub fn write_i16_le(&mut self, value: i16) -> Result<()> {
		self.write_all(&value.to_le_bytes())
	}

	/// Write a little-endian `u32`.
	pub fn write_u32_le(&mut self, value: u32) -> Result<()> {
		self.write_all(&value.to_le_bytes())
	}

	/// Write a little-endian `i32`.
	pub fn write_i32_le(&mut self, value: i32) -> Result<()> {
		self.write_all(&value.to_le_bytes())
	}

	/// Write a little-endian `u64`.
	pub fn write_u64_le(&mut self, value: u64) -> Result<()> {
		self.write_all(&value.to_le_bytes())
	}

	/// Write a little-endian `i64`.
	pub fn write_i64_le(&mut self, value: i64) -> Result<()> {
		self.write_all(&value.to_le_bytes())
	}

	/// Write a little-endian `f32`.
	pub fn write_f32_le(&mut self, value: f32) -> Result<()> {
		self.write_all(&value.to_le_bytes())
	}

	/// Write a little-endian `f64`.
	pub fn write_f64_le(&mut self, value: f64) -> Result<()> {
		self.write_all(&value.to_le_bytes())
	}

	/// Write a UTC timestamp as an 8-byte tick count.
	pub fn write_datetime(&mut self, value: &DateTime<Utc>) -> Result<()> {
		let ticks = ticks_from_datetime(value)?;
		self.write_i64_le(ticks)
	}
}

/// Convert a UTC timestamp to 100 ns ticks since `0001-01-01T00:00:00Z`.
///
/// Sub-tick precision is truncated.
pub fn ticks_from_datetime(value: &DateTime<Utc>) -> Result<i64> {
	let ticks = i128::from(value.timestamp()) * TICKS_PER_SECOND + i128::from(value.timestamp_subsec_nanos() / 100) + UNIX_EPOCH_TICKS;
	match i64::try_from(ticks) {
		Ok(ticks) if (0..=MAX_TICKS).contains(&ticks) => Ok(ticks),
		_ => Err(ClassifyError::InvalidTimestamp {
			ticks: ticks.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64,
		}),
	}
}

/// Convert 100 ns ticks since `0001-01-01T00:00:00Z` to a UTC timestamp.
pub fn datetime_from_ticks(ticks: i64) -> Result<DateTime<Utc>> {
	if !(0..=MAX_TICKS).contains(&ticks) {
		return Err(ClassifyError::InvalidTimestamp { ticks });
	}

	let since_unix = i128::from(ticks) - UNIX_EPOCH_TICKS;
	let secs = since_unix.div_euclid(TICKS_PER_SECOND) as i64;
	let nanos = (since_unix.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
	DateTime::from_timestamp(secs, nanos).ok_or(ClassifyError::InvalidTimestamp { ticks })
}

#[cfg(test)]
mod tests {
	use chrono::{TimeZone, Utc};

	use super::{Cursor, MAX_TICKS, Sink, datetime_from_ticks, ticks_from_datetime};
	use crate::classify::ClassifyError;

	#[test]
	fn unix_epoch_maps_to_known_tick_count() {
		let epoch = Utc.timestamp_opt(0, 0).single().expect("epoch exists");
		assert_eq!(ticks_from_datetime(&epoch).expect("ticks"), 621_355_968_000_000_000);
	}

	#[test]
	fn tick_range_endpoints_convert_both_ways() {
		let min = datetime_from_ticks(0).expect("min converts");
		assert_eq!(min.to_rfc3339(), "0001-01-01T00:00:00+00:00");
		assert_eq!(ticks_from_datetime(&min).expect("ticks"), 0);

		let max = datetime_from_ticks(MAX_TICKS).expect("max converts");
		assert_eq!(ticks_from_datetime(&max).expect("ticks"), MAX_TICKS);
	}

	#[test]
	fn negative_ticks_are_rejected() {
		let err = datetime_from_ticks(-1).expect_err("negative ticks fail");
		assert!(matches!(err, ClassifyError::InvalidTimestamp { ticks: -1 }));
	}

	#[test]
	fn fixed_width_values_are_little_endian() {
		let mut sink = Sink::new(Vec::new());
		sink.write_u16_le(0x0102).expect("write");
		sink.write_i32_le(-2).expect("write");
		sink.write_f64_le(1.5).expect("write");
		assert_eq!(sink.written(), 14);

		let bytes = sink.into_inner();
		assert_eq!(&bytes[..2], &[0x02, 0x01]);

		let mut cursor = Cursor::new(&bytes);
		assert_eq!(cursor.read_u16_le().expect("read"), 0x0102);
		assert_eq!(cursor.read_i32_le().expect("read"), -2);
		assert_eq!(cursor.read_f64_le().expect("read"), 1.5);
		assert_eq!(cursor.remaining(), 0);
	}

	#[test]
	fn short_read_reports_offset() {
		let mut cursor = Cursor::new(&[1, 2, 3]);
		cursor.read_u8().expect("first byte");
		let err = cursor.read_u32_le().expect_err("short read fails");
		assert!(matches!(err, ClassifyError::UnexpectedEof { at: 1, need: 4, rem: 2 }));
	}
}
