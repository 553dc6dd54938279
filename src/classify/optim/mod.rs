//! Self-terminating integer and fixed-point encodings.
//!
//! Integers of any width share one chained-digit layout: the magnitude is written as little-endian
//! 8-byte digits in base `2^64 - 2`, least-significant first, and closed by an 8-byte sentinel.
//! `u64::MAX` closes a non-negative value; `u64::MAX - 1` closes a negative one, whose magnitude is
//! the bitwise complement of the value (`!v == -v - 1`).

use std::io::Write;

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::classify::bytes::{Cursor, Sink};
use crate::classify::{ClassifyError, Result};

/// Terminal digit for a non-negative value.
pub const SENTINEL_NON_NEGATIVE: u64 = u64::MAX;
/// Terminal digit for a negative value.
pub const SENTINEL_NEGATIVE: u64 = u64::MAX - 1;
/// Digit base; every digit is strictly below `SENTINEL_NEGATIVE`.
const BASE: u128 = (u64::MAX - 1) as u128;
/// Largest decimal scale (fractional digits) the fixed-point encoding accepts.
pub const MAX_DECIMAL_SCALE: i64 = 28;
/// Largest power of ten a nonzero mantissa can be widened by and still fit 96 bits.
const MAX_DECIMAL_WIDEN: u32 = 28;
/// Largest mantissa byte count in the fixed-point encoding.
const MAX_DECIMAL_BYTES: usize = 12;
const DECIMAL_SIGN: u8 = 0x80;
const DECIMAL_SCALE_MASK: u8 = 0x1F;

/// Write a signed integer in the chained-digit form.
pub fn write_optim_i64<W: Write>(sink: &mut Sink<W>, value: i64) -> Result<()> {
	if value < 0 {
		write_magnitude_u128(sink, u128::from(!value as u64), SENTINEL_NEGATIVE)
	} else {
		write_magnitude_u128(sink, value as u128, SENTINEL_NON_NEGATIVE)
	}
}

/// Write an unsigned integer in the chained-digit form.
pub fn write_optim_u64<W: Write>(sink: &mut Sink<W>, value: u64) -> Result<()> {
	write_magnitude_u128(sink, u128::from(value), SENTINEL_NON_NEGATIVE)
}

/// Write an arbitrary-precision integer in the chained-digit form.
pub fn write_optim_bigint<W: Write>(sink: &mut Sink<W>, value: &BigInt) -> Result<()> {
	if let Some(small) = value.to_i64() {
		return write_optim_i64(sink, small);
	}

	let (mut magnitude, sentinel) = match value.sign() {
		Sign::Minus => (value.magnitude().clone() - 1_u32, SENTINEL_NEGATIVE),
		_ => (value.magnitude().clone(), SENTINEL_NON_NEGATIVE),
	};

	let base = BigUint::from(BASE);
	while !magnitude.is_zero() {
		let digit = (&magnitude % &base).to_u64().unwrap_or(0);
		sink.write_u64_le(digit)?;
		magnitude /= &base;
	}
	sink.write_u64_le(sentinel)
}

fn write_magnitude_u128<W: Write>(sink: &mut Sink<W>, mut magnitude: u128, sentinel: u64) -> Result<()> {
	while magnitude > 0 {
		sink.write_u64_le((magnitude % BASE) as u64)?;
		magnitude /= BASE;
	}
	sink.write_u64_le(sentinel)
}

/// Read a chained-digit integer that must fit `i64`.
pub fn read_optim_i64(cursor: &mut Cursor<'_>) -> Result<i64> {
	let at = cursor.pos();
	let (magnitude, negative) = read_magnitude_u128(cursor, "i64", at)?;
	let magnitude = i64::try_from(magnitude).map_err(|_| ClassifyError::OptimOverflow { target: "i64", at })?;
	Ok(if negative { !magnitude } else { magnitude })
}

/// Read a chained-digit integer that must fit `u64`.
pub fn read_optim_u64(cursor: &mut Cursor<'_>) -> Result<u64> {
	let at = cursor.pos();
	let (magnitude, negative) = read_magnitude_u128(cursor, "u64", at)?;
	if negative {
		return Err(ClassifyError::OptimOverflow { target: "u64", at });
	}
	u64::try_from(magnitude).map_err(|_| ClassifyError::OptimOverflow { target: "u64", at })
}

fn read_magnitude_u128(cursor: &mut Cursor<'_>, target: &'static str, at: usize) -> Result<(u128, bool)> {
	let mut magnitude = 0_u128;
	let mut scale = 1_u128;
	let mut digits = 0_u32;
	loop {
		let digit = cursor.read_u64_le()?;
		match digit {
			SENTINEL_NON_NEGATIVE => return Ok((magnitude, false)),
			SENTINEL_NEGATIVE => return Ok((magnitude, true)),
			_ => {
				// two digits already cover every u64 magnitude
				if digits == 2 {
					return Err(ClassifyError::OptimOverflow { target, at });
				}
				magnitude = scale
					.checked_mul(u128::from(digit))
					.and_then(|part| magnitude.checked_add(part))
					.ok_or(ClassifyError::OptimOverflow { target, at })?;
				scale = scale.saturating_mul(BASE);
				digits += 1;
			}
		}
	}
}

/// Read a chained-digit integer of any size.
pub fn read_optim_bigint(cursor: &mut Cursor<'_>) -> Result<BigInt> {
	let base = BigUint::from(BASE);
	let mut digits = Vec::new();
	let negative = loop {
		match cursor.read_u64_le()? {
			SENTINEL_NON_NEGATIVE => break false,
			SENTINEL_NEGATIVE => break true,
			digit => digits.push(digit),
		}
	};

	let mut magnitude = BigUint::zero();
	for digit in digits.into_iter().rev() {
		magnitude = magnitude * &base + BigUint::from(digit);
	}

	if negative {
		Ok(-BigInt::from(magnitude + 1_u32))
	} else {
		Ok(BigInt::from(magnitude))
	}
}

/// Write a fixed-point decimal: header byte (scale, sign), mantissa length, mantissa bytes.
pub fn write_decimal<W: Write>(sink: &mut Sink<W>, value: &BigDecimal) -> Result<()> {
	let (mantissa, scale) = fixed_point_parts(value)?;
	let mut header = scale;
	if mantissa.sign() == Sign::Minus {
		header |= DECIMAL_SIGN;
	}

	let bytes = if mantissa.is_zero() { Vec::new() } else { mantissa.magnitude().to_bytes_le() };
	sink.write_u8(header)?;
	sink.write_u8(bytes.len() as u8)?;
	sink.write_all(&bytes)
}

/// Read a fixed-point decimal written by [`write_decimal`].
pub fn read_decimal(cursor: &mut Cursor<'_>) -> Result<BigDecimal> {
	let at = cursor.pos();
	let header = cursor.read_u8()?;
	let scale = header & DECIMAL_SCALE_MASK;
	if header & !(DECIMAL_SIGN | DECIMAL_SCALE_MASK) != 0 || i64::from(scale) > MAX_DECIMAL_SCALE {
		return Err(ClassifyError::InvalidDecimal { at });
	}

	let len = usize::from(cursor.read_u8()?);
	if len > MAX_DECIMAL_BYTES {
		return Err(ClassifyError::InvalidDecimal { at });
	}

	let magnitude = BigUint::from_bytes_le(cursor.read_exact(len)?);
	let sign = if header & DECIMAL_SIGN != 0 { Sign::Minus } else { Sign::Plus };
	Ok(BigDecimal::new(BigInt::from_biguint(sign, magnitude), i64::from(scale)))
}

/// Split a decimal into a 96-bit mantissa and a 0..=28 scale, widening negative exponents.
pub fn fixed_point_parts(value: &BigDecimal) -> Result<(BigInt, u8)> {
	let (mut mantissa, mut scale) = value.as_bigint_and_exponent();
	if scale < 0 && mantissa.is_zero() {
		return Ok((mantissa, 0));
	}
	if scale < 0 {
		// 10^29 already exceeds 96 bits
		let widen = u32::try_from(scale.unsigned_abs())
			.ok()
			.filter(|widen| *widen <= MAX_DECIMAL_WIDEN)
			.ok_or_else(|| out_of_range(&mantissa, scale))?;
		mantissa *= BigInt::from(10_u32).pow(widen);
		scale = 0;
	}

	if scale > MAX_DECIMAL_SCALE || mantissa.magnitude().bits() > 96 {
		return Err(out_of_range(&mantissa, scale));
	}
	Ok((mantissa, scale as u8))
}

/// Scientific text keeps the error message small for extreme exponents.
fn out_of_range(mantissa: &BigInt, scale: i64) -> ClassifyError {
	let value = if scale == 0 { mantissa.to_string() } else { format!("{mantissa}e{}", -i128::from(scale)) };
	ClassifyError::DecimalOutOfRange { value }
}
