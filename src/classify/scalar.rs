//! Exact conversions between live values and wire scalars.
//!
//! Writing picks the narrowest scalar that converts back to the original exactly. Reading converts
//! whatever scalar arrived into the declared type, or reports drift with `None`.

use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, Utc};
use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};

use crate::classify::bytes::{datetime_from_ticks, ticks_from_datetime};
use crate::classify::node::{DictKey, Scalar};
use crate::classify::schema::Ty;
use crate::classify::value::Value;

const TRUE_TEXT: &str = "True";
const FALSE_TEXT: &str = "False";

/// Wire scalar for a scalar value, compacted; `None` for containers, objects and placeholders.
pub fn to_scalar(value: &Value) -> Option<Scalar> {
	Some(match value {
		Value::Null => Scalar::Null,
		Value::Bool(v) => Scalar::Bool(*v),
		Value::U8(v) => compact_integer(BigInt::from(*v), true),
		Value::I8(v) => compact_integer(BigInt::from(*v), true),
		Value::I16(v) => compact_integer(BigInt::from(*v), true),
		Value::U16(v) => compact_integer(BigInt::from(*v), true),
		Value::I32(v) => compact_integer(BigInt::from(*v), true),
		Value::U32(v) => compact_integer(BigInt::from(*v), true),
		Value::I64(v) | Value::Enum(v) => compact_integer(BigInt::from(*v), true),
		Value::U64(v) => compact_integer(BigInt::from(*v), true),
		Value::BigInt(v) => compact_integer(v.clone(), true),
		Value::String(text) => compact_text(text),
		Value::Char(ch) => compact_text(&ch.to_string()),
		Value::F32(v) => Scalar::F32(*v),
		Value::F64(v) => Scalar::F64(*v),
		Value::DateTime(v) => Scalar::DateTime(*v),
		Value::Decimal(v) => Scalar::Decimal(v.clone()),
		Value::Bytes(v) => Scalar::Bytes(v.clone()),
		Value::Tuple(_) | Value::List(_) | Value::Dict(_) | Value::Object(_) | Value::Deferred(_) => return None,
	})
}

fn compact_integer(value: BigInt, allow_bool: bool) -> Scalar {
	if allow_bool {
		if value.is_zero() {
			return Scalar::Bool(false);
		}
		if value.is_one() {
			return Scalar::Bool(true);
		}
	}

	if let Some(v) = value.to_u8() {
		Scalar::U8(v)
	} else if let Some(v) = value.to_i8() {
		Scalar::I8(v)
	} else if let Some(v) = value.to_i16() {
		Scalar::I16(v)
	} else if let Some(v) = value.to_u16() {
		Scalar::U16(v)
	} else if let Some(v) = value.to_i32() {
		Scalar::I32(v)
	} else if let Some(v) = value.to_u32() {
		Scalar::U32(v)
	} else if let Some(v) = value.to_i64() {
		Scalar::I64(v)
	} else if let Some(v) = value.to_u64() {
		Scalar::U64(v)
	} else {
		Scalar::BigInt(value)
	}
}

fn compact_text(text: &str) -> Scalar {
	match text {
		TRUE_TEXT => return Scalar::Bool(true),
		FALSE_TEXT => return Scalar::Bool(false),
		_ => {}
	}
	// "True" is the only text a Bool converts back to, so "1" skips the Bool rung.
	if let Some(value) = parse_integer(text) {
		return compact_integer(value, false);
	}
	if let Some(value) = parse_datetime(text) {
		return Scalar::DateTime(value);
	}
	Scalar::String(text.to_owned())
}

/// Integer text that formats back to itself.
fn parse_integer(text: &str) -> Option<BigInt> {
	let value: BigInt = text.parse().ok()?;
	(value.to_string() == text).then_some(value)
}

/// Timestamp text that formats back to itself and survives the 100 ns tick encoding.
///
/// Sub-tick nanoseconds and leap seconds fail the tick check and stay text.
fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
	let value = DateTime::parse_from_rfc3339(text).ok()?.with_timezone(&Utc);
	let ticks = ticks_from_datetime(&value).ok()?;
	if datetime_from_ticks(ticks).ok()? != value {
		return None;
	}
	(format_datetime(&value) == text).then_some(value)
}

/// Canonical text form of a timestamp.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
	value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn integer_of(scalar: &Scalar) -> Option<BigInt> {
	Some(match scalar {
		Scalar::Bool(v) => BigInt::from(u8::from(*v)),
		Scalar::U8(v) => BigInt::from(*v),
		Scalar::I8(v) => BigInt::from(*v),
		Scalar::I16(v) => BigInt::from(*v),
		Scalar::U16(v) => BigInt::from(*v),
		Scalar::I32(v) => BigInt::from(*v),
		Scalar::U32(v) => BigInt::from(*v),
		Scalar::I64(v) => BigInt::from(*v),
		Scalar::U64(v) => BigInt::from(*v),
		Scalar::BigInt(v) => v.clone(),
		Scalar::String(text) => return parse_integer(text),
		_ => return None,
	})
}

fn text_of(scalar: &Scalar) -> Option<String> {
	match scalar {
		Scalar::Bool(true) => Some(TRUE_TEXT.to_owned()),
		Scalar::Bool(false) => Some(FALSE_TEXT.to_owned()),
		Scalar::DateTime(v) => Some(format_datetime(v)),
		Scalar::String(text) => Some(text.clone()),
		other => integer_of(other).map(|v| v.to_string()),
	}
}

fn bool_of(scalar: &Scalar) -> Option<bool> {
	match scalar {
		Scalar::Bool(v) => Some(*v),
		Scalar::String(text) if text == TRUE_TEXT => Some(true),
		Scalar::String(text) if text == FALSE_TEXT => Some(false),
		Scalar::String(_) => None,
		other => {
			let value = integer_of(other)?;
			if value.is_zero() {
				Some(false)
			} else if value.is_one() {
				Some(true)
			} else {
				None
			}
		}
	}
}

/// Value of the declared type for a wire scalar; `None` when no exact conversion exists.
pub fn from_scalar(scalar: &Scalar, ty: &Ty) -> Option<Value> {
	if matches!(scalar, Scalar::Null) {
		return Some(Value::Null);
	}

	match ty {
		Ty::Dynamic => Some(natural(scalar)),
		Ty::Bool => bool_of(scalar).map(Value::Bool),
		Ty::U8 => integer_of(scalar)?.to_u8().map(Value::U8),
		Ty::I8 => integer_of(scalar)?.to_i8().map(Value::I8),
		Ty::I16 => integer_of(scalar)?.to_i16().map(Value::I16),
		Ty::U16 => integer_of(scalar)?.to_u16().map(Value::U16),
		Ty::I32 => integer_of(scalar)?.to_i32().map(Value::I32),
		Ty::U32 => integer_of(scalar)?.to_u32().map(Value::U32),
		Ty::I64 => integer_of(scalar)?.to_i64().map(Value::I64),
		Ty::U64 => integer_of(scalar)?.to_u64().map(Value::U64),
		Ty::Enum(_) => integer_of(scalar)?.to_i64().map(Value::Enum),
		Ty::BigInt => integer_of(scalar).map(Value::BigInt),
		Ty::F32 => match scalar {
			Scalar::F32(v) => Some(Value::F32(*v)),
			Scalar::F64(v) if v.is_nan() || f64::from(*v as f32) == *v => Some(Value::F32(*v as f32)),
			_ => None,
		},
		Ty::F64 => match scalar {
			Scalar::F64(v) => Some(Value::F64(*v)),
			Scalar::F32(v) => Some(Value::F64(f64::from(*v))),
			_ => None,
		},
		Ty::Decimal => match scalar {
			Scalar::Decimal(v) => Some(Value::Decimal(v.clone())),
			other => integer_of(other).map(|v| Value::Decimal(BigDecimal::new(v, 0))),
		},
		Ty::DateTime => match scalar {
			Scalar::DateTime(v) => Some(Value::DateTime(*v)),
			Scalar::String(text) => parse_datetime(text).map(Value::DateTime),
			_ => None,
		},
		Ty::String => text_of(scalar).map(Value::String),
		Ty::Char => {
			let text = text_of(scalar)?;
			let mut chars = text.chars();
			let ch = chars.next()?;
			chars.next().is_none().then_some(Value::Char(ch))
		}
		Ty::Bytes => match scalar {
			Scalar::Bytes(v) => Some(Value::Bytes(v.clone())),
			_ => None,
		},
		Ty::Tuple(_) | Ty::List(_) | Ty::Dict(..) | Ty::Object(_) | Ty::Deferred(_) => None,
	}
}

/// Undeclared reading: each scalar maps to its own value kind.
fn natural(scalar: &Scalar) -> Value {
	match scalar {
		Scalar::Null => Value::Null,
		Scalar::Bool(v) => Value::Bool(*v),
		Scalar::U8(v) => Value::U8(*v),
		Scalar::I8(v) => Value::I8(*v),
		Scalar::I16(v) => Value::I16(*v),
		Scalar::U16(v) => Value::U16(*v),
		Scalar::I32(v) => Value::I32(*v),
		Scalar::U32(v) => Value::U32(*v),
		Scalar::I64(v) => Value::I64(*v),
		Scalar::U64(v) => Value::U64(*v),
		Scalar::F32(v) => Value::F32(*v),
		Scalar::F64(v) => Value::F64(*v),
		Scalar::DateTime(v) => Value::DateTime(*v),
		Scalar::Decimal(v) => Value::Decimal(v.clone()),
		Scalar::BigInt(v) => Value::BigInt(v.clone()),
		Scalar::String(v) => Value::String(v.clone()),
		Scalar::Bytes(v) => Value::Bytes(v.clone()),
	}
}

/// Whether a declared type can key a dictionary.
pub fn is_key_type(ty: &Ty) -> bool {
	matches!(
		ty,
		Ty::Dynamic | Ty::String | Ty::Char | Ty::U8 | Ty::I8 | Ty::I16 | Ty::U16 | Ty::I32 | Ty::U32 | Ty::I64 | Ty::U64 | Ty::Enum(_) | Ty::F32 | Ty::F64 | Ty::Decimal | Ty::DateTime
	)
}

/// Dictionary key for a live key value.
pub fn key_of(value: &Value) -> Option<DictKey> {
	Some(match value {
		Value::String(text) => DictKey::Str(text.clone()),
		Value::Char(ch) => DictKey::Str(ch.to_string()),
		Value::U8(v) => DictKey::Int(i64::from(*v)),
		Value::I8(v) => DictKey::Int(i64::from(*v)),
		Value::I16(v) => DictKey::Int(i64::from(*v)),
		Value::U16(v) => DictKey::Int(i64::from(*v)),
		Value::I32(v) => DictKey::Int(i64::from(*v)),
		Value::U32(v) => DictKey::Int(i64::from(*v)),
		Value::I64(v) | Value::Enum(v) => DictKey::Int(*v),
		Value::U64(v) => DictKey::U64(*v),
		Value::F32(v) => DictKey::F32(*v),
		Value::F64(v) => DictKey::F64(*v),
		Value::DateTime(v) => DictKey::DateTime(*v),
		Value::Decimal(v) => DictKey::Decimal(v.clone()),
		_ => return None,
	})
}

/// Live key value of the declared key type for a wire key.
pub fn value_of_key(key: &DictKey, ty: &Ty) -> Option<Value> {
	let scalar = match key {
		DictKey::Str(text) | DictKey::Field { name: text, .. } => Scalar::String(text.clone()),
		DictKey::Int(v) => Scalar::I64(*v),
		DictKey::U64(v) => Scalar::U64(*v),
		DictKey::F32(v) => Scalar::F32(*v),
		DictKey::F64(v) => Scalar::F64(*v),
		DictKey::DateTime(v) => Scalar::DateTime(*v),
		DictKey::Decimal(v) => Scalar::Decimal(v.clone()),
	};
	from_scalar(&scalar, ty)
}

#[cfg(test)]
mod tests {
	use chrono::{TimeZone, Utc};
	use num_bigint::BigInt;

	use super::{from_scalar, to_scalar, value_of_key};
	use crate::classify::node::{DictKey, Scalar};
	use crate::classify::schema::Ty;
	use crate::classify::value::Value;

	#[test]
	fn one_true_and_true_text_share_a_scalar() {
		assert_eq!(to_scalar(&Value::I32(1)), Some(Scalar::Bool(true)));
		assert_eq!(to_scalar(&Value::Bool(true)), Some(Scalar::Bool(true)));
		assert_eq!(to_scalar(&Value::String("True".into())), Some(Scalar::Bool(true)));
	}

	#[test]
	fn integers_take_the_first_rung_that_fits() {
		assert_eq!(to_scalar(&Value::I64(0)), Some(Scalar::Bool(false)));
		assert_eq!(to_scalar(&Value::I64(200)), Some(Scalar::U8(200)));
		assert_eq!(to_scalar(&Value::I64(-5)), Some(Scalar::I8(-5)));
		assert_eq!(to_scalar(&Value::I64(300)), Some(Scalar::I16(300)));
		assert_eq!(to_scalar(&Value::I64(40_000)), Some(Scalar::U16(40_000)));
		assert_eq!(to_scalar(&Value::I64(-40_000)), Some(Scalar::I32(-40_000)));
		assert_eq!(to_scalar(&Value::I64(3_000_000_000)), Some(Scalar::U32(3_000_000_000)));
		assert_eq!(to_scalar(&Value::U64(u64::MAX)), Some(Scalar::U64(u64::MAX)));

		let huge = BigInt::from(u64::MAX) * 4_u32;
		assert_eq!(to_scalar(&Value::BigInt(huge.clone())), Some(Scalar::BigInt(huge)));
	}

	#[test]
	fn text_compacts_only_when_canonical() {
		assert_eq!(to_scalar(&Value::String("1".into())), Some(Scalar::U8(1)));
		assert_eq!(to_scalar(&Value::String("01".into())), Some(Scalar::String("01".into())));
		assert_eq!(to_scalar(&Value::String("true".into())), Some(Scalar::String("true".into())));

		let when = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).single().expect("valid");
		assert_eq!(to_scalar(&Value::String("2024-05-06T07:08:09Z".into())), Some(Scalar::DateTime(when)));
	}

	#[test]
	fn timestamps_finer_than_a_tick_stay_text() {
		for text in ["2024-05-06T07:08:09.123456789Z", "2016-12-31T23:59:60Z"] {
			let value = Value::String(text.into());
			let scalar = to_scalar(&value).expect("scalar value");
			assert_eq!(scalar, Scalar::String(text.into()));
			assert_eq!(from_scalar(&scalar, &Ty::String), Some(value));
		}

		let tick_aligned = "2024-05-06T07:08:09.123456700Z";
		assert!(matches!(to_scalar(&Value::String(tick_aligned.into())), Some(Scalar::DateTime(_))));
	}

	#[test]
	fn compacted_scalars_convert_back_exactly() {
		let cases = vec![
			(Value::I32(1), Ty::I32),
			(Value::I32(-70_000), Ty::I32),
			(Value::U16(0), Ty::U16),
			(Value::Enum(3), Ty::Enum("Color".into())),
			(Value::Char('7'), Ty::Char),
			(Value::Char('x'), Ty::Char),
			(Value::String("True".into()), Ty::String),
			(Value::String("42".into()), Ty::String),
			(Value::String("2024-05-06T07:08:09Z".into()), Ty::String),
			(Value::BigInt(BigInt::from(i64::MIN) - 1_u32), Ty::BigInt),
			(Value::Bool(false), Ty::Bool),
		];
		for (value, ty) in cases {
			let scalar = to_scalar(&value).expect("scalar value");
			assert_eq!(from_scalar(&scalar, &ty), Some(value), "{ty:?}");
		}
	}

	#[test]
	fn impossible_conversions_are_drift() {
		assert_eq!(from_scalar(&Scalar::I16(300), &Ty::U8), None);
		assert_eq!(from_scalar(&Scalar::String("abc".into()), &Ty::I32), None);
		assert_eq!(from_scalar(&Scalar::F64(0.1), &Ty::F32), None);
		assert_eq!(from_scalar(&Scalar::U8(7), &Ty::list(Ty::I32)), None);
		assert_eq!(from_scalar(&Scalar::Null, &Ty::I32), Some(Value::Null));
	}

	#[test]
	fn keys_convert_to_the_declared_key_type() {
		assert_eq!(value_of_key(&DictKey::Int(9), &Ty::U8), Some(Value::U8(9)));
		assert_eq!(value_of_key(&DictKey::Str("a".into()), &Ty::Char), Some(Value::Char('a')));
		assert_eq!(value_of_key(&DictKey::Int(-1), &Ty::U32), None);
	}
}
