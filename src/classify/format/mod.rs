//! Binary node format.
//!
//! Each node is `[tag][payload][type name?][ref id?]`. The tag's low five bits carry the
//! [`DataType`], the high two bits the [`TypeSpecKind`]. Lists and dictionaries close with an
//! `End` tag; dictionary entries are written value first, then key.

use std::io::Write;

use crate::classify::bytes::{Cursor, Sink};
use crate::classify::escape::{read_raw, read_str, write_raw, write_str};
use crate::classify::node::{DictKey, KeyForm, Node, NodeKind, OtherKey, Scalar, TypeSpec, key_form};
use crate::classify::optim::{read_decimal, read_optim_bigint, read_optim_i64, read_optim_u64, write_decimal, write_optim_bigint, write_optim_i64, write_optim_u64};
use crate::classify::tag::{DataType, TypeSpecKind, pack_tag, unpack_tag};
use crate::classify::{ClassifyError, Result};

/// Serialize a node tree into a fresh buffer.
pub fn encode_node(node: &Node) -> Result<Vec<u8>> {
	let mut sink = Sink::new(Vec::new());
	write_node(&mut sink, node)?;
	Ok(sink.into_inner())
}

/// Parse exactly one node tree from `bytes`.
pub fn decode_node(bytes: &[u8]) -> Result<Node> {
	let mut cursor = Cursor::new(bytes);
	let node = read_node(&mut cursor)?;
	if cursor.remaining() > 0 {
		return Err(ClassifyError::TrailingBytes { count: cursor.remaining() });
	}
	Ok(node)
}

/// Write one node and its children.
pub fn write_node<W: Write>(sink: &mut Sink<W>, node: &Node) -> Result<()> {
	let data_type = node.wire_data_type()?;
	let spec_kind = match &node.type_spec {
		None => TypeSpecKind::None,
		Some(spec) if spec.full => TypeSpecKind::Full,
		Some(_) => TypeSpecKind::Short,
	};
	sink.write_u8(pack_tag(data_type, spec_kind))?;

	match &node.kind {
		NodeKind::Value(value) => write_scalar_payload(sink, value)?,
		NodeKind::Ref(id) => write_optim_u64(sink, *id)?,
		NodeKind::KeyValuePair(key, value) => {
			write_node(sink, key)?;
			write_node(sink, value)?;
		}
		NodeKind::List(items) => {
			for item in items {
				write_node(sink, item)?;
			}
			sink.write_u8(DataType::End as u8)?;
		}
		NodeKind::Dict(entries) => {
			let form = key_form(entries)?;
			if let KeyForm::Other(other) = form {
				sink.write_u8(other.data_type() as u8)?;
			}
			for (key, value) in entries {
				write_node(sink, value)?;
				write_key(sink, form, key)?;
			}
			sink.write_u8(DataType::End as u8)?;
		}
	}

	if let Some(spec) = &node.type_spec {
		write_str(sink, &spec.name)?;
	}
	if let Some(id) = node.ref_id {
		write_optim_u64(sink, id)?;
	}
	Ok(())
}

fn write_scalar_payload<W: Write>(sink: &mut Sink<W>, value: &Scalar) -> Result<()> {
	match value {
		Scalar::Null | Scalar::Bool(_) => Ok(()),
		Scalar::U8(v) => sink.write_u8(*v),
		Scalar::I8(v) => sink.write_u8(*v as u8),
		Scalar::I16(v) => sink.write_i16_le(*v),
		Scalar::U16(v) => sink.write_u16_le(*v),
		Scalar::I32(v) => sink.write_i32_le(*v),
		Scalar::U32(v) => sink.write_u32_le(*v),
		Scalar::I64(v) => sink.write_i64_le(*v),
		Scalar::U64(v) => sink.write_u64_le(*v),
		Scalar::F32(v) => sink.write_f32_le(*v),
		Scalar::F64(v) => sink.write_f64_le(*v),
		Scalar::DateTime(v) => sink.write_datetime(v),
		Scalar::Decimal(v) => write_decimal(sink, v),
		Scalar::BigInt(v) => write_optim_bigint(sink, v),
		Scalar::String(v) => write_str(sink, v),
		Scalar::Bytes(v) => write_raw(sink, v),
	}
}

fn write_key<W: Write>(sink: &mut Sink<W>, form: KeyForm, key: &DictKey) -> Result<()> {
	match (form, key) {
		(KeyForm::Int64, DictKey::Int(v)) => write_optim_i64(sink, *v),
		(KeyForm::String, DictKey::Str(text) | DictKey::Field { name: text, .. }) => write_str(sink, text),
		(KeyForm::TwoStrings, DictKey::Field { name, declaring_type }) => {
			write_str(sink, name)?;
			write_str(sink, declaring_type.as_deref().unwrap_or_default())
		}
		(KeyForm::TwoStrings, DictKey::Str(name)) => {
			write_str(sink, name)?;
			write_str(sink, "")
		}
		(KeyForm::Other(OtherKey::UInt64), DictKey::U64(v)) => sink.write_u64_le(*v),
		(KeyForm::Other(OtherKey::Single), DictKey::F32(v)) => sink.write_f32_le(*v),
		(KeyForm::Other(OtherKey::Double), DictKey::F64(v)) => sink.write_f64_le(*v),
		(KeyForm::Other(OtherKey::DateTime), DictKey::DateTime(v)) => sink.write_datetime(v),
		(KeyForm::Other(OtherKey::Decimal), DictKey::Decimal(v)) => write_decimal(sink, v),
		(KeyForm::Other(OtherKey::Utf16), DictKey::Str(text)) => {
			let bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
			write_raw(sink, &bytes)
		}
		(form, key) => Err(ClassifyError::MixedDictKeys {
			first: form.data_type().label(),
			second: key.kind_label(),
		}),
	}
}

/// Read one node and its children.
pub fn read_node(cursor: &mut Cursor<'_>) -> Result<Node> {
	read_child(cursor)?.ok_or(ClassifyError::UnexpectedEnd {
		at: cursor.pos().saturating_sub(1),
	})
}

/// Read one node, or `None` when the next tag is `End`.
fn read_child(cursor: &mut Cursor<'_>) -> Result<Option<Node>> {
	let at = cursor.pos();
	let (data_type, spec_kind) = unpack_tag(cursor.read_u8()?, at)?;

	let kind = match data_type {
		DataType::End => {
			if spec_kind != TypeSpecKind::None {
				return Err(ClassifyError::InvalidTag {
					tag: pack_tag(data_type, spec_kind),
					at,
				});
			}
			return Ok(None);
		}
		DataType::Null => NodeKind::Value(Scalar::Null),
		DataType::False => NodeKind::Value(Scalar::Bool(false)),
		DataType::True => NodeKind::Value(Scalar::Bool(true)),
		DataType::Byte => NodeKind::Value(Scalar::U8(cursor.read_u8()?)),
		DataType::SByte => NodeKind::Value(Scalar::I8(cursor.read_u8()? as i8)),
		DataType::Int16 => NodeKind::Value(Scalar::I16(cursor.read_i16_le()?)),
		DataType::UInt16 => NodeKind::Value(Scalar::U16(cursor.read_u16_le()?)),
		DataType::Int32 => NodeKind::Value(Scalar::I32(cursor.read_i32_le()?)),
		DataType::UInt32 => NodeKind::Value(Scalar::U32(cursor.read_u32_le()?)),
		DataType::Int64 => NodeKind::Value(Scalar::I64(cursor.read_i64_le()?)),
		DataType::UInt64 => NodeKind::Value(Scalar::U64(cursor.read_u64_le()?)),
		DataType::Single => NodeKind::Value(Scalar::F32(cursor.read_f32_le()?)),
		DataType::Double => NodeKind::Value(Scalar::F64(cursor.read_f64_le()?)),
		DataType::DateTime => NodeKind::Value(Scalar::DateTime(cursor.read_datetime()?)),
		DataType::Decimal => NodeKind::Value(Scalar::Decimal(read_decimal(cursor)?)),
		DataType::BigInteger => NodeKind::Value(Scalar::BigInt(read_optim_bigint(cursor)?)),
		DataType::String => NodeKind::Value(Scalar::String(read_str(cursor)?)),
		DataType::RawData | DataType::RawDataWithRefId => NodeKind::Value(Scalar::Bytes(read_raw(cursor)?)),
		DataType::Ref => NodeKind::Ref(read_optim_u64(cursor)?),
		DataType::KeyValuePair => {
			let key = read_node(cursor)?;
			let value = read_node(cursor)?;
			NodeKind::KeyValuePair(Box::new(key), Box::new(value))
		}
		DataType::List | DataType::ListWithRefId => {
			let mut items = Vec::new();
			while let Some(item) = read_child(cursor)? {
				items.push(item);
			}
			NodeKind::List(items)
		}
		DataType::DictInt64 | DataType::DictInt64WithRefId => read_dict(cursor, KeyForm::Int64)?,
		DataType::DictString | DataType::DictStringWithRefId => read_dict(cursor, KeyForm::String)?,
		DataType::DictTwoStrings | DataType::DictTwoStringsWithRefId => read_dict(cursor, KeyForm::TwoStrings)?,
		DataType::DictOther | DataType::DictOtherWithRefId => {
			let key_at = cursor.pos();
			let raw = cursor.read_u8()?;
			let other = DataType::from_bits(raw)
				.and_then(OtherKey::from_data_type)
				.ok_or(ClassifyError::InvalidDictKeyType { tag: raw, at: key_at })?;
			read_dict(cursor, KeyForm::Other(other))?
		}
	};

	let type_spec = match spec_kind {
		TypeSpecKind::None => None,
		TypeSpecKind::Short => Some(TypeSpec {
			name: read_str(cursor)?,
			full: false,
		}),
		TypeSpecKind::Full => Some(TypeSpec {
			name: read_str(cursor)?,
			full: true,
		}),
	};

	let ref_id = if data_type.has_ref_id() { Some(read_optim_u64(cursor)?) } else { None };

	Ok(Some(Node { kind, ref_id, type_spec }))
}

fn read_dict(cursor: &mut Cursor<'_>, form: KeyForm) -> Result<NodeKind> {
	let mut entries = Vec::new();
	while let Some(value) = read_child(cursor)? {
		let key = read_key(cursor, form)?;
		entries.push((key, value));
	}
	Ok(NodeKind::Dict(entries))
}

fn read_key(cursor: &mut Cursor<'_>, form: KeyForm) -> Result<DictKey> {
	Ok(match form {
		KeyForm::Int64 => DictKey::Int(read_optim_i64(cursor)?),
		KeyForm::String => DictKey::Str(read_str(cursor)?),
		KeyForm::TwoStrings => {
			let name = read_str(cursor)?;
			let declaring = read_str(cursor)?;
			DictKey::Field {
				name,
				declaring_type: (!declaring.is_empty()).then_some(declaring),
			}
		}
		KeyForm::Other(OtherKey::UInt64) => DictKey::U64(cursor.read_u64_le()?),
		KeyForm::Other(OtherKey::Single) => DictKey::F32(cursor.read_f32_le()?),
		KeyForm::Other(OtherKey::Double) => DictKey::F64(cursor.read_f64_le()?),
		KeyForm::Other(OtherKey::DateTime) => DictKey::DateTime(cursor.read_datetime()?),
		KeyForm::Other(OtherKey::Decimal) => DictKey::Decimal(read_decimal(cursor)?),
		KeyForm::Other(OtherKey::Utf16) => {
			let at = cursor.pos();
			let bytes = read_raw(cursor)?;
			if bytes.len() % 2 != 0 {
				return Err(ClassifyError::InvalidUtf16 { at });
			}
			let units: Vec<u16> = bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect();
			DictKey::Str(String::from_utf16(&units).map_err(|_| ClassifyError::InvalidUtf16 { at })?)
		}
	})
}

#[cfg(test)]
mod tests;
