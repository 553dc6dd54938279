use std::path::Path;

use classify::classify::{Compression, DictKey, Node, Result, Scalar, decode_node, format_datetime, read_document};

/// One document read from disk and decoded to its node tree.
pub(crate) struct LoadedDocument {
	pub compression: Compression,
	pub file_size: u64,
	pub decoded_size: usize,
	pub root: Node,
}

/// Read, decompress, and decode the document at `path`.
pub(crate) fn load_document(path: &Path) -> Result<LoadedDocument> {
	let file_size = std::fs::metadata(path)?.len();
	let (compression, bytes) = read_document(path)?;
	let root = decode_node(&bytes)?;
	Ok(LoadedDocument {
		compression,
		file_size,
		decoded_size: bytes.len(),
		root,
	})
}

/// Print a serializable payload as pretty JSON on stdout.
pub(crate) fn emit_json<T: serde::Serialize>(payload: &T) {
	match serde_json::to_string_pretty(payload) {
		Ok(text) => println!("{text}"),
		Err(err) => eprintln!("error: failed to render json: {err}"),
	}
}

/// Truncate to `max` Unicode scalar values, marking the cut.
pub(crate) fn truncate(value: &str, max: usize) -> String {
	if value.chars().count() <= max {
		return value.to_owned();
	}
	let mut out: String = value.chars().take(max).collect();
	out.push_str("...");
	out
}

/// Render a scalar for tree output.
pub(crate) fn render_scalar(value: &Scalar, max_string_len: usize) -> String {
	match value {
		Scalar::Null => "null".to_owned(),
		Scalar::Bool(v) => v.to_string(),
		Scalar::U8(v) => format!("{v}u8"),
		Scalar::I8(v) => format!("{v}i8"),
		Scalar::I16(v) => format!("{v}i16"),
		Scalar::U16(v) => format!("{v}u16"),
		Scalar::I32(v) => format!("{v}i32"),
		Scalar::U32(v) => format!("{v}u32"),
		Scalar::I64(v) => format!("{v}i64"),
		Scalar::U64(v) => format!("{v}u64"),
		Scalar::F32(v) => format!("{v}f32"),
		Scalar::F64(v) => format!("{v}f64"),
		Scalar::DateTime(v) => format_datetime(v),
		Scalar::Decimal(v) => format!("{v}m"),
		Scalar::BigInt(v) => format!("{v}n"),
		Scalar::String(v) => format!("\"{}\"", truncate(v, max_string_len)),
		Scalar::Bytes(v) => format!("bytes[{}]", v.len()),
	}
}

/// Render a dictionary key as a label.
pub(crate) fn render_key(key: &DictKey) -> String {
	match key {
		DictKey::Str(text) => format!("\"{text}\""),
		DictKey::Int(v) => v.to_string(),
		DictKey::U64(v) => v.to_string(),
		DictKey::F32(v) => v.to_string(),
		DictKey::F64(v) => v.to_string(),
		DictKey::DateTime(v) => format_datetime(v),
		DictKey::Decimal(v) => v.to_string(),
		DictKey::Field {
			name,
			declaring_type: Some(owner),
		} => format!("{owner}.{name}"),
		DictKey::Field { name, declaring_type: None } => name.clone(),
	}
}
