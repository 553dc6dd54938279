//! Top-level entry points.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::classify::Result;
use crate::classify::bytes::Sink;
use crate::classify::classifier::classify_value;
use crate::classify::compression::{Compression, FileOptions, decode_bytes, encode_bytes};
use crate::classify::declassifier::declassify_value;
use crate::classify::format::{decode_node, encode_node, write_node};
use crate::classify::options::ClassifyOptions;
use crate::classify::schema::{Schema, Ty};
use crate::classify::value::{ObjRef, Value};

/// File extension of follow-by-id side documents.
pub const SIDE_DOCUMENT_EXT: &str = "cls";

/// Encode `value`, declared as `ty`.
pub fn serialize(value: &Value, ty: &Ty, schema: &Schema, options: &ClassifyOptions) -> Result<Vec<u8>> {
	let node = classify_value(value, ty, schema, options)?;
	encode_node(&node)
}

/// Decode a document as `ty`.
pub fn deserialize(bytes: &[u8], ty: &Ty, schema: &Schema, options: &ClassifyOptions) -> Result<Value> {
	let node = decode_node(bytes)?;
	declassify_value(&node, ty, None, schema, options)
}

/// Decode a document into an existing object.
///
/// Fields absent from the document keep their current values. When the document names a
/// different concrete type, `target` receives a copy of the freshly built object.
pub fn deserialize_into(bytes: &[u8], target: &ObjRef, schema: &Schema, options: &ClassifyOptions) -> Result<()> {
	let node = decode_node(bytes)?;
	let ty = Ty::Object(target.borrow().type_name.clone());
	let existing = Value::Object(Rc::clone(target));

	match declassify_value(&node, &ty, Some(&existing), schema, options)? {
		Value::Object(obj) if !Rc::ptr_eq(&obj, target) => {
			let replacement = obj.borrow().clone();
			*target.borrow_mut() = replacement;
		}
		Value::Object(_) => {}
		other => debug!(kind = other.kind_label(), "document did not hold an object, target unchanged"),
	}
	Ok(())
}

/// Encode `value` into a caller-owned writer.
pub fn to_writer<W: Write>(writer: W, value: &Value, ty: &Ty, schema: &Schema, options: &ClassifyOptions) -> Result<()> {
	let node = classify_value(value, ty, schema, options)?;
	let mut sink = Sink::new(writer);
	write_node(&mut sink, &node)
}

/// Decode one document from a caller-owned reader, consuming it to the end.
pub fn from_reader<R: Read>(mut reader: R, ty: &Ty, schema: &Schema, options: &ClassifyOptions) -> Result<Value> {
	let mut bytes = Vec::new();
	reader.read_to_end(&mut bytes)?;
	deserialize(&bytes, ty, schema, options)
}

/// Encode `value` and write it to `path`.
pub fn save_file(path: impl AsRef<Path>, value: &Value, ty: &Ty, schema: &Schema, options: &ClassifyOptions, file_options: &FileOptions) -> Result<()> {
	let bytes = encode_bytes(serialize(value, ty, schema, options)?, file_options)?;
	fs::write(path, bytes)?;
	Ok(())
}

/// Read a document from `path`, undoing any compression.
pub fn read_document(path: impl AsRef<Path>) -> Result<(Compression, Vec<u8>)> {
	decode_bytes(fs::read(path)?)
}

/// Read and decode the document at `path` as `ty`.
pub fn load_file(path: impl AsRef<Path>, ty: &Ty, schema: &Schema, options: &ClassifyOptions) -> Result<Value> {
	let (_, bytes) = read_document(path)?;
	deserialize(&bytes, ty, schema, options)
}

/// Read and decode the document at `path` into an existing object.
pub fn load_file_into(path: impl AsRef<Path>, target: &ObjRef, schema: &Schema, options: &ClassifyOptions) -> Result<()> {
	let (_, bytes) = read_document(path)?;
	deserialize_into(&bytes, target, schema, options)
}

/// Path of the side document for a follow-by-id placeholder.
pub fn side_document_path(base: &Path, id: &str) -> PathBuf {
	base.join(format!("{id}.{SIDE_DOCUMENT_EXT}"))
}

pub(crate) fn write_side_document(base: &Path, id: &str, value: &Value, ty: &Ty, schema: &Schema, options: &ClassifyOptions) -> Result<()> {
	fs::create_dir_all(base)?;
	let path = side_document_path(base, id);
	trace!(path = %path.display(), "saving side document");
	save_file(&path, value, ty, schema, options, &FileOptions::default())
}

pub(crate) fn read_side_document(base: &Path, id: &str, ty: &Ty, schema: &Schema, options: &ClassifyOptions) -> Result<Value> {
	let path = side_document_path(base, id);
	trace!(path = %path.display(), "loading side document");
	load_file(&path, ty, schema, options)
}
