mod bytes;
mod classifier;
mod compression;
mod declassifier;
mod error;
mod escape;
mod format;
mod io;
mod node;
mod optim;
mod options;
mod scalar;
mod schema;
mod tag;
mod value;

/// Fixed-width little-endian primitives and tick-based timestamps.
pub use bytes::{Cursor, MAX_TICKS, Sink, datetime_from_ticks, ticks_from_datetime};
/// Live value to node tree.
pub use classifier::classify_value;
/// Compression detection and file write settings.
pub use compression::{Compression, FileOptions, ZSTD_MAGIC};
/// Node tree to live value.
pub use declassifier::declassify_value;
/// Error and result aliases.
pub use error::{ClassifyError, Result};
/// Self-delimiting byte and string buffers.
pub use escape::{read_raw, read_str, write_raw, write_str};
/// Binary node reader and writer.
pub use format::{decode_node, encode_node, read_node, write_node};
/// Entry points and file wrappers.
pub use io::{SIDE_DOCUMENT_EXT, deserialize, deserialize_into, from_reader, load_file, load_file_into, read_document, save_file, serialize, side_document_path, to_writer};
/// Intermediate node model.
pub use node::{DictKey, KeyForm, Node, NodeKind, OtherKey, Scalar, TypeSpec, key_form};
/// Chained-digit integers and compact decimals.
pub use optim::{read_decimal, read_optim_bigint, read_optim_i64, read_optim_u64, write_decimal, write_optim_bigint, write_optim_i64, write_optim_u64};
/// Substitution registry and node hooks.
pub use options::{ClassifyOptions, Convert, NodeHook, Substitution};
/// Scalar compaction and exact conversion.
pub use scalar::{format_datetime, from_scalar, to_scalar};
/// Type descriptions standing in for reflection.
pub use schema::{FieldDef, FieldMarkers, ResolvedField, ResolvedType, Schema, Ty, TypeDef};
/// Tag byte layout.
pub use tag::{DataType, TypeSpecKind, pack_tag, unpack_tag};
/// Live object graph.
pub use value::{Deferred, FieldSlot, ObjRef, Object, Value};
