use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;

use crate::classify::tag::DataType;
use crate::classify::{ClassifyError, Result};

/// Number of leading string keys inspected when choosing between UTF-8 and UTF-16 key storage.
const KEY_FORM_SAMPLE: usize = 32;

/// Wire-independent intermediate value between the byte stream and a live object graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
	/// Node payload.
	pub kind: NodeKind,
	/// Identity of this node when something else in the tree refers back to it.
	pub ref_id: Option<u64>,
	/// Concrete type annotation when it differs from the statically expected type.
	pub type_spec: Option<TypeSpec>,
}

/// Node payload variants.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
	/// One scalar.
	Value(Scalar),
	/// Back-reference to the node whose `ref_id` matches.
	Ref(u64),
	/// Exactly two children.
	KeyValuePair(Box<Node>, Box<Node>),
	/// Ordered children.
	List(Vec<Node>),
	/// Keyed children in insertion order.
	Dict(Vec<(DictKey, Node)>),
}

/// Scalar payload of a [`NodeKind::Value`] node.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
	/// Explicit null.
	Null,
	/// Boolean.
	Bool(bool),
	/// Unsigned 8-bit integer.
	U8(u8),
	/// Signed 8-bit integer.
	I8(i8),
	/// Signed 16-bit integer.
	I16(i16),
	/// Unsigned 16-bit integer.
	U16(u16),
	/// Signed 32-bit integer.
	I32(i32),
	/// Unsigned 32-bit integer.
	U32(u32),
	/// Signed 64-bit integer.
	I64(i64),
	/// Unsigned 64-bit integer.
	U64(u64),
	/// 32-bit float.
	F32(f32),
	/// 64-bit float.
	F64(f64),
	/// UTC timestamp.
	DateTime(DateTime<Utc>),
	/// Fixed-point decimal.
	Decimal(BigDecimal),
	/// Arbitrary-precision integer.
	BigInt(BigInt),
	/// UTF-8 text.
	String(String),
	/// Opaque bytes.
	Bytes(Vec<u8>),
}

/// Type annotation attached to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
	/// Short or fully qualified type name.
	pub name: String,
	/// Whether `name` is fully qualified.
	pub full: bool,
}

/// In-memory dictionary key.
#[derive(Debug, Clone, PartialEq)]
pub enum DictKey {
	/// Text key.
	Str(String),
	/// Any signed or narrow unsigned integer key.
	Int(i64),
	/// Full-range unsigned key.
	U64(u64),
	/// 32-bit float key.
	F32(f32),
	/// 64-bit float key.
	F64(f64),
	/// Timestamp key.
	DateTime(DateTime<Utc>),
	/// Decimal key.
	Decimal(BigDecimal),
	/// Object field key, disambiguated by declaring type when the name repeats in a hierarchy.
	Field {
		/// Field name.
		name: String,
		/// Declaring type short name, present only when needed.
		declaring_type: Option<String>,
	},
}

/// Key encoding chosen for one dictionary node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyForm {
	/// Optim integer keys.
	Int64,
	/// UTF-8 string keys.
	String,
	/// Field name plus declaring type.
	TwoStrings,
	/// Key type named by a leading byte.
	Other(OtherKey),
}

/// Key types carried by [`KeyForm::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherKey {
	/// Fixed 8-byte unsigned keys.
	UInt64,
	/// Fixed 4-byte float keys.
	Single,
	/// Fixed 8-byte float keys.
	Double,
	/// Tick-count keys.
	DateTime,
	/// Fixed-point decimal keys.
	Decimal,
	/// Strings stored as escaped UTF-16LE bytes.
	Utf16,
}

impl OtherKey {
	/// Data type byte written ahead of the entries.
	pub fn data_type(self) -> DataType {
		match self {
			Self::UInt64 => DataType::UInt64,
			Self::Single => DataType::Single,
			Self::Double => DataType::Double,
			Self::DateTime => DataType::DateTime,
			Self::Decimal => DataType::Decimal,
			Self::Utf16 => DataType::RawData,
		}
	}

	/// Inverse of [`OtherKey::data_type`].
	pub fn from_data_type(data_type: DataType) -> Option<Self> {
		Some(match data_type {
			DataType::UInt64 => Self::UInt64,
			DataType::Single => Self::Single,
			DataType::Double => Self::Double,
			DataType::DateTime => Self::DateTime,
			DataType::Decimal => Self::Decimal,
			DataType::RawData => Self::Utf16,
			_ => return None,
		})
	}
}

impl KeyForm {
	/// Plain dictionary tag for this key form.
	pub fn data_type(self) -> DataType {
		match self {
			Self::Int64 => DataType::DictInt64,
			Self::String => DataType::DictString,
			Self::TwoStrings => DataType::DictTwoStrings,
			Self::Other(_) => DataType::DictOther,
		}
	}
}

impl Node {
	/// Wrap a payload with no reference id or type annotation.
	pub fn new(kind: NodeKind) -> Self {
		Self {
			kind,
			ref_id: None,
			type_spec: None,
		}
	}

	/// Null node.
	pub fn null() -> Self {
		Self::new(NodeKind::Value(Scalar::Null))
	}

	/// Scalar node.
	pub fn scalar(value: Scalar) -> Self {
		Self::new(NodeKind::Value(value))
	}

	/// Back-reference node.
	pub fn reference(id: u64) -> Self {
		Self::new(NodeKind::Ref(id))
	}

	/// Two-child node.
	pub fn pair(key: Node, value: Node) -> Self {
		Self::new(NodeKind::KeyValuePair(Box::new(key), Box::new(value)))
	}

	/// List node.
	pub fn list(items: Vec<Node>) -> Self {
		Self::new(NodeKind::List(items))
	}

	/// Dictionary node.
	pub fn dict(entries: Vec<(DictKey, Node)>) -> Self {
		Self::new(NodeKind::Dict(entries))
	}

	/// Attach a type annotation.
	pub fn with_type_spec(mut self, spec: TypeSpec) -> Self {
		self.type_spec = Some(spec);
		self
	}

	/// Whether this is a null scalar.
	pub fn is_null(&self) -> bool {
		matches!(self.kind, NodeKind::Value(Scalar::Null))
	}

	/// Plain data type representing this node, before any reference-id twin is applied.
	pub fn data_type(&self) -> Result<DataType> {
		Ok(match &self.kind {
			NodeKind::Value(value) => value.data_type(),
			NodeKind::Ref(_) => DataType::Ref,
			NodeKind::KeyValuePair(..) => DataType::KeyValuePair,
			NodeKind::List(_) => DataType::List,
			NodeKind::Dict(entries) => key_form(entries)?.data_type(),
		})
	}

	/// Data type as written: the reference-id twin when `ref_id` is set.
	pub fn wire_data_type(&self) -> Result<DataType> {
		let plain = self.data_type()?;
		let Some(id) = self.ref_id else {
			return Ok(plain);
		};
		plain.with_ref_id().ok_or(ClassifyError::RefIdNotSupported { id, tag: plain.label() })
	}

	/// Stable label for diagnostics.
	pub fn kind_label(&self) -> &'static str {
		match &self.kind {
			NodeKind::Value(_) => "Value",
			NodeKind::Ref(_) => "Ref",
			NodeKind::KeyValuePair(..) => "KeyValuePair",
			NodeKind::List(_) => "List",
			NodeKind::Dict(_) => "Dict",
		}
	}
}

impl Scalar {
	/// Data type tag for this scalar.
	pub fn data_type(&self) -> DataType {
		match self {
			Self::Null => DataType::Null,
			Self::Bool(false) => DataType::False,
			Self::Bool(true) => DataType::True,
			Self::U8(_) => DataType::Byte,
			Self::I8(_) => DataType::SByte,
			Self::I16(_) => DataType::Int16,
			Self::U16(_) => DataType::UInt16,
			Self::I32(_) => DataType::Int32,
			Self::U32(_) => DataType::UInt32,
			Self::I64(_) => DataType::Int64,
			Self::U64(_) => DataType::UInt64,
			Self::F32(_) => DataType::Single,
			Self::F64(_) => DataType::Double,
			Self::DateTime(_) => DataType::DateTime,
			Self::Decimal(_) => DataType::Decimal,
			Self::BigInt(_) => DataType::BigInteger,
			Self::String(_) => DataType::String,
			Self::Bytes(_) => DataType::RawData,
		}
	}
}

impl DictKey {
	/// Field key without a declaring-type disambiguator.
	pub fn field(name: impl Into<String>) -> Self {
		Self::Field {
			name: name.into(),
			declaring_type: None,
		}
	}

	fn class(&self) -> KeyClass {
		match self {
			Self::Str(_) | Self::Field { .. } => KeyClass::Text,
			Self::Int(_) => KeyClass::Int,
			Self::U64(_) => KeyClass::U64,
			Self::F32(_) => KeyClass::F32,
			Self::F64(_) => KeyClass::F64,
			Self::DateTime(_) => KeyClass::DateTime,
			Self::Decimal(_) => KeyClass::Decimal,
		}
	}

	/// Stable label for the key's kind.
	pub fn kind_label(&self) -> &'static str {
		self.class().label()
	}

	/// Key text for string-shaped keys.
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Str(text) => Some(text),
			Self::Field { name, .. } => Some(name),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyClass {
	Text,
	Int,
	U64,
	F32,
	F64,
	DateTime,
	Decimal,
}

impl KeyClass {
	fn label(self) -> &'static str {
		match self {
			Self::Text => "text",
			Self::Int => "integer",
			Self::U64 => "u64",
			Self::F32 => "f32",
			Self::F64 => "f64",
			Self::DateTime => "datetime",
			Self::Decimal => "decimal",
		}
	}
}

/// Choose the most compact key encoding for a dictionary's entries.
pub fn key_form(entries: &[(DictKey, Node)]) -> Result<KeyForm> {
	let Some((first, _)) = entries.first() else {
		return Ok(KeyForm::String);
	};

	let class = first.class();
	if let Some((other, _)) = entries.iter().find(|(key, _)| key.class() != class) {
		return Err(ClassifyError::MixedDictKeys {
			first: class.label(),
			second: other.class().label(),
		});
	}

	Ok(match class {
		KeyClass::Int => KeyForm::Int64,
		KeyClass::U64 => KeyForm::Other(OtherKey::UInt64),
		KeyClass::F32 => KeyForm::Other(OtherKey::Single),
		KeyClass::F64 => KeyForm::Other(OtherKey::Double),
		KeyClass::DateTime => KeyForm::Other(OtherKey::DateTime),
		KeyClass::Decimal => KeyForm::Other(OtherKey::Decimal),
		KeyClass::Text => text_key_form(entries),
	})
}

fn text_key_form(entries: &[(DictKey, Node)]) -> KeyForm {
	let mut any_field = false;
	for (key, _) in entries {
		if let DictKey::Field { declaring_type, .. } = key {
			if declaring_type.is_some() {
				return KeyForm::TwoStrings;
			}
			any_field = true;
		}
	}
	if any_field {
		return KeyForm::String;
	}

	let (utf8, utf16) = entries
		.iter()
		.take(KEY_FORM_SAMPLE)
		.filter_map(|(key, _)| key.as_text())
		.fold((0_usize, 0_usize), |(utf8, utf16), text| (utf8 + text.len(), utf16 + text.encode_utf16().count() * 2));

	if utf16 < utf8 { KeyForm::Other(OtherKey::Utf16) } else { KeyForm::String }
}
