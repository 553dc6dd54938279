use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;

use crate::classify::{ClassifyError, Result};

/// Shared handle to a live object; pointer identity is object identity.
pub type ObjRef = Rc<RefCell<Object>>;

/// Live object-graph value.
///
/// Floats compare by bit pattern and objects by pointer identity, so `==` answers
/// "would this round-trip to the same thing".
#[derive(Debug, Clone)]
pub enum Value {
	/// Absent value.
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
	/// Single-precision float.
	F32(f32),
	/// Double-precision float.
	F64(f64),
	/// One Unicode scalar value.
	Char(char),
	/// Enum discriminant.
	Enum(i64),
	/// UTC timestamp; stored with 100 ns precision.
	DateTime(DateTime<Utc>),
	/// Fixed-point decimal with a 96-bit mantissa.
	Decimal(BigDecimal),
	/// Arbitrary-precision integer.
	BigInt(BigInt),
	/// Text.
	String(String),
	/// Opaque byte buffer.
	Bytes(Vec<u8>),
	/// Positional slots; two slots also model a key/value pair.
	Tuple(Vec<Value>),
	/// Ordered sequence.
	List(Vec<Value>),
	/// Ordered key/value entries.
	Dict(Vec<(Value, Value)>),
	/// Shared object.
	Object(ObjRef),
	/// Lazily evaluated value; follow-by-id fields keep only its id in the main document.
	Deferred(Rc<Deferred>),
}

/// Instance of a schema type.
#[derive(Debug, Clone)]
pub struct Object {
	/// Fully qualified type name.
	pub type_name: String,
	/// Field slots, inherited fields first.
	pub fields: Vec<FieldSlot>,
}

/// One stored field value.
#[derive(Debug, Clone)]
pub struct FieldSlot {
	/// Short name of the type that declares the field.
	pub declaring_type: String,
	/// Field name.
	pub name: String,
	/// Current value.
	pub value: Value,
}

impl Value {
	/// Wrap an object in a fresh shared handle.
	pub fn object(object: Object) -> Self {
		Self::Object(Rc::new(RefCell::new(object)))
	}

	/// Shared handle when this is an object.
	pub fn as_object(&self) -> Option<&ObjRef> {
		match self {
			Self::Object(obj) => Some(obj),
			_ => None,
		}
	}

	/// Text payload when this is a string.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(text) => Some(text),
			_ => None,
		}
	}

	/// Whether this is `Null`.
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// Whether this is an empty string, byte buffer or collection.
	pub fn is_empty_collection(&self) -> bool {
		match self {
			Self::String(text) => text.is_empty(),
			Self::Bytes(bytes) => bytes.is_empty(),
			Self::List(items) => items.is_empty(),
			Self::Dict(entries) => entries.is_empty(),
			_ => false,
		}
	}

	/// Stable label for diagnostics.
	pub fn kind_label(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "bool",
			Self::U8(_) => "u8",
			Self::I8(_) => "i8",
			Self::I16(_) => "i16",
			Self::U16(_) => "u16",
			Self::I32(_) => "i32",
			Self::U32(_) => "u32",
			Self::I64(_) => "i64",
			Self::U64(_) => "u64",
			Self::F32(_) => "f32",
			Self::F64(_) => "f64",
			Self::Char(_) => "char",
			Self::Enum(_) => "enum",
			Self::DateTime(_) => "datetime",
			Self::Decimal(_) => "decimal",
			Self::BigInt(_) => "bigint",
			Self::String(_) => "string",
			Self::Bytes(_) => "bytes",
			Self::Tuple(_) => "tuple",
			Self::List(_) => "list",
			Self::Dict(_) => "dict",
			Self::Object(_) => "object",
			Self::Deferred(_) => "deferred",
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		use Value::*;
		match (self, other) {
			(Null, Null) => true,
			(Bool(a), Bool(b)) => a == b,
			(U8(a), U8(b)) => a == b,
			(I8(a), I8(b)) => a == b,
			(I16(a), I16(b)) => a == b,
			(U16(a), U16(b)) => a == b,
			(I32(a), I32(b)) => a == b,
			(U32(a), U32(b)) => a == b,
			(I64(a), I64(b)) => a == b,
			(U64(a), U64(b)) => a == b,
			(F32(a), F32(b)) => a.to_bits() == b.to_bits(),
			(F64(a), F64(b)) => a.to_bits() == b.to_bits(),
			(Char(a), Char(b)) => a == b,
			(Enum(a), Enum(b)) => a == b,
			(DateTime(a), DateTime(b)) => a == b,
			// Scale is part of the value: 1.50 and 1.5 differ.
			(Decimal(a), Decimal(b)) => a.as_bigint_and_exponent() == b.as_bigint_and_exponent(),
			(BigInt(a), BigInt(b)) => a == b,
			(String(a), String(b)) => a == b,
			(Bytes(a), Bytes(b)) => a == b,
			(Tuple(a), Tuple(b)) | (List(a), List(b)) => a == b,
			(Dict(a), Dict(b)) => a == b,
			(Object(a), Object(b)) => Rc::ptr_eq(a, b),
			(Deferred(a), Deferred(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl Object {
	/// Empty object of the named type; see `Schema::instantiate` for a default-filled one.
	pub fn new(type_name: impl Into<String>) -> Self {
		Self {
			type_name: type_name.into(),
			fields: Vec::new(),
		}
	}

	/// Most-derived field with this name.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.fields.iter().rev().find(|slot| slot.name == name).map(|slot| &slot.value)
	}

	/// Field with this name declared by `declaring_type`.
	pub fn get_declared(&self, declaring_type: &str, name: &str) -> Option<&Value> {
		self.slot(declaring_type, name).map(|slot| &slot.value)
	}

	/// Mutable access to a field declared by `declaring_type`.
	pub fn get_declared_mut(&mut self, declaring_type: &str, name: &str) -> Option<&mut Value> {
		self.fields
			.iter_mut()
			.find(|slot| slot.declaring_type == declaring_type && slot.name == name)
			.map(|slot| &mut slot.value)
	}

	/// Overwrite the most-derived field with this name; returns whether it existed.
	pub fn set(&mut self, name: &str, value: Value) -> bool {
		match self.fields.iter_mut().rev().find(|slot| slot.name == name) {
			Some(slot) => {
				slot.value = value;
				true
			}
			None => false,
		}
	}

	/// Write a field declared by `declaring_type`, appending a slot when absent.
	pub fn set_declared(&mut self, declaring_type: &str, name: &str, value: Value) {
		match self.get_declared_mut(declaring_type, name) {
			Some(slot) => *slot = value,
			None => self.fields.push(FieldSlot {
				declaring_type: declaring_type.to_owned(),
				name: name.to_owned(),
				value,
			}),
		}
	}

	/// Builder form of [`Object::set`].
	pub fn with(mut self, name: &str, value: Value) -> Self {
		self.set(name, value);
		self
	}

	fn slot(&self, declaring_type: &str, name: &str) -> Option<&FieldSlot> {
		self.fields.iter().find(|slot| slot.declaring_type == declaring_type && slot.name == name)
	}
}

type Generator = Box<dyn FnOnce() -> Result<Value>>;

/// Lazily produced value addressed by an id.
///
/// Evaluates at most once; the result is cached.
pub struct Deferred {
	id: String,
	value: OnceCell<Value>,
	generator: RefCell<Option<Generator>>,
}

impl Deferred {
	/// Already-evaluated placeholder.
	pub fn ready(id: impl Into<String>, value: Value) -> Self {
		Self {
			id: id.into(),
			value: OnceCell::from(value),
			generator: RefCell::new(None),
		}
	}

	/// Placeholder that runs `generator` on first access.
	pub fn pending(id: impl Into<String>, generator: impl FnOnce() -> Result<Value> + 'static) -> Self {
		Self {
			id: id.into(),
			value: OnceCell::new(),
			generator: RefCell::new(Some(Box::new(generator))),
		}
	}

	/// Placeholder id.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Whether the value has been produced.
	pub fn is_evaluated(&self) -> bool {
		self.value.get().is_some()
	}

	/// Value if already produced, without evaluating.
	pub fn peek(&self) -> Option<&Value> {
		self.value.get()
	}

	/// Produce the value, evaluating the generator on first call.
	///
	/// A generator that fails is consumed; later calls report [`ClassifyError::DeferredUnavailable`].
	pub fn get(&self) -> Result<&Value> {
		if let Some(value) = self.value.get() {
			return Ok(value);
		}

		let generator = self.generator.borrow_mut().take().ok_or_else(|| ClassifyError::DeferredUnavailable { id: self.id.clone() })?;
		let value = generator()?;
		Ok(self.value.get_or_init(|| value))
	}
}

impl fmt::Debug for Deferred {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Deferred").field("id", &self.id).field("value", &self.value.get()).finish()
	}
}
