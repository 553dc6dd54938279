//! Type descriptions that stand in for runtime reflection.
//!
//! A [`Schema`] is built once from [`TypeDef`]s. Inheritance is flattened at build time so every
//! lookup during a walk is a hash probe plus a slice scan.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::classify::bytes::datetime_from_ticks;
use crate::classify::node::{DictKey, TypeSpec};
use crate::classify::value::{FieldSlot, ObjRef, Object, Value};
use crate::classify::{ClassifyError, Result};

/// Declared (static) type of a field, collection element, or root.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
	/// Anything; concrete object types are always spelled out in full on the wire.
	Dynamic,
	/// Boolean.
	Bool,
	/// Unsigned 8-bit integer.
	U8,
	/// Signed 8-bit integer.
	I8,
	/// Signed 16-bit integer.
	I16,
	/// Unsigned 16-bit integer.
	U16,
	/// Signed 32-bit integer.
	I32,
	/// Unsigned 32-bit integer.
	U32,
	/// Signed 64-bit integer.
	I64,
	/// Unsigned 64-bit integer.
	U64,
	/// Single-precision float.
	F32,
	/// Double-precision float.
	F64,
	/// One Unicode scalar value.
	Char,
	/// UTC timestamp.
	DateTime,
	/// Fixed-point decimal.
	Decimal,
	/// Arbitrary-precision integer.
	BigInt,
	/// Text.
	String,
	/// Opaque byte buffer.
	Bytes,
	/// Enum type by name; values are [`Value::Enum`] discriminants.
	Enum(String),
	/// Positional slots; two slots cover key/value pairs.
	Tuple(Vec<Ty>),
	/// Sequence of one element type.
	List(Box<Ty>),
	/// Dictionary of key type to value type.
	Dict(Box<Ty>, Box<Ty>),
	/// Schema type by full name.
	Object(String),
	/// Lazily evaluated value of the inner type; with `follow_id` it lives in a side document.
	Deferred(Box<Ty>),
}

impl Ty {
	/// `List<elem>`.
	pub fn list(elem: Ty) -> Self {
		Self::List(Box::new(elem))
	}

	/// `Dict<key, value>`.
	pub fn dict(key: Ty, value: Ty) -> Self {
		Self::Dict(Box::new(key), Box::new(value))
	}

	/// Schema object type.
	pub fn object(full_name: impl Into<String>) -> Self {
		Self::Object(full_name.into())
	}

	/// Follow-by-id placeholder type.
	pub fn deferred(inner: Ty) -> Self {
		Self::Deferred(Box::new(inner))
	}

	/// Object type name, when this is an object type.
	pub fn object_name(&self) -> Option<&str> {
		match self {
			Self::Object(name) => Some(name),
			_ => None,
		}
	}

	/// Value a freshly constructed field of this type holds.
	pub fn default_value(&self) -> Value {
		match self {
			Self::Bool => Value::Bool(false),
			Self::U8 => Value::U8(0),
			Self::I8 => Value::I8(0),
			Self::I16 => Value::I16(0),
			Self::U16 => Value::U16(0),
			Self::I32 => Value::I32(0),
			Self::U32 => Value::U32(0),
			Self::I64 => Value::I64(0),
			Self::U64 => Value::U64(0),
			Self::F32 => Value::F32(0.0),
			Self::F64 => Value::F64(0.0),
			Self::Char => Value::Char('\0'),
			Self::Enum(_) => Value::Enum(0),
			Self::DateTime => datetime_from_ticks(0).map_or(Value::Null, Value::DateTime),
			Self::Decimal => Value::Decimal(BigDecimal::from(0)),
			Self::BigInt => Value::BigInt(BigInt::from(0)),
			Self::Dynamic | Self::String | Self::Bytes | Self::Tuple(_) | Self::List(_) | Self::Dict(..) | Self::Object(_) | Self::Deferred(_) => Value::Null,
		}
	}
}

/// Per-field persistence markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMarkers {
	/// Never persisted.
	pub ignore: bool,
	/// Back-reference to an owner; never persisted.
	pub parent: bool,
	/// Skip when equal to the field default.
	pub ignore_if_default: bool,
	/// Skip when null, or an empty string, buffer or collection.
	pub ignore_if_empty: bool,
	/// Skip when equal to this value.
	pub ignore_if: Option<Value>,
	/// Persist only the placeholder id; the value goes to its own document.
	pub follow_id: bool,
}

/// One declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
	/// Field name.
	pub name: String,
	/// Declared type.
	pub ty: Ty,
	/// Value assigned by the blank-instance constructor.
	pub default: Value,
	/// Persistence markers.
	pub markers: FieldMarkers,
}

impl FieldDef {
	/// Field with the type's natural default and no markers.
	pub fn new(name: impl Into<String>, ty: Ty) -> Self {
		let default = ty.default_value();
		Self {
			name: name.into(),
			ty,
			default,
			markers: FieldMarkers::default(),
		}
	}

	/// Override the constructor default.
	pub fn default(mut self, value: Value) -> Self {
		self.default = value;
		self
	}

	/// Mark as never persisted.
	pub fn ignore(mut self) -> Self {
		self.markers.ignore = true;
		self
	}

	/// Mark as an owner back-reference.
	pub fn parent(mut self) -> Self {
		self.markers.parent = true;
		self
	}

	/// Skip when equal to the default.
	pub fn ignore_if_default(mut self) -> Self {
		self.markers.ignore_if_default = true;
		self
	}

	/// Skip when empty.
	pub fn ignore_if_empty(mut self) -> Self {
		self.markers.ignore_if_empty = true;
		self
	}

	/// Skip when equal to `value`.
	pub fn ignore_if(mut self, value: Value) -> Self {
		self.markers.ignore_if = Some(value);
		self
	}

	/// Persist by placeholder id only.
	pub fn follow_id(mut self) -> Self {
		self.markers.follow_id = true;
		self
	}
}

/// One declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
	/// Short name.
	pub name: String,
	/// Dotted namespace; may be empty.
	pub namespace: String,
	/// Full name of the base type.
	pub base: Option<String>,
	/// Fields declared by this type, in persistence order.
	pub fields: Vec<FieldDef>,
	/// Apply ignore-if-default to every field this type declares.
	pub ignore_if_default: bool,
	/// Cannot be instantiated.
	pub is_abstract: bool,
}

impl TypeDef {
	/// Type with no base and no fields.
	pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			namespace: namespace.into(),
			base: None,
			fields: Vec::new(),
			ignore_if_default: false,
			is_abstract: false,
		}
	}

	/// Set the base type.
	pub fn base(mut self, full_name: impl Into<String>) -> Self {
		self.base = Some(full_name.into());
		self
	}

	/// Append a field.
	pub fn field(mut self, field: FieldDef) -> Self {
		self.fields.push(field);
		self
	}

	/// Apply ignore-if-default to every declared field.
	pub fn ignore_if_default(mut self) -> Self {
		self.ignore_if_default = true;
		self
	}

	/// Mark abstract.
	pub fn abstract_type(mut self) -> Self {
		self.is_abstract = true;
		self
	}

	/// `namespace.name`, or `name` in the root namespace.
	pub fn full_name(&self) -> String {
		join_name(&self.namespace, &self.name)
	}
}

/// Field after inheritance flattening.
#[derive(Debug, Clone)]
pub struct ResolvedField {
	/// Declaration.
	pub def: FieldDef,
	/// Short name of the declaring type.
	pub declaring_type: String,
	/// Name collides with another field in the hierarchy.
	pub disambiguate: bool,
	/// Field marker or declaring-type marker requests ignore-if-default.
	pub ignore_if_default: bool,
}

impl ResolvedField {
	/// Dictionary key this field is stored under.
	pub fn key(&self) -> DictKey {
		DictKey::Field {
			name: self.def.name.clone(),
			declaring_type: self.disambiguate.then(|| self.declaring_type.clone()),
		}
	}

	/// Field name.
	pub fn name(&self) -> &str {
		&self.def.name
	}
}

/// Type after inheritance flattening.
#[derive(Debug, Clone)]
pub struct ResolvedType {
	/// Short name.
	pub name: String,
	/// Namespace.
	pub namespace: String,
	/// Full name.
	pub full_name: String,
	/// Cannot be instantiated.
	pub is_abstract: bool,
	/// All persisted fields, inherited first.
	pub fields: Vec<ResolvedField>,
}

#[derive(Debug)]
struct SchemaInner {
	types: Vec<ResolvedType>,
	by_full: HashMap<String, usize>,
}

/// Registered types, shared cheaply by clone.
#[derive(Debug, Clone)]
pub struct Schema {
	inner: Rc<SchemaInner>,
}

impl Default for Schema {
	fn default() -> Self {
		Self {
			inner: Rc::new(SchemaInner {
				types: Vec::new(),
				by_full: HashMap::new(),
			}),
		}
	}
}

impl Schema {
	/// Validate and flatten a set of type definitions.
	pub fn new(defs: impl IntoIterator<Item = TypeDef>) -> Result<Self> {
		let defs: Vec<TypeDef> = defs.into_iter().collect();
		let mut index = HashMap::with_capacity(defs.len());
		for (idx, def) in defs.iter().enumerate() {
			if index.insert(def.full_name(), idx).is_some() {
				return Err(ClassifyError::DuplicateType { name: def.full_name() });
			}
		}

		let mut types = Vec::with_capacity(defs.len());
		for def in &defs {
			types.push(resolve_type(def, &defs, &index)?);
		}

		Ok(Self {
			inner: Rc::new(SchemaInner { types, by_full: index }),
		})
	}

	/// Type by full name.
	pub fn get(&self, full_name: &str) -> Option<&ResolvedType> {
		self.inner.by_full.get(full_name).map(|&idx| &self.inner.types[idx])
	}

	/// Type by full name, or [`ClassifyError::UnknownType`].
	pub fn require(&self, full_name: &str) -> Result<&ResolvedType> {
		self.get(full_name).ok_or_else(|| ClassifyError::UnknownType { name: full_name.to_owned() })
	}

	/// Persisted fields of a type, inherited first.
	pub fn fields(&self, full_name: &str) -> Result<&[ResolvedField]> {
		Ok(&self.require(full_name)?.fields)
	}

	/// Construct a blank instance with every field at its default.
	pub fn instantiate(&self, full_name: &str) -> Result<ObjRef> {
		let ty = self.require(full_name)?;
		if ty.is_abstract {
			return Err(ClassifyError::AbstractType { name: full_name.to_owned() });
		}

		let fields = ty
			.fields
			.iter()
			.map(|field| FieldSlot {
				declaring_type: field.declaring_type.clone(),
				name: field.def.name.clone(),
				value: field.def.default.clone(),
			})
			.collect();
		Ok(Rc::new(RefCell::new(Object {
			type_name: ty.full_name.clone(),
			fields,
		})))
	}

	/// Annotation needed to record `runtime` where `declared` was expected, if any.
	pub fn type_spec(&self, runtime: &str, declared: &Ty) -> Option<TypeSpec> {
		let Ty::Object(declared) = declared else {
			return Some(TypeSpec {
				name: runtime.to_owned(),
				full: true,
			});
		};
		if declared == runtime {
			return None;
		}

		let (runtime_ns, runtime_short) = self.split(runtime);
		let (declared_ns, _) = self.split(declared);
		if runtime_ns == declared_ns {
			Some(TypeSpec {
				name: runtime_short.to_owned(),
				full: false,
			})
		} else {
			Some(TypeSpec {
				name: runtime.to_owned(),
				full: true,
			})
		}
	}

	/// Resolve a wire annotation relative to the declared type.
	///
	/// Short names are looked up in the declared type's namespace first, then as a unique short
	/// name anywhere in the schema.
	pub fn resolve_spec(&self, spec: &TypeSpec, declared: &Ty) -> Option<&ResolvedType> {
		if spec.full {
			return self.get(&spec.name);
		}

		if let Ty::Object(declared) = declared {
			let (namespace, _) = self.split(declared);
			if let Some(found) = self.get(&join_name(namespace, &spec.name)) {
				return Some(found);
			}
		}

		let mut matches = self.inner.types.iter().filter(|ty| ty.name == spec.name);
		let first = matches.next()?;
		matches.next().is_none().then_some(first)
	}

	/// All registered types in definition order.
	pub fn types(&self) -> impl Iterator<Item = &ResolvedType> {
		self.inner.types.iter()
	}

	fn split<'a>(&'a self, full_name: &'a str) -> (&'a str, &'a str) {
		match self.get(full_name) {
			Some(ty) => (ty.namespace.as_str(), ty.name.as_str()),
			None => full_name.rsplit_once('.').unwrap_or(("", full_name)),
		}
	}
}

fn join_name(namespace: &str, name: &str) -> String {
	if namespace.is_empty() { name.to_owned() } else { format!("{namespace}.{name}") }
}

fn resolve_type(def: &TypeDef, defs: &[TypeDef], index: &HashMap<String, usize>) -> Result<ResolvedType> {
	let mut chain = vec![def];
	let mut current = def;
	while let Some(base) = &current.base {
		let &idx = index.get(base).ok_or_else(|| ClassifyError::UnknownBaseType {
			name: current.full_name(),
			base: base.clone(),
		})?;
		current = &defs[idx];
		if chain.len() > defs.len() {
			return Err(ClassifyError::InheritanceCycle { name: def.full_name() });
		}
		chain.push(current);
	}

	let mut fields: Vec<ResolvedField> = Vec::new();
	for owner in chain.iter().rev() {
		for field in &owner.fields {
			fields.push(ResolvedField {
				def: field.clone(),
				declaring_type: owner.name.clone(),
				disambiguate: false,
				ignore_if_default: field.markers.ignore_if_default || owner.ignore_if_default,
			});
		}
	}

	let mut counts: HashMap<&str, usize> = HashMap::new();
	for field in &fields {
		*counts.entry(field.def.name.as_str()).or_default() += 1;
	}
	let repeated: Vec<bool> = fields.iter().map(|field| counts[field.def.name.as_str()] > 1).collect();
	for (field, repeated) in fields.iter_mut().zip(repeated) {
		field.disambiguate = repeated;
	}

	Ok(ResolvedType {
		name: def.name.clone(),
		namespace: def.namespace.clone(),
		full_name: def.full_name(),
		is_abstract: def.is_abstract,
		fields,
	})
}
