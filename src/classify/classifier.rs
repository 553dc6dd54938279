//! Live value to node tree.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::classify::io::write_side_document;
use crate::classify::node::{DictKey, Node, NodeKind, Scalar};
use crate::classify::options::ClassifyOptions;
use crate::classify::scalar::{is_key_type, key_of, to_scalar};
use crate::classify::schema::{ResolvedField, Schema, Ty};
use crate::classify::value::{ObjRef, Object, Value};
use crate::classify::{ClassifyError, Result};

/// Convert a value declared as `ty` into a node tree.
pub fn classify_value(value: &Value, ty: &Ty, schema: &Schema, options: &ClassifyOptions) -> Result<Node> {
	let mut walker = Classifier::new(schema, options);
	let mut node = walker.classify(value, ty)?;
	walker.finish(&mut node);
	Ok(node)
}

struct Seen {
	// Keeps substitutes alive so their addresses are not reused mid-walk.
	_object: ObjRef,
	candidate: u64,
}

/// One classify pass.
///
/// Every object node is tagged with a candidate id when first emitted. Candidates that are
/// referenced again receive final ids in order of first repetition; the rest are cleared in
/// [`Classifier::finish`].
struct Classifier<'a> {
	schema: &'a Schema,
	options: &'a ClassifyOptions,
	seen: HashMap<*const (), Seen>,
	next_candidate: u64,
	final_ids: HashMap<u64, u64>,
}

impl<'a> Classifier<'a> {
	fn new(schema: &'a Schema, options: &'a ClassifyOptions) -> Self {
		Self {
			schema,
			options,
			seen: HashMap::new(),
			next_candidate: 0,
			final_ids: HashMap::new(),
		}
	}

	fn classify(&mut self, value: &Value, ty: &Ty) -> Result<Node> {
		if value.is_null() {
			return Ok(Node::null());
		}

		let options = self.options;
		if let Some(substitution) = options.substitution(ty) {
			let substitute = (substitution.to_substitute)(value)?;
			let mut node = self.classify(&substitute, &substitution.ty)?;
			self.after_classify(ty, &mut node);
			return Ok(node);
		}

		let mut node = match value {
			Value::Object(obj) => self.classify_object(obj, ty)?,
			Value::Tuple(slots) => self.classify_tuple(slots, ty)?,
			Value::List(items) => {
				let elem = match ty {
					Ty::List(elem) => elem.as_ref(),
					_ => &Ty::Dynamic,
				};
				let mut nodes = Vec::with_capacity(items.len());
				for item in items {
					nodes.push(self.classify(item, elem)?);
				}
				Node::list(nodes)
			}
			Value::Dict(entries) => self.classify_dict(entries, ty)?,
			Value::Deferred(deferred) => {
				let inner = match ty {
					Ty::Deferred(inner) => inner.as_ref(),
					_ => &Ty::Dynamic,
				};
				self.classify(deferred.get()?, inner)?
			}
			scalar => Node::scalar(to_scalar(scalar).unwrap_or(Scalar::Null)),
		};

		self.after_classify(ty, &mut node);
		Ok(node)
	}

	fn after_classify(&self, ty: &Ty, node: &mut Node) {
		if matches!(node.kind, NodeKind::Ref(_)) {
			return;
		}
		if let Some(hook) = self.options.after_classify_hook(ty) {
			hook(node);
		}
	}

	fn classify_tuple(&mut self, slots: &[Value], ty: &Ty) -> Result<Node> {
		let slot_ty = |idx: usize| match ty {
			Ty::Tuple(tys) => tys.get(idx).cloned().unwrap_or(Ty::Dynamic),
			_ => Ty::Dynamic,
		};

		if let [key, value] = slots {
			let key = self.classify(key, &slot_ty(0))?;
			let value = self.classify(value, &slot_ty(1))?;
			return Ok(Node::pair(key, value));
		}

		let mut nodes = Vec::with_capacity(slots.len());
		for (idx, slot) in slots.iter().enumerate() {
			nodes.push(self.classify(slot, &slot_ty(idx))?);
		}
		Ok(Node::list(nodes))
	}

	fn classify_dict(&mut self, entries: &[(Value, Value)], ty: &Ty) -> Result<Node> {
		let (key_ty, value_ty) = match ty {
			Ty::Dict(key, value) => (key.as_ref(), value.as_ref()),
			_ => (&Ty::Dynamic, &Ty::Dynamic),
		};
		if !is_key_type(key_ty) {
			return Err(ClassifyError::UnsupportedKeyType { ty: format!("{key_ty:?}") });
		}

		let mut out = Vec::with_capacity(entries.len());
		for (key, value) in entries {
			let key = key_of(key).ok_or_else(|| ClassifyError::UnsupportedKeyType { ty: key.kind_label().to_owned() })?;
			out.push((key, self.classify(value, value_ty)?));
		}
		Ok(Node::dict(out))
	}

	fn classify_object(&mut self, obj: &ObjRef, ty: &Ty) -> Result<Node> {
		let ptr = Rc::as_ptr(obj).cast::<()>();
		if let Some(seen) = self.seen.get(&ptr) {
			let candidate = seen.candidate;
			let next = self.final_ids.len() as u64;
			self.final_ids.entry(candidate).or_insert(next);
			return Ok(Node::reference(candidate));
		}

		let candidate = self.next_candidate;
		self.next_candidate += 1;
		self.seen.insert(
			ptr,
			Seen {
				_object: Rc::clone(obj),
				candidate,
			},
		);

		let object = obj.borrow();
		let schema = self.schema;
		let fields = schema.fields(&object.type_name)?;
		let mut entries = Vec::with_capacity(fields.len());
		for field in fields {
			if let Some(entry) = self.classify_field(&object, field)? {
				entries.push(entry);
			}
		}

		let mut node = Node::dict(entries);
		node.ref_id = Some(candidate);
		node.type_spec = schema.type_spec(&object.type_name, ty);
		Ok(node)
	}

	fn classify_field(&mut self, object: &Object, field: &ResolvedField) -> Result<Option<(DictKey, Node)>> {
		let markers = &field.def.markers;
		if markers.ignore || markers.parent {
			return Ok(None);
		}

		let value = object.get_declared(&field.declaring_type, field.name()).unwrap_or(&field.def.default);
		if field.ignore_if_default && *value == field.def.default {
			return Ok(None);
		}
		if markers.ignore_if_empty && (value.is_null() || value.is_empty_collection()) {
			return Ok(None);
		}
		if markers.ignore_if.as_ref() == Some(value) {
			return Ok(None);
		}

		let node = if markers.follow_id {
			self.classify_follow_id(object, field, value)?
		} else {
			self.classify(value, &field.def.ty)?
		};
		Ok(Some((field.key(), node)))
	}

	fn classify_follow_id(&mut self, object: &Object, field: &ResolvedField, value: &Value) -> Result<Node> {
		let shape_error = || ClassifyError::FollowIdShape {
			type_name: object.type_name.clone(),
			field: field.name().to_owned(),
		};
		let Ty::Deferred(inner) = &field.def.ty else {
			return Err(shape_error());
		};
		let deferred = match value {
			Value::Null => return Ok(Node::null()),
			Value::Deferred(deferred) => deferred,
			_ => return Err(shape_error()),
		};

		match (deferred.peek(), &self.options.follow_id_base) {
			(Some(nested), Some(base)) => {
				trace!(id = deferred.id(), base = %base.display(), "writing follow-by-id document");
				write_side_document(base, deferred.id(), nested, inner, self.schema, self.options)?;
			}
			(Some(_), None) => warn!(id = deferred.id(), "follow-by-id value evaluated but no base directory set, nested document not written"),
			(None, _) => {}
		}
		Ok(Node::scalar(Scalar::String(deferred.id().to_owned())))
	}

	fn finish(&self, node: &mut Node) {
		if let Some(candidate) = node.ref_id {
			node.ref_id = self.final_ids.get(&candidate).copied();
		}

		match &mut node.kind {
			NodeKind::Ref(id) => {
				if let Some(&id_final) = self.final_ids.get(id) {
					*id = id_final;
				}
			}
			NodeKind::KeyValuePair(key, value) => {
				self.finish(key);
				self.finish(value);
			}
			NodeKind::List(items) => items.iter_mut().for_each(|item| self.finish(item)),
			NodeKind::Dict(entries) => entries.iter_mut().for_each(|(_, value)| self.finish(value)),
			NodeKind::Value(_) => {}
		}
	}
}
