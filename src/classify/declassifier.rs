//! Node tree to live value.
//!
//! Back-references are not resolved while walking: each `Ref` leaves a null placeholder and
//! queues a patch naming where the placeholder sits. Patches run in queue order once the whole
//! tree has been read, so every id-carrying node already has its value.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::classify::io::read_side_document;
use crate::classify::node::{DictKey, Node, NodeKind, Scalar};
use crate::classify::options::{ClassifyOptions, Convert};
use crate::classify::scalar::{from_scalar, value_of_key};
use crate::classify::schema::{ResolvedField, Schema, Ty};
use crate::classify::value::{Deferred, ObjRef, Value};
use crate::classify::{ClassifyError, Result};

/// Convert a node tree into a value of type `ty`, reusing `existing` where types match.
pub fn declassify_value(node: &Node, ty: &Ty, existing: Option<&Value>, schema: &Schema, options: &ClassifyOptions) -> Result<Value> {
	let mut walker = Declassifier {
		schema,
		options,
		targets: HashMap::new(),
		patches: Vec::new(),
	};
	let mut root = walker.declassify(node, ty, existing, &Location::root())?;
	walker.drain(&mut root)?;
	Ok(root)
}

/// Where a patched value lives: the root, or one field of an object.
#[derive(Debug, Clone)]
enum Anchor {
	Root,
	Field { object: ObjRef, declaring_type: String, name: String },
}

/// One step below an anchor.
#[derive(Debug, Clone, Copy)]
enum Step {
	/// List element or tuple slot.
	Index(usize),
	/// Dictionary entry value.
	Entry(usize),
}

#[derive(Debug, Clone)]
struct Location {
	anchor: Anchor,
	path: Vec<Step>,
}

impl Location {
	fn root() -> Self {
		Self {
			anchor: Anchor::Root,
			path: Vec::new(),
		}
	}

	fn field(object: &ObjRef, field: &ResolvedField) -> Self {
		Self {
			anchor: Anchor::Field {
				object: Rc::clone(object),
				declaring_type: field.declaring_type.clone(),
				name: field.name().to_owned(),
			},
			path: Vec::new(),
		}
	}

	fn child(&self, step: Step) -> Self {
		let mut path = self.path.clone();
		path.push(step);
		Self {
			anchor: self.anchor.clone(),
			path,
		}
	}
}

enum Patch {
	/// Replace the placeholder with the value registered under `id`.
	Resolve { at: Location, id: u64 },
	/// Turn a substitute value back into the real value.
	Convert { at: Location, convert: Convert },
	/// Wrap a plain value in an evaluated `Deferred`, after every patch inside it has run.
	Wrap { at: Location },
}

struct Declassifier<'a> {
	schema: &'a Schema,
	options: &'a ClassifyOptions,
	targets: HashMap<u64, Value>,
	patches: Vec<Patch>,
}

impl Declassifier<'_> {
	fn declassify(&mut self, node: &Node, ty: &Ty, existing: Option<&Value>, at: &Location) -> Result<Value> {
		let options = self.options;
		let hooked;
		let node = match options.before_declassify_hook(ty) {
			Some(hook) => {
				let mut copy = node.clone();
				hook(&mut copy);
				hooked = copy;
				&hooked
			}
			None => node,
		};

		if let Some(substitution) = options.substitution(ty) {
			let value = self.declassify(node, &substitution.ty, None, at)?;
			self.patches.push(Patch::Convert {
				at: at.clone(),
				convert: substitution.from_substitute.clone(),
			});
			return Ok(value);
		}

		let value = match &node.kind {
			NodeKind::Ref(id) => {
				self.patches.push(Patch::Resolve { at: at.clone(), id: *id });
				if matches!(ty, Ty::Deferred(_)) {
					self.patches.push(Patch::Wrap { at: at.clone() });
				}
				return Ok(Value::Null);
			}
			NodeKind::Value(Scalar::Null) => return Ok(Value::Null),
			_ => self.declassify_shape(node, ty, existing, at)?,
		};

		if let Some(id) = node.ref_id {
			self.targets.insert(id, value.clone());
		}
		Ok(value)
	}

	fn declassify_shape(&mut self, node: &Node, ty: &Ty, existing: Option<&Value>, at: &Location) -> Result<Value> {
		match (ty, &node.kind) {
			(Ty::Object(name), _) => self.declassify_object(node, Some(name.as_str()), ty, existing, at),
			(Ty::Dynamic, NodeKind::Dict(_)) if node.type_spec.is_some() => self.declassify_object(node, None, ty, existing, at),
			(Ty::Dynamic, NodeKind::Dict(entries)) => self.declassify_dict(entries, &Ty::Dynamic, &Ty::Dynamic, at),
			(Ty::Dynamic, NodeKind::List(items)) => self.declassify_list(items, |_| &Ty::Dynamic, at).map(Value::List),
			(Ty::Dynamic, NodeKind::KeyValuePair(key, value)) => self.declassify_pair(key, value, &Ty::Dynamic, &Ty::Dynamic, at),
			(Ty::List(elem), NodeKind::List(items)) => self.declassify_list(items, |_| elem.as_ref(), at).map(Value::List),
			(Ty::Tuple(slots), NodeKind::KeyValuePair(key, value)) if slots.len() == 2 => self.declassify_pair(key, value, &slots[0], &slots[1], at),
			(Ty::Tuple(slots), NodeKind::List(items)) if slots.len() == items.len() => self.declassify_list(items, |idx| &slots[idx], at).map(Value::Tuple),
			(Ty::Dict(key_ty, value_ty), NodeKind::Dict(entries)) => self.declassify_dict(entries, key_ty, value_ty, at),
			(Ty::Deferred(inner), _) => {
				let value = self.declassify(node, inner, None, at)?;
				self.patches.push(Patch::Wrap { at: at.clone() });
				Ok(value)
			}
			(_, NodeKind::Value(scalar)) => Ok(from_scalar(scalar, ty).unwrap_or_else(|| drift(node, ty))),
			_ => Ok(drift(node, ty)),
		}
	}

	fn declassify_list<'t>(&mut self, items: &[Node], elem: impl Fn(usize) -> &'t Ty, at: &Location) -> Result<Vec<Value>> {
		let mut out = Vec::with_capacity(items.len());
		for (idx, item) in items.iter().enumerate() {
			out.push(self.declassify(item, elem(idx), None, &at.child(Step::Index(idx)))?);
		}
		Ok(out)
	}

	fn declassify_pair(&mut self, key: &Node, value: &Node, key_ty: &Ty, value_ty: &Ty, at: &Location) -> Result<Value> {
		let key = self.declassify(key, key_ty, None, &at.child(Step::Index(0)))?;
		let value = self.declassify(value, value_ty, None, &at.child(Step::Index(1)))?;
		Ok(Value::Tuple(vec![key, value]))
	}

	fn declassify_dict(&mut self, entries: &[(DictKey, Node)], key_ty: &Ty, value_ty: &Ty, at: &Location) -> Result<Value> {
		let mut out = Vec::with_capacity(entries.len());
		for (key, node) in entries {
			let Some(key) = value_of_key(key, key_ty) else {
				debug!(?key, expected = ?key_ty, "dropping dictionary entry with unconvertible key");
				continue;
			};
			let value = self.declassify(node, value_ty, None, &at.child(Step::Entry(out.len())))?;
			out.push((key, value));
		}
		Ok(Value::Dict(out))
	}

	fn declassify_object(&mut self, node: &Node, declared: Option<&str>, ty: &Ty, existing: Option<&Value>, at: &Location) -> Result<Value> {
		let NodeKind::Dict(entries) = &node.kind else {
			return Ok(drift(node, ty));
		};

		let type_name = match &node.type_spec {
			Some(spec) => match self.schema.resolve_spec(spec, ty) {
				Some(found) => Some(found.full_name.clone()),
				None => {
					warn!(type_name = %spec.name, declared = ?declared, "unresolvable type annotation, falling back to declared type");
					declared.map(str::to_owned)
				}
			},
			None => declared.map(str::to_owned),
		};
		let Some(type_name) = type_name else {
			return self.declassify_dict(entries, &Ty::Dynamic, &Ty::Dynamic, at);
		};

		let obj = match existing.and_then(Value::as_object) {
			Some(obj) if obj.borrow().type_name == type_name => Rc::clone(obj),
			_ => self.schema.instantiate(&type_name)?,
		};

		let schema = self.schema;
		let mut used = vec![false; entries.len()];
		for field in schema.fields(&type_name)? {
			let markers = &field.def.markers;
			if markers.ignore || markers.parent {
				continue;
			}
			let Some(idx) = find_entry(entries, &used, field) else {
				continue;
			};
			used[idx] = true;
			let entry = &entries[idx].1;

			let value = if markers.follow_id {
				self.follow_id(entry, field, &type_name)?
			} else {
				let current = obj.borrow().get_declared(&field.declaring_type, field.name()).cloned();
				self.declassify(entry, &field.def.ty, current.as_ref(), &Location::field(&obj, field))?
			};

			if value.is_null() && !entry.is_null() && !matches!(entry.kind, NodeKind::Ref(_)) {
				debug!(type_name = %type_name, field = field.name(), "field value did not fit, keeping default");
				continue;
			}
			obj.borrow_mut().set_declared(&field.declaring_type, field.name(), value);
		}

		for ((key, _), used) in entries.iter().zip(used) {
			if !used {
				debug!(type_name = %type_name, ?key, "dropping unknown field");
			}
		}

		Ok(Value::Object(obj))
	}

	fn follow_id(&mut self, entry: &Node, field: &ResolvedField, type_name: &str) -> Result<Value> {
		let Ty::Deferred(inner) = &field.def.ty else {
			return Err(ClassifyError::FollowIdShape {
				type_name: type_name.to_owned(),
				field: field.name().to_owned(),
			});
		};
		let id = match &entry.kind {
			NodeKind::Value(scalar) => from_scalar(scalar, &Ty::String),
			_ => None,
		};
		let Some(Value::String(id)) = id else {
			return Ok(drift(entry, &field.def.ty));
		};

		let base = self.options.follow_id_base.clone();
		let schema = self.schema.clone();
		let options = self.options.clone();
		let inner = Ty::clone(inner);
		let key = id.clone();
		Ok(Value::Deferred(Rc::new(Deferred::pending(id, move || {
			let base = base.ok_or_else(|| ClassifyError::FollowIdWithoutBase { id: key.clone() })?;
			read_side_document(&base, &key, &inner, &schema, &options)
		}))))
	}

	fn drain(&mut self, root: &mut Value) -> Result<()> {
		let patches = std::mem::take(&mut self.patches);
		if !patches.is_empty() {
			trace!(count = patches.len(), "applying deferred patches");
		}

		for patch in patches {
			match patch {
				Patch::Resolve { at, id } => {
					let target = self.targets.get(&id).cloned().ok_or(ClassifyError::UnresolvedReference { id })?;
					if with_slot(root, &at, |slot| *slot = target).is_none() {
						debug!(id, "reference placeholder no longer reachable");
					}
				}
				Patch::Convert { at, convert } => {
					let Some(current) = with_slot(root, &at, |slot| slot.clone()) else {
						continue;
					};
					if current.is_null() {
						continue;
					}
					let real = convert(&current)?;
					with_slot(root, &at, |slot| *slot = real);
				}
				Patch::Wrap { at } => {
					with_slot(root, &at, |slot| {
						if !slot.is_null() && !matches!(slot, Value::Deferred(_)) {
							let value = std::mem::replace(slot, Value::Null);
							*slot = Value::Deferred(Rc::new(Deferred::ready(String::new(), value)));
						}
					});
				}
			}
		}
		Ok(())
	}
}

fn drift(node: &Node, ty: &Ty) -> Value {
	debug!(expected = ?ty, found = node.kind_label(), "schema drift, reading as null");
	Value::Null
}

/// Entry for a field: exact declaring-type key first, then a plain name not yet claimed.
fn find_entry(entries: &[(DictKey, Node)], used: &[bool], field: &ResolvedField) -> Option<usize> {
	let exact = entries.iter().position(|(key, _)| match key {
		DictKey::Field {
			name,
			declaring_type: Some(declaring),
		} => name == field.name() && *declaring == field.declaring_type,
		_ => false,
	});
	exact.or_else(|| {
		entries.iter().zip(used).position(|((key, _), used)| {
			!used
				&& match key {
					DictKey::Field { name, declaring_type: None } | DictKey::Str(name) => name == field.name(),
					_ => false,
				}
		})
	})
}

fn with_slot<R>(root: &mut Value, at: &Location, apply: impl FnOnce(&mut Value) -> R) -> Option<R> {
	match &at.anchor {
		Anchor::Root => slot_at(root, &at.path).map(apply),
		Anchor::Field {
			object,
			declaring_type,
			name,
		} => {
			let mut object = object.borrow_mut();
			let field = object.get_declared_mut(declaring_type, name)?;
			slot_at(field, &at.path).map(apply)
		}
	}
}

fn slot_at<'v>(mut value: &'v mut Value, path: &[Step]) -> Option<&'v mut Value> {
	for step in path {
		value = match (value, step) {
			(Value::List(items) | Value::Tuple(items), Step::Index(idx)) => items.get_mut(*idx)?,
			(Value::Dict(entries), Step::Entry(idx)) => &mut entries.get_mut(*idx)?.1,
			_ => return None,
		};
	}
	Some(value)
}

#[cfg(test)]
mod tests;
