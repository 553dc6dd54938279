use std::rc::Rc;

use super::declassify_value;
use crate::classify::ClassifyError;
use crate::classify::classifier::classify_value;
use crate::classify::node::{DictKey, Node, NodeKind, Scalar, TypeSpec};
use crate::classify::options::ClassifyOptions;
use crate::classify::schema::{FieldDef, Schema, Ty, TypeDef};
use crate::classify::value::{Deferred, Value};

fn schema() -> Schema {
	Schema::new([
		TypeDef::new("demo", "Item")
			.field(FieldDef::new("name", Ty::String))
			.field(FieldDef::new("next", Ty::object("demo.Item")))
			.field(FieldDef::new("size", Ty::I32).default(Value::I32(7))),
		TypeDef::new("demo", "Special").base("demo.Item").field(FieldDef::new("extra", Ty::Bool)),
		TypeDef::new("demo", "Holder").field(FieldDef::new("doc", Ty::deferred(Ty::object("demo.Item"))).follow_id()),
	])
	.expect("valid schema")
}

fn item_node(name: &str) -> Node {
	Node::dict(vec![(DictKey::field("name"), Node::scalar(Scalar::String(name.into())))])
}

fn read(node: &Node, ty: &Ty) -> Value {
	declassify_value(node, ty, None, &schema(), &ClassifyOptions::default()).expect("declassify")
}

#[test]
fn reference_before_target_resolves_to_same_object() {
	let mut target = item_node("a");
	target.ref_id = Some(0);
	let node = Node::list(vec![Node::reference(0), target]);

	let Value::List(items) = read(&node, &Ty::list(Ty::object("demo.Item"))) else {
		panic!("expected list");
	};
	let first = items[0].as_object().expect("patched");
	let second = items[1].as_object().expect("object");
	assert!(Rc::ptr_eq(first, second));
}

#[test]
fn forward_reference_inside_dictionary_keeps_entry_order() {
	let mut target = item_node("a");
	target.ref_id = Some(0);
	let node = Node::dict(vec![(DictKey::Str("first".into()), Node::reference(0)), (DictKey::Str("second".into()), target)]);

	let Value::Dict(entries) = read(&node, &Ty::dict(Ty::String, Ty::object("demo.Item"))) else {
		panic!("expected dict");
	};
	assert_eq!(entries[0].0, Value::String("first".into()));
	assert_eq!(entries[0].1, entries[1].1);
}

#[test]
fn self_cycle_round_trips_with_identity() {
	let schema = schema();
	let obj = schema.instantiate("demo.Item").expect("concrete");
	obj.borrow_mut().set("next", Value::Object(Rc::clone(&obj)));

	let ty = Ty::object("demo.Item");
	let node = classify_value(&Value::Object(obj), &ty, &schema, &ClassifyOptions::default()).expect("classify");
	let back = declassify_value(&node, &ty, None, &schema, &ClassifyOptions::default()).expect("declassify");

	let back = back.as_object().expect("object");
	let next = back.borrow().get("next").cloned().expect("field");
	assert!(Rc::ptr_eq(back, next.as_object().expect("object")));
}

#[test]
fn missing_reference_target_is_fatal() {
	let node = Node::list(vec![Node::reference(3)]);
	let err = declassify_value(&node, &Ty::Dynamic, None, &schema(), &ClassifyOptions::default()).expect_err("unresolved");
	assert!(matches!(err, ClassifyError::UnresolvedReference { id: 3 }));
}

#[test]
fn unknown_fields_drop_and_missing_fields_keep_defaults() {
	let node = Node::dict(vec![
		(DictKey::field("name"), Node::scalar(Scalar::String("kept".into()))),
		(DictKey::field("removed"), Node::scalar(Scalar::U8(9))),
	]);
	let value = read(&node, &Ty::object("demo.Item"));
	let obj = value.as_object().expect("object").borrow();
	assert_eq!(obj.get("name"), Some(&Value::String("kept".into())));
	assert_eq!(obj.get("size"), Some(&Value::I32(7)));
	assert!(obj.get("removed").is_none());
}

#[test]
fn shape_drift_keeps_field_default() {
	let node = Node::dict(vec![(DictKey::field("size"), Node::list(vec![Node::scalar(Scalar::U8(1))]))]);
	let value = read(&node, &Ty::object("demo.Item"));
	assert_eq!(value.as_object().expect("object").borrow().get("size"), Some(&Value::I32(7)));

	let node = Node::dict(vec![(DictKey::field("size"), Node::null())]);
	let value = read(&node, &Ty::object("demo.Item"));
	assert_eq!(value.as_object().expect("object").borrow().get("size"), Some(&Value::Null));
}

#[test]
fn type_spec_selects_subtype_and_unknown_spec_falls_back() {
	let mut node = item_node("s");
	node.type_spec = Some(TypeSpec {
		name: "Special".into(),
		full: false,
	});
	let value = read(&node, &Ty::object("demo.Item"));
	assert_eq!(value.as_object().expect("object").borrow().type_name, "demo.Special");

	node.type_spec = Some(TypeSpec {
		name: "gone.Type".into(),
		full: true,
	});
	let value = read(&node, &Ty::object("demo.Item"));
	assert_eq!(value.as_object().expect("object").borrow().type_name, "demo.Item");
}

#[test]
fn existing_instance_is_filled_in_place() {
	let schema = schema();
	let existing = Value::Object(schema.instantiate("demo.Item").expect("concrete"));
	let value = declassify_value(&item_node("in place"), &Ty::object("demo.Item"), Some(&existing), &schema, &ClassifyOptions::default()).expect("declassify");
	assert_eq!(value, existing);
	assert_eq!(existing.as_object().expect("object").borrow().get("name"), Some(&Value::String("in place".into())));
}

#[test]
fn dynamic_reads_plain_shapes() {
	let node = Node::list(vec![
		Node::pair(Node::scalar(Scalar::U8(1)), Node::scalar(Scalar::String("x".into()))),
		Node::dict(vec![(DictKey::Int(4), Node::scalar(Scalar::Bool(true)))]),
	]);
	assert_eq!(
		read(&node, &Ty::Dynamic),
		Value::List(vec![
			Value::Tuple(vec![Value::U8(1), Value::String("x".into())]),
			Value::Dict(vec![(Value::I64(4), Value::Bool(true))]),
		])
	);
}

#[test]
fn two_tuple_accepts_pair_or_two_element_list() {
	let ty = Ty::Tuple(vec![Ty::I32, Ty::String]);
	let expected = Value::Tuple(vec![Value::I32(300), Value::String("v".into())]);
	let pair = Node::pair(Node::scalar(Scalar::I16(300)), Node::scalar(Scalar::String("v".into())));
	let list = Node::list(vec![Node::scalar(Scalar::I16(300)), Node::scalar(Scalar::String("v".into()))]);
	assert_eq!(read(&pair, &ty), expected);
	assert_eq!(read(&list, &ty), expected);
}

#[test]
fn hook_and_substitution_run_around_declared_type() {
	let mut options = ClassifyOptions::default();
	options.before_declassify("demo.Item", |node| {
		if let NodeKind::Value(Scalar::String(text)) = &mut node.kind {
			text.make_ascii_uppercase();
		}
	});
	options.substitute(
		"demo.Item",
		Ty::String,
		|value| Ok(value.clone()),
		|value| Ok(Value::String(format!("real:{}", value.as_str().unwrap_or_default()))),
	);

	let node = Node::scalar(Scalar::String("abc".into()));
	let value = declassify_value(&node, &Ty::object("demo.Item"), None, &schema(), &options).expect("declassify");
	assert_eq!(value, Value::String("real:ABC".into()));
}

#[test]
fn follow_id_without_base_fails_on_access() {
	let node = Node::dict(vec![(DictKey::field("doc"), Node::scalar(Scalar::String("chunk-1".into())))]);
	let value = read(&node, &Ty::object("demo.Holder"));
	let doc = value.as_object().expect("object").borrow().get("doc").cloned().expect("field");
	let Value::Deferred(deferred) = doc else {
		panic!("expected deferred placeholder");
	};
	assert_eq!(deferred.id(), "chunk-1");
	assert!(!deferred.is_evaluated());
	assert!(matches!(deferred.get(), Err(ClassifyError::FollowIdWithoutBase { .. })));
}

#[test]
fn references_inside_inline_deferred_values_resolve_before_wrapping() {
	let schema = Schema::new([
		TypeDef::new("demo", "Item").field(FieldDef::new("name", Ty::String)),
		TypeDef::new("demo", "Holder")
			.field(FieldDef::new("items", Ty::deferred(Ty::list(Ty::object("demo.Item")))))
			.field(FieldDef::new("first", Ty::deferred(Ty::object("demo.Item")))),
	])
	.expect("valid schema");
	let options = ClassifyOptions::default();

	let shared = schema.instantiate("demo.Item").expect("concrete");
	shared.borrow_mut().set("name", Value::String("a".into()));
	let holder = schema.instantiate("demo.Holder").expect("concrete");
	let items = Value::List(vec![Value::Object(Rc::clone(&shared)), Value::Object(Rc::clone(&shared))]);
	holder.borrow_mut().set("items", Value::Deferred(Rc::new(Deferred::ready("", items))));
	holder.borrow_mut().set("first", Value::Deferred(Rc::new(Deferred::ready("", Value::Object(shared)))));

	let ty = Ty::object("demo.Holder");
	let node = classify_value(&Value::Object(holder), &ty, &schema, &options).expect("classify");
	let back = declassify_value(&node, &ty, None, &schema, &options).expect("declassify");
	let back = back.as_object().expect("object").borrow();

	let Some(Value::Deferred(items)) = back.get("items") else {
		panic!("expected deferred list");
	};
	let Value::List(items) = items.get().expect("evaluated") else {
		panic!("expected list");
	};
	let a = items[0].as_object().expect("first element");
	assert!(Rc::ptr_eq(a, items[1].as_object().expect("shared element")));

	let Some(Value::Deferred(first)) = back.get("first") else {
		panic!("expected deferred reference");
	};
	assert!(Rc::ptr_eq(a, first.get().expect("evaluated").as_object().expect("object")));
}
