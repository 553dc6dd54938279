use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{TimeZone, Utc};
use num_bigint::BigInt;

use super::{decode_node, encode_node};
use crate::classify::ClassifyError;
use crate::classify::node::{DictKey, Node, NodeKind, Scalar, TypeSpec};
use crate::classify::tag::DataType;

const SENTINEL: [u8; 8] = u64::MAX.to_le_bytes();

fn round_trip(node: &Node) -> Node {
	let bytes = encode_node(node).expect("encode succeeds");
	decode_node(&bytes).expect("decode succeeds")
}

#[test]
fn scalars_round_trip() {
	let scalars = vec![
		Scalar::Null,
		Scalar::Bool(false),
		Scalar::Bool(true),
		Scalar::U8(200),
		Scalar::I8(-100),
		Scalar::I16(-30_000),
		Scalar::U16(60_000),
		Scalar::I32(i32::MIN),
		Scalar::U32(u32::MAX),
		Scalar::I64(i64::MIN),
		Scalar::U64(u64::MAX),
		Scalar::F32(1.25),
		Scalar::F64(-1e300),
		Scalar::DateTime(Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).single().expect("valid date")),
		Scalar::Decimal(BigDecimal::from_str("12345.6789").expect("parses")),
		Scalar::BigInt(BigInt::from_str("-98765432109876543210987654321").expect("parses")),
		Scalar::String("hello ÿ world".into()),
		Scalar::Bytes(vec![0xFF, 0x00, 0xFF]),
	];

	for scalar in scalars {
		let node = Node::scalar(scalar.clone());
		assert_eq!(round_trip(&node), node, "scalar {scalar:?} should round-trip");
	}
}

#[test]
fn nan_and_negative_zero_keep_their_bits() {
	for value in [f64::NAN, -0.0_f64] {
		let decoded = round_trip(&Node::scalar(Scalar::F64(value)));
		let NodeKind::Value(Scalar::F64(got)) = decoded.kind else {
			panic!("expected double");
		};
		assert_eq!(got.to_bits(), value.to_bits());
	}
}

#[test]
fn booleans_and_null_are_a_single_tag_byte() {
	assert_eq!(encode_node(&Node::scalar(Scalar::Bool(true))).expect("encode"), vec![DataType::True as u8]);
	assert_eq!(encode_node(&Node::null()).expect("encode"), vec![DataType::Null as u8]);
}

#[test]
fn list_children_are_closed_by_end() {
	let node = Node::list(vec![Node::scalar(Scalar::Bool(true)), Node::null()]);
	assert_eq!(encode_node(&node).expect("encode"), vec![29, 3, 1, 0]);
	assert_eq!(round_trip(&node), node);
}

#[test]
fn dictionary_writes_value_before_key() {
	let node = Node::dict(vec![(DictKey::Str("a".into()), Node::scalar(Scalar::Bool(true)))]);
	assert_eq!(encode_node(&node).expect("encode"), vec![23, 3, b'a', 0xFF, 0]);
	assert_eq!(round_trip(&node), node);
}

#[test]
fn type_spec_then_ref_id_follow_the_payload() {
	let mut node = Node::dict(Vec::new()).with_type_spec(TypeSpec {
		name: "Foo".into(),
		full: false,
	});
	node.ref_id = Some(0);

	let mut expected = vec![DataType::DictStringWithRefId as u8 | 0x40, 0, b'F', b'o', b'o', 0xFF];
	expected.extend_from_slice(&SENTINEL);
	assert_eq!(encode_node(&node).expect("encode"), expected);
	assert_eq!(round_trip(&node), node);
}

#[test]
fn ref_node_carries_an_optim_id() {
	let mut expected = vec![31];
	expected.extend_from_slice(&3_u64.to_le_bytes());
	expected.extend_from_slice(&SENTINEL);
	assert_eq!(encode_node(&Node::reference(3)).expect("encode"), expected);
}

#[test]
fn non_latin_string_keys_are_written_as_utf16() {
	let node = Node::dict(vec![
		(DictKey::Str("Москва".into()), Node::scalar(Scalar::U8(1))),
		(DictKey::Str("東京".into()), Node::scalar(Scalar::U8(2))),
	]);
	let bytes = encode_node(&node).expect("encode");
	assert_eq!(bytes[0], DataType::DictOther as u8);
	assert_eq!(bytes[1], DataType::RawData as u8);
	assert_eq!(round_trip(&node), node);
}

#[test]
fn two_strings_dictionary_keeps_declaring_types() {
	let node = Node::dict(vec![
		(DictKey::field("name"), Node::scalar(Scalar::String("x".into()))),
		(
			DictKey::Field {
				name: "id".into(),
				declaring_type: Some("Base".into()),
			},
			Node::scalar(Scalar::U8(7)),
		),
	]);
	let bytes = encode_node(&node).expect("encode");
	assert_eq!(bytes[0], DataType::DictTwoStrings as u8);
	assert_eq!(round_trip(&node), node);
}

#[test]
fn plain_field_keys_read_back_as_strings() {
	let node = Node::dict(vec![(DictKey::field("name"), Node::null())]);
	let decoded = round_trip(&node);
	assert_eq!(decoded, Node::dict(vec![(DictKey::Str("name".into()), Node::null())]));
}

#[test]
fn other_key_forms_round_trip() {
	let when = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).single().expect("valid date");
	let nodes = vec![
		Node::dict(vec![(DictKey::Int(-5), Node::null()), (DictKey::Int(i64::MAX), Node::null())]),
		Node::dict(vec![(DictKey::U64(u64::MAX), Node::null())]),
		Node::dict(vec![(DictKey::F32(0.5), Node::null())]),
		Node::dict(vec![(DictKey::F64(-2.5), Node::null())]),
		Node::dict(vec![(DictKey::DateTime(when), Node::null())]),
		Node::dict(vec![(DictKey::Decimal(BigDecimal::from_str("0.001").expect("parses")), Node::null())]),
	];
	for node in nodes {
		assert_eq!(round_trip(&node), node);
	}
}

#[test]
fn key_value_pair_is_two_bare_nodes() {
	let node = Node::pair(Node::scalar(Scalar::U8(1)), Node::scalar(Scalar::String("v".into())));
	assert_eq!(encode_node(&node).expect("encode"), vec![20, 4, 1, 17, b'v', 0xFF]);
	assert_eq!(round_trip(&node), node);
}

#[test]
fn end_at_root_is_corruption() {
	let err = decode_node(&[0]).expect_err("bare end fails");
	assert!(matches!(err, ClassifyError::UnexpectedEnd { at: 0 }));
}

#[test]
fn trailing_bytes_are_corruption() {
	let err = decode_node(&[1, 1]).expect_err("trailing byte fails");
	assert!(matches!(err, ClassifyError::TrailingBytes { count: 1 }));
}

#[test]
fn unknown_other_key_type_is_corruption() {
	let err = decode_node(&[25, 3, 0]).expect_err("bool keys are not a key type");
	assert!(matches!(err, ClassifyError::InvalidDictKeyType { tag: 3, at: 1 }));
}

#[test]
fn truncated_list_is_eof() {
	let err = decode_node(&[29, 3]).expect_err("missing end fails");
	assert!(matches!(err, ClassifyError::UnexpectedEof { .. }));
}
