#![allow(missing_docs)]

use std::path::Path;
use std::process::Command;
use std::rc::Rc;

use classify::classify::{ClassifyOptions, FieldDef, FileOptions, Schema, Ty, TypeDef, Value, save_file};
use serde_json::Value as JsonValue;

fn write_fixture(path: &Path, file_options: &FileOptions) {
	let schema = Schema::new([TypeDef::new("demo", "Item").field(FieldDef::new("name", Ty::String)).field(FieldDef::new("count", Ty::I32))]).expect("schema");
	let item = schema.instantiate("demo.Item").expect("concrete");
	item.borrow_mut().set("name", Value::String("shared".into()));
	item.borrow_mut().set("count", Value::I32(300));

	let value = Value::List(vec![Value::Object(Rc::clone(&item)), Value::Object(item)]);
	save_file(path, &value, &Ty::list(Ty::object("demo.Item")), &schema, &ClassifyOptions::default(), file_options).expect("save fixture");
}

fn run_json(args: &[&str]) -> JsonValue {
	let output = Command::new(env!("CARGO_BIN_EXE_classify")).args(args).output().expect("command executes");
	assert!(
		output.status.success(),
		"classify command failed with status={}: {}",
		output.status,
		String::from_utf8_lossy(&output.stderr)
	);
	serde_json::from_slice(&output.stdout).expect("stdout should be valid json")
}

#[test]
fn info_json_reports_nodes_and_references() {
	let dir = tempfile::tempdir().expect("tempdir");
	let path = dir.path().join("items.cls");
	write_fixture(&path, &FileOptions::default());
	let path = path.to_string_lossy().into_owned();

	let json = run_json(&["info", &path, "--json"]);
	assert_eq!(json["compression"], "none");
	assert_eq!(json["root_tag"], "List");
	assert_eq!(json["ref_ids"], 1);
	assert_eq!(json["refs"], 1);
	assert_eq!(json["max_depth"], 3);
	assert!(json["kinds"].as_array().is_some_and(|items| items.iter().any(|item| item["kind"] == "Int16" && item["count"] == 1)));
}

#[test]
fn dump_json_marks_shared_objects() {
	let dir = tempfile::tempdir().expect("tempdir");
	let path = dir.path().join("items.cls.zst");
	write_fixture(&path, &FileOptions::zstd());
	let path = path.to_string_lossy().into_owned();

	let json = run_json(&["dump", &path, "--json"]);
	assert_eq!(json["compression"], "zstd");
	let root = &json["root"];
	assert_eq!(root[0]["$id"], 0);
	assert_eq!(root[0]["value"]["name"], "shared");
	assert_eq!(root[0]["value"]["count"], 300);
	assert_eq!(root[1]["$ref"], 0);
}

#[test]
fn missing_file_reports_error() {
	let output = Command::new(env!("CARGO_BIN_EXE_classify"))
		.args(["info", "/nonexistent/items.cls"])
		.output()
		.expect("command executes");
	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).starts_with("error: "));
}
