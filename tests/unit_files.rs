#![allow(missing_docs)]

use std::rc::Rc;

use classify::classify::{
	ClassifyOptions, Compression, Deferred, FieldDef, FileOptions, Schema, Ty, TypeDef, Value, ZSTD_MAGIC, from_reader, load_file, load_file_into, read_document,
	save_file, side_document_path, to_writer,
};

fn schema() -> Schema {
	Schema::new([
		TypeDef::new("doc", "Page")
			.field(FieldDef::new("title", Ty::String))
			.field(FieldDef::new("lines", Ty::list(Ty::String)))
			.field(FieldDef::new("views", Ty::U32).default(Value::U32(0))),
		TypeDef::new("doc", "Book")
			.field(FieldDef::new("name", Ty::String))
			.field(FieldDef::new("chapter", Ty::deferred(Ty::object("doc.Page"))).follow_id()),
	])
	.expect("valid schema")
}

fn page(schema: &Schema, title: &str) -> Value {
	let page = schema.instantiate("doc.Page").expect("concrete");
	page.borrow_mut().set("title", Value::String(title.into()));
	page.borrow_mut().set("lines", Value::List(vec![Value::String("one".into()); 64]));
	Value::Object(page)
}

fn field(value: &Value, name: &str) -> Value {
	value.as_object().expect("object").borrow().get(name).cloned().expect("field")
}

#[test]
fn compressed_files_are_detected_on_load() {
	let dir = tempfile::tempdir().expect("tempdir");
	let path = dir.path().join("page.cls");
	let schema = schema();
	let options = ClassifyOptions::default();
	let ty = Ty::object("doc.Page");

	save_file(&path, &page(&schema, "zipped"), &ty, &schema, &options, &FileOptions::zstd()).expect("save");
	let raw = std::fs::read(&path).expect("read");
	assert!(raw.starts_with(&ZSTD_MAGIC));

	let (compression, _) = read_document(&path).expect("document");
	assert_eq!(compression, Compression::Zstd);

	let back = load_file(&path, &ty, &schema, &options).expect("load");
	assert_eq!(field(&back, "title"), Value::String("zipped".into()));
	let Value::List(lines) = field(&back, "lines") else {
		panic!("expected list");
	};
	assert_eq!(lines.len(), 64);
}

#[test]
fn load_into_keeps_fields_missing_from_the_document() {
	let dir = tempfile::tempdir().expect("tempdir");
	let path = dir.path().join("page.cls");
	let old = Schema::new([TypeDef::new("doc", "Page").field(FieldDef::new("title", Ty::String))]).expect("old schema");
	let options = ClassifyOptions::default();

	let written = old.instantiate("doc.Page").expect("concrete");
	written.borrow_mut().set("title", Value::String("fresh".into()));
	save_file(&path, &Value::Object(written), &Ty::object("doc.Page"), &old, &options, &FileOptions::default()).expect("save");

	let schema = schema();
	let target = schema.instantiate("doc.Page").expect("concrete");
	target.borrow_mut().set("views", Value::U32(12));
	load_file_into(&path, &target, &schema, &options).expect("load into");

	let target = target.borrow();
	assert_eq!(target.get("title"), Some(&Value::String("fresh".into())));
	assert_eq!(target.get("views"), Some(&Value::U32(12)));
}

#[test]
fn follow_id_fields_live_in_side_documents() {
	let dir = tempfile::tempdir().expect("tempdir");
	let base = dir.path().join("chapters");
	let schema = schema();
	let options = ClassifyOptions::with_follow_id_base(&base);

	let book = schema.instantiate("doc.Book").expect("concrete");
	book.borrow_mut().set("name", Value::String("manual".into()));
	book.borrow_mut().set("chapter", Value::Deferred(Rc::new(Deferred::ready("ch-1", page(&schema, "intro")))));

	let ty = Ty::object("doc.Book");
	let mut bytes = Vec::new();
	to_writer(&mut bytes, &Value::Object(book), &ty, &schema, &options).expect("write");
	assert!(side_document_path(&base, "ch-1").is_file());
	assert!(bytes.windows(4).any(|window| window == b"ch-1"));
	assert!(!bytes.windows(5).any(|window| window == b"intro"));

	let back = from_reader(bytes.as_slice(), &ty, &schema, &options).expect("read");
	let Value::Deferred(chapter) = field(&back, "chapter") else {
		panic!("expected deferred chapter");
	};
	assert_eq!(chapter.id(), "ch-1");
	assert!(!chapter.is_evaluated());

	let loaded = chapter.get().expect("side document loads");
	assert_eq!(field(loaded, "title"), Value::String("intro".into()));
	assert!(chapter.is_evaluated());
}

#[test]
fn unevaluated_follow_id_writes_only_the_id() {
	let dir = tempfile::tempdir().expect("tempdir");
	let schema = schema();
	let options = ClassifyOptions::with_follow_id_base(dir.path());

	let book = schema.instantiate("doc.Book").expect("concrete");
	let pending = Deferred::pending("ch-9", || Ok(Value::Null));
	book.borrow_mut().set("chapter", Value::Deferred(Rc::new(pending)));

	let mut bytes = Vec::new();
	to_writer(&mut bytes, &Value::Object(book), &Ty::object("doc.Book"), &schema, &options).expect("write");
	assert!(!side_document_path(dir.path(), "ch-9").exists());
	assert!(bytes.windows(4).any(|window| window == b"ch-9"));
}
