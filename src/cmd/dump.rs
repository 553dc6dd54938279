use std::path::PathBuf;

use classify::classify::{ClassifyOptions, DictKey, Node, NodeKind, Result, Scalar, format_datetime};
use serde_json::{Map, Value as JsonValue, json};

use crate::cmd::util::{emit_json, load_document, render_key, render_scalar};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	#[arg(long)]
	pub json: bool,
	/// Maximum nesting printed before collapsing.
	#[arg(long)]
	pub depth: Option<u32>,
}

/// Output truncation limits for node trees.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
	/// Maximum number of entries printed for one dictionary.
	pub max_entries: usize,
	/// Maximum number of Unicode scalar values printed for strings.
	pub max_string_len: usize,
	/// Maximum number of items printed for one list.
	pub max_list_items: usize,
	/// Maximum recursive print depth.
	pub max_print_depth: u32,
}

impl Default for PrintOptions {
	fn default() -> Self {
		Self {
			max_entries: 80,
			max_string_len: 200,
			max_list_items: 16,
			max_print_depth: 8,
		}
	}
}

/// Print a document's node tree without a schema.
pub fn run(args: Args) -> Result<()> {
	let Args { path, json, depth } = args;
	let doc = load_document(&path)?;

	if json {
		emit_json(&DumpJson {
			path: path.display().to_string(),
			compression: doc.compression.as_str().to_owned(),
			root: node_to_json(&doc.root),
		});
		return Ok(());
	}

	let mut options = PrintOptions::default();
	if let Some(depth) = depth {
		options.max_print_depth = depth;
	}

	println!("path: {}", path.display());
	println!("compression: {}", doc.compression.as_str());
	println!("{}:", ClassifyOptions::global().root_name);
	print_node(&doc.root, 2, 0, options);
	Ok(())
}

/// Print one node subtree.
pub fn print_node(node: &Node, indent: usize, depth: u32, options: PrintOptions) {
	let pad = " ".repeat(indent);
	let head = node_head(node);

	match &node.kind {
		NodeKind::Value(value) => println!("{pad}{head}{}", render_scalar(value, options.max_string_len)),
		NodeKind::Ref(id) => println!("{pad}{head}-> #{id}"),
		NodeKind::KeyValuePair(key, value) => {
			if depth >= options.max_print_depth {
				println!("{pad}{head}( ... )");
				return;
			}
			println!("{pad}{head}(");
			print_node(key, indent + 2, depth + 1, options);
			print_node(value, indent + 2, depth + 1, options);
			println!("{pad})");
		}
		NodeKind::List(items) => {
			if depth >= options.max_print_depth {
				println!("{pad}{head}[... {} items]", items.len());
				return;
			}
			println!("{pad}{head}[");
			for item in items.iter().take(options.max_list_items) {
				print_node(item, indent + 2, depth + 1, options);
			}
			if items.len() > options.max_list_items {
				println!("{pad}  ... {} more", items.len() - options.max_list_items);
			}
			println!("{pad}]");
		}
		NodeKind::Dict(entries) => {
			if depth >= options.max_print_depth {
				println!("{pad}{head}{{ ... {} entries }}", entries.len());
				return;
			}
			println!("{pad}{head}{{");
			for (key, value) in entries.iter().take(options.max_entries) {
				print!("{pad}  {} = ", render_key(key));
				if is_container(value) {
					println!();
					print_node(value, indent + 4, depth + 1, options);
				} else {
					print_node(value, 0, depth + 1, options);
				}
			}
			if entries.len() > options.max_entries {
				println!("{pad}  ... {} more entries", entries.len() - options.max_entries);
			}
			println!("{pad}}}");
		}
	}
}

fn node_head(node: &Node) -> String {
	let mut head = String::new();
	if let Some(id) = node.ref_id {
		head.push_str(&format!("#{id} "));
	}
	if let Some(spec) = &node.type_spec {
		head.push_str(&spec.name);
		head.push(' ');
	}
	head
}

fn is_container(node: &Node) -> bool {
	matches!(node.kind, NodeKind::List(_) | NodeKind::Dict(_) | NodeKind::KeyValuePair(..))
}

/// Convert a node tree to JSON. Reference ids, type names, and back-references use `$`-prefixed keys.
pub fn node_to_json(node: &Node) -> JsonValue {
	let body = match &node.kind {
		NodeKind::Value(value) => scalar_to_json(value),
		NodeKind::Ref(id) => return json!({ "$ref": id }),
		NodeKind::KeyValuePair(key, value) => JsonValue::Array(vec![node_to_json(key), node_to_json(value)]),
		NodeKind::List(items) => JsonValue::Array(items.iter().map(node_to_json).collect()),
		NodeKind::Dict(entries) => {
			let fields: Map<String, JsonValue> = entries.iter().map(|(key, value)| (json_key(key), node_to_json(value))).collect();
			JsonValue::Object(fields)
		}
	};

	if node.ref_id.is_none() && node.type_spec.is_none() {
		return body;
	}

	let mut out = Map::new();
	if let Some(id) = node.ref_id {
		out.insert("$id".to_owned(), json!(id));
	}
	if let Some(spec) = &node.type_spec {
		out.insert("$type".to_owned(), json!(spec.name));
	}
	out.insert("value".to_owned(), body);
	JsonValue::Object(out)
}

fn json_key(key: &DictKey) -> String {
	match key {
		DictKey::Str(text) => text.clone(),
		other => render_key(other),
	}
}

fn scalar_to_json(value: &Scalar) -> JsonValue {
	match value {
		Scalar::Null => JsonValue::Null,
		Scalar::Bool(v) => json!(v),
		Scalar::U8(v) => json!(v),
		Scalar::I8(v) => json!(v),
		Scalar::I16(v) => json!(v),
		Scalar::U16(v) => json!(v),
		Scalar::I32(v) => json!(v),
		Scalar::U32(v) => json!(v),
		Scalar::I64(v) => json!(v),
		Scalar::U64(v) => json!(v),
		Scalar::F32(v) => json!(v),
		Scalar::F64(v) => json!(v),
		Scalar::DateTime(v) => json!(format_datetime(v)),
		Scalar::Decimal(v) => json!(v.to_string()),
		Scalar::BigInt(v) => json!(v.to_string()),
		Scalar::String(v) => json!(v),
		Scalar::Bytes(v) => JsonValue::Array(v.iter().map(|item| json!(item)).collect()),
	}
}

#[derive(serde::Serialize)]
struct DumpJson {
	path: String,
	compression: String,
	root: JsonValue,
}

#[cfg(test)]
mod tests {
	use classify::classify::{DictKey, Node, Scalar, TypeSpec};
	use serde_json::json;

	use super::node_to_json;

	#[test]
	fn json_marks_ids_types_and_refs() {
		let mut root = Node::dict(vec![
			(DictKey::field("name"), Node::scalar(Scalar::String("a".into()))),
			(DictKey::field("me"), Node::reference(0)),
		])
		.with_type_spec(TypeSpec {
			name: "Item".into(),
			full: false,
		});
		root.ref_id = Some(0);

		let out = node_to_json(&root);
		assert_eq!(out["$id"], json!(0));
		assert_eq!(out["$type"], json!("Item"));
		assert_eq!(out["value"]["name"], json!("a"));
		assert_eq!(out["value"]["me"], json!({ "$ref": 0 }));
	}

	#[test]
	fn plain_lists_and_pairs_are_arrays() {
		let node = Node::list(vec![Node::pair(Node::scalar(Scalar::I32(1)), Node::scalar(Scalar::Bool(true))), Node::null()]);
		assert_eq!(node_to_json(&node), json!([[1, true], null]));
	}

	#[test]
	fn text_keys_are_not_quoted() {
		let node = Node::dict(vec![(DictKey::Str("k".into()), Node::null()), (DictKey::Int(-2), Node::null())]);
		assert_eq!(node_to_json(&node), json!({ "k": null, "-2": null }));
	}
}
