use std::collections::BTreeMap;
use std::path::PathBuf;

use classify::classify::{Node, NodeKind, Result};
use tracing::info;

use crate::cmd::util::{emit_json, load_document};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	#[arg(long)]
	pub json: bool,
}

/// Print document-level size and node statistics.
pub fn run(args: Args) -> Result<()> {
	let Args { path, json } = args;

	let doc = load_document(&path)?;
	let root_tag = doc.root.wire_data_type()?.label();
	let stats = NodeStats::collect(&doc.root);
	info!(nodes = stats.nodes, depth = stats.max_depth, "scanned document");

	if json {
		let payload = InfoJson {
			path: path.display().to_string(),
			compression: doc.compression.as_str().to_owned(),
			file_size: doc.file_size,
			decoded_size: doc.decoded_size,
			root_tag: root_tag.to_owned(),
			root_type: doc.root.type_spec.as_ref().map(|spec| spec.name.clone()),
			nodes: stats.nodes,
			max_depth: stats.max_depth,
			ref_ids: stats.ref_ids,
			refs: stats.refs,
			type_specs: stats.type_specs,
			kinds: stats.kinds.iter().map(|(kind, count)| KindCountJson { kind: *kind, count: *count }).collect(),
		};
		emit_json(&payload);
		return Ok(());
	}

	println!("path: {}", path.display());
	println!("compression: {}", doc.compression.as_str());
	println!("file_size: {}", doc.file_size);
	println!("decoded_size: {}", doc.decoded_size);
	println!("root_tag: {root_tag}");
	if let Some(spec) = &doc.root.type_spec {
		println!("root_type: {}", spec.name);
	}
	println!("nodes: {}", stats.nodes);
	println!("max_depth: {}", stats.max_depth);
	println!("ref_ids: {}", stats.ref_ids);
	println!("refs: {}", stats.refs);
	println!("type_specs: {}", stats.type_specs);

	println!("kinds:");
	for (kind, count) in &stats.kinds {
		println!("  {kind}: {count}");
	}

	Ok(())
}

#[derive(Debug, Default)]
struct NodeStats {
	nodes: usize,
	max_depth: usize,
	ref_ids: usize,
	refs: usize,
	type_specs: usize,
	kinds: BTreeMap<&'static str, usize>,
}

impl NodeStats {
	fn collect(root: &Node) -> Self {
		let mut stats = Self::default();
		let mut stack = vec![(root, 1_usize)];

		while let Some((node, depth)) = stack.pop() {
			stats.nodes += 1;
			stats.max_depth = stats.max_depth.max(depth);
			if node.ref_id.is_some() {
				stats.ref_ids += 1;
			}
			if node.type_spec.is_some() {
				stats.type_specs += 1;
			}

			let label = match node.data_type() {
				Ok(data_type) => data_type.label(),
				Err(_) => node.kind_label(),
			};
			*stats.kinds.entry(label).or_default() += 1;

			match &node.kind {
				NodeKind::Value(_) => {}
				NodeKind::Ref(_) => stats.refs += 1,
				NodeKind::KeyValuePair(key, value) => {
					stack.push((value, depth + 1));
					stack.push((key, depth + 1));
				}
				NodeKind::List(items) => stack.extend(items.iter().rev().map(|item| (item, depth + 1))),
				NodeKind::Dict(entries) => stack.extend(entries.iter().rev().map(|(_, item)| (item, depth + 1))),
			}
		}

		stats
	}
}

#[derive(serde::Serialize)]
struct KindCountJson {
	kind: &'static str,
	count: usize,
}

#[derive(serde::Serialize)]
struct InfoJson {
	path: String,
	compression: String,
	file_size: u64,
	decoded_size: usize,
	root_tag: String,
	root_type: Option<String>,
	nodes: usize,
	max_depth: usize,
	ref_ids: usize,
	refs: usize,
	type_specs: usize,
	kinds: Vec<KindCountJson>,
}
