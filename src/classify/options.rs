use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use crate::classify::Result;
use crate::classify::node::Node;
use crate::classify::schema::Ty;
use crate::classify::value::Value;

/// Value conversion used by a type substitution.
pub type Convert = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Node rewrite run around an object type.
pub type NodeHook = Arc<dyn Fn(&mut Node) + Send + Sync>;

const DEFAULT_ROOT_NAME: &str = "root";

static GLOBAL: OnceLock<ClassifyOptions> = OnceLock::new();

/// Stand-in type used on the wire for a registered real type.
#[derive(Clone)]
pub struct Substitution {
	/// Type the value is classified as.
	pub ty: Ty,
	/// Real value to substitute value.
	pub to_substitute: Convert,
	/// Substitute value back to the real value.
	pub from_substitute: Convert,
}

/// Per-call behavior overrides, keyed by full object type name.
///
/// Clones share the registered functions.
#[derive(Clone)]
pub struct ClassifyOptions {
	substitutions: HashMap<String, Substitution>,
	after_classify: HashMap<String, NodeHook>,
	before_declassify: HashMap<String, NodeHook>,
	/// Directory holding follow-by-id side documents.
	pub follow_id_base: Option<PathBuf>,
	/// Label of the synthetic root element in inspection output.
	pub root_name: String,
}

impl Default for ClassifyOptions {
	fn default() -> Self {
		Self {
			substitutions: HashMap::new(),
			after_classify: HashMap::new(),
			before_declassify: HashMap::new(),
			follow_id_base: None,
			root_name: DEFAULT_ROOT_NAME.to_owned(),
		}
	}
}

impl ClassifyOptions {
	/// Defaults plus a follow-by-id base directory.
	pub fn with_follow_id_base(base: impl Into<PathBuf>) -> Self {
		Self {
			follow_id_base: Some(base.into()),
			..Self::default()
		}
	}

	/// Process-wide defaults.
	///
	/// Fixed by the first call to this function or [`ClassifyOptions::install_global`]; read-only
	/// afterwards.
	pub fn global() -> &'static ClassifyOptions {
		GLOBAL.get_or_init(ClassifyOptions::default)
	}

	/// Fix the process-wide defaults. Hands `self` back when they were already fixed.
	pub fn install_global(self) -> std::result::Result<(), ClassifyOptions> {
		GLOBAL.set(self)
	}

	/// Classify values of `real` as `ty`, converting with `to` and back with `from`.
	pub fn substitute(
		&mut self,
		real: impl Into<String>,
		ty: Ty,
		to: impl Fn(&Value) -> Result<Value> + Send + Sync + 'static,
		from: impl Fn(&Value) -> Result<Value> + Send + Sync + 'static,
	) -> &mut Self {
		self.substitutions.insert(
			real.into(),
			Substitution {
				ty,
				to_substitute: Arc::new(to),
				from_substitute: Arc::new(from),
			},
		);
		self
	}

	/// Rewrite the finished node of every `type_name` value.
	pub fn after_classify(&mut self, type_name: impl Into<String>, hook: impl Fn(&mut Node) + Send + Sync + 'static) -> &mut Self {
		self.after_classify.insert(type_name.into(), Arc::new(hook));
		self
	}

	/// Rewrite a copy of the node before it is read as `type_name`.
	pub fn before_declassify(&mut self, type_name: impl Into<String>, hook: impl Fn(&mut Node) + Send + Sync + 'static) -> &mut Self {
		self.before_declassify.insert(type_name.into(), Arc::new(hook));
		self
	}

	/// Substitution registered for a declared type.
	pub fn substitution(&self, ty: &Ty) -> Option<&Substitution> {
		self.lookup(&self.substitutions, ty)
	}

	/// Post-classify hook registered for a declared type.
	pub fn after_classify_hook(&self, ty: &Ty) -> Option<&NodeHook> {
		self.lookup(&self.after_classify, ty)
	}

	/// Pre-declassify hook registered for a declared type.
	pub fn before_declassify_hook(&self, ty: &Ty) -> Option<&NodeHook> {
		self.lookup(&self.before_declassify, ty)
	}

	fn lookup<'a, T>(&self, table: &'a HashMap<String, T>, ty: &Ty) -> Option<&'a T> {
		if table.is_empty() {
			return None;
		}
		table.get(ty.object_name()?)
	}
}
