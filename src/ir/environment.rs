use hashbrown::{HashMap, HashSet};

use super::{
	declaration::{
		ConstantInfo, ConstructorVal, InductiveVal, ProjectionInfo, RecursorVal, ReducibilityStatus, StructureInfo,
	},
	expr::Expr,
};
use crate::common::Name;

/// The global declaration store.
///
/// Every successful mutation bumps [`Environment::version`]. Declarations are only
/// added through `add_decl` and `add_inductive`, which check them first.
#[derive(Clone, Default, Debug)]
pub struct Environment {
	constants: HashMap<Name, ConstantInfo>,
	reducibility: HashMap<Name, ReducibilityStatus>,
	projections: HashMap<Name, ProjectionInfo>,
	structures: HashMap<Name, StructureInfo>,
	classes: HashSet<Name>,
	version: u64,
}

impl Environment {
	pub fn new() -> Self { Self::default() }

	pub fn version(&self) -> u64 { self.version }

	pub fn find(&self, name: Name) -> Option<&ConstantInfo> { self.constants.get(&name) }

	pub fn contains(&self, name: Name) -> bool { self.constants.contains_key(&name) }

	pub(crate) fn insert(&mut self, info: ConstantInfo) {
		self.constants.insert(info.name(), info);
		self.version += 1;
	}

	/// Undoes a provisional `insert`, restoring the version from before it.
	pub(crate) fn retract(&mut self, name: Name, version: u64) {
		self.constants.remove(&name);
		self.version = version;
	}

	pub fn find_inductive(&self, name: Name) -> Option<&InductiveVal> {
		match self.find(name)? {
			ConstantInfo::Inductive(info) => Some(info),
			_ => None,
		}
	}

	pub fn find_constructor(&self, name: Name) -> Option<&ConstructorVal> {
		match self.find(name)? {
			ConstantInfo::Constructor(info) => Some(info),
			_ => None,
		}
	}

	pub fn find_recursor(&self, name: Name) -> Option<&RecursorVal> {
		match self.find(name)? {
			ConstantInfo::Recursor(info) => Some(info),
			_ => None,
		}
	}

	pub fn set_reducibility(&mut self, name: Name, status: ReducibilityStatus) {
		self.reducibility.insert(name, status);
		self.version += 1;
	}

	pub fn reducibility(&self, name: Name) -> ReducibilityStatus {
		self.reducibility.get(&name).copied().unwrap_or_default()
	}

	/// Records projection metadata. Entries are immutable once registered.
	pub fn register_projection(&mut self, info: ProjectionInfo) {
		if !self.projections.contains_key(&info.name) {
			self.projections.insert(info.name, info);
			self.version += 1;
		}
	}

	pub fn projection_info(&self, name: Name) -> Option<&ProjectionInfo> { self.projections.get(&name) }

	pub fn add_class(&mut self, name: Name) {
		if self.classes.insert(name) {
			self.version += 1;
		}
	}

	pub fn is_class(&self, name: Name) -> bool { self.classes.contains(&name) }

	pub fn register_structure(&mut self, info: StructureInfo) {
		self.structures.insert(info.name, info);
		self.version += 1;
	}

	pub fn structure_info(&self, name: Name) -> Option<&StructureInfo> { self.structures.get(&name) }

	/// A non-recursive, non-indexed inductive with exactly one constructor.
	pub fn is_structure_like(&self, name: Name) -> bool {
		self.find_inductive(name)
			.is_some_and(|info| info.ctors.len() == 1 && info.num_indices == 0 && !info.is_rec)
	}

	pub fn is_unsafe_const(&self, name: Name) -> bool { self.find(name).is_some_and(ConstantInfo::is_unsafe) }

	/// Whether `e` mentions an unsafe constant.
	pub fn has_unsafe(&self, e: &Expr) -> bool {
		e.any(|e, _| matches!(e, Expr::Const(name, _) if self.is_unsafe_const(*name)))
	}
}
