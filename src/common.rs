use std::{
	fmt,
	sync::{
		atomic::{AtomicU64, Ordering},
		OnceLock,
	},
};

use lasso::{Spur, ThreadedRodeo};

static INTERNER: OnceLock<ThreadedRodeo> = OnceLock::new();

fn interner() -> &'static ThreadedRodeo { INTERNER.get_or_init(ThreadedRodeo::default) }

/// A hierarchical dotted name such as `Prod.fst`, interned process-wide.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(Spur);

impl Name {
	pub fn new(name: &str) -> Self { Self(interner().get_or_intern(name)) }

	pub fn as_str(self) -> &'static str { interner().resolve(&self.0) }

	/// Appends a component: `Prod` and `fst` give `Prod.fst`.
	pub fn str(self, component: &str) -> Self { Self::new(&format!("{}.{}", self.as_str(), component)) }
}

impl PartialOrd for Name {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

// Ordered by spelling so that normal forms do not depend on interning order.
impl Ord for Name {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering { self.as_str().cmp(other.as_str()) }
}

impl From<&str> for Name {
	fn from(value: &str) -> Self { Self::new(value) }
}

impl fmt::Display for Name {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl fmt::Debug for Name {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "`{}", self.as_str()) }
}

/// How a binder is supplied at application sites.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum BinderInfo {
	#[default]
	Default,
	Implicit,
	StrictImplicit,
	InstImplicit,
}

impl BinderInfo {
	pub fn is_explicit(self) -> bool { self == Self::Default }

	pub fn is_inst_implicit(self) -> bool { self == Self::InstImplicit }
}

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn fresh_id() -> u64 { NEXT_ID.fetch_add(1, Ordering::Relaxed) }

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FVarId(pub u64);

impl FVarId {
	pub fn fresh() -> Self { Self(fresh_id()) }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MVarId(pub u64);

impl MVarId {
	pub fn fresh() -> Self { Self(fresh_id()) }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LevelMVarId(pub u64);

impl LevelMVarId {
	pub fn fresh() -> Self { Self(fresh_id()) }
}
