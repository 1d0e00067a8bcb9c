use hashbrown::HashMap;

use super::expr::Expr;
use crate::common::{BinderInfo, FVarId, Name};

#[derive(Clone, Debug)]
pub struct LocalDecl {
	pub fvar: FVarId,
	pub name: Name,
	pub info: BinderInfo,
	pub ty: Expr,
	/// The definition of a let-bound local.
	pub value: Option<Expr>,
}

/// The free variables in scope, in order of introduction.
#[derive(Clone, Default, Debug)]
pub struct LocalContext {
	decls: HashMap<FVarId, LocalDecl>,
	order: Vec<FVarId>,
}

impl LocalContext {
	pub fn new() -> Self { Self::default() }

	pub fn len(&self) -> usize { self.order.len() }

	pub fn is_empty(&self) -> bool { self.order.is_empty() }

	pub fn push(&mut self, decl: LocalDecl) {
		self.order.push(decl.fvar);
		self.decls.insert(decl.fvar, decl);
	}

	pub fn find(&self, fvar: FVarId) -> Option<&LocalDecl> { self.decls.get(&fvar) }

	pub fn position(&self, fvar: FVarId) -> Option<usize> { self.order.iter().position(|other| *other == fvar) }

	/// Drops every local introduced after the first `len`.
	pub fn truncate(&mut self, len: usize) {
		for fvar in self.order.drain(len.min(self.order.len())..) {
			self.decls.remove(&fvar);
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = &LocalDecl> { self.order.iter().filter_map(|fvar| self.decls.get(fvar)) }
}
