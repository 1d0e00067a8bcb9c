use super::expr::Expr;
use crate::common::{BinderInfo, FVarId, Name};

#[derive(Clone, Debug)]
pub struct Binder {
	pub fvar: FVarId,
	pub name: Name,
	pub info: BinderInfo,
	pub ty: Expr,
}

/// A sequence of binders under construction.
///
/// While the scope is being built each binder stands for itself as a fresh free
/// variable; [`Telescope::pi`] and [`Telescope::lambda`] close over all of them.
#[derive(Clone, Default, Debug)]
pub struct Telescope {
	binders: Vec<Binder>,
}

impl Telescope {
	pub fn new() -> Self { Self::default() }

	/// Adds a binder whose type may mention earlier binders, returning the
	/// variable that stands for it.
	pub fn bind(&mut self, name: impl Into<Name>, info: BinderInfo, ty: Expr) -> Expr {
		let fvar = FVarId::fresh();
		self.binders.push(Binder { fvar, name: name.into(), info, ty });
		Expr::fvar(fvar)
	}

	/// Appends the binders of `other`, keeping their variables.
	pub fn extend(&mut self, other: &Self) { self.binders.extend(other.binders.iter().cloned()) }

	pub fn len(&self) -> usize { self.binders.len() }

	pub fn is_empty(&self) -> bool { self.binders.is_empty() }

	pub fn binders(&self) -> &[Binder] { &self.binders }

	pub fn fvars(&self) -> Vec<Expr> { self.binders.iter().map(|binder| Expr::fvar(binder.fvar)).collect() }

	pub fn pi(&self, body: Expr) -> Expr { self.close(body, |name, info, ty, body| Expr::pi(name, info, ty, body)) }

	pub fn lambda(&self, body: Expr) -> Expr {
		self.close(body, |name, info, ty, body| Expr::lam(name, info, ty, body))
	}

	fn close(&self, body: Expr, binder: impl Fn(Name, BinderInfo, Expr, Expr) -> Expr) -> Expr {
		let ids: Vec<FVarId> = self.binders.iter().map(|binder| binder.fvar).collect();
		let mut result = body.abstract_fvars(&ids);
		for (i, b) in self.binders.iter().enumerate().rev() {
			result = binder(b.name, b.info, b.ty.abstract_fvars(&ids[..i]), result);
		}
		result
	}
}
