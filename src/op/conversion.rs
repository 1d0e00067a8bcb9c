use std::rc::Rc;

use super::meta::{MetaCtx, MetaError};
use crate::{
	common::MVarId,
	ir::{expr::Expr, level::Level},
};

impl MetaCtx<'_> {
	/// Decides whether two terms are definitionally equal, assigning
	/// metavariables of the current depth as needed.
	pub fn is_def_eq(&mut self, left: &Expr, right: &Expr) -> Result<bool, MetaError> {
		self.tick()?;
		if left == right {
			return Ok(true);
		}
		let left = self.instantiate_mvars(left);
		let right = self.instantiate_mvars(right);
		if let Some(result) = self.quick_is_def_eq(&left, &right)? {
			return Ok(result);
		}
		if let Some(result) = self.assign_if_possible(&left, &right)? {
			return Ok(result);
		}

		let mut left = self.whnf_core(&left)?;
		let mut right = self.whnf_core(&right)?;
		if let Some(result) = self.quick_is_def_eq(&left, &right)? {
			return Ok(result);
		}
		if self.config.proof_irrelevance {
			if let Some(result) = self.is_def_eq_proof_irrel(&left, &right)? {
				return Ok(result);
			}
		}

		// Lazy delta: unfold the side with the greater height first.
		loop {
			match (self.delta_height(&left), self.delta_height(&right)) {
				(None, None) => break,
				(Some(_), None) => left = self.unfold_and_reduce(&left)?,
				(None, Some(_)) => right = self.unfold_and_reduce(&right)?,
				(Some(l), Some(r)) => {
					if left.get_app_fn() == right.get_app_fn() && self.speculate(|ctx| ctx.is_def_eq_args(&left, &right))? {
						return Ok(true);
					}
					if l >= r {
						left = self.unfold_and_reduce(&left)?;
					}
					if r >= l {
						right = self.unfold_and_reduce(&right)?;
					}
				}
			}
			if left == right {
				return Ok(true);
			}
			if let Some(result) = self.quick_is_def_eq(&left, &right)? {
				return Ok(result);
			}
		}

		if self.is_def_eq_spine(&left, &right)? {
			return Ok(true);
		}
		Ok(self.is_def_eq_eta_struct(&left, &right)? || self.is_def_eq_eta_struct(&right, &left)?)
	}

	fn unfold_and_reduce(&mut self, e: &Expr) -> Result<Expr, MetaError> {
		match self.unfold_definition(e)? {
			Some(unfolded) => self.whnf_core(&unfolded),
			None => Ok(e.clone()),
		}
	}

	/// Runs `f`, rolling back metavariable assignments if it fails.
	fn speculate(&mut self, f: impl FnOnce(&mut Self) -> Result<bool, MetaError>) -> Result<bool, MetaError> {
		let saved = self.mctx.clone();
		let result = f(self)?;
		if !result {
			self.mctx = saved;
		}
		Ok(result)
	}

	fn quick_is_def_eq(&mut self, left: &Expr, right: &Expr) -> Result<Option<bool>, MetaError> {
		Ok(Some(match (left, right) {
			_ if left == right => true,
			(Expr::Sort(l), Expr::Sort(r)) => self.is_level_def_eq(l, r),
			(Expr::Lam { .. }, Expr::Lam { .. }) | (Expr::Pi { .. }, Expr::Pi { .. }) =>
				self.is_def_eq_binding(left, right)?,
			(Expr::Lit(l), Expr::Lit(r)) => l == r,
			(Expr::Lam { name, info, domain, .. }, other) | (other, Expr::Lam { name, info, domain, .. })
				if !matches!(other, Expr::MVar(_)) =>
			{
				// Lambda eta: `f` is `fun x => f x`.
				let expanded = Expr::Lam {
					name: *name,
					info: *info,
					domain: Rc::clone(domain),
					body: Rc::new(Expr::app(other.lift_loose_bvars(0, 1), Expr::bvar(0))),
				};
				let lambda = if matches!(left, Expr::Lam { .. }) { left } else { right };
				self.is_def_eq_binding(lambda, &expanded)?
			}
			_ => return Ok(None),
		}))
	}

	fn is_def_eq_binding(&mut self, left: &Expr, right: &Expr) -> Result<bool, MetaError> {
		let mut scope = self.scoped();
		let mut fvars = Vec::new();
		let (mut left, mut right) = (left.clone(), right.clone());
		loop {
			let (name, info, left_domain, right_domain, left_body, right_body) = match (&left, &right) {
				(
					Expr::Lam { name, info, domain: l_domain, body: l_body },
					Expr::Lam { domain: r_domain, body: r_body, .. },
				)
				| (
					Expr::Pi { name, info, domain: l_domain, body: l_body },
					Expr::Pi { domain: r_domain, body: r_body, .. },
				) => (*name, *info, l_domain.clone(), r_domain.clone(), l_body.clone(), r_body.clone()),
				_ => break,
			};
			let left_domain = left_domain.instantiate_rev(&fvars);
			if !scope.is_def_eq(&left_domain, &right_domain.instantiate_rev(&fvars))? {
				return Ok(false);
			}
			fvars.push(scope.push_local(name, info, left_domain));
			left = left_body.as_ref().clone();
			right = right_body.as_ref().clone();
		}
		scope.is_def_eq(&left.instantiate_rev(&fvars), &right.instantiate_rev(&fvars))
	}

	fn assign_if_possible(&mut self, left: &Expr, right: &Expr) -> Result<Option<bool>, MetaError> {
		match (left, right) {
			(Expr::MVar(mvar), value) | (value, Expr::MVar(mvar)) if self.mctx.is_assignable(*mvar) =>
				self.assign_checked(*mvar, value).map(Some),
			_ => Ok(None),
		}
	}

	fn assign_checked(&mut self, mvar: MVarId, value: &Expr) -> Result<bool, MetaError> {
		if value.occurs_mvar(mvar) || !self.is_in_mvar_scope(mvar, value) {
			return Ok(false);
		}
		let expected = match self.mctx.find_decl(mvar) {
			Some(decl) => decl.ty.clone(),
			None => return Err(MetaError::UnknownMVar(mvar)),
		};
		let found = self.infer_type(value)?;
		if !self.is_def_eq(&expected, &found)? {
			return Ok(false);
		}
		self.mctx.assign(mvar, value.clone());
		Ok(true)
	}

	pub fn is_level_def_eq(&mut self, left: &Level, right: &Level) -> bool {
		let left = self.mctx.instantiate_level(left);
		let right = self.mctx.instantiate_level(right);
		if left.is_equiv(&right) {
			return true;
		}
		match (&left, &right) {
			(Level::MVar(mvar), level) | (level, Level::MVar(mvar))
				if self.mctx.is_level_assignable(*mvar) && !level.occurs(*mvar) =>
			{
				self.mctx.assign_level(*mvar, level.clone());
				true
			}
			_ => false,
		}
	}

	fn is_levels_def_eq(&mut self, left: &[Level], right: &[Level]) -> bool {
		left.len() == right.len() && left.iter().zip(right).all(|(l, r)| self.is_level_def_eq(l, r))
	}

	fn is_def_eq_proof_irrel(&mut self, left: &Expr, right: &Expr) -> Result<Option<bool>, MetaError> {
		let left_ty = self.infer_type(left)?;
		if !self.is_prop(&left_ty)? {
			return Ok(None);
		}
		let right_ty = self.infer_type(right)?;
		self.is_def_eq(&left_ty, &right_ty).map(Some)
	}

	fn is_def_eq_args(&mut self, left: &Expr, right: &Expr) -> Result<bool, MetaError> {
		let (left_args, right_args) = (left.get_app_args(), right.get_app_args());
		if left_args.len() != right_args.len() {
			return Ok(false);
		}
		for (l, r) in left_args.into_iter().zip(right_args) {
			if !self.is_def_eq(l, r)? {
				return Ok(false);
			}
		}
		Ok(true)
	}

	/// Compares terms in weak head normal form by head and arguments.
	fn is_def_eq_spine(&mut self, left: &Expr, right: &Expr) -> Result<bool, MetaError> {
		match (left, right) {
			(Expr::FVar(l), Expr::FVar(r)) => Ok(l == r),
			(Expr::Const(l, l_levels), Expr::Const(r, r_levels)) => Ok(l == r && self.is_levels_def_eq(l_levels, r_levels)),
			(Expr::App(..), Expr::App(..)) => {
				let (left_fn, right_fn) = (left.get_app_fn(), right.get_app_fn());
				if left.get_app_num_args() != right.get_app_num_args() {
					return Ok(false);
				}
				self.speculate(|ctx| Ok(ctx.is_def_eq(left_fn, right_fn)? && ctx.is_def_eq_args(left, right)?))
			}
			(
				Expr::Proj { structure: l_structure, index: l_index, scrutinee: l_scrutinee },
				Expr::Proj { structure: r_structure, index: r_index, scrutinee: r_scrutinee },
			) if l_structure == r_structure && l_index == r_index => self.is_def_eq(l_scrutinee, r_scrutinee),
			_ => Ok(false),
		}
	}

	/// Structure eta: `right` is a constructor application whose fields are the
	/// corresponding projections of `left`.
	fn is_def_eq_eta_struct(&mut self, left: &Expr, right: &Expr) -> Result<bool, MetaError> {
		let Some(ctor_name) = right.get_app_fn().const_name() else {
			return Ok(false);
		};
		let Some(ctor) = self.env.find_constructor(ctor_name) else {
			return Ok(false);
		};
		let (structure, num_params, num_fields) = (ctor.induct, ctor.num_params as usize, ctor.num_fields as usize);
		if self.is_constructor_app(left)
			|| !self.env.is_structure_like(structure)
			|| !self.use_eta_struct(structure)
			|| right.get_app_num_args() != num_params + num_fields
		{
			return Ok(false);
		}
		let (left_ty, right_ty) = (self.infer_type(left)?, self.infer_type(right)?);
		if !self.is_def_eq(&left_ty, &right_ty)? {
			return Ok(false);
		}
		let arguments = right.get_app_args();
		for (i, field) in arguments[num_params..].iter().enumerate() {
			let projection = Expr::proj(structure, i as u32, left.clone());
			if !self.is_def_eq(&projection, field)? {
				return Ok(false);
			}
		}
		Ok(true)
	}
}
