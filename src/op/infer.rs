use std::rc::Rc;

use super::meta::{MetaCtx, MetaError};
use crate::{
	common::Name,
	ir::{
		expr::{Expr, Literal},
		level::Level,
	},
};

impl MetaCtx<'_> {
	/// Infers the type of a well-formed term without checking it.
	pub fn infer_type(&mut self, e: &Expr) -> Result<Expr, MetaError> { self.infer(e, false) }

	/// Infers the type of a term, checking argument types and binder domains.
	pub fn check(&mut self, e: &Expr) -> Result<Expr, MetaError> { self.infer(e, true) }

	fn infer(&mut self, e: &Expr, check: bool) -> Result<Expr, MetaError> {
		self.tick()?;
		match e {
			Expr::BVar(index) => Err(MetaError::LooseBVar(*index)),
			Expr::FVar(fvar) => Ok(self.find_local(*fvar)?.ty.clone()),
			Expr::MVar(mvar) => match self.mctx.find_decl(*mvar) {
				Some(decl) => Ok(decl.ty.clone()),
				None => Err(MetaError::UnknownMVar(*mvar)),
			},
			Expr::Sort(level) => Ok(Expr::sort(Level::succ(level.clone()))),
			Expr::Const(name, levels) => {
				let info = self.env.find(*name).ok_or(MetaError::UnknownConstant(*name))?;
				let params = info.level_params();
				if params.len() != levels.len() {
					return Err(MetaError::UniverseArity { name: *name, expected: params.len(), found: levels.len() });
				}
				Ok(info.ty().instantiate_level_params(params, levels))
			}
			Expr::App(..) => self.infer_app(e, check),
			Expr::Lam { .. } => self.infer_lambda(e, check),
			Expr::Pi { .. } => self.infer_pi(e, check),
			Expr::Let { name, ty, value, body } => {
				if check {
					self.infer_sort(ty, true)?;
					let found = self.check(value)?;
					if !self.is_def_eq(&found, ty)? {
						return Err(MetaError::LetTypeMismatch {
							value: value.as_ref().clone(),
							expected: ty.as_ref().clone(),
							found,
						});
					}
				}
				let mut scope = self.scoped();
				let local = scope.push_let(*name, Default::default(), ty.as_ref().clone(), value.as_ref().clone());
				let body_ty = scope.infer(&body.instantiate(&local), check)?;
				scope.mk_lambda(&[local], &body_ty).map(|closed| match closed {
					Expr::Let { value, body, .. } => body.instantiate(&value),
					other => other,
				})
			}
			Expr::Lit(Literal::Nat(_)) => Ok(Expr::const_("Nat", [])),
			Expr::Lit(Literal::Str(_)) => Ok(Expr::const_("String", [])),
			Expr::Proj { structure, index, scrutinee } => self.infer_proj(e, *structure, *index, scrutinee, check),
		}
	}

	fn infer_app(&mut self, e: &Expr, check: bool) -> Result<Expr, MetaError> {
		let mut ty = self.infer(e.get_app_fn(), check)?;
		for argument in e.get_app_args() {
			let (domain, body) = self.whnf_to_pi(&ty)?;
			if check {
				let found = self.check(argument)?;
				if !self.is_def_eq(&found, &domain)? {
					return Err(MetaError::AppTypeMismatch {
						argument: argument.clone(),
						expected: domain.as_ref().clone(),
						found,
					});
				}
			}
			ty = body.instantiate(argument);
		}
		Ok(ty)
	}

	fn infer_lambda(&mut self, e: &Expr, check: bool) -> Result<Expr, MetaError> {
		let mut scope = self.scoped();
		let mut fvars = Vec::new();
		let mut current = e.clone();
		while let Expr::Lam { name, info, domain, body } = &current {
			let (name, info, body) = (*name, *info, body.clone());
			let domain = domain.instantiate_rev(&fvars);
			if check {
				scope.infer_sort(&domain, true)?;
			}
			fvars.push(scope.push_local(name, info, domain));
			current = body.as_ref().clone();
		}
		let body_ty = scope.infer(&current.instantiate_rev(&fvars), check)?;
		scope.mk_pi(&fvars, &body_ty)
	}

	fn infer_pi(&mut self, e: &Expr, check: bool) -> Result<Expr, MetaError> {
		let mut scope = self.scoped();
		let mut fvars = Vec::new();
		let mut levels = Vec::new();
		let mut current = e.clone();
		while let Expr::Pi { name, info, domain, body } = &current {
			let (name, info, body) = (*name, *info, body.clone());
			let domain = domain.instantiate_rev(&fvars);
			levels.push(scope.infer_sort(&domain, check)?);
			fvars.push(scope.push_local(name, info, domain));
			current = body.as_ref().clone();
		}
		let level = scope.infer_sort(&current.instantiate_rev(&fvars), check)?;
		Ok(Expr::sort(levels.into_iter().rev().fold(level, |body, domain| Level::imax(domain, body))))
	}

	fn infer_proj(
		&mut self,
		e: &Expr,
		structure: Name,
		index: u32,
		scrutinee: &Expr,
		check: bool,
	) -> Result<Expr, MetaError> {
		let invalid = || MetaError::InvalidProjection(e.clone());
		let scrutinee_ty = self.infer(scrutinee, check)?;
		let scrutinee_ty = self.whnf(&scrutinee_ty)?;
		let Expr::Const(head, levels) = scrutinee_ty.get_app_fn() else {
			return Err(invalid());
		};
		if *head != structure || !self.env.is_structure_like(structure) {
			return Err(invalid());
		}
		let inductive = self.env.find_inductive(structure).ok_or_else(invalid)?;
		let ctor = self.env.find_constructor(inductive.ctors[0]).ok_or_else(invalid)?;
		let params = scrutinee_ty.get_app_args();
		if params.len() != ctor.num_params as usize || index >= ctor.num_fields {
			return Err(invalid());
		}

		let mut ty = ctor.val.ty.instantiate_level_params(&ctor.val.level_params, levels);
		for param in params {
			let (_, body) = self.whnf_to_pi(&ty)?;
			ty = body.instantiate(param);
		}
		for i in 0..index {
			let (_, body) = self.whnf_to_pi(&ty)?;
			ty = body.instantiate(&Expr::proj(structure, i, scrutinee.clone()));
		}
		let (domain, _) = self.whnf_to_pi(&ty)?;
		Ok(domain.as_ref().clone())
	}

	/// The universe of a type.
	pub fn infer_sort(&mut self, ty: &Expr, check: bool) -> Result<Level, MetaError> {
		let sort = self.infer(ty, check)?;
		match self.whnf(&sort)? {
			Expr::Sort(level) => Ok(level),
			_ => Err(MetaError::TypeExpected(ty.clone())),
		}
	}

	pub(crate) fn whnf_to_pi(&mut self, ty: &Expr) -> Result<(Rc<Expr>, Rc<Expr>), MetaError> {
		if let Expr::Pi { domain, body, .. } = ty {
			return Ok((domain.clone(), body.clone()));
		}
		match self.whnf(ty)? {
			Expr::Pi { domain, body, .. } => Ok((domain, body)),
			other => Err(MetaError::FunctionExpected(other)),
		}
	}

	/// Whether `ty` is a proposition, i.e. its type is `Prop`.
	pub fn is_prop(&mut self, ty: &Expr) -> Result<bool, MetaError> {
		let sort = self.infer_type(ty)?;
		Ok(match self.whnf(&sort)? {
			Expr::Sort(level) => self.mctx.instantiate_level(&level).normalize().is_zero(),
			_ => false,
		})
	}

	pub fn is_proof(&mut self, e: &Expr) -> Result<bool, MetaError> {
		let ty = self.infer_type(e)?;
		self.is_prop(&ty)
	}

	/// Whether `ty` has the shape `(xs : As) → Prop`.
	pub fn is_prop_former_type(&mut self, ty: &Expr) -> Result<bool, MetaError> {
		let mut scope = self.scoped();
		let mut current = scope.whnf(ty)?;
		loop {
			match current {
				Expr::Sort(level) => return Ok(scope.mctx.instantiate_level(&level).normalize().is_zero()),
				Expr::Pi { name, info, domain, body } => {
					let local = scope.push_local(name, info, domain.as_ref().clone());
					current = scope.whnf(&body.instantiate(&local))?;
				}
				_ => return Ok(false),
			}
		}
	}
}
