use super::meta::{MetaCtx, MetaError};
use crate::{
	common::Name,
	ir::{
		declaration::{ConstantInfo, ReducibilityStatus},
		expr::Expr,
	},
	utility::rc,
};

impl MetaCtx<'_> {
	/// Reduces a term to weak head normal form, unfolding definitions that are
	/// not irreducible.
	pub fn whnf(&mut self, e: &Expr) -> Result<Expr, MetaError> {
		let mut e = self.whnf_core(e)?;
		loop {
			self.tick()?;
			match self.unfold_definition(&e)? {
				Some(unfolded) => e = self.whnf_core(&unfolded)?,
				None => return Ok(e),
			}
		}
	}

	/// Beta, zeta, projection and iota reduction, without delta.
	pub fn whnf_core(&mut self, e: &Expr) -> Result<Expr, MetaError> {
		self.tick()?;
		match e {
			Expr::BVar(_) | Expr::Sort(_) | Expr::Const(..) | Expr::Lam { .. } | Expr::Pi { .. } | Expr::Lit(_) =>
				Ok(e.clone()),
			Expr::MVar(mvar) => {
				let value = self.mctx.assignment(*mvar).cloned();
				match value {
					Some(value) => self.whnf_core(&value),
					None => Ok(e.clone()),
				}
			}
			Expr::FVar(fvar) => {
				let value = self.find_local(*fvar)?.value.clone();
				match value {
					Some(value) => self.whnf_core(&value),
					None => Ok(e.clone()),
				}
			}
			Expr::Let { value, body, .. } => self.whnf_core(&body.instantiate(value)),
			Expr::App(..) => {
				let head = e.get_app_fn();
				let reduced_head = self.whnf_core(head)?;
				let arguments: Vec<Expr> = e.get_app_args().into_iter().cloned().collect();
				if let Expr::Lam { .. } = reduced_head {
					return self.whnf_core(&reduced_head.beta(&arguments));
				}
				let e = if reduced_head == *head { e.clone() } else { Expr::app_n(reduced_head, arguments) };
				match self.reduce_recursor(&e)? {
					Some(reduced) => self.whnf_core(&reduced),
					None => Ok(e),
				}
			}
			Expr::Proj { structure, index, scrutinee } => {
				let scrutinee = self.whnf(scrutinee)?;
				match self.project_constructor(&scrutinee, *index) {
					Some(field) => self.whnf_core(&field),
					None => Ok(Expr::Proj { structure: *structure, index: *index, scrutinee: rc!(scrutinee) }),
				}
			}
		}
	}

	/// The definition a constant application unfolds to, unless it is irreducible.
	pub fn unfold_definition(&mut self, e: &Expr) -> Result<Option<Expr>, MetaError> {
		let Expr::Const(name, levels) = e.get_app_fn() else {
			return Ok(None);
		};
		if self.env.reducibility(*name) == ReducibilityStatus::Irreducible {
			return Ok(None);
		}
		let Some(ConstantInfo::Definition(info)) = self.env.find(*name) else {
			return Ok(None);
		};
		if info.val.level_params.len() != levels.len() {
			return Err(MetaError::UniverseArity {
				name: *name,
				expected: info.val.level_params.len(),
				found: levels.len(),
			});
		}
		let value = info.value.instantiate_level_params(&info.val.level_params, levels);
		let arguments: Vec<Expr> = e.get_app_args().into_iter().cloned().collect();
		Ok(Some(value.beta(&arguments)))
	}

	/// The height of the unfoldable definition at the head of `e`, if there is one.
	pub(crate) fn delta_height(&self, e: &Expr) -> Option<u32> {
		let name = e.get_app_fn().const_name()?;
		if self.env.reducibility(name) == ReducibilityStatus::Irreducible {
			return None;
		}
		match self.env.find(name)? {
			ConstantInfo::Definition(info) => Some(info.hints.height()),
			_ => None,
		}
	}

	pub fn is_constructor_app(&self, e: &Expr) -> bool {
		e.get_app_fn().const_name().is_some_and(|name| self.env.find_constructor(name).is_some())
	}

	fn project_constructor(&self, e: &Expr, index: u32) -> Option<Expr> {
		let ctor = self.env.find_constructor(e.get_app_fn().const_name()?)?;
		let arguments = e.get_app_args();
		if arguments.len() != (ctor.num_params + ctor.num_fields) as usize {
			return None;
		}
		arguments.get((ctor.num_params + index) as usize).map(|field| (*field).clone())
	}

	fn reduce_recursor(&mut self, e: &Expr) -> Result<Option<Expr>, MetaError> {
		let Expr::Const(name, levels) = e.get_app_fn() else {
			return Ok(None);
		};
		let Some(recursor) = self.env.find_recursor(*name).cloned() else {
			return Ok(None);
		};
		let arguments: Vec<Expr> = e.get_app_args().into_iter().cloned().collect();
		let major_index = recursor.major_index();
		let Some(major) = arguments.get(major_index) else {
			return Ok(None);
		};

		let mut major = self.whnf(major)?;
		if !self.is_constructor_app(&major) {
			match self.expand_structure(&major, recursor.induct)? {
				Some(expanded) => major = expanded,
				None => return Ok(None),
			}
		}
		let ctor = major.get_app_fn().const_name();
		let Some(rule) = recursor.rules.iter().find(|rule| Some(rule.ctor) == ctor) else {
			return Ok(None);
		};
		let fields = major.get_app_args();
		let num_params = recursor.num_params as usize;
		if fields.len() != num_params + rule.num_fields as usize {
			return Ok(None);
		}

		let rhs = rule.rhs.instantiate_level_params(&recursor.val.level_params, levels);
		let rule_arguments: Vec<Expr> =
			arguments[..major_index].iter().cloned().chain(fields[num_params..].iter().map(|field| (*field).clone())).collect();
		Ok(Some(Expr::app_n(rhs.beta(&rule_arguments), arguments[major_index + 1..].iter().cloned())))
	}

	/// Eta-expands a value of a structure type into a constructor application of
	/// its own projections.
	fn expand_structure(&mut self, e: &Expr, structure: Name) -> Result<Option<Expr>, MetaError> {
		if !self.env.is_structure_like(structure) || !self.use_eta_struct(structure) {
			return Ok(None);
		}
		let ty = self.infer_type(e)?;
		let ty = self.whnf(&ty)?;
		let Expr::Const(head, levels) = ty.get_app_fn() else {
			return Ok(None);
		};
		let Some(inductive) = self.env.find_inductive(structure) else {
			return Ok(None);
		};
		let Some(ctor) = self.env.find_constructor(inductive.ctors[0]) else {
			return Ok(None);
		};
		if *head != structure || ty.get_app_num_args() != ctor.num_params as usize {
			return Ok(None);
		}
		let fields = (0..ctor.num_fields).map(|i| Expr::proj(structure, i, e.clone()));
		let arguments = ty.get_app_args().into_iter().cloned().chain(fields);
		Ok(Some(Expr::app_n(Expr::Const(ctor.val.name, levels.clone()), arguments)))
	}
}
