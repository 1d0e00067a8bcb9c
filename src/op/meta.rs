use std::{
	fmt,
	ops::{Deref, DerefMut},
	str::FromStr,
};

use hashbrown::HashMap;
use thiserror::Error;

use crate::{
	common::{BinderInfo, FVarId, LevelMVarId, MVarId, Name},
	ir::{
		environment::Environment,
		expr::Expr,
		level::Level,
		local::{LocalContext, LocalDecl},
	},
};

#[derive(Debug, Error)]
pub enum MetaError {
	#[error("unknown constant `{0}`")]
	UnknownConstant(Name),
	#[error("unknown free variable {0:?}")]
	UnknownFVar(FVarId),
	#[error("unknown metavariable {0:?}")]
	UnknownMVar(MVarId),
	#[error("loose bound variable #{0}")]
	LooseBVar(u32),
	#[error("type expected, found `{0}`")]
	TypeExpected(Expr),
	#[error("function expected, found `{0}`")]
	FunctionExpected(Expr),
	#[error("invalid projection `{0}`")]
	InvalidProjection(Expr),
	#[error("free variable expected, found `{0}`")]
	FVarExpected(Expr),
	#[error("constant `{name}` expects {expected} universe arguments, found {found}")]
	UniverseArity { name: Name, expected: usize, found: usize },
	#[error("application type mismatch: `{argument}` has type `{found}` but is expected to have type `{expected}`")]
	AppTypeMismatch { argument: Expr, expected: Expr, found: Expr },
	#[error("let type mismatch: `{value}` has type `{found}` but is declared with type `{expected}`")]
	LetTypeMismatch { value: Expr, expected: Expr, found: Expr },
	#[error("step limit of {0} exceeded")]
	StepLimitExceeded(u64),
}

/// Which structures structure eta applies to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum EtaStructMode {
	#[default]
	All,
	NotClasses,
	None,
}

impl EtaStructMode {
	pub fn allows(self, env: &Environment, structure: Name) -> bool {
		match self {
			Self::All => true,
			Self::NotClasses => !env.is_class(structure),
			Self::None => false,
		}
	}
}

impl FromStr for EtaStructMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"all" => Ok(Self::All),
			"not-classes" => Ok(Self::NotClasses),
			"none" => Ok(Self::None),
			_ => Err(format!("unknown eta mode `{s}`, expected one of: all, not-classes, none")),
		}
	}
}

impl fmt::Display for EtaStructMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::All => "all",
			Self::NotClasses => "not-classes",
			Self::None => "none",
		})
	}
}

#[derive(Clone, Copy, Debug)]
pub struct MetaConfig {
	pub eta_struct: EtaStructMode,
	/// Reduction and unification steps allowed between calls to [`MetaCtx::reset_steps`].
	pub max_steps: u64,
	pub proof_irrelevance: bool,
}

impl Default for MetaConfig {
	fn default() -> Self { Self { eta_struct: EtaStructMode::All, max_steps: 1 << 20, proof_irrelevance: true } }
}

#[derive(Clone, Debug)]
pub struct MetavarDecl {
	pub ty: Expr,
	pub depth: u32,
	/// The number of locals in scope when the metavariable was created.
	pub scope: usize,
}

/// Metavariable declarations and assignments.
///
/// Only metavariables created at the current depth are assignable; those from
/// shallower depths are read-only.
#[derive(Clone, Default, Debug)]
pub struct MetavarContext {
	depth: u32,
	decls: HashMap<MVarId, MetavarDecl>,
	assignments: HashMap<MVarId, Expr>,
	level_depths: HashMap<LevelMVarId, u32>,
	level_assignments: HashMap<LevelMVarId, Level>,
}

impl MetavarContext {
	pub fn depth(&self) -> u32 { self.depth }

	pub fn find_decl(&self, mvar: MVarId) -> Option<&MetavarDecl> { self.decls.get(&mvar) }

	pub fn assignment(&self, mvar: MVarId) -> Option<&Expr> { self.assignments.get(&mvar) }

	pub fn is_assigned(&self, mvar: MVarId) -> bool { self.assignments.contains_key(&mvar) }

	pub fn is_assignable(&self, mvar: MVarId) -> bool {
		!self.is_assigned(mvar) && self.decls.get(&mvar).is_some_and(|decl| decl.depth == self.depth)
	}

	pub fn is_level_assignable(&self, mvar: LevelMVarId) -> bool {
		!self.level_assignments.contains_key(&mvar) && self.level_depths.get(&mvar) == Some(&self.depth)
	}

	pub fn assign(&mut self, mvar: MVarId, value: Expr) { self.assignments.insert(mvar, value); }

	pub fn assign_level(&mut self, mvar: LevelMVarId, level: Level) { self.level_assignments.insert(mvar, level); }

	pub fn instantiate_level(&self, level: &Level) -> Level {
		if !level.has_mvar() {
			return level.clone();
		}
		level.replace(&mut |level| match level {
			Level::MVar(mvar) => self.level_assignments.get(mvar).map(|value| self.instantiate_level(value)),
			_ => None,
		})
	}

	pub fn instantiate(&self, e: &Expr) -> Expr {
		if !e.has_mvar() {
			return e.clone();
		}
		e.replace(&mut |e, _| match e {
			Expr::MVar(mvar) => self.assignments.get(mvar).map(|value| self.instantiate(value)),
			Expr::Sort(level) if level.has_mvar() => Some(Expr::Sort(self.instantiate_level(level))),
			Expr::Const(name, levels) if levels.iter().any(Level::has_mvar) =>
				Some(Expr::Const(*name, levels.iter().map(|level| self.instantiate_level(level)).collect())),
			_ => None,
		})
	}
}

/// The state of one elaboration task.
///
/// Holds the only mutable borrow of the environment for its lifetime.
pub struct MetaCtx<'e> {
	pub env: &'e mut Environment,
	pub lctx: LocalContext,
	pub mctx: MetavarContext,
	pub config: MetaConfig,
	steps: u64,
}

impl<'e> MetaCtx<'e> {
	pub fn new(env: &'e mut Environment) -> Self { Self::with_config(env, MetaConfig::default()) }

	pub fn with_config(env: &'e mut Environment, config: MetaConfig) -> Self {
		Self { env, lctx: LocalContext::new(), mctx: MetavarContext::default(), config, steps: 0 }
	}

	pub fn env(&self) -> &Environment { &*self.env }

	pub fn reset_steps(&mut self) { self.steps = 0; }

	pub(crate) fn tick(&mut self) -> Result<(), MetaError> {
		self.steps += 1;
		if self.steps > self.config.max_steps {
			return Err(MetaError::StepLimitExceeded(self.config.max_steps));
		}
		Ok(())
	}

	/// Whether structure eta may be used on values of `structure`.
	pub fn use_eta_struct(&self, structure: Name) -> bool { self.config.eta_struct.allows(&*self.env, structure) }

	pub fn scoped(&mut self) -> ScopedContext<'_, 'e> { ScopedContext::new(self) }

	pub fn isolated(&mut self) -> IsolatedContext<'_, 'e> { IsolatedContext::new(self) }

	pub fn push_local(&mut self, name: impl Into<Name>, info: BinderInfo, ty: Expr) -> Expr {
		let fvar = FVarId::fresh();
		self.lctx.push(LocalDecl { fvar, name: name.into(), info, ty, value: None });
		Expr::fvar(fvar)
	}

	pub fn push_let(&mut self, name: impl Into<Name>, info: BinderInfo, ty: Expr, value: Expr) -> Expr {
		let fvar = FVarId::fresh();
		self.lctx.push(LocalDecl { fvar, name: name.into(), info, ty, value: Some(value) });
		Expr::fvar(fvar)
	}

	pub fn find_local(&self, fvar: FVarId) -> Result<&LocalDecl, MetaError> {
		self.lctx.find(fvar).ok_or(MetaError::UnknownFVar(fvar))
	}

	pub fn mk_fresh_expr_mvar(&mut self, ty: Expr) -> Expr {
		let mvar = MVarId::fresh();
		let decl = MetavarDecl { ty, depth: self.mctx.depth, scope: self.lctx.len() };
		self.mctx.decls.insert(mvar, decl);
		Expr::mvar(mvar)
	}

	pub fn mk_fresh_level_mvar(&mut self) -> Level {
		let mvar = LevelMVarId::fresh();
		self.mctx.level_depths.insert(mvar, self.mctx.depth);
		Level::MVar(mvar)
	}

	pub fn instantiate_mvars(&self, e: &Expr) -> Expr { self.mctx.instantiate(e) }

	pub fn mk_lambda(&self, fvars: &[Expr], body: &Expr) -> Result<Expr, MetaError> { self.mk_binding(true, fvars, body) }

	pub fn mk_pi(&self, fvars: &[Expr], body: &Expr) -> Result<Expr, MetaError> { self.mk_binding(false, fvars, body) }

	/// Abstracts `fvars` out of `body`. Let-bound locals become let-expressions.
	fn mk_binding(&self, is_lambda: bool, fvars: &[Expr], body: &Expr) -> Result<Expr, MetaError> {
		let ids = fvars
			.iter()
			.map(|fvar| match fvar {
				Expr::FVar(id) => Ok(*id),
				other => Err(MetaError::FVarExpected(other.clone())),
			})
			.collect::<Result<Vec<_>, _>>()?;
		let mut result = self.instantiate_mvars(body).abstract_fvars(&ids);
		for (i, id) in ids.iter().enumerate().rev() {
			let decl = self.find_local(*id)?;
			let ty = self.instantiate_mvars(&decl.ty).abstract_fvars(&ids[..i]);
			result = match &decl.value {
				Some(value) => Expr::let_(decl.name, ty, self.instantiate_mvars(value).abstract_fvars(&ids[..i]), result),
				None if is_lambda => Expr::lam(decl.name, decl.info, ty, result),
				None => Expr::pi(decl.name, decl.info, ty, result),
			};
		}
		Ok(result)
	}

	/// Whether `value` only mentions locals that were in scope when `mvar` was created.
	pub(crate) fn is_in_mvar_scope(&self, mvar: MVarId, value: &Expr) -> bool {
		let Some(decl) = self.mctx.find_decl(mvar) else {
			return false;
		};
		!value.any(|e, _| match e {
			Expr::FVar(fvar) => self.lctx.position(*fvar).map_or(true, |position| position >= decl.scope),
			_ => false,
		})
	}
}

/// Restores the local context on drop, discarding every local introduced through it.
pub struct ScopedContext<'c, 'e> {
	ctx: &'c mut MetaCtx<'e>,
	len: usize,
}

impl<'c, 'e> ScopedContext<'c, 'e> {
	fn new(ctx: &'c mut MetaCtx<'e>) -> Self {
		let len = ctx.lctx.len();
		Self { ctx, len }
	}
}

impl<'c, 'e> Deref for ScopedContext<'c, 'e> {
	type Target = MetaCtx<'e>;

	fn deref(&self) -> &Self::Target { self.ctx }
}

impl<'c, 'e> DerefMut for ScopedContext<'c, 'e> {
	fn deref_mut(&mut self) -> &mut Self::Target { self.ctx }
}

impl<'c, 'e> Drop for ScopedContext<'c, 'e> {
	fn drop(&mut self) { self.ctx.lctx.truncate(self.len) }
}

/// Runs at a fresh metavariable depth and discards every assignment on drop.
pub struct IsolatedContext<'c, 'e> {
	ctx: &'c mut MetaCtx<'e>,
	saved: MetavarContext,
}

impl<'c, 'e> IsolatedContext<'c, 'e> {
	fn new(ctx: &'c mut MetaCtx<'e>) -> Self {
		let saved = ctx.mctx.clone();
		ctx.mctx.depth += 1;
		Self { ctx, saved }
	}
}

impl<'c, 'e> Deref for IsolatedContext<'c, 'e> {
	type Target = MetaCtx<'e>;

	fn deref(&self) -> &Self::Target { self.ctx }
}

impl<'c, 'e> DerefMut for IsolatedContext<'c, 'e> {
	fn deref_mut(&mut self) -> &mut Self::Target { self.ctx }
}

impl<'c, 'e> Drop for IsolatedContext<'c, 'e> {
	fn drop(&mut self) { self.ctx.mctx = std::mem::take(&mut self.saved) }
}
