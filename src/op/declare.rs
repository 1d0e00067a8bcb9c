use thiserror::Error;
use tracing::debug;

use super::meta::{MetaCtx, MetaError};
use crate::{
	common::{BinderInfo, Name},
	ir::{
		declaration::{
			ConstantInfo, ConstantVal, ConstructorVal, Declaration, InductiveDecl, InductiveVal, RecursorRule,
			RecursorVal,
		},
		environment::Environment,
		expr::Expr,
		level::Level,
		telescope::Telescope,
	},
};

#[derive(Debug, Error)]
pub enum KernelError {
	#[error("`{0}` has already been declared")]
	AlreadyDeclared(Name),
	#[error("type mismatch in `{name}`: declared type is `{expected}`, value has type `{found}`")]
	DeclTypeMismatch { name: Name, expected: Expr, found: Expr },
	#[error("type of theorem `{0}` is not a proposition")]
	TheoremTypeNotProp(Name),
	#[error("safe declaration `{name}` refers to unsafe constant `{constant}`")]
	UnsafeReference { name: Name, constant: Name },
	#[error("malformed inductive `{name}`: {reason}")]
	MalformedInductive { name: Name, reason: String },
	#[error(transparent)]
	Meta(#[from] MetaError),
}

fn malformed(name: Name, reason: impl Into<String>) -> KernelError {
	KernelError::MalformedInductive { name, reason: reason.into() }
}

/// Splits a type into its leading binders (each domain open over the earlier
/// ones) and its result.
fn peel_binders(ty: &Expr) -> (Vec<(Name, BinderInfo, Expr)>, Expr) {
	let mut binders = Vec::new();
	let mut current = ty;
	while let Expr::Pi { name, info, domain, body } = current {
		binders.push((*name, *info, domain.as_ref().clone()));
		current = body;
	}
	(binders, current.clone())
}

/// A name not among `taken`, starting from `base`.
fn fresh_level_name(base: &str, taken: &[Name]) -> Name {
	let mut candidate = Name::new(base);
	let mut suffix = 1;
	while taken.contains(&candidate) {
		candidate = Name::new(&format!("{base}_{suffix}"));
		suffix += 1;
	}
	candidate
}

struct ConstructorShape {
	num_fields: u32,
	fields_are_proofs: bool,
	is_rec: bool,
}

impl Environment {
	/// Checks a declaration and adds it. Nothing is added if the check fails.
	pub fn add_decl(&mut self, declaration: Declaration) -> Result<(), KernelError> {
		let name = declaration.name();
		if self.contains(name) {
			return Err(KernelError::AlreadyDeclared(name));
		}
		let val = declaration.constant_val();
		if !declaration.is_unsafe() {
			self.check_no_unsafe(name, std::iter::once(&val.ty).chain(declaration.value()))?;
		}

		{
			let mut ctx = MetaCtx::new(self);
			ctx.infer_sort(&val.ty, true)?;
			if let Declaration::Theorem(_) = declaration {
				if !ctx.is_prop(&val.ty)? {
					return Err(KernelError::TheoremTypeNotProp(name));
				}
			}
			if let Some(value) = declaration.value() {
				let found = ctx.check(value)?;
				if !ctx.is_def_eq(&found, &val.ty)? {
					return Err(KernelError::DeclTypeMismatch { name, expected: val.ty.clone(), found });
				}
			}
		}

		debug!(%name, kind = ConstantInfo::from(declaration.clone()).kind(), "added declaration");
		self.insert(declaration.into());
		Ok(())
	}

	fn check_no_unsafe<'a>(&self, name: Name, exprs: impl IntoIterator<Item = &'a Expr>) -> Result<(), KernelError> {
		for e in exprs {
			if let Some(constant) = e.constants().into_iter().find(|constant| self.is_unsafe_const(*constant)) {
				return Err(KernelError::UnsafeReference { name, constant });
			}
		}
		Ok(())
	}

	/// Checks an inductive type with its constructors and adds them, together with
	/// a recursor when the type is structure-like.
	pub fn add_inductive(&mut self, decl: InductiveDecl) -> Result<(), KernelError> {
		for name in std::iter::once(decl.name).chain(decl.constructors.iter().map(|(name, _)| *name)) {
			if self.contains(name) {
				return Err(KernelError::AlreadyDeclared(name));
			}
		}
		if !decl.is_unsafe {
			let types = std::iter::once(&decl.ty).chain(decl.constructors.iter().map(|(_, ty)| ty));
			self.check_no_unsafe(decl.name, types)?;
		}

		let (binders, sort) = peel_binders(&decl.ty);
		let Expr::Sort(level) = sort else {
			return Err(malformed(decl.name, "type does not end in a sort"));
		};
		if binders.len() < decl.num_params as usize {
			return Err(malformed(decl.name, "fewer binders than parameters"));
		}
		let num_indices = (binders.len() - decl.num_params as usize) as u32;
		MetaCtx::new(self).infer_sort(&decl.ty, true)?;

		let mut inductive = InductiveVal {
			val: ConstantVal::new(decl.name, decl.level_params.clone(), decl.ty.clone()),
			num_params: decl.num_params,
			num_indices,
			ctors: decl.constructors.iter().map(|(name, _)| *name).collect(),
			is_rec: false,
			is_unsafe: decl.is_unsafe,
		};

		// Constructors are checked with the inductive itself in scope.
		let version = self.version();
		self.insert(ConstantInfo::Inductive(inductive.clone()));
		let shapes = {
			let mut ctx = MetaCtx::new(self);
			decl.constructors
				.iter()
				.map(|(name, ty)| check_constructor(&mut ctx, &decl, *name, ty, num_indices))
				.collect::<Result<Vec<_>, _>>()
		};
		let shapes = match shapes {
			Ok(shapes) => shapes,
			Err(error) => {
				self.retract(decl.name, version);
				return Err(error);
			}
		};

		inductive.is_rec = shapes.iter().any(|shape| shape.is_rec);
		self.insert(ConstantInfo::Inductive(inductive.clone()));
		for (cidx, ((name, ty), shape)) in decl.constructors.iter().zip(&shapes).enumerate() {
			self.insert(ConstantInfo::Constructor(ConstructorVal {
				val: ConstantVal::new(*name, decl.level_params.clone(), ty.clone()),
				induct: decl.name,
				cidx: cidx as u32,
				num_params: decl.num_params,
				num_fields: shape.num_fields,
				is_unsafe: decl.is_unsafe,
			}));
		}
		debug!(name = %decl.name, constructors = shapes.len(), "added inductive");

		if self.is_structure_like(decl.name) {
			let is_predicate = level.normalize().is_zero();
			let large_elimination = !is_predicate || shapes[0].fields_are_proofs;
			let recursor = mk_structure_recursor(&decl, large_elimination);
			debug!(name = %recursor.val.name, large_elimination, "added recursor");
			self.insert(ConstantInfo::Recursor(recursor));
		}
		Ok(())
	}
}

fn check_constructor(
	ctx: &mut MetaCtx<'_>,
	decl: &InductiveDecl,
	name: Name,
	ty: &Expr,
	num_indices: u32,
) -> Result<ConstructorShape, KernelError> {
	ctx.infer_sort(ty, true)?;

	let mut scope = ctx.scoped();
	let (binders, result) = peel_binders(ty);
	let (inductive_binders, _) = peel_binders(&decl.ty);
	let num_params = decl.num_params as usize;
	if binders.len() < num_params {
		return Err(malformed(decl.name, format!("constructor `{name}` has fewer binders than parameters")));
	}

	let mut locals = Vec::new();
	let mut fields_are_proofs = true;
	let mut is_rec = false;
	for (i, (binder_name, info, domain)) in binders.iter().enumerate() {
		let domain = domain.instantiate_rev(&locals);
		if i < num_params {
			let expected = inductive_binders[i].2.instantiate_rev(&locals);
			if !scope.is_def_eq(&domain, &expected)? {
				return Err(malformed(decl.name, format!("parameter {i} of constructor `{name}` has the wrong type")));
			}
		} else {
			is_rec = is_rec || domain.constants().contains(&decl.name);
			fields_are_proofs = fields_are_proofs && scope.is_prop(&domain)?;
		}
		locals.push(scope.push_local(*binder_name, *info, domain));
	}

	let result = result.instantiate_rev(&locals);
	let arguments = result.get_app_args();
	let expected_levels: Vec<Level> = decl.level_params.iter().map(|param| Level::param(*param)).collect();
	let returns_inductive = matches!(result.get_app_fn(), Expr::Const(head, levels) if *head == decl.name && levels.as_slice() == expected_levels.as_slice());
	if !returns_inductive
		|| arguments.len() != num_params + num_indices as usize
		|| arguments.iter().zip(&locals[..num_params]).any(|(argument, param)| *argument != param)
	{
		return Err(malformed(decl.name, format!("constructor `{name}` does not return `{}` of its parameters", decl.name)));
	}

	Ok(ConstructorShape { num_fields: (binders.len() - num_params) as u32, fields_are_proofs, is_rec })
}

/// Builds `S.rec : {params} → {motive : S params → Sort u} → ((fields) → motive (S.mk params fields)) → (t : S params) → motive t`
/// with the iota rule `fun params motive mk fields => mk fields`.
fn mk_structure_recursor(decl: &InductiveDecl, large_elimination: bool) -> RecursorVal {
	let (ctor_name, ctor_ty) = &decl.constructors[0];
	let (binders, _) = peel_binders(ctor_ty);
	let num_params = decl.num_params as usize;
	let levels: Vec<Level> = decl.level_params.iter().map(|param| Level::param(*param)).collect();

	let mut level_params = decl.level_params.clone();
	let motive_level = if large_elimination {
		let name = fresh_level_name("u", &decl.level_params);
		level_params.insert(0, name);
		Level::param(name)
	} else {
		Level::zero()
	};

	let mut telescope = Telescope::new();
	let mut locals = Vec::new();
	for (name, _, domain) in &binders[..num_params] {
		let domain = domain.instantiate_rev(&locals);
		locals.push(telescope.bind(*name, BinderInfo::Implicit, domain));
	}
	let params = locals.clone();
	let structure_ty = Expr::app_n(Expr::const_(decl.name, levels.clone()), params.clone());
	let motive =
		telescope.bind("motive", BinderInfo::Implicit, Expr::arrow(structure_ty.clone(), Expr::sort(motive_level)));

	let mut fields = Telescope::new();
	for (name, info, domain) in &binders[num_params..] {
		let domain = domain.instantiate_rev(&locals);
		locals.push(fields.bind(*name, *info, domain));
	}
	let constructed = Expr::app_n(Expr::const_(*ctor_name, levels), locals.iter().cloned());
	let minor = telescope.bind("mk", BinderInfo::Default, fields.pi(Expr::app(motive.clone(), constructed)));

	let mut rule = telescope.clone();
	rule.extend(&fields);
	let rhs = rule.lambda(Expr::app_n(minor, locals[num_params..].iter().cloned()));

	let major = telescope.bind("t", BinderInfo::Default, structure_ty);
	let ty = telescope.pi(Expr::app(motive, major));

	RecursorVal {
		val: ConstantVal::new(decl.name.str("rec"), level_params, ty),
		induct: decl.name,
		num_params: decl.num_params,
		num_minors: 1,
		rules: vec![RecursorRule { ctor: *ctor_name, num_fields: (binders.len() - num_params) as u32, rhs }],
		is_unsafe: decl.is_unsafe,
	}
}
