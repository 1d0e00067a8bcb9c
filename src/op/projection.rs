//! Projection functions for structures.
//!
//! For a structure `S ps` with constructor `S.mk ps (f₀ : A₀) … (fₙ : Aₙ)` this
//! adds one declaration `S.fᵢ : {ps} → (self : S ps) → Aᵢ` per field, where
//! earlier fields in `Aᵢ` are replaced by their own projections of `self`, and
//! registers each one in the projection table.

use thiserror::Error;
use tracing::{debug, trace};

use super::{
	binder::{consume_type_annotations, infer_implicit, is_out_param},
	declare::KernelError,
	meta::{MetaCtx, MetaError},
};
use crate::{
	common::{BinderInfo, Name},
	ir::{
		declaration::{
			ConstantVal, Declaration, DefinitionVal, OpaqueVal, ProjectionInfo, ReducibilityHints,
			ReducibilityStatus, TheoremVal,
		},
		environment::Environment,
		expr::Expr,
		level::Level,
	},
};

#[derive(Debug, Error)]
pub enum StructureError {
	#[error("`{0}` is not a structure")]
	NotAStructure(Name),
	#[error("`{name}` must have exactly one constructor, but has {count}")]
	NotExactlyOneConstructor { name: Name, count: usize },
	#[error("ill-formed inductive `{name}`: {reason}")]
	IllFormedInductive { name: Name, reason: String },
	#[error("failed to generate projection for field `{field}` of `{structure}`")]
	ProjectionGenerationFailed { structure: Name, field: Name, expected: Expr, found: Option<Expr> },
	#[error("failed to add projection `{projection}`")]
	Declaration {
		projection: Name,
		#[source]
		source: KernelError,
	},
	#[error(transparent)]
	Meta(#[from] MetaError),
}

/// A generated projection, as seen from the field it extracts.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
	pub index: u32,
	pub name: Name,
	pub projection: Name,
	/// The field's binder kind in the constructor.
	pub info: BinderInfo,
	pub is_out_param: bool,
	pub is_proof: bool,
	pub subobject: Option<Name>,
	/// The binder kind given to the field's local while later fields are processed.
	pub local_info: BinderInfo,
}

struct StructureShape {
	name: Name,
	level_params: Vec<Name>,
	ctor: Name,
	ctor_ty: Expr,
	num_params: u32,
	fields: Vec<(Name, Option<Name>)>,
	is_class: bool,
	is_predicate: bool,
	/// Universe levels of the recursor beyond the structure's own, when it has one.
	recursor: Option<Vec<Level>>,
}

impl StructureShape {
	fn load(ctx: &mut MetaCtx<'_>, name: Name) -> Result<Self, StructureError> {
		let ill_formed = |reason: String| StructureError::IllFormedInductive { name, reason };
		let Some(inductive) = ctx.env.find_inductive(name) else {
			return Err(StructureError::NotAStructure(name));
		};
		if inductive.ctors.len() != 1 {
			return Err(StructureError::NotExactlyOneConstructor { name, count: inductive.ctors.len() });
		}
		if inductive.num_indices != 0 {
			return Err(StructureError::NotAStructure(name));
		}
		let inductive = inductive.clone();
		let ctor = ctx
			.env
			.find_constructor(inductive.ctors[0])
			.cloned()
			.ok_or_else(|| ill_formed(format!("missing constructor `{}`", inductive.ctors[0])))?;

		let mut binder_names = Vec::new();
		let mut ty = &ctor.val.ty;
		while let Expr::Pi { name, body, .. } = ty {
			binder_names.push(*name);
			ty = body;
		}
		let num_params = inductive.num_params as usize;
		let actual = binder_names.len().saturating_sub(num_params);
		if binder_names.len() < num_params || actual != ctor.num_fields as usize {
			return Err(ill_formed(format!(
				"constructor `{}` has {actual} fields, expected {}",
				ctor.val.name, ctor.num_fields
			)));
		}
		let fields: Vec<(Name, Option<Name>)> = match ctx.env.structure_info(name) {
			Some(info) => info.fields.iter().map(|field| (field.name, field.subobject)).collect(),
			None => binder_names[num_params..].iter().map(|field| (*field, None)).collect(),
		};
		if fields.len() != actual {
			return Err(ill_formed(format!("{} field names declared for {actual} fields", fields.len())));
		}

		let recursor = ctx.env.find_recursor(name.str("rec")).map(|recursor| {
			let extra = recursor.val.level_params.len().saturating_sub(inductive.val.level_params.len());
			vec![Level::zero(); extra]
		});

		Ok(Self {
			name,
			level_params: inductive.val.level_params.clone(),
			ctor: ctor.val.name,
			ctor_ty: ctor.val.ty.clone(),
			num_params: inductive.num_params,
			fields,
			is_class: ctx.env.is_class(name),
			is_predicate: ctx.is_prop_former_type(&inductive.val.ty)?,
			recursor,
		})
	}

	fn levels(&self) -> Vec<Level> { self.level_params.iter().map(|param| Level::param(*param)).collect() }
}

/// The parameters and `self` local every projection is abstracted over.
struct SelfBinding {
	params: Vec<Expr>,
	self_: Expr,
	levels: Vec<Level>,
}

impl SelfBinding {
	fn binders(&self) -> Vec<Expr> { self.params.iter().chain([&self.self_]).cloned().collect() }

	/// `S.f params self` at the structure's own universe levels.
	fn apply(&self, projection: Name) -> Expr {
		Expr::app_n(Expr::const_(projection, self.levels.clone()), self.binders())
	}
}

/// Generates, adds and registers the projections of `structure`.
///
/// Each projection is added as soon as it is built; if a later field fails, the
/// earlier projections stay in the environment.
pub fn generate_projections(
	ctx: &mut MetaCtx<'_>,
	structure: Name,
	add_as_unsafe: bool,
) -> Result<Vec<FieldDescriptor>, StructureError> {
	let shape = StructureShape::load(ctx, structure)?;
	debug!(%structure, fields = shape.fields.len(), is_class = shape.is_class, "generating projections");

	let mut scope = ctx.scoped();
	let levels = shape.levels();
	let mut ty = shape.ctor_ty.clone();
	let mut params = Vec::new();
	for _ in 0..shape.num_params {
		let Expr::Pi { name, info, domain, body } = ty else {
			return Err(StructureError::IllFormedInductive { name: structure, reason: "missing parameter".into() });
		};
		let param = scope.push_local(name, info, domain.as_ref().clone());
		ty = body.instantiate(&param);
		params.push(param);
	}

	let self_ty = Expr::app_n(Expr::const_(structure, levels.clone()), params.iter().cloned());
	let self_info = if shape.is_class { BinderInfo::InstImplicit } else { BinderInfo::Default };
	let self_ = scope.push_local("self", self_info, self_ty);
	let binding = SelfBinding { params, self_, levels };
	let binders = binding.binders();

	let mut descriptors = Vec::new();
	for (index, (field, subobject)) in shape.fields.iter().enumerate() {
		let Expr::Pi { info, domain, body, .. } = ty else {
			return Err(StructureError::IllFormedInductive { name: structure, reason: "missing field".into() });
		};
		let index = index as u32;
		let projection = structure.str(field.as_str());
		let is_out_param = is_out_param(&domain);
		let field_ty = consume_type_annotations(&domain);
		let is_proof = scope.is_prop(&field_ty)?;
		trace!(%projection, %field_ty, is_proof, "field");
		if shape.is_predicate && !is_proof {
			return Err(StructureError::ProjectionGenerationFailed {
				structure,
				field: *field,
				expected: field_ty,
				found: None,
			});
		}

		let proj_ty = infer_implicit(&scope.mk_pi(&binders, &field_ty)?, binding.params.len(), false);
		let value = if is_proof && shape.recursor.is_some() {
			proof_projection(&mut scope, &shape, &binding, index, *field, &field_ty)?
		} else {
			Expr::proj(structure, index, binding.self_.clone())
		};
		let value = scope.mk_lambda(&binders, &value)?;

		let is_unsafe = add_as_unsafe || scope.env.has_unsafe(&proj_ty) || scope.env.has_unsafe(&value);
		let val = ConstantVal::new(projection, shape.level_params.clone(), proj_ty);
		let declaration = match (is_proof, is_unsafe) {
			(false, _) => Declaration::Definition(DefinitionVal { val, value, hints: ReducibilityHints::Abbrev, is_unsafe }),
			(true, false) => Declaration::Theorem(TheoremVal { val, value }),
			(true, true) => Declaration::Opaque(OpaqueVal { val, value, is_unsafe }),
		};
		scope.env.add_decl(declaration).map_err(|source| StructureError::Declaration { projection, source })?;

		let status =
			if is_proof && is_unsafe { ReducibilityStatus::Irreducible } else { ReducibilityStatus::Default };
		scope.env.set_reducibility(projection, status);
		scope.env.register_projection(ProjectionInfo {
			structure,
			ctor: shape.ctor,
			index,
			name: projection,
			num_params: shape.num_params,
			from_class: shape.is_class,
		});

		let local_info =
			if info.is_inst_implicit() && !is_out_param { BinderInfo::InstImplicit } else { BinderInfo::Default };
		let applied = binding.apply(projection);
		scope.push_let(*field, local_info, field_ty, applied.clone());
		ty = body.instantiate(&applied);

		debug!(%projection, is_proof, is_unsafe, "added projection");
		descriptors.push(FieldDescriptor {
			index,
			name: *field,
			projection,
			info,
			is_out_param,
			is_proof,
			subobject: *subobject,
			local_info,
		});
	}
	Ok(descriptors)
}

/// Builds `S.rec (motive := fun self => T) (fun fields => fᵢ) self` for a
/// proof-valued field of type `T`.
fn proof_projection(
	ctx: &mut MetaCtx<'_>,
	shape: &StructureShape,
	binding: &SelfBinding,
	index: u32,
	field: Name,
	expected: &Expr,
) -> Result<Expr, StructureError> {
	let failed = |found: Option<Expr>| StructureError::ProjectionGenerationFailed {
		structure: shape.name,
		field,
		expected: expected.clone(),
		found,
	};

	let motive = ctx.mk_lambda(std::slice::from_ref(&binding.self_), expected)?;
	let minor = {
		let mut scope = ctx.scoped();
		let mut ty = shape.ctor_ty.clone();
		for param in &binding.params {
			let (_, body) = scope.whnf_to_pi(&ty)?;
			ty = body.instantiate(param);
		}
		let mut fields = Vec::new();
		while let Expr::Pi { name, info, domain, body } = ty {
			let local = scope.push_local(name, info, domain.as_ref().clone());
			ty = body.instantiate(&local);
			fields.push(local);
		}
		let selected = fields.get(index as usize).cloned().ok_or_else(|| failed(None))?;
		scope.mk_lambda(&fields, &selected)?
	};

	let motive_levels = shape.recursor.as_deref().unwrap_or_default();
	let recursor_levels = motive_levels.iter().chain(&binding.levels).cloned();
	let recursor = Expr::const_(shape.name.str("rec"), recursor_levels);
	let arguments = binding.params.iter().cloned().chain([motive, minor, binding.self_.clone()]);
	let application = Expr::app_n(recursor, arguments);

	let found = match ctx.check(&application) {
		Ok(found) => found,
		Err(MetaError::AppTypeMismatch { .. }) => return Err(failed(None)),
		Err(error) => return Err(error.into()),
	};
	if !ctx.is_def_eq(&found, expected)? {
		return Err(failed(Some(found)));
	}
	Ok(application)
}

/// The chain of projections reaching `field` from `structure`, searching direct
/// fields first and then subobject fields depth-first.
pub fn find_field_path(env: &Environment, structure: Name, field: Name) -> Option<Vec<Name>> {
	let Some(info) = env.structure_info(structure) else {
		let projection = structure.str(field.as_str());
		return env.projection_info(projection).map(|_| vec![projection]);
	};
	if info.field_index(field).is_some() {
		return Some(vec![structure.str(field.as_str())]);
	}
	info.fields.iter().find_map(|parent| {
		let mut path = find_field_path(env, parent.subobject?, field)?;
		path.insert(0, structure.str(parent.name.as_str()));
		Some(path)
	})
}

/// Projects `field` out of `e`, going through subobjects as needed.
pub fn mk_field_projection(ctx: &mut MetaCtx<'_>, e: &Expr, field: Name) -> Result<Option<Expr>, MetaError> {
	let ty = ctx.infer_type(e)?;
	let ty = ctx.whnf(&ty)?;
	let Some(structure) = ty.get_app_fn().const_name() else {
		return Ok(None);
	};
	let Some(path) = find_field_path(ctx.env(), structure, field) else {
		return Ok(None);
	};

	let mut result = e.clone();
	for projection in path {
		let ty = ctx.infer_type(&result)?;
		let ty = ctx.whnf(&ty)?;
		let Expr::Const(_, levels) = ty.get_app_fn() else {
			return Ok(None);
		};
		let function = Expr::Const(projection, levels.clone());
		let arguments: Vec<Expr> = ty.get_app_args().into_iter().cloned().chain([result]).collect();
		result = Expr::app_n(function, arguments);
	}
	Ok(Some(result))
}
