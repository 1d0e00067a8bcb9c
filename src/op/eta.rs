//! Structure eta: `S.mk ps (S.f₀ ps x) … (S.fₙ ps x)` is `x`.

use tracing::{debug, trace};

use super::{
	meta::{MetaCtx, MetaError},
	transform::{transform, TransformStep},
};
use crate::{
	common::Name,
	ir::{environment::Environment, expr::Expr},
};

/// The value being reconstructed, once the first field has fixed it.
enum Candidate {
	Unknown,
	Fixed { value: Expr, params: Vec<Expr> },
}

/// Splits `field` into the base value and parameters of an application of the
/// registered projection for field `index` of `structure`.
fn match_projection<'a>(env: &Environment, field: &'a Expr, structure: Name, index: usize) -> Option<(&'a Expr, Vec<Expr>)> {
	let info = env.projection_info(field.get_app_fn().const_name()?)?;
	if info.structure != structure || info.index as usize != index {
		return None;
	}
	let arguments = field.get_app_args();
	if arguments.len() != info.num_params as usize + 1 {
		return None;
	}
	let (base, params) = arguments.split_last()?;
	Some((*base, params.iter().map(|param| (*param).clone()).collect()))
}

/// If `e` is a fully applied constructor of a structure accepted by `predicate`
/// whose fields are the matching projections of one value, returns that value.
///
/// The value must be the same term in every field; the projections' parameters
/// only need to be definitionally equal.
pub fn eta_struct(
	ctx: &mut MetaCtx<'_>,
	e: &Expr,
	predicate: impl Fn(&Environment, Name) -> bool,
) -> Result<Option<Expr>, MetaError> {
	let Some(ctor_name) = e.get_app_fn().const_name() else {
		return Ok(None);
	};
	let Some(ctor) = ctx.env.find_constructor(ctor_name) else {
		return Ok(None);
	};
	let (structure, num_params, num_fields) = (ctor.induct, ctor.num_params as usize, ctor.num_fields as usize);
	if !ctx.env.is_structure_like(structure) || !predicate(ctx.env(), structure) {
		return Ok(None);
	}
	let arguments = e.get_app_args();
	if num_fields == 0 || arguments.len() != num_params + num_fields {
		return Ok(None);
	}

	let mut candidate = Candidate::Unknown;
	for (index, field) in arguments[num_params..].iter().enumerate() {
		let Some((base, params)) = match_projection(ctx.env(), field, structure, index) else {
			trace!(%structure, index, "field is not its own projection");
			return Ok(None);
		};
		candidate = match candidate {
			Candidate::Unknown => Candidate::Fixed { value: base.clone(), params },
			Candidate::Fixed { value, params: expected } => {
				if *base != value {
					trace!(%structure, index, "field projects from a different value");
					return Ok(None);
				}
				if !same_params(ctx, &expected, &params)? {
					trace!(%structure, index, "projection parameters differ");
					return Ok(None);
				}
				Candidate::Fixed { value, params: expected }
			}
		};
	}

	match candidate {
		Candidate::Fixed { value, .. } => {
			debug!(%structure, "collapsed structure eta");
			Ok(Some(value))
		}
		Candidate::Unknown => Ok(None),
	}
}

/// [`eta_struct`] restricted by the configured [`EtaStructMode`](super::meta::EtaStructMode).
pub fn eta_struct_default(ctx: &mut MetaCtx<'_>, e: &Expr) -> Result<Option<Expr>, MetaError> {
	let mode = ctx.config.eta_struct;
	eta_struct(ctx, e, |env, structure| mode.allows(env, structure))
}

/// Compares parameter lists pairwise at a fresh metavariable depth. No
/// assignment made during the comparison survives it.
pub fn same_params(ctx: &mut MetaCtx<'_>, xs: &[Expr], ys: &[Expr]) -> Result<bool, MetaError> {
	if xs.len() != ys.len() {
		return Ok(false);
	}
	let mut isolated = ctx.isolated();
	for (x, y) in xs.iter().zip(ys) {
		if !isolated.is_def_eq(x, y)? {
			return Ok(false);
		}
	}
	Ok(true)
}

/// Collapses every structure eta redex in `e`, including those that only appear
/// once their subterms have been collapsed.
pub fn eta_struct_reduce(
	ctx: &mut MetaCtx<'_>,
	e: &Expr,
	predicate: impl Fn(&Environment, Name) -> bool,
) -> Result<Expr, MetaError> {
	let e = ctx.instantiate_mvars(e);
	transform(ctx, &e, |ctx, e| collapse(ctx, e, &predicate), |ctx, e| collapse(ctx, e, &predicate))
}

fn collapse(
	ctx: &mut MetaCtx<'_>,
	e: &Expr,
	predicate: &impl Fn(&Environment, Name) -> bool,
) -> Result<TransformStep, MetaError> {
	Ok(match eta_struct(ctx, e, predicate)? {
		Some(candidate) => TransformStep::Visit(candidate),
		None => TransformStep::Continue(None),
	})
}
