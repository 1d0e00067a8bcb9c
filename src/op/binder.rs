//! Binder-kind utilities shared by declaration builders.

use crate::{
	common::{BinderInfo, Name},
	ir::expr::Expr,
};

/// Makes the first `num_params` explicit binders of a function type implicit
/// when they can be inferred from the rest of the type.
///
/// In strict mode a binder only counts as inferable when it occurs in the domain
/// of a later explicit binder; otherwise any occurrence in the rest of the type
/// suffices.
pub fn infer_implicit(ty: &Expr, num_params: usize, strict: bool) -> Expr {
	match ty {
		Expr::Pi { name, info, domain, body } if num_params > 0 => {
			let body = infer_implicit(body, num_params - 1, strict);
			let inferable =
				if strict { has_loose_bvar_in_explicit_domain(&body, 0) } else { body.has_loose_bvar(0) };
			let info = if info.is_explicit() && inferable { BinderInfo::Implicit } else { *info };
			Expr::pi(*name, info, domain.as_ref().clone(), body)
		}
		_ => ty.clone(),
	}
}

fn has_loose_bvar_in_explicit_domain(ty: &Expr, index: u32) -> bool {
	match ty {
		Expr::Pi { info, domain, body, .. } =>
			(info.is_explicit() && domain.has_loose_bvar(index)) || has_loose_bvar_in_explicit_domain(body, index + 1),
		_ => false,
	}
}

/// Strips `optParam`, `autoParam`, `outParam` and `semiOutParam` wrappers.
pub fn consume_type_annotations(ty: &Expr) -> Expr {
	let mut current = ty;
	loop {
		let arguments = current.get_app_args();
		current = match current.get_app_fn().const_name().map(Name::as_str) {
			Some("optParam" | "autoParam") if arguments.len() == 2 => arguments[0],
			Some("outParam" | "semiOutParam") if arguments.len() == 1 => arguments[0],
			_ => return current.clone(),
		};
	}
}

/// Whether a type is marked `outParam`.
pub fn is_out_param(ty: &Expr) -> bool { ty.is_app_of(Name::new("outParam"), 1) }

#[cfg(test)]
mod tests {
	use super::*;

	fn explicit(name: &str, domain: Expr, body: Expr) -> Expr { Expr::pi(name, BinderInfo::Default, domain, body) }

	fn infos(mut ty: &Expr) -> Vec<BinderInfo> {
		let mut infos = Vec::new();
		while let Expr::Pi { info, body, .. } = ty {
			infos.push(*info);
			ty = body;
		}
		infos
	}

	#[test]
	fn test_parameter_used_by_later_domain_becomes_implicit() {
		// (α : Type) → (x : α) → α
		let ty = explicit("α", Expr::type_(), explicit("x", Expr::bvar(0), Expr::bvar(1)));
		let inferred = infer_implicit(&ty, 1, true);
		assert_eq!(infos(&inferred), vec![BinderInfo::Implicit, BinderInfo::Default]);
	}

	#[test]
	fn test_strict_mode_ignores_range_occurrences() {
		// (α : Type) → [inst : α] → α
		let ty = explicit("α", Expr::type_(), Expr::pi("inst", BinderInfo::InstImplicit, Expr::bvar(0), Expr::bvar(1)));
		assert_eq!(infos(&infer_implicit(&ty, 1, true))[0], BinderInfo::Default);
		assert_eq!(infos(&infer_implicit(&ty, 1, false))[0], BinderInfo::Implicit);
	}

	#[test]
	fn test_instance_parameter_keeps_its_binder() {
		let ty = Expr::pi("inst", BinderInfo::InstImplicit, Expr::type_(), explicit("x", Expr::bvar(0), Expr::bvar(1)));
		assert_eq!(infos(&infer_implicit(&ty, 1, false))[0], BinderInfo::InstImplicit);
	}

	#[test]
	fn test_nested_annotations_are_consumed() {
		let nat = Expr::const_("Nat", []);
		let ty = Expr::app(Expr::const_("outParam", []), Expr::app_n(Expr::const_("optParam", []), [nat.clone(), Expr::nat_lit(3)]));
		assert!(is_out_param(&ty));
		assert_eq!(consume_type_annotations(&ty), nat);
	}
}
