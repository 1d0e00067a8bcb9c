use strata::{
	common::{BinderInfo, Name},
	ir::{environment::Environment, expr::Expr, level::Level},
	op::{
		eta::{eta_struct, eta_struct_default, eta_struct_reduce, same_params},
		meta::{EtaStructMode, MetaConfig, MetaCtx, MetaError},
	},
};

use crate::common::{constant, environment, expand_pair, expand_point, fst, mk_pair, nat, prod, snd};

fn everything(_: &Environment, _: Name) -> bool { true }

#[test]
fn collapses_reconstructed_pair() {
	let mut env = environment(&["Prod"]);
	let mut ctx = MetaCtx::new(&mut env);
	let pair = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));
	let expanded = expand_pair(nat(), nat(), pair.clone());
	assert_eq!(eta_struct(&mut ctx, &expanded, everything).unwrap(), Some(pair));
}

#[test]
fn rejects_tampered_fields() {
	let mut env = environment(&["Prod"]);
	let mut ctx = MetaCtx::new(&mut env);
	let p = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));
	let q = ctx.push_local("q", BinderInfo::Default, prod(nat(), nat()));

	let swapped = mk_pair(nat(), nat(), snd(nat(), nat(), p.clone()), fst(nat(), nat(), p.clone()));
	assert_eq!(eta_struct(&mut ctx, &swapped, everything).unwrap(), None);

	let repeated = mk_pair(nat(), nat(), fst(nat(), nat(), p.clone()), fst(nat(), nat(), p.clone()));
	assert_eq!(eta_struct(&mut ctx, &repeated, everything).unwrap(), None);

	let mixed = mk_pair(nat(), nat(), fst(nat(), nat(), p.clone()), snd(nat(), nat(), q));
	assert_eq!(eta_struct(&mut ctx, &mixed, everything).unwrap(), None);

	let literal = mk_pair(nat(), nat(), fst(nat(), nat(), p), Expr::nat_lit(0));
	assert_eq!(eta_struct(&mut ctx, &literal, everything).unwrap(), None);
}

#[test]
fn projection_parameters_must_agree() {
	let mut env = environment(&["Prod"]);
	let mut ctx = MetaCtx::new(&mut env);
	let string = constant("String");
	let p = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));
	let first = fst(nat(), nat(), p.clone());
	let second = snd(string, nat(), p.clone());
	let e = mk_pair(nat(), nat(), first.clone(), second);
	assert_eq!(eta_struct(&mut ctx, &e, everything).unwrap(), None);

	// Definitionally equal parameters are enough.
	let identity = Expr::lam("x", BinderInfo::Default, Expr::type_(), Expr::bvar(0));
	let second = snd(Expr::app(identity, nat()), nat(), p.clone());
	let e = mk_pair(nat(), nat(), first, second);
	assert_eq!(eta_struct(&mut ctx, &e, everything).unwrap(), Some(p));
}

#[test]
fn partial_application_is_not_a_redex() {
	let mut env = environment(&["Prod"]);
	let mut ctx = MetaCtx::new(&mut env);
	let p = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));
	let levels = [Level::zero(), Level::zero()];
	let partial = Expr::app_n(Expr::const_("Prod.mk", levels), [nat(), nat(), fst(nat(), nat(), p)]);
	assert_eq!(eta_struct(&mut ctx, &partial, everything).unwrap(), None);
	assert_eq!(eta_struct(&mut ctx, &nat(), everything).unwrap(), None);
}

#[test]
fn field_free_structure_is_not_a_redex() {
	let mut env = environment(&["True"]);
	let mut ctx = MetaCtx::new(&mut env);
	assert_eq!(eta_struct(&mut ctx, &constant("True.intro"), everything).unwrap(), None);
}

#[test]
fn mode_can_exclude_classes() {
	let mut env = environment(&["Inhabited"]);
	let config = MetaConfig { eta_struct: EtaStructMode::NotClasses, ..MetaConfig::default() };
	let mut ctx = MetaCtx::with_config(&mut env, config);
	let ty = Expr::app(Expr::const_("Inhabited", [Level::one()]), nat());
	let instance = ctx.push_local("inst", BinderInfo::InstImplicit, ty);
	let default = Expr::app_n(Expr::const_("Inhabited.default", [Level::one()]), [nat(), instance.clone()]);
	let e = Expr::app_n(Expr::const_("Inhabited.mk", [Level::one()]), [nat(), default]);

	assert_eq!(eta_struct_default(&mut ctx, &e).unwrap(), None);
	ctx.config.eta_struct = EtaStructMode::All;
	assert_eq!(eta_struct_default(&mut ctx, &e).unwrap(), Some(instance));
	ctx.config.eta_struct = EtaStructMode::None;
	assert_eq!(eta_struct_default(&mut ctx, &e).unwrap(), None);
}

#[test]
fn parameter_comparison_assigns_nothing() {
	let mut env = environment(&["Prod"]);
	let mut ctx = MetaCtx::new(&mut env);
	let hole = ctx.mk_fresh_expr_mvar(Expr::type_());
	let Expr::MVar(id) = hole else { unreachable!() };
	let p = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));

	let e = mk_pair(nat(), nat(), fst(hole.clone(), nat(), p.clone()), snd(nat(), nat(), p.clone()));
	assert_eq!(eta_struct(&mut ctx, &e, everything).unwrap(), None);
	assert!(!ctx.mctx.is_assigned(id));
	assert_eq!(ctx.mctx.depth(), 0);

	// Outside an isolated comparison the same hole is assignable.
	assert!(ctx.is_def_eq(&hole, &nat()).unwrap());
	assert!(ctx.mctx.is_assigned(id));
	assert!(same_params(&mut ctx, &[hole, nat()], &[nat(), nat()]).unwrap());
}

#[test]
fn reducer_rewrites_under_binders() {
	let mut env = environment(&["Prod", "Point"]);
	let mut ctx = MetaCtx::new(&mut env);

	// fun (p : Nat × Nat) => (p.1, p.2)
	let pair = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));
	let lambda = ctx.mk_lambda(&[pair.clone()], &expand_pair(nat(), nat(), pair.clone())).unwrap();
	let identity = ctx.mk_lambda(&[pair.clone()], &pair).unwrap();
	assert_eq!(eta_struct_reduce(&mut ctx, &lambda, everything).unwrap(), identity);

	// A redex that only appears once its fields are collapsed.
	let nested_ty = prod(prod(nat(), nat()), nat());
	let q = ctx.push_local("q", BinderInfo::Default, nested_ty);
	let inner = fst(prod(nat(), nat()), nat(), q.clone());
	let outer = mk_pair(
		prod(nat(), nat()),
		nat(),
		expand_pair(nat(), nat(), inner),
		snd(prod(nat(), nat()), nat(), q.clone()),
	);
	assert_eq!(eta_struct_reduce(&mut ctx, &outer, everything).unwrap(), q);

	// Unrelated structure around a redex.
	let point = ctx.push_local("pt", BinderInfo::Default, constant("Point"));
	let e = mk_pair(constant("Point"), nat(), expand_point(point.clone()), Expr::nat_lit(7));
	let expected = mk_pair(constant("Point"), nat(), point, Expr::nat_lit(7));
	assert_eq!(eta_struct_reduce(&mut ctx, &e, everything).unwrap(), expected);
}

#[test]
fn reducer_respects_predicate() {
	let mut env = environment(&["Prod", "Point"]);
	let mut ctx = MetaCtx::new(&mut env);
	let point = ctx.push_local("pt", BinderInfo::Default, constant("Point"));
	let e = mk_pair(constant("Point"), nat(), expand_point(point.clone()), Expr::nat_lit(7));
	let only_points = |_: &Environment, structure: Name| structure == Name::new("Point");
	let expected = mk_pair(constant("Point"), nat(), point, Expr::nat_lit(7));
	assert_eq!(eta_struct_reduce(&mut ctx, &e, only_points).unwrap(), expected);

	let pair = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));
	let expanded = expand_pair(nat(), nat(), pair);
	assert_eq!(eta_struct_reduce(&mut ctx, &expanded, only_points).unwrap(), expanded);
}

#[test]
fn reducer_is_idempotent() {
	let mut env = environment(&["Prod"]);
	let mut ctx = MetaCtx::new(&mut env);
	let pair = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));
	let e = Expr::app(
		Expr::lam("x", BinderInfo::Default, prod(nat(), nat()), Expr::bvar(0)),
		expand_pair(nat(), nat(), pair),
	);
	let once = eta_struct_reduce(&mut ctx, &e, everything).unwrap();
	let twice = eta_struct_reduce(&mut ctx, &once, everything).unwrap();
	assert_eq!(once, twice);
}

#[test]
fn reducer_propagates_engine_errors() {
	let mut env = environment(&["Prod"]);
	let config = MetaConfig { max_steps: 0, ..MetaConfig::default() };
	let mut ctx = MetaCtx::with_config(&mut env, config);
	let pair = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));
	let e = expand_pair(nat(), nat(), pair);
	assert!(matches!(eta_struct_reduce(&mut ctx, &e, everything), Err(MetaError::StepLimitExceeded(0))));
}

#[test]
fn level_holes_stay_unassigned_in_isolation() {
	let mut env = environment(&["Prod"]);
	let mut ctx = MetaCtx::new(&mut env);
	let level = ctx.mk_fresh_level_mvar();
	let hole = Expr::sort(level.clone());
	assert!(!same_params(&mut ctx, &[hole.clone()], &[Expr::type_()]).unwrap());
	assert!(ctx.is_def_eq(&hole, &Expr::type_()).unwrap());
	assert_eq!(ctx.mctx.instantiate_level(&level), Level::one());
}

#[test]
fn definitional_equality_uses_structure_eta() {
	let mut env = environment(&["Prod"]);
	let mut ctx = MetaCtx::new(&mut env);
	let pair = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));
	let expanded = expand_pair(nat(), nat(), pair.clone());
	assert!(ctx.is_def_eq(&pair, &expanded).unwrap());
	assert!(ctx.is_def_eq(&expanded, &pair).unwrap());

	ctx.config.eta_struct = EtaStructMode::None;
	assert!(!ctx.is_def_eq(&pair, &expanded).unwrap());
}

/// `Prod.rec (motive := fun _ => Nat) (fun a _ => a) major`
fn first_by_recursion(major: Expr) -> Expr {
	let levels = [Level::one(), Level::zero(), Level::zero()];
	let motive = Expr::lam("t", BinderInfo::Default, prod(nat(), nat()), nat());
	let minor = Expr::lam("a", BinderInfo::Default, nat(), Expr::lam("b", BinderInfo::Default, nat(), Expr::bvar(1)));
	Expr::app_n(Expr::const_("Prod.rec", levels), [nat(), nat(), motive, minor, major])
}

#[test]
fn recursor_reduces_on_free_major() {
	let mut env = environment(&["Prod"]);
	let mut ctx = MetaCtx::new(&mut env);
	let pair = ctx.push_local("x", BinderInfo::Default, prod(nat(), nat()));

	let on_constructor = first_by_recursion(mk_pair(nat(), nat(), Expr::nat_lit(4), Expr::nat_lit(5)));
	assert_eq!(ctx.whnf(&on_constructor).unwrap(), Expr::nat_lit(4));

	let e = first_by_recursion(pair.clone());
	assert_eq!(ctx.whnf(&e).unwrap(), Expr::proj(Name::new("Prod"), 0, pair.clone()));
	assert!(ctx.is_def_eq(&e, &fst(nat(), nat(), pair)).unwrap());

	ctx.config.eta_struct = EtaStructMode::None;
	let stuck = ctx.whnf(&e).unwrap();
	assert_eq!(stuck.get_app_fn().const_name(), Some(Name::new("Prod.rec")));
}
