use strata::{
	common::Name,
	ir::{environment::Environment, expr::Expr, level::Level},
	op::{meta::MetaCtx, projection::generate_projections},
	prelude::prelude,
};

/// The prelude with projections generated for `structures`.
pub fn environment(structures: &[&str]) -> Environment {
	let mut env = prelude().expect("prelude");
	for structure in structures {
		let mut ctx = MetaCtx::new(&mut env);
		generate_projections(&mut ctx, Name::new(structure), false).expect(structure);
	}
	env
}

pub fn constant(name: &str) -> Expr { Expr::const_(name, []) }

pub fn nat() -> Expr { constant("Nat") }

fn prod_const(name: &str) -> Expr { Expr::const_(name, [Level::zero(), Level::zero()]) }

/// `Prod.{0, 0} α β`
pub fn prod(alpha: Expr, beta: Expr) -> Expr { Expr::app_n(prod_const("Prod"), [alpha, beta]) }

pub fn fst(alpha: Expr, beta: Expr, pair: Expr) -> Expr { Expr::app_n(prod_const("Prod.fst"), [alpha, beta, pair]) }

pub fn snd(alpha: Expr, beta: Expr, pair: Expr) -> Expr { Expr::app_n(prod_const("Prod.snd"), [alpha, beta, pair]) }

pub fn mk_pair(alpha: Expr, beta: Expr, first: Expr, second: Expr) -> Expr {
	Expr::app_n(prod_const("Prod.mk"), [alpha, beta, first, second])
}

/// `Prod.mk α β (Prod.fst α β pair) (Prod.snd α β pair)`
pub fn expand_pair(alpha: Expr, beta: Expr, pair: Expr) -> Expr {
	let first = fst(alpha.clone(), beta.clone(), pair.clone());
	let second = snd(alpha.clone(), beta.clone(), pair);
	mk_pair(alpha, beta, first, second)
}

/// `Point.mk (Point.x p) (Point.y p)`
pub fn expand_point(point: Expr) -> Expr {
	let x = Expr::app(constant("Point.x"), point.clone());
	let y = Expr::app(constant("Point.y"), point);
	Expr::app_n(constant("Point.mk"), [x, y])
}
