use proptest::prelude::*;
use strata::{
	common::{BinderInfo, Name},
	ir::{environment::Environment, expr::Expr},
	op::{eta::eta_struct, eta::eta_struct_reduce, meta::MetaCtx},
};

use crate::common::{environment, expand_pair, fst, mk_pair, nat, prod, snd};

/// Nesting of pairs around `Nat` leaves.
#[derive(Clone, Debug)]
enum Shape {
	Leaf,
	Pair(Box<Shape>, Box<Shape>),
}

impl Shape {
	fn ty(&self) -> Expr {
		match self {
			Self::Leaf => nat(),
			Self::Pair(left, right) => prod(left.ty(), right.ty()),
		}
	}

	/// Rebuilds `value` from its projections all the way down to the leaves.
	fn expand(&self, value: Expr) -> Expr {
		match self {
			Self::Leaf => value,
			Self::Pair(left, right) => {
				let (alpha, beta) = (left.ty(), right.ty());
				let first = left.expand(fst(alpha.clone(), beta.clone(), value.clone()));
				let second = right.expand(snd(alpha.clone(), beta.clone(), value));
				mk_pair(alpha, beta, first, second)
			}
		}
	}
}

fn shape() -> impl Strategy<Value = Shape> {
	Just(Shape::Leaf).prop_recursive(4, 16, 2, |inner| {
		(inner.clone(), inner).prop_map(|(left, right)| Shape::Pair(Box::new(left), Box::new(right)))
	})
}

fn everything(_: &Environment, _: Name) -> bool { true }

proptest! {
	#![proptest_config(ProptestConfig::with_cases(64))]

	#[test]
	fn prop_expansion_collapses_to_value(shape in shape()) {
		let mut env = environment(&["Prod"]);
		let mut ctx = MetaCtx::new(&mut env);
		let value = ctx.push_local("x", BinderInfo::Default, shape.ty());
		let expanded = shape.expand(value.clone());

		let once = eta_struct_reduce(&mut ctx, &expanded, everything).unwrap();
		prop_assert_eq!(&once, &value);
		let twice = eta_struct_reduce(&mut ctx, &once, everything).unwrap();
		prop_assert_eq!(once, twice);
	}

	#[test]
	fn prop_only_matching_fields_collapse(fields in prop::collection::vec((0..2usize, any::<bool>()), 2)) {
		let mut env = environment(&["Prod"]);
		let mut ctx = MetaCtx::new(&mut env);
		let p = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));
		let q = ctx.push_local("q", BinderInfo::Default, prod(nat(), nat()));

		let arguments: Vec<Expr> = fields
			.iter()
			.map(|(index, use_p)| {
				let base = if *use_p { p.clone() } else { q.clone() };
				if *index == 0 { fst(nat(), nat(), base) } else { snd(nat(), nat(), base) }
			})
			.collect();
		let e = mk_pair(nat(), nat(), arguments[0].clone(), arguments[1].clone());

		let in_order = fields[0].0 == 0 && fields[1].0 == 1;
		let expected = match (in_order, fields[0].1, fields[1].1) {
			(true, true, true) => Some(p),
			(true, false, false) => Some(q),
			_ => None,
		};
		prop_assert_eq!(eta_struct(&mut ctx, &e, everything).unwrap(), expected);
	}

	#[test]
	fn prop_reduction_preserves_unrelated_terms(n in 0u64..1000) {
		let mut env = environment(&["Prod"]);
		let mut ctx = MetaCtx::new(&mut env);
		let p = ctx.push_local("p", BinderInfo::Default, prod(nat(), nat()));
		let e = mk_pair(prod(nat(), nat()), nat(), expand_pair(nat(), nat(), p.clone()), Expr::nat_lit(n));
		let reduced = eta_struct_reduce(&mut ctx, &e, everything).unwrap();
		prop_assert_eq!(reduced, mk_pair(prod(nat(), nat()), nat(), p, Expr::nat_lit(n)));
	}
}
