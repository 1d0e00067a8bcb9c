use strata::{
	common::{BinderInfo, Name},
	ir::{
		declaration::{
			AxiomVal, ConstantInfo, ConstantVal, Declaration, InductiveDecl, ReducibilityStatus, StructureField,
			StructureInfo,
		},
		environment::Environment,
		expr::Expr,
		level::Level,
	},
	op::{
		declare::KernelError,
		meta::MetaCtx,
		projection::{find_field_path, generate_projections, mk_field_projection, StructureError},
	},
	prelude::prelude,
	report::display_structure_error,
};

use crate::common::{constant, environment, mk_pair, nat};

fn binder_infos(mut ty: &Expr) -> Vec<BinderInfo> {
	let mut infos = Vec::new();
	while let Expr::Pi { info, body, .. } = ty {
		infos.push(*info);
		ty = body;
	}
	infos
}

fn generate(structure: &str, add_as_unsafe: bool) -> (Environment, Result<usize, StructureError>) {
	let mut env = prelude().expect("prelude");
	let result = {
		let mut ctx = MetaCtx::new(&mut env);
		generate_projections(&mut ctx, Name::new(structure), add_as_unsafe).map(|fields| fields.len())
	};
	(env, result)
}

#[test]
fn generates_one_abbreviation_per_field() {
	let (env, result) = generate("Prod", false);
	assert_eq!(result.unwrap(), 2);

	for (index, name) in ["Prod.fst", "Prod.snd"].into_iter().enumerate() {
		let name = Name::new(name);
		let Some(ConstantInfo::Definition(definition)) = env.find(name) else {
			panic!("`{name}` is not a definition");
		};
		assert!(!definition.is_unsafe);
		assert_eq!(env.reducibility(name), ReducibilityStatus::Default);

		let info = env.projection_info(name).unwrap();
		assert_eq!(info.structure, Name::new("Prod"));
		assert_eq!(info.ctor, Name::new("Prod.mk"));
		assert_eq!(info.index as usize, index);
		assert_eq!(info.num_params, 2);
		assert!(!info.from_class);
	}
}

#[test]
fn parameters_become_implicit() {
	let env = environment(&["Prod"]);
	let ty = env.find(Name::new("Prod.fst")).unwrap().ty();
	assert_eq!(binder_infos(ty), vec![BinderInfo::Implicit, BinderInfo::Implicit, BinderInfo::Default]);
}

#[test]
fn projection_reduces_on_constructor() {
	let mut env = environment(&["Prod"]);
	let mut ctx = MetaCtx::new(&mut env);
	let pair = mk_pair(nat(), nat(), Expr::nat_lit(1), Expr::nat_lit(2));
	let levels = [Level::zero(), Level::zero()];

	let first = Expr::app_n(Expr::const_("Prod.fst", levels.clone()), [nat(), nat(), pair.clone()]);
	assert_eq!(ctx.whnf(&first).unwrap(), Expr::nat_lit(1));

	let second = Expr::app_n(Expr::const_("Prod.snd", levels), [nat(), nat(), pair]);
	assert!(ctx.is_def_eq(&second, &Expr::nat_lit(2)).unwrap());
	assert!(!ctx.is_def_eq(&second, &Expr::nat_lit(1)).unwrap());
}

#[test]
fn proof_field_becomes_theorem() {
	let (env, result) = generate("Subtype", false);
	assert_eq!(result.unwrap(), 2);
	assert!(matches!(env.find(Name::new("Subtype.val")), Some(ConstantInfo::Definition(_))));
	assert!(matches!(env.find(Name::new("Subtype.property")), Some(ConstantInfo::Theorem(_))));

	// The proof's type refers to the earlier field through its projection.
	let ty = env.find(Name::new("Subtype.property")).unwrap().ty();
	assert!(ty.constants().contains(&Name::new("Subtype.val")));
	assert!(env.projection_info(Name::new("Subtype.property")).is_some());
}

#[test]
fn proposition_structure_has_theorem_projections() {
	let (env, result) = generate("And", false);
	assert_eq!(result.unwrap(), 2);
	for name in ["And.left", "And.right"] {
		assert!(matches!(env.find(Name::new(name)), Some(ConstantInfo::Theorem(_))));
	}
}

#[test]
fn proposition_with_data_field_fails() {
	let (env, result) = generate("Exists", false);
	match result {
		Err(StructureError::ProjectionGenerationFailed { structure, field, found, .. }) => {
			assert_eq!(structure, Name::new("Exists"));
			assert_eq!(field, Name::new("w"));
			assert!(found.is_none());
		}
		other => panic!("unexpected result {other:?}"),
	}
	assert!(!env.contains(Name::new("Exists.w")));
}

#[test]
fn class_self_binder_is_instance_implicit() {
	let env = environment(&["Inhabited"]);
	let ty = env.find(Name::new("Inhabited.default")).unwrap().ty();
	assert_eq!(binder_infos(ty), vec![BinderInfo::Implicit, BinderInfo::InstImplicit]);
	assert!(env.projection_info(Name::new("Inhabited.default")).unwrap().from_class);
}

#[test]
fn rejects_non_structures() {
	let (_, result) = generate("Nat", false);
	assert!(matches!(result, Err(StructureError::NotExactlyOneConstructor { count: 2, .. })));

	let (_, result) = generate("NotAnInductiveConst", false);
	assert!(matches!(result, Err(StructureError::NotAStructure(_))));

	let (_, result) = generate("String", false);
	assert!(matches!(result, Err(StructureError::NotAStructure(_))));

	let (_, result) = generate("Eq", false);
	assert!(matches!(result, Err(StructureError::NotAStructure(_))));
}

#[test]
fn field_count_mismatch_generates_nothing() {
	let mut env = prelude().unwrap();
	env.register_structure(StructureInfo {
		name: Name::new("Point"),
		fields: vec![StructureField { name: Name::new("x"), subobject: None }],
	});
	let result = generate_projections(&mut MetaCtx::new(&mut env), Name::new("Point"), false);
	assert!(matches!(result, Err(StructureError::IllFormedInductive { .. })));
	assert!(!env.contains(Name::new("Point.x")));
}

#[test]
fn unsafe_structure_has_unsafe_projections() {
	let (env, result) = generate("Wrapper", false);
	assert_eq!(result.unwrap(), 1);
	assert!(env.is_unsafe_const(Name::new("Wrapper.val")));
}

#[test]
fn unsafe_proofs_are_irreducible() {
	let (env, result) = generate("Subtype", true);
	assert_eq!(result.unwrap(), 2);

	let val = Name::new("Subtype.val");
	assert!(matches!(env.find(val), Some(ConstantInfo::Definition(definition)) if definition.is_unsafe));
	assert_eq!(env.reducibility(val), ReducibilityStatus::Default);

	let property = Name::new("Subtype.property");
	assert!(matches!(env.find(property), Some(ConstantInfo::Opaque(opaque)) if opaque.is_unsafe));
	assert_eq!(env.reducibility(property), ReducibilityStatus::Irreducible);
}

#[test]
fn failure_keeps_earlier_projections() {
	let mut env = prelude().unwrap();
	let taken = AxiomVal { val: ConstantVal::new("Prod.snd", vec![], Expr::type_()), is_unsafe: false };
	env.add_decl(Declaration::Axiom(taken)).unwrap();

	let result = generate_projections(&mut MetaCtx::new(&mut env), Name::new("Prod"), false);
	match result {
		Err(StructureError::Declaration { projection, source: KernelError::AlreadyDeclared(name) }) => {
			assert_eq!(projection, Name::new("Prod.snd"));
			assert_eq!(name, projection);
		}
		other => panic!("unexpected result {other:?}"),
	}
	assert!(env.projection_info(Name::new("Prod.fst")).is_some());
	assert!(env.projection_info(Name::new("Prod.snd")).is_none());
}

#[test]
fn instance_fields_bind_instance_locals() {
	let mut env = prelude().unwrap();
	let fields = generate_projections(&mut MetaCtx::new(&mut env), Name::new("Pointed"), false).unwrap();
	let summary: Vec<_> = fields.iter().map(|field| (field.name.as_str(), field.is_out_param, field.local_info)).collect();
	assert_eq!(summary, vec![
		("inst", false, BinderInfo::InstImplicit),
		("witness", true, BinderInfo::Default),
		("point", false, BinderInfo::Default),
	]);
	assert_eq!(fields[1].info, BinderInfo::InstImplicit);

	// Annotations do not survive into the projection type.
	let ty = env.find(Name::new("Pointed.witness")).unwrap().ty();
	assert!(!ty.constants().contains(&Name::new("outParam")));
}

#[test]
fn optional_parameter_annotation_is_consumed() {
	let env = environment(&["Config"]);
	let ty = env.find(Name::new("Config.depth")).unwrap().ty();
	assert_eq!(*ty, Expr::pi("self", BinderInfo::Default, constant("Config"), nat()));
}

#[test]
fn fields_are_found_through_subobjects() {
	let mut env = environment(&["Point", "Point3"]);
	let (point3, x, z) = (Name::new("Point3"), Name::new("x"), Name::new("z"));
	assert_eq!(find_field_path(&env, point3, x), Some(vec![Name::new("Point3.toPoint"), Name::new("Point.x")]));
	assert_eq!(find_field_path(&env, point3, z), Some(vec![Name::new("Point3.z")]));
	assert_eq!(find_field_path(&env, point3, Name::new("w")), None);

	let mut ctx = MetaCtx::new(&mut env);
	let point = Expr::app_n(constant("Point.mk"), [Expr::nat_lit(1), Expr::nat_lit(2)]);
	let value = Expr::app_n(constant("Point3.mk"), [point, Expr::nat_lit(3)]);
	let projection = mk_field_projection(&mut ctx, &value, x).unwrap().unwrap();
	let expected = Expr::app(constant("Point.x"), Expr::app(constant("Point3.toPoint"), value.clone()));
	assert_eq!(projection, expected);
	assert_eq!(ctx.whnf(&projection).unwrap(), Expr::nat_lit(1));
	assert!(mk_field_projection(&mut ctx, &value, Name::new("w")).unwrap().is_none());
}

#[test]
fn failures_render_with_types() {
	let (_, result) = generate("Exists", false);
	let report = display_structure_error(&result.unwrap_err());
	assert!(report.contains("Exists"));
	assert!(report.contains("expected: "));
}

#[test]
fn rejected_declarations_leave_version_alone() {
	let mut env = prelude().unwrap();
	let version = env.version();

	// The constructor does not build a `Bad`.
	let bad = InductiveDecl {
		name: Name::new("Bad"),
		level_params: vec![],
		ty: Expr::type_(),
		num_params: 0,
		constructors: vec![(Name::new("Bad.mk"), nat())],
		is_unsafe: false,
	};
	assert!(env.add_inductive(bad).is_err());
	assert!(!env.contains(Name::new("Bad")));
	assert_eq!(env.version(), version);

	let ill_typed = AxiomVal { val: ConstantVal::new("bad", vec![], Expr::nat_lit(0)), is_unsafe: false };
	assert!(env.add_decl(Declaration::Axiom(ill_typed)).is_err());
	assert_eq!(env.version(), version);

	generate_projections(&mut MetaCtx::new(&mut env), Name::new("Prod"), false).unwrap();
	assert!(env.version() > version);
}
