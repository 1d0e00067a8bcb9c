//! A small built-in environment: the annotation wrappers, a few core inductives
//! and some sample structures to generate projections for.

use crate::{
	common::{BinderInfo, Name},
	ir::{
		declaration::{
			AxiomVal, ConstantVal, Declaration, DefinitionVal, InductiveDecl, ReducibilityHints, ReducibilityStatus,
			StructureField, StructureInfo,
		},
		environment::Environment,
		expr::Expr,
		level::Level,
		telescope::Telescope,
	},
	op::declare::KernelError,
};

/// Structures declared by [`prelude`], in declaration order.
pub const STRUCTURES: &[&str] = &[
	"True", "Prod", "Subtype", "And", "Exists", "Inhabited", "Pointed", "Point", "Point3", "Config", "Wrapper",
];

pub fn prelude() -> Result<Environment, KernelError> {
	let mut env = Environment::new();
	declare_annotations(&mut env)?;
	declare_core(&mut env)?;
	declare_structures(&mut env)?;
	Ok(env)
}

fn nat() -> Expr { Expr::const_("Nat", []) }

fn sort_param(name: &str) -> Expr { Expr::sort(Level::param(name)) }

fn explicit() -> BinderInfo { BinderInfo::Default }

/// Collects the parameters and fields of a one-constructor inductive.
pub struct StructureBuilder {
	name: Name,
	ctor: Name,
	level_params: Vec<Name>,
	params: Telescope,
	fields: Telescope,
	field_names: Vec<StructureField>,
	is_unsafe: bool,
}

impl StructureBuilder {
	pub fn new(name: impl Into<Name>, ctor: &str, level_params: &[&str]) -> Self {
		let name = name.into();
		Self {
			name,
			ctor: name.str(ctor),
			level_params: level_params.iter().map(|param| Name::new(param)).collect(),
			params: Telescope::new(),
			fields: Telescope::new(),
			field_names: Vec::new(),
			is_unsafe: false,
		}
	}

	pub fn unsafe_(mut self) -> Self {
		self.is_unsafe = true;
		self
	}

	pub fn param(&mut self, name: &str, info: BinderInfo, ty: Expr) -> Expr { self.params.bind(name, info, ty) }

	pub fn field(&mut self, name: &str, info: BinderInfo, ty: Expr) -> Expr {
		self.field_names.push(StructureField { name: Name::new(name), subobject: None });
		self.fields.bind(name, info, ty)
	}

	/// A field holding a whole parent structure.
	pub fn subobject(&mut self, name: &str, parent: impl Into<Name>, ty: Expr) -> Expr {
		self.field_names.push(StructureField { name: Name::new(name), subobject: Some(parent.into()) });
		self.fields.bind(name, explicit(), ty)
	}

	/// `S.{us} params`
	pub fn self_type(&self) -> Expr {
		let levels = self.level_params.iter().map(|param| Level::param(*param));
		Expr::app_n(Expr::const_(self.name, levels), self.params.fvars())
	}

	pub fn declare(self, env: &mut Environment, sort: Level) -> Result<(), KernelError> {
		let mut telescope = self.params.clone();
		telescope.extend(&self.fields);
		let ctor_ty = telescope.pi(self.self_type());
		env.add_inductive(InductiveDecl {
			name: self.name,
			level_params: self.level_params,
			ty: self.params.pi(Expr::sort(sort)),
			num_params: self.params.len() as u32,
			constructors: vec![(self.ctor, ctor_ty)],
			is_unsafe: self.is_unsafe,
		})?;
		env.register_structure(StructureInfo { name: self.name, fields: self.field_names });
		Ok(())
	}
}

fn declare_annotations(env: &mut Environment) -> Result<(), KernelError> {
	// outParam.{u} (α : Sort u) : Sort u := α, and likewise semiOutParam.
	for name in ["outParam", "semiOutParam"] {
		let mut telescope = Telescope::new();
		let alpha = telescope.bind("α", explicit(), sort_param("u"));
		add_abbrev(env, name, telescope.pi(sort_param("u")), telescope.lambda(alpha))?;
	}

	env.add_decl(Declaration::Axiom(AxiomVal { val: ConstantVal::new("String", vec![], Expr::type_()), is_unsafe: false }))?;

	// optParam.{u} (α : Sort u) (default : α) : Sort u := α, and autoParam with a tactic name.
	for (name, extra, extra_ty) in [("optParam", "default", None), ("autoParam", "tactic", Some(Expr::const_("String", [])))] {
		let mut telescope = Telescope::new();
		let alpha = telescope.bind("α", explicit(), sort_param("u"));
		telescope.bind(extra, explicit(), extra_ty.unwrap_or_else(|| alpha.clone()));
		add_abbrev(env, name, telescope.pi(sort_param("u")), telescope.lambda(alpha))?;
	}
	Ok(())
}

fn add_abbrev(env: &mut Environment, name: &str, ty: Expr, value: Expr) -> Result<(), KernelError> {
	env.add_decl(Declaration::Definition(DefinitionVal {
		val: ConstantVal::new(name, vec![Name::new("u")], ty),
		value,
		hints: ReducibilityHints::Abbrev,
		is_unsafe: false,
	}))?;
	env.set_reducibility(Name::new(name), ReducibilityStatus::Reducible);
	Ok(())
}

fn declare_core(env: &mut Environment) -> Result<(), KernelError> {
	env.add_inductive(InductiveDecl {
		name: Name::new("Nat"),
		level_params: vec![],
		ty: Expr::type_(),
		num_params: 0,
		constructors: vec![(Name::new("Nat.zero"), nat()), (Name::new("Nat.succ"), Expr::arrow(nat(), nat()))],
		is_unsafe: false,
	})?;

	// Eq.{u} {α : Sort u} (a : α) : α → Prop
	let mut params = Telescope::new();
	let alpha = params.bind("α", BinderInfo::Implicit, sort_param("u"));
	let a = params.bind("a", explicit(), alpha.clone());
	let eq = Expr::const_("Eq", [Level::param("u")]);
	let refl = params.pi(Expr::app_n(eq, [alpha.clone(), a.clone(), a]));
	let ty = params.pi(Expr::arrow(alpha, Expr::prop()));
	env.add_inductive(InductiveDecl {
		name: Name::new("Eq"),
		level_params: vec![Name::new("u")],
		ty,
		num_params: 2,
		constructors: vec![(Name::new("Eq.refl"), refl)],
		is_unsafe: false,
	})
}

fn declare_structures(env: &mut Environment) -> Result<(), KernelError> {
	let (u, v) = (Level::param("u"), Level::param("v"));

	StructureBuilder::new("True", "intro", &[]).declare(env, Level::zero())?;

	let mut prod = StructureBuilder::new("Prod", "mk", &["u", "v"]);
	let alpha = prod.param("α", explicit(), Expr::sort(Level::succ(u.clone())));
	let beta = prod.param("β", explicit(), Expr::sort(Level::succ(v.clone())));
	prod.field("fst", explicit(), alpha);
	prod.field("snd", explicit(), beta);
	prod.declare(env, Level::succ(Level::max(u.clone(), v)))?;

	let mut subtype = StructureBuilder::new("Subtype", "mk", &["u"]);
	let alpha = subtype.param("α", BinderInfo::Implicit, Expr::sort(u.clone()));
	let p = subtype.param("p", explicit(), Expr::arrow(alpha.clone(), Expr::prop()));
	let val = subtype.field("val", explicit(), alpha);
	subtype.field("property", explicit(), Expr::app(p, val));
	subtype.declare(env, Level::max(Level::one(), u.clone()))?;

	let mut and = StructureBuilder::new("And", "intro", &[]);
	let a = and.param("a", explicit(), Expr::prop());
	let b = and.param("b", explicit(), Expr::prop());
	and.field("left", explicit(), a);
	and.field("right", explicit(), b);
	and.declare(env, Level::zero())?;

	let mut exists = StructureBuilder::new("Exists", "intro", &["u"]);
	let alpha = exists.param("α", BinderInfo::Implicit, Expr::sort(u.clone()));
	let p = exists.param("p", explicit(), Expr::arrow(alpha.clone(), Expr::prop()));
	let w = exists.field("w", explicit(), alpha);
	exists.field("h", explicit(), Expr::app(p, w));
	exists.declare(env, Level::zero())?;

	let mut inhabited = StructureBuilder::new("Inhabited", "mk", &["u"]);
	let alpha = inhabited.param("α", explicit(), Expr::sort(u.clone()));
	inhabited.field("default", explicit(), alpha);
	inhabited.declare(env, Level::max(Level::one(), u))?;
	env.add_class(Name::new("Inhabited"));

	let inhabited_of = |alpha: &Expr| Expr::app(Expr::const_("Inhabited", [Level::one()]), alpha.clone());
	let mut pointed = StructureBuilder::new("Pointed", "mk", &[]);
	let alpha = pointed.param("α", explicit(), Expr::type_());
	pointed.field("inst", BinderInfo::InstImplicit, inhabited_of(&alpha));
	let witness = Expr::app(Expr::const_("outParam", [Level::one()]), inhabited_of(&alpha));
	pointed.field("witness", BinderInfo::InstImplicit, witness);
	pointed.field("point", explicit(), alpha);
	pointed.declare(env, Level::one())?;

	let mut point = StructureBuilder::new("Point", "mk", &[]);
	point.field("x", explicit(), nat());
	point.field("y", explicit(), nat());
	point.declare(env, Level::one())?;

	let mut point3 = StructureBuilder::new("Point3", "mk", &[]);
	point3.subobject("toPoint", "Point", Expr::const_("Point", []));
	point3.field("z", explicit(), nat());
	point3.declare(env, Level::one())?;

	let mut config = StructureBuilder::new("Config", "mk", &[]);
	let depth = Expr::app_n(Expr::const_("optParam", [Level::one()]), [nat(), Expr::nat_lit(3)]);
	config.field("depth", explicit(), depth);
	config.declare(env, Level::one())?;

	env.add_decl(Declaration::Axiom(AxiomVal { val: ConstantVal::new("Sketchy", vec![], Expr::type_()), is_unsafe: true }))?;
	let mut wrapper = StructureBuilder::new("Wrapper", "mk", &[]).unsafe_();
	wrapper.field("val", explicit(), Expr::const_("Sketchy", []));
	wrapper.declare(env, Level::one())
}
