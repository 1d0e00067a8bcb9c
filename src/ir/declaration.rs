use super::expr::Expr;
use crate::common::Name;

#[derive(Clone, Debug)]
pub struct ConstantVal {
	pub name: Name,
	pub level_params: Vec<Name>,
	pub ty: Expr,
}

impl ConstantVal {
	pub fn new(name: impl Into<Name>, level_params: Vec<Name>, ty: Expr) -> Self {
		Self { name: name.into(), level_params, ty }
	}
}

/// Hints for lazy delta reduction: definitions with larger heights are unfolded first.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReducibilityHints {
	Opaque,
	Abbrev,
	Regular(u32),
}

impl ReducibilityHints {
	pub fn height(self) -> u32 {
		match self {
			Self::Opaque => 0,
			Self::Abbrev => u32::MAX,
			Self::Regular(height) => height,
		}
	}
}

/// Whether automatic unfolding treats a declaration as transparent.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum ReducibilityStatus {
	Reducible,
	#[default]
	Default,
	Irreducible,
}

#[derive(Clone, Debug)]
pub struct AxiomVal {
	pub val: ConstantVal,
	pub is_unsafe: bool,
}

#[derive(Clone, Debug)]
pub struct DefinitionVal {
	pub val: ConstantVal,
	pub value: Expr,
	pub hints: ReducibilityHints,
	pub is_unsafe: bool,
}

#[derive(Clone, Debug)]
pub struct TheoremVal {
	pub val: ConstantVal,
	pub value: Expr,
}

#[derive(Clone, Debug)]
pub struct OpaqueVal {
	pub val: ConstantVal,
	pub value: Expr,
	pub is_unsafe: bool,
}

#[derive(Clone, Debug)]
pub struct InductiveVal {
	pub val: ConstantVal,
	pub num_params: u32,
	pub num_indices: u32,
	pub ctors: Vec<Name>,
	pub is_rec: bool,
	pub is_unsafe: bool,
}

#[derive(Clone, Debug)]
pub struct ConstructorVal {
	pub val: ConstantVal,
	pub induct: Name,
	pub cidx: u32,
	pub num_params: u32,
	pub num_fields: u32,
	pub is_unsafe: bool,
}

/// The iota rule for one constructor: `rhs` takes the parameters, motive and
/// minor premises of the recursor followed by the constructor's fields.
#[derive(Clone, Debug)]
pub struct RecursorRule {
	pub ctor: Name,
	pub num_fields: u32,
	pub rhs: Expr,
}

/// A recursor taking, in order, parameters, the motive, minor premises and the
/// major premise.
#[derive(Clone, Debug)]
pub struct RecursorVal {
	pub val: ConstantVal,
	pub induct: Name,
	pub num_params: u32,
	pub num_minors: u32,
	pub rules: Vec<RecursorRule>,
	pub is_unsafe: bool,
}

impl RecursorVal {
	pub fn major_index(&self) -> usize { (self.num_params + 1 + self.num_minors) as usize }
}

#[derive(Clone, Debug)]
pub enum ConstantInfo {
	Axiom(AxiomVal),
	Definition(DefinitionVal),
	Theorem(TheoremVal),
	Opaque(OpaqueVal),
	Inductive(InductiveVal),
	Constructor(ConstructorVal),
	Recursor(RecursorVal),
}

impl ConstantInfo {
	pub fn constant_val(&self) -> &ConstantVal {
		match self {
			Self::Axiom(info) => &info.val,
			Self::Definition(info) => &info.val,
			Self::Theorem(info) => &info.val,
			Self::Opaque(info) => &info.val,
			Self::Inductive(info) => &info.val,
			Self::Constructor(info) => &info.val,
			Self::Recursor(info) => &info.val,
		}
	}

	pub fn name(&self) -> Name { self.constant_val().name }

	pub fn ty(&self) -> &Expr { &self.constant_val().ty }

	pub fn level_params(&self) -> &[Name] { &self.constant_val().level_params }

	pub fn is_unsafe(&self) -> bool {
		match self {
			Self::Axiom(info) => info.is_unsafe,
			Self::Definition(info) => info.is_unsafe,
			Self::Theorem(_) => false,
			Self::Opaque(info) => info.is_unsafe,
			Self::Inductive(info) => info.is_unsafe,
			Self::Constructor(info) => info.is_unsafe,
			Self::Recursor(info) => info.is_unsafe,
		}
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Self::Axiom(_) => "axiom",
			Self::Definition(_) => "definition",
			Self::Theorem(_) => "theorem",
			Self::Opaque(_) => "opaque",
			Self::Inductive(_) => "inductive",
			Self::Constructor(_) => "constructor",
			Self::Recursor(_) => "recursor",
		}
	}
}

/// A declaration accepted by [`Environment::add_decl`](super::environment::Environment).
#[derive(Clone, Debug)]
pub enum Declaration {
	Axiom(AxiomVal),
	Definition(DefinitionVal),
	Theorem(TheoremVal),
	Opaque(OpaqueVal),
}

impl Declaration {
	pub fn constant_val(&self) -> &ConstantVal {
		match self {
			Self::Axiom(info) => &info.val,
			Self::Definition(info) => &info.val,
			Self::Theorem(info) => &info.val,
			Self::Opaque(info) => &info.val,
		}
	}

	pub fn name(&self) -> Name { self.constant_val().name }

	pub fn value(&self) -> Option<&Expr> {
		match self {
			Self::Axiom(_) => None,
			Self::Definition(info) => Some(&info.value),
			Self::Theorem(info) => Some(&info.value),
			Self::Opaque(info) => Some(&info.value),
		}
	}

	pub fn is_unsafe(&self) -> bool {
		match self {
			Self::Axiom(info) => info.is_unsafe,
			Self::Definition(info) => info.is_unsafe,
			Self::Theorem(_) => false,
			Self::Opaque(info) => info.is_unsafe,
		}
	}
}

impl From<Declaration> for ConstantInfo {
	fn from(declaration: Declaration) -> Self {
		match declaration {
			Declaration::Axiom(info) => Self::Axiom(info),
			Declaration::Definition(info) => Self::Definition(info),
			Declaration::Theorem(info) => Self::Theorem(info),
			Declaration::Opaque(info) => Self::Opaque(info),
		}
	}
}

/// An inductive type submitted to [`Environment::add_inductive`](super::environment::Environment).
#[derive(Clone, Debug)]
pub struct InductiveDecl {
	pub name: Name,
	pub level_params: Vec<Name>,
	pub ty: Expr,
	pub num_params: u32,
	pub constructors: Vec<(Name, Expr)>,
	pub is_unsafe: bool,
}

#[derive(Clone, Debug)]
pub struct StructureField {
	pub name: Name,
	/// The parent structure this field embeds, if it is a subobject field.
	pub subobject: Option<Name>,
}

/// Declared field names of a structure, as written at its declaration.
#[derive(Clone, Debug)]
pub struct StructureInfo {
	pub name: Name,
	pub fields: Vec<StructureField>,
}

impl StructureInfo {
	pub fn field_index(&self, field: Name) -> Option<usize> { self.fields.iter().position(|f| f.name == field) }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ProjectionInfo {
	pub structure: Name,
	pub ctor: Name,
	pub index: u32,
	pub name: Name,
	pub num_params: u32,
	pub from_class: bool,
}
