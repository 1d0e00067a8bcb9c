//! Core terms in locally nameless form.
//!
//! Bound variables are de Bruijn indices (zero is the innermost binder). Binders
//! are opened by instantiating them with fresh free variables, and closed again
//! with [`Expr::abstract_fvars`].

use std::{fmt, rc::Rc};

use smallvec::SmallVec;

use super::level::Level;
use crate::{
	common::{BinderInfo, FVarId, MVarId, Name},
	utility::rc,
};

/// Universe arguments of a constant; almost always zero, one or two of them.
pub type LevelVec = SmallVec<[Level; 2]>;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Literal {
	Nat(u64),
	Str(Rc<str>),
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Expr {
	// Variables.
	BVar(u32),
	FVar(FVarId),
	MVar(MVarId),

	// Types.
	Sort(Level),

	// Constants.
	Const(Name, LevelVec),

	// Dependent functions.
	App(Rc<Self>, Rc<Self>),
	Lam {
		name: Name,
		info: BinderInfo,
		domain: Rc<Self>,
		body: Rc<Self>,
	},
	Pi {
		name: Name,
		info: BinderInfo,
		domain: Rc<Self>,
		body: Rc<Self>,
	},

	// Let-expressions.
	Let {
		name: Name,
		ty: Rc<Self>,
		value: Rc<Self>,
		body: Rc<Self>,
	},

	// Literals.
	Lit(Literal),

	// Structure projections.
	Proj {
		structure: Name,
		index: u32,
		scrutinee: Rc<Self>,
	},
}

impl Expr {
	pub fn bvar(index: u32) -> Self { Self::BVar(index) }

	pub fn fvar(id: FVarId) -> Self { Self::FVar(id) }

	pub fn mvar(id: MVarId) -> Self { Self::MVar(id) }

	pub fn sort(level: Level) -> Self { Self::Sort(level) }

	pub fn prop() -> Self { Self::Sort(Level::zero()) }

	pub fn type_() -> Self { Self::Sort(Level::one()) }

	pub fn const_(name: impl Into<Name>, levels: impl IntoIterator<Item = Level>) -> Self {
		Self::Const(name.into(), levels.into_iter().collect())
	}

	pub fn app(function: Self, argument: Self) -> Self { Self::App(rc!(function), rc!(argument)) }

	pub fn app_n(function: Self, arguments: impl IntoIterator<Item = Self>) -> Self {
		arguments.into_iter().fold(function, Self::app)
	}

	pub fn lam(name: impl Into<Name>, info: BinderInfo, domain: Self, body: Self) -> Self {
		Self::Lam { name: name.into(), info, domain: rc!(domain), body: rc!(body) }
	}

	pub fn pi(name: impl Into<Name>, info: BinderInfo, domain: Self, body: Self) -> Self {
		Self::Pi { name: name.into(), info, domain: rc!(domain), body: rc!(body) }
	}

	/// A non-dependent function type.
	pub fn arrow(domain: Self, codomain: Self) -> Self {
		Self::pi("a", BinderInfo::Default, domain, codomain.lift_loose_bvars(0, 1))
	}

	pub fn let_(name: impl Into<Name>, ty: Self, value: Self, body: Self) -> Self {
		Self::Let { name: name.into(), ty: rc!(ty), value: rc!(value), body: rc!(body) }
	}

	pub fn nat_lit(value: u64) -> Self { Self::Lit(Literal::Nat(value)) }

	pub fn proj(structure: Name, index: u32, scrutinee: Self) -> Self {
		Self::Proj { structure, index, scrutinee: rc!(scrutinee) }
	}

	pub fn is_prop(&self) -> bool { matches!(self, Self::Sort(level) if level.is_zero()) }

	pub fn const_name(&self) -> Option<Name> {
		match self {
			Self::Const(name, _) => Some(*name),
			_ => None,
		}
	}

	pub fn get_app_fn(&self) -> &Self {
		let mut head = self;
		while let Self::App(function, _) = head {
			head = function;
		}
		head
	}

	pub fn get_app_num_args(&self) -> usize {
		let mut head = self;
		let mut count = 0;
		while let Self::App(function, _) = head {
			head = function;
			count += 1;
		}
		count
	}

	pub fn get_app_args(&self) -> Vec<&Self> {
		let mut arguments = Vec::new();
		let mut head = self;
		while let Self::App(function, argument) = head {
			arguments.push(&**argument);
			head = function;
		}
		arguments.reverse();
		arguments
	}

	pub fn is_app_of(&self, name: Name, num_args: usize) -> bool {
		self.get_app_fn().const_name() == Some(name) && self.get_app_num_args() == num_args
	}

	/// Rebuilds the term, letting `f` replace any subterm. The second argument of
	/// `f` counts the binders passed on the way down.
	pub fn replace(&self, f: &mut impl FnMut(&Self, u32) -> Option<Self>) -> Self { self.replace_at(0, f) }

	fn replace_at<F: FnMut(&Self, u32) -> Option<Self>>(&self, offset: u32, f: &mut F) -> Self {
		if let Some(result) = f(self, offset) {
			return result;
		}
		match self {
			Self::BVar(_) | Self::FVar(_) | Self::MVar(_) | Self::Sort(_) | Self::Const(..) | Self::Lit(_) =>
				self.clone(),
			Self::App(function, argument) =>
				Self::App(rc!(function.replace_at(offset, f)), rc!(argument.replace_at(offset, f))),
			Self::Lam { name, info, domain, body } => Self::Lam {
				name: *name,
				info: *info,
				domain: rc!(domain.replace_at(offset, f)),
				body: rc!(body.replace_at(offset + 1, f)),
			},
			Self::Pi { name, info, domain, body } => Self::Pi {
				name: *name,
				info: *info,
				domain: rc!(domain.replace_at(offset, f)),
				body: rc!(body.replace_at(offset + 1, f)),
			},
			Self::Let { name, ty, value, body } => Self::Let {
				name: *name,
				ty: rc!(ty.replace_at(offset, f)),
				value: rc!(value.replace_at(offset, f)),
				body: rc!(body.replace_at(offset + 1, f)),
			},
			Self::Proj { structure, index, scrutinee } =>
				Self::Proj { structure: *structure, index: *index, scrutinee: rc!(scrutinee.replace_at(offset, f)) },
		}
	}

	/// Visits subterms in pre-order; `f` returns whether to descend further.
	pub fn for_each(&self, f: &mut impl FnMut(&Self, u32) -> bool) { self.for_each_at(0, f) }

	fn for_each_at<F: FnMut(&Self, u32) -> bool>(&self, offset: u32, f: &mut F) {
		if !f(self, offset) {
			return;
		}
		match self {
			Self::BVar(_) | Self::FVar(_) | Self::MVar(_) | Self::Sort(_) | Self::Const(..) | Self::Lit(_) => (),
			Self::App(function, argument) => {
				function.for_each_at(offset, f);
				argument.for_each_at(offset, f);
			}
			Self::Lam { domain, body, .. } | Self::Pi { domain, body, .. } => {
				domain.for_each_at(offset, f);
				body.for_each_at(offset + 1, f);
			}
			Self::Let { ty, value, body, .. } => {
				ty.for_each_at(offset, f);
				value.for_each_at(offset, f);
				body.for_each_at(offset + 1, f);
			}
			Self::Proj { scrutinee, .. } => scrutinee.for_each_at(offset, f),
		}
	}

	pub fn any(&self, predicate: impl Fn(&Self, u32) -> bool) -> bool {
		let mut found = false;
		self.for_each(&mut |e, offset| {
			found = found || predicate(e, offset);
			!found
		});
		found
	}

	pub fn has_loose_bvars(&self) -> bool { self.any(|e, offset| matches!(e, Self::BVar(i) if *i >= offset)) }

	pub fn has_loose_bvar(&self, index: u32) -> bool {
		self.any(|e, offset| matches!(e, Self::BVar(i) if *i == index + offset))
	}

	pub fn has_fvar(&self, id: FVarId) -> bool { self.any(|e, _| matches!(e, Self::FVar(other) if *other == id)) }

	pub fn has_mvar(&self) -> bool {
		self.any(|e, _| match e {
			Self::MVar(_) => true,
			Self::Sort(level) => level.has_mvar(),
			Self::Const(_, levels) => levels.iter().any(Level::has_mvar),
			_ => false,
		})
	}

	pub fn occurs_mvar(&self, id: MVarId) -> bool { self.any(|e, _| matches!(e, Self::MVar(other) if *other == id)) }

	/// The constants referenced by the term, in order of first occurrence.
	pub fn constants(&self) -> Vec<Name> {
		let mut names = Vec::new();
		self.for_each(&mut |e, _| {
			if let Self::Const(name, _) = e {
				if !names.contains(name) {
					names.push(*name);
				}
			}
			true
		});
		names
	}

	pub fn lift_loose_bvars(&self, start: u32, amount: u32) -> Self {
		if amount == 0 {
			return self.clone();
		}
		self.replace(&mut |e, offset| match e {
			Self::BVar(i) if *i >= start + offset => Some(Self::BVar(i + amount)),
			_ => None,
		})
	}

	/// Replaces loose bound variable `i` with `subst[subst.len() - 1 - i]`, so the
	/// last element of `subst` fills the innermost binder.
	pub fn instantiate_rev(&self, subst: &[Self]) -> Self {
		if subst.is_empty() {
			return self.clone();
		}
		let n = subst.len() as u32;
		self.replace(&mut |e, offset| match e {
			Self::BVar(i) if *i >= offset => {
				let relative = *i - offset;
				Some(if relative < n {
					subst[(n - 1 - relative) as usize].lift_loose_bvars(0, offset)
				} else {
					Self::BVar(*i - n)
				})
			}
			_ => None,
		})
	}

	pub fn instantiate(&self, value: &Self) -> Self { self.instantiate_rev(std::slice::from_ref(value)) }

	/// Turns free variables into loose bound variables; the last of `fvars`
	/// becomes bound variable zero.
	pub fn abstract_fvars(&self, fvars: &[FVarId]) -> Self {
		if fvars.is_empty() {
			return self.clone();
		}
		let n = fvars.len() as u32;
		self.replace(&mut |e, offset| match e {
			Self::FVar(id) => fvars.iter().rposition(|fvar| fvar == id).map(|j| Self::BVar(offset + n - 1 - j as u32)),
			_ => None,
		})
	}

	/// Applies the term to `arguments`, substituting into as many leading
	/// lambdas as there are arguments.
	pub fn beta(&self, arguments: &[Self]) -> Self {
		let mut body = self;
		let mut consumed = 0;
		while consumed < arguments.len() {
			let Self::Lam { body: inner, .. } = body else {
				break;
			};
			body = inner;
			consumed += 1;
		}
		Self::app_n(body.instantiate_rev(&arguments[..consumed]), arguments[consumed..].iter().cloned())
	}

	pub fn instantiate_level_params(&self, params: &[Name], levels: &[Level]) -> Self {
		if params.is_empty() {
			return self.clone();
		}
		self.replace(&mut |e, _| match e {
			Self::Sort(level) => Some(Self::Sort(level.instantiate_params(params, levels))),
			Self::Const(name, arguments) => Some(Self::Const(
				*name,
				arguments.iter().map(|level| level.instantiate_params(params, levels)).collect(),
			)),
			_ => None,
		})
	}

	fn write(&self, f: &mut fmt::Formatter<'_>, names: &mut Vec<Name>) -> fmt::Result {
		match self {
			Self::BVar(i) => match names.len().checked_sub(*i as usize + 1) {
				Some(position) => write!(f, "{}", names[position]),
				None => write!(f, "#{i}"),
			},
			Self::FVar(FVarId(id)) => write!(f, "_fvar.{id}"),
			Self::MVar(MVarId(id)) => write!(f, "?m.{id}"),
			Self::Sort(level) if level.is_zero() => write!(f, "Prop"),
			Self::Sort(level) if *level == Level::one() => write!(f, "Type"),
			Self::Sort(level) => write!(f, "Sort {level}"),
			Self::Const(name, levels) if levels.is_empty() => write!(f, "{name}"),
			Self::Const(name, levels) => {
				write!(f, "{name}.{{")?;
				for (i, level) in levels.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{level}")?;
				}
				write!(f, "}}")
			}
			Self::App(..) => {
				self.get_app_fn().write_argument(f, names)?;
				for argument in self.get_app_args() {
					write!(f, " ")?;
					argument.write_argument(f, names)?;
				}
				Ok(())
			}
			Self::Lam { name, domain, body, .. } => {
				write!(f, "fun ({name} : ")?;
				domain.write(f, names)?;
				write!(f, ") => ")?;
				names.push(*name);
				let result = body.write(f, names);
				names.pop();
				result
			}
			Self::Pi { name, info, domain, body } => {
				if info.is_explicit() && !body.has_loose_bvar(0) {
					domain.write_argument(f, names)?;
					write!(f, " → ")?;
				} else {
					let (open, close) = match info {
						BinderInfo::Default => ("(", ")"),
						BinderInfo::Implicit => ("{", "}"),
						BinderInfo::StrictImplicit => ("⦃", "⦄"),
						BinderInfo::InstImplicit => ("[", "]"),
					};
					write!(f, "{open}{name} : ")?;
					domain.write(f, names)?;
					write!(f, "{close} → ")?;
				}
				names.push(*name);
				let result = body.write(f, names);
				names.pop();
				result
			}
			Self::Let { name, ty, value, body } => {
				write!(f, "let {name} : ")?;
				ty.write(f, names)?;
				write!(f, " := ")?;
				value.write(f, names)?;
				write!(f, "; ")?;
				names.push(*name);
				let result = body.write(f, names);
				names.pop();
				result
			}
			Self::Lit(Literal::Nat(value)) => write!(f, "{value}"),
			Self::Lit(Literal::Str(value)) => write!(f, "{value:?}"),
			Self::Proj { index, scrutinee, .. } => {
				scrutinee.write_argument(f, names)?;
				write!(f, ".{}", index + 1)
			}
		}
	}

	fn write_argument(&self, f: &mut fmt::Formatter<'_>, names: &mut Vec<Name>) -> fmt::Result {
		match self {
			Self::App(..) | Self::Lam { .. } | Self::Pi { .. } | Self::Let { .. } => {
				write!(f, "(")?;
				self.write(f, names)?;
				write!(f, ")")
			}
			Self::Sort(level) if !level.is_zero() && *level != Level::one() => {
				write!(f, "(")?;
				self.write(f, names)?;
				write!(f, ")")
			}
			_ => self.write(f, names),
		}
	}
}

impl fmt::Display for Expr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.write(f, &mut Vec::new()) }
}
