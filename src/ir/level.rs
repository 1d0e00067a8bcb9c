//! Universe levels.
//!
//! Levels are compared by normal form: a flattened `max` of offset atoms, where
//! an atom is a parameter, a metavariable, zero, or an `imax` whose right-hand
//! side may still vanish.

use std::{fmt, rc::Rc};

use crate::{
	common::{LevelMVarId, Name},
	utility::rc,
};

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Level {
	Zero,
	Succ(Rc<Self>),
	Max(Rc<Self>, Rc<Self>),
	IMax(Rc<Self>, Rc<Self>),
	Param(Name),
	MVar(LevelMVarId),
}

impl Level {
	pub fn zero() -> Self { Self::Zero }

	pub fn one() -> Self { Self::succ(Self::Zero) }

	pub fn succ(level: Self) -> Self { Self::Succ(rc!(level)) }

	pub fn max(left: Self, right: Self) -> Self { Self::Max(rc!(left), rc!(right)) }

	pub fn imax(left: Self, right: Self) -> Self { Self::IMax(rc!(left), rc!(right)) }

	pub fn param(name: impl Into<Name>) -> Self { Self::Param(name.into()) }

	pub fn is_zero(&self) -> bool { matches!(self, Self::Zero) }

	/// Whether the level is positive under every assignment of its parameters.
	pub fn is_never_zero(&self) -> bool {
		match self {
			Self::Zero | Self::Param(_) | Self::MVar(_) => false,
			Self::Succ(_) => true,
			Self::Max(left, right) => left.is_never_zero() || right.is_never_zero(),
			Self::IMax(_, right) => right.is_never_zero(),
		}
	}

	pub fn has_mvar(&self) -> bool {
		match self {
			Self::MVar(_) => true,
			Self::Zero | Self::Param(_) => false,
			Self::Succ(level) => level.has_mvar(),
			Self::Max(left, right) | Self::IMax(left, right) => left.has_mvar() || right.has_mvar(),
		}
	}

	pub fn occurs(&self, mvar: LevelMVarId) -> bool {
		match self {
			Self::MVar(other) => *other == mvar,
			Self::Zero | Self::Param(_) => false,
			Self::Succ(level) => level.occurs(mvar),
			Self::Max(left, right) | Self::IMax(left, right) => left.occurs(mvar) || right.occurs(mvar),
		}
	}

	/// Rebuilds the level bottom-up, letting `f` replace any subterm.
	pub fn replace(&self, f: &mut impl FnMut(&Self) -> Option<Self>) -> Self {
		if let Some(result) = f(self) {
			return result;
		}
		match self {
			Self::Zero | Self::Param(_) | Self::MVar(_) => self.clone(),
			Self::Succ(level) => Self::succ(level.replace(f)),
			Self::Max(left, right) => Self::max(left.replace(f), right.replace(f)),
			Self::IMax(left, right) => Self::imax(left.replace(f), right.replace(f)),
		}
	}

	pub fn instantiate_params(&self, params: &[Name], levels: &[Self]) -> Self {
		self.replace(&mut |level| match level {
			Self::Param(name) => params.iter().position(|param| param == name).and_then(|i| levels.get(i)).cloned(),
			_ => None,
		})
	}

	pub fn add_offset(self, offset: u32) -> Self { (0..offset).fold(self, |level, _| Self::succ(level)) }

	fn collect_atoms(&self, offset: u32, atoms: &mut Vec<(Self, u32)>) {
		match self {
			Self::Zero | Self::Param(_) | Self::MVar(_) => atoms.push((self.clone(), offset)),
			Self::Succ(level) => level.collect_atoms(offset + 1, atoms),
			Self::Max(left, right) => {
				left.collect_atoms(offset, atoms);
				right.collect_atoms(offset, atoms);
			}
			Self::IMax(left, right) => {
				let right = right.normalize();
				if right.is_never_zero() {
					left.collect_atoms(offset, atoms);
					right.collect_atoms(offset, atoms);
				} else if right.is_zero() {
					atoms.push((Self::Zero, offset));
				} else {
					let left = left.normalize();
					if left.is_zero() || left == right {
						right.collect_atoms(offset, atoms);
					} else {
						atoms.push((Self::IMax(rc!(left), rc!(right)), offset));
					}
				}
			}
		}
	}

	pub fn normalize(&self) -> Self {
		let mut atoms = Vec::new();
		self.collect_atoms(0, &mut atoms);
		atoms.sort();

		// Atoms are sorted by base, then offset, so the last one of each base wins.
		let mut maximal: Vec<(Self, u32)> = Vec::new();
		for (base, offset) in atoms {
			match maximal.last_mut() {
				Some((last, last_offset)) if *last == base => *last_offset = offset,
				_ => maximal.push((base, offset)),
			}
		}

		let largest_offset = maximal.iter().filter(|(base, _)| !base.is_zero()).map(|(_, offset)| *offset).max();
		if let Some(largest_offset) = largest_offset {
			maximal.retain(|(base, offset)| !base.is_zero() || *offset > largest_offset);
		}

		let mut levels = maximal.into_iter().map(|(base, offset)| base.add_offset(offset));
		let first = levels.next().unwrap_or(Self::Zero);
		levels.fold(first, Self::max)
	}

	pub fn is_equiv(&self, other: &Self) -> bool { self == other || self.normalize() == other.normalize() }
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut base = self;
		let mut offset = 0;
		while let Self::Succ(level) = base {
			base = level;
			offset += 1;
		}
		match base {
			Self::Zero => write!(f, "{offset}"),
			_ if offset > 0 => write!(f, "{base}+{offset}"),
			Self::Param(name) => write!(f, "{name}"),
			Self::MVar(LevelMVarId(id)) => write!(f, "?u{id}"),
			Self::Max(left, right) => write!(f, "(max {left} {right})"),
			Self::IMax(left, right) => write!(f, "(imax {left} {right})"),
			Self::Succ(_) => unreachable!("successors are stripped above"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_max_with_zero_is_identity() {
		let u = Level::param("u");
		assert_eq!(Level::max(Level::zero(), u.clone()).normalize(), u);
		assert_eq!(Level::max(u.clone(), Level::zero()).normalize(), u);
	}

	#[test]
	fn test_max_absorbs_smaller_offset() {
		let u = Level::param("u");
		let level = Level::max(u.clone(), Level::succ(u.clone()));
		assert_eq!(level.normalize(), Level::succ(u));
	}

	#[test]
	fn test_imax_into_zero_vanishes() {
		let level = Level::imax(Level::one(), Level::zero());
		assert!(level.normalize().is_zero());
	}

	#[test]
	fn test_imax_into_successor_is_max() {
		let u = Level::param("u");
		let level = Level::imax(u.clone(), Level::one());
		assert!(level.is_equiv(&Level::max(Level::one(), u)));
	}

	#[test]
	fn test_imax_with_parameter_stays_stuck() {
		let (u, v) = (Level::param("u"), Level::param("v"));
		let level = Level::imax(u.clone(), v.clone());
		assert!(!level.is_equiv(&Level::max(u, v)));
	}

	#[test]
	fn test_max_is_commutative_up_to_normalization() {
		let (u, v) = (Level::param("u"), Level::param("v"));
		assert!(Level::max(u.clone(), v.clone()).is_equiv(&Level::max(v, u)));
	}

	#[test]
	fn test_succ_distributes_over_max() {
		let (u, v) = (Level::param("u"), Level::param("v"));
		let left = Level::succ(Level::max(u.clone(), v.clone()));
		let right = Level::max(Level::succ(u), Level::succ(v));
		assert!(left.is_equiv(&right));
	}
}
