use std::fmt::Write as _;

use crate::{
	ir::expr::Expr,
	op::{declare::KernelError, meta::MetaError, projection::StructureError},
};

/// Renders a generator failure as a multi-line diagnostic.
pub fn display_structure_error(error: &StructureError) -> String {
	match error {
		StructureError::ProjectionGenerationFailed { expected, found, .. } =>
			with_types(&format!("projection error: {error}"), expected, found.as_ref()),
		StructureError::Declaration { source, .. } => {
			format!("projection error: {error}\n{}", display_kernel_error(source))
		}
		StructureError::Meta(error) => display_meta_error(error),
		_ => format!("projection error: {error}"),
	}
}

pub fn display_kernel_error(error: &KernelError) -> String {
	match error {
		KernelError::DeclTypeMismatch { expected, found, .. } =>
			with_types(&format!("kernel error: {error}"), expected, Some(found)),
		KernelError::Meta(error) => display_meta_error(error),
		_ => format!("kernel error: {error}"),
	}
}

pub fn display_meta_error(error: &MetaError) -> String {
	match error {
		MetaError::AppTypeMismatch { argument, expected, found } => {
			let mut string = with_types("type error: application type mismatch", expected, Some(found));
			write!(string, "\nargument: {argument}").ok();
			string
		}
		_ => format!("type error: {error}"),
	}
}

fn with_types(header: &str, expected: &Expr, found: Option<&Expr>) -> String {
	let mut string = format!("{header}\nexpected: {expected}");
	if let Some(found) = found {
		write!(string, "\nfound: {found}").ok();
	}
	string
}
