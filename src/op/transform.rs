use std::{
	hash::{Hash, Hasher},
	rc::Rc,
};

use hashbrown::HashMap;

use super::meta::{MetaCtx, MetaError};
use crate::{ir::expr::Expr, utility::rc};

/// What a visitor wants done with the term it was given.
#[derive(Clone, Debug)]
pub enum TransformStep {
	/// Use this term as the result without visiting it.
	Done(Expr),
	/// Visit this term in place of the original.
	Visit(Expr),
	/// Keep going with the given term, or the original one.
	Continue(Option<Expr>),
}

/// Identity of a shared subterm. Holding the `Rc` keeps the address from being reused.
struct SharedExpr(Rc<Expr>);

impl PartialEq for SharedExpr {
	fn eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl Eq for SharedExpr {}

impl Hash for SharedExpr {
	fn hash<H: Hasher>(&self, state: &mut H) { Rc::as_ptr(&self.0).hash(state) }
}

/// Rewrites a term top-down with `pre` and bottom-up with `post`.
///
/// Binders are opened with fresh locals, so visitors only ever see locally
/// closed terms. Results are cached by subterm identity for one traversal.
pub fn transform<Pre, Post>(ctx: &mut MetaCtx<'_>, e: &Expr, pre: Pre, post: Post) -> Result<Expr, MetaError>
where
	Pre: FnMut(&mut MetaCtx<'_>, &Expr) -> Result<TransformStep, MetaError>,
	Post: FnMut(&mut MetaCtx<'_>, &Expr) -> Result<TransformStep, MetaError>,
{
	Transformer { pre, post, cache: HashMap::new() }.visit(ctx, &rc!(e.clone()))
}

struct Transformer<Pre, Post> {
	pre: Pre,
	post: Post,
	cache: HashMap<SharedExpr, Expr>,
}

impl<Pre, Post> Transformer<Pre, Post>
where
	Pre: FnMut(&mut MetaCtx<'_>, &Expr) -> Result<TransformStep, MetaError>,
	Post: FnMut(&mut MetaCtx<'_>, &Expr) -> Result<TransformStep, MetaError>,
{
	fn visit(&mut self, ctx: &mut MetaCtx<'_>, e: &Rc<Expr>) -> Result<Expr, MetaError> {
		let key = SharedExpr(e.clone());
		if let Some(result) = self.cache.get(&key) {
			return Ok(result.clone());
		}
		let result = match (self.pre)(&mut *ctx, e.as_ref())? {
			TransformStep::Done(result) => result,
			TransformStep::Visit(result) => self.visit(ctx, &rc!(result))?,
			TransformStep::Continue(result) => {
				let e = result.map_or_else(|| e.clone(), |result| rc!(result));
				let rebuilt = self.visit_children(ctx, &e)?;
				match (self.post)(&mut *ctx, &rebuilt)? {
					TransformStep::Done(result) | TransformStep::Continue(Some(result)) => result,
					TransformStep::Continue(None) => rebuilt,
					TransformStep::Visit(result) => self.visit(ctx, &rc!(result))?,
				}
			}
		};
		self.cache.insert(key, result.clone());
		Ok(result)
	}

	fn visit_children(&mut self, ctx: &mut MetaCtx<'_>, e: &Rc<Expr>) -> Result<Expr, MetaError> {
		match e.as_ref() {
			Expr::BVar(_) | Expr::FVar(_) | Expr::MVar(_) | Expr::Sort(_) | Expr::Const(..) | Expr::Lit(_) =>
				Ok(e.as_ref().clone()),
			Expr::App(..) => {
				let mut arguments = Vec::new();
				let mut head = e;
				while let Expr::App(function, argument) = head.as_ref() {
					arguments.push(argument);
					head = function;
				}
				let head = self.visit(ctx, head)?;
				let arguments =
					arguments.into_iter().rev().map(|argument| self.visit(ctx, argument)).collect::<Result<Vec<_>, _>>()?;
				Ok(Expr::app_n(head, arguments))
			}
			Expr::Lam { .. } | Expr::Pi { .. } => self.visit_binders(ctx, e),
			Expr::Let { name, ty, value, body } => {
				let ty = self.visit(ctx, ty)?;
				let value = self.visit(ctx, value)?;
				let mut scope = ctx.scoped();
				let local = scope.push_let(*name, Default::default(), ty, value);
				let body = self.visit(&mut scope, &rc!(body.instantiate(&local)))?;
				scope.mk_lambda(&[local], &body)
			}
			Expr::Proj { structure, index, scrutinee } => Ok(Expr::proj(*structure, *index, self.visit(ctx, scrutinee)?)),
		}
	}

	/// Opens a run of binders of the same kind.
	fn visit_binders(&mut self, ctx: &mut MetaCtx<'_>, e: &Rc<Expr>) -> Result<Expr, MetaError> {
		let is_lambda = matches!(e.as_ref(), Expr::Lam { .. });
		let mut scope = ctx.scoped();
		let mut fvars = Vec::new();
		let mut current = e.clone();
		loop {
			let (name, info, domain, body) = match current.as_ref() {
				Expr::Lam { name, info, domain, body } if is_lambda => (*name, *info, domain, body.clone()),
				Expr::Pi { name, info, domain, body } if !is_lambda => (*name, *info, domain, body.clone()),
				_ => break,
			};
			let domain = self.visit(&mut scope, &rc!(domain.instantiate_rev(&fvars)))?;
			fvars.push(scope.push_local(name, info, domain));
			current = body;
		}
		let body = self.visit(&mut scope, &rc!(current.instantiate_rev(&fvars)))?;
		if is_lambda {
			scope.mk_lambda(&fvars, &body)
		} else {
			scope.mk_pi(&fvars, &body)
		}
	}
}
