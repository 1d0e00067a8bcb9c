use std::process::ExitCode;

use bpaf::{construct, long, positional, short, Parser};
use strata::{
	common::{BinderInfo, Name},
	ir::{expr::Expr, level::Level},
	op::{
		eta::eta_struct_reduce,
		meta::{EtaStructMode, MetaConfig, MetaCtx, MetaError},
		projection::{generate_projections, FieldDescriptor},
	},
	prelude::{prelude, STRUCTURES},
	report::{display_kernel_error, display_meta_error, display_structure_error},
};
use tracing::Level as LogLevel;

struct Options {
	verbosity: usize,
	add_as_unsafe: bool,
	eta: EtaStructMode,
	structures: Vec<String>,
}

fn main() -> ExitCode {
	let verbosity = short('v').long("verbose").help("Log more; repeat for trace output").req_flag(()).many().map(|v| v.len());
	let add_as_unsafe = long("unsafe").help("Add every projection as unsafe").switch();
	let eta = long("eta")
		.help("Structures eta applies to: all, not-classes or none")
		.argument::<EtaStructMode>("MODE")
		.fallback(EtaStructMode::All);
	let structures = positional::<String>("STRUCTURE").help("Prelude structures to process (default: all)").many();
	let options: Options = construct!(Options { verbosity, add_as_unsafe, eta, structures }).to_options().run();

	let level = match options.verbosity {
		0 => LogLevel::WARN,
		1 => LogLevel::DEBUG,
		_ => LogLevel::TRACE,
	};
	tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();

	let mut env = match prelude() {
		Ok(env) => env,
		Err(error) => {
			eprintln!("{}", display_kernel_error(&error));
			return ExitCode::FAILURE;
		}
	};

	let names: Vec<Name> = if options.structures.is_empty() {
		STRUCTURES.iter().map(|name| Name::new(name)).collect()
	} else {
		options.structures.iter().map(|name| Name::new(name)).collect()
	};
	let config = MetaConfig { eta_struct: options.eta, ..MetaConfig::default() };

	let mut succeeded = true;
	for structure in names {
		let mut ctx = MetaCtx::with_config(&mut env, config);
		let fields = match generate_projections(&mut ctx, structure, options.add_as_unsafe) {
			Ok(fields) => fields,
			Err(error) => {
				eprintln!("{}", display_structure_error(&error));
				succeeded = false;
				continue;
			}
		};

		println!("structure {structure}");
		for field in &fields {
			if let Some(info) = ctx.env().find(field.projection) {
				println!("  {} : {}", field.projection, info.ty());
			}
		}

		ctx.reset_steps();
		match eta_demo(&mut ctx, structure, &fields) {
			Ok(Some((before, after))) => println!("  eta: {before}\n    ~> {after}"),
			Ok(None) => {}
			Err(error) => {
				eprintln!("{}", display_meta_error(&error));
				succeeded = false;
			}
		}
		println!();
	}

	if succeeded {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	}
}

/// Rebuilds a value of `structure` from its own projections and collapses it again.
fn eta_demo(
	ctx: &mut MetaCtx<'_>,
	structure: Name,
	fields: &[FieldDescriptor],
) -> Result<Option<(Expr, Expr)>, MetaError> {
	let Some(inductive) = ctx.env().find_inductive(structure).cloned() else {
		return Ok(None);
	};
	if fields.is_empty() {
		return Ok(None);
	}

	let mut scope = ctx.scoped();
	let mut ty = inductive.val.ty.clone();
	let mut locals = Vec::new();
	while let Expr::Pi { name, info, domain, body } = ty {
		let param = scope.push_local(name, info, domain.as_ref().clone());
		ty = body.instantiate(&param);
		locals.push(param);
	}
	let params = locals.clone();
	let levels: Vec<Level> = inductive.val.level_params.iter().map(|param| Level::param(*param)).collect();
	let self_ty = Expr::app_n(Expr::const_(structure, levels.clone()), params.iter().cloned());
	let value = scope.push_local("x", BinderInfo::Default, self_ty);
	locals.push(value.clone());

	let projections = fields.iter().map(|field| {
		let arguments = params.iter().cloned().chain([value.clone()]);
		Expr::app_n(Expr::const_(field.projection, levels.clone()), arguments)
	});
	let rebuilt = Expr::app_n(Expr::const_(inductive.ctors[0], levels.clone()), params.iter().cloned().chain(projections));
	let before = scope.mk_lambda(&locals, &rebuilt)?;

	let mode = scope.config.eta_struct;
	let after = eta_struct_reduce(&mut scope, &before, |env, structure| mode.allows(env, structure))?;
	Ok(Some((before, after)))
}
