use anyhow::{Context, Result};
use clap::Parser;
use rpack::cancel::CancelToken;
use rpack::checker::Checker;
use rpack::cli::{CheckArgs, Command, RootArgs, RunArgs};
use rpack::executor::Executor;
use rpack::fetch::DirFetcher;
use rpack::script::lua::LuaEngine;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    rpack::logging::init(args.debug);

    match args.command {
        Command::Run(args) => cmd_run(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let config_dir = std::path::absolute(&args.config)
        .ok()
        .and_then(|path| path.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    let executor = Executor {
        override_exec_path: args.working_dir.clone(),
        dry_run: args.dry_run,
        force: args.force,
        schema_factory: None,
    };
    let fetcher = DirFetcher::new(config_dir);
    let engine = LuaEngine::new();

    let report = executor
        .run(&args.config, &fetcher, &engine, &CancelToken::new())
        .with_context(|| format!("run failed for {}", args.config.display()))?;

    if report.dry_run {
        println!(
            "Dry run complete; staged output at {}",
            report.staging_path.display()
        );
    } else {
        println!(
            "Wrote {} file(s), removed {} under {}",
            report.written.len(),
            report.removed.len(),
            report.exec_path.display()
        );
    }
    Ok(())
}

fn cmd_check(args: CheckArgs) -> Result<()> {
    let checker = Checker {
        override_exec_path: args.working_dir.clone(),
    };
    checker
        .check(&args.config)
        .with_context(|| format!("check failed for {}", args.config.display()))?;
    println!("Lockfile integrity holds.");
    Ok(())
}
