//! `hkfix` command-line entry point

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use hkfix_driver::{Driver, DriverError, HkfixConfig, Report};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn paths_arg() -> Arg {
    Arg::new("paths")
        .num_args(1..)
        .default_value(".")
        .value_parser(value_parser!(PathBuf))
        .help("Source roots or files")
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("Configuration file (default: ./hkfix.toml if present)")
}

fn rule_arg() -> Arg {
    Arg::new("rule")
        .long("rule")
        .short('r')
        .value_name("NAME")
        .action(ArgAction::Append)
        .help("Rule to run; repeat for several (default: every configured rule)")
}

fn diff_arg() -> Arg {
    Arg::new("diff")
        .long("diff")
        .action(ArgAction::SetTrue)
        .help("Print unified diffs of changed units")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print the report as JSON")
}

fn cli() -> Command {
    Command::new("hkfix")
        .version(hkfix_driver::VERSION)
        .about("Migrate generated service interfaces to the higher-kinded shape")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at debug level (RUST_LOG overrides)"),
        )
        .subcommand(
            Command::new("run")
                .about("Rewrite every unit under the given roots, upstream packages first")
                .arg(paths_arg())
                .arg(config_arg())
                .arg(rule_arg())
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Compute every rewrite but write nothing"),
                )
                .arg(diff_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Dry run; fail if any unit would change or cannot be processed")
                .arg(paths_arg())
                .arg(config_arg())
                .arg(rule_arg())
                .arg(diff_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("order")
                .about("Print units in processing order")
                .arg(paths_arg())
                .arg(config_arg()),
        )
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .init();
}

fn roots(args: &ArgMatches) -> Vec<PathBuf> {
    args.get_many::<PathBuf>("paths")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default()
}

async fn load_config(args: &ArgMatches) -> anyhow::Result<HkfixConfig> {
    let path = args.get_one::<PathBuf>("config");
    let mut config = HkfixConfig::discover(path.map(PathBuf::as_path))
        .await
        .context("loading configuration")?;
    if let Ok(Some(rules)) = args.try_get_many::<String>("rule") {
        config = config.with_rules(rules.cloned());
    }
    Ok(config)
}

fn print_report(report: &Report, args: &ArgMatches) -> anyhow::Result<()> {
    if args.get_flag("json") {
        println!("{}", report.to_json().context("serializing report")?);
        return Ok(());
    }
    if args.get_flag("diff") {
        print!("{}", report.diffs());
    }
    println!("{report}");
    Ok(())
}

async fn run(matches: &ArgMatches) -> anyhow::Result<u8> {
    match matches.subcommand() {
        Some(("run", args)) => {
            let config = load_config(args).await?.with_dry_run(args.get_flag("dry-run"));
            let report = Driver::new(config)?.run(&roots(args)).await?;
            print_report(&report, args)?;
            Ok(u8::from(!report.is_success()))
        }
        Some(("check", args)) => {
            let config = load_config(args).await?.with_dry_run(true);
            let report = Driver::new(config)?.run(&roots(args)).await?;
            print_report(&report, args)?;
            let pending = report.changed().next().is_some();
            Ok(u8::from(pending || !report.is_success()))
        }
        Some(("order", args)) => {
            let config = load_config(args).await?;
            for path in Driver::new(config)?.order(&roots(args)).await? {
                println!("{}", path.display());
            }
            Ok(0)
        }
        _ => Ok(2),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match run(&matches).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!("{err:#}");
            let code = err
                .downcast_ref::<DriverError>()
                .map_or(1, DriverError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
