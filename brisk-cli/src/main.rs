use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};

mod cmd;
mod config;

fn cli() -> Command {
    Command::new("brisk")
        .about("Convention-over-configuration static site builder")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(cmd::build::make_subcommand())
        .subcommand(cmd::serve::make_subcommand())
        .subcommand(cmd::dev::make_subcommand())
        .subcommand(cmd::init::make_subcommand())
}

/// Install the log subscriber. `RUST_LOG` directives are honored on top of
/// the level picked by `-v`.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

async fn run(matches: ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("build", args)) => cmd::build::execute(args),
        Some(("serve", args)) => cmd::serve::execute(args).await,
        Some(("dev", args)) => cmd::dev::execute(args).await,
        Some(("init", args)) => cmd::init::execute(args),
        _ => unreachable!("subcommand_required is set"),
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    if let Err(e) = run(matches).await {
        eprintln!("✗ {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_verbose_is_global() {
        let matches = cli().try_get_matches_from(["brisk", "build", "-vv"]).unwrap();
        assert_eq!(matches.get_count("verbose"), 2);
        assert_eq!(matches.subcommand_name(), Some("build"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(cli().try_get_matches_from(["brisk"]).is_err());
    }
}
