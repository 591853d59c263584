use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub fn make_subcommand() -> Command {
    Command::new("init")
        .about("Create an example project")
        .arg(
            Arg::new("dir")
                .value_name("DIR")
                .help("Directory to create the project in")
                .default_value("."),
        )
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let dir = args
        .get_one::<String>("dir")
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    let report = brisk_core::scaffold(&dir)?;

    for file in &report.created {
        println!("  + {}", file.display());
    }
    for file in &report.skipped {
        println!("  = {} (exists, skipped)", file.display());
    }
    println!(
        "✓ Project ready in {} ({} created, {} skipped)",
        dir.display(),
        report.created.len(),
        report.skipped.len()
    );
    println!("  Run `brisk dev` inside it to start working.");

    Ok(())
}
