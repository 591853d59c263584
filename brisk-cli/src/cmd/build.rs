use anyhow::Result;
use brisk_core::{BuildFailure, BuildReport, SiteBuilder, StyleOutcome};
use clap::{ArgMatches, Command};

use crate::config::{BriskConfig, project_args};

pub fn make_subcommand() -> Command {
    project_args(Command::new("build")).about("Build the site into the output directory")
}

/// One full build of the project described by `config`.
pub fn build_project(config: &BriskConfig) -> Result<BuildReport, BuildFailure> {
    SiteBuilder::new(config.site.clone())
        .project_root(&config.root)
        .build()
        .render_all()
}

pub fn summary(report: &BuildReport) -> String {
    let styles = match &report.styles {
        StyleOutcome::Compiled { merged_legacy: true } => ", styles.css (with static/styles.css)",
        StyleOutcome::Compiled { merged_legacy: false } => ", styles.css",
        _ => "",
    };
    format!(
        "{} pages, {} assets{}, {} sitemap URLs in {} ms",
        report.pages, report.assets, styles, report.sitemap_urls, report.duration_ms
    )
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    // Load cascading configuration
    let config = BriskConfig::load(args)?;
    let output_dir = config.paths().output;

    let report = build_project(&config)?;

    println!("✓ Site built successfully in {}", output_dir.display());
    println!("  {}", summary(&report));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let report = BuildReport {
            pages: 3,
            html_pages: 1,
            assets: 2,
            styles: StyleOutcome::Compiled { merged_legacy: true },
            sitemap_urls: 3,
            duration_ms: 12,
        };
        assert_eq!(
            summary(&report),
            "3 pages, 2 assets, styles.css (with static/styles.css), 3 sitemap URLs in 12 ms"
        );
    }

    #[test]
    fn test_build_missing_template_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("content")).unwrap();
        std::fs::write(dir.path().join("content/index.md"), "# Home").unwrap();
        let root = dir.path().to_string_lossy().into_owned();

        let args = make_subcommand()
            .try_get_matches_from(["build", "--root", root.as_str()])
            .unwrap();
        let err = execute(&args).unwrap_err();
        assert!(format!("{err:#}").contains("default"));
    }
}
