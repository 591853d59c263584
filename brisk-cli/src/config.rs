use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, parser::ValueSource, value_parser};
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for `serve` and `dev`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Open browser automatically
    pub open: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
        }
    }
}

/// Lowest layer of the cascade
#[derive(Serialize)]
struct Defaults {
    #[serde(flatten)]
    site: brisk_core::Config,
    server: ServerConfig,
}

/// Configuration merged from CLI args, env vars, `brisk.toml` and defaults
#[derive(Debug, Clone)]
pub struct BriskConfig {
    /// Project directory every configured path is relative to
    pub root: PathBuf,
    pub site: brisk_core::Config,
    pub server: ServerConfig,
}

impl BriskConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (BRISK_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let root = PathBuf::from(arg::<String>(args, "root").map_or(".", String::as_str));
        let config_file = arg::<String>(args, "config").map_or("brisk.toml", String::as_str);
        let config_path = root.join(config_file);
        let explicit_file = args
            .try_get_raw("config")
            .is_ok_and(|_| args.value_source("config") == Some(ValueSource::CommandLine));

        let defaults = Defaults {
            site: brisk_core::Config::default(),
            server: ServerConfig::default(),
        };

        let mut builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&defaults)?)
            .add_source(File::from(config_path.as_path()).required(explicit_file))
            .add_source(
                Environment::with_prefix("BRISK")
                    .prefix_separator("_")
                    .separator("__"), // Use double underscore for nested keys
            );

        if let Some(output) = arg::<String>(args, "output") {
            builder = builder.set_override("paths.output", output.as_str())?;
        }
        if let Some(base_url) = arg::<String>(args, "base-url") {
            builder = builder.set_override("base_url", base_url.as_str())?;
        }
        if let Some(host) = arg::<String>(args, "host") {
            builder = builder.set_override("server.host", host.as_str())?;
        }
        if let Some(port) = arg::<u16>(args, "port") {
            builder = builder.set_override("server.port", i64::from(*port))?;
        }
        if arg::<bool>(args, "open").copied().unwrap_or(false) {
            builder = builder.set_override("server.open", true)?;
        }

        let merged = builder.build()?;
        let server: ServerConfig = merged.get("server")?;
        let site: brisk_core::Config = merged.try_deserialize()?;

        Ok(Self { root, site, server })
    }

    pub fn paths(&self) -> brisk_core::ProjectPaths {
        self.site.project_paths(&self.root)
    }
}

/// Value of an argument that may not be defined for this subcommand.
fn arg<'a, T: Clone + Send + Sync + 'static>(args: &'a ArgMatches, id: &str) -> Option<&'a T> {
    args.try_get_one::<T>(id).ok().flatten()
}

/// Arguments shared by every command that works on a project
pub fn project_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .value_name("DIR")
                .help("Project directory")
                .default_value("."),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file, relative to the project directory")
                .default_value("brisk.toml"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for the generated site"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .value_name("URL")
                .help("Base URL used in the sitemap"),
        )
}

/// Arguments for commands that start the HTTP server
pub fn server_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to serve on")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open browser automatically")
                .action(ArgAction::SetTrue),
        )
}
