//! Resolve command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use stratacfg::{Bootstrap, ConfigType, EmbeddedFs};

use super::utils::{parse_csv, render, OutputFormat};

#[derive(Args)]
pub struct ResolveArgs {
    /// Application name; its upper-cased form prefixes environment overrides
    #[arg(short = 'n', long, value_name = "NAME")]
    pub app_name: String,

    /// Directory snapshotted as the embedded file set (expects embeds/envs/.env)
    #[arg(short = 'e', long, value_name = "DIR")]
    pub embedded_dir: Option<PathBuf>,

    /// Work dir holding on-disk overrides (default: the executable's directory)
    #[arg(short = 'w', long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Format of every config fragment (json, toml, yaml, dotenv)
    #[arg(short = 't', long, value_name = "TYPE", default_value = "toml")]
    pub config_type: ConfigType,

    /// Zone applied when TZ is not already set
    #[arg(short = 'z', long, value_name = "ZONE", default_value = "UTC")]
    pub time_zone: String,

    /// Extra search patterns (comma-separated globs)
    #[arg(short = 's', long, value_name = "GLOBS")]
    pub search_paths: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,
}

pub fn run(args: ResolveArgs) -> Result<()> {
    let embedded = match &args.embedded_dir {
        Some(dir) => EmbeddedFs::from_dir(dir)
            .with_context(|| format!("Failed to snapshot embedded dir {}", dir.display()))?,
        None => EmbeddedFs::new(),
    };

    let mut bootstrap = Bootstrap::new(&args.app_name)
        .embedded(embedded)
        .config_type(args.config_type)
        .time_zone(&args.time_zone)
        .search_paths(parse_csv(&args.search_paths));
    if let Some(dir) = &args.work_dir {
        bootstrap = bootstrap.work_dir(dir);
    }

    let config = bootstrap
        .run(serde_json::Value::Object(serde_json::Map::new()))
        .context("Initialization failed")?;
    println!("{}", render(&config, args.output)?);
    Ok(())
}
