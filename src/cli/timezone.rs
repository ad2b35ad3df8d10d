//! Timezone command implementation

use anyhow::Result;
use clap::Args;

use super::utils::{render, OutputFormat};

#[derive(Args)]
pub struct TimezoneArgs {
    /// Zone to apply when TZ is not already set (e.g. "Asia/Tokyo")
    #[arg(value_name = "ZONE", default_value = "")]
    pub zone: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,
}

pub fn run(args: TimezoneArgs) -> Result<()> {
    let info = stratacfg::timezone::resolve(&args.zone)?;
    println!("{}", render(&info, args.output)?);
    Ok(())
}
