//! stratacfg: inspect layered startup configuration
//!
//! Runs the startup pipeline against a directory snapshot and prints the
//! resolved configuration handle.

use anyhow::Result;

mod cli;

fn main() -> Result<()> {
    cli::run()
}
