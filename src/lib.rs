//! stratacfg: layered startup configuration
//!
//! Merges embedded default files, on-disk override files, environment
//! variables and struct-level defaults into one typed configuration, while
//! resolving the process time zone and work dir.

pub mod config;
pub mod envfile;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod timezone;
pub mod utils;

pub use config::{default_if_empty, default_if_none, default_if_zero, ConfigType, Defaults, LayeredMerger};
pub use error::{Error, Result};
pub use pipeline::{initialize, AppConfig, Bootstrap, CancelFlag};
pub use source::{DiskFs, EmbeddedFs, FileSource};
pub use timezone::{default_location, Location, ZoneInfo};
