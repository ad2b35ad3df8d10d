//! Configuration loading and merging
//!
//! Handles parsing config fragments, merging them layer by layer with
//! environment overrides, and struct-level defaulting
//! (Env > On-disk files > Embedded files > Defaults).

pub mod defaults;
pub mod loader;
pub mod merge;

pub use defaults::{default_if_empty, default_if_none, default_if_zero, Defaults};
pub use loader::ConfigType;
pub use merge::LayeredMerger;
