//! The immutable configuration handle produced by a pipeline run

use crate::timezone::{Location, ZoneInfo};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Process-lifetime configuration: resolved environment facts plus the
/// populated destination structure.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig<T> {
    app_name: String,
    work_dir: PathBuf,
    time_zone: String,
    time_offset: i32,
    time_location: Location,
    data: T,
}

impl<T> AppConfig<T> {
    pub(crate) fn new(app_name: String, work_dir: PathBuf, zone: ZoneInfo, data: T) -> Self {
        Self {
            app_name,
            work_dir,
            time_zone: zone.name,
            time_offset: zone.offset,
            time_location: zone.location,
            data,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Base directory that on-disk overrides were read from.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Zone abbreviation observed at startup (e.g. `JST`).
    pub fn time_zone(&self) -> &str {
        &self.time_zone
    }

    /// Seconds east of UTC observed at startup.
    pub fn time_offset(&self) -> i32 {
        self.time_offset
    }

    pub fn time_location(&self) -> Location {
        self.time_location
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }
}
