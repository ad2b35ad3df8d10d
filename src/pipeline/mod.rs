//! Startup pipeline
//!
//! Runs the initialization steps strictly in order, each consuming the
//! previous one's output, and stops at the first fatal error:
//!
//! 1. time zone resolution
//! 2. work dir resolution
//! 3. embedded env file, then the on-disk override env file
//! 4. embedded config fragments, then on-disk config fragments
//! 5. struct-level defaulting
//!
//! Steps only add state (env vars, merged keys), so a failure needs no
//! rollback. Runs are serialized process-wide: the environment and the
//! default time location are shared by every thread.

use crate::config::{ConfigType, Defaults, LayeredMerger};
use crate::envfile::{self, EMBEDDED_ENV_PATH, REGULAR_ENV_PATH};
use crate::error::{Error, Result};
use crate::source::{DiskFs, EmbeddedFs, FileSource};
use crate::timezone;
use crate::utils::resolve_work_dir;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

mod handle;

pub use handle::AppConfig;

/// Fixed embedded pattern for default config fragments.
pub const EMBEDDED_PARAMS_PATTERN: &str = "embeds/params/*";

/// Fixed on-disk pattern for override config fragments, relative to the work dir.
pub const REGULAR_PARAMS_PATTERN: &str = "params/*";

static PIPELINE_LOCK: Mutex<()> = Mutex::new(());

/// Cooperative cancellation, checked before each step starts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    TimeZone,
    WorkDir,
    EmbeddedEnv,
    RegularEnv,
    EmbeddedConfig,
    RegularConfig,
    Defaults,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::TimeZone => "time zone",
            Step::WorkDir => "work dir",
            Step::EmbeddedEnv => "embedded env",
            Step::RegularEnv => "regular env",
            Step::EmbeddedConfig => "embedded config",
            Step::RegularConfig => "regular config",
            Step::Defaults => "defaults",
        };
        f.write_str(name)
    }
}

/// Builder for a startup pipeline run.
///
/// ```no_run
/// use serde::{Deserialize, Serialize};
/// use stratacfg::{Bootstrap, ConfigType, Defaults, EmbeddedFs, default_if_zero};
///
/// #[derive(Default, Serialize, Deserialize)]
/// #[serde(default)]
/// struct Settings { port: u16 }
///
/// impl Defaults for Settings {
///     fn apply_defaults(&mut self) {
///         default_if_zero(&mut self.port, 8080);
///     }
/// }
///
/// static FILES: &[(&str, &[u8])] = &[("embeds/envs/.env", b"")];
///
/// let config = Bootstrap::new("demo")
///     .embedded(EmbeddedFs::from_static(FILES))
///     .config_type(ConfigType::Toml)
///     .time_zone("UTC")
///     .run(Settings::default())
///     .unwrap();
/// println!("listening on {} ({})", config.data().port, config.time_zone());
/// ```
pub struct Bootstrap {
    app_name: String,
    embedded: EmbeddedFs,
    disk: Option<Box<dyn FileSource>>,
    work_dir: Option<PathBuf>,
    search_paths: Vec<String>,
    config_type: ConfigType,
    time_zone: String,
    cancel: CancelFlag,
}

impl Bootstrap {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            embedded: EmbeddedFs::new(),
            disk: None,
            work_dir: None,
            search_paths: Vec::new(),
            config_type: ConfigType::default(),
            time_zone: String::new(),
            cancel: CancelFlag::new(),
        }
    }

    /// Set the embedded file set holding the default env file and fragments.
    pub fn embedded(mut self, embedded: EmbeddedFs) -> Self {
        self.embedded = embedded;
        self
    }

    /// Replace the on-disk source. Defaults to a [`DiskFs`] rooted at the work dir.
    pub fn disk(mut self, disk: impl FileSource + 'static) -> Self {
        self.disk = Some(Box::new(disk));
        self
    }

    /// Use `dir` instead of resolving the work dir from the executable location.
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Extra glob patterns searched in both the embedded and the on-disk source,
    /// ahead of the fixed patterns.
    pub fn search_paths(mut self, patterns: Vec<String>) -> Self {
        self.search_paths = patterns;
        self
    }

    pub fn config_type(mut self, config_type: ConfigType) -> Self {
        self.config_type = config_type;
        self
    }

    /// Zone applied when `TZ` is not already set.
    pub fn time_zone(mut self, zone: impl Into<String>) -> Self {
        self.time_zone = zone.into();
        self
    }

    pub fn cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    fn checkpoint(&self, step: Step) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled { step: step.to_string() });
        }
        debug!(step = %step, app = %self.app_name, "starting step");
        Ok(())
    }

    fn patterns_with(&self, fixed: &str) -> Vec<String> {
        let mut patterns = self.search_paths.clone();
        patterns.push(fixed.to_string());
        patterns
    }

    /// Run every step and assemble the configuration handle.
    ///
    /// `destination`'s current values are the fallback for keys that no layer
    /// sets. The first fatal error is returned as-is and later steps do not run.
    pub fn run<T>(self, destination: T) -> Result<AppConfig<T>>
    where
        T: Serialize + DeserializeOwned + Defaults,
    {
        let _guard = PIPELINE_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        self.checkpoint(Step::TimeZone)?;
        let zone = timezone::resolve(&self.time_zone)?;

        self.checkpoint(Step::WorkDir)?;
        let work_dir = self.work_dir.clone().unwrap_or_else(resolve_work_dir);
        debug!(work_dir = %work_dir.display(), "resolved work dir");
        let default_disk = DiskFs::new(&work_dir);
        let disk: &dyn FileSource = match &self.disk {
            Some(disk) => disk.as_ref(),
            None => &default_disk,
        };

        self.checkpoint(Step::EmbeddedEnv)?;
        envfile::load_embedded(&self.embedded, EMBEDDED_ENV_PATH)?;

        self.checkpoint(Step::RegularEnv)?;
        envfile::load_regular(disk, REGULAR_ENV_PATH);

        let mut merger = LayeredMerger::new(&self.app_name, self.config_type);

        self.checkpoint(Step::EmbeddedConfig)?;
        merger.merge_source(&self.embedded, &self.patterns_with(EMBEDDED_PARAMS_PATTERN));
        let data = merger.unmarshal(&destination)?;

        self.checkpoint(Step::RegularConfig)?;
        merger.merge_source(disk, &self.patterns_with(REGULAR_PARAMS_PATTERN));
        let mut data = merger.unmarshal(&data)?;

        self.checkpoint(Step::Defaults)?;
        data.apply_defaults();

        debug!(
            app = %self.app_name,
            fragments = merger.merged_fragments().len(),
            zone = %zone.name,
            "configuration initialized"
        );
        Ok(AppConfig::new(self.app_name, work_dir, zone, data))
    }
}

/// Initialize the process configuration in one call.
///
/// `disk` defaults to the filesystem rooted at the resolved work dir.
pub fn initialize<T>(
    destination: T,
    embedded: EmbeddedFs,
    disk: Option<Box<dyn FileSource>>,
    search_paths: Vec<String>,
    config_type: ConfigType,
    app_name: &str,
    default_time_zone: &str,
) -> Result<AppConfig<T>>
where
    T: Serialize + DeserializeOwned + Defaults,
{
    let mut bootstrap = Bootstrap::new(app_name)
        .embedded(embedded)
        .search_paths(search_paths)
        .config_type(config_type)
        .time_zone(default_time_zone);
    bootstrap.disk = disk;
    bootstrap.run(destination)
}
