//! Process time zone resolution
//!
//! Reconciles a requested default zone with whatever the environment already
//! provides. An existing `TZ` is never overwritten, and a zone that cannot be
//! loaded degrades to the host's local zone instead of failing startup.

use crate::error::{Error, Result};
use chrono::{DateTime, Local, Offset, Utc};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::RwLock;
use tracing::{debug, info};

/// Name of the environment variable holding the process time zone.
pub const TZ: &str = "TZ";

/// Process-wide default location, `None` until a resolution overrides it.
static DEFAULT_LOCATION: RwLock<Option<Location>> = RwLock::new(None);

/// A time location: the host's local zone or a named IANA zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Local,
    Zone(Tz),
}

impl Location {
    /// Load a location by IANA name.
    ///
    /// `Local` names the host zone. A leading `:` (POSIX `TZ` syntax) is
    /// ignored. Returns `None` for empty or unknown names.
    pub fn load(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches(':');
        if name.is_empty() {
            return None;
        }
        if name == "Local" {
            return Some(Location::Local);
        }
        name.parse::<Tz>().ok().map(Location::Zone)
    }

    pub fn name(&self) -> &str {
        match self {
            Location::Local => "Local",
            Location::Zone(tz) => tz.name(),
        }
    }

    /// Zone abbreviation and offset (seconds east of UTC) at `instant`.
    pub fn zone_at(&self, instant: DateTime<Utc>) -> (String, i32) {
        match self {
            Location::Local => {
                let local = instant.with_timezone(&Local);
                (local.format("%Z").to_string(), local.offset().local_minus_utc())
            }
            Location::Zone(tz) => {
                let zoned = instant.with_timezone(tz);
                (zoned.format("%Z").to_string(), zoned.offset().fix().local_minus_utc())
            }
        }
    }

    pub fn zone_now(&self) -> (String, i32) {
        self.zone_at(Utc::now())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Outcome of a time zone resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneInfo {
    /// Zone abbreviation as observed now (e.g. `JST`).
    pub name: String,
    pub location: Location,
    /// Seconds east of UTC.
    pub offset: i32,
}

/// The process-wide default location.
///
/// This is [`Location::Local`] until [`resolve`] finds that the working zone
/// disagrees with the host's local offset.
pub fn default_location() -> Location {
    let guard = DEFAULT_LOCATION.read().unwrap_or_else(|e| e.into_inner());
    guard.unwrap_or(Location::Local)
}

fn set_default_location(location: Location) {
    let mut guard = DEFAULT_LOCATION.write().unwrap_or_else(|e| e.into_inner());
    *guard = Some(location);
}

fn set_tz(value: &str) -> Result<()> {
    if value.contains('\0') {
        return Err(Error::EnvWrite {
            var: TZ,
            value: value.to_string(),
            reason: "value contains a NUL byte".to_string(),
        });
    }
    std::env::set_var(TZ, value);
    Ok(())
}

/// Determine the effective zone name, location, and offset for the process.
///
/// If `TZ` is unset it is set to `requested`. The working zone is then
/// loaded; when it cannot be, the host's local zone is returned. When its
/// current offset differs from the host's local offset, the process-wide
/// default location is switched to it.
pub fn resolve(requested: &str) -> Result<ZoneInfo> {
    let mut working = std::env::var(TZ).unwrap_or_default();
    if working.is_empty() {
        if !requested.is_empty() {
            set_tz(requested)?;
            debug!(zone = requested, "TZ unset, applied requested zone");
        }
        working = requested.to_string();
    }

    Ok(reconcile(&working, Location::Local.zone_now()))
}

/// Compare the working zone against the host's `(name, offset)`.
fn reconcile(working: &str, (base_name, base_offset): (String, i32)) -> ZoneInfo {
    let Some(location) = Location::load(working) else {
        debug!(zone = %working, "zone not loadable, falling back to host local zone");
        return ZoneInfo { name: base_name, location: Location::Local, offset: base_offset };
    };

    let (name, offset) = location.zone_now();
    if offset != base_offset {
        set_default_location(location);
        info!(location = %location, offset, host_offset = base_offset, "default location overridden");
    }

    ZoneInfo { name, location, offset }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serial_test::serial;

    struct TzGuard(Option<String>);

    impl TzGuard {
        fn set(value: Option<&str>) -> Self {
            let previous = std::env::var(TZ).ok();
            match value {
                Some(v) => std::env::set_var(TZ, v),
                None => std::env::remove_var(TZ),
            }
            TzGuard(previous)
        }
    }

    impl Drop for TzGuard {
        fn drop(&mut self) {
            match &self.0 {
                Some(v) => std::env::set_var(TZ, v),
                None => std::env::remove_var(TZ),
            }
        }
    }

    #[test]
    fn load_known_unknown_and_empty_names() {
        assert_eq!(Location::load("Asia/Tokyo"), Some(Location::Zone(Tz::Asia__Tokyo)));
        assert_eq!(Location::load(":Europe/Paris"), Some(Location::Zone(Tz::Europe__Paris)));
        assert_eq!(Location::load("Local"), Some(Location::Local));
        assert_eq!(Location::load("Mars/Olympus_Mons"), None);
        assert_eq!(Location::load(""), None);
    }

    #[test]
    fn zone_at_reports_abbreviation_and_offset() {
        let winter = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();

        let tokyo = Location::load("Asia/Tokyo").unwrap();
        assert_eq!(tokyo.zone_at(winter), ("JST".to_string(), 9 * 3600));

        let new_york = Location::load("America/New_York").unwrap();
        assert_eq!(new_york.zone_at(winter), ("EST".to_string(), -5 * 3600));
        assert_eq!(new_york.zone_at(summer), ("EDT".to_string(), -4 * 3600));
    }

    #[test]
    #[serial]
    fn unset_tz_is_set_to_requested_zone() {
        let _guard = TzGuard::set(None);

        let info = resolve("Asia/Tokyo").expect("resolve");
        assert_eq!(std::env::var(TZ).as_deref(), Ok("Asia/Tokyo"));
        assert_eq!(info.location, Location::Zone(Tz::Asia__Tokyo));
        assert_eq!(info.name, "JST");
        assert_eq!(info.offset, 9 * 3600);
        assert_eq!((info.name.clone(), info.offset), info.location.zone_now());
    }

    #[test]
    #[serial]
    fn existing_tz_is_never_overwritten() {
        let _guard = TzGuard::set(Some("Etc/GMT-3"));

        let info = resolve("Asia/Tokyo").expect("resolve");
        assert_eq!(std::env::var(TZ).as_deref(), Ok("Etc/GMT-3"));
        assert_eq!(info.location.name(), "Etc/GMT-3");
        assert_eq!(info.offset, 3 * 3600);
    }

    #[test]
    #[serial]
    fn unknown_zone_falls_back_to_local() {
        let _guard = TzGuard::set(None);

        let info = resolve("Mars/Olympus_Mons").expect("unknown zone is not an error");
        assert_eq!(info.location, Location::Local);
        assert_eq!(info.offset, Location::Local.zone_now().1);
    }

    #[test]
    #[serial]
    fn empty_requested_zone_leaves_tz_unset() {
        let _guard = TzGuard::set(None);

        let info = resolve("").expect("resolve");
        assert!(std::env::var(TZ).is_err());
        assert_eq!(info.location, Location::Local);
    }

    #[test]
    #[serial]
    fn nul_in_requested_zone_is_env_write_error() {
        let _guard = TzGuard::set(None);

        let err = resolve("Asia/\0Tokyo").expect_err("NUL cannot be stored");
        assert!(matches!(err, Error::EnvWrite { var: TZ, .. }));
    }

    fn clear_default_location() {
        *DEFAULT_LOCATION.write().unwrap() = None;
    }

    #[test]
    #[serial]
    fn differing_offset_overrides_default_location() {
        clear_default_location();

        let info = reconcile("Pacific/Kiritimati", ("UTC".to_string(), 0));
        assert_eq!(info.location, Location::Zone(Tz::Pacific__Kiritimati));
        assert_eq!((info.name.clone(), info.offset), info.location.zone_now());
        assert_eq!(info.offset, 14 * 3600);
        assert_eq!(default_location(), info.location);

        clear_default_location();
    }

    #[test]
    #[serial]
    fn matching_offset_keeps_default_location() {
        clear_default_location();

        let info = reconcile("Asia/Tokyo", ("+09:00".to_string(), 9 * 3600));
        assert_eq!(info.name, "JST");
        assert_eq!(info.offset, 9 * 3600);
        assert_eq!(default_location(), Location::Local);
    }

    #[test]
    #[serial]
    fn unloadable_zone_reports_host_values() {
        clear_default_location();

        let info = reconcile("Mars/Olympus_Mons", ("XST".to_string(), -3600));
        assert_eq!(info, ZoneInfo { name: "XST".to_string(), location: Location::Local, offset: -3600 });
        assert_eq!(default_location(), Location::Local);
    }
}
