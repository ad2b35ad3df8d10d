//! Environment overlays from `.env` files
//!
//! The embedded file provides defaults that never clobber variables the
//! process already has. The optional on-disk file is an operator override and
//! wins over everything, including variables set before startup.

use crate::error::{Error, Result};
use crate::source::FileSource;
use tracing::{debug, warn};

/// Location of the default env file inside the embedded file set.
pub const EMBEDDED_ENV_PATH: &str = "embeds/envs/.env";

/// Location of the override env file relative to the work dir.
pub const REGULAR_ENV_PATH: &str = "params/.env";

/// Parse a whole env file into key/value pairs.
///
/// Nothing is applied if any line fails to parse.
fn parse(bytes: &[u8]) -> std::result::Result<Vec<(String, String)>, dotenvy::Error> {
    dotenvy::from_read_iter(bytes).collect()
}

fn applicable(key: &str, value: &str) -> bool {
    !key.is_empty() && !key.contains(['=', '\0']) && !value.contains('\0')
}

/// Load the embedded default env file without overriding existing variables.
///
/// Returns the number of variables that were applied.
pub fn load_embedded(source: &dyn FileSource, path: &str) -> Result<usize> {
    let bytes = source.read(path).map_err(|e| Error::EmbeddedEnv {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    let pairs = parse(&bytes).map_err(|e| Error::EmbeddedEnv {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    let mut applied = 0;
    for (key, value) in &pairs {
        if !applicable(key, value) || std::env::var_os(key).is_some() {
            continue;
        }
        std::env::set_var(key, value);
        applied += 1;
    }
    debug!(path, total = pairs.len(), applied, "loaded embedded env file");
    Ok(applied)
}

/// Load the optional on-disk env file, overriding existing variables.
///
/// A missing file is expected. An unreadable or malformed one is logged and
/// skipped. Returns the number of variables that were applied.
pub fn load_regular(source: &dyn FileSource, path: &str) -> usize {
    if !source.exists(path) {
        debug!(path, source = source.label(), "no override env file");
        return 0;
    }

    let pairs = match source.read(path).map_err(|e| e.to_string()).and_then(|bytes| {
        parse(&bytes).map_err(|e| e.to_string())
    }) {
        Ok(pairs) => pairs,
        Err(e) => {
            warn!(path, source = source.label(), "ignoring override env file: {}", e);
            return 0;
        }
    };

    let mut applied = 0;
    for (key, value) in &pairs {
        if applicable(key, value) {
            std::env::set_var(key, value);
            applied += 1;
        }
    }
    debug!(path, applied, "loaded override env file");
    applied
}

/// Load the embedded env file, then the on-disk override if present.
pub fn load(
    embedded: &dyn FileSource,
    embedded_path: &str,
    disk: &dyn FileSource,
    regular_path: &str,
) -> Result<()> {
    load_embedded(embedded, embedded_path)?;
    load_regular(disk, regular_path);
    Ok(())
}
