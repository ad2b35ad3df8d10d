//! Layered merge of config fragments and environment variables
//!
//! Fragments are merged in the order they are offered, later ones winning.
//! Environment variables sit above every file layer; the destination's own
//! current values sit below all of them and only fill keys nobody set.
//!
//! Keys match case-insensitively. Environment and dotenv values arrive as
//! strings and are converted to the destination's field types when bound.

use super::loader::{align_keys, insert_path, leaf_keys, ConfigType};
use crate::error::Result;
use crate::source::FileSource;
use figment::providers::{Env, Serialized};
use figment::value::{Dict, Map, Uncased, UncasedStr, Value};
use figment::{Figment, Metadata, Profile, Provider, Source};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// One parsed config file.
struct Fragment {
    layer: String,
    path: String,
    dict: Dict,
}

impl Provider for Fragment {
    fn metadata(&self) -> Metadata {
        Metadata::named(format!("{} config fragment", self.layer)).source(Source::Custom(self.path.clone()))
    }

    fn data(&self) -> std::result::Result<Map<Profile, Dict>, figment::Error> {
        Ok(Profile::Default.collect(self.dict.clone()))
    }
}

/// Environment overrides, nested by dotted key with every value kept as a string.
struct EnvOverrides {
    env: Env,
}

impl Provider for EnvOverrides {
    fn metadata(&self) -> Metadata {
        self.env.metadata()
    }

    fn data(&self) -> std::result::Result<Map<Profile, Dict>, figment::Error> {
        let mut dict = Dict::new();
        for (key, value) in self.env.iter() {
            insert_path(&mut dict, key.as_str(), Value::from(value));
        }
        Ok(Profile::Default.collect(dict))
    }
}

/// Accumulates config layers and binds them onto a destination type.
pub struct LayeredMerger {
    fragments: Vec<Fragment>,
    config_type: ConfigType,
    env_prefix: String,
    known_keys: BTreeSet<String>,
    merged: Vec<String>,
}

impl LayeredMerger {
    /// The env prefix is the upper-cased application name.
    pub fn new(app_name: &str, config_type: ConfigType) -> Self {
        Self {
            fragments: Vec::new(),
            config_type,
            env_prefix: app_name.to_uppercase(),
            known_keys: BTreeSet::new(),
            merged: Vec::new(),
        }
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    pub fn config_type(&self) -> ConfigType {
        self.config_type
    }

    /// Paths of every fragment merged so far, in merge order.
    pub fn merged_fragments(&self) -> &[String] {
        &self.merged
    }

    /// Environment variable that overrides the dotted `key`.
    ///
    /// `db.port` under app `demo` is `DEMO_DB_PORT`.
    pub fn env_key(&self, key: &str) -> String {
        format!("{}_{}", self.env_prefix, key.replace('.', "_").to_uppercase())
    }

    /// Merge every file matched by `patterns`, in pattern order and sorted
    /// match order within a pattern.
    ///
    /// Bad patterns and unreadable or malformed files are logged and skipped.
    /// Returns the number of fragments merged.
    pub fn merge_source(&mut self, source: &dyn FileSource, patterns: &[String]) -> usize {
        let mut count = 0;
        for pattern in patterns {
            let matches = match source.glob(pattern) {
                Ok(matches) => matches,
                Err(e) => {
                    warn!(pattern = %pattern, source = source.label(), "skipping invalid search pattern: {}", e);
                    continue;
                }
            };
            for path in matches {
                if !source.exists(&path) {
                    continue;
                }
                let bytes = match source.read(&path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(path = %path, source = source.label(), "skipping unreadable config fragment: {}", e);
                        continue;
                    }
                };
                if self.merge_fragment(source.label(), &path, &bytes) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Parse and merge a single fragment. Returns `false` if it was skipped.
    pub fn merge_fragment(&mut self, layer: &str, path: &str, bytes: &[u8]) -> bool {
        let dict = match self.config_type.parse_fragment(bytes, path) {
            Ok(dict) => dict,
            Err(e) => {
                warn!(path, layer, "skipping malformed config fragment: {:#}", e);
                return false;
            }
        };

        let mut keys = Vec::new();
        leaf_keys(&dict, "", &mut keys);
        self.known_keys.extend(keys);

        debug!(path, layer, format = %self.config_type, "merged config fragment");
        self.fragments.push(Fragment { layer: layer.to_string(), path: path.to_string(), dict });
        self.merged.push(path.to_string());
        true
    }

    /// Env overrides restricted to recognized keys, mapping `DB_PORT` back to `db.port`.
    ///
    /// `shape_keys` are spelled as the destination spells them and take
    /// precedence over fragment keys mapping to the same variable.
    fn env_layer(&self, shape_keys: &[String]) -> EnvOverrides {
        let shape_keys: BTreeSet<&String> = shape_keys.iter().collect();
        let mut lookup: BTreeMap<String, String> = BTreeMap::new();
        for key in shape_keys.into_iter().chain(&self.known_keys) {
            let env_form = key.replace('.', "_").to_ascii_lowercase();
            lookup.entry(env_form).or_insert_with(|| key.clone());
        }

        let env = Env::prefixed(&format!("{}_", self.env_prefix)).lowercase(false).filter_map(
            move |name: &UncasedStr| {
                lookup
                    .get(&name.as_str().to_ascii_lowercase())
                    .map(|key| Uncased::from(key.clone()))
            },
        );
        EnvOverrides { env }
    }

    /// Bind the merged layers onto `T`.
    ///
    /// Keys absent from every layer keep `base`'s value. Environment variables
    /// are consulted for every key seen in a fragment or in `base`. Fragment
    /// keys take `base`'s spelling where they differ only in case, and string
    /// values bind to numeric and boolean fields.
    pub fn unmarshal<T>(&self, base: &T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let base_value = Value::serialize(base)?;
        let shape = base_value.as_dict();
        let mut base_keys = Vec::new();
        if let Some(dict) = shape {
            leaf_keys(dict, "", &mut base_keys);
        }

        let mut figment = Figment::new();
        for fragment in &self.fragments {
            figment = figment.merge(Fragment {
                layer: fragment.layer.clone(),
                path: fragment.path.clone(),
                dict: align_keys(&fragment.dict, shape),
            });
        }
        figment = figment.merge(self.env_layer(&base_keys));
        if shape.is_some() {
            figment = figment.join(Serialized::defaults(base_value.clone()));
        }
        Ok(figment.extract_lossy::<T>()?)
    }
}
