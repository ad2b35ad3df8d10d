//! Config fragment parsing

use crate::error::Error;
use anyhow::{Context, Result};
use figment::providers::{Format, Json, Toml, Yaml};
use figment::value::{Dict, Value};
use figment::{Profile, Provider};
use std::fmt;
use std::str::FromStr;

/// File format shared by every config fragment of one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigType {
    Json,
    #[default]
    Toml,
    Yaml,
    Dotenv,
}

impl ConfigType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::Json => "json",
            ConfigType::Toml => "toml",
            ConfigType::Yaml => "yaml",
            ConfigType::Dotenv => "dotenv",
        }
    }

    /// Parse one fragment into a key/value tree.
    ///
    /// Blank fragments yield an empty dictionary.
    pub fn parse_fragment(&self, bytes: &[u8], name: &str) -> Result<Dict> {
        let content = std::str::from_utf8(bytes)
            .with_context(|| format!("Fragment is not valid UTF-8: {name}"))?;
        if content.trim().is_empty() {
            return Ok(Dict::new());
        }

        match self {
            ConfigType::Json => provider_dict(Json::string(content), name),
            ConfigType::Toml => provider_dict(Toml::string(content), name),
            ConfigType::Yaml => provider_dict(Yaml::string(content), name),
            ConfigType::Dotenv => parse_dotenv(content, name),
        }
    }
}

impl FromStr for ConfigType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ConfigType::Json),
            "toml" => Ok(ConfigType::Toml),
            "yaml" | "yml" => Ok(ConfigType::Yaml),
            "dotenv" | "env" => Ok(ConfigType::Dotenv),
            _ => Err(Error::UnsupportedConfigType(s.to_string())),
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Eagerly evaluate a figment format provider so syntax errors surface per file.
///
/// Keys are lower-cased: fragment keys are matched case-insensitively.
fn provider_dict<P: Provider>(provider: P, name: &str) -> Result<Dict> {
    let mut data = provider.data().with_context(|| format!("Invalid fragment syntax: {name}"))?;
    Ok(lowercase_keys(data.remove(&Profile::Default).unwrap_or_default()))
}

/// Dotenv fragments: `a.b=1` nests as `{ a: { b: "1" } }`.
///
/// Values stay strings; binding converts them to the destination's field types.
fn parse_dotenv(content: &str, name: &str) -> Result<Dict> {
    let mut dict = Dict::new();
    for item in dotenvy::from_read_iter(content.as_bytes()) {
        let (key, raw) = item.with_context(|| format!("Invalid dotenv fragment: {name}"))?;
        insert_path(&mut dict, &key.to_ascii_lowercase(), Value::from(raw.as_str()));
    }
    Ok(dict)
}

fn lowercase_keys(dict: Dict) -> Dict {
    dict.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Dict(tag, child) => Value::Dict(tag, lowercase_keys(child)),
                other => other,
            };
            (key.to_lowercase(), value)
        })
        .collect()
}

/// Respell the keys of `dict` after the matching keys of `shape`, ignoring case.
///
/// Keys with no counterpart in `shape` are kept as they are.
pub(crate) fn align_keys(dict: &Dict, shape: Option<&Dict>) -> Dict {
    dict.iter()
        .map(|(key, value)| {
            let target = shape.and_then(|shape| shape.get_key_value(key).or_else(|| {
                shape.iter().find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            }));
            let (name, child_shape) = match target {
                Some((name, child)) => (name.clone(), child.as_dict()),
                None => (key.clone(), None),
            };
            let value = match value {
                Value::Dict(tag, child) => Value::Dict(*tag, align_keys(child, child_shape)),
                other => other.clone(),
            };
            (name, value)
        })
        .collect()
}

/// Insert `value` at the dotted `path`, creating intermediate dictionaries.
pub(crate) fn insert_path(dict: &mut Dict, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            dict.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = dict.entry(head.to_string()).or_insert_with(|| Value::from(Dict::new()));
            if entry.as_dict().is_none() {
                *entry = Value::from(Dict::new());
            }
            if let Value::Dict(_, child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Every dotted leaf key reachable in `dict`.
pub(crate) fn leaf_keys(dict: &Dict, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in dict {
        let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
        match value {
            Value::Dict(_, child) if !child.is_empty() => leaf_keys(child, &path, out),
            _ => out.push(path),
        }
    }
}
