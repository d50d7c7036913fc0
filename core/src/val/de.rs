use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

use crate::val::{Mapping, Sequence, Type, Val};

/// Visitor building an open-typed document from any self-describing format.
///
/// Mappings keep the order of the source and accept any scalar as key, so YAML such as
/// `1: one` survives as an int key.
struct ValVisitor;

impl<'de> Visitor<'de> for ValVisitor {
    type Value = Val;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a document value of any type")
    }

    fn visit_bool<E>(self, value: bool) -> Result<Val, E> {
        Ok(Val::Bool(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Val, E> {
        Ok(Val::Int(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Val, E> {
        // Convert u64 to i64 if possible, otherwise to f64
        if value <= i64::MAX as u64 {
            Ok(Val::Int(value as i64))
        } else {
            Ok(Val::Float(value as f64))
        }
    }

    fn visit_f64<E>(self, value: f64) -> Result<Val, E> {
        Ok(Val::Float(value))
    }

    fn visit_str<E>(self, value: &str) -> Result<Val, E> {
        Ok(Val::Str(Arc::from(value)))
    }

    fn visit_string<E>(self, value: String) -> Result<Val, E> {
        Ok(Val::Str(Arc::<str>::from(value)))
    }

    fn visit_none<E>(self) -> Result<Val, E> {
        Ok(Val::Nil)
    }

    fn visit_unit<E>(self) -> Result<Val, E> {
        Ok(Val::Nil)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Val, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let size_hint = seq.size_hint().unwrap_or(0);
        let mut elements = Vec::with_capacity(size_hint);
        while let Some(elem) = seq.next_element::<Val>()? {
            elements.push(elem);
        }
        Ok(Val::Seq(Sequence::with_items(Type::Any, elements)))
    }

    fn visit_map<M>(self, mut map_access: M) -> Result<Val, M::Error>
    where
        M: MapAccess<'de>,
    {
        let size_hint = map_access.size_hint().unwrap_or(0);
        let mut map = Mapping::with_capacity(Type::Any, Type::Any, size_hint);
        while let Some((key, value)) = map_access.next_entry::<Val, Val>()? {
            map.insert(key, value);
        }
        Ok(Val::Map(map))
    }
}

impl<'de> Deserialize<'de> for Val {
    fn deserialize<D>(deserializer: D) -> Result<Val, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValVisitor)
    }
}

/// Direct JSON string to Val conversion avoiding intermediate serde_json::Value
pub fn from_json_str(input: &str) -> anyhow::Result<Val> {
    serde_json::from_str::<Val>(input).map_err(|e| anyhow!("invalid JSON document: {e}"))
}

/// Direct YAML string to Val conversion avoiding intermediate serde_yaml::Value
pub fn from_yaml_str(input: &str) -> anyhow::Result<Val> {
    serde_yaml::from_str::<Val>(input).map_err(|e| anyhow!("invalid YAML document: {e}"))
}

/// Direct TOML string to Val conversion avoiding intermediate toml::Value
pub fn from_toml_str(input: &str) -> anyhow::Result<Val> {
    toml::from_str::<Val>(input).map_err(|e| anyhow!("invalid TOML document: {e}"))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
        }
    }

    /// Serialize a document in this format
    pub fn render(&self, doc: &Val) -> anyhow::Result<String> {
        match self {
            Format::Json => Ok(serde_json::to_string_pretty(doc)?),
            Format::Yaml => Ok(serde_yaml::to_string(doc)?),
            Format::Toml => Ok(toml::to_string_pretty(doc)?),
        }
    }
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            other => Err(anyhow!("unknown document format: {other}")),
        }
    }
}

/// Detect the format of `input` by parsing it: JSON first, then TOML, falling back to YAML.
///
/// YAML accepts nearly any text, so it can only be the fallback. Blank input is an empty
/// YAML document.
pub fn detect_format(input: &str) -> Format {
    if input.trim().is_empty() {
        return Format::Yaml;
    }
    if serde_json::from_str::<serde::de::IgnoredAny>(input).is_ok() {
        return Format::Json;
    }
    if toml::from_str::<toml::Table>(input).is_ok() {
        return Format::Toml;
    }
    Format::Yaml
}

/// Parse input using automatic format detection or specified format
pub fn parse_with_format(input: &str, format_override: Option<Format>) -> anyhow::Result<Val> {
    let format = format_override.unwrap_or_else(|| detect_format(input));

    match format {
        Format::Json => from_json_str(input),
        Format::Yaml => from_yaml_str(input),
        Format::Toml => from_toml_str(input),
    }
}
