//! Property-bag wire decoding
//!
//! The cluster REST API does not return structured JSON entities. Every object
//! comes back as a flat list of name/value string pairs:
//!
//! ```json
//! { "Properties": [ { "Name": "State", "Value": "Online" }, ... ] }
//! ```
//!
//! This module models that shape and provides the typed accessors the domain
//! types decode themselves with. Decoding is lenient per field: an empty value
//! is treated as absent and an unparseable value is dropped, since the backend
//! freely omits or blanks properties depending on node deployment type.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while decoding a property bag into a domain type
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A property the entity cannot exist without was missing or empty
    #[error("missing required property: {0}")]
    MissingProperty(&'static str),
}

/// A single name/value pair in a property bag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestProperty {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// An entity as the REST API returns it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestObject {
    #[serde(rename = "Properties")]
    pub properties: Vec<RestProperty>,
}

impl RestObject {
    /// Look up a property by name
    ///
    /// Empty values are treated as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Look up a property and parse it, dropping unparseable values
    pub fn get_parsed<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    /// Look up a boolean property
    ///
    /// The backend is inconsistent about casing ("true" vs "True").
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| {
            if v.eq_ignore_ascii_case("true") {
                Some(true)
            } else if v.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        })
    }

    /// Look up a timestamp property
    ///
    /// Accepts RFC 3339 as well as the backend's zone-less ISO form, which is
    /// UTC by contract.
    pub fn get_time(&self, name: &str) -> Option<DateTime<Utc>> {
        let value = self.get(name)?;

        if let Ok(t) = DateTime::parse_from_rfc3339(value) {
            return Some(t.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|t| t.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(pairs: &[(&str, &str)]) -> RestObject {
        RestObject {
            properties: pairs
                .iter()
                .map(|(name, value)| RestProperty {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_get_skips_empty_values() {
        let obj = bag(&[("Name", "NODE-01"), ("Location", "")]);
        assert_eq!(obj.get("Name"), Some("NODE-01"));
        assert_eq!(obj.get("Location"), None);
        assert_eq!(obj.get("Missing"), None);
    }

    #[test]
    fn test_get_parsed_drops_garbage() {
        let obj = bag(&[("NumCores", "16"), ("MemorySize", "lots")]);
        assert_eq!(obj.get_parsed::<u32>("NumCores"), Some(16));
        assert_eq!(obj.get_parsed::<u64>("MemorySize"), None);
    }

    #[test]
    fn test_get_bool_is_case_insensitive() {
        let obj = bag(&[("Reachable", "True"), ("Dedicated", "false")]);
        assert_eq!(obj.get_bool("Reachable"), Some(true));
        assert_eq!(obj.get_bool("Dedicated"), Some(false));
    }

    #[test]
    fn test_get_time_accepts_both_forms() {
        let obj = bag(&[
            ("OnlineTime", "2026-08-01T12:30:00Z"),
            ("OfflineTime", "2026-08-01T09:15:30"),
        ]);
        let online = obj.get_time("OnlineTime").unwrap();
        assert_eq!(online.to_rfc3339(), "2026-08-01T12:30:00+00:00");
        let offline = obj.get_time("OfflineTime").unwrap();
        assert_eq!(offline.to_rfc3339(), "2026-08-01T09:15:30+00:00");
    }

    #[test]
    fn test_deserializes_wire_shape() {
        let json = r#"{"Properties":[{"Name":"State","Value":"Online"}]}"#;
        let obj: RestObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.get("State"), Some("Online"));
    }
}
