//! Typed session identifier.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an SOS session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SosId(Uuid);

impl SosId {
    /// Creates a new random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SosId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SosId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SosId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Serialize for SosId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for SosId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_distinct() {
        assert_ne!(SosId::new(), SosId::new());
    }

    #[test]
    fn parses_and_displays_hyphenated_uuid() {
        let raw = "6f1c1b0e-2f4e-4b7a-9a53-0f8de1c2a9b4";
        let id: SosId = raw.parse().expect("valid uuid");
        assert_eq!(id.to_string(), raw);
        assert!("not-a-uuid".parse::<SosId>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = SosId::new();
        let json = serde_json::to_value(id).expect("serialize");
        assert_eq!(json, serde_json::json!(id.to_string()));
    }

    #[test]
    fn deserialize_rejects_non_uuid() {
        assert!(serde_json::from_value::<SosId>(serde_json::json!("abc")).is_err());
    }
}
