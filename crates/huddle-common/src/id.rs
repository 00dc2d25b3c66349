use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Identifies one connection instance of a participant.
///
/// A user with two open tabs has two client ids; presence records and
/// peer links are keyed by it. Some backends send it as a JSON number, so
/// both forms deserialize and compare as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl<'de> Deserialize<'de> for ClientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

impl ClientId {
    pub fn new() -> Self {
        Self(new_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_valid_uuid() {
        let id = new_id();
        let parsed = uuid::Uuid::parse_str(&id);
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn new_id_is_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn client_id_new_is_uuid() {
        let id = ClientId::new();
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn client_id_display_matches_inner() {
        let id = ClientId::from("c1");
        assert_eq!(id.to_string(), "c1");
        assert_eq!(id.as_str(), "c1");
    }

    #[test]
    fn client_id_serializes_as_plain_string() {
        let id = ClientId::from("abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");
        let back: ClientId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn client_id_accepts_numbers() {
        let id: ClientId = serde_json::from_str("17").unwrap();
        assert_eq!(id, ClientId::from("17"));
        assert!(serde_json::from_str::<ClientId>("true").is_err());
    }

    #[test]
    fn client_id_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        let a = ClientId::new();
        set.insert(a.clone());
        set.insert(a);
        assert_eq!(set.len(), 1);
    }
}
