use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Cloud account identifier; the key of every per-account map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Temporary credentials returned by a role assumption.
#[derive(Clone, PartialEq, Eq)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: Option<DateTime<Utc>>,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// A scoped identity inside one target account. Built once per run and
/// only read afterwards.
#[derive(Debug, Clone)]
pub struct Session {
    pub account: AccountId,
    pub credentials: TemporaryCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    pub id: String,
    pub name: String,
}

impl HostedZone {
    pub fn new(id: impl Into<String>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: fully_qualified(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasTarget {
    pub dns_name: String,
    pub hosted_zone_id: String,
    pub evaluate_target_health: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_target: Option<AliasTarget>,
}

impl ResourceRecordSet {
    pub fn new(name: &str, record_type: &str, ttl: i64, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            record_type: record_type.to_string(),
            ttl: Some(ttl),
            values: values.iter().map(|v| v.to_string()).collect(),
            set_identifier: None,
            alias_target: None,
        }
    }

    pub fn alias(name: &str, record_type: &str, target: AliasTarget) -> Self {
        Self {
            name: name.to_string(),
            record_type: record_type.to_string(),
            ttl: None,
            values: Vec::new(),
            set_identifier: None,
            alias_target: Some(target),
        }
    }

    pub fn is_alias(&self) -> bool {
        self.alias_target.is_some()
    }
}

/// Cursor for the next page of a record listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPageToken {
    pub name: String,
    pub record_type: String,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<ResourceRecordSet>,
    pub next: Option<RecordPageToken>,
}

/// Zone name -> records in fetch order.
pub type ZoneRecords = BTreeMap<String, Vec<ResourceRecordSet>>;

/// Account -> zone name -> records. Ordered maps keep the serialized
/// document stable between runs.
pub type Snapshot = BTreeMap<AccountId, ZoneRecords>;

/// Normalizes a DNS name to its fully-qualified form.
pub fn fully_qualified(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_zone_name_is_fully_qualified() {
        assert_eq!(HostedZone::new("Z1", "example.com").name, "example.com.");
        assert_eq!(HostedZone::new("Z1", "example.com.").name, "example.com.");
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = TemporaryCredentials {
            access_key_id: "ASIAEXAMPLE".to_string(),
            secret_access_key: "very-secret".to_string(),
            session_token: "token-value".to_string(),
            expiration: None,
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("ASIAEXAMPLE"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("token-value"));
    }

    #[test]
    fn test_record_serialization_omits_absent_fields() {
        let record = ResourceRecordSet::new("www.example.com.", "A", 300, &["192.0.2.1"]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "www.example.com.",
                "type": "A",
                "ttl": 300,
                "values": ["192.0.2.1"]
            })
        );
    }
}
