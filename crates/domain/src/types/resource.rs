//! FHIR resources as opaque JSON documents with a declared type

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared `resourceType` of a FHIR resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Patient,
    Account,
    Organization,
    /// Any other resource kind, kept verbatim
    Other(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Patient => "Patient",
            Self::Account => "Account",
            Self::Organization => "Organization",
            Self::Other(name) => name,
        }
    }

    /// Relative reference to an instance, e.g. `Patient/123`
    pub fn reference(&self, id: &str) -> String {
        format!("{}/{}", self.as_str(), id)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<&str> for ResourceType {
    fn from(value: &str) -> Self {
        match value {
            "Patient" => Self::Patient,
            "Account" => Self::Account,
            "Organization" => Self::Organization,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for ResourceType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name.as_str()))
    }
}

/// One FHIR resource document.
///
/// The body is kept as raw JSON so that no field the server sends is lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(Value);

impl Resource {
    pub fn new(body: Value) -> Self {
        Self(body)
    }

    /// Declared `resourceType`, if present
    pub fn resource_type(&self) -> Option<&str> {
        self.0.get("resourceType").and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn is_kind(&self, kind: &ResourceType) -> bool {
        self.resource_type() == Some(kind.as_str())
    }

    /// Look up a top-level field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }
}

impl From<Value> for Resource {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn resource_type_round_trips_known_and_unknown_names() {
        assert_eq!(ResourceType::from("Patient"), ResourceType::Patient);
        assert_eq!(ResourceType::from("Encounter"), ResourceType::Other("Encounter".into()));
        assert_eq!(ResourceType::Other("Encounter".into()).to_string(), "Encounter");
        assert_eq!(ResourceType::Organization.reference("org-1"), "Organization/org-1");
    }

    #[test]
    fn resource_exposes_type_and_id() {
        let resource = Resource::new(json!({"resourceType": "Patient", "id": "p1"}));
        assert_eq!(resource.resource_type(), Some("Patient"));
        assert_eq!(resource.id(), Some("p1"));
        assert!(resource.is_kind(&ResourceType::Patient));
        assert!(!resource.is_kind(&ResourceType::Account));
    }

    #[test]
    fn resource_serializes_transparently() {
        let body = json!({"resourceType": "Account", "id": "a1", "status": "active"});
        let resource = Resource::new(body.clone());
        assert_eq!(serde_json::to_value(&resource).unwrap(), body);
    }
}
