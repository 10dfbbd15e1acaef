//! [crate::properties] contains the basic building blocks handled by the
//! [crate::beliefbase::FactStore]: agents, facts, their typed values and property categories.
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::error::PerspectiveError;

/// Property name of the facts that carry visibility strength between an observer (subject) and
/// an observed entity (target).
pub const VISIBILITY_PROPERTY: &str = "IsVisible";

/// Id of the ground-truth agent when the configuration does not name another one.
pub const DEFAULT_MAIN_AGENT_ID: AgentId = AgentId(1);

/// Numeric agent identifier. Ordering is used to make every per-agent pass deterministic.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AgentId(pub u32);

impl From<u32> for AgentId {
    fn from(id: u32) -> Self {
        AgentId(id)
    }
}

impl Display for AgentId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of a fact property.
///
/// The category selects the identity policy used when the fact is merged into a store (see
/// [crate::beliefbase::MergePolicy]). Wire strings are matched case-insensitively, so
/// "state" and "State" both name [PropertyType::State]; anything unknown is kept verbatim in
/// [PropertyType::Other].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyType {
    /// Declarative state of an entity ("clean", "open"). Persistent.
    State,
    /// Intrinsic property of an entity (color, size). Persistent.
    StaticProperty,
    /// Relational position facts (IsOn, IsIn, IsVisible, ...). Refreshed every tick.
    Position,
    /// Movement facts (IsMoving, IsLookingToward, ...). Refreshed every tick.
    Motion,
    Other(String),
}

impl PropertyType {
    /// Persistent facts survive the tick purge and are only removed by explicit request.
    pub fn is_persistent(&self) -> bool {
        matches!(self, PropertyType::State | PropertyType::StaticProperty)
    }

    pub fn as_str(&self) -> &str {
        match self {
            PropertyType::State => "state",
            PropertyType::StaticProperty => "staticProperty",
            PropertyType::Position => "position",
            PropertyType::Motion => "motion",
            PropertyType::Other(other) => other.as_str(),
        }
    }
}

impl From<&str> for PropertyType {
    fn from(src: &str) -> Self {
        match src.to_ascii_lowercase().as_str() {
            "state" => PropertyType::State,
            "staticproperty" => PropertyType::StaticProperty,
            "position" => PropertyType::Position,
            "motion" => PropertyType::Motion,
            _ => PropertyType::Other(src.to_string()),
        }
    }
}

impl From<String> for PropertyType {
    fn from(src: String) -> Self {
        PropertyType::from(src.as_str())
    }
}

impl From<PropertyType> for String {
    fn from(src: PropertyType) -> Self {
        src.as_str().to_string()
    }
}

impl Display for PropertyType {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed fact value. On the wire this is a `valueType` discriminator next to a single `value`
/// field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "valueType", content = "value", rename_all = "lowercase")]
pub enum FactValue {
    Bool(bool),
    Double(f64),
    String(String),
}

impl FactValue {
    /// Read the value as a visibility strength in [0, 1].
    pub fn strength(&self) -> Option<f64> {
        match self {
            FactValue::Double(value) if value.is_finite() => Some(value.clamp(0.0, 1.0)),
            FactValue::Double(_) => None,
            FactValue::Bool(true) => Some(1.0),
            FactValue::Bool(false) => Some(0.0),
            FactValue::String(_) => None,
        }
    }
}

impl Display for FactValue {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            FactValue::Bool(value) => write!(f, "{value}"),
            FactValue::Double(value) => write!(f, "{value}"),
            FactValue::String(value) => write!(f, "{value:?}"),
        }
    }
}

fn unit_interval_default() -> f64 {
    1.0
}

/// A single statement about the world: `subject --property--> target = value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub subject_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    pub property: String,
    pub property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_property: Option<String>,
    #[serde(default = "unit_interval_default")]
    pub confidence: f64,
    /// How perceivable the fact is to other agents. 0.0 keeps it out of every derived store.
    #[serde(default = "unit_interval_default")]
    pub fact_observability: f64,
    #[serde(flatten)]
    pub value: FactValue,
    /// Nanoseconds since the epoch, as reported by the producer.
    #[serde(default)]
    pub timestamp: u64,
}

impl Fact {
    pub fn new<S, P>(subject_name: S, property: P, property_type: PropertyType) -> Fact
    where
        S: Into<String>,
        P: Into<String>,
    {
        Fact {
            subject_name: subject_name.into(),
            target_name: None,
            property: property.into(),
            property_type,
            sub_property: None,
            confidence: 1.0,
            fact_observability: 1.0,
            value: FactValue::Bool(true),
            timestamp: 0,
        }
    }

    /// A visibility edge: `observer` sees `subject` with the given strength.
    pub fn visibility<O, S>(observer: O, subject: S, strength: f64) -> Fact
    where
        O: Into<String>,
        S: Into<String>,
    {
        Fact::new(observer, VISIBILITY_PROPERTY, PropertyType::Position)
            .with_target(subject)
            .with_value(FactValue::Double(strength))
    }

    pub fn with_target<T: Into<String>>(mut self, target_name: T) -> Fact {
        self.target_name = Some(target_name.into());
        self
    }

    pub fn with_value(mut self, value: FactValue) -> Fact {
        self.value = value;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Fact {
        self.confidence = confidence;
        self
    }

    pub fn with_observability(mut self, fact_observability: f64) -> Fact {
        self.fact_observability = fact_observability;
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.property_type.is_persistent()
    }

    pub fn is_visibility_edge(&self) -> bool {
        self.property == VISIBILITY_PROPERTY
    }

    pub fn attribute_key(&self) -> AttributeKey {
        AttributeKey {
            subject: self.subject_name.clone(),
            property: self.property.clone(),
        }
    }

    /// Copy of this fact with its confidence scaled by `factor`.
    pub fn attenuated(&self, factor: f64) -> Fact {
        let mut fact = self.clone();
        fact.confidence *= factor;
        fact
    }

    /// Reject facts whose identity has an empty subject, target or property.
    pub fn validate_identity(&self) -> Result<(), PerspectiveError> {
        if self.subject_name.trim().is_empty() {
            return Err(PerspectiveError::EmptyIdentifier(format!(
                "subjectName of {}",
                self.property
            )));
        }
        if matches!(&self.target_name, Some(target) if target.trim().is_empty()) {
            return Err(PerspectiveError::EmptyIdentifier(format!(
                "targetName of {} {}",
                self.subject_name, self.property
            )));
        }
        if self.property.trim().is_empty() {
            return Err(PerspectiveError::EmptyIdentifier(format!(
                "property of {}",
                self.subject_name
            )));
        }
        Ok(())
    }

    /// Reject facts that cannot be keyed or whose scalars leave [0, 1].
    pub fn validate(&self) -> Result<(), PerspectiveError> {
        self.validate_identity()?;
        for (name, value) in [
            ("confidence", self.confidence),
            ("factObservability", self.fact_observability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PerspectiveError::InvalidFact(format!(
                    "{name} {value} of {} {} is outside [0, 1]",
                    self.subject_name, self.property
                )));
            }
        }
        Ok(())
    }
}

impl Display for Fact {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} {}", self.subject_name, self.property)?;
        if let Some(target) = &self.target_name {
            write!(f, " {target}")?;
        }
        write!(f, " = {} ({:.3})", self.value, self.confidence)
    }
}

/// The (subject, property) pair shared by both identity policies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeKey {
    pub subject: String,
    pub property: String,
}

impl Display for AttributeKey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} {}", self.subject, self.property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_property_type_parsing_is_case_insensitive() {
        assert_eq!(PropertyType::from("state"), PropertyType::State);
        assert_eq!(PropertyType::from("State"), PropertyType::State);
        assert_eq!(PropertyType::from("StaticProperty"), PropertyType::StaticProperty);
        assert_eq!(PropertyType::from("staticProperty"), PropertyType::StaticProperty);
        assert_eq!(
            PropertyType::from("affordance"),
            PropertyType::Other("affordance".to_string())
        );
        assert!(PropertyType::from("STATE").is_persistent());
        assert!(!PropertyType::Position.is_persistent());
        assert_eq!(String::from(PropertyType::StaticProperty), "staticProperty");
    }

    #[test]
    fn test_value_strength() {
        assert_eq!(FactValue::Double(0.25).strength(), Some(0.25));
        assert_eq!(FactValue::Double(-3.0).strength(), Some(0.0));
        assert_eq!(FactValue::Double(f64::NAN).strength(), None);
        assert_eq!(FactValue::Bool(false).strength(), Some(0.0));
        assert_eq!(FactValue::String("0.5".to_string()).strength(), None);
    }

    #[test]
    fn test_fact_wire_shape() {
        let fact = Fact::visibility("HUMAN1", "cup1", 0.7);
        let json = serde_json::to_value(&fact).unwrap();
        assert_eq!(json["subjectName"], "HUMAN1");
        assert_eq!(json["targetName"], "cup1");
        assert_eq!(json["propertyType"], "position");
        assert_eq!(json["valueType"], "double");
        assert_eq!(json["value"], 0.7);
        assert_eq!(json["factObservability"], 1.0);

        let parsed: Fact = serde_json::from_str(
            r#"{
                "subjectName": "table1",
                "property": "state",
                "propertyType": "State",
                "valueType": "string",
                "value": "clean"
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.property_type, PropertyType::State);
        assert_eq!(parsed.value, FactValue::String("clean".to_string()));
        assert_eq!(parsed.confidence, 1.0);
        assert_eq!(parsed.target_name, None);
    }

    #[test]
    fn test_attenuated_scales_confidence_only() {
        let fact = Fact::new("cup1", "IsPresent", PropertyType::Position)
            .with_confidence(0.8)
            .with_observability(0.5);
        let derived = fact.attenuated(0.5);
        assert_eq!(derived.confidence, 0.4);
        assert_eq!(derived.fact_observability, 0.5);
        assert_eq!(derived.attribute_key(), fact.attribute_key());
    }
}
