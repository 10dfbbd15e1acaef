//! Identity rules deciding which stored fact an incoming fact replaces.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::properties::{AttributeKey, Fact, PropertyType};

/// The identity of a fact under one of the two [MergePolicy]s.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentityKey {
    /// (subject, target, property): one value per exact triple.
    Strict {
        attribute: AttributeKey,
        target: Option<String>,
    },
    /// (subject, property): one value regardless of target.
    Attribute(AttributeKey),
}

impl IdentityKey {
    pub fn attribute(&self) -> &AttributeKey {
        match self {
            IdentityKey::Strict { attribute, .. } => attribute,
            IdentityKey::Attribute(attribute) => attribute,
        }
    }

    pub fn matches(&self, fact: &Fact) -> bool {
        let attribute = self.attribute();
        if fact.subject_name != attribute.subject || fact.property != attribute.property {
            return false;
        }
        match self {
            IdentityKey::Strict { target, .. } => fact.target_name == *target,
            IdentityKey::Attribute(_) => true,
        }
    }
}

impl Display for IdentityKey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            IdentityKey::Strict {
                attribute,
                target: Some(target),
            } => write!(f, "{attribute} {target}"),
            IdentityKey::Strict {
                attribute,
                target: None,
            } => write!(f, "{attribute} -"),
            IdentityKey::Attribute(attribute) => write!(f, "{attribute} *"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Relational and observational facts.
    StrictIdentity,
    /// Declarative state facts: the newest value wins whatever its target.
    AttributeIdentity,
}

impl MergePolicy {
    pub fn for_property_type(property_type: &PropertyType) -> MergePolicy {
        if property_type.is_persistent() {
            MergePolicy::AttributeIdentity
        } else {
            MergePolicy::StrictIdentity
        }
    }

    pub fn for_fact(fact: &Fact) -> MergePolicy {
        MergePolicy::for_property_type(&fact.property_type)
    }

    pub fn key(self, fact: &Fact) -> IdentityKey {
        match self {
            MergePolicy::StrictIdentity => IdentityKey::Strict {
                attribute: fact.attribute_key(),
                target: fact.target_name.clone(),
            },
            MergePolicy::AttributeIdentity => IdentityKey::Attribute(fact.attribute_key()),
        }
    }
}
