//! Read-only name/id table of the agents whose beliefs are tracked.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{error::PerspectiveError, properties::AgentId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub id: AgentId,
}

impl AgentRecord {
    pub fn new<N: Into<String>>(name: N, id: u32) -> Self {
        AgentRecord {
            name: name.into(),
            id: AgentId(id),
        }
    }
}

/// Tracked agents, indexed both ways. Populated once from configuration and never mutated by
/// the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRegistry {
    by_name: BTreeMap<String, AgentId>,
    by_id: BTreeMap<AgentId, String>,
}

impl AgentRegistry {
    /// Build the registry, rejecting empty names and duplicate names or ids.
    pub fn from_records<'a, I>(records: I) -> Result<AgentRegistry, PerspectiveError>
    where
        I: IntoIterator<Item = &'a AgentRecord>,
    {
        let mut registry = AgentRegistry::default();
        for record in records {
            if record.name.trim().is_empty() {
                return Err(PerspectiveError::Configuration(format!(
                    "agent {} has an empty name",
                    record.id
                )));
            }
            if registry.by_name.contains_key(&record.name) {
                return Err(PerspectiveError::Configuration(format!(
                    "agent name {} is registered twice",
                    record.name
                )));
            }
            if let Some(other) = registry.by_id.get(&record.id) {
                return Err(PerspectiveError::Configuration(format!(
                    "agent id {} is shared by {} and {}",
                    record.id, other, record.name
                )));
            }
            registry.by_name.insert(record.name.clone(), record.id);
            registry.by_id.insert(record.id, record.name.clone());
        }
        Ok(registry)
    }

    pub fn id(&self, name: &str) -> Option<AgentId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: AgentId) -> Option<&str> {
        self.by_id.get(&id).map(|name| name.as_str())
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Registered agents in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &str)> {
        self.by_id.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_lookups_both_ways() {
        let records = [AgentRecord::new("HUMAN2", 102), AgentRecord::new("HUMAN1", 101)];
        let registry = AgentRegistry::from_records(records.iter()).unwrap();

        assert_eq!(registry.id("HUMAN1"), Some(AgentId(101)));
        assert_eq!(registry.name(AgentId(102)), Some("HUMAN2"));
        assert_eq!(registry.id("HUMAN3"), None);
        let ids: Vec<AgentId> = registry.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![AgentId(101), AgentId(102)]);
    }

    #[test]
    fn test_duplicates_are_configuration_errors() {
        let same_id = [AgentRecord::new("HUMAN1", 101), AgentRecord::new("HUMAN2", 101)];
        let err = AgentRegistry::from_records(same_id.iter()).unwrap_err();
        assert!(err.is_fatal());

        let blank = [AgentRecord::new("  ", 5)];
        assert!(AgentRegistry::from_records(blank.iter()).is_err());
    }
}
