//! FactStore: per-agent fact collections with identity-keyed upserts.
//!
//! Facts are kept in insertion order. Next to the ordered slots every agent keeps an identity
//! index `(subject, property) -> target -> slot`, so a strict key resolves to at most one slot
//! and an attribute key to every target recorded under its subject and property. A strict
//! duplicate therefore cannot exist in any store.

use std::collections::{btree_map::Entry, BTreeMap};

use crate::{
    error::PerspectiveError,
    properties::{AgentId, AttributeKey, Fact},
};

use super::policy::{IdentityKey, MergePolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// The fact replaced this many facts sharing its identity key.
    Replaced(usize),
}

impl UpsertOutcome {
    pub fn is_insert(&self) -> bool {
        matches!(self, UpsertOutcome::Inserted)
    }
}

/// The ordered facts believed by one agent.
#[derive(Debug, Clone, Default)]
pub struct AgentFacts {
    slots: BTreeMap<u64, Fact>,
    index: BTreeMap<AttributeKey, BTreeMap<Option<String>, u64>>,
    next_slot: u64,
}

impl AgentFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fact> {
        self.slots.values()
    }

    pub fn to_vec(&self) -> Vec<Fact> {
        self.slots.values().cloned().collect()
    }

    /// Every fact stored under `attribute`, whatever its target, ordered by target.
    pub fn with_attribute<'a>(
        &'a self,
        attribute: &AttributeKey,
    ) -> impl Iterator<Item = &'a Fact> + 'a {
        self.index
            .get(attribute)
            .into_iter()
            .flat_map(|targets| targets.values())
            .filter_map(|slot| self.slots.get(slot))
    }

    /// Append `fact` after deleting whatever shares its identity under `policy`.
    pub fn upsert(&mut self, fact: Fact, policy: MergePolicy) -> UpsertOutcome {
        let replaced = self.take(&policy.key(&fact)).len();
        let slot = self.next_slot;
        self.next_slot += 1;
        self.index
            .entry(fact.attribute_key())
            .or_default()
            .insert(fact.target_name.clone(), slot);
        self.slots.insert(slot, fact);
        if replaced == 0 {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Replaced(replaced)
        }
    }

    /// Remove and return the facts addressed by `key`, in store order.
    pub fn take(&mut self, key: &IdentityKey) -> Vec<Fact> {
        let mut doomed = match key {
            IdentityKey::Strict { attribute, target } => {
                let Some(targets) = self.index.get_mut(attribute) else {
                    return Vec::new();
                };
                let slot = targets.remove(target);
                if targets.is_empty() {
                    self.index.remove(attribute);
                }
                slot.into_iter().collect::<Vec<u64>>()
            }
            IdentityKey::Attribute(attribute) => self
                .index
                .remove(attribute)
                .map(|targets| targets.into_values().collect())
                .unwrap_or_default(),
        };
        doomed.sort_unstable();
        doomed
            .into_iter()
            .filter_map(|slot| self.slots.remove(&slot))
            .collect()
    }

    pub fn remove_key(&mut self, key: &IdentityKey) -> usize {
        self.take(key).len()
    }

    pub fn remove_matching<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Fact) -> bool,
    {
        let doomed: Vec<u64> = self
            .slots
            .iter()
            .filter(|(_, fact)| predicate(fact))
            .map(|(slot, _)| *slot)
            .collect();
        for slot in doomed.iter() {
            if let Some(fact) = self.slots.remove(slot) {
                self.unindex(&fact, *slot);
            }
        }
        doomed.len()
    }

    /// Remove the fact at `position` in iteration order.
    pub fn remove_at(&mut self, position: usize) -> Result<Fact, PerspectiveError> {
        let Some(slot) = self.slots.keys().nth(position).copied() else {
            return Err(PerspectiveError::IndexOutOfRange {
                index: position,
                len: self.slots.len(),
            });
        };
        let fact = self
            .slots
            .remove(&slot)
            .ok_or(PerspectiveError::IndexOutOfRange {
                index: position,
                len: self.slots.len(),
            })?;
        self.unindex(&fact, slot);
        Ok(fact)
    }

    fn unindex(&mut self, fact: &Fact, slot: u64) {
        if let Entry::Occupied(mut targets) = self.index.entry(fact.attribute_key()) {
            if targets.get().get(&fact.target_name) == Some(&slot) {
                targets.get_mut().remove(&fact.target_name);
            }
            if targets.get().is_empty() {
                targets.remove();
            }
        }
    }
}

/// Fact collections of every known agent, keyed by [AgentId].
#[derive(Debug, Clone, Default)]
pub struct FactStore {
    agents: BTreeMap<AgentId, AgentFacts>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `agent` has a (possibly empty) store.
    pub fn register(&mut self, agent: AgentId) {
        self.agents.entry(agent).or_insert_with(AgentFacts::new);
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.agents.contains_key(&agent)
    }

    pub fn agents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.keys().copied()
    }

    pub fn agent(&self, agent: AgentId) -> Option<&AgentFacts> {
        self.agents.get(&agent)
    }

    pub fn upsert(&mut self, agent: AgentId, fact: Fact, policy: MergePolicy) -> UpsertOutcome {
        self.agents.entry(agent).or_default().upsert(fact, policy)
    }

    pub fn remove_key(&mut self, agent: AgentId, key: &IdentityKey) -> usize {
        self.agents
            .get_mut(&agent)
            .map(|facts| facts.remove_key(key))
            .unwrap_or(0)
    }

    pub fn remove_matching<F>(&mut self, agent: AgentId, predicate: F) -> usize
    where
        F: FnMut(&Fact) -> bool,
    {
        self.agents
            .get_mut(&agent)
            .map(|facts| facts.remove_matching(predicate))
            .unwrap_or(0)
    }

    pub fn remove_at(&mut self, agent: AgentId, position: usize) -> Result<Fact, PerspectiveError> {
        match self.agents.get_mut(&agent) {
            Some(facts) => facts.remove_at(position),
            None => Err(PerspectiveError::IndexOutOfRange {
                index: position,
                len: 0,
            }),
        }
    }

    pub fn iter(&self, agent: AgentId) -> impl Iterator<Item = &Fact> {
        self.agents.get(&agent).into_iter().flat_map(|facts| facts.iter())
    }

    pub fn facts(&self, agent: AgentId) -> Vec<Fact> {
        self.agents
            .get(&agent)
            .map(|facts| facts.to_vec())
            .unwrap_or_default()
    }

    pub fn len(&self, agent: AgentId) -> usize {
        self.agents.get(&agent).map(|facts| facts.len()).unwrap_or(0)
    }
}
