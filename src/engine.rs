//! The belief revision engine.
//!
//! [BeliefEngine] owns the agent registry and every agent's [FactStore]. The main agent's store
//! is ground truth, rebuilt from the upstream feeds on each tick; every tracked agent's store is
//! its subjective belief, re-derived from ground truth through the [VisibilityIndex] and
//! overlaid with the facts cascaded to it by [Op::AddFact].
//!
//! A tick runs three steps in order:
//!
//! 1. purge the main agent's non-persistent facts,
//! 2. ingest the latest batch of every feed in configured order,
//! 3. re-derive the perspective of every tracked agent in ascending id order.
//!
//! Publishing ([BeliefEngine::publish]) is the fourth step and is kept separate so callers
//! decide where the fact lists go.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
};

use crate::{
    beliefbase::{FactStore, MergePolicy, UpsertOutcome, VisibilityIndex},
    commands::{Op, OpResult},
    config::EngineConfig,
    error::PerspectiveError,
    event::{FactList, SinkMap},
    feed::FactProducer,
    properties::{AgentId, Fact, PropertyType},
    registry::AgentRegistry,
};

/// Counts of one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    /// Non-persistent main-store facts dropped by the purge.
    pub purged: usize,
    /// Feed facts upserted into the main store.
    pub ingested: usize,
    /// Facts upserted into tracked agents' stores.
    pub derived: usize,
    /// Observer names of `IsVisible` feed facts that no registered agent carries. Those edges
    /// are not ingested.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub unknown_observers: BTreeSet<String>,
}

impl TickReport {
    /// Fail with a configuration error when any feed named an unregistered observer.
    pub fn check(&self) -> Result<(), PerspectiveError> {
        if self.unknown_observers.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = self.unknown_observers.iter().map(String::as_str).collect();
        Err(PerspectiveError::Configuration(format!(
            "tick {}: visibility edges from unregistered observers {}",
            self.tick,
            names.join(", ")
        )))
    }
}

impl Display for TickReport {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "tick {}: purged {}, ingested {}, derived {}",
            self.tick, self.purged, self.ingested, self.derived
        )?;
        if !self.unknown_observers.is_empty() {
            write!(f, ", {} unknown observer(s)", self.unknown_observers.len())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BeliefEngine {
    registry: AgentRegistry,
    main_agent: AgentId,
    feed_order: Vec<String>,
    store: FactStore,
    tick: u64,
    // Unknown observers already logged, so a misconfigured feed is reported once per name.
    reported_observers: BTreeSet<String>,
}

impl BeliefEngine {
    /// Validate the configured agents and open an empty store for each of them.
    pub fn new(config: &EngineConfig) -> Result<BeliefEngine, PerspectiveError> {
        let registry = config.registry()?;
        let mut store = FactStore::new();
        for (agent, _) in registry.iter() {
            store.register(agent);
        }
        tracing::info!(
            "[BeliefEngine::new] main agent {}:{} tracking {} agents",
            config.main_agent.name,
            config.main_agent.id,
            registry.len() - 1
        );
        Ok(BeliefEngine {
            registry,
            main_agent: config.main_agent.id,
            feed_order: config.feeds.clone(),
            store,
            tick: 0,
            reported_observers: BTreeSet::new(),
        })
    }

    pub fn main_agent(&self) -> AgentId {
        self.main_agent
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn store(&self) -> &FactStore {
        &self.store
    }

    /// Number of ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Tracked agents in ascending id order. The main agent is not one of them.
    pub fn tracked_agents(&self) -> impl Iterator<Item = (AgentId, &str)> {
        let main = self.main_agent;
        self.registry.iter().filter(move |(agent, _)| *agent != main)
    }

    pub fn facts(&self, agent: AgentId) -> Vec<Fact> {
        self.store.facts(agent)
    }

    pub fn fact_list(&self, agent: AgentId) -> Result<FactList, PerspectiveError> {
        let name = self
            .registry
            .name(agent)
            .ok_or(PerspectiveError::UnknownAgent(agent))?;
        Ok(FactList {
            agent_id: agent,
            agent_name: name.to_string(),
            tick: self.tick,
            fact_list: self.store.facts(agent),
        })
    }

    /// Strength with which a registered agent currently sees `subject`.
    ///
    /// Returns `Ok(None)` when the main store holds no edge from the agent to the subject.
    pub fn visibility(&self, agent: AgentId, subject: &str) -> Result<Option<f64>, PerspectiveError> {
        let observer = self.registry.name(agent).ok_or_else(|| {
            PerspectiveError::Configuration(format!("agent {agent} is not registered"))
        })?;
        Ok(self.main_index().visibility(observer, subject))
    }

    fn main_index(&self) -> VisibilityIndex<'_> {
        VisibilityIndex::new(self.store.agent(self.main_agent))
    }

    /// Tracked agents that currently see `subject`, with their visibility strength.
    fn observers_of(&self, subject: &str) -> Vec<(AgentId, f64)> {
        let index = self.main_index();
        self.tracked_agents()
            .filter_map(|(agent, name)| index.visibility(name, subject).map(|v| (agent, v)))
            .collect()
    }

    /// Reorder `feeds` to the configured ingestion order. Unconfigured feeds keep their relative
    /// order and go last.
    pub fn order_feeds(&self, mut feeds: Vec<Box<dyn FactProducer>>) -> Vec<Box<dyn FactProducer>> {
        for feed in feeds.iter() {
            if !self.feed_order.iter().any(|name| name == feed.name()) {
                tracing::warn!(
                    "[BeliefEngine::order_feeds] feed {} is not configured, ingesting it last",
                    feed.name()
                );
            }
        }
        feeds.sort_by_key(|feed| {
            self.feed_order
                .iter()
                .position(|name| name == feed.name())
                .unwrap_or(usize::MAX)
        });
        feeds
    }

    /// Run purge, ingest and perspective refresh once.
    pub fn tick(&mut self, feeds: &[Box<dyn FactProducer>]) -> TickReport {
        self.tick += 1;
        let purged = self
            .remove_internal_facts(self.main_agent)
            .unwrap_or_default();
        let mut unknown_observers = BTreeSet::new();
        let ingested = self.ingest(feeds, &mut unknown_observers);
        let derived = self.refresh_perspectives();
        let report = TickReport {
            tick: self.tick,
            purged,
            ingested,
            derived,
            unknown_observers,
        };
        tracing::debug!("[BeliefEngine::tick] {report}");
        report
    }

    fn ingest(
        &mut self,
        feeds: &[Box<dyn FactProducer>],
        unknown_observers: &mut BTreeSet<String>,
    ) -> usize {
        let mut ingested = 0;
        for feed in feeds {
            for fact in feed.latest() {
                if let Err(e) = fact.validate() {
                    tracing::warn!(
                        "[BeliefEngine::ingest] skipping fact from {}: {e}",
                        feed.name()
                    );
                    continue;
                }
                if let Err(e) = self.check_observer(&fact) {
                    if self.reported_observers.insert(fact.subject_name.clone()) {
                        tracing::error!("[BeliefEngine::ingest] feed {}: {e}", feed.name());
                    }
                    unknown_observers.insert(fact.subject_name);
                    continue;
                }
                let policy = MergePolicy::for_fact(&fact);
                let key = policy.key(&fact);
                if let UpsertOutcome::Replaced(count) =
                    self.store.upsert(self.main_agent, fact, policy)
                {
                    tracing::debug!(
                        "[BeliefEngine::ingest] {} replaced {count} fact(s) under {key}",
                        feed.name()
                    );
                }
                ingested += 1;
            }
        }
        ingested
    }

    /// Re-derive every tracked agent's view of the main store. Returns the number of derived
    /// facts written.
    fn refresh_perspectives(&mut self) -> usize {
        let tracked: Vec<(AgentId, String)> = self
            .tracked_agents()
            .map(|(agent, name)| (agent, name.to_string()))
            .collect();
        let mut derived_total = 0;
        for (agent, name) in tracked {
            let derived = self.derive_perspective(&name);
            for (fact, policy) in derived.iter() {
                self.store.remove_key(agent, &policy.key(fact));
            }
            derived_total += derived.len();
            for (fact, policy) in derived {
                self.store.upsert(agent, fact, policy);
            }
        }
        derived_total
    }

    /// The main-store facts `observer` perceives, attenuated by visibility and observability.
    fn derive_perspective(&self, observer: &str) -> Vec<(Fact, MergePolicy)> {
        let Some(main) = self.store.agent(self.main_agent) else {
            return Vec::new();
        };
        let visible = VisibilityIndex::new(Some(main)).visible_subjects(observer);
        if visible.is_empty() {
            return Vec::new();
        }
        main.iter()
            .filter(|fact| fact.fact_observability > 0.0)
            .filter_map(|fact| {
                visible.get(fact.subject_name.as_str()).map(|visibility| {
                    (
                        fact.attenuated(visibility * fact.fact_observability),
                        MergePolicy::for_fact(fact),
                    )
                })
            })
            .collect()
    }

    /// Send every registered agent's current facts to its sink.
    pub fn publish(&self, sinks: &SinkMap) {
        for (agent, name) in self.registry.iter() {
            let Some(sink) = sinks.get(&agent) else {
                tracing::debug!("[BeliefEngine::publish] no sink for {name}:{agent}");
                continue;
            };
            sink.publish(FactList {
                agent_id: agent,
                agent_name: name.to_string(),
                tick: self.tick,
                fact_list: self.store.facts(agent),
            });
        }
    }

    /// Require exactly one sink per registered agent.
    pub fn check_sinks(&self, sinks: &SinkMap) -> Result<(), PerspectiveError> {
        if let Some((agent, name)) = self
            .registry
            .iter()
            .find(|(agent, _)| !sinks.contains_key(agent))
        {
            return Err(PerspectiveError::Configuration(format!(
                "no sink for agent {name}:{agent}"
            )));
        }
        if let Some(agent) = sinks.keys().find(|agent| !self.registry.contains(**agent)) {
            return Err(PerspectiveError::Configuration(format!(
                "sink for unregistered agent {agent}"
            )));
        }
        Ok(())
    }

    /// An `IsVisible` edge must come from a registered agent.
    fn check_observer(&self, fact: &Fact) -> Result<(), PerspectiveError> {
        if fact.is_visibility_edge() && self.registry.id(&fact.subject_name).is_none() {
            return Err(PerspectiveError::Configuration(format!(
                "visibility edge {fact} names unregistered observer {}",
                fact.subject_name
            )));
        }
        Ok(())
    }

    /// Upsert `fact` into the main store at its authored confidence, then into the store of every
    /// tracked agent that sees its subject, attenuated by that agent's visibility.
    pub fn add_fact(&mut self, fact: Fact) -> Result<(), PerspectiveError> {
        fact.validate()?;
        self.check_observer(&fact)?;
        let policy = MergePolicy::for_fact(&fact);
        if let UpsertOutcome::Replaced(count) =
            self.store.upsert(self.main_agent, fact.clone(), policy)
        {
            tracing::warn!(
                "[BeliefEngine::add_fact] DuplicateFact: {fact} replaced {count} main fact(s)"
            );
        }
        for (agent, visibility) in self.observers_of(&fact.subject_name) {
            let derived = fact.attenuated(visibility);
            if let UpsertOutcome::Replaced(count) =
                self.store
                    .upsert(agent, derived, MergePolicy::AttributeIdentity)
            {
                tracing::warn!(
                    "[BeliefEngine::add_fact] DuplicateFact: {fact} replaced {count} fact(s) of agent {agent}"
                );
            }
        }
        Ok(())
    }

    /// Remove the (subject, target, property) identity of `fact` from the main store and from
    /// every tracked agent that sees its subject. Returns whether any fact was removed.
    pub fn remove_fact(&mut self, fact: &Fact) -> Result<bool, PerspectiveError> {
        fact.validate_identity()?;
        let key = MergePolicy::StrictIdentity.key(fact);
        let mut removed = self.store.remove_key(self.main_agent, &key);
        for (agent, _) in self.observers_of(&fact.subject_name) {
            removed += self.store.remove_key(agent, &key);
        }
        tracing::debug!("[BeliefEngine::remove_fact] removed {removed} fact(s) under {key}");
        Ok(removed > 0)
    }

    pub fn remove_property_type(
        &mut self,
        agent: AgentId,
        property_type: &PropertyType,
    ) -> Result<usize, PerspectiveError> {
        if !self.store.contains(agent) {
            return Err(PerspectiveError::UnknownAgent(agent));
        }
        Ok(self
            .store
            .remove_matching(agent, |fact| fact.property_type == *property_type))
    }

    /// Drop every non-persistent fact of `agent`. The tick purge runs this on the main agent.
    pub fn remove_internal_facts(&mut self, agent: AgentId) -> Result<usize, PerspectiveError> {
        if !self.store.contains(agent) {
            return Err(PerspectiveError::UnknownAgent(agent));
        }
        Ok(self.store.remove_matching(agent, |fact| !fact.is_persistent()))
    }

    /// Serve one request. Failures leave the stores untouched and answer not-accepted /
    /// not-removed.
    pub fn handle(&mut self, op: Op) -> OpResult {
        tracing::debug!("[BeliefEngine::handle] {op}");
        match op {
            Op::AddFact(fact) => match self.add_fact(fact) {
                Ok(()) => OpResult::Accepted(true),
                Err(e @ PerspectiveError::Configuration(_)) => {
                    tracing::error!("[BeliefEngine::handle] AddFact rejected: {e}");
                    OpResult::Accepted(false)
                }
                Err(e) => {
                    tracing::warn!("[BeliefEngine::handle] AddFact rejected: {e}");
                    OpResult::Accepted(false)
                }
            },
            Op::RemoveFact(fact) => match self.remove_fact(&fact) {
                Ok(removed) => OpResult::Removed(removed),
                Err(e) => {
                    tracing::warn!("[BeliefEngine::handle] RemoveFact rejected: {e}");
                    OpResult::Removed(false)
                }
            },
            Op::RemovePropertyType {
                agent,
                property_type,
            } => match self.remove_property_type(agent, &property_type) {
                Ok(count) => OpResult::Removed(count > 0),
                Err(e) => {
                    tracing::warn!("[BeliefEngine::handle] RemovePropertyType rejected: {e}");
                    OpResult::Removed(false)
                }
            },
            Op::RemoveInternalFacts(agent) => match self.remove_internal_facts(agent) {
                Ok(count) => OpResult::Removed(count > 0),
                Err(e) => {
                    tracing::warn!("[BeliefEngine::handle] RemoveInternalFacts rejected: {e}");
                    OpResult::Removed(false)
                }
            },
            Op::GetFacts(agent) => match self.fact_list(agent) {
                Ok(list) => OpResult::Facts(list),
                Err(e) => {
                    tracing::warn!("[BeliefEngine::handle] GetFacts: {e}");
                    OpResult::Facts(FactList {
                        agent_id: agent,
                        agent_name: String::new(),
                        tick: self.tick,
                        fact_list: Vec::new(),
                    })
                }
            },
        }
    }
}
