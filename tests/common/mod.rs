//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use perspective_core::{
    config::EngineConfig,
    event::{Event, SinkMap},
    feed::{FactProducer, StaticFeed},
    properties::{AgentId, Fact, FactValue, PropertyType},
    registry::AgentRecord,
};
use std::sync::mpsc::Sender;

#[allow(dead_code)]
pub const MAIN: AgentId = AgentId(1);
#[allow(dead_code)]
pub const HUMAN1: AgentId = AgentId(101);
#[allow(dead_code)]
pub const HUMAN2: AgentId = AgentId(102);

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Main agent ROBOT:1 tracking HUMAN1:101 and HUMAN2:102.
#[allow(dead_code)]
pub fn scenario_config() -> EngineConfig {
    EngineConfig::default()
        .with_tracked_agents([AgentRecord::new("HUMAN1", 101), AgentRecord::new("HUMAN2", 102)])
        .with_feeds(["SPARK", "area_manager"])
}

#[allow(dead_code)]
pub fn static_feed(name: &str, facts: Vec<Fact>) -> Box<dyn FactProducer> {
    Box::new(StaticFeed::new(name, facts))
}

/// One sink per configured agent, all forwarding to `tx`.
#[allow(dead_code)]
pub fn channel_sinks(config: &EngineConfig, tx: &Sender<Event>) -> SinkMap {
    let mut sinks = SinkMap::new();
    for agent in std::iter::once(&config.main_agent).chain(config.tracked_agents.iter()) {
        sinks.insert(agent.id, Box::new(tx.clone()));
    }
    sinks
}

#[allow(dead_code)]
pub fn state(subject: &str, value: &str) -> Fact {
    Fact::new(subject, "state", PropertyType::State).with_value(FactValue::String(value.to_string()))
}

#[allow(dead_code)]
pub fn count(facts: &[Fact], subject: &str, property: &str) -> usize {
    facts
        .iter()
        .filter(|fact| fact.subject_name == subject && fact.property == property)
        .count()
}
