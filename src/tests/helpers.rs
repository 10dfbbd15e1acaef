//! Shared test utilities for engine testing

use crate::{
    config::EngineConfig,
    engine::BeliefEngine,
    feed::{FactProducer, StaticFeed},
    properties::{AgentId, Fact, FactValue, PropertyType},
    registry::AgentRecord,
};

pub const MAIN: AgentId = AgentId(1);
pub const HUMAN1: AgentId = AgentId(101);
pub const HUMAN2: AgentId = AgentId(102);

/// Initialize logging for tests
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Main agent ROBOT:1 tracking HUMAN1:101 and HUMAN2:102, fed by "SPARK" then "area_manager".
pub fn test_config() -> EngineConfig {
    EngineConfig {
        tick_hz: 30.0,
        main_agent: AgentRecord::new("ROBOT", 1),
        tracked_agents: vec![AgentRecord::new("HUMAN1", 101), AgentRecord::new("HUMAN2", 102)],
        feeds: vec!["SPARK".to_string(), "area_manager".to_string()],
    }
}

pub fn test_engine() -> BeliefEngine {
    init_logging();
    BeliefEngine::new(&test_config()).expect("test config is valid")
}

pub fn feed(name: &str, facts: Vec<Fact>) -> Box<dyn FactProducer> {
    Box::new(StaticFeed::new(name, facts))
}

pub fn position(subject: &str, property: &str, target: &str) -> Fact {
    Fact::new(subject, property, PropertyType::Position).with_target(target)
}

pub fn state(subject: &str, value: &str) -> Fact {
    Fact::new(subject, "state", PropertyType::State).with_value(FactValue::String(value.to_string()))
}

/// Facts with the given subject and property.
pub fn find<'a>(facts: &'a [Fact], subject: &str, property: &str) -> Vec<&'a Fact> {
    facts
        .iter()
        .filter(|fact| fact.subject_name == subject && fact.property == property)
        .collect()
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
