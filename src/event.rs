use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    sync::mpsc::Sender,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    engine::TickReport,
    properties::{AgentId, Fact},
};

/// The full current belief of one agent, published once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactList {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub tick: u64,
    pub fact_list: Vec<Fact>,
}

impl Display for FactList {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "FactList({}:{} tick {}, {} facts)",
            self.agent_name,
            self.agent_id,
            self.tick,
            self.fact_list.len()
        )
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    #[default]
    Ping,
    Published(FactList),
    Tick(TickReport),
}

/// Downstream consumer of an agent's beliefs. Publishing is fire-and-forget: no
/// acknowledgment, no retry.
pub trait FactSink: Send {
    fn publish(&self, facts: FactList);
}

/// One sink per agent.
pub type SinkMap = BTreeMap<AgentId, Box<dyn FactSink>>;

impl FactSink for Sender<Event> {
    fn publish(&self, facts: FactList) {
        let agent = facts.agent_id;
        if self.send(Event::Published(facts)).is_err() {
            tracing::debug!("[FactSink] receiver for agent {agent} is gone, dropping fact list");
        }
    }
}

impl FactSink for UnboundedSender<FactList> {
    fn publish(&self, facts: FactList) {
        let agent = facts.agent_id;
        if self.send(facts).is_err() {
            tracing::debug!("[FactSink] receiver for agent {agent} is gone, dropping fact list");
        }
    }
}
