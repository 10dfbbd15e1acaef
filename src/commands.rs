use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    event::FactList,
    properties::{AgentId, Fact, PropertyType},
};

/// Request interface of the [crate::engine::BeliefEngine]. Requests are served between ticks,
/// never during one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// Upsert into the main store and cascade to every agent that sees the fact's subject.
    AddFact(Fact),
    /// Remove the fact's (subject, target, property) identity from the main store and from
    /// every agent that sees the subject.
    RemoveFact(Fact),
    /// Administrative bulk removal within one agent. Not cascaded.
    RemovePropertyType {
        agent: AgentId,
        property_type: PropertyType,
    },
    /// Drop every non-persistent fact of one agent.
    RemoveInternalFacts(AgentId),
    GetFacts(AgentId),
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Op::AddFact(fact) => write!(f, "AddFact({fact})"),
            Op::RemoveFact(fact) => write!(f, "RemoveFact({fact})"),
            Op::RemovePropertyType {
                agent,
                property_type,
            } => write!(f, "RemovePropertyType({agent}, {property_type})"),
            Op::RemoveInternalFacts(agent) => write!(f, "RemoveInternalFacts({agent})"),
            Op::GetFacts(agent) => write!(f, "GetFacts({agent})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpResult {
    Accepted(bool),
    Removed(bool),
    Facts(FactList),
}

impl OpResult {
    /// Whether the request took effect. Queries always succeed.
    pub fn is_ok(&self) -> bool {
        match self {
            OpResult::Accepted(ok) | OpResult::Removed(ok) => *ok,
            OpResult::Facts(_) => true,
        }
    }
}

impl Display for OpResult {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            OpResult::Accepted(accepted) => write!(f, "Accepted({accepted})"),
            OpResult::Removed(removed) => write!(f, "Removed({removed})"),
            OpResult::Facts(list) => write!(f, "Facts({list})"),
        }
    }
}
