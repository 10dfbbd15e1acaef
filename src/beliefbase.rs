//! BeliefBase module: per-agent fact storage and the views derived from it.
//!
//! # Module Organization
//!
//! - `store`: [FactStore] and the per-agent [AgentFacts] with their identity index
//! - `policy`: [MergePolicy] and the [IdentityKey]s it produces
//! - `visibility`: [VisibilityIndex], the observer/subject view over "IsVisible" facts
//!
//! ```rust
//! use perspective_core::beliefbase::{FactStore, MergePolicy};
//! use perspective_core::properties::{AgentId, Fact, FactValue, PropertyType};
//!
//! let mut store = FactStore::new();
//! let agent = AgentId(1);
//! let clean = Fact::new("table1", "state", PropertyType::State)
//!     .with_value(FactValue::String("clean".to_string()));
//! let dirty = clean.clone().with_value(FactValue::String("dirty".to_string()));
//! store.upsert(agent, clean, MergePolicy::AttributeIdentity);
//! store.upsert(agent, dirty, MergePolicy::AttributeIdentity);
//! assert_eq!(store.len(agent), 1);
//! ```

mod policy;
mod store;
mod visibility;


pub use policy::{IdentityKey, MergePolicy};
pub use store::{AgentFacts, FactStore, UpsertOutcome};
pub use visibility::VisibilityIndex;
