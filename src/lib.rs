//! # perspective-core
//!
//! A multi-agent belief-propagation engine: one ground-truth fact store, and for every tracked
//! agent a derived view of what that agent believes, filtered through who can see what.
//!
//! ## Overview
//!
//! The main agent (the robot, or whatever platform hosts the engine) receives complete fact
//! batches from its upstream feeds on every tick. Among those facts, `IsVisible` facts state how
//! well each observer perceives each subject. Tracked agents (the humans around the robot) get
//! a copy of every fact whose subject they can see, with its confidence attenuated by the
//! visibility strength and by the fact's own observability.
//!
//! ### Key Features
//!
//! - **Two identity policies**: relational facts are unique per (subject, target, property);
//!   state facts are unique per (subject, property), so a new state replaces the old one
//! - **Idempotent refresh**: perspectives are re-derived from ground truth every tick
//! - **Visibility-gated requests**: explicitly added or removed facts cascade to the agents that
//!   currently see their subject
//! - **Serialized execution**: ticks and requests never interleave
//!
//! ## Architecture
//!
//! - **[`properties`]**: agents, facts, typed values and property categories
//! - **[`beliefbase`]**: per-agent stores, merge policies and the visibility view
//! - **[`engine`]**: the tick algorithm and the request handlers
//! - **[`registry`]**: agent name/id table
//! - **[`feed`]** / **[`event`]**: upstream producers and downstream sinks
//! - **[`service`]**: the fixed-rate driver owning an engine on its own runtime
//! - **[`config`]**: TOML engine configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use perspective_core::{
//!     config::EngineConfig,
//!     engine::BeliefEngine,
//!     feed::{FactProducer, StaticFeed},
//!     properties::{AgentId, Fact, PropertyType},
//!     registry::AgentRecord,
//! };
//!
//! let config = EngineConfig::default()
//!     .with_tracked_agents([AgentRecord::new("HUMAN1", 101)])
//!     .with_feeds(["SPARK"]);
//! let mut engine = BeliefEngine::new(&config)?;
//!
//! let feeds: Vec<Box<dyn FactProducer>> = vec![Box::new(StaticFeed::new(
//!     "SPARK",
//!     vec![
//!         Fact::visibility("HUMAN1", "cup1", 0.7),
//!         Fact::new("cup1", "IsPresent", PropertyType::Position).with_confidence(0.9),
//!     ],
//! ))];
//! engine.tick(&feeds);
//!
//! let human = engine.facts(AgentId(101));
//! let present = human.iter().find(|fact| fact.property == "IsPresent").unwrap();
//! assert!((present.confidence - 0.63).abs() < 1e-9);
//! # Ok::<(), perspective_core::PerspectiveError>(())
//! ```

pub mod beliefbase;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod feed;
pub mod properties;
pub mod registry;
pub mod service;
#[cfg(test)]
mod tests;

pub use error::*;
