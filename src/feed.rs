//! Upstream fact producers.
//!
//! A producer exposes its most recent complete batch. The engine reads every producer once per
//! tick and treats the batch as a replacement of that producer's contribution, never as a
//! delta.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::properties::Fact;

pub trait FactProducer: Send {
    fn name(&self) -> &str;

    /// The latest full batch. Must not block.
    fn latest(&self) -> Vec<Fact>;
}

/// A producer that always reports the same batch.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticFeed {
    name: String,
    facts: Vec<Fact>,
}

impl StaticFeed {
    pub fn new<N: Into<String>>(name: N, facts: Vec<Fact>) -> Self {
        StaticFeed {
            name: name.into(),
            facts,
        }
    }
}

impl FactProducer for StaticFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn latest(&self) -> Vec<Fact> {
        self.facts.clone()
    }
}

/// Latest-sample cache filled by an external reader through a [FeedWriter].
///
/// Each write replaces the cached batch; there is no queue, so the engine only ever sees the
/// most recent batch.
#[derive(Debug, Clone)]
pub struct LatestFeed {
    name: String,
    latest: Arc<RwLock<Vec<Fact>>>,
}

#[derive(Debug, Clone)]
pub struct FeedWriter {
    latest: Arc<RwLock<Vec<Fact>>>,
}

impl LatestFeed {
    pub fn new<N: Into<String>>(name: N) -> (LatestFeed, FeedWriter) {
        let latest = Arc::new(RwLock::new(Vec::new()));
        (
            LatestFeed {
                name: name.into(),
                latest: latest.clone(),
            },
            FeedWriter { latest },
        )
    }
}

impl FactProducer for LatestFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn latest(&self) -> Vec<Fact> {
        self.latest.read().clone()
    }
}

impl FeedWriter {
    pub fn write(&self, facts: Vec<Fact>) {
        *self.latest.write() = facts;
    }

    pub fn clear(&self) {
        self.latest.write().clear();
    }
}
