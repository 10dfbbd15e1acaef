//! Read-only view over the visibility edges of the ground-truth store.
//!
//! An edge is any main-store fact with property [VISIBILITY_PROPERTY]: the subject is the
//! observer, the target the observed entity and the value the visibility strength. Nothing is
//! cached; every query reads the store it was built over.

use std::collections::BTreeMap;

use crate::properties::{AttributeKey, Fact, VISIBILITY_PROPERTY};

use super::store::AgentFacts;

#[derive(Debug, Clone, Copy)]
pub struct VisibilityIndex<'a> {
    facts: Option<&'a AgentFacts>,
}

impl<'a> VisibilityIndex<'a> {
    pub fn new(facts: Option<&'a AgentFacts>) -> Self {
        VisibilityIndex { facts }
    }

    fn edges_of(&self, observer: &str) -> impl Iterator<Item = &'a Fact> + 'a {
        let key = AttributeKey {
            subject: observer.to_string(),
            property: VISIBILITY_PROPERTY.to_string(),
        };
        let edges: Vec<&'a Fact> = self
            .facts
            .map(|facts| facts.with_attribute(&key).collect())
            .unwrap_or_default();
        edges.into_iter()
    }

    /// Strength with which `observer` perceives `subject`, or `None` when no edge exists.
    ///
    /// Several qualifying edges resolve to the strongest one.
    pub fn visibility(&self, observer: &str, subject: &str) -> Option<f64> {
        self.edges_of(observer)
            .filter(|edge| edge.target_name.as_deref() == Some(subject))
            .filter_map(|edge| edge.value.strength())
            .reduce(f64::max)
    }

    /// Every subject `observer` has an edge to, with its strongest visibility.
    pub fn visible_subjects(&self, observer: &str) -> BTreeMap<&'a str, f64> {
        let mut subjects = BTreeMap::<&'a str, f64>::new();
        for edge in self.edges_of(observer) {
            let (Some(subject), Some(strength)) = (edge.target_name.as_deref(), edge.value.strength())
            else {
                continue;
            };
            subjects
                .entry(subject)
                .and_modify(|current| *current = current.max(strength))
                .or_insert(strength);
        }
        subjects
    }
}
