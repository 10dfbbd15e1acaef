//! End-to-end scenarios for the belief engine
//!
//! Drives [BeliefEngine] through the public API only: feeds in, requests in, fact lists out.

mod common;

use common::*;
use perspective_core::{
    beliefbase::MergePolicy,
    commands::{Op, OpResult},
    engine::BeliefEngine,
    event::Event,
    properties::{Fact, FactValue, PropertyType},
};
use std::{collections::BTreeSet, sync::mpsc::channel};
use test_log::test;

#[test]
fn test_scenario_visible_fact_is_attenuated() {
    let config = scenario_config();
    let mut engine = BeliefEngine::new(&config).unwrap();
    let feeds = vec![static_feed(
        "SPARK",
        vec![
            Fact::visibility("HUMAN1", "cup1", 0.7),
            Fact::new("cup1", "IsPresent", PropertyType::Position)
                .with_confidence(0.9)
                .with_observability(1.0),
        ],
    )];

    engine.tick(&feeds);

    let human = engine.facts(HUMAN1);
    let present: Vec<&Fact> = human
        .iter()
        .filter(|fact| fact.subject_name == "cup1" && fact.property == "IsPresent")
        .collect();
    assert_eq!(present.len(), 1);
    assert!((present[0].confidence - 0.63).abs() < 1e-9);
}

#[test]
fn test_scenario_state_replacement_without_observers() {
    let config = scenario_config();
    let mut engine = BeliefEngine::new(&config).unwrap();

    let clean = state("table1", "clean");
    assert_eq!(engine.handle(Op::AddFact(clean)), OpResult::Accepted(true));
    assert_eq!(engine.facts(MAIN).len(), 1);
    assert!(engine.facts(HUMAN1).is_empty());
    assert!(engine.facts(HUMAN2).is_empty());

    let dirty = state("table1", "dirty");
    assert_eq!(engine.handle(Op::AddFact(dirty)), OpResult::Accepted(true));
    let main = engine.facts(MAIN);
    assert_eq!(main.len(), 1);
    assert_eq!(main[0].value, FactValue::String("dirty".to_string()));
}

#[test]
fn test_attribute_invariant_holds_across_mixed_traffic() {
    let config = scenario_config();
    let mut engine = BeliefEngine::new(&config).unwrap();
    let places = ["table1", "table2", "shelf", "sink"];

    for round in 0..12usize {
        let place = places[round % places.len()];
        let holder = Fact::new("cup1", "holder", PropertyType::State).with_target(place);
        let color = Fact::new("cup1", "color", PropertyType::StaticProperty)
            .with_target(places[(round + 1) % places.len()]);
        let mut batch = vec![holder.clone(), color];
        if round % 3 != 0 {
            batch.push(Fact::visibility("HUMAN1", "cup1", 0.8));
        }
        if round % 2 == 0 {
            batch.push(Fact::visibility("HUMAN2", "cup1", 0.4));
        }
        engine.tick(&[static_feed("SPARK", batch)]);
        engine.handle(Op::AddFact(
            Fact::new("cup1", "holder", PropertyType::State).with_target(places[(round + 2) % 4]),
        ));

        for agent in [MAIN, HUMAN1, HUMAN2] {
            let mut seen = BTreeSet::new();
            for fact in engine.facts(agent).iter().filter(|fact| fact.is_persistent()) {
                assert!(
                    seen.insert((fact.subject_name.clone(), fact.property.clone())),
                    "agent {agent} holds two {} {} facts in round {round}",
                    fact.subject_name,
                    fact.property
                );
            }
        }
    }
}

#[test]
fn test_strict_identity_holds_after_repeated_ticks() {
    let config = scenario_config();
    let mut engine = BeliefEngine::new(&config).unwrap();
    let feeds = vec![
        static_feed(
            "SPARK",
            vec![
                Fact::visibility("HUMAN1", "cup1", 1.0),
                Fact::new("cup1", "IsOn", PropertyType::Position).with_target("table1"),
            ],
        ),
        static_feed(
            "area_manager",
            vec![Fact::new("cup1", "IsOn", PropertyType::Position)
                .with_target("table1")
                .with_confidence(0.5)],
        ),
    ];

    for _ in 0..4 {
        engine.tick(&feeds);
    }

    for agent in [MAIN, HUMAN1] {
        let facts = engine.facts(agent);
        assert_eq!(count(&facts, "cup1", "IsOn"), 1, "agent {agent}");
        let on = facts.iter().find(|fact| fact.property == "IsOn").unwrap();
        assert_eq!(on.confidence, 0.5, "the later feed wins");
        let keys: BTreeSet<_> = facts
            .iter()
            .map(|fact| MergePolicy::StrictIdentity.key(fact))
            .collect();
        assert_eq!(keys.len(), facts.len());
    }
}

#[test]
fn test_feed_that_stops_reporting_is_forgotten_next_tick() {
    let config = scenario_config();
    let mut engine = BeliefEngine::new(&config).unwrap();
    engine.tick(&[
        static_feed(
            "SPARK",
            vec![Fact::new("cup1", "IsPresent", PropertyType::Position)],
        ),
        static_feed("area_manager", vec![state("table1", "clean")]),
    ]);
    engine.tick(&[static_feed("area_manager", Vec::new())]);

    let main = engine.facts(MAIN);
    assert_eq!(count(&main, "cup1", "IsPresent"), 0);
    assert_eq!(count(&main, "table1", "state"), 1);
}

#[test]
fn test_published_fact_lists_serialize_with_wire_names() {
    let config = scenario_config();
    let mut engine = BeliefEngine::new(&config).unwrap();
    let (tx, rx) = channel::<Event>();
    let sinks = channel_sinks(&config, &tx);

    engine.handle(Op::AddFact(state("table1", "clean")));
    engine.tick(&[]);
    engine.publish(&sinks);

    let Some(Event::Published(main)) = rx.try_iter().next() else {
        panic!("expected the main agent's fact list first");
    };
    let json = serde_json::to_value(&main).unwrap();
    assert_eq!(json["agentId"], 1);
    assert_eq!(json["agentName"], "PR2_ROBOT");
    assert_eq!(json["tick"], 1);
    assert_eq!(json["factList"][0]["subjectName"], "table1");
    assert_eq!(json["factList"][0]["propertyType"], "state");
    assert_eq!(json["factList"][0]["value"], "clean");
}
