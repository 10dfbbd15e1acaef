//! perspective CLI tool
//!
//! Command-line interface for checking engine configurations and running fact scenarios
//! through the belief engine.
//!
//! ## Commands
//!
//! - `check --config <file>`: Validate a configuration and print the agent registry
//! - `run --config <file> --scenario <file>`: Feed a scenario to the engine and print every
//!   published fact list as a JSON line

use clap::{Parser, Subcommand};
use perspective_core::{
    commands::Op,
    config::{ConfigProvider, EngineConfig, TomlConfigProvider},
    engine::BeliefEngine,
    event::{Event, FactList, FactSink, SinkMap},
    feed::{FactProducer, StaticFeed},
    properties::Fact,
    service::TickService,
    PerspectiveError,
};
use serde::Deserialize;
use std::{fs::read_to_string, path::PathBuf, sync::mpsc::channel, time::Duration};

#[derive(Parser)]
#[command(name = "perspective")]
#[command(author, version, about = "A tool for running multi-agent perspective taking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and print the agents it registers
    Check {
        /// Configuration file path. Defaults apply when it does not exist
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Run a scenario through the engine
    Run {
        /// Configuration file path. Defaults apply when it does not exist
        #[arg(short, long)]
        config: PathBuf,

        /// Scenario file: `[[feeds]]` batches and `[[requests]]` facts to add
        #[arg(short, long)]
        scenario: PathBuf,

        /// Run this many ticks and exit instead of ticking until Ctrl-C
        #[arg(short, long)]
        ticks: Option<u64>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct Scenario {
    #[serde(default)]
    feeds: Vec<FeedScenario>,
    /// Facts added through the request API before the first tick.
    #[serde(default)]
    requests: Vec<Fact>,
}

#[derive(Debug, Deserialize)]
struct FeedScenario {
    name: String,
    #[serde(default)]
    facts: Vec<Fact>,
}

impl Scenario {
    fn load(path: &PathBuf) -> Result<Scenario, PerspectiveError> {
        Scenario::parse(&read_to_string(path)?)
    }

    fn parse(content: &str) -> Result<Scenario, PerspectiveError> {
        Ok(toml::from_str(content)?)
    }

    fn feeds(&self) -> Vec<Box<dyn FactProducer>> {
        self.feeds
            .iter()
            .map(|feed| {
                Box::new(StaticFeed::new(feed.name.clone(), feed.facts.clone()))
                    as Box<dyn FactProducer>
            })
            .collect()
    }
}

struct StdoutSink;

impl FactSink for StdoutSink {
    fn publish(&self, facts: FactList) {
        print_fact_list(&facts);
    }
}

fn print_fact_list(facts: &FactList) {
    match serde_json::to_string(facts) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!("[perspective] could not serialize {facts}: {e}"),
    }
}

fn load_config(path: PathBuf) -> Result<EngineConfig, PerspectiveError> {
    let config = TomlConfigProvider::new(path).get_config()?;
    if let Err(e) = config.validate() {
        tracing::error!("[perspective] invalid configuration: {e}");
        return Err(e);
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let config = load_config(config)?;
            let engine = BeliefEngine::new(&config)?;

            println!("=== Configuration ===");
            println!("Tick rate: {} Hz", config.tick_hz);
            println!(
                "Main agent: {} ({})",
                config.main_agent.name, config.main_agent.id
            );
            for (agent, name) in engine.tracked_agents() {
                println!("Tracked agent: {name} ({agent})");
            }
            println!("Feeds: {}", config.feeds.join(", "));
            Ok(())
        }

        Commands::Run {
            config,
            scenario,
            ticks,
        } => {
            let config = load_config(config)?;
            let scenario = Scenario::load(&scenario)?;

            if let Some(ticks) = ticks {
                let mut engine = BeliefEngine::new(&config)?;
                let feeds = engine.order_feeds(scenario.feeds());
                for fact in scenario.requests.iter().cloned() {
                    let result = engine.handle(Op::AddFact(fact));
                    if !result.is_ok() {
                        tracing::warn!("[perspective] scenario request was not accepted");
                    }
                    tracing::info!("[perspective] {result}");
                }
                let mut sinks = SinkMap::new();
                for (agent, _) in engine.registry().iter() {
                    sinks.insert(agent, Box::new(StdoutSink));
                }
                for _ in 0..ticks {
                    let report = engine.tick(&feeds);
                    tracing::info!("[perspective] {report}");
                    report.check()?;
                    engine.publish(&sinks);
                }
                return Ok(());
            }

            let (tx, rx) = channel::<Event>();
            let mut sinks = SinkMap::new();
            for agent in std::iter::once(&config.main_agent).chain(config.tracked_agents.iter()) {
                sinks.insert(agent.id, Box::new(tx.clone()));
            }

            // Spawn event handler thread
            let event_handle = std::thread::spawn(move || {
                for event in rx {
                    match event {
                        Event::Published(facts) => print_fact_list(&facts),
                        Event::Tick(report) => match report.check() {
                            Ok(()) => tracing::debug!("[perspective] {report}"),
                            Err(e) => tracing::error!("[perspective] {e}"),
                        },
                        Event::Ping => {}
                    }
                }
            });

            let service = TickService::start(&config, scenario.feeds(), sinks, Some(tx))?;
            for fact in scenario.requests.iter().cloned() {
                let result = service.request(Op::AddFact(fact))?;
                if !result.is_ok() {
                    tracing::warn!("[perspective] scenario request was not accepted");
                }
                tracing::info!("[perspective] {result}");
            }

            eprintln!("Ticking at {} Hz. Press Ctrl-C to stop.", config.tick_hz);

            let running = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
            let r = running.clone();

            ctrlc::set_handler(move || {
                eprintln!("\nShutting down...");
                r.store(false, std::sync::atomic::Ordering::SeqCst);
            })?;

            while running.load(std::sync::atomic::Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(100));
            }

            service.shutdown();
            drop(service);
            drop(event_handle);

            eprintln!("Shutdown complete");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perspective_core::properties::{AgentId, FactValue, PropertyType};
    use test_log::test;

    const SCENARIO: &str = r#"
[[feeds]]
name = "SPARK"

[[feeds.facts]]
subjectName = "HERAKLES_HUMAN1"
targetName = "cup1"
property = "IsVisible"
propertyType = "position"
valueType = "double"
value = 0.7

[[feeds.facts]]
subjectName = "cup1"
property = "IsPresent"
propertyType = "position"
valueType = "bool"
value = true
confidence = 0.9

[[feeds]]
name = "area_manager"

[[requests]]
subjectName = "table1"
property = "state"
propertyType = "state"
valueType = "string"
value = "clean"
"#;

    #[test]
    fn test_scenario_file_parses_feeds_and_requests() {
        let scenario = Scenario::parse(SCENARIO).unwrap();

        assert_eq!(scenario.feeds.len(), 2);
        assert_eq!(scenario.feeds[0].name, "SPARK");
        assert!(scenario.feeds[1].facts.is_empty());
        let edge = &scenario.feeds[0].facts[0];
        assert!(edge.is_visibility_edge());
        assert_eq!(edge.target_name.as_deref(), Some("cup1"));
        assert_eq!(edge.property_type, PropertyType::Position);
        assert_eq!(edge.value, FactValue::Double(0.7));
        assert_eq!(scenario.requests.len(), 1);
        assert_eq!(
            scenario.requests[0].value,
            FactValue::String("clean".to_string())
        );
    }

    #[test]
    fn test_scenario_runs_through_the_engine() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let mut engine = BeliefEngine::new(&EngineConfig::default()).unwrap();
        let feeds = engine.order_feeds(scenario.feeds());
        for fact in scenario.requests.iter().cloned() {
            engine.handle(Op::AddFact(fact));
        }

        let report = engine.tick(&feeds);
        report.check().unwrap();

        let human = engine.facts(AgentId(101));
        let present = human
            .iter()
            .find(|fact| fact.subject_name == "cup1" && fact.property == "IsPresent")
            .expect("HERAKLES_HUMAN1 sees cup1");
        assert!((present.confidence - 0.63).abs() < 1e-9);
        assert_eq!(engine.facts(AgentId(1)).len(), 3);
    }

    #[test]
    fn test_malformed_scenario_is_a_serialization_error() {
        let result = Scenario::parse("[[feeds]]\nfacts = []\n");
        assert!(matches!(result, Err(PerspectiveError::Serialization(_))));
    }
}
