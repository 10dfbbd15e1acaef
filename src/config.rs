use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
    time::Duration,
};

use crate::{
    error::PerspectiveError,
    properties::DEFAULT_MAIN_AGENT_ID,
    registry::{AgentRecord, AgentRegistry},
};

fn default_tick_hz() -> f64 {
    30.0
}

fn default_main_agent() -> AgentRecord {
    AgentRecord {
        name: "PR2_ROBOT".to_string(),
        id: DEFAULT_MAIN_AGENT_ID,
    }
}

fn default_tracked_agents() -> Vec<AgentRecord> {
    vec![
        AgentRecord::new("HERAKLES_HUMAN1", 101),
        AgentRecord::new("HERAKLES_HUMAN2", 102),
    ]
}

fn default_feeds() -> Vec<String> {
    ["area_manager", "SPARK", "agent_monitor"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Engine configuration. Every field is optional in TOML and falls back to the values of the
/// reference deployment.
///
/// ```toml
/// tick_hz = 30.0
/// feeds = ["area_manager", "SPARK", "agent_monitor"]
///
/// [main_agent]
/// name = "PR2_ROBOT"
/// id = 1
///
/// [[tracked_agents]]
/// name = "HERAKLES_HUMAN1"
/// id = 101
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f64,
    /// Upstream feeds, in ingestion order.
    #[serde(default = "default_feeds")]
    pub feeds: Vec<String>,
    #[serde(default = "default_main_agent")]
    pub main_agent: AgentRecord,
    #[serde(default = "default_tracked_agents")]
    pub tracked_agents: Vec<AgentRecord>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tick_hz: default_tick_hz(),
            feeds: default_feeds(),
            main_agent: default_main_agent(),
            tracked_agents: default_tracked_agents(),
        }
    }
}

impl EngineConfig {
    pub fn with_tracked_agents<I>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = AgentRecord>,
    {
        self.tracked_agents = agents.into_iter().collect();
        self
    }

    pub fn with_feeds<I, S>(mut self, feeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feeds = feeds.into_iter().map(Into::into).collect();
        self
    }

    pub fn tick_period(&self) -> Result<Duration, PerspectiveError> {
        if !self.tick_hz.is_finite() || self.tick_hz <= 0.0 {
            return Err(PerspectiveError::Configuration(format!(
                "tick_hz must be a positive number, got {}",
                self.tick_hz
            )));
        }
        Duration::try_from_secs_f64(1.0 / self.tick_hz).map_err(|e| {
            PerspectiveError::Configuration(format!("tick_hz {} is out of range: {e}", self.tick_hz))
        })
    }

    /// Build the registry of every configured agent, main agent included.
    pub fn registry(&self) -> Result<AgentRegistry, PerspectiveError> {
        if self
            .tracked_agents
            .iter()
            .any(|agent| agent.id == self.main_agent.id)
        {
            return Err(PerspectiveError::Configuration(format!(
                "main agent id {} is also listed as a tracked agent",
                self.main_agent.id
            )));
        }
        AgentRegistry::from_records(std::iter::once(&self.main_agent).chain(self.tracked_agents.iter()))
    }

    /// Check everything that would otherwise fail at engine or service start.
    pub fn validate(&self) -> Result<(), PerspectiveError> {
        self.tick_period()?;
        self.registry()?;
        Ok(())
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<EngineConfig, PerspectiveError>;
    fn set_config(&self, config: &EngineConfig) -> Result<(), PerspectiveError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<EngineConfig, PerspectiveError> {
        tracing::debug!("Attempting to read engine config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, returning default engine config.");
            return Ok(EngineConfig::default());
        }
        let content = read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn set_config(&self, config: &EngineConfig) -> Result<(), PerspectiveError> {
        tracing::debug!("Attempting to write engine config to: {:?}", &self.path);
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}
