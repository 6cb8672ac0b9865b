//! Engine configuration

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use creature::GeneratorStrategy;

/// Engine configuration, passed explicitly to each engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Save every N processed turns (0 disables autosave)
    pub autosave_interval: u32,
    /// Chance per turn of an environmental event
    pub environmental_event_chance: f64,
    /// Events included in a turn report
    pub recent_event_limit: usize,
    /// Upper bound on actions drained in one turn
    pub max_actions_per_turn: usize,
    /// Nesting limit for events triggered from handlers
    pub max_dispatch_depth: usize,
    /// RNG seed for reproducible games
    pub seed: Option<u64>,
    /// Where new creatures come from
    pub generator: GeneratorStrategy,
    /// Log every event through tracing
    pub trace_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_interval: 5,
            environmental_event_chance: 0.1,
            recent_event_limit: 10,
            max_actions_per_turn: 256,
            max_dispatch_depth: 10,
            seed: None,
            generator: GeneratorStrategy::Random,
            trace_events: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            autosave_interval: parse_or(&lookup, "FROG_AUTOSAVE_INTERVAL", defaults.autosave_interval)
                .context("FROG_AUTOSAVE_INTERVAL must be a non-negative integer")?,
            environmental_event_chance: parse_or(
                &lookup,
                "FROG_EVENT_CHANCE",
                defaults.environmental_event_chance,
            )
            .context("FROG_EVENT_CHANCE must be a number")?,
            max_actions_per_turn: parse_or(
                &lookup,
                "FROG_MAX_ACTIONS_PER_TURN",
                defaults.max_actions_per_turn,
            )
            .context("FROG_MAX_ACTIONS_PER_TURN must be a positive integer")?,
            seed: match lookup("FROG_SEED") {
                Some(raw) => Some(raw.trim().parse().context("FROG_SEED must be a u64")?),
                None => None,
            },
            trace_events: parse_or(&lookup, "FROG_TRACE_EVENTS", defaults.trace_events)
                .context("FROG_TRACE_EVENTS must be true or false")?,
            ..defaults
        };

        anyhow::ensure!(
            (0.0..=1.0).contains(&config.environmental_event_chance),
            "FROG_EVENT_CHANCE must be between 0 and 1"
        );
        anyhow::ensure!(
            config.max_actions_per_turn > 0,
            "FROG_MAX_ACTIONS_PER_TURN must be a positive integer"
        );
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_generator(mut self, generator: GeneratorStrategy) -> Self {
        self.generator = generator;
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => Ok(raw.trim().parse()?),
        None => Ok(default),
    }
}
