//! Builders for deterministic engines with a known creature.

#![allow(dead_code)]

use std::collections::BTreeMap;

use creature::{CreatureSpec, CreatureType, GeneratorStrategy};
use frog_adventure::{EngineConfig, GameEngine, GameState};
use save::Persistence;

/// Builder for engines with a fixed seed and no environmental events
pub struct TestEngineBuilder {
    game_id: String,
    config: EngineConfig,
    spec: CreatureSpec,
}

impl TestEngineBuilder {
    pub fn new(seed: u64) -> Self {
        let mut config = EngineConfig::default().with_seed(seed);
        config.environmental_event_chance = 0.0;
        Self {
            game_id: format!("test_{}", seed),
            config,
            spec: CreatureSpec::new("Hopper", CreatureType::TreeFrog)
                .with_traits(["brave", "curious"])
                .with_stats(even_stats(12)),
        }
    }

    pub fn game_id(mut self, game_id: &str) -> Self {
        self.game_id = game_id.to_string();
        self
    }

    pub fn vitals(mut self, energy: i64, happiness: i64) -> Self {
        self.spec = self.spec.with_vitals(energy, happiness);
        self
    }

    pub fn items(mut self, items: &[&str]) -> Self {
        self.spec = self.spec.with_items(items.iter().copied());
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut EngineConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Engine with the game already started
    pub fn start(self) -> GameEngine {
        let mut engine = self.build();
        engine.start_new_game(None).unwrap();
        engine
    }

    pub fn start_with<P>(self, persistence: P) -> GameEngine
    where
        P: Persistence<GameState> + 'static,
    {
        let mut engine = self.build().with_persistence(persistence);
        engine.start_new_game(None).unwrap();
        engine
    }

    pub fn build(self) -> GameEngine {
        let config = self
            .config
            .with_generator(GeneratorStrategy::Preset(self.spec));
        GameEngine::new(self.game_id, config)
    }
}

pub fn even_stats(value: i64) -> BTreeMap<String, i64> {
    ["strength", "agility", "intelligence", "magic", "luck"]
        .iter()
        .map(|s| (s.to_string(), value))
        .collect()
}

pub fn event_types(engine: &GameEngine) -> Vec<String> {
    engine
        .bus()
        .history()
        .iter()
        .map(|e| e.event_type.clone())
        .collect()
}
